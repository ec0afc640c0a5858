//! Console rendering for the pipeline: staged status lines while the run is
//! going, then the run summary, receipt and report once it finishes. Three
//! modes: styled human output, line-delimited JSON events, and plain text
//! for log scrapers.

use crate::archive::packer::Archive;
use crate::archive::report::RunReport;
use crate::delivery::UploadReceipt;
use crate::error::{FeedError, UserFriendlyError};
use crate::extract::ExtractProgress;
use console::{style, Emoji, Term};
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

static OK: Emoji = Emoji("✅ ", "✓ ");
static FAIL: Emoji = Emoji("❌ ", "✗ ");
static NOTE: Emoji = Emoji("ℹ️  ", "i ");
static ALERT: Emoji = Emoji("⚠️  ", "! ");
static STAGE: Emoji = Emoji("📦 ", "> ");

#[derive(Debug, Clone, Copy)]
enum Level {
    Success,
    Error,
    Warning,
    Info,
    Debug,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Success => "SUCCESS",
            Level::Error => "ERROR",
            Level::Warning => "WARNING",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
        }
    }

    /// Verbosity needed before a message of this level is shown.
    fn min_verbosity(self) -> u8 {
        match self {
            Level::Success | Level::Error | Level::Warning => 0,
            Level::Info => 1,
            Level::Debug => 2,
        }
    }
}

pub struct OutputFormatter {
    mode: OutputMode,
    styled: bool,
    verbosity: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let styled = mode == OutputMode::Human
            && !quiet
            && Term::stdout().features().colors_supported();

        Self {
            mode,
            styled,
            verbosity: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn success(&self, message: &str) {
        self.emit(Level::Success, message);
    }

    pub fn error(&self, message: &str) {
        self.emit(Level::Error, message);
    }

    pub fn warning(&self, message: &str) {
        self.emit(Level::Warning, message);
    }

    pub fn info(&self, message: &str) {
        self.emit(Level::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.emit(Level::Debug, message);
    }

    /// Announces a pipeline stage: extraction, packaging, upload.
    pub fn start_operation(&self, operation: &str) {
        if self.quiet {
            return;
        }
        match self.mode {
            OutputMode::Human => {
                if self.styled {
                    println!("{}{}", STAGE, style(operation).bold());
                } else {
                    println!("> {}", operation);
                }
            }
            OutputMode::Json => self.emit_json("stage", operation),
            OutputMode::Plain => println!("STAGE: {}", operation),
        }
    }

    pub fn print_user_friendly_error(&self, error: &FeedError) {
        self.error(&error.user_message());

        let Some(suggestion) = error.suggestion() else {
            return;
        };
        match self.mode {
            OutputMode::Human => {
                println!();
                if self.styled {
                    println!("{}{}", NOTE, style(format!("Suggestion: {}", suggestion)).cyan());
                } else {
                    println!("Suggestion: {}", suggestion);
                }
            }
            OutputMode::Json => self.emit_json("suggestion", &suggestion),
            OutputMode::Plain => println!("SUGGESTION: {}", suggestion),
        }
    }

    pub fn print_run_summary(&self, progress: &ExtractProgress, archive: Option<&Archive>) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Json => {
                let summary = json!({
                    "type": "summary",
                    "days_processed": progress.days_processed,
                    "bytes_written": progress.bytes_written,
                    "duration_ms": progress.elapsed().as_millis(),
                    "archive": archive.map(|a| json!({
                        "file_name": a.file_name,
                        "size": a.size,
                        "md5": a.md5,
                    })),
                    "warnings": progress.warnings.len(),
                });
                println!("{}", summary);
            }
            OutputMode::Human | OutputMode::Plain => {
                self.print_separator();
                self.success("Daily extract completed");
                println!("  Days processed: {}", progress.days_processed);
                println!("  Bytes written:  {}", format_bytes(progress.bytes_written));
                println!("  Time taken:     {}", format_duration(progress.elapsed()));
                if let Some(archive) = archive {
                    println!("  Archive:        {}", archive.file_name);
                    println!("  MD5:            {}", archive.md5);
                }
                if !progress.warnings.is_empty() {
                    println!("  Warnings:       {}", progress.warnings.len());
                }
                self.print_separator();
            }
        }
    }

    pub fn print_run_report(&self, report: &RunReport) {
        match self.mode {
            OutputMode::Json => {
                let rendered =
                    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
                println!("{}", rendered);
            }
            OutputMode::Human => self.print_report_lines(report, true),
            OutputMode::Plain => self.print_report_lines(report, false),
        }
    }

    pub fn print_upload_receipt(&self, receipt: &UploadReceipt) {
        match self.mode {
            OutputMode::Human => {
                self.success("Archive accepted by the delivery API");
                println!("  GUID:       {}", receipt.guid);
                if receipt.md5.is_empty() {
                    println!("  Server MD5: (not reported)");
                } else {
                    println!("  Server MD5: {}", receipt.md5);
                }
            }
            OutputMode::Json => {
                println!(
                    "{}",
                    json!({
                        "type": "upload_receipt",
                        "guid": receipt.guid,
                        "server_md5": receipt.md5,
                    })
                );
            }
            OutputMode::Plain => {
                println!("UPLOADED: guid={} md5={}", receipt.guid, receipt.md5);
            }
        }
    }

    pub fn print_status_response(&self, status: &Value) {
        match self.mode {
            OutputMode::Human => {
                self.print_header("Upload Status");
                println!(
                    "{}",
                    serde_json::to_string_pretty(status).unwrap_or_else(|_| "{}".to_string())
                );
            }
            OutputMode::Json => println!(
                "{}",
                serde_json::to_string_pretty(status).unwrap_or_else(|_| "{}".to_string())
            ),
            OutputMode::Plain => println!(
                "STATUS: {}",
                serde_json::to_string(status).unwrap_or_else(|_| "{}".to_string())
            ),
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }
        match self.mode {
            OutputMode::Human if self.styled => {
                println!();
                println!("{}", style(title).bold().cyan());
                println!();
            }
            OutputMode::Json => self.emit_json("header", title),
            _ => println!("=== {} ===", title),
        }
    }

    pub fn print_separator(&self) {
        if self.quiet || self.mode == OutputMode::Json {
            return;
        }
        if self.styled {
            println!("{}", style("─".repeat(60)).dim());
        } else {
            println!("{}", "-".repeat(60));
        }
    }

    fn visible(&self, level: Level) -> bool {
        !self.quiet && self.verbosity >= level.min_verbosity()
    }

    fn emit(&self, level: Level, message: &str) {
        // Errors always reach stderr, whatever the verbosity.
        if matches!(level, Level::Error) {
            match self.mode {
                OutputMode::Human => {
                    if self.styled {
                        eprintln!("{}{}", FAIL, style(message).red().bold());
                    } else {
                        eprintln!("✗ {}", message);
                    }
                }
                OutputMode::Json => self.emit_json("error", message),
                OutputMode::Plain => eprintln!("ERROR: {}", message),
            }
            return;
        }

        if !self.visible(level) {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.styled {
                    let line = match level {
                        Level::Success => format!("{}{}", OK, style(message).green().bold()),
                        Level::Warning => format!("{}{}", ALERT, style(message).yellow().bold()),
                        Level::Info => format!("{}{}", NOTE, style(message).cyan()),
                        Level::Debug => format!("  {}", style(message).dim()),
                        Level::Error => unreachable!(),
                    };
                    println!("{}", line);
                } else {
                    let prefix = match level {
                        Level::Success => "✓",
                        Level::Warning => "!",
                        Level::Info => "i",
                        Level::Debug => " ",
                        Level::Error => unreachable!(),
                    };
                    println!("{} {}", prefix, message);
                }
            }
            OutputMode::Json => self.emit_json(&level.tag().to_lowercase(), message),
            OutputMode::Plain => println!("{}: {}", level.tag(), message),
        }
    }

    fn emit_json(&self, kind: &str, message: &str) {
        println!(
            "{}",
            json!({
                "type": kind,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })
        );
    }

    fn print_report_lines(&self, report: &RunReport, with_header: bool) {
        if with_header {
            self.print_header("Run Report");
        } else {
            println!("REPORT: daily extract");
        }

        println!("Client: {}", report.client);
        println!("Period: {}..{}", report.period_start, report.period_end);
        println!("Days: {}", report.summary.days_processed);
        println!("Size: {}", format_bytes(report.summary.total_bytes));

        if !report.files.is_empty() {
            println!("Daily files:");
            for info in &report.files {
                println!(
                    "  {} ({}) - {} sales, {} returns",
                    info.file_name,
                    format_bytes(info.size),
                    info.sales,
                    info.returns
                );
            }
        }

        if let Some(ref archive) = report.archive {
            println!("Archive: {} ({})", archive.file_name, format_bytes(archive.size));
            println!("MD5: {}", archive.md5);
        }

        if let Some(ref upload) = report.upload {
            println!("Upload GUID: {}", upload.guid);
            println!(
                "Server MD5 matches: {}",
                if upload.md5_matches { "yes" } else { "no" }
            );
        }

        if !report.warnings.is_empty() {
            println!("Issues encountered:");
            for warning in &report.warnings {
                println!("  - {}", warning);
            }
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;

    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Routes messages through the progress manager so they do not tear the
/// active day bar apart.
pub struct ProgressAwareOutput<'a> {
    formatter: &'a OutputFormatter,
    progress_manager: Option<&'a crate::ui::ProgressManager>,
}

impl<'a> ProgressAwareOutput<'a> {
    pub fn new(
        formatter: &'a OutputFormatter,
        progress_manager: Option<&'a crate::ui::ProgressManager>,
    ) -> Self {
        Self {
            formatter,
            progress_manager,
        }
    }

    fn deliver<F: FnOnce(&OutputFormatter)>(&self, f: F) {
        match self.progress_manager {
            Some(pm) => pm.suspend(|| f(self.formatter)),
            None => f(self.formatter),
        }
    }

    pub fn success(&self, message: &str) {
        self.deliver(|f| f.success(message));
    }

    pub fn error(&self, message: &str) {
        self.deliver(|f| f.error(message));
    }

    pub fn warning(&self, message: &str) {
        self.deliver(|f| f.warning(message));
    }

    pub fn info(&self, message: &str) {
        self.deliver(|f| f.info(message));
    }
}
