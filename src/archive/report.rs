use crate::archive::packer::Archive;
use crate::error::{FeedError, Result};
use crate::extract::{DailyFile, ExtractProgress};
use crate::period::Period;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub client: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub summary: RunSummary,
    pub files: Vec<DailyFileInfo>,
    pub archive: Option<ArchiveInfo>,
    pub upload: Option<UploadInfo>,
    pub warnings: Vec<String>,
    pub config_used: ConfigSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub days_processed: usize,
    pub total_bytes: u64,
    pub duration: Duration,
    pub sales_lines: usize,
    pub return_lines: usize,
    pub average_file_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyFileInfo {
    pub day: NaiveDate,
    pub file_name: String,
    pub size: u64,
    pub sales: usize,
    pub returns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveInfo {
    pub file_name: String,
    pub size: u64,
    pub md5: String,
    pub entry_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadInfo {
    pub guid: String,
    pub server_md5: String,
    pub md5_matches: bool,
}

/// What the run was configured with; credentials never go in here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub database: String,
    pub branch: u32,
    pub output_directory: String,
    pub establishment_code: String,
    pub upload_enabled: bool,
    pub validation_enabled: bool,
}

impl From<&DailyFile> for DailyFileInfo {
    fn from(file: &DailyFile) -> Self {
        Self {
            day: file.day,
            file_name: file.file_name.clone(),
            size: file.size,
            sales: file.sales,
            returns: file.returns,
        }
    }
}

impl From<&Archive> for ArchiveInfo {
    fn from(archive: &Archive) -> Self {
        Self {
            file_name: archive.file_name.clone(),
            size: archive.size,
            md5: archive.md5.clone(),
            entry_count: archive.entries.len(),
        }
    }
}

/// Writes the run report next to the extracts: machine-readable JSON and a
/// plain text rendering under `.iqviafeed/`, plus a markdown summary at the
/// top of the output directory.
pub struct ReportWriter {
    output_directory: PathBuf,
}

impl ReportWriter {
    pub fn new<P: Into<PathBuf>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.into(),
        }
    }

    /// Creates the output and metadata directories and probes for write
    /// permission before any extraction work starts.
    pub fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.output_directory)?;

        let probe = self.output_directory.join(".iqviafeed_write_test");
        match fs::File::create(&probe) {
            Ok(_) => {
                let _ = fs::remove_file(&probe);
            }
            Err(e) => {
                return Err(FeedError::Permission {
                    path: format!(
                        "No write permission for directory {}: {}",
                        self.output_directory.display(),
                        e
                    ),
                });
            }
        }

        fs::create_dir_all(self.metadata_dir())?;
        Ok(())
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.output_directory.join(".iqviafeed")
    }

    pub fn create_run_report(
        &self,
        client: &str,
        period: Period,
        progress: &ExtractProgress,
        archive: Option<&Archive>,
        upload: Option<UploadInfo>,
        config: &ConfigSnapshot,
    ) -> Result<RunReport> {
        let report = RunReport {
            client: client.to_string(),
            period_start: period.start(),
            period_end: period.end(),
            generated_at: Utc::now(),
            summary: build_summary(progress),
            files: progress.files.iter().map(DailyFileInfo::from).collect(),
            archive: archive.map(ArchiveInfo::from),
            upload,
            warnings: progress.warnings.clone(),
            config_used: config.clone(),
        };

        self.save_report_json(&report)?;
        self.save_report_text(&report)?;
        self.save_summary_file(&report)?;

        Ok(report)
    }

    fn save_report_json(&self, report: &RunReport) -> Result<()> {
        let report_path = self.metadata_dir().join("run_report.json");
        let json_content = serde_json::to_string_pretty(report).map_err(|e| FeedError::Config {
            message: format!("Failed to serialize run report to JSON: {}", e),
        })?;

        fs::write(&report_path, json_content)?;
        Ok(())
    }

    fn save_report_text(&self, report: &RunReport) -> Result<()> {
        let report_path = self.metadata_dir().join("run_report.txt");
        let mut file = fs::File::create(&report_path)?;

        writeln!(file, "IqviaFeed Run Report")?;
        writeln!(file, "====================")?;
        writeln!(file)?;

        writeln!(file, "Client: {}", report.client)?;
        writeln!(
            file,
            "Period: {}..{}",
            report.period_start, report.period_end
        )?;
        writeln!(file, "Branch: {}", report.config_used.branch)?;
        writeln!(file)?;

        writeln!(file, "Run summary:")?;
        writeln!(
            file,
            "  Generated at: {}",
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(file, "  Duration: {:?}", report.summary.duration)?;
        writeln!(file, "  Days processed: {}", report.summary.days_processed)?;
        writeln!(
            file,
            "  Bytes written: {} ({})",
            report.summary.total_bytes,
            format_bytes(report.summary.total_bytes)
        )?;
        writeln!(file, "  Sales lines: {}", report.summary.sales_lines)?;
        writeln!(file, "  Return lines: {}", report.summary.return_lines)?;
        writeln!(
            file,
            "  Average file size: {} ({})",
            report.summary.average_file_size,
            format_bytes(report.summary.average_file_size)
        )?;
        writeln!(file)?;

        writeln!(file, "Daily files:")?;
        for info in &report.files {
            writeln!(
                file,
                "  {} ({}) - {} sales, {} returns",
                info.file_name,
                format_bytes(info.size),
                info.sales,
                info.returns
            )?;
        }
        writeln!(file)?;

        if let Some(ref archive) = report.archive {
            writeln!(file, "Archive:")?;
            writeln!(file, "  Name: {}", archive.file_name)?;
            writeln!(
                file,
                "  Size: {} ({})",
                archive.size,
                format_bytes(archive.size)
            )?;
            writeln!(file, "  MD5: {}", archive.md5)?;
            writeln!(file, "  Entries: {}", archive.entry_count)?;
            writeln!(file)?;
        }

        if let Some(ref upload) = report.upload {
            writeln!(file, "Upload:")?;
            writeln!(file, "  GUID: {}", upload.guid)?;
            writeln!(file, "  Server MD5: {}", upload.server_md5)?;
            writeln!(file, "  MD5 matches: {}", upload.md5_matches)?;
            writeln!(file)?;
        }

        if !report.warnings.is_empty() {
            writeln!(file, "Warnings:")?;
            for warning in &report.warnings {
                writeln!(file, "  - {}", warning)?;
            }
            writeln!(file)?;
        }

        writeln!(file, "Configuration used:")?;
        writeln!(file, "  Database: {}", report.config_used.database)?;
        writeln!(file, "  Branch: {}", report.config_used.branch)?;
        writeln!(
            file,
            "  Output directory: {}",
            report.config_used.output_directory
        )?;
        writeln!(
            file,
            "  Establishment code: {}",
            report.config_used.establishment_code
        )?;
        writeln!(
            file,
            "  Upload enabled: {}",
            report.config_used.upload_enabled
        )?;
        writeln!(
            file,
            "  Validation enabled: {}",
            report.config_used.validation_enabled
        )?;

        Ok(())
    }

    fn save_summary_file(&self, report: &RunReport) -> Result<()> {
        let summary_path = self.output_directory.join("RUN_SUMMARY.md");
        let mut file = fs::File::create(&summary_path)?;

        writeln!(file, "# Daily Extract Run Summary")?;
        writeln!(file)?;
        writeln!(file, "**Client:** {}", report.client)?;
        writeln!(
            file,
            "**Period:** {}..{}",
            report.period_start, report.period_end
        )?;
        writeln!(
            file,
            "**Generated:** {}",
            report.generated_at.format("%Y-%m-%d %H:%M UTC")
        )?;
        writeln!(file, "**Duration:** {:?}", report.summary.duration)?;
        writeln!(file)?;

        writeln!(file, "## Statistics")?;
        writeln!(file)?;
        writeln!(
            file,
            "- **Days processed:** {}",
            report.summary.days_processed
        )?;
        writeln!(
            file,
            "- **Total size:** {}",
            format_bytes(report.summary.total_bytes)
        )?;
        writeln!(file, "- **Sales lines:** {}", report.summary.sales_lines)?;
        writeln!(file, "- **Return lines:** {}", report.summary.return_lines)?;
        writeln!(file)?;

        if let Some(ref archive) = report.archive {
            writeln!(file, "## Archive")?;
            writeln!(file)?;
            writeln!(file, "- **File:** {}", archive.file_name)?;
            writeln!(file, "- **Size:** {}", format_bytes(archive.size))?;
            writeln!(file, "- **MD5:** `{}`", archive.md5)?;
            writeln!(file)?;
        }

        if let Some(ref upload) = report.upload {
            writeln!(file, "## Upload")?;
            writeln!(file)?;
            writeln!(file, "- **GUID:** `{}`", upload.guid)?;
            writeln!(
                file,
                "- **Server MD5 matches:** {}",
                if upload.md5_matches { "yes" } else { "no" }
            )?;
            writeln!(file)?;
        }

        if !report.warnings.is_empty() {
            writeln!(file, "## Issues Encountered")?;
            writeln!(file)?;
            for warning in &report.warnings {
                writeln!(file, "- {}", warning)?;
            }
            writeln!(file)?;
        }

        writeln!(file, "---")?;
        writeln!(file, "*Generated by IqviaFeed*")?;

        Ok(())
    }
}

fn build_summary(progress: &ExtractProgress) -> RunSummary {
    let sales_lines = progress.files.iter().map(|f| f.sales).sum();
    let return_lines = progress.files.iter().map(|f| f.returns).sum();
    let average_file_size = if progress.files.is_empty() {
        0
    } else {
        progress.bytes_written / progress.files.len() as u64
    };

    RunSummary {
        days_processed: progress.days_processed,
        total_bytes: progress.bytes_written,
        duration: progress.elapsed(),
        sales_lines,
        return_lines,
        average_file_size,
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
