pub mod cli;
pub mod config;
pub mod error;
pub mod period;
pub mod source;
pub mod extract;
pub mod archive;
pub mod delivery;
pub mod layout;
pub mod ui;

pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, DeliveryConfig, OutputConfig, SourceConfig, ValidationConfig};
pub use error::{FeedError, Result, UserFriendlyError};

pub use archive::{
    archive_file_name, md5_hex, Archive, ConfigSnapshot, PeriodPacker, ReportWriter, RunReport,
    UploadInfo,
};
pub use delivery::{DeliveryClient, UploadReceipt};
pub use extract::{daily_file_name, DailyFile, DayGenerator, ExtractProgress};
pub use layout::LayoutSpec;
pub use period::Period;
pub use source::{SalesSource, SqliteWarehouse};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use crate::ui::{OperationProgress, ProgressAwareOutput};
use std::path::Path;
use tokio::task;

/// Main library interface for the daily extract pipeline
pub struct IqviaFeed {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl IqviaFeed {
    /// Create a new IqviaFeed instance with the provided configuration
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        })
    }

    /// Create a new IqviaFeed instance for testing (no signal handler conflicts)
    #[cfg(test)]
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet);
        let shutdown = GracefulShutdown::new_for_test();

        Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        }
    }

    /// Create IqviaFeed instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            crate::cli::OutputFormat::Human => OutputMode::Human,
            crate::cli::OutputFormat::Json => OutputMode::Json,
            crate::cli::OutputFormat::Plain => OutputMode::Plain,
        };

        Self::new(config, output_mode, cli_args.verbose, cli_args.quiet)
    }

    /// Run the whole pipeline for one period: extract a file per day,
    /// package the period archive and, when enabled, upload it.
    pub async fn run_period(&self, period: Period, force: bool) -> Result<RunReport> {
        self.shutdown.check_shutdown()?;

        self.output_formatter.start_operation(&format!(
            "Starting {} daily extract for {}",
            self.config.file_client(),
            period
        ));

        let layout = if self.config.validation.enabled {
            let sample = self
                .config
                .validation
                .sample_path
                .as_deref()
                .filter(|p| !p.as_os_str().is_empty());
            Some(LayoutSpec::load(sample)?)
        } else {
            None
        };

        // Step 1: Prepare the output directory
        let writer = ReportWriter::new(self.config.output.directory.clone());
        writer.initialize()?;
        self.output_formatter.debug(&format!(
            "Output directory ready: {}",
            writer.output_directory().display()
        ));

        // Step 2: Open the warehouse mirror
        let warehouse = SqliteWarehouse::open(&self.config.source)?;
        self.output_formatter.debug(&warehouse.version()?);

        // Step 3: Build the delivery client up front so credential problems
        // surface before hours of extraction work.
        let delivery = if self.config.delivery.upload_by_default {
            Some(DeliveryClient::new(&self.config.delivery)?)
        } else {
            None
        };
        self.shutdown.check_shutdown()?;

        // Step 4: Generate one JSON file per day
        let mut progress = self
            .generate_daily_files(warehouse, period, layout, writer.output_directory())
            .await?;

        if !progress.warnings.is_empty() {
            let out = ProgressAwareOutput::new(&self.output_formatter, Some(&self.progress_manager));
            for warning in &progress.warnings {
                out.warning(warning);
            }
        }
        self.shutdown.check_shutdown()?;

        // Step 5: Package the period into a single archive
        let archive = self.package_period(period, writer.output_directory(), force)?;
        self.output_formatter.success(&format!(
            "Archive created: {} (md5 {})",
            archive.file_name, archive.md5
        ));

        // Step 6: Persist the run report before any upload attempt, so a
        // failed upload still leaves the archive and its paper trail behind.
        let config_snapshot = self.create_config_snapshot();
        let mut report = writer.create_run_report(
            &self.config.file_client(),
            period,
            &progress,
            Some(&archive),
            None,
            &config_snapshot,
        )?;

        // Step 7: Upload when enabled
        if let Some(ref client) = delivery {
            let receipt = match self.upload_archive(client, &archive).await {
                Ok(receipt) => receipt,
                Err(e) => {
                    self.output_formatter.warning(&format!(
                        "Archive kept at {}; upload can be retried with --resend",
                        archive.path.display()
                    ));
                    return Err(e);
                }
            };

            let md5_check = receipt.md5_matches(&archive.md5);
            if md5_check == Some(false) {
                let warning = format!(
                    "Server reported md5 {} but the local archive has {}",
                    receipt.md5, archive.md5
                );
                self.output_formatter.warning(&warning);
                progress.warnings.push(warning);
            }

            let upload_info = UploadInfo {
                guid: receipt.guid.clone(),
                server_md5: receipt.md5.clone(),
                md5_matches: md5_check.unwrap_or(true),
            };
            report = writer.create_run_report(
                &self.config.file_client(),
                period,
                &progress,
                Some(&archive),
                Some(upload_info),
                &config_snapshot,
            )?;

            self.output_formatter.print_upload_receipt(&receipt);
        }

        self.output_formatter.print_run_summary(&progress, Some(&archive));

        Ok(report)
    }

    /// Upload a previously packaged archive without regenerating anything
    pub async fn resend<P: AsRef<Path>>(&self, archive_path: P) -> Result<UploadReceipt> {
        let archive_path = archive_path.as_ref();

        let file_name = match archive_path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => {
                return Err(FeedError::InvalidPath {
                    path: archive_path.display().to_string(),
                });
            }
        };

        self.output_formatter
            .start_operation(&format!("Resending {}", file_name));

        let bytes = std::fs::read(archive_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FeedError::InvalidPath {
                    path: archive_path.display().to_string(),
                }
            } else {
                FeedError::Io(e)
            }
        })?;
        let local_md5 = md5_hex(&bytes);
        self.output_formatter
            .info(&format!("Local md5: {}", local_md5));

        let client = DeliveryClient::new(&self.config.delivery)?;
        let token = client.authenticate().await?;
        self.shutdown.check_shutdown()?;

        let operation = OperationProgress::new(&self.progress_manager, "Upload");
        operation.set_message(&format!("Sending {}...", file_name));
        let receipt = match client.upload(&file_name, bytes, &token).await {
            Ok(receipt) => {
                operation.finish_success();
                receipt
            }
            Err(e) => {
                operation.finish_error(&e.to_string());
                return Err(e);
            }
        };

        if receipt.md5_matches(&local_md5) == Some(false) {
            self.output_formatter.warning(&format!(
                "Server reported md5 {} but the local archive has {}",
                receipt.md5, local_md5
            ));
        }

        self.output_formatter.print_upload_receipt(&receipt);
        Ok(receipt)
    }

    /// Ask the delivery API how a previous upload is doing
    pub async fn upload_status(&self, guid: &str) -> Result<serde_json::Value> {
        self.output_formatter
            .start_operation(&format!("Checking status of upload {}", guid));

        let client = DeliveryClient::new(&self.config.delivery)?;
        let token = client.authenticate().await?;
        let status = client.check_status(guid, &token).await?;

        self.output_formatter.print_status_response(&status);
        Ok(status)
    }

    /// Probe the warehouse and the delivery API without touching any data
    pub async fn test_connectivity(&self) -> Result<()> {
        self.output_formatter
            .start_operation("Probing warehouse and delivery API");

        let warehouse = SqliteWarehouse::open(&self.config.source)?;
        let version = warehouse.version()?;
        self.output_formatter
            .success(&format!("Warehouse reachable ({})", version));

        if self.config.delivery.client_secret.trim().is_empty() {
            self.output_formatter
                .info("client_secret not configured; skipping the delivery API probe");
            return Ok(());
        }

        let client = DeliveryClient::new(&self.config.delivery)?;
        client.authenticate().await?;
        self.output_formatter
            .success("Delivery API issued an access token");

        Ok(())
    }

    /// Extract daily files with progress tracking
    async fn generate_daily_files(
        &self,
        warehouse: SqliteWarehouse,
        period: Period,
        layout: Option<LayoutSpec>,
        output_dir: &Path,
    ) -> Result<ExtractProgress> {
        self.output_formatter.start_operation("Extracting daily files");

        let day_bar = self.progress_manager.day_bar(period.day_count());
        let progress_callback = {
            let bar = day_bar.clone();
            move |progress: &ExtractProgress| bar.observe(progress)
        };

        let generator = DayGenerator::new(
            self.config.file_client(),
            self.config.delivery.establishment_code.trim().to_string(),
        )
        .with_pretty_json(self.config.output.pretty_json)
        .with_cancel_flag(self.shutdown.running_flag())
        .with_progress(progress_callback);

        let generator = if let Some(layout) = layout {
            generator.with_layout(layout)
        } else {
            generator
        };

        let output_dir = output_dir.to_path_buf();
        let progress = task::spawn_blocking(move || {
            generator.generate(&warehouse, period, &output_dir)
        })
        .await
        .map_err(|e| FeedError::Config {
            message: format!("Extraction task failed: {}", e),
        })??;

        day_bar.finish(
            &format!("Generated {} daily files", progress.days_processed),
            progress.elapsed(),
        );

        Ok(progress)
    }

    /// Bundle the period's daily files into the archive
    fn package_period(&self, period: Period, output_dir: &Path, force: bool) -> Result<Archive> {
        self.output_formatter.start_operation("Packaging period archive");

        let spinner = self.progress_manager.spinner("Bundling daily files...");
        let packer = PeriodPacker::new(self.config.file_client()).with_force_overwrite(force);
        let result = self
            .shutdown
            .with_shutdown_check(|| packer.pack(period, output_dir));

        match &result {
            Ok(archive) => spinner.finish_with_message(format!("Archive ready: {}", archive.file_name)),
            Err(_) => spinner.finish_and_clear(),
        }

        result
    }

    /// Send the archive, reporting progress around the two HTTP round trips
    async fn upload_archive(
        &self,
        client: &DeliveryClient,
        archive: &Archive,
    ) -> Result<UploadReceipt> {
        self.output_formatter
            .start_operation("Uploading archive to the delivery API");

        let bytes = std::fs::read(&archive.path)?;
        let operation = OperationProgress::new(&self.progress_manager, "Upload");

        operation.set_message("Requesting access token...");
        let token = match client.authenticate().await {
            Ok(token) => token,
            Err(e) => {
                operation.finish_error("could not obtain an access token");
                return Err(e);
            }
        };

        operation.set_message(&format!("Sending {}...", archive.file_name));
        match client.upload(&archive.file_name, bytes, &token).await {
            Ok(receipt) => {
                operation.finish_success();
                Ok(receipt)
            }
            Err(e) => {
                operation.finish_error(&e.to_string());
                Err(e)
            }
        }
    }

    /// Snapshot of the settings that shaped this run, for the report.
    fn create_config_snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            database: self.config.source.database.display().to_string(),
            branch: self.config.source.branch,
            output_directory: self.config.output.directory.display().to_string(),
            establishment_code: self.config.delivery.establishment_code.clone(),
            upload_enabled: self.config.delivery.upload_by_default,
            validation_enabled: self.config.validation.enabled,
        }
    }

    /// Write a commented starter configuration to `output_path`.
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)
            .map_err(|e| FeedError::Io(e))?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn progress_manager(&self) -> &ProgressManager {
        &self.progress_manager
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    pub fn handle_error(&self, error: &FeedError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Convenience function to run an extract-only period with minimal setup
pub async fn run_extract_simple(
    database: &Path,
    client_id: &str,
    period: Period,
    output_dir: Option<&Path>,
) -> Result<RunReport> {
    let mut config = Config::default();
    config.source.database = database.to_path_buf();
    config.delivery.client_id = client_id.to_string();

    if let Some(output_path) = output_dir {
        config.output.directory = output_path.to_path_buf();
    }

    config.validate()?;

    let feed = IqviaFeed::new(config, OutputMode::Plain, 0, true)?;
    feed.run_period(period, false).await
}

/// Parse a period from its two date strings
pub fn parse_period(from: &str, to: &str) -> Result<Period> {
    let start = cli::parse_flexible_date(from)
        .map_err(|message| FeedError::InvalidPeriod { message })?;
    let end = cli::parse_flexible_date(to)
        .map_err(|message| FeedError::InvalidPeriod { message })?;
    Period::new(start, end)
}
