use crate::config::{CliOverrides, Config};
use crate::error::{FeedError, Result};
use crate::period::Period;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "iqviafeed")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate and submit IQVIA DataEntry daily extracts")]
#[command(
    long_about = "IqviaFeed extracts one JSON payload per day from the sales warehouse, \
                       packages the period into a U_<CLIENT>_<START>_<END>.zip archive and \
                       optionally uploads it to the IQVIA DataEntry API."
)]
#[command(before_help = "💊 IqviaFeed - Daily Extract Pipeline")]
#[command(after_help = "EXAMPLES:\n  \
    iqviafeed\n  \
    iqviafeed --from 2024-01-01 --to 2024-01-03\n  \
    iqviafeed --from 01/01/2024 --to 03/01/2024 --upload\n  \
    iqviafeed --validate --sample layout_example.json\n  \
    iqviafeed --resend iqvia_out/U_ACME_20240101_20240103.zip\n  \
    iqviafeed --status 7f3a2b1c-0d4e-4f5a-9b6c-8d7e6f5a4b3c\n\n\
    Without --from/--to the period defaults to two days ago through yesterday.\n\
    For more information, visit: https://github.com/user/iqviafeed")]
pub struct Cli {
    /// Period start date (YYYY-MM-DD or DD/MM/YYYY)
    #[arg(long, value_name = "DATE", value_parser = parse_flexible_date, requires = "to")]
    pub from: Option<NaiveDate>,

    /// Period end date (YYYY-MM-DD or DD/MM/YYYY)
    #[arg(long, value_name = "DATE", value_parser = parse_flexible_date, requires = "from")]
    pub to: Option<NaiveDate>,

    /// Output directory for daily files and the archive
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// TOML configuration file to load
    #[arg(short, long, env = "IQVIAFEED_CONFIG", help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Branch code to extract
    #[arg(long, value_name = "CODE")]
    pub branch: Option<u32>,

    /// Upload the archive after packaging
    #[arg(long)]
    pub upload: bool,

    /// Skip the upload step even if the configuration enables it
    #[arg(long, conflicts_with = "upload")]
    pub no_upload: bool,

    /// Validate each daily payload against the layout description
    #[arg(long)]
    pub validate: bool,

    /// Reference sample JSON for layout validation (implies --validate)
    #[arg(long, value_name = "FILE")]
    pub sample: Option<PathBuf>,

    /// Upload timeout in seconds
    #[arg(long, help = "Timeout for the archive upload request (seconds)")]
    pub timeout: Option<u64>,

    /// How results are rendered
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Increase log detail (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print only errors and the final result
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Overwrite an existing archive and daily files
    #[arg(long, help = "Overwrite existing files in the output directory")]
    pub force: bool,

    /// Dry run (show the run plan without executing)
    #[arg(long, help = "Show what would be extracted without touching anything")]
    pub dry_run: bool,

    /// Write a starter configuration file and exit
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,

    /// Upload an existing archive and exit
    #[arg(long, value_name = "ARCHIVE")]
    pub resend: Option<PathBuf>,

    /// Query the processing status of a previous upload and exit
    #[arg(long, value_name = "GUID")]
    pub status: Option<String>,

    /// Probe the warehouse and the delivery API, then exit
    #[arg(long)]
    pub test_connection: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Colored terminal output
    Human,
    /// One JSON object per message
    Json,
    /// Uncolored plain lines
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_output_dir(self.output.clone())
            .with_branch(self.branch)
            .with_upload(self.upload_override())
            .with_validate(if self.validate { Some(true) } else { None })
            .with_sample(self.sample.clone())
            .with_upload_timeout(self.timeout)
    }

    /// --upload / --no-upload tri-state; None leaves the config value alone.
    pub fn upload_override(&self) -> Option<bool> {
        if self.upload {
            Some(true)
        } else if self.no_upload {
            Some(false)
        } else {
            None
        }
    }

    pub fn effective_period(&self) -> Result<Period> {
        match (self.from, self.to) {
            (Some(start), Some(end)) => Period::new(start, end),
            (None, None) => Ok(Period::default_recent()),
            _ => Err(FeedError::InvalidPeriod {
                message: "--from and --to must be given together".to_string(),
            }),
        }
    }

    pub fn should_use_colors(&self) -> bool {
        !self.quiet && console::Term::stdout().features().colors_supported()
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose > 0 && !self.quiet
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

pub fn parse_flexible_date(s: &str) -> std::result::Result<NaiveDate, String> {
    let s = s.trim();

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .map_err(|_| {
            format!(
                "'{}' is not a valid date. Use YYYY-MM-DD or DD/MM/YYYY.",
                s
            )
        })
}
