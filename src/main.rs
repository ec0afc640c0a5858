use clap::Parser;
use iqviafeed::{
    archive_file_name, daily_file_name, Cli, FeedError, IqviaFeed, OutputFormatter, OutputMode,
    Period, UserFriendlyError,
};
use std::process;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    let cli = Cli::parse();

    // Modes that short-circuit the pipeline
    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    // Create IqviaFeed instance
    let feed = match IqviaFeed::from_cli(&cli) {
        Ok(feed) => feed,
        Err(e) => {
            print_startup_error(&e);
            return 1;
        }
    };

    // One-shot delivery commands skip the extraction pipeline entirely
    if let Some(ref guid) = cli.status {
        return match feed.upload_status(guid).await {
            Ok(_) => 0,
            Err(e) => {
                feed.handle_error(&e);
                map_exit_code(&e)
            }
        };
    }

    if let Some(ref archive) = cli.resend {
        return match feed.resend(archive).await {
            Ok(_) => 0,
            Err(e) => {
                feed.handle_error(&e);
                map_exit_code(&e)
            }
        };
    }

    if cli.test_connection {
        return match feed.test_connectivity().await {
            Ok(()) => 0,
            Err(e) => {
                feed.handle_error(&e);
                map_exit_code(&e)
            }
        };
    }

    let period = match cli.effective_period() {
        Ok(period) => period,
        Err(e) => {
            feed.handle_error(&e);
            return 2;
        }
    };

    if cli.dry_run {
        return handle_dry_run(&cli, &feed, period);
    }

    // Execute main pipeline
    match feed.run_period(period, cli.force).await {
        Ok(report) => {
            feed.output_formatter().print_run_report(&report);

            if report.warnings.is_empty() {
                0
            } else {
                2 // finished, but with warnings worth surfacing
            }
        }
        Err(e) => {
            feed.handle_error(&e);
            map_exit_code(&e)
        }
    }
}

fn map_exit_code(error: &FeedError) -> i32 {
    match error {
        FeedError::Cancelled => 130, // Interrupted (SIGINT)
        FeedError::InvalidPeriod { .. } => 2,
        FeedError::Source { .. } => 3,
        FeedError::Extraction { .. } => 4,
        FeedError::Packaging { .. } => 5,
        FeedError::AuthenticationFailed { .. } => 6,
        FeedError::Upload { .. } | FeedError::Network { .. } => 7,
        FeedError::Permission { .. } => 8,
        FeedError::ArchiveExists { .. } => 9,
        FeedError::Timeout { .. } => 10,
        _ => 1,
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "iqviafeed.toml".to_string());

    match IqviaFeed::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  iqviafeed --config {}", config_path);
            println!("\nFill in client_id and client_secret under [delivery] before enabling uploads.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(cli: &Cli, feed: &IqviaFeed, period: Period) -> i32 {
    let formatter = feed.output_formatter();

    formatter.start_operation("Dry run - nothing will be written or uploaded");
    formatter.print_separator();

    let config = feed.config();
    let client = config.file_client();

    if !config.source.database.exists() {
        formatter.error(&format!(
            "Warehouse database not found: {}",
            config.source.database.display()
        ));
        return 1;
    }
    formatter.success(&format!(
        "Warehouse database found: {}",
        config.source.database.display()
    ));

    println!("Run plan:");
    println!("  Client: {}", client);
    println!("  Period: {} ({} days)", period, period.day_count());
    println!("  Branch: {}", config.source.branch);
    println!("  Output directory: {}", config.output.directory.display());
    println!("  Archive: {}", archive_file_name(&client, period));
    println!(
        "  Upload: {}",
        if config.delivery.upload_by_default {
            "yes"
        } else {
            "no"
        }
    );
    println!(
        "  Validation: {}",
        if config.validation.enabled { "yes" } else { "no" }
    );

    println!("  Daily files:");
    for day in period.days() {
        println!("    {}", daily_file_name(&client, day));
    }

    if cli.force {
        formatter.warning("Force mode enabled - would overwrite an existing archive");
    }

    formatter.print_separator();
    formatter.success("Dry run completed successfully");
    formatter.info("Run without --dry-run to perform the extraction");

    0
}

fn print_startup_error(error: &FeedError) {
    // Config may not have loaded yet, so build a bare formatter.
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use iqviafeed::{Config, OutputFormat};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn base_cli() -> Cli {
        Cli {
            from: None,
            to: None,
            output: None,
            config: None,
            branch: None,
            upload: false,
            no_upload: false,
            validate: false,
            sample: None,
            timeout: None,
            output_format: OutputFormat::Plain,
            verbose: 0,
            quiet: true,
            force: false,
            dry_run: false,
            generate_config: false,
            resend: None,
            status: None,
            test_connection: false,
        }
    }

    #[test]
    fn test_generate_config_command() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let mut cli = base_cli();
        cli.config = Some(config_path.clone());
        cli.generate_config = true;

        let exit_code = handle_generate_config(&cli);
        assert_eq!(exit_code, 0);
        assert!(config_path.exists());

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[delivery]"));
    }

    #[test]
    fn test_dry_run_mode() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("warehouse.db");
        fs::write(&db_path, b"").unwrap();

        let mut config = Config::default();
        config.delivery.client_id = "acme".to_string();
        config.source.database = db_path;

        let feed = IqviaFeed::new(config, OutputMode::Plain, 0, true).unwrap();

        let mut cli = base_cli();
        cli.from = Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        cli.to = Some(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        cli.dry_run = true;

        let period = cli.effective_period().unwrap();
        let exit_code = handle_dry_run(&cli, &feed, period);
        assert_eq!(exit_code, 0);

        // Missing database fails the dry run
        let mut config = Config::default();
        config.delivery.client_id = "acme".to_string();
        config.source.database = PathBuf::from("/definitely/not/warehouse.db");
        let feed = match IqviaFeed::new(config, OutputMode::Plain, 0, true) {
            Ok(feed) => feed,
            Err(_) => return, // signal handler already taken elsewhere
        };
        assert_eq!(handle_dry_run(&cli, &feed, period), 1);
    }

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(map_exit_code(&FeedError::Cancelled), 130);
        assert_eq!(
            map_exit_code(&FeedError::InvalidPeriod {
                message: "bad".to_string()
            }),
            2
        );
        assert_eq!(
            map_exit_code(&FeedError::Packaging {
                message: "missing day".to_string()
            }),
            5
        );
        assert_eq!(
            map_exit_code(&FeedError::AuthenticationFailed {
                client_id: "acme".to_string()
            }),
            6
        );
        assert_eq!(
            map_exit_code(&FeedError::Upload {
                message: "HTTP 500".to_string()
            }),
            7
        );
        assert_eq!(
            map_exit_code(&FeedError::ArchiveExists {
                path: "a.zip".to_string()
            }),
            9
        );
        assert_eq!(
            map_exit_code(&FeedError::Timeout {
                message: "no answer".to_string()
            }),
            10
        );
        assert_eq!(
            map_exit_code(&FeedError::Config {
                message: "bad".to_string()
            }),
            1
        );
    }
}
