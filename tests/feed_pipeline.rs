//! Pipeline tests against a seeded warehouse mirror: extraction through
//! packaging and reporting, delivery against a mock DataEntry server, and
//! smoke tests of the installed binary.

use assert_cmd::Command;
use chrono::NaiveDate;
use httpmock::prelude::*;
use iqviafeed::source::MIRROR_SCHEMA;
use iqviafeed::{
    md5_hex, run_extract_simple, Config, DayGenerator, DeliveryClient, DeliveryConfig, Period,
    PeriodPacker, SourceConfig, SqliteWarehouse,
};
use predicates::str::contains;
use rusqlite::Connection;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Three days of business: two sales on the 1st, a sale and a return on the
/// 2nd, nothing on the 3rd. Product 101 has no catalog EAN and relies on its
/// newest inbound receipt.
fn seed_warehouse(db_path: &Path) -> anyhow::Result<()> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch(MIRROR_SCHEMA)?;
    conn.execute_batch(
        r#"
        INSERT INTO branches VALUES
            (1, '12345678000195', 'Farma Demo Ltda', 'Farma Demo', '11987654321',
             'Rua das Flores, 100', '01310100', 'Sao Paulo', 'SP');
        INSERT INTO customers VALUES
            (10, '98765432000188', 'Drogaria Central Ltda', 'Drogaria Central',
             '1133334444', 'Av. Paulista, 900', '01311000', 'Sao Paulo', 'SP'),
            (11, '32165498701', 'Maria Souza', NULL,
             NULL, 'Rua B, 23', '04567000', 'Sao Paulo', 'SP');
        INSERT INTO products VALUES
            (100, '7891234567895', '30049099', 'Dipirona 500mg 20cp', 'Lab Demo', 12.50),
            (101, NULL, '30049010', 'Amoxicilina 500mg', 'Lab Demo', 0.0);
        INSERT INTO sales VALUES
            ('2024-01-01', 1, 10, 100, 3, 10.00, 12.50, 0, 1, 5001,
             '35240112345678000195550010000050011000050017', 18.0, 5.40, '60'),
            ('2024-01-01', 1, 11, 101, 1, 0.00, 31.00, 1, 1, 5002, NULL, 0.0, 0.0, NULL),
            ('2024-01-02', 1, 10, 100, 2, 10.00, 12.50, 0, 1, 5003, NULL, 18.0, 3.60, '60');
        INSERT INTO sales_returns VALUES
            ('2024-01-02', 1, 10, 100, -1);
        INSERT INTO stock_levels VALUES
            (1, 100, 42.0),
            (1, 101, 7.0);
        INSERT INTO product_receipts VALUES
            ('2023-12-20', 101, '7899999999991', 28.00),
            ('2024-01-01', 101, '7899999999992', 30.00);
        "#,
    )?;
    Ok(())
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn three_day_period() -> Period {
    Period::new(date(2024, 1, 1), date(2024, 1, 3)).unwrap()
}

fn read_zip_entry(zip_path: &Path, entry_name: &str) -> anyhow::Result<Value> {
    let mut zip = zip::ZipArchive::new(fs::File::open(zip_path)?)?;
    let entry = zip.by_name(entry_name)?;
    Ok(serde_json::from_reader(entry)?)
}

/// The one test that builds a full IqviaFeed; it owns this process's signal
/// handler registration.
#[tokio::test]
async fn test_full_period_run_produces_archive_and_reports() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let db_path = temp.path().join("warehouse.db");
    let out_dir = temp.path().join("out");
    seed_warehouse(&db_path)?;

    let report = run_extract_simple(&db_path, "acme", three_day_period(), Some(&out_dir)).await?;

    assert_eq!(report.client, "ACME");
    assert_eq!(report.summary.days_processed, 3);
    assert_eq!(report.summary.sales_lines, 3);
    assert_eq!(report.summary.return_lines, 1);
    assert_eq!(report.files.len(), 3);
    assert_eq!(report.files[0].file_name, "U_ACME_20240101.json");
    assert!(report.upload.is_none());
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("2024-01-03") && w.contains("no sales or returns")));

    let archive = report.archive.as_ref().unwrap();
    assert_eq!(archive.file_name, "U_ACME_20240101_20240103.zip");
    assert_eq!(archive.entry_count, 3);

    let archive_path = out_dir.join(&archive.file_name);
    assert!(archive_path.exists());
    assert_eq!(md5_hex(&fs::read(&archive_path)?), archive.md5);

    let day_one = read_zip_entry(&archive_path, "U_ACME_20240101.json")?;
    assert_eq!(day_one["data"], "2024-01-01");
    assert_eq!(day_one["vendas"].as_array().unwrap().len(), 2);
    assert_eq!(day_one["estabelecimentos"][0]["codIqvia"], "0000");
    // EAN for product 101 resolved from its newest receipt
    assert!(day_one["produtos"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["eanSellOut"] == "7899999999992"));

    let day_three = read_zip_entry(&archive_path, "U_ACME_20240103.json")?;
    assert_eq!(day_three["vendas"], json!([]));

    assert!(out_dir.join("RUN_SUMMARY.md").exists());
    let saved: Value = serde_json::from_str(&fs::read_to_string(
        out_dir.join(".iqviafeed").join("run_report.json"),
    )?)?;
    assert_eq!(saved["client"], "ACME");
    assert_eq!(saved["archive"]["md5"], archive.md5.as_str());
    Ok(())
}

#[test]
fn test_rebuilt_archive_keeps_its_md5() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let db_path = temp.path().join("warehouse.db");
    seed_warehouse(&db_path)?;

    let source_config = SourceConfig {
        database: db_path,
        ..SourceConfig::default()
    };

    let mut archives = Vec::new();
    for dir_name in ["first", "second"] {
        let out_dir = temp.path().join(dir_name);
        let warehouse = SqliteWarehouse::open(&source_config)?;

        let progress =
            DayGenerator::new("acme", "0892").generate(&warehouse, three_day_period(), &out_dir)?;
        assert_eq!(progress.files.len(), 3);
        assert!(progress
            .warnings
            .iter()
            .any(|w| w.starts_with("2024-01-03")));

        archives.push(PeriodPacker::new("acme").pack(three_day_period(), &out_dir)?);
    }

    assert_eq!(archives[0].md5, archives[1].md5);
    assert_eq!(archives[0].entries, archives[1].entries);
    Ok(())
}

#[tokio::test]
async fn test_packed_archive_round_trips_through_mock_delivery() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let db_path = temp.path().join("warehouse.db");
    let out_dir = temp.path().join("out");
    seed_warehouse(&db_path)?;

    let source_config = SourceConfig {
        database: db_path,
        ..SourceConfig::default()
    };
    let warehouse = SqliteWarehouse::open(&source_config)?;
    let period = Period::new(date(2024, 1, 1), date(2024, 1, 1))?;

    DayGenerator::new("acme", "0892").generate(&warehouse, period, &out_dir)?;
    let archive = PeriodPacker::new("acme").pack(period, &out_dir)?;
    let bytes = fs::read(&archive.path)?;

    let server = MockServer::start_async().await;
    let token_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/token");
            then.status(200).json_body(json!({"access_token": "a.b.c"}));
        })
        .await;
    let upload_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/dataentry/upload")
                .header("authorization", "Bearer a.b.c")
                .body_contains("filename=\"U_ACME_20240101_20240101.zip\"");
            then.status(200).json_body(json!({
                "guid": "feed-42",
                "md5": archive.md5.to_uppercase(),
            }));
        })
        .await;
    let status_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/dataentry/status/feed-42");
            then.status(200).json_body(json!({"status": "processed"}));
        })
        .await;

    let delivery_config = DeliveryConfig {
        client_id: "acme".to_string(),
        client_secret: "s3cret".to_string(),
        token_url: server.url("/token"),
        upload_url: server.url("/dataentry/upload"),
        ..DeliveryConfig::default()
    };
    let client = DeliveryClient::new(&delivery_config)?;

    let token = client.authenticate().await?;
    let receipt = client.upload(&archive.file_name, bytes, &token).await?;
    assert_eq!(receipt.guid, "feed-42");
    assert_eq!(receipt.md5_matches(&archive.md5), Some(true));

    let status = client.check_status(&receipt.guid, &token).await?;
    assert_eq!(status["status"], "processed");

    token_mock.assert_async().await;
    upload_mock.assert_async().await;
    status_mock.assert_async().await;
    Ok(())
}

#[test]
fn test_cli_help_mentions_the_period_flags() {
    Command::cargo_bin("iqviafeed")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("--from"))
        .stdout(contains("--to"))
        .stdout(contains("--dry-run"))
        .stdout(contains("--resend"));
}

#[test]
fn test_cli_generate_config_writes_sample_file() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let config_path = temp.path().join("iqviafeed.toml");

    Command::cargo_bin("iqviafeed")?
        .arg("--generate-config")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(contains("Generated sample configuration"));

    let content = fs::read_to_string(&config_path)?;
    assert!(content.contains("[delivery]"));
    assert!(content.contains("[source]"));
    // Credentials ship empty; operators fill them in
    assert!(content.contains("client_secret = \"\""));
    Ok(())
}

fn write_run_config(temp: &TempDir, db_path: &Path, out_dir: &Path) -> anyhow::Result<PathBuf> {
    let mut config = Config::default();
    config.delivery.client_id = "acme".to_string();
    config.source.database = db_path.to_path_buf();
    config.output.directory = out_dir.to_path_buf();

    let config_path = temp.path().join("run.toml");
    config.save_to_file(&config_path)?;
    Ok(config_path)
}

#[test]
fn test_cli_dry_run_names_the_archive_without_writing() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let db_path = temp.path().join("warehouse.db");
    let out_dir = temp.path().join("out");
    seed_warehouse(&db_path)?;
    let config_path = write_run_config(&temp, &db_path, &out_dir)?;

    Command::cargo_bin("iqviafeed")?
        .args(["--from", "2024-01-01", "--to", "2024-01-03"])
        .arg("--dry-run")
        .arg("--quiet")
        .args(["--output-format", "plain"])
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(contains("U_ACME_20240101_20240103.zip"))
        .stdout(contains("U_ACME_20240102.json"));

    assert!(!out_dir.exists());
    Ok(())
}

#[test]
fn test_cli_full_run_exits_two_on_warnings() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let db_path = temp.path().join("warehouse.db");
    let out_dir = temp.path().join("out");
    seed_warehouse(&db_path)?;
    let config_path = write_run_config(&temp, &db_path, &out_dir)?;

    // The empty third day downgrades success to exit code 2
    Command::cargo_bin("iqviafeed")?
        .args(["--from", "2024-01-01", "--to", "2024-01-03"])
        .arg("--quiet")
        .args(["--output-format", "plain"])
        .arg("--config")
        .arg(&config_path)
        .assert()
        .code(2);

    assert!(out_dir.join("U_ACME_20240101_20240103.zip").exists());
    assert!(out_dir.join("RUN_SUMMARY.md").exists());
    Ok(())
}
