use crate::error::{FeedError, Result};
use crate::extract::payload::build_daily_record;
use crate::layout::{validate_record, LayoutSpec};
use crate::period::Period;
use crate::source::SalesSource;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// At most this many layout discrepancies are reported per day; a broken
/// payload tends to repeat the same mistake on every list item.
const MAX_DISCREPANCIES_PER_DAY: usize = 200;

#[derive(Debug, Clone)]
pub struct ExtractProgress {
    pub days_processed: usize,
    pub total_days: usize,
    pub bytes_written: u64,
    pub current_day: Option<NaiveDate>,
    pub start_time: Instant,
    pub files: Vec<DailyFile>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DailyFile {
    pub day: NaiveDate,
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
    pub sales: usize,
    pub returns: usize,
}

impl ExtractProgress {
    pub fn new(total_days: usize) -> Self {
        Self {
            days_processed: 0,
            total_days,
            bytes_written: 0,
            current_day: None,
            start_time: Instant::now(),
            files: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn record_file(&mut self, file: DailyFile) {
        self.days_processed += 1;
        self.bytes_written += file.size;
        self.files.push(file);
    }

    pub fn add_warning<S: Into<String>>(&mut self, warning: S) {
        self.warnings.push(warning.into());
    }

    pub fn percentage(&self) -> f64 {
        if self.total_days == 0 {
            0.0
        } else {
            (self.days_processed as f64 / self.total_days as f64) * 100.0
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Walks a period day by day, turning each warehouse snapshot into one
/// DataEntry JSON file on disk.
pub struct DayGenerator {
    client: String,
    iqvia_code: String,
    pretty_json: bool,
    layout: Option<LayoutSpec>,
    progress_callback: Option<Box<dyn Fn(&ExtractProgress) + Send + Sync>>,
    running: Arc<AtomicBool>,
}

impl DayGenerator {
    pub fn new<S: Into<String>>(client: S, iqvia_code: S) -> Self {
        Self {
            client: client.into().trim().to_uppercase(),
            iqvia_code: iqvia_code.into(),
            pretty_json: true,
            layout: None,
            progress_callback: None,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn with_pretty_json(mut self, pretty: bool) -> Self {
        self.pretty_json = pretty;
        self
    }

    pub fn with_layout(mut self, layout: LayoutSpec) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ExtractProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Share an externally owned flag (a signal handler's, usually) so a
    /// Ctrl+C stops the run at the next day boundary.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.running = flag;
        self
    }

    pub fn cancel(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn generate(
        &self,
        source: &dyn SalesSource,
        period: Period,
        output_dir: &Path,
    ) -> Result<ExtractProgress> {
        let mut progress = ExtractProgress::new(period.day_count() as usize);

        if !output_dir.exists() {
            fs::create_dir_all(output_dir)?;
        }

        for day in period.days() {
            if !self.is_running() {
                return Err(FeedError::Cancelled);
            }

            progress.current_day = Some(day);
            if let Some(ref callback) = self.progress_callback {
                callback(&progress);
            }

            let snapshot = source.fetch_day(day).map_err(|e| FeedError::Extraction {
                day,
                message: e.to_string(),
            })?;
            if snapshot.movement_count() == 0 {
                progress.add_warning(format!("{}: no sales or returns recorded", day));
            }

            let record = build_daily_record(day, &self.iqvia_code, &snapshot);

            if let Some(ref layout) = self.layout {
                let value = serde_json::to_value(&record).map_err(|e| {
                    FeedError::Extraction {
                        day,
                        message: format!("serializing payload: {}", e),
                    }
                })?;
                for discrepancy in validate_record(&value, layout)
                    .into_iter()
                    .take(MAX_DISCREPANCIES_PER_DAY)
                {
                    progress.add_warning(format!("{}: {}", day, discrepancy));
                }
            }

            // Field order is part of the layout, so the struct is serialized
            // directly instead of going through a Value.
            let json = if self.pretty_json {
                serde_json::to_string_pretty(&record)
            } else {
                serde_json::to_string(&record)
            }
            .map_err(|e| FeedError::Extraction {
                day,
                message: format!("serializing payload: {}", e),
            })?;

            let file_name = daily_file_name(&self.client, day);
            let path = output_dir.join(&file_name);
            fs::write(&path, &json).map_err(|e| FeedError::Extraction {
                day,
                message: format!("writing {}: {}", file_name, e),
            })?;

            progress.record_file(DailyFile {
                day,
                file_name,
                path,
                size: json.len() as u64,
                sales: snapshot.sales.len(),
                returns: snapshot.returns.len(),
            });

            if let Some(ref callback) = self.progress_callback {
                callback(&progress);
            }
        }

        progress.current_day = None;
        Ok(progress)
    }
}

/// One day's file name, e.g. `U_ACME_20240102.json`.
pub fn daily_file_name(client: &str, day: NaiveDate) -> String {
    format!("U_{}_{}.json", client.to_uppercase(), day.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{DaySnapshot, SaleRow};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FakeSource {
        fail_on: Option<NaiveDate>,
    }

    impl SalesSource for FakeSource {
        fn fetch_day(&self, day: NaiveDate) -> crate::error::Result<DaySnapshot> {
            if self.fail_on == Some(day) {
                return Err(FeedError::Source {
                    message: "simulated outage".to_string(),
                    source: rusqlite::Error::QueryReturnedNoRows,
                });
            }
            Ok(DaySnapshot {
                sales: vec![SaleRow {
                    customer_code: 10,
                    product_code: 100,
                    quantity: 1,
                    unit_price: Some(9.9),
                    list_price: Some(9.9),
                    is_gift: false,
                    invoice_series: Some(1),
                    invoice_number: Some(1),
                    nfe_key: None,
                    icms_rate: None,
                    icms_amount: None,
                    cst: None,
                }],
                returns: Vec::new(),
                branches: Vec::new(),
                customers: Vec::new(),
                products: Vec::new(),
                stock: Vec::new(),
                receipts: HashMap::new(),
            })
        }

        fn version(&self) -> crate::error::Result<String> {
            Ok("fake".to_string())
        }
    }

    fn period() -> Period {
        Period::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_generates_one_file_per_day() {
        let out = TempDir::new().unwrap();
        let generator = DayGenerator::new("acme", "0892");

        let progress = generator
            .generate(&FakeSource { fail_on: None }, period(), out.path())
            .unwrap();

        assert_eq!(progress.days_processed, 3);
        assert_eq!(progress.percentage(), 100.0);
        assert!(out.path().join("U_ACME_20240101.json").exists());
        assert!(out.path().join("U_ACME_20240102.json").exists());
        assert!(out.path().join("U_ACME_20240103.json").exists());
    }

    #[test]
    fn test_failed_day_stops_the_run() {
        let out = TempDir::new().unwrap();
        let generator = DayGenerator::new("acme", "0892");
        let source = FakeSource {
            fail_on: NaiveDate::from_ymd_opt(2024, 1, 2),
        };

        let err = generator.generate(&source, period(), out.path()).unwrap_err();

        match err {
            FeedError::Extraction { day, .. } => {
                assert_eq!(day, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
            }
            other => panic!("expected an extraction error, got {:?}", other),
        }
        assert!(out.path().join("U_ACME_20240101.json").exists());
        assert!(!out.path().join("U_ACME_20240102.json").exists());
        assert!(!out.path().join("U_ACME_20240103.json").exists());
    }

    #[test]
    fn test_cancelled_before_first_day() {
        let out = TempDir::new().unwrap();
        let generator = DayGenerator::new("acme", "0892");
        generator.cancel();

        let err = generator
            .generate(&FakeSource { fail_on: None }, period(), out.path())
            .unwrap_err();

        assert!(matches!(err, FeedError::Cancelled));
        assert!(!generator.is_running());
    }

    #[test]
    fn test_shared_flag_stops_the_run() {
        let out = TempDir::new().unwrap();
        let flag = Arc::new(AtomicBool::new(false));
        let generator = DayGenerator::new("acme", "0892").with_cancel_flag(flag);

        let err = generator
            .generate(&FakeSource { fail_on: None }, period(), out.path())
            .unwrap_err();

        assert!(matches!(err, FeedError::Cancelled));
    }

    #[test]
    fn test_progress_callback_sees_every_day() {
        let out = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_callback = seen.clone();

        let generator = DayGenerator::new("acme", "0892").with_progress(move |progress| {
            if let Some(day) = progress.current_day {
                seen_in_callback.lock().unwrap().push(day);
            }
        });

        generator
            .generate(&FakeSource { fail_on: None }, period(), out.path())
            .unwrap();

        let days: Vec<NaiveDate> = seen.lock().unwrap().clone();
        assert!(days.contains(&NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert!(days.contains(&NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()));
    }

    #[test]
    fn test_compact_output_has_no_newlines() {
        let out = TempDir::new().unwrap();
        let generator = DayGenerator::new("acme", "0892").with_pretty_json(false);

        generator
            .generate(
                &FakeSource { fail_on: None },
                Period::new(
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                )
                .unwrap(),
                out.path(),
            )
            .unwrap();

        let content = fs::read_to_string(out.path().join("U_ACME_20240101.json")).unwrap();
        assert!(!content.contains('\n'));
    }

    #[test]
    fn test_daily_file_name() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(daily_file_name("acme", day), "U_ACME_20240307.json");
        assert_eq!(daily_file_name("ACME", day), "U_ACME_20240307.json");
    }
}
