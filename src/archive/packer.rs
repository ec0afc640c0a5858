use crate::error::{FeedError, Result};
use crate::extract::daily_file_name;
use crate::period::Period;
use md5::{Digest, Md5};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;

/// A packaged period, ready for upload.
#[derive(Debug, Clone)]
pub struct Archive {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub md5: String,
    pub entries: Vec<String>,
}

/// Bundles one file per day of the period into a single ZIP. The archive is
/// built in memory so its md5 can be taken from the exact bytes that reach
/// the disk.
pub struct PeriodPacker {
    client: String,
    force_overwrite: bool,
}

impl PeriodPacker {
    pub fn new<S: Into<String>>(client: S) -> Self {
        Self {
            client: client.into().trim().to_uppercase(),
            force_overwrite: false,
        }
    }

    pub fn with_force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    pub fn pack(&self, period: Period, output_dir: &Path) -> Result<Archive> {
        let mut entries: Vec<String> = period
            .days()
            .map(|day| daily_file_name(&self.client, day))
            .collect();
        // Day-stamped names already sort chronologically; the sort keeps the
        // entry order independent of how the list was built.
        entries.sort();

        for name in &entries {
            if !output_dir.join(name).exists() {
                return Err(FeedError::Packaging {
                    message: format!(
                        "daily file {} is missing; the archive must cover every day of {}",
                        name, period
                    ),
                });
            }
        }

        let file_name = archive_file_name(&self.client, period);
        let zip_path = output_dir.join(&file_name);
        if zip_path.exists() && !self.force_overwrite {
            return Err(FeedError::ArchiveExists {
                path: zip_path.display().to_string(),
            });
        }

        let bytes = self.build_zip(&entries, output_dir)?;
        let md5 = md5_hex(&bytes);
        let size = bytes.len() as u64;

        // Stage through a temp file in the same directory so a failed run
        // never leaves a half-written archive behind.
        let mut staged = NamedTempFile::new_in(output_dir)?;
        staged.write_all(&bytes)?;
        staged.persist(&zip_path).map_err(|e| FeedError::Io(e.error))?;

        Ok(Archive {
            path: zip_path,
            file_name,
            size,
            md5,
            entries,
        })
    }

    fn build_zip(&self, entries: &[String], output_dir: &Path) -> Result<Vec<u8>> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        // Fixed timestamp: the same daily files must produce the same archive
        // bytes, and therefore the same md5, on every rerun.
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(0o644);

        for name in entries {
            let content = fs::read(output_dir.join(name))?;
            zip.start_file(name.as_str(), options)?;
            zip.write_all(&content)?;
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

/// The period archive name, e.g. `U_ACME_20240101_20240103.zip`.
pub fn archive_file_name(client: &str, period: Period) -> String {
    format!(
        "U_{}_{}_{}.zip",
        client.to_uppercase(),
        period.start().format("%Y%m%d"),
        period.end().format("%Y%m%d")
    )
}

pub fn md5_hex(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn period() -> Period {
        Period::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        )
        .unwrap()
    }

    fn write_daily_files(dir: &Path) {
        for day in ["20240101", "20240102", "20240103"] {
            let name = format!("U_ACME_{}.json", day);
            fs::write(dir.join(name), format!("{{\"data\": \"{}\"}}", day)).unwrap();
        }
    }

    #[test]
    fn test_pack_bundles_every_day_sorted() {
        let out = TempDir::new().unwrap();
        write_daily_files(out.path());

        let archive = PeriodPacker::new("acme").pack(period(), out.path()).unwrap();

        assert_eq!(archive.file_name, "U_ACME_20240101_20240103.zip");
        assert!(archive.path.exists());
        assert_eq!(archive.size, fs::metadata(&archive.path).unwrap().len());
        assert_eq!(
            archive.entries,
            vec![
                "U_ACME_20240101.json",
                "U_ACME_20240102.json",
                "U_ACME_20240103.json",
            ]
        );

        let mut zip = zip::ZipArchive::new(fs::File::open(&archive.path).unwrap()).unwrap();
        assert_eq!(zip.len(), 3);
        assert_eq!(zip.by_index(0).unwrap().name(), "U_ACME_20240101.json");
    }

    #[test]
    fn test_missing_day_fails_without_archive() {
        let out = TempDir::new().unwrap();
        write_daily_files(out.path());
        fs::remove_file(out.path().join("U_ACME_20240102.json")).unwrap();

        let err = PeriodPacker::new("acme")
            .pack(period(), out.path())
            .unwrap_err();

        assert!(matches!(err, FeedError::Packaging { .. }));
        assert!(err.to_string().contains("U_ACME_20240102.json"));
        assert!(!out.path().join("U_ACME_20240101_20240103.zip").exists());
    }

    #[test]
    fn test_existing_archive_needs_force() {
        let out = TempDir::new().unwrap();
        write_daily_files(out.path());

        let packer = PeriodPacker::new("acme");
        packer.pack(period(), out.path()).unwrap();

        let err = packer.pack(period(), out.path()).unwrap_err();
        assert!(matches!(err, FeedError::ArchiveExists { .. }));

        PeriodPacker::new("acme")
            .with_force_overwrite(true)
            .pack(period(), out.path())
            .unwrap();
    }

    #[test]
    fn test_same_inputs_same_md5() {
        let out = TempDir::new().unwrap();
        write_daily_files(out.path());

        let first = PeriodPacker::new("acme").pack(period(), out.path()).unwrap();
        let second = PeriodPacker::new("acme")
            .with_force_overwrite(true)
            .pack(period(), out.path())
            .unwrap();

        assert_eq!(first.md5, second.md5);
        assert_eq!(first.md5.len(), 32);
        assert!(first.md5.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_md5_hex_known_value() {
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_archive_file_name_uppercases_client() {
        assert_eq!(
            archive_file_name("acme", period()),
            "U_ACME_20240101_20240103.zip"
        );
    }
}
