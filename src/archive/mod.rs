pub mod packer;
pub mod report;

pub use packer::{archive_file_name, md5_hex, Archive, PeriodPacker};
pub use report::{ConfigSnapshot, ReportWriter, RunReport, UploadInfo};
