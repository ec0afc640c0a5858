pub mod fields;
pub mod generator;
pub mod payload;

pub use generator::{daily_file_name, DailyFile, DayGenerator, ExtractProgress};
pub use payload::{build_daily_record, DailyRecord};
