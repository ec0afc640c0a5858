pub mod queries;
pub mod warehouse;

pub use warehouse::{
    BranchRow, CustomerRow, DaySnapshot, ProductRow, ReceiptRow, ReturnRow, SaleRow, SalesSource,
    SqliteWarehouse, StockRow,
};

/// Reference DDL for the warehouse mirror this tool reads.
pub const MIRROR_SCHEMA: &str = include_str!("schema.sql");
