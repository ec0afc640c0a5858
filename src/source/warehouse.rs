use crate::config::SourceConfig;
use crate::error::{FeedError, Result};
use chrono::NaiveDate;
use rusqlite::{named_params, Connection, Row};
use std::collections::HashMap;
use std::time::Duration;

/// One day's worth of warehouse rows, everything the payload builder needs.
#[derive(Debug, Default)]
pub struct DaySnapshot {
    pub sales: Vec<SaleRow>,
    pub returns: Vec<ReturnRow>,
    pub branches: Vec<BranchRow>,
    pub customers: Vec<CustomerRow>,
    pub products: Vec<ProductRow>,
    pub stock: Vec<StockRow>,
    /// Newest inbound receipt per product code, the EAN/price fallback.
    pub receipts: HashMap<i64, ReceiptRow>,
}

impl DaySnapshot {
    pub fn movement_count(&self) -> usize {
        self.sales.len() + self.returns.len()
    }
}

#[derive(Debug, Clone)]
pub struct SaleRow {
    pub customer_code: i64,
    pub product_code: i64,
    pub quantity: i64,
    pub unit_price: Option<f64>,
    pub list_price: Option<f64>,
    pub is_gift: bool,
    pub invoice_series: Option<i64>,
    pub invoice_number: Option<i64>,
    pub nfe_key: Option<String>,
    pub icms_rate: Option<f64>,
    pub icms_amount: Option<f64>,
    pub cst: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReturnRow {
    pub customer_code: i64,
    pub product_code: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone)]
pub struct BranchRow {
    pub branch_code: i64,
    pub cnpj: Option<String>,
    pub legal_name: Option<String>,
    pub trade_name: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CustomerRow {
    pub customer_code: i64,
    pub document: Option<String>,
    pub name: Option<String>,
    pub trade_name: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProductRow {
    pub product_code: i64,
    pub ean: Option<String>,
    pub ncm: Option<String>,
    pub description: Option<String>,
    pub manufacturer: Option<String>,
    pub list_price: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct StockRow {
    pub product_code: i64,
    pub ean: Option<String>,
    pub quantity: f64,
}

#[derive(Debug, Clone)]
pub struct ReceiptRow {
    pub product_code: i64,
    pub ean: Option<String>,
    pub list_price: Option<f64>,
}

impl TryFrom<&Row<'_>> for SaleRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> std::result::Result<Self, Self::Error> {
        Ok(SaleRow {
            customer_code: row.get("customer_code")?,
            product_code: row.get("product_code")?,
            quantity: row.get("quantity")?,
            unit_price: row.get("unit_price")?,
            list_price: row.get("list_price")?,
            is_gift: row.get("is_gift")?,
            invoice_series: row.get("invoice_series")?,
            invoice_number: row.get("invoice_number")?,
            nfe_key: row.get("nfe_key")?,
            icms_rate: row.get("icms_rate")?,
            icms_amount: row.get("icms_amount")?,
            cst: row.get("cst")?,
        })
    }
}

impl TryFrom<&Row<'_>> for ReturnRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> std::result::Result<Self, Self::Error> {
        Ok(ReturnRow {
            customer_code: row.get("customer_code")?,
            product_code: row.get("product_code")?,
            quantity: row.get("quantity")?,
        })
    }
}

impl TryFrom<&Row<'_>> for BranchRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> std::result::Result<Self, Self::Error> {
        Ok(BranchRow {
            branch_code: row.get("branch_code")?,
            cnpj: row.get("cnpj")?,
            legal_name: row.get("legal_name")?,
            trade_name: row.get("trade_name")?,
            phone: row.get("phone")?,
            street: row.get("street")?,
            postal_code: row.get("postal_code")?,
            city: row.get("city")?,
            state: row.get("state")?,
        })
    }
}

impl TryFrom<&Row<'_>> for CustomerRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> std::result::Result<Self, Self::Error> {
        Ok(CustomerRow {
            customer_code: row.get("customer_code")?,
            document: row.get("document")?,
            name: row.get("name")?,
            trade_name: row.get("trade_name")?,
            phone: row.get("phone")?,
            street: row.get("street")?,
            postal_code: row.get("postal_code")?,
            city: row.get("city")?,
            state: row.get("state")?,
        })
    }
}

impl TryFrom<&Row<'_>> for ProductRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> std::result::Result<Self, Self::Error> {
        Ok(ProductRow {
            product_code: row.get("product_code")?,
            ean: row.get("ean")?,
            ncm: row.get("ncm")?,
            description: row.get("description")?,
            manufacturer: row.get("manufacturer")?,
            list_price: row.get("list_price")?,
        })
    }
}

impl TryFrom<&Row<'_>> for StockRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> std::result::Result<Self, Self::Error> {
        Ok(StockRow {
            product_code: row.get("product_code")?,
            ean: row.get("ean")?,
            quantity: row.get("quantity")?,
        })
    }
}

impl TryFrom<&Row<'_>> for ReceiptRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> std::result::Result<Self, Self::Error> {
        Ok(ReceiptRow {
            product_code: row.get("product_code")?,
            ean: row.get("ean")?,
            list_price: row.get("list_price")?,
        })
    }
}

/// Seam between the extraction stage and the warehouse backend.
pub trait SalesSource {
    /// Everything recorded for one day, scoped to the configured branch.
    fn fetch_day(&self, day: NaiveDate) -> Result<DaySnapshot>;

    /// Engine version string, used by connectivity probes.
    fn version(&self) -> Result<String>;
}

/// Read side of the SQLite warehouse mirror.
pub struct SqliteWarehouse {
    conn: Connection,
    branch: i64,
}

impl SqliteWarehouse {
    pub fn open(config: &SourceConfig) -> Result<Self> {
        if !config.database.exists() {
            return Err(FeedError::Config {
                message: format!(
                    "Warehouse database not found: {}",
                    config.database.display()
                ),
            });
        }

        let mut conn = Connection::open(&config.database)?;
        configure_connection(&mut conn, Duration::from_secs(config.busy_timeout))?;

        Ok(Self {
            conn,
            branch: i64::from(config.branch),
        })
    }

    /// Wrap an already open connection, mainly for in-memory test databases.
    pub fn from_connection(mut conn: Connection, branch: u32) -> Result<Self> {
        configure_connection(&mut conn, Duration::from_secs(5))?;
        Ok(Self {
            conn,
            branch: i64::from(branch),
        })
    }

    fn sales_for(&self, day: &str) -> Result<Vec<SaleRow>> {
        let mut stmt = self.conn.prepare(super::queries::SALES_FOR_DAY)?;
        let rows = stmt
            .query_map(
                named_params! { ":day": day, ":branch": self.branch },
                |row| SaleRow::try_from(row),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn returns_for(&self, day: &str) -> Result<Vec<ReturnRow>> {
        let mut stmt = self.conn.prepare(super::queries::RETURNS_FOR_DAY)?;
        let rows = stmt
            .query_map(
                named_params! { ":day": day, ":branch": self.branch },
                |row| ReturnRow::try_from(row),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn branch_rows(&self) -> Result<Vec<BranchRow>> {
        let mut stmt = self.conn.prepare(super::queries::BRANCH)?;
        let rows = stmt
            .query_map(named_params! { ":branch": self.branch }, |row| {
                BranchRow::try_from(row)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn customers_for(&self, day: &str) -> Result<Vec<CustomerRow>> {
        let mut stmt = self.conn.prepare(super::queries::CUSTOMERS_FOR_DAY)?;
        let rows = stmt
            .query_map(
                named_params! { ":day": day, ":branch": self.branch },
                |row| CustomerRow::try_from(row),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn products_for(&self, day: &str) -> Result<Vec<ProductRow>> {
        let mut stmt = self.conn.prepare(super::queries::PRODUCTS_SOLD_ON_DAY)?;
        let rows = stmt
            .query_map(
                named_params! { ":day": day, ":branch": self.branch },
                |row| ProductRow::try_from(row),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn stock_rows(&self) -> Result<Vec<StockRow>> {
        let mut stmt = self.conn.prepare(super::queries::STOCK_LEVELS)?;
        let rows = stmt
            .query_map(named_params! { ":branch": self.branch }, |row| {
                StockRow::try_from(row)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn receipts_through(&self, day: &str) -> Result<HashMap<i64, ReceiptRow>> {
        let mut stmt = self.conn.prepare(super::queries::RECEIPTS_THROUGH_DAY)?;
        let rows = stmt.query_map(named_params! { ":day": day }, |row| {
            ReceiptRow::try_from(row)
        })?;

        let mut receipts = HashMap::new();
        for row in rows {
            let row = row?;
            receipts.insert(row.product_code, row);
        }
        Ok(receipts)
    }
}

impl SalesSource for SqliteWarehouse {
    fn fetch_day(&self, day: NaiveDate) -> Result<DaySnapshot> {
        let day = day.format("%Y-%m-%d").to_string();

        Ok(DaySnapshot {
            sales: self.sales_for(&day)?,
            returns: self.returns_for(&day)?,
            branches: self.branch_rows()?,
            customers: self.customers_for(&day)?,
            products: self.products_for(&day)?,
            stock: self.stock_rows()?,
            receipts: self.receipts_through(&day)?,
        })
    }

    fn version(&self) -> Result<String> {
        let version: String =
            self.conn
                .query_row("SELECT sqlite_version()", [], |row| row.get(0))?;
        Ok(format!("SQLite {}", version))
    }
}

fn configure_connection(conn: &mut Connection, busy_timeout: Duration) -> Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", 1)?;
    Ok(())
}
