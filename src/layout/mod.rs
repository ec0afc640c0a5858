pub mod compare;
pub mod schema;

pub use compare::{validate_record, Discrepancy};
pub use schema::{Expect, LayoutSpec};
