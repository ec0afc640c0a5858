pub mod client;
pub mod models;

pub use client::DeliveryClient;
pub use models::{looks_like_jwt, token_from_body, AccessToken, UploadReceipt};
