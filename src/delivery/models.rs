use crate::error::{FeedError, Result};
use serde_json::Value;

/// Keys the token endpoint has been seen answering with, in lookup order.
const TOKEN_KEYS: &[&str] = &["access_token", "token", "jwt", "bearerToken"];

/// Bearer token for the DataEntry API.
#[derive(Debug, Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Three non-empty dot-separated segments, the shape of an unwrapped JWT.
pub fn looks_like_jwt(text: &str) -> bool {
    let parts: Vec<&str> = text.trim().split('.').collect();
    parts.len() == 3 && parts.iter().all(|part| !part.is_empty())
}

/// Pulls a token out of a response body. Handles both the JSON envelope and
/// the bare-JWT body some deployments of the endpoint return.
pub fn token_from_body(body: &str) -> Option<AccessToken> {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in TOKEN_KEYS {
            if let Some(token) = value.get(key).and_then(Value::as_str) {
                if !token.is_empty() {
                    return Some(AccessToken(token.to_string()));
                }
            }
        }
    }

    let trimmed = body.trim();
    if looks_like_jwt(trimmed) {
        return Some(AccessToken(trimmed.to_string()));
    }

    None
}

/// What the upload endpoint answers with: a tracking GUID plus the md5 the
/// server computed over the received bytes.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub guid: String,
    pub md5: String,
    pub raw: Value,
}

impl UploadReceipt {
    pub fn from_value(value: Value) -> Result<Self> {
        let guid = value
            .get("guid")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| FeedError::Upload {
                message: format!("response did not include a guid: {}", value),
            })?;

        let md5 = value
            .get("md5")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();

        Ok(Self {
            guid,
            md5,
            raw: value,
        })
    }

    /// Server md5 check is advisory; skip it when the server did not send one.
    pub fn md5_matches(&self, local_md5: &str) -> Option<bool> {
        if self.md5.is_empty() {
            None
        } else {
            Some(self.md5 == local_md5.to_lowercase())
        }
    }
}
