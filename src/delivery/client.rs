use crate::config::DeliveryConfig;
use crate::delivery::models::{token_from_body, AccessToken, UploadReceipt};
use crate::error::{FeedError, Result};
use reqwest::multipart;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Serialize)]
struct TokenRequest {
    client_id: String,
    client_secret: String,
}

/// HTTP client for the DataEntry API: authentication, archive upload and
/// status lookups. Requests carry their own timeout; there is no automatic
/// retry, the operator decides when to resend.
pub struct DeliveryClient {
    http: reqwest::Client,
    token_url: String,
    upload_url: String,
    client_id: String,
    client_secret: String,
    token_timeout: Duration,
    upload_timeout: Duration,
    status_timeout: Duration,
}

impl DeliveryClient {
    pub fn new(config: &DeliveryConfig) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            http,
            token_url: config.token_url.clone(),
            upload_url: config.upload_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_timeout: Duration::from_secs(config.token_timeout),
            upload_timeout: Duration::from_secs(config.upload_timeout),
            status_timeout: Duration::from_secs(config.status_timeout),
        })
    }

    /// Tries the documented JSON login first, then falls back to form
    /// encoding, which some gateway deployments still expect. The account id
    /// is sent lowercased regardless of how it was configured.
    pub async fn authenticate(&self) -> Result<AccessToken> {
        let payload = TokenRequest {
            client_id: self.client_id.trim().to_lowercase(),
            client_secret: self.client_secret.clone(),
        };

        let mut transport_error: Option<FeedError> = None;
        let mut reached_server = false;

        for use_form in [false, true] {
            let request = self.http.post(&self.token_url).timeout(self.token_timeout);
            let request = if use_form {
                request.form(&payload)
            } else {
                request.json(&payload)
            };

            match request.send().await {
                Ok(response) => {
                    reached_server = true;
                    if response.status().is_success() {
                        let body = response.text().await?;
                        if let Some(token) = token_from_body(&body) {
                            return Ok(token);
                        }
                    }
                }
                Err(e) => transport_error = Some(e.into()),
            }
        }

        if !reached_server {
            if let Some(error) = transport_error {
                return Err(error);
            }
        }

        Err(FeedError::AuthenticationFailed {
            client_id: self.client_id.clone(),
        })
    }

    pub async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        token: &AccessToken,
    ) -> Result<UploadReceipt> {
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/zip")?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(&self.upload_url)
            .bearer_auth(token.as_str())
            .multipart(form)
            .timeout(self.upload_timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FeedError::Upload {
                message: format!("HTTP {}: {}", status.as_u16(), snippet(&body)),
            });
        }

        let value = serde_json::from_str(&body).unwrap_or_else(|_| json!({ "raw": body }));
        UploadReceipt::from_value(value)
    }

    pub async fn check_status(&self, guid: &str, token: &AccessToken) -> Result<Value> {
        let response = self
            .http
            .get(self.status_url(guid))
            .bearer_auth(token.as_str())
            .timeout(self.status_timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FeedError::Upload {
                message: format!(
                    "status check failed: HTTP {}: {}",
                    status.as_u16(),
                    snippet(&body)
                ),
            });
        }

        Ok(serde_json::from_str(&body)
            .unwrap_or_else(|_| json!({ "status": "success", "raw": body })))
    }

    /// The status endpoint lives next to the upload endpoint, keyed by the
    /// GUID the upload answered with.
    fn status_url(&self, guid: &str) -> String {
        let base = self.upload_url.trim_end_matches('/');
        let base = base.strip_suffix("/upload").unwrap_or(base);
        format!("{}/status/{}", base, guid)
    }
}

/// Error bodies can be whole HTML pages; keep only the head for messages.
fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}
