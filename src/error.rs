use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Warehouse query failed: {message}")]
    Source {
        message: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid period: {message}")]
    InvalidPeriod { message: String },

    #[error("Extraction failed for {day}: {message}")]
    Extraction { day: NaiveDate, message: String },

    #[error("Packaging failed: {message}")]
    Packaging { message: String },

    #[error("Authentication failed for client: {client_id}")]
    AuthenticationFailed { client_id: String },

    #[error("Upload failed: {message}")]
    Upload { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Permission denied: {path}")]
    Permission { path: String },

    #[error("Operation was cancelled by user")]
    Cancelled,

    #[error("Request timed out: {message}")]
    Timeout { message: String },

    #[error("Archive already exists: {path}")]
    ArchiveExists { path: String },

    #[error("Invalid file path: {path}")]
    InvalidPath { path: String },
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for FeedError {
    fn user_message(&self) -> String {
        match self {
            FeedError::Source { message, .. } => {
                format!("Warehouse query failed: {}", message)
            }
            FeedError::InvalidPeriod { message } => {
                format!("Invalid period: {}", message)
            }
            FeedError::Extraction { day, message } => {
                format!("Extraction failed for {}: {}", day, message)
            }
            FeedError::Packaging { message } => {
                format!("Packaging failed: {}", message)
            }
            FeedError::AuthenticationFailed { client_id } => {
                format!("Authentication failed for client: {}", client_id)
            }
            FeedError::Upload { message } => {
                format!("Upload failed: {}", message)
            }
            FeedError::Network { message } => {
                format!("Network error: {}", message)
            }
            FeedError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            FeedError::Permission { path } => {
                format!("Permission denied accessing: {}", path)
            }
            FeedError::Cancelled => "Operation was cancelled by user".to_string(),
            FeedError::Timeout { message } => {
                format!("Request timed out: {}", message)
            }
            FeedError::ArchiveExists { path } => {
                format!("Archive already exists: {}", path)
            }
            FeedError::InvalidPath { path } => {
                format!("Invalid file path: {}", path)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            FeedError::Source { .. } => Some(
                "Check the [source] database path in the configuration and verify the warehouse mirror is readable.".to_string()
            ),
            FeedError::InvalidPeriod { .. } => Some(
                "Dates accept YYYY-MM-DD or DD/MM/YYYY, --from and --to must be given together, and the start must not be after the end.".to_string()
            ),
            FeedError::Extraction { .. } => Some(
                "No archive was produced. Fix the warehouse data for that day and run the whole period again.".to_string()
            ),
            FeedError::Packaging { .. } => Some(
                "Run the period again so every daily file is regenerated before packaging.".to_string()
            ),
            FeedError::AuthenticationFailed { .. } => Some(
                "Check client_id and client_secret under [delivery] in the configuration file.".to_string()
            ),
            FeedError::Upload { .. } => Some(
                "The archive is kept in the output directory. Retry later with --resend <archive>.".to_string()
            ),
            FeedError::Network { .. } => Some(
                "Check your internet connection and the [delivery] URLs, then try again.".to_string()
            ),
            FeedError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present.".to_string()
            ),
            FeedError::Permission { .. } => Some(
                "Ensure you have the necessary read/write permissions for the output directory.".to_string()
            ),
            FeedError::Timeout { .. } => Some(
                "The operation took longer than expected. Try again or increase the limit with --timeout.".to_string()
            ),
            FeedError::ArchiveExists { .. } => Some(
                "Remove the existing archive, choose a different output directory with --output, or use --force to overwrite.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for FeedError {
    fn from(error: rusqlite::Error) -> Self {
        FeedError::Source {
            message: error.to_string(),
            source: error,
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(error: reqwest::Error) -> Self {
        // A timed-out connect reports both; the deadline is the useful fact.
        if error.is_timeout() {
            FeedError::Timeout {
                message: "the delivery API did not answer within the configured limit"
                    .to_string(),
            }
        } else if error.is_connect() {
            FeedError::Network {
                message: "connection to the delivery API failed".to_string(),
            }
        } else {
            FeedError::Upload {
                message: error.to_string(),
            }
        }
    }
}

impl From<url::ParseError> for FeedError {
    fn from(error: url::ParseError) -> Self {
        FeedError::Config {
            message: format!("invalid URL: {}", error),
        }
    }
}

impl From<toml::de::Error> for FeedError {
    fn from(error: toml::de::Error) -> Self {
        FeedError::Config {
            message: error.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for FeedError {
    fn from(error: zip::result::ZipError) -> Self {
        FeedError::Packaging {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_friendly_messages() {
        let error = FeedError::InvalidPeriod {
            message: "start after end".to_string(),
        };
        assert!(error.user_message().contains("Invalid period"));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_extraction_error_names_the_day() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let error = FeedError::Extraction {
            day,
            message: "empty movement".to_string(),
        };
        assert!(error.user_message().contains("2024-01-02"));
    }

    #[test]
    fn test_sqlite_error_conversion() {
        let feed_error = FeedError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(feed_error, FeedError::Source { .. }));
    }

    #[test]
    fn test_upload_error_suggests_resend() {
        let error = FeedError::Upload {
            message: "HTTP 500".to_string(),
        };
        let suggestion = error.suggestion().unwrap();
        assert!(suggestion.contains("--resend"));
    }

    #[test]
    fn test_cancelled_has_no_suggestion() {
        assert!(FeedError::Cancelled.suggestion().is_none());
    }

    #[test]
    fn test_network_display_keeps_the_cause() {
        let error = FeedError::Network {
            message: "connection to the delivery API failed".to_string(),
        };
        assert!(error.to_string().contains("connection to the delivery API failed"));
    }

    #[test]
    fn test_timeout_suggests_the_timeout_flag() {
        let error = FeedError::Timeout {
            message: "the delivery API did not answer within the configured limit".to_string(),
        };
        assert!(error.to_string().contains("timed out"));
        assert!(error.suggestion().unwrap().contains("--timeout"));
    }
}
