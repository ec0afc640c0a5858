use crate::error::{FeedError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub source: SourceConfig,
    pub delivery: DeliveryConfig,
    pub output: OutputConfig,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Path to the SQLite mirror of the sales warehouse.
    pub database: PathBuf,
    /// Branch code bound into every warehouse query.
    pub branch: u32,
    pub busy_timeout: u64,
    /// Oracle Instant Client directory for thick-mode deployments.
    /// Only checked for existence; driver setup happens outside this tool.
    pub client_lib_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
    /// IQVIA client id. Also names the U_<CLIENT>_* files, uppercased.
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub upload_url: String,
    /// codIqvia establishment code stamped into every payload.
    pub establishment_code: String,
    pub upload_by_default: bool,
    pub token_timeout: u64,
    pub upload_timeout: u64,
    pub status_timeout: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub pretty_json: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidationConfig {
    pub enabled: bool,
    pub sample_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            delivery: DeliveryConfig::default(),
            output: OutputConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("warehouse.db"),
            branch: 1,
            busy_timeout: 5,
            client_lib_dir: None,
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            token_url: "https://dataentry.solutions.iqvia.com/api/v1/security/authenticate"
                .to_string(),
            upload_url: "https://dataentry.solutions.iqvia.com/api/v1/layout1/upload".to_string(),
            establishment_code: "0000".to_string(),
            upload_by_default: false,
            token_timeout: 60,
            upload_timeout: 180,
            status_timeout: 30,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("iqvia_out"),
            pretty_json: true,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sample_path: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(FeedError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| FeedError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| FeedError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = [
                    "iqviafeed.toml",
                    "iqviafeed.config.toml",
                    ".iqviafeed.toml",
                ];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                // No file anywhere: run on defaults.
                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref output_dir) = cli_args.output_dir {
            self.output.directory = output_dir.clone();
        }

        if let Some(branch) = cli_args.branch {
            self.source.branch = branch;
        }

        if let Some(upload) = cli_args.upload {
            self.delivery.upload_by_default = upload;
        }

        if let Some(validate) = cli_args.validate {
            self.validation.enabled = validate;
        }

        if let Some(ref sample) = cli_args.sample {
            self.validation.sample_path = Some(sample.clone());
            self.validation.enabled = true;
        }

        if let Some(timeout) = cli_args.upload_timeout {
            self.delivery.upload_timeout = timeout;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| FeedError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| FeedError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        // Validate warehouse source
        if self.source.database.as_os_str().is_empty() {
            return Err(FeedError::Config {
                message: "Warehouse database path must not be empty".to_string(),
            });
        }

        if self.source.branch == 0 {
            return Err(FeedError::Config {
                message: "Branch code must be greater than 0".to_string(),
            });
        }

        if self.source.busy_timeout == 0 {
            return Err(FeedError::Config {
                message: "Warehouse busy timeout must be greater than 0".to_string(),
            });
        }

        if let Some(ref dir) = self.source.client_lib_dir {
            if !dir.exists() {
                return Err(FeedError::Config {
                    message: format!(
                        "Instant Client directory does not exist: {}",
                        dir.display()
                    ),
                });
            }
        }

        // Validate delivery settings
        if self.delivery.client_id.trim().is_empty() {
            return Err(FeedError::Config {
                message: "client_id under [delivery] is required (it names the U_<CLIENT>_* files)"
                    .to_string(),
            });
        }

        let code_len = self.delivery.establishment_code.trim().len();
        if code_len == 0 || code_len > 10 {
            return Err(FeedError::Config {
                message: "establishment_code must be 1 to 10 characters".to_string(),
            });
        }

        for (name, value) in [
            ("token_url", &self.delivery.token_url),
            ("upload_url", &self.delivery.upload_url),
        ] {
            let parsed = Url::parse(value).map_err(|e| FeedError::Config {
                message: format!("{} is not a valid URL: {}", name, e),
            })?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(FeedError::Config {
                    message: format!("{} must use http or https", name),
                });
            }
        }

        if self.delivery.upload_by_default && self.delivery.client_secret.trim().is_empty() {
            return Err(FeedError::Config {
                message: "client_secret is required when the upload step is enabled".to_string(),
            });
        }

        if self.delivery.token_timeout == 0
            || self.delivery.upload_timeout == 0
            || self.delivery.status_timeout == 0
        {
            return Err(FeedError::Config {
                message: "Delivery timeouts must be greater than 0".to_string(),
            });
        }

        if let Some(parent) = self.output.directory.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(FeedError::Config {
                    message: format!("Parent directory does not exist: {}", parent.display()),
                });
            }
        }

        // A configured layout sample must exist even while validation is
        // switched off; an empty path counts as unset.
        if let Some(ref sample) = self.validation.sample_path {
            if !sample.as_os_str().is_empty() && !sample.exists() {
                return Err(FeedError::Config {
                    message: format!("Layout sample does not exist: {}", sample.display()),
                });
            }
        }

        Ok(())
    }

    /// Client identifier as it appears in file names.
    pub fn file_client(&self) -> String {
        self.delivery.client_id.trim().to_uppercase()
    }

    /// Commented starter configuration; every value shown is the default.
    pub fn create_sample_config() -> String {
        r#"# iqviafeed configuration. Uncommented values are the defaults.

[source]
# SQLite mirror of the sales warehouse.
database = "warehouse.db"
# Branch code bound into every warehouse query.
branch = 1
# SQLite busy timeout, in seconds.
busy_timeout = 5
# Oracle Instant Client directory for thick-mode mirror jobs.
# Must exist when set; nothing else is done with it here.
# client_lib_dir = "/opt/oracle/instantclient"

[delivery]
# Account issued by IQVIA. Also names the U_<CLIENT>_* files, uppercased.
client_id = ""
client_secret = ""
token_url = "https://dataentry.solutions.iqvia.com/api/v1/security/authenticate"
upload_url = "https://dataentry.solutions.iqvia.com/api/v1/layout1/upload"
# codIqvia stamped into every payload, up to 10 characters.
establishment_code = "0000"
# Send the archive at the end of every run (--upload / --no-upload override).
upload_by_default = false
# Per-request limits, in seconds.
token_timeout = 60
upload_timeout = 180
status_timeout = 30

[output]
directory = "iqvia_out"
pretty_json = true

[validation]
enabled = false
# Reference payload to derive the layout from; omit to use the built-in one.
# sample_path = "reference_day.json"
"#
        .to_string()
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub output_dir: Option<PathBuf>,
    pub branch: Option<u32>,
    pub upload: Option<bool>,
    pub validate: Option<bool>,
    pub sample: Option<PathBuf>,
    pub upload_timeout: Option<u64>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_branch(mut self, branch: Option<u32>) -> Self {
        self.branch = branch;
        self
    }

    pub fn with_upload(mut self, upload: Option<bool>) -> Self {
        self.upload = upload;
        self
    }

    pub fn with_validate(mut self, validate: Option<bool>) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_sample(mut self, sample: Option<PathBuf>) -> Self {
        self.sample = sample;
        self
    }

    pub fn with_upload_timeout(mut self, timeout: Option<u64>) -> Self {
        self.upload_timeout = timeout;
        self
    }
}
