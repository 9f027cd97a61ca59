//! Configuration management module

use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default accepted file size: 4 GiB, inclusive.
pub const DEFAULT_SIZE_LIMIT: u64 = 4 * 1024 * 1024 * 1024;

/// Default minimum interval between progress updates, in seconds.
pub const DEFAULT_PROGRESS_INTERVAL_SECS: u64 = 5;

/// Relay engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Maximum accepted declared file size in bytes (at-limit is allowed)
    pub size_limit: u64,
    /// Minimum seconds between emitted progress updates
    pub progress_interval_secs: u64,
    /// Directory for staged bytes in transit between fetch and publish
    pub staging_dir: PathBuf,
    /// Directory-service URL returning the destination pool
    pub directory_url: String,
    /// Upload URL template; `{server}` is replaced with the chosen endpoint
    pub upload_url_template: String,
    /// Timeout for network operations in seconds
    pub timeout: u64,
    pub verbose: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            size_limit: DEFAULT_SIZE_LIMIT,
            progress_interval_secs: DEFAULT_PROGRESS_INTERVAL_SECS,
            staging_dir: std::env::temp_dir().join("file-relay"),
            directory_url: "https://api.gofile.io/servers".to_string(),
            upload_url_template: "https://{server}.gofile.io/uploadFile".to_string(),
            timeout: 7200,
            verbose: false,
        }
    }
}

impl RelayConfig {
    pub fn with_size_limit(mut self, size_limit: u64) -> Self {
        self.size_limit = size_limit;
        self
    }

    pub fn with_progress_interval_secs(mut self, secs: u64) -> Self {
        self.progress_interval_secs = secs;
        self
    }

    pub fn with_staging_dir(mut self, staging_dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = staging_dir.into();
        self
    }

    pub fn with_directory_url(mut self, directory_url: impl Into<String>) -> Self {
        self.directory_url = directory_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.size_limit == 0 {
            return Err(RelayError::Validation(
                "size_limit must be greater than 0".to_string(),
            ));
        }
        if self.timeout == 0 {
            return Err(RelayError::Validation(
                "timeout must be greater than 0".to_string(),
            ));
        }
        if !self.directory_url.starts_with("http://") && !self.directory_url.starts_with("https://")
        {
            return Err(RelayError::Validation(format!(
                "Invalid directory URL: {}. Must start with http:// or https://",
                self.directory_url
            )));
        }
        if !self.upload_url_template.contains("{server}") {
            return Err(RelayError::Validation(
                "upload_url_template must contain a {server} placeholder".to_string(),
            ));
        }
        Ok(())
    }

    /// Create config from environment variables and defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("FILE_RELAY_STAGING_DIR") {
            config.staging_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("FILE_RELAY_DIRECTORY_URL") {
            config.directory_url = val;
        }
        if let Ok(val) = std::env::var("FILE_RELAY_SIZE_LIMIT") {
            if let Ok(limit) = val.parse() {
                config.size_limit = limit;
            }
        }
        if let Ok(val) = std::env::var("FILE_RELAY_TIMEOUT") {
            if let Ok(timeout) = val.parse() {
                config.timeout = timeout;
            }
        }
        if let Ok(val) = std::env::var("FILE_RELAY_VERBOSE") {
            config.verbose = val.to_lowercase() == "true" || val == "1";
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RelayConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_limit_rejected() {
        let config = RelayConfig::default().with_size_limit(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_directory_url_scheme_required() {
        let config = RelayConfig::default().with_directory_url("api.example.com/servers");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_template_placeholder_required() {
        let mut config = RelayConfig::default();
        config.upload_url_template = "https://upload.example.com/file".to_string();
        assert!(config.validate().is_err());
    }
}
