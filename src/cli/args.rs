//! Command-line argument parsing

use crate::config::RelayConfig;
use clap::Parser;

#[derive(Parser)]
#[command(name = "file-relay")]
#[command(about = "Relay files to remote object storage with progress reporting and cancellation")]
#[command(version, author)]
pub struct Args {
    /// Files to relay
    #[arg(required = true, help = "Paths of the files to relay")]
    pub files: Vec<String>,

    /// Directory-service URL
    #[arg(
        long = "directory-url",
        help = "Directory service URL returning the destination pool"
    )]
    pub directory_url: Option<String>,

    /// Staging directory
    #[arg(
        long = "staging-dir",
        help = "Directory for staged bytes in transit between fetch and publish"
    )]
    pub staging_dir: Option<String>,

    /// Maximum accepted file size
    #[arg(
        long = "size-limit",
        help = "Maximum accepted file size in bytes (default: 4 GiB)"
    )]
    pub size_limit: Option<u64>,

    /// Seconds between progress updates
    #[arg(
        long = "interval",
        short = 'i',
        default_value = "5",
        help = "Minimum seconds between progress updates"
    )]
    pub interval: u64,

    /// Timeout in seconds for network operations
    #[arg(
        long = "timeout",
        short = 't',
        default_value = "7200",
        help = "Timeout for network operations in seconds"
    )]
    pub timeout: u64,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', help = "Enable verbose output")]
    pub verbose: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<(), String> {
        for file in &self.files {
            if !std::path::Path::new(file).exists() {
                return Err(format!("File does not exist: {}", file));
            }
        }

        if self.timeout == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Build the engine configuration, starting from the environment and
    /// applying explicit flags on top.
    pub fn to_config(&self) -> RelayConfig {
        let mut config = RelayConfig::from_env()
            .with_progress_interval_secs(self.interval)
            .with_timeout(self.timeout);

        if let Some(url) = &self.directory_url {
            config = config.with_directory_url(url.clone());
        }
        if let Some(dir) = &self.staging_dir {
            config = config.with_staging_dir(dir.clone());
        }
        if let Some(limit) = self.size_limit {
            config = config.with_size_limit(limit);
        }
        config.verbose = config.verbose || self.verbose;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "file-relay",
            "--size-limit",
            "1024",
            "--interval",
            "2",
            "some-file",
        ]);
        let config = args.to_config();
        assert_eq!(config.size_limit, 1024);
        assert_eq!(config.progress_interval_secs, 2);
    }

    #[test]
    fn test_missing_file_fails_validation() {
        let args = Args::parse_from(["file-relay", "/definitely/not/here.bin"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        std::fs::write(&path, b"x").unwrap();
        let args = Args::parse_from([
            "file-relay",
            "--timeout",
            "0",
            path.to_str().unwrap(),
        ]);
        assert!(args.validate().is_err());
    }
}
