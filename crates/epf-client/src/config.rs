//! Client configuration

use crate::endpoints::DEFAULT_BASE_URL;
use crate::error::{EpfError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Client Configuration Constants
// ============================================================================

/// Timeout for metadata calls (login, list, status, ...).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Timeout for streamed file downloads; CS215N archives run to hundreds of MB.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 600;

pub const DEFAULT_USER_AGENT: &str = concat!("epf-sync/", env!("CARGO_PKG_VERSION"));

/// EPF client configuration
#[derive(Debug, Clone)]
pub struct EpfConfig {
    pub base_url: String,
    /// Directory that streamed downloads are saved into
    pub download_dir: Option<PathBuf>,
    pub timeout: Duration,
    pub download_timeout: Duration,
    pub user_agent: String,
}

impl Default for EpfConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            download_dir: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            download_timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl EpfConfig {
    pub fn builder() -> EpfConfigBuilder {
        EpfConfigBuilder::default()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(EpfError::configuration("Base URL cannot be empty"));
        }

        if self.timeout.is_zero() || self.download_timeout.is_zero() {
            return Err(EpfError::configuration("Timeouts must be greater than 0"));
        }

        if let Some(ref dir) = self.download_dir {
            validate_download_dir(dir)?;
        }

        Ok(())
    }
}

/// A save location must be given and must already exist as a directory
pub fn validate_download_dir(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() {
        return Err(EpfError::configuration("No file save location specified"));
    }

    if !dir.is_dir() {
        return Err(EpfError::configuration(format!(
            "File save location does not exist: {}",
            dir.display()
        )));
    }

    Ok(())
}

/// Builder for EpfConfig
#[derive(Debug, Default)]
pub struct EpfConfigBuilder {
    base_url: Option<String>,
    download_dir: Option<PathBuf>,
    timeout: Option<Duration>,
    download_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl EpfConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> EpfConfig {
        let default = EpfConfig::default();

        EpfConfig {
            base_url: self.base_url.unwrap_or(default.base_url),
            download_dir: self.download_dir,
            timeout: self.timeout.unwrap_or(default.timeout),
            download_timeout: self.download_timeout.unwrap_or(default.download_timeout),
            user_agent: self.user_agent.unwrap_or(default.user_agent),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EpfConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.download_timeout, Duration::from_secs(600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_download_dir_is_configuration_error() {
        let config = EpfConfig::builder()
            .download_dir("/definitely/not/a/real/epf/dir")
            .build();
        assert!(matches!(config.validate(), Err(EpfError::Configuration(_))));

        assert!(matches!(
            validate_download_dir(Path::new("")),
            Err(EpfError::Configuration(_))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = EpfConfig::builder().timeout(Duration::ZERO).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_existing_download_dir_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let config = EpfConfig::builder().download_dir(dir.path()).build();
        assert!(config.validate().is_ok());
    }
}
