//! Sync run configuration
//!
//! Loaded from the environment (with `.env` support via dotenvy) and passed
//! explicitly into the orchestrator.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use epf_client::config::{
    validate_download_dir, DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS,
};
use epf_client::endpoints::DEFAULT_BASE_URL;
use epf_client::{Credentials, EpfConfig, ListFilesRequest, STATUS_NEW};

use crate::ais::{ProductFamily, RecordType};
use crate::convert::{ConvertOptions, DEFAULT_CHUNK_SIZE};
use crate::emitter::DEFAULT_BATCH_SIZE;
use crate::error::{IngestError, Result};

// ============================================================================
// Sync Configuration Constants
// ============================================================================

/// Tar member holding the City State zip
pub const DEFAULT_TAR_MEMBER: &str = "ctystatenatl/ctystate/ctystate.zip";

/// Zip member holding the fixed-width data
pub const DEFAULT_ZIP_MEMBER: &str = "ctystate.txt";

/// Name of the generated script inside the work directory
pub const DEFAULT_SQL_FILE_NAME: &str = "insertRecords.sql";

pub const DEFAULT_DB_CLIENT: &str = "mysql";
pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_SENDMAIL: &str = "sendmail";

/// String whose contents never appear in `Debug` output
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("\"\"")
        } else {
            f.write_str("\"***\"")
        }
    }
}

#[derive(Debug, Clone)]
pub struct EpfSettings {
    pub user: String,
    pub password: Secret,
    pub download_dir: PathBuf,
    pub base_url: String,
    pub timeout_secs: u64,
    pub download_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ProductSettings {
    pub family: ProductFamily,
    pub product_code: String,
    pub product_id: String,
    /// Status filter for the newest-file search
    pub status: String,
    pub record_type: RecordType,
}

#[derive(Debug, Clone)]
pub struct ConversionSettings {
    pub batch_size: usize,
    pub chunk_size: usize,
    pub zip_password: Option<Secret>,
    pub tar_member: String,
    pub zip_member: String,
    pub sql_file_name: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    /// Command-line client used to apply the script
    pub client: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret,
    pub name: String,
    /// Connection URL for direct execution
    pub url: Option<Secret>,
}

#[derive(Debug, Clone, Default)]
pub struct ReportSettings {
    /// Mail recipient; reports are only logged when unset
    pub to: Option<String>,
    pub sendmail: String,
}

/// Everything a sync run needs
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub epf: EpfSettings,
    pub product: ProductSettings,
    pub conversion: ConversionSettings,
    pub database: DatabaseSettings,
    pub report: ReportSettings,
}

impl SyncConfig {
    /// Defaults for the AIS City State National product
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        let family = ProductFamily::Cs215n;
        Self {
            epf: EpfSettings {
                user: user.into(),
                password: Secret::new(password),
                download_dir: download_dir.into(),
                base_url: DEFAULT_BASE_URL.to_string(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
                download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            },
            product: ProductSettings {
                family,
                product_code: family.product_code().to_string(),
                product_id: family.product_id().to_string(),
                status: STATUS_NEW.to_string(),
                record_type: RecordType::Detail,
            },
            conversion: ConversionSettings {
                batch_size: DEFAULT_BATCH_SIZE,
                chunk_size: DEFAULT_CHUNK_SIZE,
                zip_password: None,
                tar_member: DEFAULT_TAR_MEMBER.to_string(),
                zip_member: DEFAULT_ZIP_MEMBER.to_string(),
                sql_file_name: DEFAULT_SQL_FILE_NAME.to_string(),
            },
            database: DatabaseSettings {
                client: DEFAULT_DB_CLIENT.to_string(),
                host: DEFAULT_DB_HOST.to_string(),
                port: DEFAULT_DB_PORT,
                user: String::new(),
                password: Secret::default(),
                name: String::new(),
                url: None,
            },
            report: ReportSettings {
                to: None,
                sendmail: DEFAULT_SENDMAIL.to_string(),
            },
        }
    }

    /// Read `.env` if present, then the environment
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_env()
    }

    /// Build from environment variables only
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(
            env_string("EPF_USER").unwrap_or_default(),
            env_string("EPF_PASSWORD").unwrap_or_default(),
            env_string("EPF_DOWNLOAD_DIR").unwrap_or_default(),
        );

        if let Some(url) = env_string("EPF_BASE_URL") {
            config.epf.base_url = url;
        }
        config.epf.timeout_secs = env_parse("EPF_TIMEOUT_SECS", config.epf.timeout_secs)?;
        config.epf.download_timeout_secs =
            env_parse("EPF_DOWNLOAD_TIMEOUT_SECS", config.epf.download_timeout_secs)?;

        if let Some(code) = env_string("EPF_PRODUCT_CODE") {
            config.product.product_code = code;
        }
        if let Some(id) = env_string("EPF_PRODUCT_ID") {
            config.product.product_id = id;
        }
        if let Some(status) = env_string("EPF_STATUS_FILTER") {
            config.product.status = status;
        }
        config.product.record_type = env_parse("AIS_RECORD_TYPE", config.product.record_type)?;

        config.conversion.batch_size = env_parse("AIS_BATCH_SIZE", config.conversion.batch_size)?;
        config.conversion.chunk_size = env_parse("AIS_CHUNK_SIZE", config.conversion.chunk_size)?;
        config.conversion.zip_password = env_string("AIS_ZIP_PASSWORD").map(Secret::new);

        if let Some(client) = env_string("DB_CLIENT") {
            config.database.client = client;
        }
        if let Some(host) = env_string("DB_HOST") {
            config.database.host = host;
        }
        config.database.port = env_parse("DB_PORT", config.database.port)?;
        config.database.user = env_string("DB_USER").unwrap_or_default();
        config.database.password = Secret::new(env_string("DB_PASSWORD").unwrap_or_default());
        config.database.name = env_string("DB_NAME").unwrap_or_default();
        config.database.url = env_string("DATABASE_URL").map(Secret::new);

        config.report.to = env_string("REPORT_TO");
        if let Some(sendmail) = env_string("SENDMAIL_PATH") {
            config.report.sendmail = sendmail;
        }

        Ok(config)
    }

    /// Checks needed before any network or database work
    pub fn validate(&self) -> Result<()> {
        if self.epf.user.trim().is_empty() || self.epf.password.is_empty() {
            return Err(IngestError::config("EPF_USER and EPF_PASSWORD must be set"));
        }
        validate_download_dir(&self.epf.download_dir)
            .map_err(|e| IngestError::config(e.to_string()))?;
        if self.conversion.batch_size == 0 {
            return Err(IngestError::config("batch size must be at least 1"));
        }
        if self.conversion.chunk_size == 0 {
            return Err(IngestError::config("chunk size must be at least 1"));
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.epf.user.clone(), self.epf.password.expose())
    }

    pub fn epf_config(&self) -> EpfConfig {
        EpfConfig::builder()
            .base_url(self.epf.base_url.clone())
            .download_dir(self.epf.download_dir.clone())
            .timeout(Duration::from_secs(self.epf.timeout_secs))
            .download_timeout(Duration::from_secs(self.epf.download_timeout_secs))
            .build()
    }

    /// Newest-file query for the configured product
    pub fn list_request(&self) -> ListFilesRequest {
        ListFilesRequest::new(&self.product.product_code, &self.product.product_id)
            .with_status(&self.product.status)
    }

    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            family: self.product.family,
            record_type: self.product.record_type,
            batch_size: self.conversion.batch_size,
            chunk_size: self.conversion.chunk_size,
            ..Default::default()
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| IngestError::config(format!("invalid {}='{}': {}", name, raw, e))),
        None => Ok(default),
    }
}
