//! EPF Client Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Session client for the USPS Electronic Product Fulfillment (EPF) web
//! service: login, file listing, streamed downloads, status updates and
//! logout, with the rotating `logonkey`/`tokenkey` handshake handled for you.
//!
//! # Example
//!
//! ```no_run
//! use epf_client::{Credentials, DownloadOutcome, EpfClient, EpfConfig, ListFilesRequest};
//!
//! #[tokio::main]
//! async fn main() -> epf_client::Result<()> {
//!     let config = EpfConfig::builder().download_dir("/var/epf").build();
//!     let mut client = EpfClient::new(config, Credentials::new("me@example.com", "secret"))?;
//!
//!     client.login().await?;
//!     let request = ListFilesRequest::new("AIS", "CS215N").with_status("N");
//!     if let DownloadOutcome::Downloaded { download, .. } =
//!         client.download_newest_file(&request).await?
//!     {
//!         println!("saved {}", download.file_path.display());
//!     }
//!     client.logout().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod headers;
pub mod session;
pub mod types;

pub use client::EpfClient;
pub use config::EpfConfig;
pub use error::{EpfError, Result};
pub use headers::HeaderParams;
pub use session::{Credentials, RequestOutcome, Session, SessionState};
pub use types::{
    newest_file, DownloadOutcome, DownloadResult, EpfResponse, FileDescriptor, ListFilesRequest,
    ServiceResponse, STATUS_COMPLETED, STATUS_NEW, STATUS_STARTED,
};
