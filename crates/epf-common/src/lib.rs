//! EPF Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared utilities for the EPF sync workspace.
//!
//! # Overview
//!
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]
//! - **Checksums**: SHA-256 digests for downloaded distribution files
//! - **Errors**: the small error type used by the helpers in this crate
//!
//! # Example
//!
//! ```no_run
//! use epf_common::checksum::sha256_file;
//!
//! fn report(path: &str) -> epf_common::Result<()> {
//!     let digest = sha256_file(path)?;
//!     tracing::info!(%digest, "Downloaded file digest");
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;

pub use error::{CommonError, Result};
