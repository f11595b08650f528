//! EPF Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Turns USPS AIS City State National (CS215N) product files into SQL and
//! keeps a reference database in step with the EPF distribution service.
//!
//! # Components
//!
//! - **ais**: record layouts, typed records and the fixed-width line parser
//! - **scanner**: resumable chunked scanning by line offset
//! - **emitter**: batched multi-row INSERT generation
//! - **sync**: download, extract, convert, apply and report in one run
//!
//! # Example
//!
//! ```no_run
//! use epf_ingest::ais::{ProductFamily, RecordType};
//! use epf_ingest::scanner::ChunkedFileScanner;
//! use std::path::Path;
//!
//! fn main() -> epf_ingest::Result<()> {
//!     let scanner = ChunkedFileScanner::new(ProductFamily::Cs215n);
//!     let first = scanner.scan(Path::new("ctystate.txt"), Some(RecordType::Detail), 0, Some(1000))?;
//!     let next = scanner.scan(
//!         Path::new("ctystate.txt"),
//!         Some(RecordType::Detail),
//!         first.last_line_number,
//!         Some(1000),
//!     )?;
//!     println!("{} + {} records", first.found_count, next.found_count);
//!     Ok(())
//! }
//! ```

pub mod ais;
pub mod apply;
pub mod config;
pub mod convert;
pub mod emitter;
pub mod error;
pub mod extract;
pub mod notify;
pub mod progress;
pub mod report;
pub mod scanner;
pub mod sync;

pub use config::SyncConfig;
pub use error::{IngestError, Result};
pub use report::{RunOutcome, RunReport};
pub use sync::SyncOrchestrator;
