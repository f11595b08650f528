//! Run summaries for operators

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::ais::ProductFamily;
use crate::progress::format_bytes;

/// How a sync run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    /// New data was loaded
    Updated,
    /// A file was processed but held no matching records
    NotUpdated,
    /// No file matched the status filter
    NothingToDo,
    /// The version probe failed
    ServiceUnreachable,
    /// The service rejected login, listing, download or status update
    ServiceError,
    /// Extraction, conversion or database load failed
    ParseLoadError,
    ConfigurationError,
}

impl RunOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnreachable | Self::ServiceError | Self::ParseLoadError | Self::ConfigurationError
        )
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Updated => "Database Updated",
            Self::NotUpdated => "Database Not Updated",
            Self::NothingToDo => "No New File",
            Self::ServiceUnreachable => "Service Unreachable",
            Self::ServiceError => "Service Error",
            Self::ParseLoadError => "Parse/Load Error",
            Self::ConfigurationError => "Configuration Error",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadSummary {
    pub file_id: String,
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseSummary {
    pub found_count: usize,
    pub last_line_number: u64,
    pub sql_file: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum DatabaseStatus {
    #[default]
    NotAttempted,
    Updated { output: String },
    NotUpdated,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub family: ProductFamily,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    pub outcome: RunOutcome,
    /// Error or status detail for the outcome
    pub message: Option<String>,
    pub download: Option<DownloadSummary>,
    pub parse: Option<ParseSummary>,
    pub database: DatabaseStatus,
}

impl RunReport {
    pub fn new(family: ProductFamily) -> Self {
        Self {
            family,
            started_at: Local::now(),
            finished_at: None,
            outcome: RunOutcome::NothingToDo,
            message: None,
            download: None,
            parse: None,
            database: DatabaseStatus::NotAttempted,
        }
    }

    /// Close the report with a final outcome
    pub fn finish(mut self, outcome: RunOutcome, message: Option<String>) -> Self {
        self.outcome = outcome;
        self.message = message;
        self.finished_at = Some(Local::now());
        self
    }

    pub fn subject(&self) -> String {
        format!("USPS {} Update: {}", self.family, self.outcome)
    }

    /// Plain-text body for mail or logs
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("USPS {} Update Report\n", self.family));
        out.push_str(&format!(
            "Started: {}\n",
            self.started_at.format("%Y-%m-%d %H:%M:%S")
        ));
        if let Some(finished) = self.finished_at {
            out.push_str(&format!("Finished: {}\n", finished.format("%Y-%m-%d %H:%M:%S")));
        }
        out.push_str(&format!("Outcome: {}\n", self.outcome));
        if let Some(message) = &self.message {
            out.push_str(&format!("Detail: {}\n", message));
        }

        if let Some(download) = &self.download {
            out.push_str("\nDownloaded File:\n");
            out.push_str(&format!(
                "  Size: {:.1} kb ({})\n",
                download.size as f64 / 1024.0,
                format_bytes(download.size)
            ));
            out.push_str(&format!("  Path: {}\n", download.path.display()));
            out.push_str(&format!("  SHA-256: {}\n", download.sha256));
        }

        if let Some(parse) = &self.parse {
            out.push_str("\nParsed File:\n");
            out.push_str(&format!("  Found Lines: {}\n", parse.found_count));
            out.push_str(&format!("  Last Line: {}\n", parse.last_line_number));
            out.push_str(&format!("  SQL: {}\n", parse.sql_file.display()));
        }

        match &self.database {
            DatabaseStatus::NotAttempted => {}
            DatabaseStatus::Updated { output } => {
                out.push_str("\nDatabase Updated\n");
                if !output.is_empty() {
                    out.push_str(output);
                    out.push('\n');
                }
            }
            DatabaseStatus::NotUpdated => out.push_str("\nDatabase Not Updated\n"),
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_render_full_run() {
        let mut report = RunReport::new(ProductFamily::Cs215n);
        report.download = Some(DownloadSummary {
            file_id: "202".to_string(),
            path: PathBuf::from("/var/epf/2024-01-01_00.00.00_epf.tar"),
            size: 2150,
            sha256: "abc".to_string(),
        });
        report.parse = Some(ParseSummary {
            found_count: 42,
            last_line_number: 50,
            sql_file: PathBuf::from("/var/epf/work/insertRecords.sql"),
        });
        report.database = DatabaseStatus::Updated {
            output: String::new(),
        };
        let report = report.finish(RunOutcome::Updated, None);

        let text = report.render();
        assert!(text.contains("Outcome: Database Updated"));
        assert!(text.contains("Size: 2.1 kb (2.10 KB)"));
        assert!(text.contains("Path: /var/epf/2024-01-01_00.00.00_epf.tar"));
        assert!(text.contains("Found Lines: 42"));
        assert!(text.contains("Last Line: 50"));
        assert!(text.contains("\nDatabase Updated\n"));
        assert_eq!(report.subject(), "USPS AIS-CS215N Update: Database Updated");
    }

    #[test]
    fn test_render_failure() {
        let report = RunReport::new(ProductFamily::Cs215n).finish(
            RunOutcome::ServiceUnreachable,
            Some("connection refused".to_string()),
        );
        let text = report.render();
        assert!(text.contains("Outcome: Service Unreachable"));
        assert!(text.contains("Detail: connection refused"));
        assert!(!text.contains("Downloaded File"));
        assert!(report.outcome.is_failure());
        assert!(report.finished_at.is_some());
    }

    #[test]
    fn test_not_updated_is_not_failure() {
        assert!(!RunOutcome::NotUpdated.is_failure());
        assert!(!RunOutcome::NothingToDo.is_failure());
    }
}
