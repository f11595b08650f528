//! End-to-end sync run
//!
//! probe service -> login -> download newest file (marks it completed) ->
//! logout -> extract -> write update script -> apply -> report.
//!
//! Every failure is classified into a [`RunOutcome`]; `run` never returns an
//! error and always attempts to deliver the report.

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::Local;
use epf_client::{DownloadOutcome, EpfClient};
use tracing::{debug, error, info, instrument, warn};

use crate::apply::{MysqlCliApplier, StatementApplier};
use crate::config::SyncConfig;
use crate::convert::{write_update_script, ConvertSummary};
use crate::error::Result;
use crate::extract::{ArchiveExtractor, TarZipExtractor};
use crate::notify::{LogNotifier, ReportNotifier, SendmailNotifier};
use crate::report::{DatabaseStatus, DownloadSummary, ParseSummary, RunOutcome, RunReport};

/// Early exit from a run, already classified
struct Failure {
    outcome: RunOutcome,
    message: String,
}

impl Failure {
    fn new(outcome: RunOutcome, err: impl fmt::Display) -> Self {
        Self {
            outcome,
            message: err.to_string(),
        }
    }

    fn service(err: impl fmt::Display) -> Self {
        Self::new(RunOutcome::ServiceError, err)
    }

    fn parse_load(err: impl fmt::Display) -> Self {
        Self::new(RunOutcome::ParseLoadError, err)
    }
}

pub struct SyncOrchestrator {
    config: SyncConfig,
    extractor: Box<dyn ArchiveExtractor>,
    applier: Box<dyn StatementApplier>,
    notifier: Box<dyn ReportNotifier>,
}

impl SyncOrchestrator {
    /// Orchestrator with the collaborators implied by `config`
    pub fn new(config: SyncConfig) -> Self {
        let extractor = TarZipExtractor::new(
            config.conversion.tar_member.clone(),
            config.conversion.zip_member.clone(),
        )
        .with_password(config.conversion.zip_password.clone());

        let notifier: Box<dyn ReportNotifier> = match &config.report.to {
            Some(to) => Box::new(SendmailNotifier::new(config.report.sendmail.clone(), to.clone())),
            None => Box::new(LogNotifier),
        };

        Self {
            applier: default_applier(&config),
            extractor: Box::new(extractor),
            notifier,
            config,
        }
    }

    pub fn with_extractor(mut self, extractor: impl ArchiveExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    pub fn with_applier(mut self, applier: impl StatementApplier + 'static) -> Self {
        self.applier = Box::new(applier);
        self
    }

    pub fn with_notifier(mut self, notifier: impl ReportNotifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run once and deliver the report
    #[instrument(skip(self), fields(product = %self.config.product.family))]
    pub async fn run(&self) -> RunReport {
        let mut report = RunReport::new(self.config.product.family);
        let report = match self.execute(&mut report).await {
            Ok(outcome) => report.finish(outcome, None),
            Err(failure) => {
                error!(outcome = %failure.outcome, error = %failure.message, "Sync run failed");
                report.finish(failure.outcome, Some(failure.message))
            }
        };

        info!(outcome = %report.outcome, "Sync run finished");
        if let Err(e) = self.notifier.notify(&report).await {
            error!(error = %e, "Failed to deliver run report");
        }
        report
    }

    async fn execute(&self, report: &mut RunReport) -> std::result::Result<RunOutcome, Failure> {
        self.config
            .validate()
            .map_err(|e| Failure::new(RunOutcome::ConfigurationError, e))?;

        let mut client = EpfClient::new(self.config.epf_config(), self.config.credentials())
            .map_err(|e| Failure::new(RunOutcome::ConfigurationError, e))?;

        match client.version().await {
            Ok(response) if response.is_success() => {
                debug!(status = response.http_status, "Service reachable");
            }
            Ok(response) => {
                return Err(Failure::new(
                    RunOutcome::ServiceUnreachable,
                    format!(
                        "Unable to get version info. Service may be down: {}",
                        response.body.messages_text()
                    ),
                ));
            }
            Err(e) => return Err(Failure::new(RunOutcome::ServiceUnreachable, e)),
        }

        client.login().await.map_err(Failure::service)?;
        let downloaded = client
            .download_newest_file(&self.config.list_request())
            .await;
        if let Err(e) = client.logout().await {
            warn!(error = %e, "Logout failed");
        }

        let download = match downloaded.map_err(Failure::service)? {
            DownloadOutcome::NoFileToDownload => {
                info!(status = %self.config.product.status, "No file to download");
                return Ok(RunOutcome::NothingToDo);
            }
            DownloadOutcome::Downloaded { file, download } => {
                info!(
                    file_id = %file.file_id,
                    path = %download.file_path.display(),
                    size = download.file_size,
                    "Downloaded newest file"
                );
                download
            }
        };
        report.download = Some(DownloadSummary {
            file_id: download.file_id.clone(),
            path: download.file_path.clone(),
            size: download.file_size,
            sha256: download.sha256.clone(),
        });

        let work_dir = self.create_work_dir().await.map_err(Failure::parse_load)?;
        let data_file = self
            .extractor
            .extract(&download.file_path, &work_dir)
            .await
            .map_err(Failure::parse_load)?;

        let sql_file = work_dir.join(&self.config.conversion.sql_file_name);
        let summary = self
            .write_script(&data_file, &sql_file)
            .await
            .map_err(Failure::parse_load)?;
        report.parse = Some(ParseSummary {
            found_count: summary.found_count,
            last_line_number: summary.last_line_number,
            sql_file: sql_file.clone(),
        });

        if summary.found_count == 0 {
            info!("No records found, database not updated");
            report.database = DatabaseStatus::NotUpdated;
            return Ok(RunOutcome::NotUpdated);
        }

        let applied = self
            .applier
            .apply(&sql_file)
            .await
            .map_err(Failure::parse_load)?;
        report.database = DatabaseStatus::Updated {
            output: applied.output,
        };
        Ok(RunOutcome::Updated)
    }

    /// `<download_dir>/<YYYYMMDDHHMMSS>-<family>`
    async fn create_work_dir(&self) -> Result<PathBuf> {
        let name = format!(
            "{}-{}",
            Local::now().format("%Y%m%d%H%M%S"),
            self.config.product.family
        );
        let dir = self.config.epf.download_dir.join(name);
        tokio::fs::create_dir_all(&dir).await?;
        debug!(dir = %dir.display(), "Created work directory");
        Ok(dir)
    }

    async fn write_script(&self, data_file: &Path, sql_file: &Path) -> Result<ConvertSummary> {
        let options = self.config.convert_options();
        let data_file = data_file.to_path_buf();
        let sql_file = sql_file.to_path_buf();

        tokio::task::spawn_blocking(move || -> Result<ConvertSummary> {
            let sink = BufWriter::new(File::create(&sql_file)?);
            let (_, summary) = write_update_script(&data_file, &options, sink)?;
            info!(
                sql_file = %sql_file.display(),
                found = summary.found_count,
                last_line = summary.last_line_number,
                "Update script written"
            );
            Ok(summary)
        })
        .await?
    }
}

#[cfg(feature = "database")]
fn default_applier(config: &SyncConfig) -> Box<dyn StatementApplier> {
    match &config.database.url {
        Some(url) => Box::new(crate::apply::SqlxApplier::new(url.clone())),
        None => Box::new(MysqlCliApplier::new(config.database.clone())),
    }
}

#[cfg(not(feature = "database"))]
fn default_applier(config: &SyncConfig) -> Box<dyn StatementApplier> {
    Box::new(MysqlCliApplier::new(config.database.clone()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_config_is_reported() {
        let config = SyncConfig::new("", "", "/nonexistent/epf");
        let report = SyncOrchestrator::new(config).run().await;
        assert_eq!(report.outcome, RunOutcome::ConfigurationError);
        assert!(report.message.is_some());
        assert!(report.download.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SyncConfig::new("user", "pw", dir.path());
        config.epf.base_url = "http://127.0.0.1:1".to_string();
        config.epf.timeout_secs = 2;

        let report = SyncOrchestrator::new(config).run().await;
        assert_eq!(report.outcome, RunOutcome::ServiceUnreachable);
    }
}
