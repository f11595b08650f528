//! Delivering run reports

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{IngestError, Result};
use crate::report::RunReport;

#[async_trait]
pub trait ReportNotifier: Send + Sync {
    async fn notify(&self, report: &RunReport) -> Result<()>;
}

/// Writes the report to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl ReportNotifier for LogNotifier {
    async fn notify(&self, report: &RunReport) -> Result<()> {
        if report.outcome.is_failure() {
            warn!(outcome = %report.outcome, "{}", report.render());
        } else {
            info!(outcome = %report.outcome, "{}", report.render());
        }
        Ok(())
    }
}

/// Mails the report through `sendmail -t`
#[derive(Debug, Clone)]
pub struct SendmailNotifier {
    program: String,
    to: String,
}

impl SendmailNotifier {
    pub fn new(program: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            to: to.into(),
        }
    }

    /// RFC 822 message handed to sendmail
    pub fn message(&self, report: &RunReport) -> String {
        format!(
            "To: {}\nSubject: {}\nContent-Type: text/plain; charset=utf-8\n\n{}",
            self.to,
            report.subject(),
            report.render()
        )
    }
}

#[async_trait]
impl ReportNotifier for SendmailNotifier {
    async fn notify(&self, report: &RunReport) -> Result<()> {
        let mut child = Command::new(&self.program)
            .arg("-t")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| IngestError::Notify(format!("failed to run {}: {}", self.program, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| IngestError::Notify("sendmail stdin unavailable".to_string()))?;
        stdin
            .write_all(self.message(report).as_bytes())
            .await
            .map_err(|e| IngestError::Notify(format!("failed to write message: {}", e)))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| IngestError::Notify(e.to_string()))?;
        if !output.status.success() {
            return Err(IngestError::Notify(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        info!(to = %self.to, subject = %report.subject(), "Report mailed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ais::ProductFamily;
    use crate::report::RunOutcome;

    fn report() -> RunReport {
        RunReport::new(ProductFamily::Cs215n).finish(RunOutcome::NothingToDo, None)
    }

    #[test]
    fn test_message_headers() {
        let notifier = SendmailNotifier::new("sendmail", "ops@example.com");
        let message = notifier.message(&report());
        assert!(message.starts_with("To: ops@example.com\nSubject: USPS AIS-CS215N Update: No New File\n"));
        assert!(message.contains("\n\nUSPS AIS-CS215N Update Report\n"));
    }

    #[tokio::test]
    async fn test_log_notifier() {
        assert!(LogNotifier.notify(&report()).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sendmail_failure() {
        let notifier = SendmailNotifier::new("false", "ops@example.com");
        let err = notifier.notify(&report()).await.unwrap_err();
        assert!(matches!(err, IngestError::Notify(_)));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let notifier = SendmailNotifier::new("/nonexistent/sendmail", "ops@example.com");
        assert!(matches!(
            notifier.notify(&report()).await.unwrap_err(),
            IngestError::Notify(_)
        ));
    }
}
