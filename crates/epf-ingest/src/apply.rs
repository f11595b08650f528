//! Loading a generated SQL script into the database

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::DatabaseSettings;
use crate::error::{IngestError, Result};

/// What the applier reported back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Statements executed, when the applier can count them
    pub statements: Option<usize>,
    /// Client output, if any
    pub output: String,
}

/// Executes a SQL script against the target database
#[async_trait]
pub trait StatementApplier: Send + Sync {
    async fn apply(&self, sql_file: &Path) -> Result<ApplyReport>;
}

/// Pipes the script into the `mysql` command-line client
#[derive(Debug, Clone)]
pub struct MysqlCliApplier {
    settings: DatabaseSettings,
}

impl MysqlCliApplier {
    pub fn new(settings: DatabaseSettings) -> Self {
        Self { settings }
    }

    fn command(&self) -> Command {
        let s = &self.settings;
        let mut cmd = Command::new(&s.client);
        cmd.arg(format!("--host={}", s.host))
            .arg(format!("--port={}", s.port));
        if !s.user.is_empty() {
            cmd.arg(format!("--user={}", s.user));
        }
        if !s.name.is_empty() {
            cmd.arg(&s.name);
        }
        if !s.password.is_empty() {
            cmd.env("MYSQL_PWD", s.password.expose());
        }
        cmd
    }
}

#[async_trait]
impl StatementApplier for MysqlCliApplier {
    async fn apply(&self, sql_file: &Path) -> Result<ApplyReport> {
        let script = std::fs::File::open(sql_file)
            .map_err(|_| IngestError::FileNotFound(sql_file.to_path_buf()))?;

        debug!(client = %self.settings.client, file = %sql_file.display(), "Running database client");
        let output = self
            .command()
            .stdin(Stdio::from(script))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| IngestError::apply(format!("failed to run {}: {}", self.settings.client, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(IngestError::apply(format!(
                "{} exited with {}: {}",
                self.settings.client, output.status, stderr
            )));
        }

        info!(file = %sql_file.display(), "SQL script applied");
        Ok(ApplyReport {
            statements: None,
            output: if stderr.is_empty() { stdout } else { format!("{}\n{}", stdout, stderr) },
        })
    }
}

/// Splits a script into statements: lines accumulate until one ends in `;`,
/// and comment lines between statements are dropped
pub fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in script.lines() {
        let trimmed = line.trim();
        if current.is_empty() && (trimmed.is_empty() || trimmed.starts_with("--")) {
            continue;
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
        if trimmed.ends_with(';') {
            statements.push(std::mem::take(&mut current));
        }
    }
    if !current.trim().is_empty() {
        statements.push(current);
    }
    statements
}

#[cfg(feature = "database")]
pub use sqlx_applier::SqlxApplier;

#[cfg(feature = "database")]
mod sqlx_applier {
    use super::*;
    use crate::config::Secret;
    use sqlx::{Connection, MySqlConnection};

    /// Executes the script statement by statement over one connection
    #[derive(Debug, Clone)]
    pub struct SqlxApplier {
        url: Secret,
    }

    impl SqlxApplier {
        pub fn new(url: Secret) -> Self {
            Self { url }
        }
    }

    #[async_trait]
    impl StatementApplier for SqlxApplier {
        async fn apply(&self, sql_file: &Path) -> Result<ApplyReport> {
            let script = tokio::fs::read_to_string(sql_file)
                .await
                .map_err(|_| IngestError::FileNotFound(sql_file.to_path_buf()))?;
            let statements = split_statements(&script);

            let mut conn = MySqlConnection::connect(self.url.expose()).await?;
            for statement in &statements {
                sqlx::raw_sql(statement).execute(&mut conn).await?;
            }
            conn.close().await?;

            info!(statements = statements.len(), "SQL script applied");
            Ok(ApplyReport {
                statements: Some(statements.len()),
                output: String::new(),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;

    #[test]
    fn test_split_statements() {
        let script = "-- header\nSTART TRANSACTION;\nINSERT INTO `t` (`a`)\nVALUES\n(\"1\"),\n(\"2\");\n\n-- Processed 2 records total\nCOMMIT;\n";
        let statements = split_statements(script);
        assert_eq!(
            statements,
            vec![
                "START TRANSACTION;".to_string(),
                "INSERT INTO `t` (`a`)\nVALUES\n(\"1\"),\n(\"2\");".to_string(),
                "COMMIT;".to_string(),
            ]
        );
    }

    #[test]
    fn test_split_keeps_unterminated_tail() {
        assert_eq!(split_statements("SELECT 1"), vec!["SELECT 1".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_script() {
        let settings = SyncConfig::new("u", "p", "/tmp").database;
        let err = MysqlCliApplier::new(settings)
            .apply(Path::new("/nonexistent/insertRecords.sql"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::FileNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_client_failure_reported() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("insertRecords.sql");
        std::fs::write(&script, "COMMIT;\n").unwrap();

        let mut settings = SyncConfig::new("u", "p", "/tmp").database;
        settings.client = "false".to_string();
        let err = MysqlCliApplier::new(settings).apply(&script).await.unwrap_err();
        assert!(matches!(err, IngestError::Apply(_)));
    }

    #[test]
    fn test_command_arguments() {
        let mut settings = SyncConfig::new("u", "p", "/tmp").database;
        settings.user = "loader".to_string();
        settings.password = crate::config::Secret::new("dbpw");
        settings.name = "epf".to_string();

        let cmd = MysqlCliApplier::new(settings).command();
        let std_cmd = cmd.as_std();
        let args: Vec<String> = std_cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec!["--host=localhost", "--port=3306", "--user=loader", "epf"]
        );
        assert!(std_cmd
            .get_envs()
            .any(|(k, v)| k == "MYSQL_PWD" && v.map(|v| v == "dbpw").unwrap_or(false)));
    }
}
