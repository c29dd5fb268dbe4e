//! Append-only log of generated SQL

use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Writes one entry per generated statement
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

/// Format a single log entry
pub fn format_entry(question: &str, sql: &str) -> String {
    format!("\n---\nQuestion: {}\nGenerated SQL:\n{}\n---\n", question, sql)
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry; failures are logged and otherwise ignored
    pub async fn record(&self, question: &str, sql: &str) {
        if let Err(e) = self.try_record(question, sql).await {
            warn!("Could not write audit log {}: {}", self.path.display(), e);
        }
    }

    async fn try_record(&self, question: &str, sql: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format_entry(question, sql).as_bytes()).await?;
        file.flush().await?;
        debug!("Recorded generated SQL in {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_entries_are_appended() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::new(dir.path().join("generated_queries.log"));

        log.record("How many orders?", "SELECT COUNT(*) FROM orders;")
            .await;
        log.record("List names", "SELECT name FROM employees;").await;

        let contents = tokio::fs::read_to_string(log.path()).await.unwrap();
        assert_eq!(
            contents,
            "\n---\nQuestion: How many orders?\nGenerated SQL:\nSELECT COUNT(*) FROM orders;\n---\n\
             \n---\nQuestion: List names\nGenerated SQL:\nSELECT name FROM employees;\n---\n"
        );
    }

    #[tokio::test]
    async fn test_unwritable_path_does_not_panic() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::new(dir.path().join("missing").join("log.txt"));
        log.record("q", "SELECT 1;").await;
        assert!(!log.path().exists());
    }
}
