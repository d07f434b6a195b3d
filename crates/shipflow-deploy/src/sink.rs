//! Report sinks
//!
//! A sink receives the finished report. Sink failures are logged by the
//! caller and never change the report.

use crate::error::Result;
use async_trait::async_trait;
use shipflow_core::{DeploymentReport, OutcomeStatus};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Returns the sink name (e.g., "json-file", "tracing")
    fn name(&self) -> &str;

    async fn publish(&self, report: &DeploymentReport) -> Result<()>;
}

/// Writes the report as pretty-printed JSON
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReportSink for JsonFileSink {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn publish(&self, report: &DeploymentReport) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(report)?;
        fs::write(&self.path, content).await?;

        tracing::debug!("Saved deployment report to {}", self.path.display());
        Ok(())
    }
}

/// Emits one structured log line per outcome
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl ReportSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn publish(&self, report: &DeploymentReport) -> Result<()> {
        for outcome in &report.outcomes {
            match outcome.status {
                OutcomeStatus::Failed => warn!(
                    environment = %report.environment,
                    service = %outcome.service,
                    status = %outcome.status,
                    duration_ms = outcome.duration_ms,
                    error = outcome.error.as_deref().unwrap_or_default(),
                    "Deployment outcome"
                ),
                _ => info!(
                    environment = %report.environment,
                    service = %outcome.service,
                    status = %outcome.status,
                    duration_ms = outcome.duration_ms,
                    "Deployment outcome"
                ),
            }
        }
        info!(
            environment = %report.environment,
            triggering_ref = %report.triggering_ref,
            status = %report.overall_status,
            summary = %report.summary(),
            "Deployment report"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shipflow_core::DeploymentOutcome;
    use std::time::Duration;
    use tempfile::tempdir;

    fn report() -> DeploymentReport {
        DeploymentReport::finalize(
            "prod",
            "main",
            "abc123",
            vec![
                DeploymentOutcome::success("user", Duration::from_millis(40), None),
                DeploymentOutcome::failed("ui", "exit status: 1", Duration::from_millis(10)),
            ],
            Utc::now(),
            vec![],
        )
    }

    #[tokio::test]
    async fn test_json_file_sink_writes_report() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("reports/latest.json");
        let sink = JsonFileSink::new(&path);

        sink.publish(&report()).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: DeploymentReport = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded, report_with_times(&loaded));
        assert_eq!(loaded.outcomes.len(), 2);
        assert!(content.contains("\"overall_status\": \"FAILED\""));
    }

    fn report_with_times(loaded: &DeploymentReport) -> DeploymentReport {
        let mut expected = report();
        expected.started_at = loaded.started_at;
        expected.finished_at = loaded.finished_at;
        expected
    }

    #[tokio::test]
    async fn test_json_file_sink_unwritable_path() {
        let temp_dir = tempdir().unwrap();
        // the parent is a regular file
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let sink = JsonFileSink::new(blocker.join("report.json"));

        assert!(sink.publish(&report()).await.is_err());
    }

    #[tokio::test]
    async fn test_tracing_sink() {
        assert!(TracingSink.publish(&report()).await.is_ok());
    }
}
