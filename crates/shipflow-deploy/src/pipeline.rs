//! Invocation surface
//!
//! Ties a [`VersionControl`] source, an [`Orchestrator`] and any number of
//! [`ReportSink`]s together: `orchestrate(branch, from, to)` is what a CI job
//! or webhook handler calls.

use crate::error::OrchestrateError;
use crate::orchestrator::Orchestrator;
use crate::sink::ReportSink;
use crate::vcs::VersionControl;
use shipflow_core::{DeploymentReport, branch_from_ref};
use std::sync::Arc;
use tracing::{info, warn};

pub struct Pipeline {
    orchestrator: Orchestrator,
    vcs: Arc<dyn VersionControl>,
    sinks: Vec<Box<dyn ReportSink>>,
}

impl Pipeline {
    pub fn new(orchestrator: Orchestrator, vcs: Arc<dyn VersionControl>) -> Self {
        Self {
            orchestrator,
            vcs,
            sinks: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: impl ReportSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Deploy everything that changed between `from` and `to` on `branch`
    ///
    /// `branch` may be a full ref (`refs/heads/main`). `to` is recorded as the
    /// triggering ref of the report.
    pub async fn orchestrate(
        &self,
        branch: &str,
        from: &str,
        to: &str,
    ) -> Result<DeploymentReport, OrchestrateError> {
        let branch = branch_from_ref(branch);
        info!(branch, from, to, "Starting pipeline");

        let files = self.vcs.changed_files(from, to).await?;
        info!(files = files.len(), "Collected changed files");

        let report = self.orchestrator.run(branch, to, &files).await?;

        for sink in &self.sinks {
            if let Err(e) = sink.publish(&report).await {
                warn!(sink = sink.name(), error = %e, "Failed to publish deployment report");
            }
        }

        Ok(report)
    }
}
