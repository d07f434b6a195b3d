//! shipflow deploy
//!
//! Deployment orchestration for shipflow: the [`Deployer`] and
//! [`VersionControl`] capabilities the orchestrator consumes, the
//! [`Orchestrator`] itself, and the [`Pipeline`] entry point.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              Pipeline::orchestrate               │
//! └───────┬─────────────────┬───────────────┬───────┘
//!         │                 │               │
//! ┌───────▼───────┐ ┌───────▼───────┐ ┌─────▼──────┐
//! │VersionControl │ │ Orchestrator  │ │ ReportSink │
//! │ GitCli        │ │ resolve       │ │ JSON file  │
//! │ StaticChange  │ │ detect / plan │ │ tracing    │
//! └───────────────┘ │ dispatch      │ └────────────┘
//!                   └───────┬───────┘
//!                   ┌───────▼───────┐
//!                   │  DeployerSet  │
//!                   │ command       │
//!                   │ dry-run       │
//!                   └───────────────┘
//! ```

pub mod command;
pub mod deployer;
pub mod dry_run;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod sink;
pub mod vcs;

// Re-exports
pub use command::CommandDeployer;
pub use deployer::{DeployResult, Deployer, DeployerSet};
pub use dry_run::DryRunDeployer;
pub use error::{DeployError, OrchestrateError, Result, VcsError};
pub use orchestrator::Orchestrator;
pub use pipeline::Pipeline;
pub use sink::{JsonFileSink, ReportSink, TracingSink};
pub use tokio_util::sync::CancellationToken;
pub use vcs::{GitCli, StaticChangeSet, VersionControl, is_null_revision};
