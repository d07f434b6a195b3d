//! Deploy error types

use shipflow_core::{ConfigError, ServiceKind};
use thiserror::Error;

/// Errors local to a single service deploy
///
/// Recorded as a FAILED outcome for that service; never aborts siblings.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Command failed to start: {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("Deploy rejected: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Version control errors
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("git command failed: git {args}: {stderr}")]
    CommandFailed { args: String, stderr: String },

    #[error("git is not available: {0}")]
    Unavailable(#[source] std::io::Error),
}

/// Fatal errors raised before any deploy is dispatched
#[derive(Error, Debug)]
pub enum OrchestrateError {
    #[error("No deployer registered for kind '{kind}' (needed by: {})", services.join(", "))]
    DeployerMissing {
        kind: ServiceKind,
        services: Vec<String>,
    },

    #[error("Failed to list changed files: {0}")]
    VersionControl(#[from] VcsError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, DeployError>;
