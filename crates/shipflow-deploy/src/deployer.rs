//! Deployer trait definition

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shipflow_core::{DeploymentPlan, ServiceKind};
use std::collections::HashMap;
use std::sync::Arc;

/// Deploys one service plan
///
/// One implementation per service kind. Implementations must be safe to call
/// concurrently for different plans.
#[async_trait]
pub trait Deployer: Send + Sync {
    /// Returns the deployer name (e.g., "command", "dry-run")
    fn name(&self) -> &str;

    /// Deploy the plan
    ///
    /// The returned future may be dropped when the run is cancelled.
    async fn deploy(&self, plan: &DeploymentPlan) -> Result<DeployResult>;
}

/// Result of a successful deploy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployResult {
    /// Free-form message from the deployer
    pub message: Option<String>,
}

impl DeployResult {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }
}

/// Deployers keyed by service kind
#[derive(Clone, Default)]
pub struct DeployerSet {
    deployers: HashMap<ServiceKind, Arc<dyn Deployer>>,
}

impl DeployerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a deployer for a kind, replacing any previous one
    pub fn insert(&mut self, kind: ServiceKind, deployer: Arc<dyn Deployer>) {
        self.deployers.insert(kind, deployer);
    }

    pub fn with(mut self, kind: ServiceKind, deployer: impl Deployer + 'static) -> Self {
        self.insert(kind, Arc::new(deployer));
        self
    }

    pub fn get(&self, kind: ServiceKind) -> Option<Arc<dyn Deployer>> {
        self.deployers.get(&kind).cloned()
    }

    pub fn contains(&self, kind: ServiceKind) -> bool {
        self.deployers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.deployers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deployers.is_empty()
    }
}

impl std::fmt::Debug for DeployerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (kind, deployer) in &self.deployers {
            map.entry(kind, &deployer.name());
        }
        map.finish()
    }
}
