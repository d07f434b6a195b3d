//! Dry-run deployer

use crate::deployer::{DeployResult, Deployer};
use crate::error::Result;
use async_trait::async_trait;
use shipflow_core::DeploymentPlan;
use tracing::info;

/// Logs the plan and reports success without touching any cloud
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunDeployer;

#[async_trait]
impl Deployer for DryRunDeployer {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn deploy(&self, plan: &DeploymentPlan) -> Result<DeployResult> {
        info!(
            service = %plan.service,
            environment = %plan.environment,
            kind = %plan.kind,
            resource_name = %plan.resource_name,
            memory = ?plan.resources.memory,
            scaling = ?plan.scaling,
            env_vars = plan.env.len(),
            secrets = plan.secrets.len(),
            "Dry run: skipping deploy"
        );
        Ok(DeployResult::with_message(format!(
            "dry run: would deploy {} ({})",
            plan.resource_name, plan.kind
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipflow_core::{ServiceDefinition, ServiceKind, plan};

    #[tokio::test]
    async fn test_dry_run_succeeds() {
        let svc = ServiceDefinition::new("ui", "ui", ServiceKind::ContainerService);
        let plan = plan(&svc, "staging", &[]);

        let result = DryRunDeployer.deploy(&plan).await.unwrap();
        assert_eq!(
            result.message.as_deref(),
            Some("dry run: would deploy staging-ui (container-service)")
        );
    }
}
