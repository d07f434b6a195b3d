//! External command deployer
//!
//! Runs a host-provided program for each plan. The plan is written to the
//! program's stdin as JSON and summarised in `SHIPFLOW_*` environment variables,
//! so wrapper scripts around cloud CLIs can use whichever is more convenient.

use crate::deployer::{DeployResult, Deployer};
use crate::error::{DeployError, Result};
use async_trait::async_trait;
use shipflow_core::DeploymentPlan;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Deployer that shells out to an external program
#[derive(Debug, Clone)]
pub struct CommandDeployer {
    program: String,
    args: Vec<String>,
}

impl CommandDeployer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build from a command line such as `["./deploy/function.sh", "--region", "x"]`
    pub fn from_command_line(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program.clone()).with_args(args.iter().cloned()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, plan: &DeploymentPlan) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(plan_env(plan));
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // Dropping the deploy future (cancellation) must not leave the child running
        cmd.kill_on_drop(true);
        cmd
    }
}

/// Environment variables describing the plan
pub fn plan_env(plan: &DeploymentPlan) -> Vec<(String, String)> {
    let mut env = vec![
        ("SHIPFLOW_SERVICE".to_string(), plan.service.clone()),
        ("SHIPFLOW_ENVIRONMENT".to_string(), plan.environment.clone()),
        ("SHIPFLOW_KIND".to_string(), plan.kind.to_string()),
        ("SHIPFLOW_RESOURCE_NAME".to_string(), plan.resource_name.clone()),
    ];
    if let Some(memory) = plan.resources.memory {
        env.push(("SHIPFLOW_MEMORY".to_string(), memory.to_string()));
    }
    if let Some(timeout) = plan.resources.timeout {
        env.push(("SHIPFLOW_TIMEOUT".to_string(), timeout.to_string()));
    }
    if let Some(cpu) = plan.resources.cpu {
        env.push(("SHIPFLOW_CPU".to_string(), cpu.to_string()));
    }
    if let Some(scaling) = plan.scaling {
        env.push((
            "SHIPFLOW_MIN_INSTANCES".to_string(),
            scaling.min_instances.to_string(),
        ));
        env.push((
            "SHIPFLOW_MAX_INSTANCES".to_string(),
            scaling.max_instances.to_string(),
        ));
    }
    env
}

#[async_trait]
impl Deployer for CommandDeployer {
    fn name(&self) -> &str {
        "command"
    }

    async fn deploy(&self, plan: &DeploymentPlan) -> Result<DeployResult> {
        let payload = serde_json::to_vec(plan)?;

        tracing::debug!(
            "Running: {} {} (service: {})",
            self.program,
            self.args.join(" "),
            plan.service
        );

        let mut child = self
            .command(plan)
            .spawn()
            .map_err(|source| DeployError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Feed stdin while stdout/stderr are drained, so neither side can
        // block the other on a full pipe
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // The program is free to ignore its input
                match stdin.write_all(&payload).await {
                    Err(e) if e.kind() != ErrorKind::BrokenPipe => return Err(e),
                    _ => {}
                }
            }
            Ok::<(), std::io::Error>(())
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        fed?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(DeployError::CommandFailed {
                status: output.status.to_string(),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let message = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string);

        Ok(DeployResult { message })
    }
}
