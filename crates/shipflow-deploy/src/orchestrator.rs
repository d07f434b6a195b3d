//! Deployment orchestration
//!
//! One run walks through these phases:
//!
//! ```text
//! Idle → ResolvingEnv → DetectingChanges ─┬─ NoChanges → Done
//!                                         └─ Planning → Dispatching → Aggregating → Done
//! ```
//!
//! Everything is sequential except Dispatching, which spawns one task per
//! changed service and joins all of them before aggregating.

use crate::deployer::{Deployer, DeployerSet};
use crate::error::OrchestrateError;
use chrono::Utc;
use shipflow_core::{
    DeploymentOutcome, DeploymentPlan, DeploymentReport, Registry, RunPhase, ServiceKind, detect,
    plan_service, resolve,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Drives one deployment run over a loaded registry
#[derive(Debug, Clone)]
pub struct Orchestrator {
    registry: Arc<Registry>,
    deployers: DeployerSet,
    max_parallel: Option<usize>,
    /// Token the next run is cancelled through; replaced once a run has consumed a cancellation
    cancel: Arc<Mutex<CancellationToken>>,
}

impl Orchestrator {
    pub fn new(registry: Arc<Registry>, deployers: DeployerSet) -> Self {
        Self {
            registry,
            deployers,
            max_parallel: None,
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    /// Limit the number of concurrent deploys (unbounded when unset)
    pub fn with_max_parallel(mut self, max_parallel: Option<usize>) -> Self {
        self.max_parallel = max_parallel.map(|n| n.max(1));
        self
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Arc::new(Mutex::new(token));
        self
    }

    /// Token that cancels the run in flight, or the next run if none is
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn begin_run(&self) -> RunScope {
        let source = self.cancellation_token();
        RunScope {
            token: source.child_token(),
            source,
            slot: Arc::clone(&self.cancel),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Resolve, detect, plan, dispatch and aggregate
    ///
    /// Per-service failures are reported in the returned report. Only
    /// conditions that prevent dispatching anything are returned as `Err`.
    pub async fn run(
        &self,
        branch: &str,
        triggering_ref: &str,
        changed_files: &[String],
    ) -> Result<DeploymentReport, OrchestrateError> {
        let started_at = Utc::now();
        let mut phases = vec![RunPhase::Idle];
        // Lives until the run returns or its future is dropped
        let scope = self.begin_run();

        phases.push(RunPhase::ResolvingEnv);
        let environment = resolve(branch, &self.registry.branches).to_string();
        info!(branch, environment = %environment, "Resolved target environment");

        phases.push(RunPhase::DetectingChanges);
        let changed = detect(changed_files, &self.registry.services);
        if changed.is_empty() {
            info!(files = changed_files.len(), "No service changed, nothing to deploy");
            phases.push(RunPhase::NoChanges);
            phases.push(RunPhase::Done);
            return Ok(DeploymentReport::finalize(
                environment,
                branch,
                triggering_ref,
                Vec::new(),
                started_at,
                phases,
            ));
        }
        info!(services = ?changed, "Detected changed services");

        phases.push(RunPhase::Planning);
        let plans = self.plan(&changed, &environment)?;
        let dispatch = self.assign_deployers(plans)?;

        phases.push(RunPhase::Dispatching);
        let handles = self.dispatch(dispatch, &scope.token);

        phases.push(RunPhase::Aggregating);
        let mut outcomes = join_all(handles).await;
        outcomes.extend(
            self.registry
                .services
                .iter()
                .filter(|s| !changed.contains(&s.name))
                .map(|s| DeploymentOutcome::skipped(&s.name)),
        );

        phases.push(RunPhase::Done);
        let report = DeploymentReport::finalize(
            environment,
            branch,
            triggering_ref,
            outcomes,
            started_at,
            phases,
        );
        info!(
            environment = %report.environment,
            status = %report.overall_status,
            summary = %report.summary(),
            "Deployment run finished"
        );
        Ok(report)
    }

    /// Build plans for the given services in the given environment
    pub fn plan(
        &self,
        services: &BTreeSet<String>,
        environment: &str,
    ) -> Result<Vec<DeploymentPlan>, OrchestrateError> {
        services
            .iter()
            .map(|name| plan_service(&self.registry, name, environment).map_err(Into::into))
            .collect()
    }

    /// Pair every plan with its deployer; a missing kind aborts before anything runs
    fn assign_deployers(
        &self,
        plans: Vec<DeploymentPlan>,
    ) -> Result<Vec<(DeploymentPlan, Arc<dyn Deployer>)>, OrchestrateError> {
        let mut missing: BTreeMap<ServiceKind, Vec<String>> = BTreeMap::new();
        let mut assigned = Vec::with_capacity(plans.len());

        for plan in plans {
            match self.deployers.get(plan.kind) {
                Some(deployer) => assigned.push((plan, deployer)),
                None => missing.entry(plan.kind).or_default().push(plan.service),
            }
        }

        if let Some((kind, services)) = missing.into_iter().next() {
            return Err(OrchestrateError::DeployerMissing { kind, services });
        }
        Ok(assigned)
    }

    fn dispatch(
        &self,
        assigned: Vec<(DeploymentPlan, Arc<dyn Deployer>)>,
        cancel: &CancellationToken,
    ) -> Vec<(String, JoinHandle<DeploymentOutcome>)> {
        let semaphore = self.max_parallel.map(|n| Arc::new(Semaphore::new(n)));
        debug!(
            tasks = assigned.len(),
            max_parallel = ?self.max_parallel,
            "Dispatching deploys"
        );

        assigned
            .into_iter()
            .map(|(plan, deployer)| {
                let service = plan.service.clone();
                let handle = tokio::spawn(deploy_one(
                    plan,
                    deployer,
                    semaphore.clone(),
                    cancel.clone(),
                ));
                (service, handle)
            })
            .collect()
    }
}

/// Cancellation scope of one run
///
/// Dropping it cancels the run's tasks, so a caller that drops the `run`
/// future (e.g. on timeout) does not leave deploys running detached. A
/// cancellation requested through the orchestrator's token is consumed by
/// this run; later runs get a fresh token.
struct RunScope {
    token: CancellationToken,
    source: CancellationToken,
    slot: Arc<Mutex<CancellationToken>>,
}

impl Drop for RunScope {
    fn drop(&mut self) {
        self.token.cancel();
        if self.source.is_cancelled() {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_cancelled() {
                debug!("Cancellation consumed, rearming for the next run");
                *slot = CancellationToken::new();
            }
        }
    }
}

/// Deploy a single plan, honouring the parallelism bound and cancellation
async fn deploy_one(
    plan: DeploymentPlan,
    deployer: Arc<dyn Deployer>,
    semaphore: Option<Arc<Semaphore>>,
    cancel: CancellationToken,
) -> DeploymentOutcome {
    let started = Instant::now();
    let service = plan.service.clone();

    if cancel.is_cancelled() {
        warn!(service = %service, "Run cancelled before dispatch");
        return DeploymentOutcome::cancelled(service, Duration::ZERO);
    }

    let _permit = match semaphore {
        Some(semaphore) => {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(service = %service, "Run cancelled while waiting for a deploy slot");
                    return DeploymentOutcome::cancelled(service, started.elapsed());
                }
                permit = semaphore.acquire_owned() => match permit {
                    Ok(permit) => Some(permit),
                    Err(e) => {
                        return DeploymentOutcome::failed(service, e.to_string(), started.elapsed());
                    }
                },
            }
        }
        None => None,
    };

    info!(
        service = %service,
        environment = %plan.environment,
        deployer = deployer.name(),
        "Deploying"
    );

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!(service = %service, "Deploy cancelled");
            DeploymentOutcome::cancelled(service, started.elapsed())
        }
        result = deployer.deploy(&plan) => match result {
            Ok(result) => {
                info!(service = %service, elapsed_ms = started.elapsed().as_millis() as u64, "Deploy succeeded");
                DeploymentOutcome::success(service, started.elapsed(), result.message)
            }
            Err(e) => {
                warn!(service = %service, error = %e, "Deploy failed");
                DeploymentOutcome::failed(service, e.to_string(), started.elapsed())
            }
        },
    }
}

/// Barrier: wait for every task; a panicked task becomes a FAILED outcome
async fn join_all(handles: Vec<(String, JoinHandle<DeploymentOutcome>)>) -> Vec<DeploymentOutcome> {
    let mut outcomes = Vec::with_capacity(handles.len());
    for (service, handle) in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(service = %service, error = %e, "Deploy task did not complete");
                let detail = if e.is_panic() {
                    "deploy task panicked".to_string()
                } else {
                    e.to_string()
                };
                DeploymentOutcome::failed(service, detail, Duration::ZERO)
            }
        };
        outcomes.push(outcome);
    }
    outcomes
}
