use crate::ChangeArgs;
use crate::output;
use colored::Colorize;
use shipflow_config::Settings;
use shipflow_core::{Registry, ServiceKind};
use shipflow_deploy::{
    CancellationToken, CommandDeployer, DeployerSet, DryRunDeployer, JsonFileSink, Orchestrator,
    Pipeline, TracingSink,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const KINDS: [ServiceKind; 2] = [ServiceKind::Function, ServiceKind::ContainerService];

pub struct DeployArgs {
    pub branch: String,
    pub changes: ChangeArgs,
    pub dry_run: bool,
    pub json: bool,
    pub timeout: Option<u64>,
    pub max_parallel: Option<usize>,
    pub report: Option<PathBuf>,
}

/// デプロイを実行し、全体が成功したかを返す
pub async fn handle(
    registry: Registry,
    settings: &Settings,
    project_root: &Path,
    args: DeployArgs,
) -> anyhow::Result<bool> {
    if !args.json {
        println!("{}", "デプロイを開始します...".blue().bold());
        if args.dry_run {
            println!("{}", "ドライラン: 実際のデプロイは行いません".yellow());
        }
    }

    let deployers = build_deployers(settings, args.dry_run);
    let cancel = CancellationToken::new();
    let orchestrator = Orchestrator::new(Arc::new(registry), deployers)
        .with_max_parallel(args.max_parallel.or(settings.max_parallel))
        .with_cancellation(cancel.clone());

    watch_ctrl_c(cancel.clone());
    if let Some(secs) = args.timeout.or(settings.timeout_secs) {
        watch_timeout(cancel.clone(), Duration::from_secs(secs));
    }

    let vcs = super::version_control(&args.changes, project_root);
    let mut pipeline = Pipeline::new(orchestrator, vcs).with_sink(TracingSink);
    if let Some(path) = args.report.as_ref().or(settings.report_path.as_ref()) {
        pipeline = pipeline.with_sink(JsonFileSink::new(path));
    }

    let report = pipeline
        .orchestrate(&args.branch, &args.changes.from, &args.changes.to)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_report(&report);
    }

    Ok(report.is_success())
}

/// 種別ごとのデプロイヤーを組み立てる
///
/// settings に登録のない種別は登録しない（必要になった時点でエラー）。
fn build_deployers(settings: &Settings, dry_run: bool) -> DeployerSet {
    let mut deployers = DeployerSet::new();
    for kind in KINDS {
        if dry_run {
            deployers.insert(kind, Arc::new(DryRunDeployer));
            continue;
        }
        let command = settings
            .deployer_command(kind.as_str())
            .and_then(|argv| CommandDeployer::from_command_line(&argv));
        match command {
            Some(deployer) => {
                tracing::debug!(kind = %kind, program = deployer.program(), "Registered deployer");
                deployers.insert(kind, Arc::new(deployer));
            }
            None => tracing::debug!(kind = %kind, "No deployer configured"),
        }
    }
    deployers
}

fn watch_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling in-flight deploys");
            cancel.cancel();
        }
    });
}

fn watch_timeout(cancel: CancellationToken, timeout: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(timeout) => {
                tracing::warn!(timeout_secs = timeout.as_secs(), "Timed out, cancelling in-flight deploys");
                cancel.cancel();
            }
        }
    });
}
