mod commands;
mod output;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ship")]
#[command(about = "変わったものだけを、正しい環境へ。", long_about = None)]
struct Cli {
    /// 詳細ログを出力 (-v で debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// プロジェクトルート（省略時は shipflow.kdl を上に向かって探索）
    #[arg(short = 'C', long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// 変更ファイルの取得元
#[derive(clap::Args, Debug, Clone)]
pub struct ChangeArgs {
    /// 比較元リビジョン（空または 0000... なら全ファイルを変更扱い）
    #[arg(long, env = "SHIPFLOW_FROM", default_value = "")]
    pub from: String,

    /// 比較先リビジョン
    #[arg(long, env = "SHIPFLOW_TO", default_value = "HEAD")]
    pub to: String,

    /// 変更ファイルを直接指定（git を使わない、カンマ区切り可）
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub files: Option<Vec<String>>,
}

#[derive(Subcommand)]
enum Commands {
    /// 変更されたサービスをデプロイ
    Deploy {
        /// ブランチ名（refs/heads/... も可）
        #[arg(short, long, env = "SHIPFLOW_BRANCH")]
        branch: String,
        #[command(flatten)]
        changes: ChangeArgs,
        /// 実際にはデプロイせず計画だけを確認
        #[arg(long)]
        dry_run: bool,
        /// レポートをJSONで標準出力に出す
        #[arg(long)]
        json: bool,
        /// 実行全体のタイムアウト（秒）。超えると未完了のデプロイはキャンセル
        #[arg(long)]
        timeout: Option<u64>,
        /// 同時デプロイ数の上限
        #[arg(long)]
        max_parallel: Option<usize>,
        /// レポートJSONの出力先
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// 変更されたサービスを表示
    Detect {
        #[command(flatten)]
        changes: ChangeArgs,
        /// JSONで出力
        #[arg(long)]
        json: bool,
    },
    /// 環境ごとのデプロイ計画を表示
    Plan {
        /// 環境名 (dev, staging, prod)
        environment: String,
        /// 対象サービス（省略時は全サービス）
        services: Vec<String>,
        /// JSONで出力
        #[arg(long)]
        json: bool,
    },
    /// ブランチ名から環境を解決
    Resolve {
        /// ブランチ名（refs/heads/... も可）
        branch: String,
    },
    /// レジストリを検証
    Validate,
    /// 正規化したレジストリをKDLで出力
    Export,
    /// バージョン情報を表示
    Version,
}

fn init_tracing(verbose: u8) {
    // stdout は人間向け出力/JSONに使うため、ログは stderr へ
    let default_level = if verbose > 0 { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Versionコマンドはレジストリ不要
    if matches!(cli.command, Commands::Version) {
        println!("shipflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Validateは失敗内容を整形して表示する
    if matches!(cli.command, Commands::Validate) {
        return commands::validate::handle(cli.project.as_deref());
    }

    let (project_root, registry) = commands::load_registry(cli.project.as_deref())?;

    match cli.command {
        Commands::Deploy {
            branch,
            changes,
            dry_run,
            json,
            timeout,
            max_parallel,
            report,
        } => {
            let settings = shipflow_config::load_settings(&project_root)?;
            let success = commands::deploy::handle(
                registry,
                &settings,
                &project_root,
                commands::deploy::DeployArgs {
                    branch,
                    changes,
                    dry_run,
                    json,
                    timeout,
                    max_parallel,
                    report,
                },
            )
            .await?;
            if !success {
                std::process::exit(1);
            }
        }
        Commands::Detect { changes, json } => {
            commands::detect::handle(&registry, &project_root, &changes, json).await?;
        }
        Commands::Plan {
            environment,
            services,
            json,
        } => {
            commands::plan::handle(&registry, &environment, &services, json)?;
        }
        Commands::Resolve { branch } => {
            commands::resolve::handle(&registry, &branch);
        }
        Commands::Export => {
            print!("{}", shipflow_core::to_kdl_string(&registry));
        }
        Commands::Validate => {
            unreachable!("Validate is handled before registry loading");
        }
        Commands::Version => {
            unreachable!("Version is handled before registry loading");
        }
    }

    Ok(())
}
