//! ファイル自動発見機能
//!
//! 規約ベースのディレクトリ構造からレジストリのKDLファイルを発見します。
//!
//! ```text
//! project/
//! ├── shipflow.kdl            (または .shipflow/shipflow.kdl)
//! ├── services/**/*.kdl
//! └── environments/**/*.kdl
//! ```

use crate::error::{ConfigError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// プロジェクトルートを上書きする環境変数
pub const PROJECT_ROOT_ENV: &str = "SHIPFLOW_PROJECT_ROOT";

/// ルートファイル名
pub const ROOT_FILE: &str = "shipflow.kdl";

/// 発見されたファイル群
#[derive(Debug, Clone, Default)]
pub struct DiscoveredFiles {
    /// ルートファイル (shipflow.kdl)
    pub root: Option<PathBuf>,
    /// サービス定義ファイル (services/**/*.kdl)
    pub services: Vec<PathBuf>,
    /// 環境オーバーライドファイル (environments/**/*.kdl)
    pub environments: Vec<PathBuf>,
}

impl DiscoveredFiles {
    /// 読み込み順（ルート → services → environments）に並べたファイル一覧
    pub fn all(&self) -> impl Iterator<Item = &PathBuf> {
        self.root
            .iter()
            .chain(self.services.iter())
            .chain(self.environments.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.all().next().is_none()
    }
}

/// プロジェクトルートを検出
///
/// 以下の優先順位で検索:
/// 1. 環境変数 SHIPFLOW_PROJECT_ROOT
/// 2. カレントディレクトリから上に向かって以下を探す:
///    - shipflow.kdl
///    - .shipflow/shipflow.kdl
#[tracing::instrument]
pub fn find_project_root() -> Result<PathBuf> {
    // 1. 環境変数
    if let Ok(root) = std::env::var(PROJECT_ROOT_ENV) {
        let path = PathBuf::from(&root);
        debug!(env_root = %root, "Checking SHIPFLOW_PROJECT_ROOT");
        if root_file_in(&path).is_some() {
            info!(project_root = %path.display(), "Found project root from environment variable");
            return Ok(path);
        }
        warn!(env_root = %root, "SHIPFLOW_PROJECT_ROOT does not contain shipflow.kdl, ignoring");
    }

    // 2. カレントディレクトリから上に向かって探す
    let start_dir = std::env::current_dir()?;
    find_project_root_from(&start_dir)
}

/// 指定ディレクトリから上に向かってプロジェクトルートを探す
pub fn find_project_root_from(start_dir: &Path) -> Result<PathBuf> {
    let mut current = start_dir.to_path_buf();
    debug!(start_dir = %start_dir.display(), "Searching for project root");

    loop {
        if let Some(file) = root_file_in(&current) {
            info!(project_root = %current.display(), file = %file.display(), "Found project root");
            return Ok(current);
        }

        // 親ディレクトリへ
        if !current.pop() {
            break;
        }
    }

    warn!(start_dir = %start_dir.display(), "Project root not found");
    Err(ConfigError::ProjectRootNotFound(start_dir.to_path_buf()))
}

/// shipflow.kdl または .shipflow/shipflow.kdl（前者優先）
fn root_file_in(dir: &Path) -> Option<PathBuf> {
    [dir.join(ROOT_FILE), dir.join(".shipflow").join(ROOT_FILE)]
        .into_iter()
        .find(|p| p.is_file())
}

/// プロジェクトルートからファイルを自動発見
#[tracing::instrument(skip(project_root), fields(project_root = %project_root.display()))]
pub fn discover_files(project_root: &Path) -> Result<DiscoveredFiles> {
    debug!("Starting file discovery");
    let mut discovered = DiscoveredFiles {
        root: root_file_in(project_root),
        ..Default::default()
    };
    if let Some(root) = &discovered.root {
        debug!(file = %root.display(), "Found root file");
    }

    // services/**/*.kdl
    let services_dir = project_root.join("services");
    if services_dir.is_dir() {
        discovered.services = discover_kdl_files(&services_dir)?;
        info!(
            service_count = discovered.services.len(),
            "Discovered service files"
        );
    }

    // environments/**/*.kdl
    let environments_dir = project_root.join("environments");
    if environments_dir.is_dir() {
        discovered.environments = discover_kdl_files(&environments_dir)?;
        info!(
            environment_count = discovered.environments.len(),
            "Discovered environment files"
        );
    }

    Ok(discovered)
}

/// ディレクトリ配下の .kdl ファイルを再帰的に発見
///
/// アルファベット順にソートして返す
fn discover_kdl_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut visited = HashSet::new();

    visit_dir(dir, &mut files, &mut visited)?;
    files.sort();

    Ok(files)
}

/// ディレクトリを再帰的に走査
fn visit_dir(dir: &Path, files: &mut Vec<PathBuf>, visited: &mut HashSet<PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    // シンボリックリンクのループ検出
    let canonical_dir = dir.canonicalize().map_err(|e| ConfigError::DiscoveryError {
        path: dir.to_path_buf(),
        message: format!("パスの正規化に失敗: {}", e),
    })?;
    if !visited.insert(canonical_dir.clone()) {
        warn!(dir = %canonical_dir.display(), "Symlink loop detected, skipping");
        return Ok(());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| ConfigError::DiscoveryError {
        path: dir.to_path_buf(),
        message: format!("ディレクトリの読み込みに失敗: {}", e),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DiscoveryError {
            path: dir.to_path_buf(),
            message: format!("ディレクトリエントリの読み込みに失敗: {}", e),
        })?;
        let path = entry.path();

        if path.is_dir() {
            visit_dir(&path, files, visited)?;
        } else if path.extension().and_then(|s| s.to_str()) == Some("kdl") {
            files.push(path);
        }
    }

    Ok(())
}
