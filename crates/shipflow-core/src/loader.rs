//! 統合ローダー
//!
//! ファイル発見、結合、パース、検証を統合

use crate::discovery::{DiscoveredFiles, discover_files, find_project_root};
use crate::error::{ConfigError, Result};
use crate::registry::Registry;
use std::path::Path;
use tracing::{debug, info, instrument};

/// ファイルあたりの推定バイト数（容量事前確保用）
const ESTIMATED_BYTES_PER_FILE: usize = 500;

/// プロジェクト全体をロードしてRegistryを生成
///
/// 以下の処理を実行:
/// 1. プロジェクトルートの検出
/// 2. ファイルの自動発見
/// 3. 結合してKDLパース
/// 4. 整合性の検証
#[instrument]
pub fn load_project() -> Result<Registry> {
    info!("Starting project load");
    let project_root = find_project_root()?;
    load_project_from_root(&project_root)
}

/// 指定されたルートディレクトリからプロジェクトをロード
#[instrument(skip(project_root), fields(project_root = %project_root.display()))]
pub fn load_project_from_root(project_root: &Path) -> Result<Registry> {
    // 1. ファイル発見
    debug!("Step 1: Discovering files");
    let discovered = discover_files(project_root)?;
    if discovered.root.is_none() {
        return Err(ConfigError::ProjectRootNotFound(project_root.to_path_buf()));
    }

    // 2. 結合
    debug!("Step 2: Concatenating files");
    let content = concat_files(&discovered)?;

    // 3. パースと検証
    debug!("Step 3: Parsing and validating");
    let name = project_root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    let registry = Registry::load(&content, name)?;
    info!(
        services = registry.services.len(),
        overrides = registry.overrides.len(),
        "Project loaded successfully"
    );

    Ok(registry)
}

/// 発見したファイルを読み込み順に結合
fn concat_files(discovered: &DiscoveredFiles) -> Result<String> {
    let file_count = discovered.all().count();
    let mut content = String::with_capacity(file_count * ESTIMATED_BYTES_PER_FILE);

    for file in discovered.all() {
        debug!(file = %file.display(), "Reading file");
        let text = std::fs::read_to_string(file).map_err(|e| ConfigError::IoError {
            path: file.clone(),
            message: e.to_string(),
        })?;
        content.push_str(&text);
        content.push_str("\n\n");
    }

    Ok(content)
}
