pub mod deploy;
pub mod detect;
pub mod plan;
pub mod resolve;
pub mod validate;

use crate::ChangeArgs;
use shipflow_core::Registry;
use shipflow_deploy::{GitCli, StaticChangeSet, VersionControl};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// プロジェクトルートを決定（明示指定がなければ自動検出）
pub fn project_root(explicit: Option<&Path>) -> shipflow_core::Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => shipflow_core::find_project_root(),
    }
}

/// レジストリをロード
pub fn load_registry(explicit: Option<&Path>) -> anyhow::Result<(PathBuf, Registry)> {
    let root = project_root(explicit)?;
    let registry = shipflow_core::load_project_from_root(&root)?;
    Ok((root, registry))
}

/// 変更ファイルの取得元（--files 指定時は git を使わない）
pub fn version_control(changes: &ChangeArgs, project_root: &Path) -> Arc<dyn VersionControl> {
    match &changes.files {
        Some(files) => Arc::new(StaticChangeSet::new(files.iter().cloned())),
        None => Arc::new(GitCli::new(project_root)),
    }
}
