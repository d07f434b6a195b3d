use crate::ChangeArgs;
use colored::Colorize;
use shipflow_core::Registry;
use std::path::Path;

pub async fn handle(
    registry: &Registry,
    project_root: &Path,
    changes: &ChangeArgs,
    json: bool,
) -> anyhow::Result<()> {
    let vcs = super::version_control(changes, project_root);
    let files = vcs.changed_files(&changes.from, &changes.to).await?;
    let changed = shipflow_core::detect(&files, &registry.services);

    if json {
        println!("{}", serde_json::to_string_pretty(&changed)?);
        return Ok(());
    }

    println!("変更ファイル: {}個", files.len());
    if changed.is_empty() {
        println!("{}", "変更されたサービスはありません".yellow());
        return Ok(());
    }

    println!("{}", format!("変更されたサービス ({} 個):", changed.len()).bold());
    for name in &changed {
        let path = registry.get(name).map(|s| s.path.as_str()).unwrap_or("");
        println!("  • {} ({})", name.cyan(), path.dimmed());
    }
    Ok(())
}
