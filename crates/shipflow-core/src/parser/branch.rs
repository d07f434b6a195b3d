//! branches ノードのパース

use super::first_string;
use crate::error::{ConfigError, Result};
use crate::model::{BranchPattern, BranchRule};
use kdl::KdlNode;

/// パース済みの branches ブロック
#[derive(Debug, Default)]
pub(super) struct ParsedBranches {
    pub rules: Vec<BranchRule>,
    pub default_environment: Option<String>,
}

/// branches ノードをパース
///
/// ```kdl
/// branches default="dev" {
///     rule "main" env="prod"
///     rule "feature/*" env="dev"
/// }
/// ```
pub(super) fn parse_branches(node: &KdlNode) -> Result<ParsedBranches> {
    let mut parsed = ParsedBranches {
        default_environment: node
            .get("default")
            .and_then(|v| v.as_string())
            .map(|s| s.to_string()),
        ..Default::default()
    };

    let Some(children) = node.children() else {
        return Ok(parsed);
    };

    for child in children.nodes() {
        match child.name().value() {
            "rule" => {
                let raw = first_string(child).ok_or_else(|| {
                    ConfigError::InvalidConfig("rule にはブランチパターンが必要です".to_string())
                })?;
                let pattern = BranchPattern::parse(raw)
                    .ok_or_else(|| ConfigError::InvalidBranchPattern(raw.to_string()))?;
                let environment = child
                    .get("env")
                    .or_else(|| child.get("environment"))
                    .and_then(|v| v.as_string())
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        ConfigError::InvalidConfig(format!("rule '{}' に env がありません", raw))
                    })?;
                parsed.rules.push(BranchRule::new(pattern, environment));
            }
            "default" => {
                parsed.default_environment = first_string(child).map(|s| s.to_string());
            }
            other => {
                return Err(ConfigError::InvalidConfig(format!(
                    "branches: 不明な設定 '{}'",
                    other
                )));
            }
        }
    }

    if parsed.default_environment.as_deref() == Some("") {
        return Err(ConfigError::InvalidConfig(
            "branches の default が空です".to_string(),
        ));
    }

    Ok(parsed)
}
