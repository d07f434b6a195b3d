//! KDLパーサー
//!
//! shipflowのレジストリ定義（KDL）をパースします。
//! 各ノードタイプのパース処理はモジュールに分離されています。
//! ここではパースのみを行い、整合性の検証は [`crate::registry`] が担当します。

mod branch;
mod environment;
mod service;

use branch::parse_branches;
use environment::parse_environment;
use service::parse_service;

use crate::error::{ConfigError, Result};
use crate::model::BranchRules;
use crate::registry::Registry;
use kdl::{KdlDocument, KdlNode, KdlValue};
use std::fs;
use std::path::Path;
use tracing::warn;

/// KDLファイルをパースしてRegistryを生成
pub fn parse_kdl_file<P: AsRef<Path>>(path: P) -> Result<Registry> {
    let content = fs::read_to_string(path.as_ref())?;
    let name = path
        .as_ref()
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    parse_kdl_string(&content, name)
}

/// KDL文字列をパース
pub fn parse_kdl_string(content: &str, default_name: String) -> Result<Registry> {
    let doc: KdlDocument = content.parse()?;

    let mut project = default_name;
    let mut services = Vec::new();
    let mut overrides = Vec::new();
    let mut branches = BranchRules::default();

    for node in doc.nodes() {
        match node.name().value() {
            "project" => {
                if let Some(name) = first_string(node) {
                    project = name.to_string();
                }
            }
            "service" => {
                services.push(parse_service(node)?);
            }
            "environment" => {
                overrides.extend(parse_environment(node)?);
            }
            "branches" => {
                // 複数ブロックはルールを宣言順に連結、default は後勝ち
                let parsed = parse_branches(node)?;
                branches.rules.extend(parsed.rules);
                if let Some(default) = parsed.default_environment {
                    branches.default_environment = default;
                }
            }
            other => {
                warn!(node = other, "Unknown top-level node, skipping");
            }
        }
    }

    Ok(Registry {
        project,
        services,
        overrides,
        branches,
    })
}

/// ノード名（第1引数）を取得
pub(crate) fn node_label(node: &KdlNode, kind: &str) -> Result<String> {
    first_string(node)
        .map(|s| s.to_string())
        .ok_or_else(|| ConfigError::InvalidConfig(format!("{} requires a name", kind)))
}

/// 最初の位置引数
pub(crate) fn first_arg(node: &KdlNode) -> Option<&KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .map(|e| e.value())
}

/// 最初の位置引数（文字列）
pub(crate) fn first_string(node: &KdlNode) -> Option<&str> {
    first_arg(node).and_then(|v| v.as_string())
}

/// 全ての位置引数（文字列のみ）
pub(crate) fn string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string().map(|s| s.to_string()))
        .collect()
}

/// 整数値として正の値を取り出す
pub(crate) fn positive_integer(value: &KdlValue, context: &str, field: &'static str) -> Result<u64> {
    let raw = value.as_integer().ok_or_else(|| {
        ConfigError::InvalidConfig(format!("{}: {} は整数で指定してください", context, field))
    })?;
    if raw <= 0 {
        return Err(ConfigError::NonPositive {
            context: context.to_string(),
            field,
            value: raw.to_string(),
        });
    }
    u64::try_from(raw).map_err(|_| {
        ConfigError::InvalidConfig(format!("{}: {} が大きすぎます ({})", context, field, raw))
    })
}

/// 数値（整数または小数）として正の値を取り出す
pub(crate) fn positive_number(value: &KdlValue, context: &str, field: &'static str) -> Result<f64> {
    let raw = value
        .as_float()
        .or_else(|| value.as_integer().map(|i| i as f64))
        .ok_or_else(|| {
            ConfigError::InvalidConfig(format!("{}: {} は数値で指定してください", context, field))
        })?;
    if !raw.is_finite() || raw <= 0.0 {
        return Err(ConfigError::NonPositive {
            context: context.to_string(),
            field,
            value: raw.to_string(),
        });
    }
    Ok(raw)
}

/// 0以上の u32 として取り出す（スケーリング用）
pub(crate) fn instance_count(value: &KdlValue, context: &str, field: &str) -> Result<u32> {
    value
        .as_integer()
        .and_then(|i| u32::try_from(i).ok())
        .ok_or_else(|| {
            ConfigError::InvalidConfig(format!(
                "{}: {} は0以上の整数で指定してください",
                context, field
            ))
        })
}

/// 環境変数値として使える文字列表現
pub(crate) fn scalar_to_string(value: &KdlValue) -> Option<String> {
    if let Some(s) = value.as_string() {
        return Some(s.to_string());
    }
    if let Some(i) = value.as_integer() {
        return Some(i.to_string());
    }
    if let Some(f) = value.as_float() {
        return Some(f.to_string());
    }
    value.as_bool().map(|b| b.to_string())
}
