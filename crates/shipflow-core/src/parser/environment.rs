//! environment ノードのパース

use super::node_label;
use super::service::{Scope, parse_settings};
use crate::error::{ConfigError, Result};
use crate::model::EnvironmentOverride;
use kdl::KdlNode;

/// environment ノードをパース
///
/// 環境内の service ブロックごとに1件のオーバーライドを返す。
/// 参照先サービスの存在確認はレジストリ検証で行う。
pub fn parse_environment(node: &KdlNode) -> Result<Vec<EnvironmentOverride>> {
    let environment = node_label(node, "environment")?;
    let mut overrides = Vec::new();

    let Some(children) = node.children() else {
        return Ok(overrides);
    };

    for child in children.nodes() {
        match child.name().value() {
            "service" => {
                let service = node_label(child, "service")?;
                let context = format!("environment '{}' / service '{}'", environment, service);
                let settings = match child.children() {
                    Some(body) => parse_settings(body, &context, Scope::Override)?,
                    None => Default::default(),
                };
                overrides.push(EnvironmentOverride {
                    environment: environment.clone(),
                    service,
                    resources: settings.resources,
                    scaling: settings.scaling,
                    env: settings.env,
                });
            }
            other => {
                return Err(ConfigError::InvalidConfig(format!(
                    "environment '{}': 不明な設定 '{}'",
                    environment, other
                )));
            }
        }
    }

    Ok(overrides)
}
