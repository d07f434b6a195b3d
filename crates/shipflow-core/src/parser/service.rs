//! サービスノードのパース

use super::{
    first_arg, first_string, instance_count, node_label, positive_integer, positive_number,
    scalar_to_string, string_args,
};
use crate::error::{ConfigError, Result};
use crate::model::{EnvVar, Resources, Scaling, ServiceDefinition, ServiceKind, normalize_path};
use kdl::{KdlDocument, KdlNode};
use std::collections::BTreeSet;

/// 設定ブロックの種類
///
/// オーバーライドでは kind / path / secrets を変更できない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Scope {
    Service,
    Override,
}

/// service / override ブロックの中身
#[derive(Debug, Default)]
pub(super) struct Settings {
    pub kind: Option<ServiceKind>,
    pub path: Option<String>,
    pub resources: Resources,
    pub scaling: Option<Scaling>,
    pub env: Vec<EnvVar>,
    pub secrets: BTreeSet<String>,
}

/// service ノードをパース
pub fn parse_service(node: &KdlNode) -> Result<ServiceDefinition> {
    let name = node_label(node, "service")?;
    let context = format!("service '{}'", name);

    let settings = match node.children() {
        Some(children) => parse_settings(children, &context, Scope::Service)?,
        None => Settings::default(),
    };

    let kind = settings
        .kind
        .ok_or_else(|| ConfigError::InvalidConfig(format!("{}: kind が指定されていません", context)))?;

    Ok(ServiceDefinition {
        name,
        path: settings.path.unwrap_or_default(),
        kind,
        resources: settings.resources,
        scaling: settings.scaling,
        env: settings.env,
        secrets: settings.secrets,
    })
}

/// ブロック内の設定ノードをパース
pub(super) fn parse_settings(doc: &KdlDocument, context: &str, scope: Scope) -> Result<Settings> {
    let mut settings = Settings::default();

    for child in doc.nodes() {
        let key = child.name().value();
        match (key, scope) {
            ("kind", Scope::Service) => {
                let raw = first_string(child).ok_or_else(|| {
                    ConfigError::InvalidConfig(format!("{}: kind には文字列を指定してください", context))
                })?;
                settings.kind = Some(ServiceKind::parse(raw).ok_or_else(|| {
                    ConfigError::InvalidConfig(format!(
                        "{}: 不明な kind '{}'（function / container-service）",
                        context, raw
                    ))
                })?);
            }
            ("path", Scope::Service) => {
                settings.path = first_string(child).map(normalize_path);
            }
            ("secrets", Scope::Service) => {
                settings.secrets.extend(string_args(child));
            }
            ("resources", _) => {
                parse_resources(child, context, &mut settings.resources)?;
            }
            // フラット記法
            ("memory", _) => {
                let value = required_arg(child, context)?;
                settings.resources.memory = Some(positive_integer(value, context, "memory")?);
            }
            ("timeout", _) => {
                let value = required_arg(child, context)?;
                settings.resources.timeout = Some(positive_integer(value, context, "timeout")?);
            }
            ("cpu", _) => {
                let value = required_arg(child, context)?;
                settings.resources.cpu = Some(positive_number(value, context, "cpu")?);
            }
            ("scaling", _) => {
                settings.scaling = Some(parse_scaling(child, context)?);
            }
            ("env" | "environment", _) => {
                settings.env.extend(parse_env(child, context)?);
            }
            ("kind" | "path" | "secrets", Scope::Override) => {
                return Err(ConfigError::InvalidConfig(format!(
                    "{}: '{}' は環境オーバーライドでは変更できません",
                    context, key
                )));
            }
            (other, _) => {
                return Err(ConfigError::InvalidConfig(format!(
                    "{}: 不明な設定 '{}'",
                    context, other
                )));
            }
        }
    }

    Ok(settings)
}

fn required_arg<'a>(node: &'a KdlNode, context: &str) -> Result<&'a kdl::KdlValue> {
    first_arg(node).ok_or_else(|| {
        ConfigError::InvalidConfig(format!(
            "{}: '{}' に値がありません",
            context,
            node.name().value()
        ))
    })
}

/// resources memory=256 timeout=60 cpu=1
fn parse_resources(node: &KdlNode, context: &str, resources: &mut Resources) -> Result<()> {
    for entry in node.entries() {
        let Some(name) = entry.name() else {
            return Err(ConfigError::InvalidConfig(format!(
                "{}: resources は memory=... の形式で指定してください",
                context
            )));
        };
        match name.value() {
            "memory" => resources.memory = Some(positive_integer(entry.value(), context, "memory")?),
            "timeout" => {
                resources.timeout = Some(positive_integer(entry.value(), context, "timeout")?)
            }
            "cpu" => resources.cpu = Some(positive_number(entry.value(), context, "cpu")?),
            other => {
                return Err(ConfigError::InvalidConfig(format!(
                    "{}: resources の不明な項目 '{}'",
                    context, other
                )));
            }
        }
    }
    Ok(())
}

/// scaling min=0 max=10
///
/// max は必須、min は省略時 0。
fn parse_scaling(node: &KdlNode, context: &str) -> Result<Scaling> {
    let min = match node.get("min") {
        Some(value) => instance_count(value, context, "scaling.min")?,
        None => 0,
    };
    let max = node
        .get("max")
        .ok_or_else(|| {
            ConfigError::InvalidConfig(format!("{}: scaling には max が必要です", context))
        })
        .and_then(|value| instance_count(value, context, "scaling.max"))?;

    let scaling = Scaling::new(min, max);
    if !scaling.is_valid() {
        return Err(ConfigError::InvalidScaling {
            context: context.to_string(),
            min,
            max,
        });
    }
    Ok(scaling)
}

/// env ブロックをパース
///
/// ```kdl
/// env {
///     LOG_LEVEL "info"
///     DB_PASSWORD secret="user-db-password"
/// }
/// ```
fn parse_env(node: &KdlNode, context: &str) -> Result<Vec<EnvVar>> {
    let mut vars = Vec::new();
    let Some(children) = node.children() else {
        // 子ノードがない場合は env "KEY=VALUE" 形式
        if let Some((k, v)) = first_string(node).and_then(|s| s.split_once('=')) {
            vars.push(EnvVar::literal(k.trim(), v.trim()));
        }
        return Ok(vars);
    };

    for var in children.nodes() {
        let name = var.name().value().to_string();
        if let Some(reference) = var.get("secret").and_then(|v| v.as_string()) {
            vars.push(EnvVar::secret(name, reference));
        } else if let Some(value) = first_arg(var).and_then(scalar_to_string) {
            vars.push(EnvVar::literal(name, value));
        } else {
            return Err(ConfigError::InvalidConfig(format!(
                "{}: 環境変数 '{}' に値またはsecretがありません",
                context, name
            )));
        }
    }
    Ok(vars)
}
