//! レジストリのKDL書き出し
//!
//! [`crate::parser`] が読み込める形式でレジストリを [`KdlDocument`] に変換する。
//! 書き出した結果を再度ロードすると同じ定義が得られる。

use crate::model::{EnvValue, EnvVar, Resources, Scaling, ServiceDefinition};
use crate::registry::Registry;
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};

/// レジストリをKDL文字列に変換
pub fn to_kdl_string(registry: &Registry) -> String {
    let mut doc = to_kdl_document(registry);
    doc.autoformat();
    escape_disallowed(&doc.to_string())
}

/// レジストリをKDLドキュメントに変換
pub fn to_kdl_document(registry: &Registry) -> KdlDocument {
    let mut doc = KdlDocument::new();
    let nodes = doc.nodes_mut();

    nodes.push(labeled("project", &registry.project));
    nodes.extend(registry.services.iter().map(service_node));

    // 同じ環境が連続するオーバーライドは1ブロックにまとめる（順序は保持）
    let mut current: Option<(&str, KdlDocument)> = None;
    for ov in &registry.overrides {
        let mut body = KdlDocument::new();
        push_settings(&mut body, &ov.resources, ov.scaling.as_ref(), &ov.env);
        let mut node = labeled("service", &ov.service);
        set_children(&mut node, body);

        let continues = matches!(&current, Some((env, _)) if *env == ov.environment);
        if !continues && let Some((env, block)) = current.take() {
            nodes.push(environment_node(env, block));
        }
        current
            .get_or_insert_with(|| (ov.environment.as_str(), KdlDocument::new()))
            .1
            .nodes_mut()
            .push(node);
    }
    if let Some((env, block)) = current {
        nodes.push(environment_node(env, block));
    }

    nodes.push(branches_node(registry));
    doc
}

fn environment_node(environment: &str, block: KdlDocument) -> KdlNode {
    let mut node = labeled("environment", environment);
    node.set_children(block);
    node
}

fn branches_node(registry: &Registry) -> KdlNode {
    let branches = &registry.branches;
    let mut node = KdlNode::new("branches");
    node.entries_mut().push(KdlEntry::new_prop(
        "default",
        string(&branches.default_environment),
    ));

    let mut rules = KdlDocument::new();
    for rule in &branches.rules {
        let mut rule_node = labeled("rule", &rule.pattern.to_string());
        rule_node
            .entries_mut()
            .push(KdlEntry::new_prop("env", string(&rule.environment)));
        rules.nodes_mut().push(rule_node);
    }
    set_children(&mut node, rules);
    node
}

fn service_node(service: &ServiceDefinition) -> KdlNode {
    let mut node = labeled("service", &service.name);

    let mut children = KdlDocument::new();
    children
        .nodes_mut()
        .push(labeled("kind", service.kind.as_str()));
    children.nodes_mut().push(labeled("path", &service.path));
    push_settings(
        &mut children,
        &service.resources,
        service.scaling.as_ref(),
        &service.env,
    );
    if !service.secrets.is_empty() {
        let mut secrets = KdlNode::new("secrets");
        secrets
            .entries_mut()
            .extend(service.secrets.iter().map(|s| KdlEntry::new(string(s))));
        children.nodes_mut().push(secrets);
    }

    node.set_children(children);
    node
}

/// resources / scaling / env ノードを追加
fn push_settings(
    doc: &mut KdlDocument,
    resources: &Resources,
    scaling: Option<&Scaling>,
    env: &[EnvVar],
) {
    if !resources.is_empty() {
        let mut node = KdlNode::new("resources");
        let entries = node.entries_mut();
        if let Some(memory) = resources.memory {
            entries.push(KdlEntry::new_prop("memory", integer(memory)));
        }
        if let Some(timeout) = resources.timeout {
            entries.push(KdlEntry::new_prop("timeout", integer(timeout)));
        }
        if let Some(cpu) = resources.cpu {
            entries.push(KdlEntry::new_prop("cpu", KdlValue::Float(cpu)));
        }
        doc.nodes_mut().push(node);
    }

    if let Some(scaling) = scaling {
        let mut node = KdlNode::new("scaling");
        let entries = node.entries_mut();
        entries.push(KdlEntry::new_prop("min", integer(scaling.min_instances)));
        entries.push(KdlEntry::new_prop("max", integer(scaling.max_instances)));
        doc.nodes_mut().push(node);
    }

    if !env.is_empty() {
        let mut vars = KdlDocument::new();
        for var in env {
            let mut node = KdlNode::new(var.name.as_str());
            let entry = match &var.value {
                EnvValue::Literal(value) => KdlEntry::new(string(value)),
                EnvValue::Secret(reference) => KdlEntry::new_prop("secret", string(reference)),
            };
            node.entries_mut().push(entry);
            vars.nodes_mut().push(node);
        }
        let mut node = KdlNode::new("env");
        node.set_children(vars);
        doc.nodes_mut().push(node);
    }
}

/// `name "label"` 形式のノード
fn labeled(name: &str, label: &str) -> KdlNode {
    let mut node = KdlNode::new(name);
    node.entries_mut().push(KdlEntry::new(string(label)));
    node
}

fn set_children(node: &mut KdlNode, children: KdlDocument) {
    if !children.nodes().is_empty() {
        node.set_children(children);
    }
}

fn string(value: &str) -> KdlValue {
    KdlValue::String(value.to_string())
}

fn integer(value: impl Into<i128>) -> KdlValue {
    KdlValue::Integer(value.into())
}

/// KDLに直接書けないコードポイントを `\u{...}` にする
///
/// 対象の文字は識別子にはなれないため、出力中では必ず引用符付き文字列の内側にある。
fn escape_disallowed(kdl: &str) -> String {
    kdl.chars().fold(String::with_capacity(kdl.len()), |mut out, c| {
        if is_disallowed(c) {
            out.push_str(&format!("\\u{{{:x}}}", c as u32));
        } else {
            out.push(c);
        }
        out
    })
}

fn is_disallowed(c: char) -> bool {
    matches!(
        c,
        '\u{0}'..='\u{8}'
            | '\u{e}'..='\u{1f}'
            | '\u{7f}'
            | '\u{200e}'
            | '\u{200f}'
            | '\u{202a}'..='\u{202e}'
            | '\u{2066}'..='\u{2069}'
            | '\u{feff}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BranchPattern, BranchRule, BranchRules, EnvironmentOverride, ServiceKind};

    fn sample_registry() -> Registry {
        let mut user = ServiceDefinition::new("user", "backend/user", ServiceKind::Function);
        user.resources = Resources {
            memory: Some(256),
            timeout: Some(60),
            cpu: Some(0.5),
        };
        user.scaling = Some(Scaling::new(0, 10));
        user.env = vec![
            EnvVar::literal("LOG_LEVEL", "info"),
            EnvVar::literal("GREETING", "say \"hi\"\nthen leave"),
            EnvVar::secret("DB_PASSWORD", "user-db-password"),
        ];
        user.secrets.insert("user-api-key".to_string());

        let ui = ServiceDefinition::new("ui", "ui", ServiceKind::ContainerService);

        let mut prod_user = EnvironmentOverride::new("prod", "user");
        prod_user.resources.memory = Some(512);
        prod_user.env = vec![EnvVar::literal("LOG_LEVEL", "warn")];
        let mut staging_ui = EnvironmentOverride::new("staging", "ui");
        staging_ui.scaling = Some(Scaling::new(1, 3));
        let mut prod_ui = EnvironmentOverride::new("prod", "ui");
        prod_ui.resources.cpu = Some(2.0);

        Registry {
            project: "shop".to_string(),
            services: vec![user, ui],
            overrides: vec![prod_user, staging_ui, prod_ui],
            branches: BranchRules::new(
                vec![
                    BranchRule::new(BranchPattern::parse("main").unwrap(), "prod"),
                    BranchRule::new(BranchPattern::parse("feature/*").unwrap(), "dev"),
                ],
                "dev",
            ),
        }
    }

    #[test]
    fn test_round_trip() {
        let registry = sample_registry();
        let kdl = to_kdl_string(&registry);

        let reloaded = Registry::load(&kdl, "unused").unwrap();
        assert_eq!(reloaded, registry);
    }

    #[test]
    fn test_document_structure() {
        let doc = to_kdl_document(&sample_registry());
        let names: Vec<_> = doc.nodes().iter().map(|n| n.name().value()).collect();
        assert_eq!(
            names,
            vec!["project", "service", "service", "environment", "environment", "environment", "branches"]
        );

        let branches = doc.get("branches").unwrap();
        assert_eq!(branches.get("default").and_then(|v| v.as_string()), Some("dev"));
        assert_eq!(branches.children().unwrap().nodes().len(), 2);
    }

    #[test]
    fn test_empty_registry() {
        let registry = Registry {
            project: "empty".to_string(),
            ..Default::default()
        };
        let kdl = to_kdl_string(&registry);
        assert_eq!(Registry::load(&kdl, "x").unwrap(), registry);
    }

    #[test]
    fn test_awkward_names_and_values_round_trip() {
        let mut svc = ServiceDefinition::new("user", "backend/user", ServiceKind::Function);
        svc.env = vec![
            EnvVar::literal("1ST", "true"),
            EnvVar::literal("HAS SPACE", "null"),
            EnvVar::literal("true", "back\\slash\ttab"),
            EnvVar::literal("BIDI", "a\u{202e}b"),
            EnvVar::literal("BOM", "\u{feff}x\u{1}"),
        ];
        let registry = Registry {
            project: "my project".to_string(),
            services: vec![svc],
            ..Default::default()
        };

        let kdl = to_kdl_string(&registry);
        assert!(!kdl.contains('\u{202e}'));
        assert!(!kdl.contains('\u{feff}'));

        let reloaded = Registry::load(&kdl, "unused").unwrap();
        assert_eq!(reloaded, registry);
    }
}
