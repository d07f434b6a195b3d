//! デプロイ計画の生成
//!
//! サービスのベース設定に環境別オーバーライドを重ねて、
//! 1サービス・1環境分の [`DeploymentPlan`] を組み立てる。

use crate::error::Result;
use crate::model::{DeploymentPlan, EnvVar, EnvironmentOverride, ServiceDefinition, resource_name};
use crate::registry::Registry;
use tracing::debug;

/// サービスと環境からデプロイ計画を作る
///
/// - リソース: オーバーライドで指定されたフィールドのみ置き換え
/// - スケーリング: 指定されていれば min/max をペアで置き換え
/// - 環境変数: 同名はベースの位置のまま値を置き換え、新規はオーバーライドの順で末尾に追加
/// - シークレット: サービスの secrets と、解決後の環境変数が参照するシークレットの和集合
pub fn plan(
    service: &ServiceDefinition,
    environment: &str,
    overrides: &[EnvironmentOverride],
) -> DeploymentPlan {
    let base = DeploymentPlan {
        service: service.name.clone(),
        kind: service.kind,
        environment: environment.to_string(),
        resources: service.resources.clone(),
        scaling: service.scaling,
        env: service.env.clone(),
        secrets: service.secrets.clone(),
        resource_name: resource_name(environment, &service.name),
    };
    replan(base, overrides)
}

/// 既存の計画に同じオーバーライドを適用し直す
///
/// 同じオーバーライドを何度適用しても結果は変わらない。
pub fn replan(mut plan: DeploymentPlan, overrides: &[EnvironmentOverride]) -> DeploymentPlan {
    if let Some(ov) = overrides
        .iter()
        .find(|o| o.matches(&plan.environment, &plan.service))
    {
        debug!(
            service = %plan.service,
            environment = %plan.environment,
            "Applying environment override"
        );
        plan.resources.merge(&ov.resources);
        if ov.scaling.is_some() {
            plan.scaling = ov.scaling;
        }
        merge_env(&mut plan.env, &ov.env);
    }

    plan.secrets.extend(
        plan.env
            .iter()
            .filter_map(|var| var.value.secret_ref())
            .map(str::to_string),
    );
    plan.resource_name = resource_name(&plan.environment, &plan.service);
    plan
}

/// レジストリからサービスを引いて計画を作る
pub fn plan_service(registry: &Registry, name: &str, environment: &str) -> Result<DeploymentPlan> {
    let service = registry.lookup(name)?;
    Ok(plan(service, environment, &registry.overrides))
}

fn merge_env(base: &mut Vec<EnvVar>, overrides: &[EnvVar]) {
    for var in overrides {
        match base.iter_mut().find(|b| b.name == var.name) {
            Some(existing) => existing.value = var.value.clone(),
            None => base.push(var.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EnvValue, Resources, Scaling, ServiceKind};
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn user_service() -> ServiceDefinition {
        let mut svc = ServiceDefinition::new("user", "backend/user", ServiceKind::Function);
        svc.resources = Resources {
            memory: Some(256),
            timeout: Some(60),
            cpu: None,
        };
        svc.scaling = Some(Scaling::new(0, 10));
        svc.env = vec![
            EnvVar::literal("LOG_LEVEL", "info"),
            EnvVar::literal("REGION", "asia-northeast1"),
        ];
        svc.secrets.insert("user-api-key".to_string());
        svc
    }

    #[test]
    fn test_plan_without_override() {
        let plan = plan(&user_service(), "dev", &[]);

        assert_eq!(plan.service, "user");
        assert_eq!(plan.environment, "dev");
        assert_eq!(plan.resource_name, "dev-user");
        assert_eq!(plan.resources.memory, Some(256));
        assert_eq!(plan.scaling, Some(Scaling::new(0, 10)));
        assert_eq!(plan.env, user_service().env);
    }

    #[test]
    fn test_plan_memory_override_keeps_scaling() {
        let mut ov = EnvironmentOverride::new("prod", "user");
        ov.resources.memory = Some(512);

        let plan = plan(&user_service(), "prod", &[ov]);

        assert_eq!(plan.resources.memory, Some(512));
        assert_eq!(plan.resources.timeout, Some(60));
        assert_eq!(plan.scaling, Some(Scaling::new(0, 10)));
        assert_eq!(plan.resource_name, "prod-user");
    }

    #[test]
    fn test_plan_ignores_other_environment_override() {
        let mut ov = EnvironmentOverride::new("prod", "user");
        ov.resources.memory = Some(512);

        let plan = plan(&user_service(), "staging", &[ov]);
        assert_eq!(plan.resources.memory, Some(256));
    }

    #[test]
    fn test_plan_scaling_replaced_as_pair() {
        let mut ov = EnvironmentOverride::new("prod", "user");
        ov.scaling = Some(Scaling::new(2, 20));

        let plan = plan(&user_service(), "prod", &[ov]);
        assert_eq!(plan.scaling, Some(Scaling::new(2, 20)));
    }

    #[test]
    fn test_plan_env_merge_order() {
        let mut ov = EnvironmentOverride::new("prod", "user");
        ov.env = vec![
            EnvVar::literal("FEATURE_FLAG", "on"),
            EnvVar::literal("LOG_LEVEL", "warn"),
            EnvVar::secret("DB_PASSWORD", "user-db-password"),
        ];

        let plan = plan(&user_service(), "prod", &[ov]);

        let names: Vec<_> = plan.env.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["LOG_LEVEL", "REGION", "FEATURE_FLAG", "DB_PASSWORD"]);
        assert_eq!(plan.env[0].value, EnvValue::Literal("warn".to_string()));
        assert_eq!(
            plan.secrets,
            BTreeSet::from(["user-api-key".to_string(), "user-db-password".to_string()])
        );
    }

    #[test]
    fn test_plan_service_not_found() {
        let registry = Registry {
            services: vec![user_service()],
            ..Default::default()
        };
        assert!(plan_service(&registry, "user", "prod").is_ok());
        assert!(plan_service(&registry, "billing", "prod").is_err());
    }

    fn env_var_strategy() -> impl Strategy<Value = EnvVar> {
        let name = prop::sample::select(vec!["LOG_LEVEL", "REGION", "FEATURE_FLAG", "DB_URL"]);
        (name, "[a-z0-9]{0,6}", any::<bool>()).prop_map(|(name, value, secret)| {
            if secret {
                EnvVar::secret(name, value)
            } else {
                EnvVar::literal(name, value)
            }
        })
    }

    fn override_strategy() -> impl Strategy<Value = EnvironmentOverride> {
        (
            prop::sample::select(vec!["prod", "staging"]),
            prop::option::of(1u64..4096),
            prop::option::of(1u64..900),
            prop::option::of((0u32..5, 1u32..5).prop_map(|(min, extra)| Scaling::new(min, min + extra))),
            prop::collection::vec(env_var_strategy(), 0..4),
        )
            .prop_map(|(env, memory, timeout, scaling, vars)| {
                let mut ov = EnvironmentOverride::new(env, "user");
                ov.resources.memory = memory;
                ov.resources.timeout = timeout;
                ov.scaling = scaling;
                // 1ブロック内の環境変数名は一意
                let mut seen = BTreeSet::new();
                ov.env = vars
                    .into_iter()
                    .filter(|v| seen.insert(v.name.clone()))
                    .collect();
                ov
            })
    }

    proptest! {
        #[test]
        fn prop_replan_is_idempotent(
            overrides in prop::collection::vec(override_strategy(), 0..3),
            environment in prop::sample::select(vec!["prod", "staging", "dev"]),
        ) {
            let planned = plan(&user_service(), environment, &overrides);
            let again = replan(planned.clone(), &overrides);
            prop_assert_eq!(again, planned);
        }

        #[test]
        fn prop_resource_name_format(environment in "[a-z]{1,8}") {
            let planned = plan(&user_service(), &environment, &[]);
            prop_assert_eq!(planned.resource_name, format!("{}-user", environment));
        }
    }
}
