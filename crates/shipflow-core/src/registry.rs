//! サービスレジストリ
//!
//! サービス定義・環境オーバーライド・ブランチルールを保持し、
//! ロード時に整合性を検証する。検証エラーがある限りデプロイは一切行わない。

use crate::error::{ConfigError, Result};
use crate::model::{
    BranchRules, EnvVar, EnvironmentOverride, Resources, Scaling, ServiceDefinition, path_within,
};
use crate::parser::parse_kdl_string;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

/// ロード済みレジストリ
///
/// 1回の実行の間は読み取り専用として共有される。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    /// プロジェクト名
    pub project: String,
    /// サービス定義（宣言順）
    pub services: Vec<ServiceDefinition>,
    /// 環境別オーバーライド（宣言順）
    pub overrides: Vec<EnvironmentOverride>,
    /// ブランチ → 環境のルール
    pub branches: BranchRules,
}

impl Registry {
    /// KDL文字列からロードして検証する
    pub fn load(content: &str, default_name: impl Into<String>) -> Result<Self> {
        let registry = parse_kdl_string(content, default_name.into())?;
        registry.validate()?;
        info!(
            project = %registry.project,
            services = registry.services.len(),
            overrides = registry.overrides.len(),
            rules = registry.branches.rules.len(),
            "Registry loaded"
        );
        Ok(registry)
    }

    /// 名前でサービスを取得
    pub fn lookup(&self, name: &str) -> Result<&ServiceDefinition> {
        self.get(name)
            .ok_or_else(|| ConfigError::ServiceNotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&ServiceDefinition> {
        self.services.iter().find(|s| s.name == name)
    }

    /// サービス名の一覧（宣言順）
    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.services.iter().map(|s| s.name.as_str())
    }

    /// 指定環境のオーバーライド
    pub fn overrides_for<'a>(
        &'a self,
        environment: &'a str,
    ) -> impl Iterator<Item = &'a EnvironmentOverride> + 'a {
        self.overrides
            .iter()
            .filter(move |o| o.environment == environment)
    }

    /// 既知の環境名（オーバーライド・ブランチルール・デフォルトから収集）
    pub fn environments(&self) -> BTreeSet<&str> {
        let mut envs: BTreeSet<&str> = self
            .overrides
            .iter()
            .map(|o| o.environment.as_str())
            .collect();
        envs.extend(self.branches.rules.iter().map(|r| r.environment.as_str()));
        envs.insert(self.branches.default_environment.as_str());
        envs
    }

    /// 整合性を検証する
    ///
    /// - サービス名の重複
    /// - path が空、または他サービスと重なる
    /// - リソース値が正でない / scaling が不正
    /// - 環境変数名の重複
    /// - 未登録サービスを参照するオーバーライド、同一 (環境, サービス) の重複
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for service in &self.services {
            if !names.insert(service.name.as_str()) {
                return Err(ConfigError::DuplicateService(service.name.clone()));
            }
            let context = format!("service '{}'", service.name);
            if service.path.is_empty() {
                return Err(ConfigError::EmptyPath {
                    service: service.name.clone(),
                });
            }
            validate_resources(&service.resources, &context)?;
            validate_scaling(service.scaling.as_ref(), &context)?;
            validate_env(&service.env, &context)?;
        }

        self.validate_paths()?;

        let mut seen = HashSet::new();
        for ov in &self.overrides {
            if !names.contains(ov.service.as_str()) {
                return Err(ConfigError::DanglingOverride {
                    environment: ov.environment.clone(),
                    service: ov.service.clone(),
                });
            }
            if !seen.insert((ov.environment.as_str(), ov.service.as_str())) {
                return Err(ConfigError::DuplicateOverride {
                    environment: ov.environment.clone(),
                    service: ov.service.clone(),
                });
            }
            let context = format!("environment '{}' / service '{}'", ov.environment, ov.service);
            validate_resources(&ov.resources, &context)?;
            validate_scaling(ov.scaling.as_ref(), &context)?;
            validate_env(&ov.env, &context)?;
        }

        if self.branches.default_environment.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "branches の default が空です".to_string(),
            ));
        }

        debug!(services = self.services.len(), "Registry validated");
        Ok(())
    }

    /// path の重なりを検出する（セグメント単位）
    fn validate_paths(&self) -> Result<()> {
        for (i, a) in self.services.iter().enumerate() {
            for b in &self.services[i + 1..] {
                if path_within(&a.path, &b.path) || path_within(&b.path, &a.path) {
                    return Err(ConfigError::OverlappingPath {
                        first: a.name.clone(),
                        first_path: a.path.clone(),
                        second: b.name.clone(),
                        second_path: b.path.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn validate_resources(resources: &Resources, context: &str) -> Result<()> {
    let non_positive = |field: &'static str, value: String| ConfigError::NonPositive {
        context: context.to_string(),
        field,
        value,
    };
    if let Some(memory) = resources.memory
        && memory == 0
    {
        return Err(non_positive("memory", memory.to_string()));
    }
    if let Some(timeout) = resources.timeout
        && timeout == 0
    {
        return Err(non_positive("timeout", timeout.to_string()));
    }
    if let Some(cpu) = resources.cpu
        && !(cpu.is_finite() && cpu > 0.0)
    {
        return Err(non_positive("cpu", cpu.to_string()));
    }
    Ok(())
}

fn validate_scaling(scaling: Option<&Scaling>, context: &str) -> Result<()> {
    match scaling {
        Some(s) if !s.is_valid() => Err(ConfigError::InvalidScaling {
            context: context.to_string(),
            min: s.min_instances,
            max: s.max_instances,
        }),
        _ => Ok(()),
    }
}

fn validate_env(env: &[EnvVar], context: &str) -> Result<()> {
    let mut names = HashSet::new();
    for var in env {
        if !names.insert(var.name.as_str()) {
            return Err(ConfigError::DuplicateEnvVar {
                context: context.to_string(),
                name: var.name.clone(),
            });
        }
    }
    Ok(())
}
