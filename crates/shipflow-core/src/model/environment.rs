//! 環境別オーバーライド定義

use super::service::{EnvVar, Resources, Scaling};
use serde::{Deserialize, Serialize};

/// (環境, サービス) 単位のオーバーライド
///
/// KDL形式：
/// ```kdl
/// environment "prod" {
///     service "user" {
///         resources memory=512
///         scaling min=1 max=20
///         env {
///             LOG_LEVEL "warn"
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentOverride {
    pub environment: String,
    pub service: String,
    /// 指定されたフィールドのみベース値を上書き
    #[serde(default)]
    pub resources: Resources,
    /// 指定時は min/max をペアで置き換える
    #[serde(default)]
    pub scaling: Option<Scaling>,
    /// 名前単位で上書き・追加される環境変数
    #[serde(default)]
    pub env: Vec<EnvVar>,
}

impl EnvironmentOverride {
    pub fn new(environment: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            service: service.into(),
            resources: Resources::default(),
            scaling: None,
            env: Vec::new(),
        }
    }

    pub fn matches(&self, environment: &str, service: &str) -> bool {
        self.environment == environment && self.service == service
    }
}
