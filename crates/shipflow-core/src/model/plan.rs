//! デプロイ計画

use super::service::{EnvVar, Resources, Scaling, ServiceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 1回の実行で1サービス・1環境に対して解決済みのデプロイパラメータ
///
/// 永続化はしない。オーケストレーターの各タスクが1つずつ所有する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    pub service: String,
    pub kind: ServiceKind,
    pub environment: String,
    pub resources: Resources,
    pub scaling: Option<Scaling>,
    pub env: Vec<EnvVar>,
    pub secrets: BTreeSet<String>,
    /// デプロイ先リソース名（`{environment}-{service}`）
    pub resource_name: String,
}

/// デプロイ先リソース名の命名規則
///
/// 同じサービスでも環境ごとに名前が衝突しない。
pub fn resource_name(environment: &str, service: &str) -> String {
    format!("{}-{}", environment, service)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_name() {
        assert_eq!(resource_name("prod", "user"), "prod-user");
        assert_eq!(
            resource_name("staging", "notification_service"),
            "staging-notification_service"
        );
    }
}
