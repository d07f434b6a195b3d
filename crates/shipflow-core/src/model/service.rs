//! サービス定義

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// サービス定義
///
/// KDL形式：
/// ```kdl
/// service "user" {
///     kind "function"
///     path "backend/services/user_service"
///     resources memory=256 timeout=60
///     scaling min=0 max=10
///     env {
///         LOG_LEVEL "info"
///         DB_PASSWORD secret="user-db-password"
///     }
///     secrets "user-api-key"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    /// サービス名（レジストリ内で一意）
    pub name: String,
    /// 変更検知に使うパスプレフィックス（リポジトリルートからの相対パス）
    pub path: String,
    /// デプロイ形態
    pub kind: ServiceKind,
    /// ベースのリソース設定
    #[serde(default)]
    pub resources: Resources,
    /// ベースのスケーリング設定
    #[serde(default)]
    pub scaling: Option<Scaling>,
    /// 環境変数（宣言順を保持）
    #[serde(default)]
    pub env: Vec<EnvVar>,
    /// マウントするシークレット参照
    #[serde(default)]
    pub secrets: BTreeSet<String>,
}

impl ServiceDefinition {
    pub fn new(name: impl Into<String>, path: impl Into<String>, kind: ServiceKind) -> Self {
        Self {
            name: name.into(),
            path: normalize_path(&path.into()),
            kind,
            resources: Resources::default(),
            scaling: None,
            env: Vec::new(),
            secrets: BTreeSet::new(),
        }
    }

    /// ファイルパスがこのサービスの path 配下にあるか
    ///
    /// パスセグメント単位で比較する。`user_service` は `user_service_v2/main.py` にマッチしない。
    pub fn owns(&self, file: &str) -> bool {
        path_within(&normalize_path(file), &self.path)
    }
}

/// デプロイ形態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    /// 関数型（Cloud Functions / Lambda 相当）
    Function,
    /// 常駐コンテナ型（Cloud Run / ECS 相当）
    ContainerService,
}

impl ServiceKind {
    /// 文字列からパース
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "function" | "fn" => Some(Self::Function),
            "container-service" | "container_service" | "container" => {
                Some(Self::ContainerService)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::ContainerService => "container-service",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// リソース設定
///
/// 各フィールドは未指定（None）ならデプロイヤーのデフォルトに任せる。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    /// メモリ（MiB）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    /// タイムアウト（秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// CPU数（小数可）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
}

impl Resources {
    pub fn is_empty(&self) -> bool {
        self.memory.is_none() && self.timeout.is_none() && self.cpu.is_none()
    }

    /// other で指定されたフィールドのみ上書きする
    pub fn merge(&mut self, other: &Resources) {
        if other.memory.is_some() {
            self.memory = other.memory;
        }
        if other.timeout.is_some() {
            self.timeout = other.timeout;
        }
        if other.cpu.is_some() {
            self.cpu = other.cpu;
        }
    }
}

/// スケーリング設定
///
/// min と max は常にペアで扱う。オーバーライドでも片方だけを差し替えることはない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scaling {
    pub min_instances: u32,
    pub max_instances: u32,
}

impl Scaling {
    pub fn new(min_instances: u32, max_instances: u32) -> Self {
        Self {
            min_instances,
            max_instances,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.max_instances >= 1 && self.min_instances <= self.max_instances
    }
}

/// 環境変数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: EnvValue,
}

impl EnvVar {
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: EnvValue::Literal(value.into()),
        }
    }

    pub fn secret(name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: EnvValue::Secret(reference.into()),
        }
    }
}

/// 環境変数の値（リテラルまたはシークレット参照）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvValue {
    Literal(String),
    Secret(String),
}

impl EnvValue {
    pub fn secret_ref(&self) -> Option<&str> {
        match self {
            Self::Secret(reference) => Some(reference),
            Self::Literal(_) => None,
        }
    }
}

/// パス表記を正規化する（先頭の `./` と末尾の `/` を除去）
pub fn normalize_path(path: &str) -> String {
    let mut p = path.trim();
    while let Some(rest) = p.strip_prefix("./") {
        p = rest;
    }
    p.trim_end_matches('/').to_string()
}

/// `file` が `prefix` と一致するか、`prefix/` 配下にあるか
///
/// どちらも正規化済みであること。
pub fn path_within(file: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    match file.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}
