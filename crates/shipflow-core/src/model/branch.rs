//! ブランチ → 環境のマッピング規則

use serde::{Deserialize, Serialize};
use std::fmt;

/// ブランチルールが1つもマッチしない場合の環境
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// ブランチ名パターン
///
/// 正規表現は使わない。完全一致か、末尾ワイルドカード1つのみ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum BranchPattern {
    /// 完全一致（例: `main`）
    Exact(String),
    /// 前方一致（例: `feature/*` → `feature/`）
    Prefix(String),
}

impl BranchPattern {
    /// パターン文字列をパース
    ///
    /// `*` は末尾に1つだけ許可する。それ以外は None。
    pub fn parse(pattern: &str) -> Option<Self> {
        if pattern.is_empty() {
            return None;
        }
        match pattern.strip_suffix('*') {
            Some(stem) if !stem.contains('*') => Some(Self::Prefix(stem.to_string())),
            Some(_) => None,
            None if pattern.contains('*') => None,
            None => Some(Self::Exact(pattern.to_string())),
        }
    }

    /// 大文字小文字を区別してマッチ
    pub fn matches(&self, branch: &str) -> bool {
        match self {
            Self::Exact(name) => branch == name,
            Self::Prefix(stem) => branch.starts_with(stem.as_str()),
        }
    }
}

impl fmt::Display for BranchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => f.write_str(name),
            Self::Prefix(stem) => write!(f, "{}*", stem),
        }
    }
}

/// 1件のマッピング規則
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRule {
    pub pattern: BranchPattern,
    pub environment: String,
}

impl BranchRule {
    pub fn new(pattern: BranchPattern, environment: impl Into<String>) -> Self {
        Self {
            pattern,
            environment: environment.into(),
        }
    }
}

/// 宣言順に評価されるルール列と、末尾のデフォルト環境
///
/// KDL形式：
/// ```kdl
/// branches default="dev" {
///     rule "main" env="prod"
///     rule "develop" env="staging"
///     rule "feature/*" env="dev"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRules {
    pub rules: Vec<BranchRule>,
    pub default_environment: String,
}

impl Default for BranchRules {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            default_environment: DEFAULT_ENVIRONMENT.to_string(),
        }
    }
}

impl BranchRules {
    pub fn new(rules: Vec<BranchRule>, default_environment: impl Into<String>) -> Self {
        Self {
            rules,
            default_environment: default_environment.into(),
        }
    }
}
