//! デプロイ結果とレポート

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// キャンセルされたサービスに記録されるエラー詳細
pub const CANCELLED_DETAIL: &str = "cancelled";

/// サービス単位の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Success,
    Failed,
    Skipped,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failed => write!(f, "FAILED"),
            Self::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// 実行全体の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Success,
    Failed,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// 1サービスのデプロイ結果
///
/// `error` は status が Failed のときのみ Some。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentOutcome {
    pub service: String,
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// デプロイヤーが返したメッセージ（成功時のみ）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub duration_ms: u64,
}

impl DeploymentOutcome {
    pub fn success(service: impl Into<String>, duration: Duration, message: Option<String>) -> Self {
        Self {
            service: service.into(),
            status: OutcomeStatus::Success,
            error: None,
            message,
            duration_ms: duration.as_millis() as u64,
        }
    }

    pub fn failed(service: impl Into<String>, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            service: service.into(),
            status: OutcomeStatus::Failed,
            error: Some(error.into()),
            message: None,
            duration_ms: duration.as_millis() as u64,
        }
    }

    pub fn cancelled(service: impl Into<String>, duration: Duration) -> Self {
        Self::failed(service, CANCELLED_DETAIL, duration)
    }

    pub fn skipped(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            status: OutcomeStatus::Skipped,
            error: None,
            message: None,
            duration_ms: 0,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == OutcomeStatus::Failed && self.error.as_deref() == Some(CANCELLED_DETAIL)
    }
}

/// オーケストレーターの実行フェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    ResolvingEnv,
    DetectingChanges,
    NoChanges,
    Planning,
    Dispatching,
    Aggregating,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::ResolvingEnv => "resolving_env",
            Self::DetectingChanges => "detecting_changes",
            Self::NoChanges => "no_changes",
            Self::Planning => "planning",
            Self::Dispatching => "dispatching",
            Self::Aggregating => "aggregating",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

/// 1回の実行のサマリー
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentReport {
    pub environment: String,
    pub branch: String,
    pub triggering_ref: String,
    /// サービス名順
    pub outcomes: Vec<DeploymentOutcome>,
    pub overall_status: OverallStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// 通過したフェーズ
    #[serde(default)]
    pub phases: Vec<RunPhase>,
}

impl DeploymentReport {
    /// 結果をサービス名順に並べ、全体ステータスを決定してレポートを確定する
    pub fn finalize(
        environment: impl Into<String>,
        branch: impl Into<String>,
        triggering_ref: impl Into<String>,
        mut outcomes: Vec<DeploymentOutcome>,
        started_at: DateTime<Utc>,
        phases: Vec<RunPhase>,
    ) -> Self {
        outcomes.sort_by(|a, b| a.service.cmp(&b.service));
        let overall_status = if outcomes.iter().any(|o| o.status == OutcomeStatus::Failed) {
            OverallStatus::Failed
        } else {
            OverallStatus::Success
        };
        Self {
            environment: environment.into(),
            branch: branch.into(),
            triggering_ref: triggering_ref.into(),
            outcomes,
            overall_status,
            started_at,
            finished_at: Utc::now(),
            phases,
        }
    }

    pub fn is_success(&self) -> bool {
        self.overall_status == OverallStatus::Success
    }

    pub fn outcome(&self, service: &str) -> Option<&DeploymentOutcome> {
        self.outcomes.iter().find(|o| o.service == service)
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            succeeded: self.count(OutcomeStatus::Success),
            failed: self.count(OutcomeStatus::Failed),
            skipped: self.count(OutcomeStatus::Skipped),
        }
    }
}

/// 件数サマリー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed, {} skipped",
            self.succeeded, self.failed, self.skipped
        )
    }
}
