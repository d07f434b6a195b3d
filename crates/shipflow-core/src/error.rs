use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO エラー: {path}\n理由: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("ファイル発見エラー: {path}\n理由: {message}")]
    DiscoveryError { path: PathBuf, message: String },

    #[error(
        "プロジェクトルートが見つかりません\n探索開始位置: {0}\nヒント: shipflow.kdl ファイルを含むディレクトリで実行してください"
    )]
    ProjectRootNotFound(PathBuf),

    #[error("サービスが見つかりません: {0}")]
    ServiceNotFound(String),

    #[error("サービス '{0}' が重複して定義されています")]
    DuplicateService(String),

    #[error("サービス '{service}' の path が空です")]
    EmptyPath { service: String },

    #[error("path が重複しています: '{first}' ({first_path}) と '{second}' ({second_path})")]
    OverlappingPath {
        first: String,
        first_path: String,
        second: String,
        second_path: String,
    },

    #[error("{context}: {field} は正の値である必要があります (値: {value})")]
    NonPositive {
        context: String,
        field: &'static str,
        value: String,
    },

    #[error("{context}: scaling が不正です (min={min}, max={max})")]
    InvalidScaling { context: String, min: u32, max: u32 },

    #[error("環境 '{environment}' のオーバーライドが未登録のサービス '{service}' を参照しています")]
    DanglingOverride {
        environment: String,
        service: String,
    },

    #[error("環境 '{environment}' でサービス '{service}' のオーバーライドが重複しています")]
    DuplicateOverride {
        environment: String,
        service: String,
    },

    #[error("{context}: 環境変数 '{name}' が重複しています")]
    DuplicateEnvVar { context: String, name: String },

    #[error("ブランチパターンが不正です: '{0}'（ワイルドカードは末尾の '*' 1つのみ使用できます）")]
    InvalidBranchPattern(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
