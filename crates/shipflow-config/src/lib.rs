//! shipflow の実行設定（settings.yaml）
//!
//! デプロイヤーとして呼び出すコマンドや並列数など、
//! レジストリ（shipflow.kdl）とは別に CI ホストごとに変わる設定を扱います。
//!
//! ```yaml
//! deployers:
//!   function: ./deploy/function.sh
//!   container-service: [./deploy/container.sh, --region, asia-northeast1]
//! max_parallel: 4
//! timeout_secs: 900
//! report_path: .shipflow/reports/latest.json
//! ```

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 設定ファイルのパスを直接指定する環境変数
pub const SETTINGS_PATH_ENV: &str = "SHIPFLOW_SETTINGS_PATH";

/// 設定ファイル名
pub const SETTINGS_FILE: &str = "settings.yaml";

/// 実行設定
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// サービス種別（function / container-service）ごとのデプロイコマンド
    pub deployers: BTreeMap<String, CommandSpec>,
    /// 同時デプロイ数の上限（未指定なら無制限）
    pub max_parallel: Option<usize>,
    /// 実行全体のタイムアウト（秒）
    pub timeout_secs: Option<u64>,
    /// レポートJSONの出力先
    pub report_path: Option<PathBuf>,
}

/// コマンド指定
///
/// 文字列なら空白区切り、リストならそのまま引数列として扱う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Line(String),
    Argv(Vec<String>),
}

impl CommandSpec {
    /// プログラムと引数の列
    pub fn argv(&self) -> Vec<String> {
        match self {
            Self::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            Self::Argv(argv) => argv.clone(),
        }
    }
}

impl Settings {
    /// YAML文字列から読み込む
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self> {
        // 空ファイルはデフォルト設定
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings =
            serde_yaml::from_str(content).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// ファイルから読み込む
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content, path)
    }

    /// 種別名に対応するデプロイコマンド
    pub fn deployer_command(&self, kind: &str) -> Option<Vec<String>> {
        self.deployers.get(kind).map(CommandSpec::argv)
    }

    fn validate(&self) -> Result<()> {
        if self.max_parallel == Some(0) {
            return Err(SettingsError::InvalidValue(
                "max_parallel は1以上を指定してください".to_string(),
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(SettingsError::InvalidValue(
                "timeout_secs は1以上を指定してください".to_string(),
            ));
        }
        for (kind, spec) in &self.deployers {
            if spec.argv().is_empty() {
                return Err(SettingsError::InvalidValue(format!(
                    "deployers.{} のコマンドが空です",
                    kind
                )));
            }
        }
        Ok(())
    }
}

/// shipflowのグローバル設定ディレクトリ（~/.config/shipflow）
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(SettingsError::ConfigDirNotFound)?
        .join("shipflow"))
}

/// settings.yaml を探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 SHIPFLOW_SETTINGS_PATH (直接パス指定、存在しなければエラー)
/// 2. <プロジェクトルート>/.shipflow/settings.yaml
/// 3. ~/.config/shipflow/settings.yaml (グローバル設定)
///
/// どこにもなければ `None`。
pub fn find_settings_file(project_root: &Path) -> Result<Option<PathBuf>> {
    // 1. 環境変数で直接指定
    if let Ok(settings_path) = std::env::var(SETTINGS_PATH_ENV) {
        let path = PathBuf::from(settings_path);
        if path.is_file() {
            return Ok(Some(path));
        }
        return Err(SettingsError::SettingsFileNotFound(path));
    }

    // 2. <project>/.shipflow/settings.yaml
    let local = project_root.join(".shipflow").join(SETTINGS_FILE);
    if local.is_file() {
        return Ok(Some(local));
    }

    // 3. ~/.config/shipflow/settings.yaml
    if let Ok(config_dir) = get_config_dir() {
        let global = config_dir.join(SETTINGS_FILE);
        if global.is_file() {
            return Ok(Some(global));
        }
    }

    Ok(None)
}

/// 設定を読み込む（ファイルがなければデフォルト）
pub fn load_settings(project_root: &Path) -> Result<Settings> {
    match find_settings_file(project_root)? {
        Some(path) => {
            debug!(path = %path.display(), "Loading settings");
            Settings::from_path(&path)
        }
        None => {
            debug!("No settings file found, using defaults");
            Ok(Settings::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    const SAMPLE: &str = r#"
deployers:
  function: ./deploy/function.sh --region asia-northeast1
  container-service: [./deploy/container.sh, "--image tag"]
max_parallel: 4
timeout_secs: 900
report_path: .shipflow/reports/latest.json
"#;

    #[test]
    fn test_parse_settings() {
        let settings = Settings::from_yaml(SAMPLE, Path::new("settings.yaml")).unwrap();

        assert_eq!(settings.max_parallel, Some(4));
        assert_eq!(settings.timeout_secs, Some(900));
        assert_eq!(
            settings.report_path,
            Some(PathBuf::from(".shipflow/reports/latest.json"))
        );
        assert_eq!(
            settings.deployer_command("function"),
            Some(vec![
                "./deploy/function.sh".to_string(),
                "--region".to_string(),
                "asia-northeast1".to_string(),
            ])
        );
        // リスト指定は空白で分割しない
        assert_eq!(
            settings.deployer_command("container-service"),
            Some(vec![
                "./deploy/container.sh".to_string(),
                "--image tag".to_string(),
            ])
        );
        assert_eq!(settings.deployer_command("batch"), None);
    }

    #[test]
    fn test_empty_settings_is_default() {
        let settings = Settings::from_yaml("  \n", Path::new("settings.yaml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_unknown_field_is_error() {
        let result = Settings::from_yaml("max_paralel: 3\n", Path::new("settings.yaml"));
        assert!(matches!(result, Err(SettingsError::Parse { .. })));
    }

    #[test]
    fn test_invalid_values() {
        for yaml in [
            "max_parallel: 0\n",
            "timeout_secs: 0\n",
            "deployers:\n  function: \"\"\n",
        ] {
            let result = Settings::from_yaml(yaml, Path::new("settings.yaml"));
            assert!(
                matches!(result, Err(SettingsError::InvalidValue(_))),
                "{yaml:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_get_config_dir() {
        let config_dir = get_config_dir().unwrap();
        assert!(config_dir.ends_with("shipflow"));
    }

    #[test]
    #[serial]
    fn test_find_settings_in_project_root() {
        let project = tempfile::tempdir().unwrap();
        fs::create_dir(project.path().join(".shipflow")).unwrap();
        fs::write(project.path().join(".shipflow/settings.yaml"), SAMPLE).unwrap();

        let result = find_settings_file(project.path());
        let settings = load_settings(project.path());

        assert_eq!(
            result.unwrap(),
            Some(project.path().join(".shipflow/settings.yaml"))
        );
        assert_eq!(settings.unwrap().max_parallel, Some(4));
    }

    /// カレントディレクトリではなくプロジェクトルートを見る
    #[test]
    #[serial]
    fn test_project_settings_found_from_other_cwd() {
        let project = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::create_dir(project.path().join(".shipflow")).unwrap();
        fs::write(
            project.path().join(".shipflow/settings.yaml"),
            "max_parallel: 7\n",
        )
        .unwrap();
        fs::create_dir(elsewhere.path().join(".shipflow")).unwrap();
        fs::write(
            elsewhere.path().join(".shipflow/settings.yaml"),
            "max_parallel: 1\n",
        )
        .unwrap();

        std::env::set_current_dir(elsewhere.path()).unwrap();
        let settings = load_settings(project.path());
        std::env::set_current_dir(original_dir).unwrap();

        assert_eq!(settings.unwrap().max_parallel, Some(7));
    }

    #[test]
    #[serial]
    fn test_find_settings_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings_path = temp_dir.path().join("ci.yaml");
        fs::write(&settings_path, "max_parallel: 2\n").unwrap();

        unsafe {
            std::env::set_var(SETTINGS_PATH_ENV, &settings_path);
        }
        let found = find_settings_file(temp_dir.path());
        let settings = load_settings(temp_dir.path());
        unsafe {
            std::env::remove_var(SETTINGS_PATH_ENV);
        }

        assert_eq!(found.unwrap(), Some(settings_path));
        assert_eq!(settings.unwrap().max_parallel, Some(2));
    }

    #[test]
    #[serial]
    fn test_env_var_pointing_to_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing.yaml");

        unsafe {
            std::env::set_var(SETTINGS_PATH_ENV, &missing);
        }
        let result = load_settings(temp_dir.path());
        unsafe {
            std::env::remove_var(SETTINGS_PATH_ENV);
        }

        assert!(matches!(result, Err(SettingsError::SettingsFileNotFound(_))));
    }

    #[test]
    #[serial]
    fn test_settings_file_in_project_root_is_ignored() {
        let project = tempfile::tempdir().unwrap();

        // .shipflow/ 配下以外は探さない
        fs::write(project.path().join("settings.yaml"), "max_parallel: 9\n").unwrap();

        let settings = load_settings(project.path());
        assert_ne!(settings.unwrap().max_parallel, Some(9));
    }
}
