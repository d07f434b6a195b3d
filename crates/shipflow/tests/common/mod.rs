use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const REGISTRY: &str = r#"
project "shop"

service "user" {
    kind "function"
    path "backend/user"
    memory 256
    timeout 60
}

service "ui" {
    kind "container-service"
    path "frontend/ui"
    cpu 1
    scaling min=0 max=3
}

environment "prod" {
    service "user" {
        memory 1024
    }
}

branches default="dev" {
    rule "main" environment="prod"
    rule "release/*" environment="staging"
}
"#;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    /// 標準的なレジストリを持つプロジェクト
    pub fn with_registry() -> Self {
        let project = Self::new();
        project.write_root_kdl(REGISTRY);
        project
    }

    pub fn write_root_kdl(&self, content: &str) {
        fs::write(self.root.path().join("shipflow.kdl"), content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_service(&self, name: &str, content: &str) {
        let dir = self.root.path().join("services");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}.kdl", name)), content).unwrap();
    }

    /// 実行用の設定ファイルを書き出してパスを返す
    #[allow(dead_code)]
    pub fn write_settings(&self, content: &str) -> PathBuf {
        let dir = self.root.path().join(".shipflow");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.yaml");
        fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }
}
