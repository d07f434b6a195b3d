//! Version control access
//!
//! The orchestrator only needs the list of files changed between two
//! revisions; where that list comes from is up to the caller.

use crate::error::VcsError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Source of changed files
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Files changed between `from` and `to`, relative to the repository root
    async fn changed_files(&self, from: &str, to: &str) -> Result<Vec<String>, VcsError>;
}

/// Whether `rev` denotes "no previous revision" (first push of a branch)
///
/// Webhooks send forty zeros as the `before` SHA when a branch is created.
pub fn is_null_revision(rev: &str) -> bool {
    let rev = rev.trim();
    rev.is_empty() || rev.chars().all(|c| c == '0')
}

/// `git` command line wrapper
#[derive(Debug, Clone)]
pub struct GitCli {
    repo: PathBuf,
}

impl GitCli {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// Run a git command and return stdout
    async fn run(&self, args: &[&str]) -> Result<String, VcsError> {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.repo);
        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: git -C {} {}", self.repo.display(), args.join(" "));

        let output = cmd.output().await.map_err(VcsError::Unavailable)?;

        if !output.status.success() {
            return Err(VcsError::CommandFailed {
                args: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn changed_files(&self, from: &str, to: &str) -> Result<Vec<String>, VcsError> {
        let output = if is_null_revision(from) {
            // No base revision: every tracked file at `to` counts as changed
            self.run(&["ls-tree", "-r", "--name-only", to]).await?
        } else {
            self.run(&["diff", "--name-only", from, to]).await?
        };

        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// Fixed file list, for manual runs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticChangeSet {
    files: Vec<String>,
}

impl StaticChangeSet {
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl VersionControl for StaticChangeSet {
    async fn changed_files(&self, _from: &str, _to: &str) -> Result<Vec<String>, VcsError> {
        Ok(self.files.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    #[test]
    fn test_is_null_revision() {
        assert!(is_null_revision(""));
        assert!(is_null_revision("0000000000000000000000000000000000000000"));
        assert!(is_null_revision("  "));
        assert!(!is_null_revision("a1b2c3"));
        assert!(!is_null_revision("HEAD~1"));
    }

    #[tokio::test]
    async fn test_static_change_set() {
        let vcs = StaticChangeSet::new(["backend/user/main.py", "ui/index.html"]);
        let files = vcs.changed_files("", "HEAD").await.unwrap();
        assert_eq!(files, vec!["backend/user/main.py", "ui/index.html"]);
    }

    fn git(dir: &Path, args: &[&str]) -> bool {
        StdCommand::new("git")
            .arg("-C")
            .arg(dir)
            .args(["-c", "user.name=shipflow", "-c", "user.email=ci@shipflow.invalid"])
            .args(["-c", "commit.gpgsign=false"])
            .args(args)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn commit_file(dir: &Path, path: &str, content: &str) {
        let full = dir.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
        assert!(git(dir, &["add", "."]));
        assert!(git(dir, &["commit", "-q", "-m", path]));
    }

    fn head(dir: &Path) -> String {
        let output = StdCommand::new("git")
            .arg("-C")
            .arg(dir)
            .args(["rev-parse", "HEAD"])
            .output()
            .unwrap();
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }

    #[tokio::test]
    async fn test_git_cli_diff_and_first_push() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        if !git(dir, &["init", "-q"]) {
            // git is not installed
            eprintln!("git not available, skipping");
            return;
        }

        commit_file(dir, "ui/index.html", "<html></html>");
        let first = head(dir);
        commit_file(dir, "backend/user/main.py", "print('hi')");
        let second = head(dir);

        let vcs = GitCli::new(dir);

        let diff = vcs.changed_files(&first, &second).await.unwrap();
        assert_eq!(diff, vec!["backend/user/main.py"]);

        let mut all = vcs
            .changed_files("0000000000000000000000000000000000000000", &second)
            .await
            .unwrap();
        all.sort();
        assert_eq!(all, vec!["backend/user/main.py", "ui/index.html"]);
    }

    #[tokio::test]
    async fn test_git_cli_unknown_revision() {
        let temp = tempfile::tempdir().unwrap();
        if !git(temp.path(), &["init", "-q"]) {
            return;
        }
        let vcs = GitCli::new(temp.path());
        let result = vcs.changed_files("deadbeef", "cafebabe").await;
        assert!(matches!(result, Err(VcsError::CommandFailed { .. })));
    }
}
