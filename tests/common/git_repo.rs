//! Temporary git repository helper

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A temporary git repository for testing
pub struct TempGitRepo {
    _temp_dir: TempDir,
    path: PathBuf,
}

impl TempGitRepo {
    /// Create a new temporary git repository
    pub fn new() -> Self {
        Self::nested("")
    }

    /// Create a repository at `rel` below a fresh temporary directory
    pub fn nested(rel: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join(rel);
        std::fs::create_dir_all(&path).expect("Failed to create repository directory");

        let repo = Self {
            _temp_dir: temp_dir,
            path,
        };
        repo.git(&["init", "-q"]);
        repo.git(&["config", "user.name", "Test User"]);
        repo.git(&["config", "user.email", "test@example.com"]);
        repo.git(&["config", "commit.gpgsign", "false"]);
        repo
    }

    /// Get the path to the repository
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a file to the repository
    pub fn write_file(&self, name: &str, content: &str) {
        let file_path = self.path.join(name);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(file_path, content).expect("Failed to write file");
    }

    /// Write, stage and commit `name` as the configured user
    pub fn commit_file(&self, name: &str, content: &str, message: &str) {
        self.write_file(name, content);
        self.git(&["add", name]);
        self.git(&["commit", "-q", "-m", message]);
    }

    /// Write, stage and commit `name` with an explicit author
    pub fn commit_file_as(&self, author: &str, email: &str, name: &str, content: &str) {
        self.write_file(name, content);
        self.git(&["add", name]);
        let ident = format!("{author} <{email}>");
        self.git(&["commit", "-q", "--author", &ident, "-m", &format!("edit {name}")]);
    }

    /// Run a git command and return output
    pub fn git(&self, args: &[&str]) -> std::process::Output {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .output()
            .expect("Failed to run git command");
        assert!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        output
    }
}

impl Default for TempGitRepo {
    fn default() -> Self {
        Self::new()
    }
}
