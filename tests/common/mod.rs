//! Common test utilities for autopilot integration tests.
//!
//! Provides `TestEnv`, an isolated git repository with a stories directory,
//! plus a `Command` builder that scrubs provider credentials from the
//! environment so tests never pick up the developer's real tokens.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::Path;
pub use tempfile::TempDir;

/// Environment variables the tool consults; removed from every test command.
const SCRUBBED_VARS: [&str; 10] = [
    "GITHUB_TOKEN",
    "GH_TOKEN",
    "GITHUB_REPOSITORY",
    "GITHUB_API_URL",
    "AZURE_DEVOPS_PAT",
    "AZURE_DEVOPS_ORG_URL",
    "AZURE_DEVOPS_PROJECT",
    "AZURE_DEVOPS_REPO",
    "AZURE_DEVOPS_WORK_ITEM_TYPE",
    "AUTOPILOT_BASE_BRANCH",
];

/// A test environment with an isolated git repository.
pub struct TestEnv {
    pub repo_dir: TempDir,
}

impl TestEnv {
    /// Create a git repository on branch `main` with one initial commit.
    pub fn new() -> Self {
        let repo_dir = TempDir::new().unwrap();

        git(repo_dir.path(), &["init", "-b", "main"]);
        git(repo_dir.path(), &["config", "user.email", "test@test.com"]);
        git(repo_dir.path(), &["config", "user.name", "Test"]);

        fs::write(repo_dir.path().join("README.md"), "# test repo\n").unwrap();
        git(repo_dir.path(), &["add", "README.md"]);
        git(repo_dir.path(), &["commit", "-m", "init"]);

        Self { repo_dir }
    }

    /// Create an environment with one committed story file.
    pub fn with_story(story_id: &str, content: &str) -> Self {
        let env = Self::new();
        env.write_story(story_id, content);
        env.commit_all("add story");
        env
    }

    /// Write a story file under `artifacts/stories/` (uncommitted).
    pub fn write_story(&self, story_id: &str, content: &str) {
        let stories = self.path().join("artifacts/stories");
        fs::create_dir_all(&stories).unwrap();
        fs::write(stories.join(format!("{}.md", story_id)), content).unwrap();
    }

    /// Write a state file under `artifacts/autopilot/` directly.
    pub fn write_state(&self, story_id: &str, state: &serde_json::Value) {
        let dir = self.path().join("artifacts/autopilot");
        fs::create_dir_all(&dir).unwrap();
        let mut text = serde_json::to_string_pretty(state).unwrap();
        text.push('\n');
        fs::write(dir.join(format!("{}.json", story_id)), text).unwrap();
    }

    /// Stage and commit everything in the worktree.
    pub fn commit_all(&self, message: &str) {
        git(self.path(), &["add", "-A"]);
        git(self.path(), &["commit", "-m", message]);
    }

    /// Add an `origin` remote (no network involved).
    pub fn set_origin(&self, url: &str) {
        git(self.path(), &["remote", "add", "origin", url]);
    }

    /// Get a Command for the autopilot binary with a scrubbed environment.
    pub fn autopilot(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_autopilot"));
        cmd.current_dir(self.path());
        for var in SCRUBBED_VARS {
            cmd.env_remove(var);
        }
        cmd
    }

    /// Get the path to the repo directory.
    pub fn path(&self) -> &Path {
        self.repo_dir.path()
    }

    /// Read a file relative to the repo root.
    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path().join(rel)).unwrap()
    }

    /// Check whether a file exists relative to the repo root.
    pub fn exists(&self, rel: &str) -> bool {
        self.path().join(rel).exists()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

fn git(dir: &Path, args: &[&str]) {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}
