//! Git driver.
//!
//! Thin subprocess wrapper over the `git` binary. Captured invocations are
//! used for queries (status, remote URLs); live invocations inherit stdio so
//! branch and push output reaches the user directly.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Handle to a git repository.
pub struct Git {
    /// Path to the repository root.
    repo_path: PathBuf,
}

impl Git {
    /// Create a driver for the given repository root.
    pub fn new(repo_path: &Path) -> Self {
        Self {
            repo_path: repo_path.to_path_buf(),
        }
    }

    /// Discover the repository root from the current directory.
    pub fn discover() -> Result<Self> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .output()
            .map_err(|e| Error::Git(format!("failed to run git: {}", e)))?;

        if !output.status.success() {
            return Err(Error::Git(
                "not a git repository (rev-parse --show-toplevel failed)".to_string(),
            ));
        }

        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Self::new(Path::new(&root)))
    }

    /// Repository root path.
    pub fn root(&self) -> &Path {
        &self.repo_path
    }

    /// Run git with captured output; non-zero exit is an error.
    pub fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .map_err(|e| Error::Git(format!("failed to run git {:?}: {}", args, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Git(format!(
                "{} failed: {}",
                args.first().copied().unwrap_or("?"),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run git with captured output, ignoring failures. Returns stdout on
    /// success, `None` otherwise.
    pub fn try_run(&self, args: &[&str]) -> Option<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .ok()?;
        if output.status.success() {
            Some(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            None
        }
    }

    /// Run git with inherited stdio; non-zero exit is an error.
    pub fn run_live(&self, args: &[&str]) -> Result<()> {
        let status = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| Error::Git(format!("failed to run git {:?}: {}", args, e)))?;

        if !status.success() {
            return Err(Error::Git(format!(
                "{} failed with {}",
                args.first().copied().unwrap_or("?"),
                status
            )));
        }
        Ok(())
    }

    /// Run git with inherited stdio, logging and swallowing failures.
    pub fn run_live_best_effort(&self, args: &[&str]) {
        if let Err(e) = self.run_live(args) {
            eprintln!("warning: {}", e);
        }
    }

    /// Fail unless the working tree is clean. Untracked files are tolerated
    /// only when `allow_untracked` is set.
    pub fn require_clean_worktree(&self, allow_untracked: bool) -> Result<()> {
        let status = self.run(&["status", "--porcelain"])?;
        let mut lines: Vec<&str> = status.lines().filter(|l| !l.trim().is_empty()).collect();
        if allow_untracked {
            lines.retain(|l| !l.starts_with("?? "));
        }
        if lines.is_empty() {
            Ok(())
        } else {
            Err(Error::DirtyWorktree)
        }
    }

    /// URL of the `origin` remote, if configured.
    pub fn origin_url(&self) -> Option<String> {
        let url = self.try_run(&["remote", "get-url", "origin"])?;
        let url = url.trim().to_string();
        if url.is_empty() { None } else { Some(url) }
    }

    /// Switch to the base branch, best-effort fast-forward it, and create the
    /// new branch. Fetch and pull failures are tolerated; checkout and branch
    /// creation failures propagate.
    pub fn create_branch_from(&self, base_branch: &str, branch: &str) -> Result<()> {
        self.run_live_best_effort(&["fetch", "origin", base_branch]);
        self.run_live(&["checkout", base_branch])?;
        self.run_live_best_effort(&["pull", "--ff-only"]);
        self.run_live(&["checkout", "-b", branch])
    }
}
