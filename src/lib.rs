//! Autopilot - work item to pull request automation.
//!
//! This library provides the core functionality for the `autopilot` CLI tool:
//! resolving story files, cutting feature branches, opening pull requests and
//! linked work items on GitHub or Azure DevOps, and posting evidence-pack
//! comments back to the PR.

pub mod artifacts;
pub mod cli;
pub mod commands;
pub mod git;
pub mod providers;
pub mod state;
pub mod story;

/// Library-level error type for autopilot operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid story id: {0} (expected ACF-###)")]
    InvalidStoryId(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Working tree is not clean. Commit/stash changes, or re-run with --allow-untracked.")]
    DirtyWorktree,

    #[error("{0} PR creation requires pushing the branch. Re-run with --push.")]
    PushRequired(&'static str),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Missing provider info in state: {0}. Re-run start with integration enabled.")]
    MissingProviderInfo(String),

    #[error("No provider integration recorded in state. Re-run start with integration enabled.")]
    NoProviderConfigured,

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} for {url}: {body}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    #[error("git {0}")]
    Git(String),
}

/// Result type alias for autopilot operations.
pub type Result<T> = std::result::Result<T, Error>;
