//! CLI argument definitions for Autopilot.

use clap::{Parser, Subcommand};

/// Autopilot - story to pull request automation.
///
/// Start with `autopilot start ACF-0123` to cut a branch and open a PR,
/// then `autopilot evidence ACF-0123` to post the evidence pack.
#[derive(Parser, Debug)]
#[command(name = "autopilot")]
#[command(author, version, about = "Work item -> branch -> PR -> evidence pack", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create branch + PR + initial review pack
    Start {
        /// Story ID (e.g., ACF-0123)
        story_id: String,

        /// Stories directory, relative to the repo root
        #[arg(long, default_value = "artifacts/stories")]
        stories_dir: String,

        /// Tracker provider (auto picks Azure DevOps when origin is an Azure Repos URL)
        #[arg(long, default_value = "auto", value_parser = ["auto", "github", "azuredevops"])]
        provider: String,

        /// Base branch to fork from
        #[arg(long, env = "AUTOPILOT_BASE_BRANCH", default_value = "main")]
        base_branch: String,

        /// Create the PR as a draft
        #[arg(long)]
        draft: bool,

        /// Perform local file effects only; substitute placeholders for network calls
        #[arg(long)]
        dry_run: bool,

        /// Allow untracked files in the worktree
        #[arg(long)]
        allow_untracked: bool,

        /// Commit generated artifacts
        #[arg(long)]
        commit: bool,

        /// Push branch to origin (implies --commit)
        #[arg(long)]
        push: bool,

        /// Fail if provider credentials are missing instead of skipping integration
        #[arg(long)]
        require_integration: bool,

        /// GitHub token (falls back to GITHUB_TOKEN, then GH_TOKEN)
        #[arg(long)]
        github_token: Option<String>,

        /// GitHub owner/repo (defaults to origin remote when possible)
        #[arg(long, env = "GITHUB_REPOSITORY")]
        github_repo: Option<String>,

        /// GitHub API base (default: https://api.github.com)
        #[arg(long, env = "GITHUB_API_URL")]
        github_api_url: Option<String>,

        /// Azure DevOps personal access token
        #[arg(long, env = "AZURE_DEVOPS_PAT")]
        azure_pat: Option<String>,

        /// Azure DevOps organization URL (e.g., https://dev.azure.com/yourorg)
        #[arg(long, env = "AZURE_DEVOPS_ORG_URL")]
        azure_org_url: Option<String>,

        /// Azure DevOps project name
        #[arg(long, env = "AZURE_DEVOPS_PROJECT")]
        azure_project: Option<String>,

        /// Azure Repos repository name
        #[arg(long, env = "AZURE_DEVOPS_REPO")]
        azure_repo: Option<String>,

        /// Azure DevOps work item type (default: "User Story")
        #[arg(long, env = "AZURE_DEVOPS_WORK_ITEM_TYPE")]
        azure_work_item_type: Option<String>,
    },

    /// Run checks and post/update the PR evidence comment
    Evidence {
        /// Story ID (e.g., ACF-0123)
        story_id: String,

        /// Stories directory, relative to the repo root
        #[arg(long, default_value = "artifacts/stories")]
        stories_dir: String,

        /// Root directory to scan for tests
        #[arg(long, default_value = ".")]
        tests_root: String,

        /// Run local validations before posting evidence
        #[arg(long)]
        run_local: bool,

        /// Also run scripts/scaffold-and-verify.sh
        #[arg(long)]
        full_verify: bool,

        /// Skip network calls
        #[arg(long)]
        dry_run: bool,

        /// GitHub token (falls back to GITHUB_TOKEN, then GH_TOKEN)
        #[arg(long)]
        github_token: Option<String>,

        /// Azure DevOps personal access token
        #[arg(long, env = "AZURE_DEVOPS_PAT")]
        azure_pat: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_push_flag_parses() {
        let cli = Cli::try_parse_from(["autopilot", "start", "ACF-0001", "--push"]).unwrap();
        match cli.command {
            Commands::Start { story_id, push, commit, .. } => {
                assert_eq!(story_id, "ACF-0001");
                assert!(push);
                assert!(!commit);
            }
            _ => panic!("expected start"),
        }
    }

    #[test]
    fn test_provider_rejects_unknown_value() {
        let res = Cli::try_parse_from(["autopilot", "start", "ACF-1", "--provider", "gitlab"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_evidence_defaults() {
        let cli = Cli::try_parse_from(["autopilot", "evidence", "ACF-0042"]).unwrap();
        match cli.command {
            Commands::Evidence { stories_dir, tests_root, run_local, .. } => {
                assert_eq!(stories_dir, "artifacts/stories");
                assert_eq!(tests_root, ".");
                assert!(!run_local);
            }
            _ => panic!("expected evidence"),
        }
    }
}
