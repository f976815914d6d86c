//! Autopilot CLI - story to pull request automation.

use autopilot::cli::{Cli, Commands};
use autopilot::commands::{self, EvidenceOptions, StartOptions};
use clap::Parser;
use std::process;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run_command(cli.command) {
        eprintln!("ERROR: {}", e);
        process::exit(1);
    }
}

fn run_command(command: Commands) -> Result<(), autopilot::Error> {
    match command {
        Commands::Start {
            story_id,
            stories_dir,
            provider,
            base_branch,
            draft,
            dry_run,
            allow_untracked,
            commit,
            push,
            require_integration,
            github_token,
            github_repo,
            github_api_url,
            azure_pat,
            azure_org_url,
            azure_project,
            azure_repo,
            azure_work_item_type,
        } => commands::start(&StartOptions {
            story_id,
            stories_dir,
            provider,
            base_branch,
            draft,
            dry_run,
            allow_untracked,
            commit,
            push,
            require_integration,
            github_token,
            github_repo,
            github_api_url,
            azure_pat,
            azure_org_url,
            azure_project,
            azure_repo,
            azure_work_item_type,
        }),

        Commands::Evidence {
            story_id,
            stories_dir,
            tests_root,
            run_local,
            full_verify,
            dry_run,
            github_token,
            azure_pat,
        } => commands::evidence(&EvidenceOptions {
            story_id,
            stories_dir,
            tests_root,
            run_local,
            full_verify,
            dry_run,
            github_token,
            azure_pat,
        }),
    }
}
