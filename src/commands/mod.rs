//! Command implementations for the Autopilot CLI.
//!
//! `start` sequences: resolve story -> clean-tree check -> branch -> review
//! pack -> state file -> optional commit/push -> provider integration ->
//! re-persist state -> summary. `evidence` loads the state record, optionally
//! runs local validations, and posts the evidence comment to the recorded PR.

use crate::artifacts::{self, EVIDENCE_MARKER};
use crate::git::Git;
use crate::providers::azure::{self, AzureClient};
use crate::providers::github::{self, GithubClient};
use crate::providers::{Provider, ProviderRef};
use crate::state::{self, AutopilotState};
use crate::story::{self, Story};
use crate::{Error, Result};
use std::env;
use std::path::Path;
use std::process::Command;

/// Inputs for `start`.
#[derive(Debug, Default)]
pub struct StartOptions {
    pub story_id: String,
    pub stories_dir: String,
    pub provider: String,
    pub base_branch: String,
    pub draft: bool,
    pub dry_run: bool,
    pub allow_untracked: bool,
    pub commit: bool,
    pub push: bool,
    pub require_integration: bool,
    pub github_token: Option<String>,
    pub github_repo: Option<String>,
    pub github_api_url: Option<String>,
    pub azure_pat: Option<String>,
    pub azure_org_url: Option<String>,
    pub azure_project: Option<String>,
    pub azure_repo: Option<String>,
    pub azure_work_item_type: Option<String>,
}

/// Inputs for `evidence`.
#[derive(Debug, Default)]
pub struct EvidenceOptions {
    pub story_id: String,
    pub stories_dir: String,
    pub tests_root: String,
    pub run_local: bool,
    pub full_verify: bool,
    pub dry_run: bool,
    pub github_token: Option<String>,
    pub azure_pat: Option<String>,
}

/// GitHub token: explicit flag, then GITHUB_TOKEN, then GH_TOKEN. Empty
/// values are treated as unset.
fn resolve_github_token(explicit: Option<&str>) -> Option<String> {
    let nonempty = |t: String| if t.is_empty() { None } else { Some(t) };
    explicit
        .map(str::to_string)
        .and_then(nonempty)
        .or_else(|| env::var("GITHUB_TOKEN").ok().and_then(nonempty))
        .or_else(|| env::var("GH_TOKEN").ok().and_then(nonempty))
}

/// API base for the evidence path: the recorded state value, then the
/// GITHUB_API_URL environment, then the public default. Empty values are
/// treated as unset.
fn resolve_github_api_url(recorded: &str, env_value: Option<String>) -> String {
    if !recorded.is_empty() {
        return recorded.to_string();
    }
    env_value
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| github::DEFAULT_API_URL.to_string())
}

/// Create branch + PR + initial review pack for a story.
pub fn start(opts: &StartOptions) -> Result<()> {
    let git = Git::discover()?;
    let repo_root = git.root().to_path_buf();

    let stories_dir = repo_root.join(&opts.stories_dir);
    let story = story::resolve(&stories_dir, &opts.story_id)?;
    let branch = story::branch_name(&story.id, &story.title);

    if !opts.dry_run {
        git.require_clean_worktree(opts.allow_untracked)?;
        git.create_branch_from(&opts.base_branch, &branch)?;
    }

    // Local artifacts are produced even in dry-run.
    let review_pack = artifacts::write_review_pack(&repo_root, &story)?;

    let mut record = AutopilotState {
        base_branch: opts.base_branch.clone(),
        branch: branch.clone(),
        created_at: artifacts::now_utc_iso(),
        provider: None,
        story_file: artifacts::rel_to_root(&repo_root, &story.path),
        story_id: story.id.clone(),
        story_title: story.title.clone(),
    };
    let state_file = state::save(&repo_root, &record)?;

    let commit = opts.commit || opts.push;
    if !opts.dry_run && commit {
        let rel_review = artifacts::rel_to_root(&repo_root, &review_pack);
        let rel_state = artifacts::rel_to_root(&repo_root, &state_file);
        git.run_live(&["add", &rel_review, &rel_state])?;
        git.run_live(&["commit", "-m", &format!("{}: start autopilot", story.id)])?;
        if opts.push {
            git.run_live(&["push", "-u", "origin", &branch])?;
        }
    }

    let origin = git.origin_url();
    let provider = crate::providers::resolve_provider(&opts.provider, origin.as_deref())?;

    record.provider = match provider {
        Provider::Github => integrate_github(opts, &git, &repo_root, &story, &branch, &review_pack)?,
        Provider::AzureDevOps => {
            integrate_azure(opts, &git, &repo_root, &story, &branch, &review_pack)?
        }
    };

    state::save(&repo_root, &record)?;
    if !opts.dry_run && commit && record.provider.is_some() {
        // Best-effort follow-up commit of the linked state file.
        let rel_state = artifacts::rel_to_root(&repo_root, &state_file);
        git.run_live_best_effort(&["add", &rel_state]);
        git.run_live_best_effort(&[
            "commit",
            "-m",
            &format!("{}: link work item and PR", story.id),
        ]);
        if opts.push {
            git.run_live_best_effort(&["push"]);
        }
    }

    print_start_summary(&repo_root, &story, &branch, &review_pack, &state_file, &record);
    Ok(())
}

/// GitHub integration path. Returns `None` when credentials are missing and
/// integration is not required.
fn integrate_github(
    opts: &StartOptions,
    git: &Git,
    repo_root: &Path,
    story: &Story,
    branch: &str,
    review_pack: &Path,
) -> Result<Option<ProviderRef>> {
    let token = resolve_github_token(opts.github_token.as_deref());
    let repo = opts
        .github_repo
        .clone()
        .or_else(|| git.origin_url().and_then(|u| github::parse_remote(&u)));
    let api_url = opts
        .github_api_url
        .clone()
        .unwrap_or_else(|| github::DEFAULT_API_URL.to_string());

    let (Some(token), Some(repo)) = (token, repo) else {
        if opts.require_integration {
            return Err(Error::MissingCredentials(
                "GitHub integration requires GITHUB_TOKEN (or GH_TOKEN) and a repo (GITHUB_REPOSITORY)"
                    .to_string(),
            ));
        }
        return Ok(None);
    };

    // The PR source branch must exist on the remote before the API call.
    if !opts.push && !opts.dry_run {
        return Err(Error::PushRequired("GitHub"));
    }

    let client = GithubClient::new(&api_url, &token, &repo, opts.dry_run);
    let issue = client.find_or_create_issue(story)?;
    let issue_ref = if issue.number > 0 {
        Some(format!("#{}", issue.number))
    } else {
        None
    };
    let pr_body = artifacts::compose_pr_body(repo_root, story, issue_ref.as_deref(), review_pack);
    let pr = client.create_pr(
        &opts.base_branch,
        branch,
        &format!("{}: {}", story.id, story.title),
        &pr_body,
        opts.draft,
    )?;

    Ok(Some(ProviderRef::Github {
        api_url,
        repo,
        issue: Some(issue),
        pr: Some(pr),
    }))
}

/// Azure DevOps integration path. Returns `None` when credentials are
/// missing and integration is not required.
fn integrate_azure(
    opts: &StartOptions,
    git: &Git,
    repo_root: &Path,
    story: &Story,
    branch: &str,
    review_pack: &Path,
) -> Result<Option<ProviderRef>> {
    let pat = opts.azure_pat.clone().filter(|p| !p.is_empty());
    let mut org_url = opts.azure_org_url.clone();
    let mut project = opts.azure_project.clone();
    let mut repo = opts.azure_repo.clone();
    let work_item_type = opts
        .azure_work_item_type
        .clone()
        .unwrap_or_else(|| azure::DEFAULT_WORK_ITEM_TYPE.to_string());

    // Infer all three from the origin remote only when none were given.
    if org_url.is_none() && project.is_none() && repo.is_none() {
        if let Some((inferred_org, inferred_project, inferred_repo)) =
            git.origin_url().and_then(|u| azure::parse_remote(&u))
        {
            org_url = Some(inferred_org);
            project = Some(inferred_project);
            repo = Some(inferred_repo);
        }
    }

    let (Some(pat), Some(org_url), Some(project), Some(repo)) = (pat, org_url, project, repo)
    else {
        if opts.require_integration {
            return Err(Error::MissingCredentials(
                "Azure DevOps integration requires AZURE_DEVOPS_PAT, AZURE_DEVOPS_ORG_URL, AZURE_DEVOPS_PROJECT, AZURE_DEVOPS_REPO"
                    .to_string(),
            ));
        }
        return Ok(None);
    };

    if !opts.push && !opts.dry_run {
        return Err(Error::PushRequired("Azure DevOps"));
    }

    let client = AzureClient::new(&org_url, &project, &repo, &pat, opts.dry_run);
    let work_item_id = match client.find_work_item(&story.id)? {
        Some(id) => id,
        None => client.create_work_item(&work_item_type, story)?,
    };
    let issue_ref = format!("WorkItem {}", work_item_id);
    let pr_body = artifacts::compose_pr_body(repo_root, story, Some(&issue_ref), review_pack);
    let pr = client.create_pr(
        branch,
        &opts.base_branch,
        &format!("{}: {}", story.id, story.title),
        &pr_body,
        opts.draft,
    )?;
    client.link_work_item_to_pr(work_item_id, pr.pull_request_id)?;

    Ok(Some(ProviderRef::AzureDevOps {
        org_url,
        project,
        repo,
        work_item_type,
        work_item_id,
        pr_id: pr.pull_request_id,
        pr_url: pr.url,
    }))
}

fn print_start_summary(
    repo_root: &Path,
    story: &Story,
    branch: &str,
    review_pack: &Path,
    state_file: &Path,
    record: &AutopilotState,
) {
    println!("Story: {}: {}", story.id, story.title);
    println!("Branch: {}", branch);
    println!("Review pack: {}", artifacts::rel_to_root(repo_root, review_pack));
    println!("State: {}", artifacts::rel_to_root(repo_root, state_file));
    match &record.provider {
        Some(ProviderRef::Github { issue, pr, .. }) => {
            if let Some(issue) = issue {
                println!("GitHub issue: #{} {}", issue.number, issue.html_url);
            }
            if let Some(pr) = pr {
                println!("GitHub PR: #{} {}", pr.number, pr.html_url);
            }
        }
        Some(ProviderRef::AzureDevOps {
            org_url,
            project,
            work_item_id,
            pr_id,
            pr_url,
            ..
        }) => {
            println!(
                "Azure DevOps work item: {} {}",
                work_item_id,
                azure::work_item_url(org_url, project, *work_item_id)
            );
            println!(
                "Azure DevOps PR: {} {}",
                pr_id,
                pr_url.as_deref().unwrap_or("")
            );
        }
        None => {}
    }
}

/// Run checks and post/update the PR evidence comment for a story.
pub fn evidence(opts: &EvidenceOptions) -> Result<()> {
    let git = Git::discover()?;
    let repo_root = git.root().to_path_buf();

    story::validate_story_id(&opts.story_id)?;
    let record = state::load(&repo_root, &opts.story_id)?;

    if opts.run_local {
        run_local_validations(&repo_root, opts);
    }

    let summary = artifacts::evidence_summary(&record.story_id, &record.story_title);

    match &record.provider {
        Some(ProviderRef::Github { api_url, repo, pr, .. }) => {
            let token = resolve_github_token(opts.github_token.as_deref()).ok_or_else(|| {
                Error::MissingProviderInfo("GitHub token".to_string())
            })?;
            let pr_number = pr.as_ref().map(|p| p.number).unwrap_or(0);
            if pr_number == 0 {
                return Err(Error::MissingProviderInfo("GitHub PR number".to_string()));
            }
            let api_url = resolve_github_api_url(api_url, env::var("GITHUB_API_URL").ok());

            let client = GithubClient::new(&api_url, &token, repo, opts.dry_run);
            client.upsert_pr_comment(pr_number, EVIDENCE_MARKER, &summary)?;
            println!("Updated GitHub PR comment for PR #{}", pr_number);
            Ok(())
        }
        Some(ProviderRef::AzureDevOps {
            org_url,
            project,
            repo,
            pr_id,
            ..
        }) => {
            let pat = opts
                .azure_pat
                .clone()
                .or_else(|| env::var("AZURE_DEVOPS_PAT").ok())
                .filter(|p| !p.is_empty())
                .ok_or_else(|| Error::MissingProviderInfo("Azure DevOps PAT".to_string()))?;
            if *pr_id == 0 {
                return Err(Error::MissingProviderInfo("Azure DevOps PR id".to_string()));
            }

            let client = AzureClient::new(org_url, project, repo, &pat, opts.dry_run);
            client.post_pr_comment(*pr_id, &format!("{}\n{}", EVIDENCE_MARKER, summary))?;
            println!("Posted Azure DevOps PR thread comment for PR {}", pr_id);
            Ok(())
        }
        None => Err(Error::NoProviderConfigured),
    }
}

/// Fixed local validation sequence. Each command is best-effort; a failure
/// is reported and the sequence continues.
fn run_local_validations(repo_root: &Path, opts: &EvidenceOptions) {
    let traceability_args = [
        "scripts/traceability/traceability.py",
        "validate",
        "--stories-dir",
        &opts.stories_dir,
        "--tests-root",
        &opts.tests_root,
        "--skip-commits",
    ];
    let mut commands: Vec<Vec<&str>> = vec![
        vec!["git", "status"],
        vec!["bash", "scripts/validate-project.sh"],
        vec!["bash", "scripts/validate-documentation.sh"],
        vec!["bash", "scripts/validate-rnd-policy.sh"],
    ];
    let mut traceability = vec!["python3"];
    traceability.extend(traceability_args);
    commands.push(traceability);
    if opts.full_verify {
        commands.push(vec!["bash", "scripts/scaffold-and-verify.sh"]);
    }

    for cmd in commands {
        run_best_effort(repo_root, &cmd);
    }
}

/// Run a command with inherited stdio, swallowing any failure.
fn run_best_effort(repo_root: &Path, cmd: &[&str]) {
    let result = Command::new(cmd[0])
        .args(&cmd[1..])
        .current_dir(repo_root)
        .status();
    match result {
        Ok(status) if !status.success() => {
            eprintln!("warning: {} exited with {}", cmd.join(" "), status);
        }
        Err(e) => eprintln!("warning: failed to run {}: {}", cmd.join(" "), e),
        Ok(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_github_token_prefers_explicit() {
        assert_eq!(
            resolve_github_token(Some("explicit")).as_deref(),
            Some("explicit")
        );
    }

    #[test]
    fn test_resolve_github_token_ignores_empty_explicit() {
        // An empty flag value falls through to the environment (or None);
        // it never comes back as an empty token.
        if let Some(t) = resolve_github_token(Some("")) {
            assert!(!t.is_empty());
        }
    }

    #[test]
    fn test_resolve_github_api_url_prefers_recorded_value() {
        assert_eq!(
            resolve_github_api_url(
                "https://github.example.com/api/v3",
                Some("https://env.example.com".to_string()),
            ),
            "https://github.example.com/api/v3"
        );
    }

    #[test]
    fn test_resolve_github_api_url_falls_back_to_env() {
        assert_eq!(
            resolve_github_api_url("", Some("https://env.example.com".to_string())),
            "https://env.example.com"
        );
    }

    #[test]
    fn test_resolve_github_api_url_defaults_when_unset() {
        assert_eq!(resolve_github_api_url("", None), github::DEFAULT_API_URL);
        assert_eq!(
            resolve_github_api_url("", Some(String::new())),
            github::DEFAULT_API_URL
        );
    }
}
