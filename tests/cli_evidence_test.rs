//! Integration tests for `autopilot evidence`.

mod common;

use common::TestEnv;
use predicates::prelude::*;
use serde_json::json;

fn github_state(pr_number: u64) -> serde_json::Value {
    json!({
        "baseBranch": "main",
        "branch": "feature/ACF-0123-add-login-page",
        "createdAt": "2026-01-02T03:04:05Z",
        "provider": {
            "kind": "github",
            "apiUrl": "https://api.github.com",
            "repo": "acme/widgets",
            "issue": { "number": 12, "html_url": "https://github.com/acme/widgets/issues/12", "title": "ACF-0123: Add login page" },
            "pr": { "number": pr_number, "html_url": "https://github.com/acme/widgets/pull/34", "title": "ACF-0123: Add login page" }
        },
        "storyFile": "artifacts/stories/ACF-0123.md",
        "storyId": "ACF-0123",
        "storyTitle": "Add login page"
    })
}

fn azure_state(pr_id: u64) -> serde_json::Value {
    json!({
        "baseBranch": "main",
        "branch": "feature/ACF-0123-add-login-page",
        "createdAt": "2026-01-02T03:04:05Z",
        "provider": {
            "kind": "azuredevops",
            "orgUrl": "https://dev.azure.com/acme",
            "project": "proj",
            "repo": "widgets",
            "workItemType": "User Story",
            "workItemId": 7,
            "prId": pr_id,
            "prUrl": null
        },
        "storyFile": "artifacts/stories/ACF-0123.md",
        "storyId": "ACF-0123",
        "storyTitle": "Add login page"
    })
}

fn empty_provider_state() -> serde_json::Value {
    json!({
        "baseBranch": "main",
        "branch": "feature/ACF-0123-add-login-page",
        "createdAt": "2026-01-02T03:04:05Z",
        "provider": {},
        "storyFile": "artifacts/stories/ACF-0123.md",
        "storyId": "ACF-0123",
        "storyTitle": "Add login page"
    })
}

#[test]
fn test_evidence_without_state_fails_not_found() {
    let env = TestEnv::new();

    env.autopilot()
        .args(["evidence", "ACF-0123", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR: Not found: autopilot state"));
}

#[test]
fn test_evidence_without_provider_fails() {
    let env = TestEnv::new();
    env.write_state("ACF-0123", &empty_provider_state());

    env.autopilot()
        .args(["evidence", "ACF-0123", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "ERROR: No provider integration recorded in state",
        ));
}

#[test]
fn test_evidence_github_dry_run_succeeds() {
    let env = TestEnv::new();
    env.write_state("ACF-0123", &github_state(34));

    env.autopilot()
        .args([
            "evidence",
            "ACF-0123",
            "--dry-run",
            "--github-token",
            "t0ken",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Updated GitHub PR comment for PR #34",
        ));
}

#[test]
fn test_evidence_github_api_url_falls_back_to_environment() {
    // A state file with no recorded apiUrl picks up GITHUB_API_URL, the way
    // a GitHub Enterprise runner exports it.
    let env = TestEnv::new();
    let mut state = github_state(34);
    state["provider"]["apiUrl"] = serde_json::json!("");
    env.write_state("ACF-0123", &state);

    env.autopilot()
        .env("GITHUB_API_URL", "https://github.example.com/api/v3")
        .args([
            "evidence",
            "ACF-0123",
            "--dry-run",
            "--github-token",
            "t0ken",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Updated GitHub PR comment for PR #34",
        ));
}

#[test]
fn test_evidence_github_without_token_fails() {
    let env = TestEnv::new();
    env.write_state("ACF-0123", &github_state(34));

    env.autopilot()
        .args(["evidence", "ACF-0123", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR: Missing provider info"))
        .stderr(predicate::str::contains("GitHub token"));
}

#[test]
fn test_evidence_github_with_zero_pr_number_fails() {
    let env = TestEnv::new();
    env.write_state("ACF-0123", &github_state(0));

    env.autopilot()
        .args([
            "evidence",
            "ACF-0123",
            "--dry-run",
            "--github-token",
            "t0ken",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GitHub PR number"));
}

#[test]
fn test_evidence_azure_dry_run_succeeds() {
    let env = TestEnv::new();
    env.write_state("ACF-0123", &azure_state(56));

    env.autopilot()
        .args(["evidence", "ACF-0123", "--dry-run", "--azure-pat", "p4t"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Posted Azure DevOps PR thread comment for PR 56",
        ));
}

#[test]
fn test_evidence_azure_without_pat_fails() {
    let env = TestEnv::new();
    env.write_state("ACF-0123", &azure_state(56));

    env.autopilot()
        .args(["evidence", "ACF-0123", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Azure DevOps PAT"));
}

#[test]
fn test_evidence_azure_with_zero_pr_id_fails() {
    let env = TestEnv::new();
    env.write_state("ACF-0123", &azure_state(0));

    env.autopilot()
        .args(["evidence", "ACF-0123", "--dry-run", "--azure-pat", "p4t"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Azure DevOps PR id"));
}

#[test]
fn test_evidence_invalid_story_id_fails() {
    let env = TestEnv::new();

    env.autopilot()
        .args(["evidence", "nope", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR: Invalid story id: nope"));
}

#[test]
fn test_run_local_is_best_effort() {
    // None of the validation scripts exist in the test repo; every one of
    // them failing must not abort the sequence.
    let env = TestEnv::new();
    env.write_state("ACF-0123", &github_state(34));

    env.autopilot()
        .args([
            "evidence",
            "ACF-0123",
            "--dry-run",
            "--run-local",
            "--github-token",
            "t0ken",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Updated GitHub PR comment for PR #34",
        ));
}
