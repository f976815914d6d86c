//! GitHub REST client.
//!
//! Covers the three calls `start`/`evidence` need: issue find-or-create,
//! PR create, and marker-keyed PR comment upsert. Every call short-circuits
//! to a placeholder result in dry-run mode.

use super::{HttpClient, IssueRef, PullRequestRef, DRY_RUN_URL};
use crate::story::Story;
use crate::Result;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::sync::OnceLock;

/// Default API base when neither flag nor env var is set.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// API version header required by GitHub.
const API_VERSION: &str = "2022-11-28";

/// Labels applied to issues this tool creates.
const ISSUE_LABELS: [&str; 2] = ["ai-coding-factory", "autopilot"];

/// Extract `owner/repo` from an origin remote URL.
///
/// Accepts both `git@github.com:owner/repo.git` and
/// `https://github.com/owner/repo.git` (with or without the `.git` suffix).
pub fn parse_remote(url: &str) -> Option<String> {
    static SSH_RE: OnceLock<Regex> = OnceLock::new();
    static HTTPS_RE: OnceLock<Regex> = OnceLock::new();
    let ssh = SSH_RE.get_or_init(|| Regex::new(r"^git@github\.com:([^/]+)/(.+?)(?:\.git)?$").unwrap());
    let https = HTTPS_RE
        .get_or_init(|| Regex::new(r"^https?://github\.com/([^/]+)/(.+?)(?:\.git)?$").unwrap());

    let url = url.trim();
    for re in [ssh, https] {
        if let Some(caps) = re.captures(url) {
            return Some(format!("{}/{}", &caps[1], &caps[2]));
        }
    }
    None
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    number: u64,
    html_url: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<IssueResponse>,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    id: u64,
    #[serde(default)]
    body: String,
}

/// Pick the comment to update: the first whose body contains the marker.
///
/// `None` means no marker-tagged comment exists yet and a new one must be
/// created. Always selecting the first match keeps repeated runs converging
/// on a single comment.
fn find_marker_comment(comments: &[CommentResponse], marker: &str) -> Option<u64> {
    comments
        .iter()
        .find(|c| c.body.contains(marker))
        .map(|c| c.id)
}

impl From<IssueResponse> for IssueRef {
    fn from(issue: IssueResponse) -> Self {
        Self {
            number: issue.number,
            html_url: issue.html_url,
            title: issue.title,
        }
    }
}

/// GitHub client bound to one repository.
pub struct GithubClient {
    http: HttpClient,
    api_url: String,
    token: String,
    repo: String,
    dry_run: bool,
}

impl GithubClient {
    pub fn new(api_url: &str, token: &str, repo: &str, dry_run: bool) -> Self {
        Self {
            http: HttpClient::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            repo: repo.to_string(),
            dry_run,
        }
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Authorization", format!("Bearer {}", self.token)),
            ("X-GitHub-Api-Version", API_VERSION.to_string()),
        ]
    }

    /// Find an issue titled with the story id, or create one embedding the
    /// story content.
    pub fn find_or_create_issue(&self, story: &Story) -> Result<IssueRef> {
        let title = format!("{}: {}", story.id, story.title);
        if self.dry_run {
            return Ok(IssueRef {
                number: 0,
                html_url: DRY_RUN_URL.to_string(),
                title,
            });
        }

        let query = super::percent_encode(&format!(
            "repo:{} {} in:title type:issue",
            self.repo, story.id
        ));
        let search_url = format!("{}/search/issues?q={}", self.api_url, query);
        let found = self.http.json("GET", &search_url, &self.headers(), None)?;
        let search: SearchResponse = serde_json::from_value(found)?;
        if let Some(existing) = search.items.into_iter().next() {
            return Ok(existing.into());
        }

        let body = format!(
            "{title}\n\
             \n\
             This issue is managed by AI Coding Factory Autopilot.\n\
             \n\
             **Story File (source of truth)**: `artifacts/stories/{id}.md`\n\
             \n\
             ---\n\
             {content}",
            title = title,
            id = story.id,
            content = story.content,
        );
        let create_url = format!("{}/repos/{}/issues", self.api_url, self.repo);
        let payload = json!({
            "title": title,
            "body": body,
            "labels": ISSUE_LABELS,
        });
        let created = self
            .http
            .json("POST", &create_url, &self.headers(), Some(&payload))?;
        let issue: IssueResponse = serde_json::from_value(created)?;
        Ok(issue.into())
    }

    /// Open a pull request from `head_branch` into `base_branch`.
    pub fn create_pr(
        &self,
        base_branch: &str,
        head_branch: &str,
        title: &str,
        body: &str,
        draft: bool,
    ) -> Result<PullRequestRef> {
        if self.dry_run {
            return Ok(PullRequestRef {
                number: 0,
                html_url: DRY_RUN_URL.to_string(),
                title: title.to_string(),
            });
        }

        let url = format!("{}/repos/{}/pulls", self.api_url, self.repo);
        let payload = json!({
            "title": title,
            "head": head_branch,
            "base": base_branch,
            "body": body,
            "draft": draft,
        });
        let created = self.http.json("POST", &url, &self.headers(), Some(&payload))?;
        let pr: IssueResponse = serde_json::from_value(created)?;
        Ok(PullRequestRef {
            number: pr.number,
            html_url: pr.html_url,
            title: pr.title,
        })
    }

    /// Update the marker-tagged PR comment in place, or create it.
    ///
    /// Lists up to 100 comments, picks the first whose body contains the
    /// marker, and PATCHes it; otherwise POSTs a new comment. Running this
    /// twice leaves exactly one marker-tagged comment on the PR.
    pub fn upsert_pr_comment(&self, pr_number: u64, marker: &str, body: &str) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }

        let list_url = format!(
            "{}/repos/{}/issues/{}/comments?per_page=100",
            self.api_url, self.repo, pr_number
        );
        let listed = self.http.json("GET", &list_url, &self.headers(), None)?;
        let comments: Vec<CommentResponse> = serde_json::from_value(listed).unwrap_or_default();

        let final_body = format!("{}\n{}", marker, body);
        let payload = json!({ "body": final_body });
        match find_marker_comment(&comments, marker) {
            Some(comment_id) => {
                let url = format!(
                    "{}/repos/{}/issues/comments/{}",
                    self.api_url, self.repo, comment_id
                );
                self.http.json("PATCH", &url, &self.headers(), Some(&payload))?;
            }
            None => {
                let url = format!(
                    "{}/repos/{}/issues/{}/comments",
                    self.api_url, self.repo, pr_number
                );
                self.http.json("POST", &url, &self.headers(), Some(&payload))?;
            }
        }
        Ok(())
    }
}
