//! Azure DevOps REST client.
//!
//! Work-item query/create via WIQL and JSON-patch, PR create, work-item to
//! PR artifact linking, and PR thread comments. Auth is Basic with a blank
//! username and the PAT. Every call short-circuits to a placeholder result
//! in dry-run mode.

use super::{percent_encode, HttpClient, DRY_RUN_URL};
use crate::story::Story;
use crate::Result;
use base64::Engine;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::sync::OnceLock;

/// Work-item type used when none is configured.
pub const DEFAULT_WORK_ITEM_TYPE: &str = "User Story";

/// Work-item descriptions are truncated to this many characters.
const DESCRIPTION_MAX_CHARS: usize = 20_000;

/// JSON-patch content type required by the work-item endpoints.
const PATCH_CONTENT_TYPE: &str = "application/json-patch+json";

/// Extract `(org_url, project, repo)` from an Azure Repos origin URL of the
/// form `https://dev.azure.com/{org}/{project}/_git/{repo}`.
pub fn parse_remote(url: &str) -> Option<(String, String, String)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^(https?://dev\.azure\.com/[^/]+)/([^/]+)/_git/([^/]+)$").unwrap()
    });
    let caps = re.captures(url.trim())?;
    Some((caps[1].to_string(), caps[2].to_string(), caps[3].to_string()))
}

/// Escape text for embedding in an HTML work-item description.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Browser URL for a work item, for display and the PR body.
pub fn work_item_url(org_url: &str, project: &str, work_item_id: u64) -> String {
    format!(
        "{}/{}/_workitems/edit/{}",
        org_url.trim_end_matches('/'),
        project,
        work_item_id
    )
}

/// Artifact URL relating a work item to a PR.
///
/// The exact form is `vstfs:///Git/PullRequestId/<project>%2F<repo>%2F<prId>`
/// with project and repo percent-encoded and literal `%2F` separators.
fn artifact_link_url(project: &str, repo: &str, pr_id: u64) -> String {
    format!(
        "vstfs:///Git/PullRequestId/{}%2F{}%2F{}",
        percent_encode(project),
        percent_encode(repo),
        pr_id
    )
}

#[derive(Debug, Deserialize)]
struct WiqlWorkItem {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct WiqlResponse {
    #[serde(default, rename = "workItems")]
    work_items: Vec<WiqlWorkItem>,
}

#[derive(Debug, Deserialize)]
struct WorkItemResponse {
    id: u64,
}

/// Pull request as returned by the Azure DevOps API.
#[derive(Debug, Clone, Deserialize)]
pub struct AzurePullRequest {
    #[serde(rename = "pullRequestId")]
    pub pull_request_id: u64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Azure DevOps client bound to one project and repository.
pub struct AzureClient {
    http: HttpClient,
    org_url: String,
    project: String,
    repo: String,
    pat: String,
    dry_run: bool,
}

impl AzureClient {
    pub fn new(org_url: &str, project: &str, repo: &str, pat: &str, dry_run: bool) -> Self {
        Self {
            http: HttpClient::new(),
            org_url: org_url.trim_end_matches('/').to_string(),
            project: project.to_string(),
            repo: repo.to_string(),
            pat: pat.to_string(),
            dry_run,
        }
    }

    /// Basic auth from a blank username and the PAT.
    fn headers(&self) -> Vec<(&'static str, String)> {
        let token = base64::engine::general_purpose::STANDARD.encode(format!(":{}", self.pat));
        vec![("Authorization", format!("Basic {}", token))]
    }

    fn patch_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = self.headers();
        headers.push(("Content-Type", PATCH_CONTENT_TYPE.to_string()));
        headers
    }

    /// WIQL query for the most recently changed work item whose title
    /// contains the story id.
    pub fn find_work_item(&self, story_id: &str) -> Result<Option<u64>> {
        if self.dry_run {
            return Ok(Some(0));
        }

        let url = format!(
            "{}/{}/_apis/wit/wiql?api-version=7.1-preview.2",
            self.org_url, self.project
        );
        let payload = json!({
            "query": format!(
                "SELECT [System.Id] FROM WorkItems \
                 WHERE [System.TeamProject] = @project \
                 AND [System.Title] CONTAINS '{}' \
                 ORDER BY [System.ChangedDate] DESC",
                story_id
            )
        });
        let found = self.http.json("POST", &url, &self.headers(), Some(&payload))?;
        let result: WiqlResponse = serde_json::from_value(found)?;
        Ok(result.work_items.first().map(|wi| wi.id))
    }

    /// Create a work item of the given type embedding the story content.
    pub fn create_work_item(&self, work_item_type: &str, story: &Story) -> Result<u64> {
        if self.dry_run {
            return Ok(0);
        }

        let url = format!(
            "{}/{}/_apis/wit/workitems/${}?api-version=7.1-preview.3",
            self.org_url,
            self.project,
            percent_encode(work_item_type)
        );
        let excerpt: String = story.content.chars().take(DESCRIPTION_MAX_CHARS).collect();
        let description = format!(
            "<p><strong>Managed by AI Coding Factory Autopilot</strong></p>\n\
             <p><strong>Story ID:</strong> {}</p>\n\
             <pre>{}</pre>",
            story.id,
            html_escape(&excerpt)
        );
        let payload = json!([
            {
                "op": "add",
                "path": "/fields/System.Title",
                "value": format!("{}: {}", story.id, story.title),
            },
            {
                "op": "add",
                "path": "/fields/System.Description",
                "value": description,
            },
        ]);
        let created = self
            .http
            .json("POST", &url, &self.patch_headers(), Some(&payload))?;
        let work_item: WorkItemResponse = serde_json::from_value(created)?;
        Ok(work_item.id)
    }

    /// Open a pull request from `source_branch` into `target_branch`.
    pub fn create_pr(
        &self,
        source_branch: &str,
        target_branch: &str,
        title: &str,
        description: &str,
        is_draft: bool,
    ) -> Result<AzurePullRequest> {
        if self.dry_run {
            return Ok(AzurePullRequest {
                pull_request_id: 0,
                url: Some(DRY_RUN_URL.to_string()),
                title: Some(title.to_string()),
            });
        }

        let url = format!(
            "{}/{}/_apis/git/repositories/{}/pullrequests?api-version=7.1-preview.1",
            self.org_url,
            self.project,
            percent_encode(&self.repo)
        );
        let payload = json!({
            "sourceRefName": format!("refs/heads/{}", source_branch),
            "targetRefName": format!("refs/heads/{}", target_branch),
            "title": title,
            "description": description,
            "isDraft": is_draft,
        });
        let created = self.http.json("POST", &url, &self.headers(), Some(&payload))?;
        Ok(serde_json::from_value(created)?)
    }

    /// Link the PR to the work item via an artifact-link relation patch.
    /// Skipped for placeholder ids.
    pub fn link_work_item_to_pr(&self, work_item_id: u64, pr_id: u64) -> Result<()> {
        if self.dry_run || work_item_id == 0 || pr_id == 0 {
            return Ok(());
        }

        let artifact = artifact_link_url(&self.project, &self.repo, pr_id);
        let url = format!(
            "{}/{}/_apis/wit/workitems/{}?api-version=7.1-preview.3",
            self.org_url, self.project, work_item_id
        );
        let payload = json!([
            {
                "op": "add",
                "path": "/relations/-",
                "value": {
                    "rel": "ArtifactLink",
                    "url": artifact,
                    "attributes": { "name": "Pull Request" },
                },
            }
        ]);
        self.http
            .json("PATCH", &url, &self.patch_headers(), Some(&payload))?;
        Ok(())
    }

    /// Post a new PR comment thread.
    ///
    /// Unlike the GitHub path this always appends a fresh thread; it never
    /// searches for an earlier evidence comment.
    pub fn post_pr_comment(&self, pr_id: u64, body: &str) -> Result<()> {
        if self.dry_run || pr_id == 0 {
            return Ok(());
        }

        let url = format!(
            "{}/{}/_apis/git/repositories/{}/pullRequests/{}/threads?api-version=7.1-preview.1",
            self.org_url,
            self.project,
            percent_encode(&self.repo),
            pr_id
        );
        let payload = json!({
            "comments": [{ "content": body, "commentType": 1 }],
            "status": 1,
        });
        self.http.json("POST", &url, &self.headers(), Some(&payload))?;
        Ok(())
    }
}
