//! Tracker provider clients.
//!
//! Two REST backends share this module: GitHub (`github`) and Azure DevOps
//! (`azure`). Both are synchronous, blocking clients built on a shared
//! `ureq` agent with a fixed timeout. Responses are validated into typed
//! structs at the call boundary; `ProviderRef` is the tagged record that
//! ends up in the persisted state file.

pub mod azure;
pub mod github;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout applied to every provider HTTP call.
const HTTP_TIMEOUT_SECS: u64 = 30;

/// Maximum length of an error-body excerpt carried in `Error::Http`.
const BODY_EXCERPT_LEN: usize = 1200;

/// User-Agent header sent on every provider request.
pub(crate) const USER_AGENT: &str = "autopilot-cli";

/// Placeholder URL recorded for dry-run results.
pub(crate) const DRY_RUN_URL: &str = "(dry-run)";

/// A tracker issue or work item reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueRef {
    pub number: u64,
    pub html_url: String,
    pub title: String,
}

/// A pull request reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PullRequestRef {
    pub number: u64,
    pub html_url: String,
    pub title: String,
}

/// Provider block persisted in the per-story state file.
///
/// Absent (serialized as `{}`) until provider integration succeeds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum ProviderRef {
    #[serde(rename = "github")]
    Github {
        #[serde(rename = "apiUrl")]
        api_url: String,
        repo: String,
        issue: Option<IssueRef>,
        pr: Option<PullRequestRef>,
    },
    #[serde(rename = "azuredevops")]
    AzureDevOps {
        #[serde(rename = "orgUrl")]
        org_url: String,
        project: String,
        repo: String,
        #[serde(rename = "workItemType")]
        work_item_type: String,
        #[serde(rename = "workItemId")]
        work_item_id: u64,
        #[serde(rename = "prId")]
        pr_id: u64,
        #[serde(rename = "prUrl")]
        pr_url: Option<String>,
    },
}

/// Provider selected for a `start` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Github,
    AzureDevOps,
}

/// Resolve the effective provider from the CLI selector.
///
/// `auto` picks Azure DevOps when the origin remote looks like an Azure
/// Repos URL, GitHub otherwise (including when there is no origin remote).
pub fn resolve_provider(selector: &str, origin_url: Option<&str>) -> Result<Provider> {
    match selector {
        "github" => Ok(Provider::Github),
        "azuredevops" => Ok(Provider::AzureDevOps),
        "auto" => {
            let is_azure = origin_url.is_some_and(|u| azure::parse_remote(u).is_some());
            Ok(if is_azure {
                Provider::AzureDevOps
            } else {
                Provider::Github
            })
        }
        other => Err(Error::UnknownProvider(other.to_string())),
    }
}

/// Blocking HTTP client shared by both provider backends.
pub(crate) struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build(),
        }
    }

    /// Issue a request with optional JSON body and parse the JSON response.
    ///
    /// Empty response bodies map to `Value::Null`. Non-2xx responses map to
    /// `Error::Http` with a capped body excerpt; transport failures map to
    /// `Error::Network`.
    pub fn json(
        &self,
        method: &str,
        url: &str,
        headers: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let mut request = self.agent.request(method, url);
        request = request
            .set("Accept", "application/json")
            .set("User-Agent", USER_AGENT);
        for (name, value) in headers {
            request = request.set(name, value);
        }

        let response = match body {
            Some(payload) => request.send_json(payload.clone()),
            None => request.call(),
        };

        match response {
            Ok(resp) => {
                let raw = resp.into_string().map_err(|e| Error::Network {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
                if raw.is_empty() {
                    return Ok(serde_json::Value::Null);
                }
                Ok(serde_json::from_str(&raw)
                    .unwrap_or_else(|_| serde_json::Value::String(raw)))
            }
            Err(ureq::Error::Status(status, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                Err(Error::Http {
                    status,
                    url: url.to_string(),
                    body: body.chars().take(BODY_EXCERPT_LEN).collect(),
                })
            }
            Err(e) => Err(Error::Network {
                url: url.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

/// Simple percent-encoding for URL path and query components.
pub(crate) fn percent_encode(s: &str) -> String {
    let mut result = String::with_capacity(s.len() * 3);
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_provider_explicit() {
        assert_eq!(
            resolve_provider("github", None).unwrap(),
            Provider::Github
        );
        assert_eq!(
            resolve_provider("azuredevops", None).unwrap(),
            Provider::AzureDevOps
        );
    }

    #[test]
    fn test_resolve_provider_auto_github_remote() {
        let origin = Some("git@github.com:acme/widgets.git");
        assert_eq!(resolve_provider("auto", origin).unwrap(), Provider::Github);
    }

    #[test]
    fn test_resolve_provider_auto_azure_remote() {
        let origin = Some("https://dev.azure.com/acme/proj/_git/widgets");
        assert_eq!(
            resolve_provider("auto", origin).unwrap(),
            Provider::AzureDevOps
        );
    }

    #[test]
    fn test_resolve_provider_auto_without_origin() {
        assert_eq!(resolve_provider("auto", None).unwrap(), Provider::Github);
    }

    #[test]
    fn test_resolve_provider_unknown() {
        let err = resolve_provider("gitlab", None).unwrap_err();
        assert!(matches!(err, Error::UnknownProvider(_)));
    }

    #[test]
    fn test_percent_encode_reserved_chars() {
        assert_eq!(percent_encode("My Project"), "My%20Project");
        assert_eq!(percent_encode("a/b"), "a%2Fb");
        assert_eq!(percent_encode("safe-._~"), "safe-._~");
    }

    #[test]
    fn test_provider_ref_serializes_tagged() {
        let provider = ProviderRef::Github {
            api_url: "https://api.github.com".to_string(),
            repo: "acme/widgets".to_string(),
            issue: None,
            pr: None,
        };
        let value = serde_json::to_value(&provider).unwrap();
        assert_eq!(value["kind"], "github");
        assert_eq!(value["repo"], "acme/widgets");
    }

    #[test]
    fn test_provider_ref_round_trips() {
        let provider = ProviderRef::AzureDevOps {
            org_url: "https://dev.azure.com/acme".to_string(),
            project: "proj".to_string(),
            repo: "widgets".to_string(),
            work_item_type: "User Story".to_string(),
            work_item_id: 7,
            pr_id: 11,
            pr_url: None,
        };
        let json = serde_json::to_string(&provider).unwrap();
        let back: ProviderRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, provider);
    }
}
