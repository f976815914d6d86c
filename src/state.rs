//! Per-story state store.
//!
//! One JSON record per story id under `artifacts/autopilot/`, overwritten on
//! each state-mutating step. Read-modify-write with no locking; the last
//! writer wins. Keys are emitted sorted, pretty-printed, with a trailing
//! newline.

use crate::providers::ProviderRef;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory (under the repo root) holding state files.
const STATE_DIR: &str = "artifacts/autopilot";

/// Persisted record for one story.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutopilotState {
    pub base_branch: String,
    pub branch: String,
    /// ISO 8601 UTC timestamp of the `start` run.
    pub created_at: String,
    /// Empty object until provider integration succeeds.
    #[serde(with = "provider_block")]
    pub provider: Option<ProviderRef>,
    /// Story file path, relative to the repo root.
    pub story_file: String,
    pub story_id: String,
    pub story_title: String,
}

/// Serialize `None` as `{}` and read `{}`/`null` back as `None`, so the
/// state file always carries a `provider` key.
mod provider_block {
    use super::ProviderRef;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<ProviderRef>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(provider) => provider.serialize(serializer),
            None => serde_json::Map::new().serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<ProviderRef>, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match &value {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::Object(map) if map.is_empty() => Ok(None),
            _ => serde_json::from_value(value)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Path of the state file for a story.
pub fn state_path(repo_root: &Path, story_id: &str) -> PathBuf {
    repo_root.join(STATE_DIR).join(format!("{}.json", story_id))
}

/// Write the state file, creating parent directories as needed.
///
/// Serializes through `serde_json::Value` so keys come out sorted at every
/// nesting level.
pub fn save(repo_root: &Path, state: &AutopilotState) -> Result<PathBuf> {
    let path = state_path(repo_root, &state.story_id);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let value = serde_json::to_value(state)?;
    let mut text = serde_json::to_string_pretty(&value)?;
    text.push('\n');
    fs::write(&path, text)?;
    Ok(path)
}

/// Load the state file for a story; `NotFound` if `start` was never run.
pub fn load(repo_root: &Path, story_id: &str) -> Result<AutopilotState> {
    let path = state_path(repo_root, story_id);
    if !path.exists() {
        return Err(Error::NotFound(format!(
            "autopilot state: {}",
            path.display()
        )));
    }
    let text = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&text)?)
}
