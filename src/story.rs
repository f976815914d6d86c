//! Story locator.
//!
//! Resolves a story id (`ACF-###`) to a markdown file under the stories
//! directory and extracts an effective title. Lookup is by filename first,
//! then by scanning file contents for the id.

use crate::{Error, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Maximum length of a branch slug.
const SLUG_MAX_LEN: usize = 40;

fn story_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ACF-\d+$").unwrap())
}

/// Check that a story id matches the `ACF-###` pattern.
pub fn validate_story_id(story_id: &str) -> Result<()> {
    if story_id_re().is_match(story_id) {
        Ok(())
    } else {
        Err(Error::InvalidStoryId(story_id.to_string()))
    }
}

/// A resolved work item. Immutable once parsed.
#[derive(Debug, Clone)]
pub struct Story {
    /// Story id, e.g. `ACF-0123`
    pub id: String,
    /// Effective title (frontmatter `title:` wins over the first heading)
    pub title: String,
    /// Path to the story file
    pub path: PathBuf,
    /// Raw file content
    pub content: String,
}

/// Resolve a story id to its file and title.
///
/// Looks for `<stories_dir>/<id>.md` first; when that is missing, scans every
/// `*.md` file under the stories directory for one that mentions the id.
pub fn resolve(stories_dir: &Path, story_id: &str) -> Result<Story> {
    validate_story_id(story_id)?;

    let mut path = stories_dir.join(format!("{}.md", story_id));
    if !path.exists() {
        if let Some(found) = scan_for_story(stories_dir, story_id) {
            path = found;
        }
    }
    if !path.exists() {
        return Err(Error::NotFound(format!(
            "story file for {} under {}",
            story_id,
            stories_dir.display()
        )));
    }

    let content = read_lossy(&path)?;
    let title = effective_title(&content, story_id);
    Ok(Story {
        id: story_id.to_string(),
        title,
        path,
        content,
    })
}

/// Read a file as UTF-8, replacing invalid sequences.
fn read_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Find the first markdown file under `dir` whose content mentions the id.
fn scan_for_story(dir: &Path, story_id: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let p = entry.path();
        if p.is_dir() {
            subdirs.push(p);
        } else if p.extension().is_some_and(|e| e == "md") {
            if let Ok(content) = read_lossy(&p) {
                if content.contains(story_id) {
                    return Some(p);
                }
            }
        }
    }
    subdirs
        .into_iter()
        .find_map(|d| scan_for_story(&d, story_id))
}

/// Extract the effective title for a story.
///
/// Precedence: frontmatter `title:` field, then the first markdown heading
/// with the story id and leading `-`/`:` punctuation stripped, then
/// `"Untitled"`.
pub fn effective_title(content: &str, story_id: &str) -> String {
    let title = frontmatter_title(content).unwrap_or_default();
    if !title.is_empty() {
        return title;
    }

    let heading = heading_title(content).unwrap_or_default();
    let cleaned = heading
        .replace(story_id, "")
        .trim_matches(&[' ', '-', ':'][..])
        .to_string();
    if cleaned.is_empty() {
        "Untitled".to_string()
    } else {
        cleaned
    }
}

/// Extract a `title:` field from YAML frontmatter, if present.
fn frontmatter_title(content: &str) -> Option<String> {
    if !content.starts_with("---") {
        return None;
    }
    // Only scan the head of the file for the closing fence.
    for line in content.lines().skip(1).take(79) {
        if line.trim() == "---" {
            break;
        }
        if line.to_lowercase().starts_with("title:") {
            let value = line.splitn(2, ':').nth(1).unwrap_or("").trim();
            return Some(value.to_string());
        }
    }
    None
}

/// Extract the first markdown heading, if present.
fn heading_title(content: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^#+\s+(.+)$").unwrap());
    for line in content.lines() {
        if let Some(caps) = re.captures(line.trim()) {
            return Some(caps[1].trim().to_string());
        }
    }
    None
}

/// Reduce a title to a branch-safe slug.
///
/// Non-alphanumeric runs collapse to `-`; the result is lowercased, trimmed,
/// and capped at 40 characters. An empty result falls back to `"work"`.
pub fn slugify(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9]+").unwrap());
    let slug = re
        .replace_all(text.trim(), "-")
        .trim_matches('-')
        .to_lowercase();
    let slug: String = slug.chars().take(SLUG_MAX_LEN).collect();
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "work".to_string()
    } else {
        slug
    }
}

/// Branch name for a story: `feature/<id>-<slug>`.
pub fn branch_name(story_id: &str, title: &str) -> String {
    format!("feature/{}-{}", story_id, slugify(title))
}
