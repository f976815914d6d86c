//! Generated artifacts: review packs, PR bodies, evidence summaries.
//!
//! The review pack is write-once-then-human-edited; the tool never reads it
//! back. The evidence summary is a templated block posted as a PR comment,
//! tagged with a stable marker so the GitHub path can update it in place.

use crate::story::Story;
use crate::Result;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory (under the repo root) holding review packs.
const REVIEW_PACK_DIR: &str = "artifacts/review-pack";

/// Stable marker identifying the evidence comment on a PR.
pub const EVIDENCE_MARKER: &str = "<!-- acf-autopilot:evidence -->";

/// Current UTC time in ISO 8601 form, second precision.
pub fn now_utc_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Path of the review pack for a story.
pub fn review_pack_path(repo_root: &Path, story_id: &str) -> PathBuf {
    repo_root
        .join(REVIEW_PACK_DIR)
        .join(format!("{}.md", story_id))
}

/// Render a repo-root-relative path for display in generated documents.
pub fn rel_to_root(repo_root: &Path, path: &Path) -> String {
    path.strip_prefix(repo_root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Write the review pack checklist for a story.
pub fn write_review_pack(repo_root: &Path, story: &Story) -> Result<PathBuf> {
    let out = review_pack_path(repo_root, &story.id);
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)?;
    }
    let rel_story = rel_to_root(repo_root, &story.path);
    let content = format!(
        "# Review Pack — {id}: {title}\n\
         \n\
         Generated: {now}\n\
         \n\
         ## Links\n\
         - Story file: `{rel_story}`\n\
         \n\
         ## Scope (Human-verified)\n\
         - [ ] Scope matches acceptance criteria\n\
         - [ ] No new dependencies without ADR approval\n\
         - [ ] Security model changes reviewed (if applicable)\n\
         \n\
         ## Evidence (Autopilot)\n\
         - [ ] `scripts/validate-project.sh`\n\
         - [ ] `scripts/validate-documentation.sh`\n\
         - [ ] `scripts/validate-rnd-policy.sh`\n\
         - [ ] `python3 scripts/traceability/traceability.py validate`\n\
         - [ ] Optional: `scripts/scaffold-and-verify.sh` (template build/test/coverage)\n\
         \n\
         ## Notes\n\
         - Add any reviewer notes, risks, or waivers here (link to ADRs/waivers if needed).\n",
        id = story.id,
        title = story.title,
        now = now_utc_iso(),
        rel_story = rel_story,
    );
    fs::write(&out, content)?;
    Ok(out)
}

/// Compose the PR description from story and review-pack paths plus an
/// optional work-item reference.
pub fn compose_pr_body(
    repo_root: &Path,
    story: &Story,
    issue_ref: Option<&str>,
    review_pack_file: &Path,
) -> String {
    let rel_story = rel_to_root(repo_root, &story.path);
    let rel_review = rel_to_root(repo_root, review_pack_file);
    let mut parts = vec![
        format!("## {}: {}", story.id, story.title),
        String::new(),
        format!("- Story: `{}`", rel_story),
        format!("- Review pack: `{}`", rel_review),
    ];
    if let Some(reference) = issue_ref {
        parts.push(format!("- Work item: {}", reference));
    }
    parts.extend([
        String::new(),
        "## Autopilot checklist".to_string(),
        "- [ ] Evidence pack generated/updated".to_string(),
        "- [ ] Traceability passes (Story → Test → Commit → Release)".to_string(),
        "- [ ] Policy self-checks completed".to_string(),
    ]);
    let mut body = parts.join("\n");
    body.push('\n');
    body
}

/// Templated evidence summary posted as a PR comment.
pub fn evidence_summary(story_id: &str, story_title: &str) -> String {
    format!(
        "## Evidence Pack — {id}: {title}\n\
         \n\
         Generated: {now}\n\
         \n\
         ### Commands\n\
         - `./scripts/validate-project.sh`\n\
         - `./scripts/validate-documentation.sh`\n\
         - `./scripts/validate-rnd-policy.sh`\n\
         - `python3 scripts/traceability/traceability.py validate --stories-dir artifacts/stories --tests-root .`\n\
         \n\
         ### Notes\n\
         - This comment is managed by AI Coding Factory Autopilot.",
        id = story_id,
        title = story_title,
        now = now_utc_iso(),
    )
}
