//! Bullet/numbered list parser.
//!
//! # Invariants
//! - Segments start at lines opening with `-`, `*`, `•`, `→` or `N.` followed
//!   by whitespace; text before the first marker is a segment too.
//! - Emphasis characters (`*`, `#`, `_`, `` ` ``) and a leading `N.` are
//!   stripped, then the candidate is trimmed.
//! - Candidates under `MIN_TASK_CHARS` characters are noise and dropped.
//! - Duplicates are detected case-insensitively; the first spelling wins.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Shortest candidate (in characters) accepted as a task.
pub const MIN_TASK_CHARS: usize = 10;

static ITEM_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:[-*•→]|\d+\.)\s+").expect("valid item marker regex"));
static EMPHASIS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[*#_`]+").expect("valid emphasis regex"));
static NUMBER_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s*").expect("valid number prefix regex"));

/// Extracts distinct task descriptions in first-seen order.
pub fn extract_tasks(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tasks = Vec::new();

    for segment in ITEM_MARKER_RE.split(text) {
        let Some(candidate) = clean_candidate(segment) else {
            continue;
        };
        if seen.insert(candidate.to_lowercase()) {
            tasks.push(candidate);
        }
    }

    tasks
}

fn clean_candidate(segment: &str) -> Option<String> {
    let without_emphasis = EMPHASIS_RE.replace_all(segment, "");
    let without_number = NUMBER_PREFIX_RE.replace(without_emphasis.trim_start(), "");
    let candidate = without_number.trim();
    if candidate.chars().count() < MIN_TASK_CHARS {
        return None;
    }
    Some(candidate.to_string())
}
