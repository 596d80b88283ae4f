//! Goal and task domain records.
//!
//! # Responsibility
//! - Define the canonical Goal/Task shapes and the `Record` sum type.
//! - Validate caller-supplied identifiers and text before any store call.
//!
//! # Invariants
//! - Identifiers are non-blank and never contain the key separator `#`.
//! - `order` is always finite.
//! - `created_at` is RFC 3339 UTC with fixed microsecond width, so string
//!   order equals chronological order.
//! - An empty deadline is represented as `None`.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Separator between sort-key components.
pub const KEY_SEPARATOR: char = '#';

/// A user's goal, decomposed once into tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub goal_id: String,
    pub goal_text: String,
    pub created_at: String,
}

/// One task of a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub goal_id: String,
    pub task_id: String,
    pub task_text: String,
    pub completed: bool,
    pub created_at: String,
    /// Relative position within the goal; ascending is earlier.
    pub order: f64,
    pub deadline: Option<String>,
    /// Accumulated time, in whatever unit the client tracks.
    pub time_spent: u64,
}

/// Every item kind stored in a user partition.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Goal(Goal),
    Task(Task),
}

/// Type tag carried by every stored item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Goal,
    Task,
}

impl RecordKind {
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::Goal => "goal",
            Self::Task => "task",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "goal" => Some(Self::Goal),
            "task" => Some(Self::Task),
            _ => None,
        }
    }
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Goal(_) => RecordKind::Goal,
            Self::Task(_) => RecordKind::Task,
        }
    }
}

/// Input for adding one task at a caller-chosen position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub task_text: String,
    pub order: f64,
    #[serde(default)]
    pub deadline: Option<String>,
}

/// Partial task update. Only these three fields are editable.
///
/// Unknown fields in a deserialized payload are ignored, so a payload with
/// no recognised field decodes to an empty patch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default)]
    pub task_text: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub time_spent: Option<u64>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.task_text.is_none() && self.deadline.is_none() && self.time_spent.is_none()
    }
}

/// Caller input rejected before any store call.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required identifier or text is missing or blank.
    Missing(&'static str),
    /// Identifier contains the key separator.
    InvalidIdentifier { field: &'static str, value: String },
    /// Order value is NaN or infinite.
    NonFiniteOrder(f64),
    /// Partial update carries no editable field.
    EmptyPatch,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(field) => write!(f, "missing {field}"),
            Self::InvalidIdentifier { field, value } => write!(
                f,
                "invalid {field} `{value}`: must not contain `{KEY_SEPARATOR}`"
            ),
            Self::NonFiniteOrder(value) => write!(f, "order must be finite, got {value}"),
            Self::EmptyPatch => write!(f, "nothing to update"),
        }
    }
}

impl Error for ValidationError {}

/// Checks an identifier and returns it unchanged.
pub fn require_id<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Missing(field));
    }
    if value.contains(KEY_SEPARATOR) {
        return Err(ValidationError::InvalidIdentifier {
            field,
            value: value.to_string(),
        });
    }
    Ok(value)
}

/// Checks free text and returns it trimmed.
pub fn require_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    Ok(trimmed.to_string())
}

pub fn require_finite_order(order: f64) -> Result<f64, ValidationError> {
    if order.is_finite() {
        Ok(order)
    } else {
        Err(ValidationError::NonFiniteOrder(order))
    }
}

/// Collapses an empty deadline into `None`.
pub fn normalize_deadline(deadline: Option<&str>) -> Option<String> {
    deadline
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// New random record identifier.
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current UTC time as a fixed-width RFC 3339 string.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::{normalize_deadline, now_timestamp, require_id, TaskPatch, ValidationError};

    #[test]
    fn require_id_rejects_blank_and_separator() {
        assert_eq!(
            require_id("goalId", "  "),
            Err(ValidationError::Missing("goalId"))
        );
        assert!(matches!(
            require_id("taskId", "a#b"),
            Err(ValidationError::InvalidIdentifier { field: "taskId", .. })
        ));
        assert_eq!(require_id("goalId", "g-1"), Ok("g-1"));
    }

    #[test]
    fn patch_with_only_unknown_fields_is_empty() {
        let patch: TaskPatch = serde_json::from_str(r#"{"completed": true}"#).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn empty_deadline_normalizes_to_none() {
        assert_eq!(normalize_deadline(Some("")), None);
        assert_eq!(
            normalize_deadline(Some("2026-11-01")),
            Some("2026-11-01".to_string())
        );
    }

    #[test]
    fn timestamps_are_fixed_width_utc() {
        let stamp = now_timestamp();
        assert!(stamp.ends_with('Z'));
        assert_eq!(stamp.len(), "2026-10-15T00:00:00.000000Z".len());
    }
}
