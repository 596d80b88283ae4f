//! Item schema: key encoding and attribute mapping for goal/task records.
//!
//! # Responsibility
//! - Build partition/sort keys for goals and tasks.
//! - Translate `Record` values to and from backend attribute maps.
//!
//! # Invariants
//! - Partition: `USER#{userId}`. Sort: `GOAL#{goalId}` or
//!   `TASK#{goalId}#{taskId}`.
//! - A task id is always the component after the last `#` of its sort key.
//! - `order` is encoded with the shortest round-trip decimal form of the f64;
//!   `timeSpent` as an unsigned decimal integer.
//! - Decoding rejects invalid persisted state instead of masking it.

use crate::model::record::{Goal, Record, RecordKind, Task, KEY_SEPARATOR};
use crate::repo::kv_backend::{AttrValue, Item, ItemKey};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const USER_PREFIX: &str = "USER#";
pub const GOAL_PREFIX: &str = "GOAL#";
pub const TASK_PREFIX: &str = "TASK#";

pub const ATTR_TYPE: &str = "type";
pub const ATTR_GOAL_TEXT: &str = "goalText";
pub const ATTR_TASK_TEXT: &str = "taskText";
pub const ATTR_CREATED_AT: &str = "createdAt";
pub const ATTR_COMPLETED: &str = "completed";
pub const ATTR_ORDER: &str = "order";
pub const ATTR_DEADLINE: &str = "deadline";
pub const ATTR_TIME_SPENT: &str = "timeSpent";

/// Persisted item cannot be decoded into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    MissingAttribute(&'static str),
    UnexpectedAttributeType {
        name: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    InvalidNumber {
        name: &'static str,
        value: String,
    },
    UnknownRecordType(String),
    MalformedSortKey(String),
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingAttribute(name) => write!(f, "missing attribute `{name}`"),
            Self::UnexpectedAttributeType {
                name,
                expected,
                found,
            } => write!(f, "attribute `{name}` must be {expected}, found {found}"),
            Self::InvalidNumber { name, value } => {
                write!(f, "attribute `{name}` holds invalid number `{value}`")
            }
            Self::UnknownRecordType(tag) => write!(f, "unknown record type `{tag}`"),
            Self::MalformedSortKey(sort) => write!(f, "malformed sort key `{sort}`"),
        }
    }
}

impl Error for SchemaError {}

pub fn user_partition(user_id: &str) -> String {
    format!("{USER_PREFIX}{user_id}")
}

pub fn goal_key(user_id: &str, goal_id: &str) -> ItemKey {
    ItemKey::new(user_partition(user_id), format!("{GOAL_PREFIX}{goal_id}"))
}

pub fn task_key(user_id: &str, goal_id: &str, task_id: &str) -> ItemKey {
    ItemKey::new(
        user_partition(user_id),
        format!("{TASK_PREFIX}{goal_id}{KEY_SEPARATOR}{task_id}"),
    )
}

/// Sort-key prefix matching every goal of a partition.
pub fn goals_prefix() -> &'static str {
    GOAL_PREFIX
}

/// Sort-key prefix matching every task of one goal.
pub fn tasks_prefix(goal_id: &str) -> String {
    format!("{TASK_PREFIX}{goal_id}{KEY_SEPARATOR}")
}

/// Task id from a task sort key: the component after the last separator.
pub fn parse_task_id(sort_key: &str) -> Option<&str> {
    sort_key
        .rsplit_once(KEY_SEPARATOR)
        .map(|(_, task_id)| task_id)
        .filter(|task_id| !task_id.is_empty())
}

/// Goal id from a goal sort key.
pub fn parse_goal_id(sort_key: &str) -> Option<&str> {
    sort_key
        .strip_prefix(GOAL_PREFIX)
        .filter(|goal_id| !goal_id.is_empty())
}

pub fn encode_order(order: f64) -> String {
    format!("{order}")
}

pub fn decode_order(value: &str) -> Result<f64, SchemaError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|order| order.is_finite())
        .ok_or_else(|| SchemaError::InvalidNumber {
            name: ATTR_ORDER,
            value: value.to_string(),
        })
}

pub fn encode_time_spent(time_spent: u64) -> String {
    time_spent.to_string()
}

pub fn decode_time_spent(value: &str) -> Result<u64, SchemaError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| SchemaError::InvalidNumber {
            name: ATTR_TIME_SPENT,
            value: value.to_string(),
        })
}

impl Record {
    /// Decodes one stored item, dispatching on its `type` tag.
    pub fn from_item(key: &ItemKey, item: &Item) -> Result<Self, SchemaError> {
        let tag = string_attr(item, ATTR_TYPE)?;
        let kind = RecordKind::from_tag(tag)
            .ok_or_else(|| SchemaError::UnknownRecordType(tag.to_string()))?;
        match kind {
            RecordKind::Goal => decode_goal(&key.sort, item).map(Self::Goal),
            RecordKind::Task => decode_task(&key.sort, item).map(Self::Task),
        }
    }

    /// Storage key of this record inside `user_id`'s partition.
    pub fn key(&self, user_id: &str) -> ItemKey {
        match self {
            Self::Goal(goal) => goal_key(user_id, &goal.goal_id),
            Self::Task(task) => task_key(user_id, &task.goal_id, &task.task_id),
        }
    }

    /// Full attribute map, including the type tag.
    pub fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert(
            ATTR_TYPE.to_string(),
            AttrValue::S(self.kind().as_tag().to_string()),
        );
        match self {
            Self::Goal(goal) => {
                item.insert(ATTR_GOAL_TEXT.to_string(), AttrValue::S(goal.goal_text.clone()));
                item.insert(ATTR_CREATED_AT.to_string(), AttrValue::S(goal.created_at.clone()));
            }
            Self::Task(task) => {
                item.insert(ATTR_TASK_TEXT.to_string(), AttrValue::S(task.task_text.clone()));
                item.insert(ATTR_COMPLETED.to_string(), AttrValue::Bool(task.completed));
                item.insert(ATTR_CREATED_AT.to_string(), AttrValue::S(task.created_at.clone()));
                item.insert(ATTR_ORDER.to_string(), AttrValue::N(encode_order(task.order)));
                item.insert(
                    ATTR_DEADLINE.to_string(),
                    AttrValue::S(task.deadline.clone().unwrap_or_default()),
                );
                item.insert(
                    ATTR_TIME_SPENT.to_string(),
                    AttrValue::N(encode_time_spent(task.time_spent)),
                );
            }
        }
        item
    }
}

/// Decodes a task item found under a task-prefix query.
pub fn decode_task_item(key: &ItemKey, item: &Item) -> Result<Task, SchemaError> {
    match Record::from_item(key, item)? {
        Record::Task(task) => Ok(task),
        Record::Goal(_) => Err(SchemaError::MalformedSortKey(key.sort.clone())),
    }
}

/// Decodes a goal item found under the goal-prefix query.
pub fn decode_goal_item(key: &ItemKey, item: &Item) -> Result<Goal, SchemaError> {
    match Record::from_item(key, item)? {
        Record::Goal(goal) => Ok(goal),
        Record::Task(_) => Err(SchemaError::MalformedSortKey(key.sort.clone())),
    }
}

fn decode_goal(sort: &str, item: &Item) -> Result<Goal, SchemaError> {
    let goal_id =
        parse_goal_id(sort).ok_or_else(|| SchemaError::MalformedSortKey(sort.to_string()))?;
    Ok(Goal {
        goal_id: goal_id.to_string(),
        goal_text: string_attr(item, ATTR_GOAL_TEXT)?.to_string(),
        created_at: string_attr(item, ATTR_CREATED_AT)?.to_string(),
    })
}

fn decode_task(sort: &str, item: &Item) -> Result<Task, SchemaError> {
    let (goal_id, task_id) = sort
        .strip_prefix(TASK_PREFIX)
        .and_then(|rest| rest.rsplit_once(KEY_SEPARATOR))
        .filter(|(goal_id, task_id)| !goal_id.is_empty() && !task_id.is_empty())
        .ok_or_else(|| SchemaError::MalformedSortKey(sort.to_string()))?;

    let deadline = string_attr(item, ATTR_DEADLINE)?;
    Ok(Task {
        goal_id: goal_id.to_string(),
        task_id: task_id.to_string(),
        task_text: string_attr(item, ATTR_TASK_TEXT)?.to_string(),
        completed: bool_attr(item, ATTR_COMPLETED)?,
        created_at: string_attr(item, ATTR_CREATED_AT)?.to_string(),
        order: decode_order(number_attr(item, ATTR_ORDER)?)?,
        deadline: (!deadline.is_empty()).then(|| deadline.to_string()),
        time_spent: decode_time_spent(number_attr(item, ATTR_TIME_SPENT)?)?,
    })
}

fn attr<'a>(item: &'a Item, name: &'static str) -> Result<&'a AttrValue, SchemaError> {
    item.get(name).ok_or(SchemaError::MissingAttribute(name))
}

fn string_attr<'a>(item: &'a Item, name: &'static str) -> Result<&'a str, SchemaError> {
    match attr(item, name)? {
        AttrValue::S(value) => Ok(value),
        other => Err(unexpected(name, "S", other)),
    }
}

fn number_attr<'a>(item: &'a Item, name: &'static str) -> Result<&'a str, SchemaError> {
    match attr(item, name)? {
        AttrValue::N(value) => Ok(value),
        other => Err(unexpected(name, "N", other)),
    }
}

fn bool_attr(item: &Item, name: &'static str) -> Result<bool, SchemaError> {
    match attr(item, name)? {
        AttrValue::Bool(value) => Ok(*value),
        other => Err(unexpected(name, "BOOL", other)),
    }
}

fn unexpected(name: &'static str, expected: &'static str, found: &AttrValue) -> SchemaError {
    SchemaError::UnexpectedAttributeType {
        name,
        expected,
        found: found.type_label(),
    }
}
