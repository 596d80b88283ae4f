//! Key-value backend contract.
//!
//! # Responsibility
//! - Describe the managed store the task store runs against: point
//!   get/put/update/delete, prefix range query, bounded batch delete.
//! - Carry attribute values in the store's typed wire shape (`S`/`N`/`BOOL`).
//!
//! # Invariants
//! - Items are addressed by `(partition, sort)`; a prefix query never crosses
//!   partitions.
//! - `batch_delete` accepts at most `batch_limit()` keys and returns the keys
//!   it did not process; it never reports a key it was not given.

use crate::db::DbError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum number of keys a single batch write call accepts.
pub const BATCH_WRITE_LIMIT: usize = 25;

/// Typed attribute value as stored by the backend.
///
/// Numbers travel as decimal text so no precision is lost in transit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrValue {
    #[serde(rename = "S")]
    S(String),
    #[serde(rename = "N")]
    N(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
}

impl AttrValue {
    /// Short type label used in diagnostics.
    pub fn type_label(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::Bool(_) => "BOOL",
        }
    }
}

/// Attribute map of one stored item (key attributes excluded).
pub type Item = BTreeMap<String, AttrValue>;

/// Primary key of one stored item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemKey {
    pub partition: String,
    pub sort: String,
}

impl ItemKey {
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
        }
    }
}

impl Display for ItemKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.partition, self.sort)
    }
}

/// One item returned by a range query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredItem {
    pub key: ItemKey,
    pub item: Item,
}

/// Precondition attached to an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteCondition {
    /// Upsert semantics: the update creates the item when absent.
    #[default]
    None,
    /// The update applies only when the item already exists.
    ItemExists,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Errors raised by backend calls.
#[derive(Debug)]
pub enum BackendError {
    /// SQLite/bootstrap failure in the file-backed store.
    Db(DbError),
    /// Attribute map could not be encoded or decoded.
    Serialization(serde_json::Error),
    /// A batch call exceeded the per-call key limit.
    BatchTooLarge { size: usize, limit: usize },
    /// A conditional write found its precondition false.
    ConditionFailed(ItemKey),
    /// The backend could not serve the call (transient or injected fault).
    Unavailable(String),
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "item attribute encoding failed: {err}"),
            Self::BatchTooLarge { size, limit } => {
                write!(f, "batch of {size} keys exceeds limit of {limit}")
            }
            Self::ConditionFailed(key) => write!(f, "conditional write failed for {key}"),
            Self::Unavailable(message) => write!(f, "backend unavailable: {message}"),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::BatchTooLarge { .. } => None,
            Self::ConditionFailed(_) => None,
            Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for BackendError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for BackendError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Store operations consumed by the task store.
pub trait KvBackend {
    /// Writes the full item, replacing any existing one.
    fn put_item(&self, key: &ItemKey, item: &Item) -> BackendResult<()>;
    /// Reads one item.
    fn get_item(&self, key: &ItemKey) -> BackendResult<Option<Item>>;
    /// Sets the given attributes, leaving the others untouched.
    fn update_item(
        &self,
        key: &ItemKey,
        changes: &Item,
        condition: WriteCondition,
    ) -> BackendResult<()>;
    /// Deletes one item. Deleting a missing item is not an error.
    fn delete_item(&self, key: &ItemKey) -> BackendResult<()>;
    /// Returns all items of `partition` whose sort key starts with `sort_prefix`,
    /// ascending by sort key.
    fn query_prefix(&self, partition: &str, sort_prefix: &str) -> BackendResult<Vec<StoredItem>>;
    /// Deletes up to `batch_limit()` items, returning the unprocessed keys.
    fn batch_delete(&self, keys: &[ItemKey]) -> BackendResult<Vec<ItemKey>>;
    /// Per-call key limit of `batch_delete`.
    fn batch_limit(&self) -> usize {
        BATCH_WRITE_LIMIT
    }
}

impl<T: KvBackend + ?Sized> KvBackend for &T {
    fn put_item(&self, key: &ItemKey, item: &Item) -> BackendResult<()> {
        (**self).put_item(key, item)
    }

    fn get_item(&self, key: &ItemKey) -> BackendResult<Option<Item>> {
        (**self).get_item(key)
    }

    fn update_item(
        &self,
        key: &ItemKey,
        changes: &Item,
        condition: WriteCondition,
    ) -> BackendResult<()> {
        (**self).update_item(key, changes, condition)
    }

    fn delete_item(&self, key: &ItemKey) -> BackendResult<()> {
        (**self).delete_item(key)
    }

    fn query_prefix(&self, partition: &str, sort_prefix: &str) -> BackendResult<Vec<StoredItem>> {
        (**self).query_prefix(partition, sort_prefix)
    }

    fn batch_delete(&self, keys: &[ItemKey]) -> BackendResult<Vec<ItemKey>> {
        (**self).batch_delete(keys)
    }

    fn batch_limit(&self) -> usize {
        (**self).batch_limit()
    }
}

pub(crate) fn ensure_batch_size(keys: &[ItemKey], limit: usize) -> BackendResult<()> {
    if keys.len() > limit {
        return Err(BackendError::BatchTooLarge {
            size: keys.len(),
            limit,
        });
    }
    Ok(())
}
