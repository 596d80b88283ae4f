//! Task store facade.
//!
//! # Responsibility
//! - Expose the goal/task use-cases for one authenticated user.
//! - Orchestrate schema, ordering, extraction and batch deletion over an
//!   injected key-value backend.
//!
//! # Invariants
//! - Validation happens before the first backend call; a rejected request
//!   performs no I/O.
//! - Updates to existing tasks are conditional on the task existing; they
//!   never create partial rows.
//! - No multi-item transaction: a failure mid-sequence leaves the writes that
//!   already happened. Every operation is safe to retry.
//! - Deleting a goal removes the goal record even when some task rows could
//!   not be deleted; the report lists those rows.

use crate::config::StoreConfig;
use crate::extract::bullets::extract_tasks;
use crate::model::record::{
    new_record_id, normalize_deadline, now_timestamp, require_finite_order, require_id,
    require_text, Goal, NewTask, Record, Task, TaskPatch, ValidationError,
};
use crate::model::schema::{
    decode_goal_item, decode_task_item, encode_order, encode_time_spent, goal_key, goals_prefix,
    task_key, tasks_prefix, user_partition, SchemaError, ATTR_COMPLETED, ATTR_DEADLINE,
    ATTR_ORDER, ATTR_TASK_TEXT, ATTR_TIME_SPENT,
};
use crate::ordering::{sort_tasks, OrderingEngine};
use crate::repo::batch_delete::{BatchDeleter, DeletionReport};
use crate::repo::kv_backend::{AttrValue, BackendError, Item, ItemKey, KvBackend, WriteCondition};
use crate::retry::{Sleeper, ThreadSleeper};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from task store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Caller input rejected; nothing was attempted.
    Validation(ValidationError),
    /// Underlying store call failed.
    Backend(BackendError),
    /// Target goal or task does not exist.
    NotFound(ItemKey),
    /// A stored item could not be decoded.
    InvalidData { key: ItemKey, source: SchemaError },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Backend(err) => write!(f, "{err}"),
            Self::NotFound(key) => write!(f, "record not found: {key}"),
            Self::InvalidData { key, source } => {
                write!(f, "invalid stored record {key}: {source}")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Backend(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData { source, .. } => Some(source),
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<BackendError> for StoreError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::ConditionFailed(key) => Self::NotFound(key),
            other => Self::Backend(other),
        }
    }
}

/// Goal created from generated text, with its tasks in list order.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedGoal {
    pub goal: Goal,
    pub tasks: Vec<Task>,
}

/// Outcome of deleting a goal and its tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalDeletion {
    pub goal_id: String,
    pub tasks: DeletionReport,
}

impl GoalDeletion {
    pub fn tasks_deleted(&self) -> usize {
        self.tasks.deleted
    }

    /// Task rows left behind under the removed goal.
    pub fn orphaned_tasks(&self) -> &[ItemKey] {
        &self.tasks.undeleted
    }
}

/// Outcome of a reindex pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexReport {
    pub total: usize,
    pub rewritten: usize,
    /// Tasks deleted between the read and their write; skipped.
    pub vanished: usize,
}

/// Position written by `place_task_between`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub order: f64,
    /// The neighbours' gap is exhausted; the caller should reindex.
    pub needs_reindex: bool,
}

/// Goal/task use-cases over a key-value backend.
pub struct TaskStore<B: KvBackend, S: Sleeper = ThreadSleeper> {
    backend: B,
    sleeper: S,
    config: StoreConfig,
    ordering: OrderingEngine,
}

impl<B: KvBackend> TaskStore<B, ThreadSleeper> {
    /// Store with default configuration and real sleeps.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    pub fn with_config(backend: B, config: StoreConfig) -> Self {
        Self::with_sleeper(backend, config, ThreadSleeper)
    }
}

impl<B: KvBackend, S: Sleeper> TaskStore<B, S> {
    /// Store with an injected sleeper (used for batch-delete backoff).
    pub fn with_sleeper(backend: B, config: StoreConfig, sleeper: S) -> Self {
        Self {
            ordering: OrderingEngine::new(config.order_stride),
            backend,
            sleeper,
            config,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn ordering(&self) -> &OrderingEngine {
        &self.ordering
    }

    /// Creates one goal plus the tasks extracted from `generated_text`.
    ///
    /// # Contract
    /// - Tasks get `stride, 2*stride, ...` in extraction order.
    /// - The goal is written first, then each task.
    /// - Zero extracted tasks still creates the goal.
    pub fn create_goal_with_tasks(
        &self,
        user_id: &str,
        goal_text: &str,
        generated_text: &str,
    ) -> StoreResult<CreatedGoal> {
        let user_id = require_id("userId", user_id)?;
        let goal_text = require_text("goalText", goal_text)?;

        let created_at = now_timestamp();
        let goal = Goal {
            goal_id: new_record_id(),
            goal_text,
            created_at: created_at.clone(),
        };

        let texts = extract_tasks(generated_text);
        let orders = self.ordering.assign_initial_orders(texts.len());
        let tasks: Vec<Task> = texts
            .into_iter()
            .zip(orders)
            .map(|(task_text, order)| Task {
                goal_id: goal.goal_id.clone(),
                task_id: new_record_id(),
                task_text,
                completed: false,
                created_at: created_at.clone(),
                order,
                deadline: None,
                time_spent: 0,
            })
            .collect();

        self.put_record(user_id, Record::Goal(goal.clone()))?;
        for task in &tasks {
            self.put_record(user_id, Record::Task(task.clone()))?;
        }

        info!(
            "event=goal_create module=store status=ok goal_id={} tasks={}",
            goal.goal_id,
            tasks.len()
        );
        Ok(CreatedGoal { goal, tasks })
    }

    /// Lists the user's goals in store order.
    pub fn list_goals(&self, user_id: &str) -> StoreResult<Vec<Goal>> {
        let user_id = require_id("userId", user_id)?;
        let found = self
            .backend
            .query_prefix(&user_partition(user_id), goals_prefix())?;
        found
            .iter()
            .map(|stored| {
                decode_goal_item(&stored.key, &stored.item).map_err(|source| {
                    StoreError::InvalidData {
                        key: stored.key.clone(),
                        source,
                    }
                })
            })
            .collect()
    }

    /// Lists one goal's tasks sorted by order, creation time, then id.
    pub fn list_tasks(&self, user_id: &str, goal_id: &str) -> StoreResult<Vec<Task>> {
        let user_id = require_id("userId", user_id)?;
        let goal_id = require_id("goalId", goal_id)?;
        self.load_tasks(user_id, goal_id)
    }

    /// Adds one task at a caller-chosen order.
    ///
    /// The caller usually derives `order` from its neighbours with
    /// `OrderingEngine::order_between`.
    pub fn add_task(&self, user_id: &str, goal_id: &str, new_task: &NewTask) -> StoreResult<Task> {
        let user_id = require_id("userId", user_id)?;
        let goal_id = require_id("goalId", goal_id)?;
        let task_text = require_text("taskText", &new_task.task_text)?;
        let order = require_finite_order(new_task.order)?;

        self.ensure_goal_exists(user_id, goal_id)?;
        self.insert_task(
            user_id,
            goal_id,
            task_text,
            order,
            normalize_deadline(new_task.deadline.as_deref()),
        )
    }

    /// Adds one task after the current last task.
    pub fn append_task(
        &self,
        user_id: &str,
        goal_id: &str,
        task_text: &str,
        deadline: Option<&str>,
    ) -> StoreResult<Task> {
        let user_id = require_id("userId", user_id)?;
        let goal_id = require_id("goalId", goal_id)?;
        let task_text = require_text("taskText", task_text)?;

        self.ensure_goal_exists(user_id, goal_id)?;
        let tasks = self.load_tasks(user_id, goal_id)?;
        let order = self.ordering.next_order(&tasks);
        self.insert_task(user_id, goal_id, task_text, order, normalize_deadline(deadline))
    }

    /// Applies a partial update of `taskText`, `deadline` and/or `timeSpent`.
    pub fn edit_task(
        &self,
        user_id: &str,
        goal_id: &str,
        task_id: &str,
        patch: &TaskPatch,
    ) -> StoreResult<()> {
        let user_id = require_id("userId", user_id)?;
        let goal_id = require_id("goalId", goal_id)?;
        let task_id = require_id("taskId", task_id)?;
        if patch.is_empty() {
            return Err(ValidationError::EmptyPatch.into());
        }

        let mut changes = Item::new();
        if let Some(task_text) = &patch.task_text {
            changes.insert(
                ATTR_TASK_TEXT.to_string(),
                AttrValue::S(require_text("taskText", task_text)?),
            );
        }
        if let Some(deadline) = &patch.deadline {
            changes.insert(
                ATTR_DEADLINE.to_string(),
                AttrValue::S(normalize_deadline(Some(deadline.as_str())).unwrap_or_default()),
            );
        }
        if let Some(time_spent) = patch.time_spent {
            changes.insert(
                ATTR_TIME_SPENT.to_string(),
                AttrValue::N(encode_time_spent(time_spent)),
            );
        }

        self.update_existing_task(user_id, goal_id, task_id, &changes)?;
        debug!(
            "event=task_edit module=store status=ok goal_id={goal_id} task_id={task_id} fields={}",
            changes.len()
        );
        Ok(())
    }

    /// Sets the completion flag.
    pub fn mark_task_completed(
        &self,
        user_id: &str,
        goal_id: &str,
        task_id: &str,
        completed: bool,
    ) -> StoreResult<()> {
        let user_id = require_id("userId", user_id)?;
        let goal_id = require_id("goalId", goal_id)?;
        let task_id = require_id("taskId", task_id)?;

        let mut changes = Item::new();
        changes.insert(ATTR_COMPLETED.to_string(), AttrValue::Bool(completed));
        self.update_existing_task(user_id, goal_id, task_id, &changes)
    }

    /// Writes an explicit order value for one task.
    pub fn update_task_order(
        &self,
        user_id: &str,
        goal_id: &str,
        task_id: &str,
        order: f64,
    ) -> StoreResult<()> {
        let user_id = require_id("userId", user_id)?;
        let goal_id = require_id("goalId", goal_id)?;
        let task_id = require_id("taskId", task_id)?;
        let order = require_finite_order(order)?;
        self.write_order(user_id, goal_id, task_id, order)
    }

    /// Moves one task between two neighbour order values.
    ///
    /// The new value is written even when the gap is exhausted; the returned
    /// `needs_reindex` tells the caller to run `reindex_tasks`.
    pub fn place_task_between(
        &self,
        user_id: &str,
        goal_id: &str,
        task_id: &str,
        before: Option<f64>,
        after: Option<f64>,
    ) -> StoreResult<Placement> {
        let user_id = require_id("userId", user_id)?;
        let goal_id = require_id("goalId", goal_id)?;
        let task_id = require_id("taskId", task_id)?;
        if let Some(before) = before {
            require_finite_order(before)?;
        }
        if let Some(after) = after {
            require_finite_order(after)?;
        }

        let order = self.ordering.order_between(before, after);
        let needs_reindex = self.ordering.gap_exhausted(before, after);
        self.write_order(user_id, goal_id, task_id, order)?;
        if needs_reindex {
            info!(
                "event=task_place module=store status=gap_exhausted goal_id={goal_id} task_id={task_id}"
            );
        }
        Ok(Placement {
            order,
            needs_reindex,
        })
    }

    /// Deletes one task. Deleting a missing task is not an error.
    pub fn delete_task(&self, user_id: &str, goal_id: &str, task_id: &str) -> StoreResult<()> {
        let user_id = require_id("userId", user_id)?;
        let goal_id = require_id("goalId", goal_id)?;
        let task_id = require_id("taskId", task_id)?;
        self.backend.delete_item(&task_key(user_id, goal_id, task_id))?;
        Ok(())
    }

    /// Deletes all tasks of a goal through the batch deleter, then the goal.
    ///
    /// # Contract
    /// - The goal record is removed regardless of the task pass outcome.
    /// - Task rows that survived retries are listed in the report.
    pub fn delete_goal(&self, user_id: &str, goal_id: &str) -> StoreResult<GoalDeletion> {
        let user_id = require_id("userId", user_id)?;
        let goal_id = require_id("goalId", goal_id)?;

        let keys: Vec<ItemKey> = self
            .backend
            .query_prefix(&user_partition(user_id), &tasks_prefix(goal_id))?
            .into_iter()
            .map(|stored| stored.key)
            .collect();

        let report = BatchDeleter::new(&self.backend, &self.sleeper, self.config.delete_retry)
            .with_chunk_size(self.config.batch_delete_limit)
            .delete_all(&keys)?;

        self.backend.delete_item(&goal_key(user_id, goal_id))?;

        if report.is_complete() {
            info!(
                "event=goal_delete module=store status=ok goal_id={goal_id} tasks_deleted={}",
                report.deleted
            );
        } else {
            warn!(
                "event=goal_delete module=store status=partial goal_id={goal_id} tasks_deleted={} orphaned={}",
                report.deleted,
                report.undeleted.len()
            );
        }

        Ok(GoalDeletion {
            goal_id: goal_id.to_string(),
            tasks: report,
        })
    }

    /// Re-spaces a goal's tasks to `stride, 2*stride, ...` in current order.
    ///
    /// Writes are per task and non-atomic; re-running after a partial failure
    /// converges. Tasks already at their target value are not rewritten.
    pub fn reindex_tasks(&self, user_id: &str, goal_id: &str) -> StoreResult<ReindexReport> {
        let user_id = require_id("userId", user_id)?;
        let goal_id = require_id("goalId", goal_id)?;

        let tasks = self.load_tasks(user_id, goal_id)?;
        let mut report = ReindexReport {
            total: tasks.len(),
            ..ReindexReport::default()
        };

        for assignment in self.ordering.reindex(&tasks) {
            if !assignment.is_change() {
                continue;
            }
            match self.write_order(user_id, goal_id, &assignment.task_id, assignment.order) {
                Ok(()) => report.rewritten += 1,
                Err(StoreError::NotFound(_)) => report.vanished += 1,
                Err(err) => return Err(err),
            }
        }

        info!(
            "event=tasks_reindex module=store status=ok goal_id={goal_id} total={} rewritten={} vanished={}",
            report.total, report.rewritten, report.vanished
        );
        Ok(report)
    }

    fn load_tasks(&self, user_id: &str, goal_id: &str) -> StoreResult<Vec<Task>> {
        let found = self
            .backend
            .query_prefix(&user_partition(user_id), &tasks_prefix(goal_id))?;
        let mut tasks = found
            .iter()
            .map(|stored| {
                decode_task_item(&stored.key, &stored.item).map_err(|source| {
                    StoreError::InvalidData {
                        key: stored.key.clone(),
                        source,
                    }
                })
            })
            .collect::<StoreResult<Vec<Task>>>()?;
        sort_tasks(&mut tasks);
        Ok(tasks)
    }

    fn ensure_goal_exists(&self, user_id: &str, goal_id: &str) -> StoreResult<()> {
        let key = goal_key(user_id, goal_id);
        match self.backend.get_item(&key)? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(key)),
        }
    }

    fn insert_task(
        &self,
        user_id: &str,
        goal_id: &str,
        task_text: String,
        order: f64,
        deadline: Option<String>,
    ) -> StoreResult<Task> {
        let task = Task {
            goal_id: goal_id.to_string(),
            task_id: new_record_id(),
            task_text,
            completed: false,
            created_at: now_timestamp(),
            order,
            deadline,
            time_spent: 0,
        };
        self.put_record(user_id, Record::Task(task.clone()))?;
        debug!(
            "event=task_add module=store status=ok goal_id={goal_id} task_id={}",
            task.task_id
        );
        Ok(task)
    }

    fn put_record(&self, user_id: &str, record: Record) -> StoreResult<()> {
        self.backend.put_item(&record.key(user_id), &record.to_item())?;
        Ok(())
    }

    fn write_order(&self, user_id: &str, goal_id: &str, task_id: &str, order: f64) -> StoreResult<()> {
        let mut changes = Item::new();
        changes.insert(ATTR_ORDER.to_string(), AttrValue::N(encode_order(order)));
        self.update_existing_task(user_id, goal_id, task_id, &changes)
    }

    fn update_existing_task(
        &self,
        user_id: &str,
        goal_id: &str,
        task_id: &str,
        changes: &Item,
    ) -> StoreResult<()> {
        self.backend.update_item(
            &task_key(user_id, goal_id, task_id),
            changes,
            WriteCondition::ItemExists,
        )?;
        Ok(())
    }
}
