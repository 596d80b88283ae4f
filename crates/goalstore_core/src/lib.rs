//! Goal and task storage over a single-table key-value model.
//! Business rules for ordering, extraction and deletion live here; outer
//! surfaces only translate requests.

pub mod config;
pub mod db;
pub mod extract;
pub mod generate;
pub mod logging;
pub mod model;
pub mod ordering;
pub mod repo;
pub mod retry;
pub mod service;

pub use config::{ConfigError, ContactConfig, GeneratorConfig, StoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use extract::bullets::extract_tasks;
pub use generate::{
    decomposition_prompt, ChatCompletionsGenerator, GenerationError, GenerationErrorKind,
    TaskGenerator,
};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use model::record::{Goal, NewTask, Record, RecordKind, Task, TaskPatch, ValidationError};
pub use model::schema::SchemaError;
pub use ordering::{OrderingEngine, MIN_ORDER_GAP, ORDER_STRIDE};
pub use repo::batch_delete::{BatchDeleter, DeletionReport};
pub use repo::kv_backend::{
    AttrValue, BackendError, BackendResult, Item, ItemKey, KvBackend, StoredItem, WriteCondition,
    BATCH_WRITE_LIMIT,
};
pub use repo::memory_backend::MemoryBackend;
pub use repo::sqlite_backend::SqliteBackend;
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};
pub use service::contact::{ContactError, ContactForm, ContactService, MailError, MailSender};
pub use service::goal_planner::{GoalPlanner, PlanError};
pub use service::task_store::{
    CreatedGoal, GoalDeletion, Placement, ReindexReport, StoreError, StoreResult, TaskStore,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
