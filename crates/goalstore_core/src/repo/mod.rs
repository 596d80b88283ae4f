//! Key-value backend contract, implementations and bulk deletion.
//!
//! # Responsibility
//! - Define the store operations the task store depends on.
//! - Isolate SQLite and in-memory storage details from service orchestration.
//!
//! # Invariants
//! - Backends return semantic errors (`ConditionFailed`, `BatchTooLarge`) in
//!   addition to transport errors.

pub mod batch_delete;
pub mod kv_backend;
pub mod memory_backend;
pub mod sqlite_backend;
