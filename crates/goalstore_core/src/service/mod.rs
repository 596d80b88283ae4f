//! Use-case layer over the key-value backend.

pub mod contact;
pub mod goal_planner;
pub mod task_store;
