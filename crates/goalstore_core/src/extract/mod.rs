//! Extraction of task lists from generated text.
//!
//! # Responsibility
//! - Turn free-form generator output into clean, distinct task strings.
//!
//! # Invariants
//! - Extraction never fails; malformed input only yields fewer tasks.

pub mod bullets;
