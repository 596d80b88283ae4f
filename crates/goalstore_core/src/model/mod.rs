//! Goal/task domain model and its storage schema.
//!
//! # Responsibility
//! - Define the records stored in a user partition.
//! - Own the mapping between records and backend keys/attributes.
//!
//! # Invariants
//! - All of one user's records live in a single partition.
//! - Records are told apart by a type tag, handled exhaustively on decode.

pub mod record;
pub mod schema;
