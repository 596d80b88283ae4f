//! Resilient multi-item deletion over a bounded batch primitive.
//!
//! # Responsibility
//! - Split an arbitrary key set into backend-sized chunks.
//! - Resubmit only the keys a batch call reports as unprocessed, with
//!   backoff from the shared `RetryPolicy`.
//!
//! # Invariants
//! - `deleted <= requested`; every key is either counted deleted or listed
//!   as undeleted, never both.
//! - A chunk that exhausts its attempts does not stop later chunks.
//! - Partial deletion is a normal `DeletionReport`, not an error. Only hard
//!   backend failures propagate.
//! - Chunk state is local to one chunk; no counters are shared across chunks.

use crate::repo::kv_backend::{BackendResult, ItemKey, KvBackend};
use crate::retry::{RetryPolicy, Sleeper};
use log::{debug, warn};
use std::collections::HashSet;

/// Result of one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOutcome {
    pub submitted: usize,
    pub deleted: usize,
    pub attempts: u32,
    pub undeleted: Vec<ItemKey>,
}

/// Result of a full deletion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub requested: usize,
    pub deleted: usize,
    pub undeleted: Vec<ItemKey>,
    pub chunks: Vec<ChunkOutcome>,
}

impl DeletionReport {
    /// Whether every requested key was deleted.
    pub fn is_complete(&self) -> bool {
        self.undeleted.is_empty()
    }
}

enum ChunkState {
    Pending(Vec<ItemKey>),
    Submitted { attempt: u32, keys: Vec<ItemKey> },
    Retry { attempt: u32, remaining: Vec<ItemKey> },
    Done(ChunkOutcome),
}

/// Chunked batch deleter bound to one backend and sleeper.
pub struct BatchDeleter<'a, B: ?Sized, S: ?Sized> {
    backend: &'a B,
    sleeper: &'a S,
    policy: RetryPolicy,
    chunk_size: usize,
}

impl<'a, B, S> BatchDeleter<'a, B, S>
where
    B: KvBackend + ?Sized,
    S: Sleeper + ?Sized,
{
    /// Uses the backend's own batch limit as chunk size.
    pub fn new(backend: &'a B, sleeper: &'a S, policy: RetryPolicy) -> Self {
        Self {
            backend,
            sleeper,
            policy,
            chunk_size: backend.batch_limit().max(1),
        }
    }

    /// Caps the chunk size; it never exceeds the backend limit.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.clamp(1, self.backend.batch_limit().max(1));
        self
    }

    /// Deletes all `keys`, chunk by chunk.
    pub fn delete_all(&self, keys: &[ItemKey]) -> BackendResult<DeletionReport> {
        let mut report = DeletionReport {
            requested: keys.len(),
            ..DeletionReport::default()
        };

        for (index, chunk) in keys.chunks(self.chunk_size).enumerate() {
            let outcome = self.run_chunk(index, chunk.to_vec())?;
            report.deleted += outcome.deleted;
            report.undeleted.extend(outcome.undeleted.iter().cloned());
            report.chunks.push(outcome);
        }

        if !report.is_complete() {
            warn!(
                "event=batch_delete module=repo status=partial requested={} deleted={} undeleted={}",
                report.requested,
                report.deleted,
                report.undeleted.len()
            );
        }
        Ok(report)
    }

    fn run_chunk(&self, index: usize, keys: Vec<ItemKey>) -> BackendResult<ChunkOutcome> {
        let submitted = keys.len();
        let mut deleted = 0;
        let mut state = ChunkState::Pending(keys);

        loop {
            state = match state {
                ChunkState::Pending(keys) => ChunkState::Submitted { attempt: 1, keys },
                ChunkState::Submitted { attempt, keys } => {
                    let reported = self.backend.batch_delete(&keys)?;
                    let remaining = unprocessed_subset(&keys, reported);
                    deleted += keys.len() - remaining.len();
                    debug!(
                        "event=batch_delete_attempt module=repo chunk={index} attempt={attempt} sent={} unprocessed={}",
                        keys.len(),
                        remaining.len()
                    );

                    if remaining.is_empty() {
                        ChunkState::Done(ChunkOutcome {
                            submitted,
                            deleted,
                            attempts: attempt,
                            undeleted: Vec::new(),
                        })
                    } else if self.policy.allows_retry_after(attempt) {
                        ChunkState::Retry { attempt, remaining }
                    } else {
                        warn!(
                            "event=batch_delete_chunk module=repo status=exhausted chunk={index} attempts={attempt} undeleted={}",
                            remaining.len()
                        );
                        ChunkState::Done(ChunkOutcome {
                            submitted,
                            deleted,
                            attempts: attempt,
                            undeleted: remaining,
                        })
                    }
                }
                ChunkState::Retry { attempt, remaining } => {
                    self.sleeper.sleep(self.policy.delay_before_retry(attempt));
                    ChunkState::Submitted {
                        attempt: attempt + 1,
                        keys: remaining,
                    }
                }
                ChunkState::Done(outcome) => return Ok(outcome),
            };
        }
    }
}

/// Keeps only reported keys that were actually sent, so a misbehaving
/// backend cannot inflate or underflow the counts.
fn unprocessed_subset(sent: &[ItemKey], reported: Vec<ItemKey>) -> Vec<ItemKey> {
    if reported.is_empty() {
        return reported;
    }
    let reported: HashSet<ItemKey> = reported.into_iter().collect();
    sent.iter()
        .filter(|key| reported.contains(*key))
        .cloned()
        .collect()
}
