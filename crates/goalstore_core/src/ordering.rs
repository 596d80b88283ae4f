//! Fractional ordering of a goal's tasks.
//!
//! # Responsibility
//! - Assign initial, evenly spaced order values to a new task list.
//! - Compute positions between neighbours without touching other rows.
//! - Recompute even spacing on explicit request (reindex).
//!
//! # Invariants
//! - Fresh lists and reindexed lists use `(position + 1) * stride`.
//! - Listing order is total and deterministic: `order`, then `created_at`,
//!   then `task_id`.
//! - Nothing here renumbers implicitly; callers decide when to reindex.

use crate::model::record::Task;
use std::cmp::Ordering;

/// Default spacing between neighbouring order values.
pub const ORDER_STRIDE: f64 = 1000.0;

/// Smallest gap between neighbours still considered usable for a midpoint.
pub const MIN_ORDER_GAP: f64 = 1e-4;

/// New order value for one task produced by a reindex.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAssignment {
    pub task_id: String,
    pub previous: f64,
    pub order: f64,
}

impl OrderAssignment {
    /// Whether applying this assignment changes the stored value.
    pub fn is_change(&self) -> bool {
        self.previous.to_bits() != self.order.to_bits()
    }
}

/// Ordering rules parameterised by stride.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderingEngine {
    stride: f64,
}

impl Default for OrderingEngine {
    fn default() -> Self {
        Self::new(ORDER_STRIDE)
    }
}

impl OrderingEngine {
    /// Creates an engine; non-positive or non-finite strides fall back to
    /// `ORDER_STRIDE`.
    pub fn new(stride: f64) -> Self {
        let stride = if stride.is_finite() && stride > 0.0 {
            stride
        } else {
            ORDER_STRIDE
        };
        Self { stride }
    }

    pub fn stride(&self) -> f64 {
        self.stride
    }

    fn slot(&self, position: usize) -> f64 {
        (position as f64 + 1.0) * self.stride
    }

    /// `n` strictly increasing values starting at one stride.
    pub fn assign_initial_orders(&self, n: usize) -> Vec<f64> {
        (0..n).map(|position| self.slot(position)).collect()
    }

    /// Even re-spacing of `tasks` in their current sorted order.
    ///
    /// Input order does not matter; the tasks are sorted with
    /// [`compare_tasks`] first. Feeding the result back in yields the same
    /// values, so a second run reports no changes.
    pub fn reindex(&self, tasks: &[Task]) -> Vec<OrderAssignment> {
        let mut sorted: Vec<&Task> = tasks.iter().collect();
        sorted.sort_by(|a, b| compare_tasks(a, b));
        sorted
            .into_iter()
            .enumerate()
            .map(|(position, task)| OrderAssignment {
                task_id: task.task_id.clone(),
                previous: task.order,
                order: self.slot(position),
            })
            .collect()
    }

    /// Order value placing an item between optional neighbours.
    ///
    /// - both: midpoint
    /// - only `before`: one stride after it
    /// - only `after`: half of it
    /// - neither: one stride
    pub fn order_between(&self, before: Option<f64>, after: Option<f64>) -> f64 {
        match (before, after) {
            (Some(before), Some(after)) => before + (after - before) / 2.0,
            (Some(before), None) => before + self.stride,
            (None, Some(after)) => after / 2.0,
            (None, None) => self.stride,
        }
    }

    /// Whether the neighbours are too close for `order_between` to produce a
    /// distinct, usable value. Callers should reindex when this is true.
    pub fn gap_exhausted(&self, before: Option<f64>, after: Option<f64>) -> bool {
        let candidate = self.order_between(before, after);
        let above_before = before.map_or(true, |before| candidate > before);
        let below_after = after.map_or(true, |after| candidate < after);
        if !(above_before && below_after) {
            return true;
        }
        let lower = before.unwrap_or(0.0);
        match after {
            Some(after) => after - lower < MIN_ORDER_GAP,
            None => false,
        }
    }

    /// Order value appending after the current last task.
    pub fn next_order(&self, tasks: &[Task]) -> f64 {
        let last = tasks
            .iter()
            .map(|task| task.order)
            .max_by(|a, b| a.total_cmp(b));
        self.order_between(last, None)
    }
}

/// Total listing order: `order`, then `created_at`, then `task_id`.
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    a.order
        .total_cmp(&b.order)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.task_id.cmp(&b.task_id))
}

/// Stable in-place sort by [`compare_tasks`].
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(compare_tasks);
}
