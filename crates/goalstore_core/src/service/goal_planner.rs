//! Goal creation from a natural-language goal.
//!
//! # Responsibility
//! - Ask the text generator for a task list, retrying transient failures.
//! - Persist the goal and extracted tasks through the task store.
//!
//! # Invariants
//! - Nothing is written unless generation succeeded.
//! - Blank goal text is rejected before the generator is called.

use crate::generate::{GenerationError, TaskGenerator};
use crate::model::record::{require_id, require_text, ValidationError};
use crate::repo::kv_backend::KvBackend;
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use crate::service::task_store::{CreatedGoal, StoreError, TaskStore};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum PlanError {
    Validation(ValidationError),
    /// Last generation error after retries.
    Generation(GenerationError),
    Store(StoreError),
}

impl Display for PlanError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Generation(err) => write!(f, "task generation failed: {err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PlanError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Generation(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<ValidationError> for PlanError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<GenerationError> for PlanError {
    fn from(value: GenerationError) -> Self {
        Self::Generation(value)
    }
}

impl From<StoreError> for PlanError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Validation(err) => Self::Validation(err),
            other => Self::Store(other),
        }
    }
}

/// Generator plus retry policy.
pub struct GoalPlanner<G, S = ThreadSleeper> {
    generator: G,
    sleeper: S,
    policy: RetryPolicy,
}

impl<G: TaskGenerator> GoalPlanner<G, ThreadSleeper> {
    pub fn new(generator: G) -> Self {
        Self::with_sleeper(generator, ThreadSleeper)
    }
}

impl<G: TaskGenerator, S: Sleeper> GoalPlanner<G, S> {
    /// Planner using the text-generation retry preset.
    pub fn with_sleeper(generator: G, sleeper: S) -> Self {
        Self {
            generator,
            sleeper,
            policy: RetryPolicy::text_generation(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Generates text for `goal_text` under the retry policy.
    ///
    /// Transient failures are retried; a permanent failure returns at once.
    pub fn generate_tasks_text(&self, goal_text: &str) -> Result<String, GenerationError> {
        self.policy.run_when(
            &self.sleeper,
            |attempt| {
                self.generator.generate(goal_text).map_err(|err| {
                    warn!(
                        "event=generate module=planner status=error attempt={attempt} kind={:?} transient={}",
                        err.kind,
                        err.is_transient()
                    );
                    err
                })
            },
            GenerationError::is_transient,
        )
    }

    /// Generates tasks for `goal_text` and stores the goal with them.
    pub fn plan_goal<B, T>(
        &self,
        store: &TaskStore<B, T>,
        user_id: &str,
        goal_text: &str,
    ) -> Result<CreatedGoal, PlanError>
    where
        B: KvBackend,
        T: Sleeper,
    {
        require_id("userId", user_id)?;
        let goal_text = require_text("goalText", goal_text)?;

        let generated = self.generate_tasks_text(&goal_text)?;
        let created = store.create_goal_with_tasks(user_id, &goal_text, &generated)?;
        info!(
            "event=goal_plan module=planner status=ok goal_id={} tasks={}",
            created.goal.goal_id,
            created.tasks.len()
        );
        Ok(created)
    }
}
