mod common;

use common::{ProbeBackend, RecordingSleeper, ScriptedGenerator};
use goalstore_core::{
    GenerationError, GenerationErrorKind, GoalPlanner, PlanError, StoreConfig, TaskStore,
    ValidationError,
};
use std::time::Duration;

const GENERATED: &str = "1. Buy running shoes\n2. Register for the race\n3. Run three times a week";

fn store() -> TaskStore<ProbeBackend, RecordingSleeper> {
    TaskStore::with_sleeper(
        ProbeBackend::new(),
        StoreConfig::default(),
        RecordingSleeper::default(),
    )
}

#[test]
fn two_transient_failures_then_success_creates_goal() {
    let generator = ScriptedGenerator::new([
        Err(GenerationError::from_status(503, "overloaded")),
        Err(GenerationError::network("connection reset")),
        Ok(GENERATED.to_string()),
    ]);
    let sleeper = RecordingSleeper::default();
    let planner = GoalPlanner::with_sleeper(&generator, &sleeper);
    let store = store();

    let created = planner
        .plan_goal(&store, "user-1", "Run a 10k in spring")
        .unwrap();

    assert_eq!(created.tasks.len(), 3);
    assert_eq!(generator.calls.get(), 3);
    assert_eq!(
        sleeper.recorded(),
        vec![Duration::from_secs(2), Duration::from_secs(2)]
    );
    assert_eq!(store.list_goals("user-1").unwrap().len(), 1);
}

#[test]
fn three_failures_surface_generation_error_and_write_nothing() {
    let generator = ScriptedGenerator::new([
        Err(GenerationError::from_status(429, "slow down")),
        Err(GenerationError::from_status(500, "oops")),
        Err(GenerationError::from_status(502, "bad gateway")),
    ]);
    let sleeper = RecordingSleeper::default();
    let planner = GoalPlanner::with_sleeper(&generator, &sleeper);
    let store = store();

    let err = planner
        .plan_goal(&store, "user-1", "Run a 10k in spring")
        .unwrap_err();

    assert!(matches!(err, PlanError::Generation(ref last) if last.status == Some(502)));
    assert_eq!(generator.calls.get(), 3);
    assert_eq!(sleeper.recorded().len(), 2);
    assert_eq!(store.backend().writes(), 0);
}

#[test]
fn permanent_failure_is_not_retried() {
    let generator = ScriptedGenerator::new([Err(GenerationError::from_status(401, "bad key"))]);
    let sleeper = RecordingSleeper::default();
    let planner = GoalPlanner::with_sleeper(&generator, &sleeper);
    let store = store();

    let err = planner.plan_goal(&store, "user-1", "Learn Rust").unwrap_err();

    assert!(matches!(
        err,
        PlanError::Generation(ref cause) if cause.kind == GenerationErrorKind::Client
    ));
    assert_eq!(generator.calls.get(), 1);
    assert!(sleeper.recorded().is_empty());
}

#[test]
fn blank_goal_never_reaches_generator() {
    let generator = ScriptedGenerator::new([Ok(GENERATED.to_string())]);
    let sleeper = RecordingSleeper::default();
    let planner = GoalPlanner::with_sleeper(&generator, &sleeper);

    let err = planner.plan_goal(&store(), "user-1", " \n ").unwrap_err();

    assert!(matches!(
        err,
        PlanError::Validation(ValidationError::Missing("goalText"))
    ));
    assert_eq!(generator.calls.get(), 0);
}
