use goalstore_core::db::open_db_in_memory;
use goalstore_core::model::schema::{
    decode_task_item, goal_key, goals_prefix, parse_task_id, task_key, tasks_prefix,
    user_partition,
};
use goalstore_core::{
    AttrValue, Goal, Item, ItemKey, KvBackend, MemoryBackend, Record, RecordKind, SchemaError,
    SqliteBackend, Task,
};

fn sample_task() -> Task {
    Task {
        goal_id: "g1".to_string(),
        task_id: "t1".to_string(),
        task_text: "Draft the project outline".to_string(),
        completed: false,
        created_at: "2026-10-15T08:00:00.000000Z".to_string(),
        order: 1500.5,
        deadline: Some("2026-11-01".to_string()),
        time_spent: 90,
    }
}

#[test]
fn keys_follow_single_table_layout() {
    assert_eq!(user_partition("u1"), "USER#u1");
    assert_eq!(goal_key("u1", "g1"), ItemKey::new("USER#u1", "GOAL#g1"));
    assert_eq!(
        task_key("u1", "g1", "t1"),
        ItemKey::new("USER#u1", "TASK#g1#t1")
    );
    assert_eq!(goals_prefix(), "GOAL#");
    assert_eq!(tasks_prefix("g1"), "TASK#g1#");
    assert_eq!(parse_task_id("TASK#g1#t1"), Some("t1"));
    assert_eq!(parse_task_id("TASK#g1#"), None);
}

#[test]
fn task_record_survives_item_encoding() {
    let record = Record::Task(sample_task());
    let key = record.key("u1");
    let item = record.to_item();

    assert_eq!(item.get("type"), Some(&AttrValue::S("task".to_string())));
    assert_eq!(item.get("order"), Some(&AttrValue::N("1500.5".to_string())));
    assert_eq!(item.get("completed"), Some(&AttrValue::Bool(false)));
    assert_eq!(Record::from_item(&key, &item).unwrap(), record);
}

#[test]
fn goal_record_decodes_by_type_tag() {
    let goal = Goal {
        goal_id: "g1".to_string(),
        goal_text: "Run a marathon".to_string(),
        created_at: "2026-10-15T08:00:00.000000Z".to_string(),
    };
    let record = Record::Goal(goal);
    let decoded = Record::from_item(&record.key("u1"), &record.to_item()).unwrap();
    assert_eq!(decoded.kind(), RecordKind::Goal);
    assert_eq!(decoded, record);
}

#[test]
fn empty_deadline_decodes_as_none() {
    let mut task = sample_task();
    task.deadline = None;
    let record = Record::Task(task);
    let item = record.to_item();
    assert_eq!(item.get("deadline"), Some(&AttrValue::S(String::new())));

    let decoded = decode_task_item(&record.key("u1"), &item).unwrap();
    assert_eq!(decoded.deadline, None);
}

#[test]
fn malformed_items_are_schema_errors() {
    let key = task_key("u1", "g1", "t1");
    let mut item = Record::Task(sample_task()).to_item();

    item.insert("type".to_string(), AttrValue::S("note".to_string()));
    assert_eq!(
        Record::from_item(&key, &item).unwrap_err(),
        SchemaError::UnknownRecordType("note".to_string())
    );

    item.insert("type".to_string(), AttrValue::S("task".to_string()));
    item.insert("order".to_string(), AttrValue::N("NaN".to_string()));
    assert!(matches!(
        Record::from_item(&key, &item).unwrap_err(),
        SchemaError::InvalidNumber { name: "order", .. }
    ));

    item.insert("order".to_string(), AttrValue::S("1000".to_string()));
    assert!(matches!(
        Record::from_item(&key, &item).unwrap_err(),
        SchemaError::UnexpectedAttributeType { name: "order", .. }
    ));

    item.remove("order");
    assert_eq!(
        Record::from_item(&key, &item).unwrap_err(),
        SchemaError::MissingAttribute("order")
    );
}

#[test]
fn attribute_values_use_typed_wire_form() {
    let mut item = Item::new();
    item.insert("completed".to_string(), AttrValue::Bool(true));
    item.insert("order".to_string(), AttrValue::N("1000".to_string()));
    item.insert("taskText".to_string(), AttrValue::S("Call mom".to_string()));

    let json = serde_json::to_string(&item).unwrap();
    assert_eq!(
        json,
        r#"{"completed":{"BOOL":true},"order":{"N":"1000"},"taskText":{"S":"Call mom"}}"#
    );
    let back: Item = serde_json::from_str(&json).unwrap();
    assert_eq!(back, item);
}

fn assert_prefix_isolation(backend: &dyn KvBackend) {
    let item = Item::new();
    for key in [
        task_key("u1", "g1", "a"),
        task_key("u1", "g10", "b"),
        task_key("u2", "g1", "c"),
        goal_key("u1", "g1"),
    ] {
        backend.put_item(&key, &item).unwrap();
    }

    let found = backend
        .query_prefix(&user_partition("u1"), &tasks_prefix("g1"))
        .unwrap();
    let sorts: Vec<&str> = found.iter().map(|stored| stored.key.sort.as_str()).collect();
    assert_eq!(sorts, vec!["TASK#g1#a"]);

    let goals = backend
        .query_prefix(&user_partition("u1"), goals_prefix())
        .unwrap();
    assert_eq!(goals.len(), 1);
}

#[test]
fn prefix_scans_isolate_users_and_similar_goal_ids() {
    assert_prefix_isolation(&MemoryBackend::new());

    let conn = open_db_in_memory().unwrap();
    assert_prefix_isolation(&SqliteBackend::try_new(&conn).unwrap());
}
