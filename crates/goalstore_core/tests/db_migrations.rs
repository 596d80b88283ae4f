use goalstore_core::db::migrations::latest_version;
use goalstore_core::db::{open_db, open_db_in_memory, DbError};
use goalstore_core::model::schema::task_key;
use goalstore_core::{AttrValue, BackendError, Item, KvBackend, SqliteBackend};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert!(has_table(&conn, "items"));
}

#[test]
fn items_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("goalstore.db");
    let key = task_key("u1", "g1", "t1");
    let mut item = Item::new();
    item.insert("taskText".to_string(), AttrValue::S("Water the plants".to_string()));

    let conn_first = open_db(&path).unwrap();
    SqliteBackend::try_new(&conn_first)
        .unwrap()
        .put_item(&key, &item)
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let loaded = SqliteBackend::try_new(&conn_second)
        .unwrap()
        .get_item(&key)
        .unwrap();
    assert_eq!(loaded, Some(item));
}

#[test]
fn future_schema_version_is_rejected_without_touching_items() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    Connection::open(&path)
        .unwrap()
        .pragma_update(None, "user_version", 999u32)
        .unwrap();

    let err = open_db(&path).unwrap_err();

    assert!(matches!(
        err,
        DbError::UnsupportedSchemaVersion { db_version: 999, latest_supported }
            if latest_supported == latest_version()
    ));
    assert!(err.to_string().contains("999"));
    let raw = Connection::open(&path).unwrap();
    assert!(!has_table(&raw, "items"));
}

#[test]
fn backend_refuses_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    assert!(matches!(
        SqliteBackend::try_new(&conn),
        Err(BackendError::Unavailable(_))
    ));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap()
}

fn has_table(conn: &Connection, name: &str) -> bool {
    conn.prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")
        .unwrap()
        .exists([name])
        .unwrap()
}
