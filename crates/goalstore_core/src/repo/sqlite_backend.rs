//! SQLite-backed key-value backend.
//!
//! # Responsibility
//! - Persist items in the single `items` table created by migration 1.
//! - Keep SQL details and attribute JSON encoding inside this module.
//!
//! # Invariants
//! - Connections must be migrated to the latest schema before use.
//! - Prefix queries compare sort keys by character prefix, never `LIKE`, so
//!   `%` and `_` inside identifiers are literal.
//! - Read-modify-write updates and batch deletes run inside one immediate
//!   transaction.

use crate::db::migrations::latest_version;
use crate::repo::kv_backend::{
    ensure_batch_size, BackendError, BackendResult, Item, ItemKey, KvBackend, StoredItem,
    WriteCondition, BATCH_WRITE_LIMIT,
};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

/// File (or in-memory) SQLite implementation of the item store.
pub struct SqliteBackend<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBackend<'conn> {
    /// Wraps a migrated connection.
    ///
    /// Fails with `BackendError::Unavailable` when the connection schema does
    /// not match the latest migration.
    pub fn try_new(conn: &'conn Connection) -> BackendResult<Self> {
        let expected = latest_version();
        let actual: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if actual != expected {
            return Err(BackendError::Unavailable(format!(
                "item store requires schema version {expected}, got {actual}"
            )));
        }
        Ok(Self { conn })
    }
}

impl KvBackend for SqliteBackend<'_> {
    fn put_item(&self, key: &ItemKey, item: &Item) -> BackendResult<()> {
        let attrs = serde_json::to_string(item)?;
        self.conn.execute(
            "INSERT INTO items (pk, sk, attrs) VALUES (?1, ?2, ?3)
             ON CONFLICT(pk, sk) DO UPDATE SET attrs = excluded.attrs;",
            params![key.partition, key.sort, attrs],
        )?;
        Ok(())
    }

    fn get_item(&self, key: &ItemKey) -> BackendResult<Option<Item>> {
        load_attrs(self.conn, key)
    }

    fn update_item(
        &self,
        key: &ItemKey,
        changes: &Item,
        condition: WriteCondition,
    ) -> BackendResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut item = match load_attrs(&tx, key)? {
            Some(item) => item,
            None if condition == WriteCondition::ItemExists => {
                return Err(BackendError::ConditionFailed(key.clone()));
            }
            None => Item::new(),
        };
        for (name, value) in changes {
            item.insert(name.clone(), value.clone());
        }
        let attrs = serde_json::to_string(&item)?;
        tx.execute(
            "INSERT INTO items (pk, sk, attrs) VALUES (?1, ?2, ?3)
             ON CONFLICT(pk, sk) DO UPDATE SET attrs = excluded.attrs;",
            params![key.partition, key.sort, attrs],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete_item(&self, key: &ItemKey) -> BackendResult<()> {
        self.conn.execute(
            "DELETE FROM items WHERE pk = ?1 AND sk = ?2;",
            params![key.partition, key.sort],
        )?;
        Ok(())
    }

    fn query_prefix(&self, partition: &str, sort_prefix: &str) -> BackendResult<Vec<StoredItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT sk, attrs
             FROM items
             WHERE pk = ?1
               AND substr(sk, 1, length(?2)) = ?2
             ORDER BY sk ASC;",
        )?;
        let mut rows = stmt.query(params![partition, sort_prefix])?;
        let mut found = Vec::new();
        while let Some(row) = rows.next()? {
            let sort: String = row.get(0)?;
            let attrs: String = row.get(1)?;
            found.push(StoredItem {
                key: ItemKey::new(partition, sort),
                item: serde_json::from_str(&attrs)?,
            });
        }
        Ok(found)
    }

    fn batch_delete(&self, keys: &[ItemKey]) -> BackendResult<Vec<ItemKey>> {
        ensure_batch_size(keys, BATCH_WRITE_LIMIT)?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for key in keys {
            tx.execute(
                "DELETE FROM items WHERE pk = ?1 AND sk = ?2;",
                params![key.partition, key.sort],
            )?;
        }
        tx.commit()?;
        Ok(Vec::new())
    }
}

fn load_attrs(conn: &Connection, key: &ItemKey) -> BackendResult<Option<Item>> {
    let attrs: Option<String> = conn
        .query_row(
            "SELECT attrs FROM items WHERE pk = ?1 AND sk = ?2;",
            params![key.partition, key.sort],
            |row| row.get(0),
        )
        .optional()?;
    attrs
        .map(|text| serde_json::from_str(&text).map_err(BackendError::from))
        .transpose()
}
