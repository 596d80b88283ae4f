//! Connection handling for the SQLite item store.
//!
//! Every connection handed out by [`open_db`] or [`open_db_in_memory`]
//! has foreign keys and a busy timeout configured and is migrated to
//! [`migrations::latest_version`] before it is returned.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// The database could not be opened at all.
    Open {
        mode: &'static str,
        source: rusqlite::Error,
    },
    /// A numbered migration failed; nothing from the run was committed.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    Sqlite(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { mode, source } => write!(f, "cannot open {mode} item store: {source}"),
            Self::Migration { version, source } => {
                write!(f, "item store migration {version} failed: {source}")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "item store schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. } | Self::Migration { source, .. } | Self::Sqlite(source) => {
                Some(source)
            }
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
