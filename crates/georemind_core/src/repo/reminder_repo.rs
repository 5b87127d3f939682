//! Reminder record store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert-or-replace, lookup, listing and delete APIs over the
//!   `reminders` table.
//! - Reject connections that were not bootstrapped by `db::open_db*`.
//!
//! # Invariants
//! - Listing order is insertion order (`entry_seq ASC`).
//! - Replacing a reminder by id moves it to the end of the insertion order.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::reminder::{Reminder, ReminderId};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const REMINDERS_TABLE: &str = "reminders";
const REQUIRED_COLUMNS: &[&str] = &[
    "entry_seq",
    "id",
    "title",
    "description",
    "location",
    "latitude",
    "longitude",
    "saved_at",
];

const REMINDER_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    location,
    latitude,
    longitude
FROM reminders";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for reminder persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(ReminderId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// The shared connection could not be reached (poisoned lock, failed
    /// background worker).
    Unavailable(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "reminder not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted reminder data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it with db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
            Self::Unavailable(details) => write!(f, "reminder storage unavailable: {details}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record-store interface for reminders.
pub trait ReminderRepository {
    /// Inserts the reminder, replacing any stored record with the same id.
    fn save_reminder(&self, reminder: &Reminder) -> RepoResult<()>;
    fn get_reminder(&self, id: &str) -> RepoResult<Option<Reminder>>;
    /// Returns every reminder in insertion order.
    fn list_reminders(&self) -> RepoResult<Vec<Reminder>>;
    fn count_reminders(&self) -> RepoResult<u64>;
    fn delete_reminder(&self, id: &str) -> RepoResult<()>;
    /// Removes every reminder and returns how many rows were deleted.
    fn delete_all_reminders(&self) -> RepoResult<usize>;
}

/// SQLite-backed reminder repository.
pub struct SqliteReminderRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReminderRepository<'conn> {
    /// Wraps a connection without schema checks.
    ///
    /// Callers must pass a connection returned by `db::open_db*`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Wraps a connection after verifying schema version, table and columns.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema(conn)?;
        Ok(Self { conn })
    }
}

impl ReminderRepository for SqliteReminderRepository<'_> {
    fn save_reminder(&self, reminder: &Reminder) -> RepoResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO reminders (
                id,
                title,
                description,
                location,
                latitude,
                longitude
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                reminder.id.as_str(),
                reminder.title.as_str(),
                reminder.description.as_deref(),
                reminder.location.as_str(),
                reminder.latitude,
                reminder.longitude,
            ],
        )?;
        debug!("event=reminder_save module=repo status=ok id={}", reminder.id);
        Ok(())
    }

    fn get_reminder(&self, id: &str) -> RepoResult<Option<Reminder>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{REMINDER_SELECT_SQL} WHERE id = ?1;"))?;
        let reminder = stmt.query_row([id], parse_reminder_row).optional()?;
        Ok(reminder)
    }

    fn list_reminders(&self) -> RepoResult<Vec<Reminder>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{REMINDER_SELECT_SQL} ORDER BY entry_seq ASC;"))?;
        let rows = stmt.query_map([], parse_reminder_row)?;

        let mut reminders = Vec::new();
        for row in rows {
            reminders.push(row?);
        }
        Ok(reminders)
    }

    fn count_reminders(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM reminders;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative reminder count `{count}`")))
    }

    fn delete_reminder(&self, id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM reminders WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn delete_all_reminders(&self) -> RepoResult<usize> {
        let removed = self.conn.execute("DELETE FROM reminders;", [])?;
        debug!("event=reminder_delete_all module=repo status=ok removed={removed}");
        Ok(removed)
    }
}

fn parse_reminder_row(row: &Row<'_>) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        location: row.get("location")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
    })
}

fn ensure_schema(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
        );",
        [REMINDERS_TABLE],
        |row| row.get(0),
    )?;
    if !table_exists {
        return Err(RepoError::MissingRequiredTable(REMINDERS_TABLE));
    }

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({REMINDERS_TABLE});"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    if let Some(column) = REQUIRED_COLUMNS
        .iter()
        .copied()
        .find(|required| !columns.iter().any(|name| name == required))
    {
        return Err(RepoError::MissingRequiredColumn {
            table: REMINDERS_TABLE,
            column,
        });
    }

    Ok(())
}
