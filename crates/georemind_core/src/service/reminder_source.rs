//! Reminder data source over the shared SQLite connection.
//!
//! # Responsibility
//! - Expose async reminder operations returning [`Outcome`].
//! - Run every storage call on a blocking worker so callers never block
//!   their event loop.
//! - Convert repository errors to envelope messages at this boundary.
//!
//! # Invariants
//! - All calls go through the one shared connection; no cache sits in front
//!   of it, so reads observe the latest committed write.
//! - A save resolves only after the row is committed.

use crate::db::SharedConnection;
use crate::model::reminder::Reminder;
use crate::repo::reminder_repo::{
    ReminderRepository, RepoError, RepoResult, SqliteReminderRepository,
};
use crate::service::outcome::Outcome;
use async_trait::async_trait;
use log::{error, info};
use std::sync::Arc;
use tokio::task;

pub const FETCH_REMINDERS_FAILED: &str = "Could not fetch reminders from local storage.";
pub const REMINDER_NOT_FOUND: &str = "Reminder not found!";
pub const SAVE_REMINDER_FAILED: &str = "Could not save reminder to local storage.";
pub const DELETE_REMINDERS_FAILED: &str = "Could not delete reminders from local storage.";

/// Reminder operations used by the editor, the save flow and FFI callers.
#[async_trait]
pub trait ReminderDataSource: Send + Sync {
    /// All reminders in insertion order; an empty store is a success.
    async fn get_reminders(&self) -> Outcome<Vec<Reminder>>;
    async fn get_reminder(&self, id: &str) -> Outcome<Reminder>;
    /// Insert-or-replace by id.
    async fn save_reminder(&self, reminder: &Reminder) -> Outcome<()>;
    async fn delete_reminder(&self, id: &str) -> Outcome<()>;
    async fn delete_all_reminders(&self) -> Outcome<()>;
}

/// Local data source backed by [`SqliteReminderRepository`].
#[derive(Clone)]
pub struct LocalReminderSource {
    conn: SharedConnection,
}

impl LocalReminderSource {
    /// Wraps the shared connection after checking its schema once.
    pub fn try_new(conn: SharedConnection) -> RepoResult<Self> {
        {
            let guard = conn.lock().map_err(|_| lock_poisoned())?;
            SqliteReminderRepository::try_new(&guard)?;
        }
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &SharedConnection {
        &self.conn
    }

    async fn run<T, F>(&self, op: F) -> RepoResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteReminderRepository<'_>) -> RepoResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let joined = task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| lock_poisoned())?;
            let repo = SqliteReminderRepository::new(&guard);
            op(&repo)
        })
        .await;

        match joined {
            Ok(result) => result,
            Err(err) => Err(RepoError::Unavailable(format!(
                "storage worker failed: {err}"
            ))),
        }
    }
}

#[async_trait]
impl ReminderDataSource for LocalReminderSource {
    async fn get_reminders(&self) -> Outcome<Vec<Reminder>> {
        match self.run(|repo| repo.list_reminders()).await {
            Ok(reminders) => {
                info!(
                    "event=reminders_fetch module=source status=ok count={}",
                    reminders.len()
                );
                Outcome::Success(reminders)
            }
            Err(err) => {
                error!("event=reminders_fetch module=source status=error error={err}");
                Outcome::error(FETCH_REMINDERS_FAILED)
            }
        }
    }

    async fn get_reminder(&self, id: &str) -> Outcome<Reminder> {
        let lookup_id = id.to_string();
        match self.run(move |repo| repo.get_reminder(&lookup_id)).await {
            Ok(Some(reminder)) => Outcome::Success(reminder),
            Ok(None) => {
                info!("event=reminder_fetch module=source status=not_found id={id}");
                Outcome::error(REMINDER_NOT_FOUND)
            }
            Err(err) => {
                error!("event=reminder_fetch module=source status=error id={id} error={err}");
                Outcome::error(err.to_string())
            }
        }
    }

    async fn save_reminder(&self, reminder: &Reminder) -> Outcome<()> {
        let record = reminder.clone();
        match self.run(move |repo| repo.save_reminder(&record)).await {
            Ok(()) => {
                info!(
                    "event=reminder_save module=source status=ok id={}",
                    reminder.id
                );
                Outcome::Success(())
            }
            Err(err) => {
                error!(
                    "event=reminder_save module=source status=error id={} error={err}",
                    reminder.id
                );
                Outcome::error(SAVE_REMINDER_FAILED)
            }
        }
    }

    async fn delete_reminder(&self, id: &str) -> Outcome<()> {
        let target_id = id.to_string();
        match self.run(move |repo| repo.delete_reminder(&target_id)).await {
            Ok(()) => {
                info!("event=reminder_delete module=source status=ok id={id}");
                Outcome::Success(())
            }
            Err(RepoError::NotFound(_)) => Outcome::error(REMINDER_NOT_FOUND),
            Err(err) => {
                error!("event=reminder_delete module=source status=error id={id} error={err}");
                Outcome::error(DELETE_REMINDERS_FAILED)
            }
        }
    }

    async fn delete_all_reminders(&self) -> Outcome<()> {
        match self.run(|repo| repo.delete_all_reminders()).await {
            Ok(removed) => {
                info!("event=reminders_delete_all module=source status=ok removed={removed}");
                Outcome::Success(())
            }
            Err(err) => {
                error!("event=reminders_delete_all module=source status=error error={err}");
                Outcome::error(DELETE_REMINDERS_FAILED)
            }
        }
    }
}

fn lock_poisoned() -> RepoError {
    RepoError::Unavailable("shared connection lock poisoned".to_string())
}
