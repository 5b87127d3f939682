//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `georemind_core` linkage.
//! - List the reminders stored in a database for quick local checks.
//!
//! Usage: `georemind_cli [DB_PATH]`; without an argument the path comes from
//! `GEOREMIND_DB_PATH` or the temp-dir default.

use georemind_core::db::open_db;
use georemind_core::{
    init_logging_from_config, CoreConfig, ReminderRepository, SqliteReminderRepository,
};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("georemind_core ping={}", georemind_core::ping());
    println!("georemind_core version={}", georemind_core::core_version());

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    init_logging_from_config(&config).map_err(|err| err.to_string())?;

    let db_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.db_path.clone());
    let conn = open_db(&db_path).map_err(|err| err.to_string())?;
    let repo = SqliteReminderRepository::try_new(&conn).map_err(|err| err.to_string())?;

    let reminders = repo.list_reminders().map_err(|err| err.to_string())?;
    println!("db={} reminders={}", db_path.display(), reminders.len());
    for reminder in reminders {
        println!(
            "{}\t{}\t{} ({:.5}, {:.5})",
            reminder.id, reminder.title, reminder.location, reminder.latitude, reminder.longitude
        );
    }
    Ok(())
}
