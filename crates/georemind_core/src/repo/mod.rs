//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the record-store contract for reminders.
//! - Isolate SQLite query details from the data source and editor.
//!
//! # Invariants
//! - Repositories do not validate reminder fields; the editor does.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod reminder_repo;
