//! Domain model for location reminders.
//!
//! # Responsibility
//! - Define the reminder record shared by store, editor and save flow.
//! - Own the required-field policy applied before a save.
//!
//! # Invariants
//! - Every reminder is identified by a stable, client-generated `ReminderId`.

pub mod reminder;
