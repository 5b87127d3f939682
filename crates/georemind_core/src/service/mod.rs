//! Core use-case services.
//!
//! # Responsibility
//! - Wrap the record store behind the `Outcome` envelope.
//! - Hold in-progress editing state and trigger validated saves.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod outcome;
pub mod reminder_editor;
pub mod reminder_source;
