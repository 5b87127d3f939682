//! Reminder domain model.
//!
//! # Responsibility
//! - Define the persisted reminder record.
//! - Model the per-session geofencing decision as an explicit tri-state.
//!
//! # Invariants
//! - `id` is immutable and never reused for another reminder.
//! - Reminders written through the editor satisfy [`Reminder::validate`];
//!   the store itself accepts any record.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a reminder, also used as the geofence request id.
///
/// Generated ids are UUID v4 strings, but any caller-provided string is
/// accepted so imported reminders keep their identity.
pub type ReminderId = String;

/// Location-triggered reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub title: String,
    pub description: Option<String>,
    /// Human-readable label of the selected place.
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Reminder {
    /// Creates a reminder with a freshly generated id.
    pub fn new(
        title: impl Into<String>,
        description: Option<String>,
        location: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self::with_id(
            Uuid::new_v4().to_string(),
            title,
            description,
            location,
            latitude,
            longitude,
        )
    }

    /// Creates a reminder with a caller-provided id.
    pub fn with_id(
        id: impl Into<ReminderId>,
        title: impl Into<String>,
        description: Option<String>,
        location: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description,
            location: location.into(),
            latitude,
            longitude,
        }
    }

    /// Checks required fields in user-facing order: title first, then location.
    pub fn validate(&self) -> Result<(), ReminderValidationError> {
        if self.title.is_empty() {
            return Err(ReminderValidationError::MissingTitle);
        }
        if self.location.is_empty() {
            return Err(ReminderValidationError::MissingLocation);
        }
        Ok(())
    }
}

/// Required-field violation reported to the editing screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderValidationError {
    MissingTitle,
    MissingLocation,
}

impl Display for ReminderValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTitle => write!(f, "Please enter title"),
            Self::MissingLocation => write!(f, "Please select location"),
        }
    }
}

impl Error for ReminderValidationError {}

/// Whether the current editing session registers a geofence.
///
/// `Undecided` is the state before the user has answered any permission or
/// settings prompt and behaves like `Enabled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeofencingChoice {
    #[default]
    Undecided,
    Enabled,
    /// The user declined location sharing; saves bypass geofencing.
    Disabled,
}

impl GeofencingChoice {
    pub fn is_disabled(self) -> bool {
        matches!(self, Self::Disabled)
    }

    /// Maps the host's nullable flag onto the tri-state.
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            None => Self::Undecided,
            Some(true) => Self::Enabled,
            Some(false) => Self::Disabled,
        }
    }
}
