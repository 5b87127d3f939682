//! Reminder editing state and validated save.
//!
//! # Responsibility
//! - Hold the user's in-progress reminder fields and geofencing choice.
//! - Validate a candidate and persist it through a [`ReminderDataSource`].
//! - Publish UI signals (loading, toast, snackbar, error, navigation).
//!
//! # Invariants
//! - A candidate failing validation never reaches the data source.
//! - `on_clear` returns every field to its unset state.
//! - Signals emitted after the UI dropped its receiver are discarded.

use crate::model::reminder::{GeofencingChoice, Reminder, ReminderId, ReminderValidationError};
use crate::service::outcome::Outcome;
use crate::service::reminder_source::ReminderDataSource;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Toast text shown after a successful save.
pub const REMINDER_SAVED: &str = "Reminder Saved !";

/// Signal for the editing screen.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    ShowLoading(bool),
    ShowToast(String),
    /// Field-specific validation message.
    ShowSnackbar(ReminderValidationError),
    ShowErrorMessage(String),
    NavigateBack,
}

/// In-progress field values; `None` means not entered yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReminderFields {
    /// Set when an existing reminder is being edited.
    pub reminder_id: Option<ReminderId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geofencing: GeofencingChoice,
}

/// Failure of [`ReminderEditor::validate_and_save_reminder`].
#[derive(Debug, Clone, PartialEq)]
pub enum SaveError {
    Validation(ReminderValidationError),
    Storage(String),
}

impl Display for SaveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Storage(message) => write!(f, "{message}"),
        }
    }
}

impl Error for SaveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(_) => None,
        }
    }
}

impl From<ReminderValidationError> for SaveError {
    fn from(value: ReminderValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Editing session for one reminder.
pub struct ReminderEditor<S> {
    source: S,
    fields: ReminderFields,
    events: UnboundedSender<UiEvent>,
}

impl<S: ReminderDataSource> ReminderEditor<S> {
    /// Creates an editor and the receiver the UI observes.
    pub fn new(source: S) -> (Self, UnboundedReceiver<UiEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let editor = Self {
            source,
            fields: ReminderFields::default(),
            events,
        };
        (editor, receiver)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn fields(&self) -> &ReminderFields {
        &self.fields
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.fields.title = Some(title.into());
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.fields.description = description;
    }

    /// Stores the place picked on the map.
    pub fn set_selected_location(&mut self, label: impl Into<String>, latitude: f64, longitude: f64) {
        self.fields.location = Some(label.into());
        self.fields.latitude = Some(latitude);
        self.fields.longitude = Some(longitude);
    }

    pub fn geofencing(&self) -> GeofencingChoice {
        self.fields.geofencing
    }

    pub fn set_geofencing(&mut self, choice: GeofencingChoice) {
        self.fields.geofencing = choice;
    }

    /// Prefills every field from a stored reminder so a save replaces it.
    pub fn load_reminder(&mut self, reminder: &Reminder) {
        self.fields.reminder_id = Some(reminder.id.clone());
        self.fields.title = Some(reminder.title.clone());
        self.fields.description = reminder.description.clone();
        self.fields.location = Some(reminder.location.clone());
        self.fields.latitude = Some(reminder.latitude);
        self.fields.longitude = Some(reminder.longitude);
    }

    /// Builds the reminder a save would write from the current fields.
    ///
    /// Unset text becomes empty so validation reports it; a fresh id is
    /// generated unless an existing reminder was loaded.
    pub fn to_candidate(&self) -> Reminder {
        let fields = &self.fields;
        let title = fields.title.clone().unwrap_or_default();
        let location = fields.location.clone().unwrap_or_default();
        let latitude = fields.latitude.unwrap_or_default();
        let longitude = fields.longitude.unwrap_or_default();
        match &fields.reminder_id {
            Some(id) => Reminder::with_id(
                id.clone(),
                title,
                fields.description.clone(),
                location,
                latitude,
                longitude,
            ),
            None => Reminder::new(
                title,
                fields.description.clone(),
                location,
                latitude,
                longitude,
            ),
        }
    }

    /// Publishes a UI signal; ignored once the screen is gone.
    pub fn emit(&self, event: UiEvent) {
        let _ = self.events.send(event);
    }

    /// Validates `candidate` and, when valid, saves it and navigates back.
    pub async fn validate_and_save_reminder(&self, candidate: &Reminder) -> Result<(), SaveError> {
        if let Err(err) = candidate.validate() {
            info!(
                "event=reminder_validate module=editor status=rejected id={} reason={:?}",
                candidate.id, err
            );
            self.emit(UiEvent::ShowSnackbar(err));
            return Err(err.into());
        }

        self.emit(UiEvent::ShowLoading(true));
        let outcome = self.source.save_reminder(candidate).await;
        self.emit(UiEvent::ShowLoading(false));

        match outcome {
            Outcome::Success(()) => {
                self.emit(UiEvent::ShowToast(REMINDER_SAVED.to_string()));
                self.emit(UiEvent::NavigateBack);
                Ok(())
            }
            Outcome::Error(message) => {
                warn!(
                    "event=reminder_save module=editor status=error id={}",
                    candidate.id
                );
                self.emit(UiEvent::ShowErrorMessage(message.clone()));
                Err(SaveError::Storage(message))
            }
        }
    }

    /// Ends the editing session so the next one starts clean.
    pub fn on_clear(&mut self) {
        self.fields = ReminderFields::default();
    }
}
