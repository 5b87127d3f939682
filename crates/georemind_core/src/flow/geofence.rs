//! Geofence request shape and registration error translation.

use crate::model::reminder::Reminder;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_GEOFENCE_RADIUS_METERS: f32 = 100.0;

/// Platform status code for "geofencing not available", reported when the
/// device's improved location accuracy mode is switched off.
pub const GEOFENCE_NOT_AVAILABLE: i32 = 1000;

pub const LOCATION_ACCURACY_REQUIRED: &str = "Location Reminder needs 'Improve Location Accuracy' enabled. Go to settings 'Security & Location > Location > Mode' to enable this.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeofenceTransition {
    Enter,
    Exit,
    Dwell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeofenceExpiration {
    Never,
    AfterMillis(u64),
}

/// Circular geofence submitted to the platform geofencing service.
#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceRequest {
    /// Reminder id; lets the transition receiver find the reminder again.
    pub request_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f32,
    pub transitions: Vec<GeofenceTransition>,
    pub expiration: GeofenceExpiration,
    /// Fire immediately when the device is already inside the fence.
    pub initial_trigger: Option<GeofenceTransition>,
}

impl GeofenceRequest {
    /// Entry-only, never-expiring fence centred on the reminder.
    pub fn for_reminder(reminder: &Reminder, radius_meters: f32) -> Self {
        Self {
            request_id: reminder.id.clone(),
            latitude: reminder.latitude,
            longitude: reminder.longitude,
            radius_meters,
            transitions: vec![GeofenceTransition::Enter],
            expiration: GeofenceExpiration::Never,
            initial_trigger: Some(GeofenceTransition::Enter),
        }
    }
}

/// Rejection reported by the platform geofencing service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeofenceError {
    pub code: Option<i32>,
    pub message: String,
}

impl GeofenceError {
    pub fn new(code: Option<i32>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_not_available(&self) -> bool {
        match self.code {
            Some(code) => code == GEOFENCE_NOT_AVAILABLE,
            // Some hosts relay only the status text, formatted "<code>: <detail>".
            None => self.message.trim_start().starts_with("1000:"),
        }
    }

    /// Message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        if self.is_not_available() {
            LOCATION_ACCURACY_REQUIRED.to_string()
        } else {
            format!("Error adding geofence: {}", self.message)
        }
    }
}

impl Display for GeofenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "geofence rejected with code {code}: {}", self.message),
            None => write!(f, "geofence rejected: {}", self.message),
        }
    }
}

impl Error for GeofenceError {}
