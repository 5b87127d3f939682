//! Core domain logic for GeoRemind location reminders.
//! This crate is the single source of truth for reminder storage, validation
//! and the geofence save flow; UI hosts only perform platform calls.

pub mod config;
pub mod db;
pub mod flow;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use flow::driver::{run_save_flow, FlowReport};
pub use flow::geofence::{
    GeofenceError, GeofenceExpiration, GeofenceRequest, GeofenceTransition,
    DEFAULT_GEOFENCE_RADIUS_METERS, GEOFENCE_NOT_AVAILABLE,
};
pub use flow::machine::{
    FlowCommand, FlowError, FlowInput, FlowPhase, FlowSettings, FlowState, SaveFlow,
    SettingsStatus,
};
pub use flow::permission::{required_permissions, Permission};
pub use flow::platform::{
    FlowPrompter, GeofencingService, LocationSettingsService, PermissionService,
    PlatformServices,
};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::reminder::{GeofencingChoice, Reminder, ReminderId, ReminderValidationError};
pub use repo::reminder_repo::{
    ReminderRepository, RepoError, RepoResult, SqliteReminderRepository,
};
pub use service::outcome::Outcome;
pub use service::reminder_editor::{ReminderEditor, ReminderFields, SaveError, UiEvent};
pub use service::reminder_source::{
    LocalReminderSource, ReminderDataSource, FETCH_REMINDERS_FAILED, REMINDER_NOT_FOUND,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
