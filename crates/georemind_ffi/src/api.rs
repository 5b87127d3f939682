//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose reminder storage and the geofence save flow to Dart via FRB.
//! - Hold save-flow sessions between platform callbacks.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - A save-flow session is dropped once it reaches a terminal step.
//! - Reminders reach storage only after validation passes.

use georemind_core::db::open_shared_db;
use georemind_core::service::reminder_editor::REMINDER_SAVED;
use georemind_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    CoreConfig, FlowCommand, FlowInput, GeofenceError, GeofenceExpiration, GeofenceRequest,
    GeofenceTransition, GeofencingChoice, LocalReminderSource, Outcome, Permission, Reminder,
    ReminderDataSource, SaveFlow, SettingsStatus,
};
use log::{info, warn};
use once_cell::sync::{Lazy, OnceCell};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::runtime::{Builder, Runtime};
use uuid::Uuid;

static RUNTIME: OnceCell<Runtime> = OnceCell::new();
static CONFIG: OnceCell<CoreConfig> = OnceCell::new();
static SOURCE: OnceCell<LocalReminderSource> = OnceCell::new();
static SESSIONS: Lazy<Mutex<HashMap<String, SaveFlow>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Reminder shape exchanged with Dart.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderItem {
    /// Stable reminder ID; `None` asks core to generate one.
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl ReminderItem {
    /// Trims the ID the same way lookups do; a blank ID gets a fresh one.
    fn into_reminder(self) -> Reminder {
        match self.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => Reminder::with_id(
                id,
                self.title,
                self.description,
                self.location,
                self.latitude,
                self.longitude,
            ),
            None => Reminder::new(
                self.title,
                self.description,
                self.location,
                self.latitude,
                self.longitude,
            ),
        }
    }
}

impl From<Reminder> for ReminderItem {
    fn from(value: Reminder) -> Self {
        Self {
            id: Some(value.id),
            title: value.title,
            description: value.description,
            location: value.location,
            latitude: value.latitude,
            longitude: value.longitude,
        }
    }
}

/// List response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderListResponse {
    pub ok: bool,
    /// Reminders in insertion order; empty on failure.
    pub items: Vec<ReminderItem>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

/// Single-reminder response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderResponse {
    pub ok: bool,
    pub item: Option<ReminderItem>,
    pub message: String,
}

impl ReminderResponse {
    fn success(message: impl Into<String>, item: ReminderItem) -> Self {
        Self {
            ok: true,
            item: Some(item),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            item: None,
            message: message.into(),
        }
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    pub message: String,
}

impl ActionResponse {
    fn from_result(result: Result<(), String>, success_message: &str) -> Self {
        match result {
            Ok(()) => Self {
                ok: true,
                message: success_message.to_string(),
            },
            Err(message) => Self { ok: false, message },
        }
    }
}

/// Lists all stored reminders.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn reminders_list() -> ReminderListResponse {
    match with_source(|source| source.get_reminders()) {
        Ok(reminders) => {
            let items = reminders
                .into_iter()
                .map(ReminderItem::from)
                .collect::<Vec<_>>();
            let message = if items.is_empty() {
                "No reminders.".to_string()
            } else {
                format!("Found {} reminder(s).", items.len())
            };
            ReminderListResponse {
                ok: true,
                items,
                message,
            }
        }
        Err(message) => ReminderListResponse {
            ok: false,
            items: Vec::new(),
            message,
        },
    }
}

/// Loads one reminder by ID.
#[flutter_rust_bridge::frb(sync)]
pub fn reminder_get(id: String) -> ReminderResponse {
    match with_source(|source| source.get_reminder(id.trim())) {
        Ok(reminder) => ReminderResponse::success("Reminder found.", reminder.into()),
        Err(message) => ReminderResponse::failure(message),
    }
}

/// Validates and saves a reminder without the geofence flow.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Returns the validation message (`Please enter title`,
///   `Please select location`) when the reminder is rejected.
/// - Returns the stored item, including a generated ID, on success.
#[flutter_rust_bridge::frb(sync)]
pub fn reminder_save(item: ReminderItem) -> ReminderResponse {
    let reminder = item.into_reminder();
    if let Err(err) = reminder.validate() {
        return ReminderResponse::failure(err.to_string());
    }
    match with_source(|source| source.save_reminder(&reminder)) {
        Ok(()) => ReminderResponse::success(REMINDER_SAVED, reminder.into()),
        Err(message) => ReminderResponse::failure(message),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn reminder_delete(id: String) -> ActionResponse {
    ActionResponse::from_result(
        with_source(|source| source.delete_reminder(id.trim())),
        "Reminder deleted.",
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn reminders_delete_all() -> ActionResponse {
    ActionResponse::from_result(
        with_source(|source| source.delete_all_reminders()),
        "All reminders deleted.",
    )
}

/// Device location setting as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationSettingsStatus {
    Enabled,
    Resolvable,
    Unavailable,
}

/// Result of the platform call requested by the previous step.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveFlowInput {
    PermissionStatus { granted: bool, show_rationale: bool },
    RationaleAccepted,
    PermissionResult { granted: bool },
    NoticeAcknowledged,
    LocationSettings { status: LocationSettingsStatus },
    ResolutionResult { accepted: bool },
    PermissionsVerified { granted: bool },
    GeofenceAdded,
    GeofenceFailed { code: Option<i32>, message: String },
}

impl From<SaveFlowInput> for FlowInput {
    fn from(value: SaveFlowInput) -> Self {
        match value {
            SaveFlowInput::PermissionStatus {
                granted,
                show_rationale,
            } => Self::PermissionStatus {
                granted,
                show_rationale,
            },
            SaveFlowInput::RationaleAccepted => Self::RationaleAccepted,
            SaveFlowInput::PermissionResult { granted } => Self::PermissionResult { granted },
            SaveFlowInput::NoticeAcknowledged => Self::NoticeAcknowledged,
            SaveFlowInput::LocationSettings { status } => Self::LocationSettings(match status {
                LocationSettingsStatus::Enabled => SettingsStatus::Enabled,
                LocationSettingsStatus::Resolvable => SettingsStatus::Resolvable,
                LocationSettingsStatus::Unavailable => SettingsStatus::Unavailable,
            }),
            SaveFlowInput::ResolutionResult { accepted } => Self::ResolutionResult { accepted },
            SaveFlowInput::PermissionsVerified { granted } => {
                Self::PermissionsVerified { granted }
            }
            SaveFlowInput::GeofenceAdded => Self::GeofenceResult(Ok(())),
            SaveFlowInput::GeofenceFailed { code, message } => {
                Self::GeofenceResult(Err(GeofenceError::new(code, message)))
            }
        }
    }
}

/// Geofence the host must register.
#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceItem {
    pub request_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f32,
    /// Transition names (`enter|exit|dwell`).
    pub transitions: Vec<String>,
    pub initial_trigger: Option<String>,
    /// `None` means the geofence never expires.
    pub expiration_millis: Option<u64>,
}

impl From<GeofenceRequest> for GeofenceItem {
    fn from(value: GeofenceRequest) -> Self {
        Self {
            request_id: value.request_id,
            latitude: value.latitude,
            longitude: value.longitude,
            radius_meters: value.radius_meters,
            transitions: value
                .transitions
                .into_iter()
                .map(|transition| transition_label(transition).to_string())
                .collect(),
            initial_trigger: value
                .initial_trigger
                .map(|transition| transition_label(transition).to_string()),
            expiration_millis: match value.expiration {
                GeofenceExpiration::Never => None,
                GeofenceExpiration::AfterMillis(millis) => Some(millis),
            },
        }
    }
}

/// One step of a save-flow session.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveFlowStep {
    /// `false` when the step reports an error or a rejected save.
    pub ok: bool,
    pub session_id: String,
    /// Next host action: `check_permission|show_permission_rationale|
    /// request_permission|show_permission_denied|check_location_settings|
    /// resolve_location_settings|show_location_settings_required|
    /// verify_permissions|add_geofence`, or a terminal
    /// `saved|rejected|failed`, or `error` for a refused call.
    pub command: String,
    /// Platform permission strings the command applies to.
    pub permissions: Vec<String>,
    pub geofence: Option<GeofenceItem>,
    pub reminder_id: String,
    /// Toast shown before the save (`saved` and `rejected` only).
    pub notice: Option<String>,
    pub message: String,
    /// Geofencing choice after this step; `Some(false)` once bypassed.
    pub geofencing: Option<bool>,
    pub finished: bool,
}

impl SaveFlowStep {
    fn new(session_id: &str, flow: &SaveFlow, command: &str) -> Self {
        Self {
            ok: true,
            session_id: session_id.to_string(),
            command: command.to_string(),
            permissions: Vec::new(),
            geofence: None,
            reminder_id: flow.reminder().id.clone(),
            notice: None,
            message: String::new(),
            geofencing: choice_flag(flow.geofencing()),
            finished: false,
        }
    }

    fn error(session_id: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            session_id: session_id.to_string(),
            command: "error".to_string(),
            permissions: Vec::new(),
            geofence: None,
            reminder_id: String::new(),
            notice: None,
            message: message.into(),
            geofencing: None,
            finished: false,
        }
    }

    fn with_permissions(mut self, permissions: &[Permission]) -> Self {
        self.permissions = permissions
            .iter()
            .map(|permission| permission.as_str().to_string())
            .collect();
        self
    }
}

/// Starts a save-flow session for `item`.
///
/// Input semantics:
/// - `geofencing`: `None` undecided, `Some(false)` skips straight to save.
/// - `sdk_int`: host platform API level; selects the permission list.
///
/// # FFI contract
/// - Sync call; DB-backed only when the flow reaches `saved`.
/// - Never panics.
/// - A session lives until a terminal step or [`save_flow_cancel`]; hosts
///   must cancel when the screen is torn down mid-flow.
#[flutter_rust_bridge::frb(sync)]
pub fn save_flow_start(item: ReminderItem, geofencing: Option<bool>, sdk_int: u32) -> SaveFlowStep {
    let settings = match config() {
        Ok(config) => config.flow_settings(sdk_int),
        Err(message) => return SaveFlowStep::error("", message),
    };
    let session_id = Uuid::new_v4().to_string();
    let mut flow = SaveFlow::new(
        item.into_reminder(),
        GeofencingChoice::from_flag(geofencing),
        &settings,
    );
    match flow.start() {
        Ok(command) => drive(session_id, flow, command),
        Err(err) => SaveFlowStep::error(&session_id, err.to_string()),
    }
}

/// Feeds the result of the last step into a session.
///
/// # FFI contract
/// - Unknown or finished sessions return an `error` step.
/// - An input that does not fit the current step returns an `error` step
///   and leaves the session where it was.
#[flutter_rust_bridge::frb(sync)]
pub fn save_flow_advance(session_id: String, input: SaveFlowInput) -> SaveFlowStep {
    let Some(mut flow) = sessions().remove(&session_id) else {
        return SaveFlowStep::error(
            &session_id,
            format!("unknown save flow session `{session_id}`"),
        );
    };

    match flow.advance(input.into()) {
        Ok(command) => drive(session_id, flow, command),
        Err(err) => {
            warn!(
                "event=ffi_save_flow_advance module=ffi status=error session={} error={}",
                session_id, err
            );
            let step = SaveFlowStep::error(&session_id, err.to_string());
            sessions().insert(session_id, flow);
            step
        }
    }
}

/// Drops a session; returns `false` when it was not active.
#[flutter_rust_bridge::frb(sync)]
pub fn save_flow_cancel(session_id: String) -> bool {
    sessions().remove(&session_id).is_some()
}

fn drive(session_id: String, flow: SaveFlow, command: FlowCommand) -> SaveFlowStep {
    let step = match command {
        FlowCommand::CheckPermission(permission) => {
            SaveFlowStep::new(&session_id, &flow, "check_permission").with_permissions(&[permission])
        }
        FlowCommand::ShowPermissionRationale(permission) => {
            SaveFlowStep::new(&session_id, &flow, "show_permission_rationale")
                .with_permissions(&[permission])
        }
        FlowCommand::RequestPermission(permission) => {
            SaveFlowStep::new(&session_id, &flow, "request_permission")
                .with_permissions(&[permission])
        }
        FlowCommand::ShowPermissionDenied => {
            SaveFlowStep::new(&session_id, &flow, "show_permission_denied")
        }
        FlowCommand::CheckLocationSettings => {
            SaveFlowStep::new(&session_id, &flow, "check_location_settings")
        }
        FlowCommand::ResolveLocationSettings => {
            SaveFlowStep::new(&session_id, &flow, "resolve_location_settings")
        }
        FlowCommand::ShowLocationSettingsRequired => {
            SaveFlowStep::new(&session_id, &flow, "show_location_settings_required")
        }
        FlowCommand::VerifyPermissions(permissions) => {
            SaveFlowStep::new(&session_id, &flow, "verify_permissions")
                .with_permissions(&permissions)
        }
        FlowCommand::AddGeofence(request) => {
            let mut step = SaveFlowStep::new(&session_id, &flow, "add_geofence");
            step.geofence = Some(request.into());
            step
        }
        FlowCommand::Persist { reminder, notice } => {
            return persist(&session_id, &flow, reminder, notice);
        }
        FlowCommand::ReportFailure { message } => {
            let mut step = SaveFlowStep::new(&session_id, &flow, "failed");
            step.ok = false;
            step.message = message;
            step.finished = true;
            return step;
        }
    };

    sessions().insert(session_id, flow);
    step
}

fn persist(session_id: &str, flow: &SaveFlow, reminder: Reminder, notice: String) -> SaveFlowStep {
    let result = reminder
        .validate()
        .map_err(|err| err.to_string())
        .and_then(|()| with_source(|source| source.save_reminder(&reminder)));

    let mut step = match result {
        Ok(()) => {
            info!(
                "event=ffi_save_flow_finish module=ffi status=saved session={} geofenced={}",
                session_id,
                flow.geofence_registered()
            );
            let mut step = SaveFlowStep::new(session_id, flow, "saved");
            step.message = REMINDER_SAVED.to_string();
            step
        }
        Err(message) => {
            let mut step = SaveFlowStep::new(session_id, flow, "rejected");
            step.ok = false;
            step.message = message;
            step
        }
    };
    step.notice = Some(notice);
    step.finished = true;
    step
}

fn sessions() -> MutexGuard<'static, HashMap<String, SaveFlow>> {
    // The map holds no cross-entry invariant, so a poisoned lock stays usable.
    SESSIONS.lock().unwrap_or_else(PoisonError::into_inner)
}

fn runtime() -> Result<&'static Runtime, String> {
    RUNTIME
        .get_or_try_init(|| Builder::new_multi_thread().enable_all().build())
        .map_err(|err| format!("async runtime init failed: {err}"))
}

fn config() -> Result<&'static CoreConfig, String> {
    CONFIG
        .get_or_try_init(CoreConfig::from_env)
        .map_err(|err| format!("config load failed: {err}"))
}

fn source() -> Result<&'static LocalReminderSource, String> {
    SOURCE.get_or_try_init(|| {
        let config = config()?;
        let conn = open_shared_db(&config.db_path)
            .map_err(|err| format!("reminder DB open failed: {err}"))?;
        LocalReminderSource::try_new(conn)
            .map_err(|err| format!("reminder store init failed: {err}"))
    })
}

fn with_source<T, F, Fut>(op: F) -> Result<T, String>
where
    F: FnOnce(&'static LocalReminderSource) -> Fut,
    Fut: Future<Output = Outcome<T>>,
{
    let runtime = runtime()?;
    let source = source()?;
    runtime.block_on(op(source)).into_result()
}

fn transition_label(transition: GeofenceTransition) -> &'static str {
    match transition {
        GeofenceTransition::Enter => "enter",
        GeofenceTransition::Exit => "exit",
        GeofenceTransition::Dwell => "dwell",
    }
}

fn choice_flag(choice: GeofencingChoice) -> Option<bool> {
    match choice {
        GeofencingChoice::Undecided => None,
        GeofencingChoice::Enabled => Some(true),
        GeofencingChoice::Disabled => Some(false),
    }
}
