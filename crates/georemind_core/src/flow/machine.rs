//! Save-flow state machine.
//!
//! # Responsibility
//! - Sequence permission checks, location-settings resolution and geofence
//!   registration before a reminder is persisted.
//! - Emit exactly one [`FlowCommand`] per transition; the host performs it
//!   and feeds the result back as a [`FlowInput`].
//!
//! # Invariants
//! - Permissions are handled strictly one at a time, in list order.
//! - `GeofencingChoice::Disabled` always routes straight to `Persist`.
//! - Terminal states (`Persisting`, `Failed`) accept no further input.

use crate::flow::geofence::{GeofenceError, GeofenceRequest, DEFAULT_GEOFENCE_RADIUS_METERS};
use crate::flow::permission::{required_permissions, Permission};
use crate::model::reminder::{GeofencingChoice, Reminder};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Static inputs of one flow run.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSettings {
    pub required_permissions: Vec<Permission>,
    pub radius_meters: f32,
}

impl FlowSettings {
    /// Settings for a platform API level with the default radius.
    pub fn for_platform(sdk_int: u32) -> Self {
        Self {
            required_permissions: required_permissions(sdk_int),
            radius_meters: DEFAULT_GEOFENCE_RADIUS_METERS,
        }
    }

    pub fn with_radius(mut self, radius_meters: f32) -> Self {
        self.radius_meters = radius_meters;
        self
    }
}

/// Device location capability as reported by the settings client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsStatus {
    Enabled,
    /// Off, but the platform can offer a resolution dialog.
    Resolvable,
    /// Off, and no resolution is available.
    Unavailable,
}

/// Coarse step of the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    CheckPermissions,
    CheckSettings,
    RegisterGeofence,
    Persist,
    Stalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    AwaitingPermissionStatus(Permission),
    AwaitingRationale(Permission),
    AwaitingPermissionResult(Permission),
    AwaitingDenialAck,
    AwaitingSettings { resolve: bool },
    AwaitingResolution,
    AwaitingSettingsAck,
    AwaitingPermissionVerification,
    AwaitingGeofence,
    Persisting,
    Failed,
}

impl FlowState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingPermissionStatus(_) => "awaiting_permission_status",
            Self::AwaitingRationale(_) => "awaiting_rationale",
            Self::AwaitingPermissionResult(_) => "awaiting_permission_result",
            Self::AwaitingDenialAck => "awaiting_denial_ack",
            Self::AwaitingSettings { .. } => "awaiting_settings",
            Self::AwaitingResolution => "awaiting_resolution",
            Self::AwaitingSettingsAck => "awaiting_settings_ack",
            Self::AwaitingPermissionVerification => "awaiting_permission_verification",
            Self::AwaitingGeofence => "awaiting_geofence",
            Self::Persisting => "persisting",
            Self::Failed => "failed",
        }
    }

    pub fn phase(self) -> FlowPhase {
        match self {
            Self::Idle
            | Self::AwaitingPermissionStatus(_)
            | Self::AwaitingRationale(_)
            | Self::AwaitingPermissionResult(_)
            | Self::AwaitingDenialAck => FlowPhase::CheckPermissions,
            Self::AwaitingSettings { .. } | Self::AwaitingResolution | Self::AwaitingSettingsAck => {
                FlowPhase::CheckSettings
            }
            Self::AwaitingPermissionVerification | Self::AwaitingGeofence => {
                FlowPhase::RegisterGeofence
            }
            Self::Persisting => FlowPhase::Persist,
            Self::Failed => FlowPhase::Stalled,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Persisting | Self::Failed)
    }
}

/// Action the host performs next.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowCommand {
    /// Answer with [`FlowInput::PermissionStatus`].
    CheckPermission(Permission),
    /// Explain why the permission is needed; answer with
    /// [`FlowInput::RationaleAccepted`] once the user asks to continue.
    ShowPermissionRationale(Permission),
    /// Answer with [`FlowInput::PermissionResult`].
    RequestPermission(Permission),
    /// Tell the user geofencing is skipped; answer with
    /// [`FlowInput::NoticeAcknowledged`].
    ShowPermissionDenied,
    /// Answer with [`FlowInput::LocationSettings`].
    CheckLocationSettings,
    /// Show the platform resolution dialog; answer with
    /// [`FlowInput::ResolutionResult`].
    ResolveLocationSettings,
    /// Explain that location must be on; answer with
    /// [`FlowInput::NoticeAcknowledged`].
    ShowLocationSettingsRequired,
    /// Answer with [`FlowInput::PermissionsVerified`].
    VerifyPermissions(Vec<Permission>),
    /// Answer with [`FlowInput::GeofenceResult`].
    AddGeofence(GeofenceRequest),
    /// Terminal: show `notice`, then save `reminder` through the editor.
    Persist { reminder: Reminder, notice: String },
    /// Terminal: show `message`; the user retries with a new save.
    ReportFailure { message: String },
}

/// Result of the last command.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowInput {
    PermissionStatus { granted: bool, show_rationale: bool },
    RationaleAccepted,
    PermissionResult { granted: bool },
    NoticeAcknowledged,
    LocationSettings(SettingsStatus),
    ResolutionResult { accepted: bool },
    PermissionsVerified { granted: bool },
    GeofenceResult(Result<(), GeofenceError>),
}

impl FlowInput {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PermissionStatus { .. } => "permission_status",
            Self::RationaleAccepted => "rationale_accepted",
            Self::PermissionResult { .. } => "permission_result",
            Self::NoticeAcknowledged => "notice_acknowledged",
            Self::LocationSettings(_) => "location_settings",
            Self::ResolutionResult { .. } => "resolution_result",
            Self::PermissionsVerified { .. } => "permissions_verified",
            Self::GeofenceResult(_) => "geofence_result",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    AlreadyStarted,
    UnexpectedInput {
        state: &'static str,
        input: &'static str,
    },
    Finished {
        state: &'static str,
    },
}

impl Display for FlowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyStarted => write!(f, "save flow already started"),
            Self::UnexpectedInput { state, input } => {
                write!(f, "input `{input}` does not apply to state `{state}`")
            }
            Self::Finished { state } => write!(f, "save flow already finished in state `{state}`"),
        }
    }
}

impl Error for FlowError {}

/// One save attempt for one reminder.
#[derive(Debug, Clone)]
pub struct SaveFlow {
    reminder: Reminder,
    required: Vec<Permission>,
    pending: VecDeque<Permission>,
    geofencing: GeofencingChoice,
    radius_meters: f32,
    geofence_registered: bool,
    state: FlowState,
}

impl SaveFlow {
    pub fn new(reminder: Reminder, geofencing: GeofencingChoice, settings: &FlowSettings) -> Self {
        Self {
            reminder,
            required: settings.required_permissions.clone(),
            pending: settings.required_permissions.iter().copied().collect(),
            geofencing,
            radius_meters: settings.radius_meters,
            geofence_registered: false,
            state: FlowState::Idle,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn phase(&self) -> FlowPhase {
        self.state.phase()
    }

    pub fn reminder(&self) -> &Reminder {
        &self.reminder
    }

    /// Current choice, including a bypass decided during this run.
    pub fn geofencing(&self) -> GeofencingChoice {
        self.geofencing
    }

    pub fn geofence_registered(&self) -> bool {
        self.geofence_registered
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Emits the first command.
    pub fn start(&mut self) -> Result<FlowCommand, FlowError> {
        if self.state != FlowState::Idle {
            return Err(FlowError::AlreadyStarted);
        }
        info!(
            "event=save_flow_start module=flow status=ok id={} geofencing={:?} permissions={}",
            self.reminder.id,
            self.geofencing,
            self.required.len()
        );
        Ok(self.check_permissions())
    }

    /// Applies the result of the previous command and emits the next one.
    ///
    /// On error the state is left unchanged.
    pub fn advance(&mut self, input: FlowInput) -> Result<FlowCommand, FlowError> {
        let from = self.state;
        if from.is_terminal() {
            return Err(FlowError::Finished { state: from.name() });
        }

        let command = match (from, input) {
            (
                FlowState::AwaitingPermissionStatus(permission),
                FlowInput::PermissionStatus { granted: true, .. },
            ) => self.permission_granted(permission),
            (
                FlowState::AwaitingPermissionStatus(permission),
                FlowInput::PermissionStatus {
                    show_rationale: true,
                    ..
                },
            ) => {
                self.state = FlowState::AwaitingRationale(permission);
                FlowCommand::ShowPermissionRationale(permission)
            }
            (
                FlowState::AwaitingPermissionStatus(permission),
                FlowInput::PermissionStatus { .. },
            )
            | (FlowState::AwaitingRationale(permission), FlowInput::RationaleAccepted) => {
                self.state = FlowState::AwaitingPermissionResult(permission);
                FlowCommand::RequestPermission(permission)
            }
            (
                FlowState::AwaitingPermissionResult(permission),
                FlowInput::PermissionResult { granted: true },
            ) => self.permission_granted(permission),
            (
                FlowState::AwaitingPermissionResult(permission),
                FlowInput::PermissionResult { granted: false },
            ) => {
                info!(
                    "event=save_flow_permission module=flow status=denied permission={}",
                    permission.as_str()
                );
                self.state = FlowState::AwaitingDenialAck;
                FlowCommand::ShowPermissionDenied
            }
            (FlowState::AwaitingDenialAck, FlowInput::NoticeAcknowledged)
            | (FlowState::AwaitingSettingsAck, FlowInput::NoticeAcknowledged) => {
                self.geofencing = GeofencingChoice::Disabled;
                self.check_permissions()
            }
            (
                FlowState::AwaitingSettings { .. },
                FlowInput::LocationSettings(SettingsStatus::Enabled),
            ) => self.verify_permissions(),
            (
                FlowState::AwaitingSettings { resolve: true },
                FlowInput::LocationSettings(SettingsStatus::Resolvable),
            ) => {
                self.state = FlowState::AwaitingResolution;
                FlowCommand::ResolveLocationSettings
            }
            (FlowState::AwaitingSettings { .. }, FlowInput::LocationSettings(_)) => {
                self.state = FlowState::AwaitingSettingsAck;
                FlowCommand::ShowLocationSettingsRequired
            }
            // A declined dialog re-checks once without offering it again.
            (FlowState::AwaitingResolution, FlowInput::ResolutionResult { accepted }) => {
                self.check_settings(accepted)
            }
            (
                FlowState::AwaitingPermissionVerification,
                FlowInput::PermissionsVerified { granted: true },
            ) => self.register_geofence(),
            (
                FlowState::AwaitingPermissionVerification,
                FlowInput::PermissionsVerified { granted: false },
            ) => {
                warn!("event=save_flow_permission module=flow status=revoked");
                self.pending = self.required.iter().copied().collect();
                self.check_permissions()
            }
            (FlowState::AwaitingGeofence, FlowInput::GeofenceResult(Ok(()))) => {
                self.geofence_registered = true;
                info!(
                    "event=geofence_add module=flow status=ok id={}",
                    self.reminder.id
                );
                let notice = format!(
                    "Geofence added for reminder location {}",
                    self.reminder.location
                );
                self.persist(notice)
            }
            (FlowState::AwaitingGeofence, FlowInput::GeofenceResult(Err(err))) => {
                warn!(
                    "event=geofence_add module=flow status=error id={} error={}",
                    self.reminder.id, err
                );
                self.state = FlowState::Failed;
                FlowCommand::ReportFailure {
                    message: err.user_message(),
                }
            }
            (state, input) => {
                return Err(FlowError::UnexpectedInput {
                    state: state.name(),
                    input: input.name(),
                });
            }
        };

        debug!(
            "event=save_flow_transition module=flow from={} to={}",
            from.name(),
            self.state.name()
        );
        Ok(command)
    }

    fn check_permissions(&mut self) -> FlowCommand {
        if self.geofencing.is_disabled() {
            let notice = format!(
                "Not geofencing reminder {} at {}",
                self.reminder.title, self.reminder.location
            );
            return self.persist(notice);
        }

        match self.pending.front().copied() {
            Some(permission) => {
                self.state = FlowState::AwaitingPermissionStatus(permission);
                FlowCommand::CheckPermission(permission)
            }
            None => self.check_settings(true),
        }
    }

    fn permission_granted(&mut self, permission: Permission) -> FlowCommand {
        if self.pending.front() == Some(&permission) {
            self.pending.pop_front();
        }
        self.check_permissions()
    }

    fn check_settings(&mut self, resolve: bool) -> FlowCommand {
        self.state = FlowState::AwaitingSettings { resolve };
        FlowCommand::CheckLocationSettings
    }

    fn verify_permissions(&mut self) -> FlowCommand {
        if self.required.is_empty() {
            return self.register_geofence();
        }
        self.state = FlowState::AwaitingPermissionVerification;
        FlowCommand::VerifyPermissions(self.required.clone())
    }

    fn register_geofence(&mut self) -> FlowCommand {
        self.state = FlowState::AwaitingGeofence;
        FlowCommand::AddGeofence(GeofenceRequest::for_reminder(
            &self.reminder,
            self.radius_meters,
        ))
    }

    fn persist(&mut self, notice: String) -> FlowCommand {
        self.state = FlowState::Persisting;
        FlowCommand::Persist {
            reminder: self.reminder.clone(),
            notice,
        }
    }
}
