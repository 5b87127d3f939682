//! Runs a [`SaveFlow`] against the host's platform ports.
//!
//! # Responsibility
//! - Translate each [`FlowCommand`] into a platform call and its result into
//!   the next [`FlowInput`].
//! - Persist through the editor when the flow reaches `Persist`.
//!
//! # Invariants
//! - The editor's geofencing choice reflects any bypass decided by the run,
//!   so a retry in the same session does not prompt again.

use crate::flow::machine::{FlowCommand, FlowError, FlowInput, FlowSettings, SaveFlow};
use crate::flow::platform::PlatformServices;
use crate::service::reminder_editor::{ReminderEditor, SaveError, UiEvent};
use crate::service::reminder_source::ReminderDataSource;
use log::info;

/// How a save attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowReport {
    Saved { geofenced: bool },
    /// Reached `Persist`, but validation or storage refused the reminder.
    Rejected(SaveError),
    /// Geofence registration failed; nothing was saved.
    Stalled { message: String },
    /// The user dismissed a prompt; nothing was saved.
    Abandoned,
}

/// Builds a candidate from the editor and drives it to a terminal state.
pub async fn run_save_flow<S: ReminderDataSource>(
    platform: &PlatformServices,
    editor: &mut ReminderEditor<S>,
    settings: &FlowSettings,
) -> Result<FlowReport, FlowError> {
    let mut flow = SaveFlow::new(editor.to_candidate(), editor.geofencing(), settings);
    let mut command = flow.start()?;

    let report = loop {
        let input = match command {
            FlowCommand::CheckPermission(permission) => {
                let granted = platform.permissions.is_granted(permission);
                let show_rationale =
                    !granted && platform.permissions.should_show_rationale(permission);
                FlowInput::PermissionStatus {
                    granted,
                    show_rationale,
                }
            }
            FlowCommand::ShowPermissionRationale(permission) => {
                if !platform.prompter.explain_permission(permission).await {
                    break FlowReport::Abandoned;
                }
                FlowInput::RationaleAccepted
            }
            FlowCommand::RequestPermission(permission) => FlowInput::PermissionResult {
                granted: platform.permissions.request(permission).await,
            },
            FlowCommand::ShowPermissionDenied => {
                if !platform.prompter.notify_permission_denied().await {
                    break FlowReport::Abandoned;
                }
                FlowInput::NoticeAcknowledged
            }
            FlowCommand::CheckLocationSettings => {
                FlowInput::LocationSettings(platform.location_settings.check().await)
            }
            FlowCommand::ResolveLocationSettings => FlowInput::ResolutionResult {
                accepted: platform.location_settings.resolve().await,
            },
            FlowCommand::ShowLocationSettingsRequired => {
                if !platform.prompter.notify_location_settings_required().await {
                    break FlowReport::Abandoned;
                }
                FlowInput::NoticeAcknowledged
            }
            FlowCommand::VerifyPermissions(permissions) => FlowInput::PermissionsVerified {
                granted: permissions
                    .iter()
                    .all(|permission| platform.permissions.is_granted(*permission)),
            },
            FlowCommand::AddGeofence(request) => {
                FlowInput::GeofenceResult(platform.geofencing.add_geofence(&request).await)
            }
            FlowCommand::Persist { reminder, notice } => {
                editor.emit(UiEvent::ShowToast(notice));
                break match editor.validate_and_save_reminder(&reminder).await {
                    Ok(()) => FlowReport::Saved {
                        geofenced: flow.geofence_registered(),
                    },
                    Err(err) => FlowReport::Rejected(err),
                };
            }
            FlowCommand::ReportFailure { message } => {
                editor.emit(UiEvent::ShowErrorMessage(message.clone()));
                break FlowReport::Stalled { message };
            }
        };
        command = flow.advance(input)?;
    };

    editor.set_geofencing(flow.geofencing());
    info!(
        "event=save_flow_finish module=flow status={} id={}",
        report_status(&report),
        flow.reminder().id
    );
    Ok(report)
}

fn report_status(report: &FlowReport) -> &'static str {
    match report {
        FlowReport::Saved { .. } => "saved",
        FlowReport::Rejected(_) => "rejected",
        FlowReport::Stalled { .. } => "stalled",
        FlowReport::Abandoned => "abandoned",
    }
}
