use async_trait::async_trait;
use georemind_core::db::open_shared_db_in_memory;
use georemind_core::{
    run_save_flow, FlowCommand, FlowError, FlowInput, FlowPhase, FlowPrompter, FlowReport,
    FlowSettings, GeofenceError, GeofenceExpiration, GeofenceRequest, GeofenceTransition,
    GeofencingChoice, GeofencingService, LocalReminderSource, LocationSettingsService, Outcome,
    Permission, PermissionService, PlatformServices, Reminder, ReminderDataSource,
    ReminderEditor, ReminderValidationError, SaveError, SaveFlow, SettingsStatus, UiEvent,
};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;

const ACCURACY_MESSAGE: &str = "Location Reminder needs 'Improve Location Accuracy' enabled. Go to settings 'Security & Location > Location > Mode' to enable this.";

fn reminder() -> Reminder {
    Reminder::with_id("r-42", "milk", None, "corner shop", 48.1, 11.5)
}

fn started(choice: GeofencingChoice, sdk_int: u32) -> (SaveFlow, FlowCommand) {
    let mut flow = SaveFlow::new(reminder(), choice, &FlowSettings::for_platform(sdk_int));
    let command = flow.start().unwrap();
    (flow, command)
}

fn granted() -> FlowInput {
    FlowInput::PermissionStatus {
        granted: true,
        show_rationale: false,
    }
}

/// Walks a fresh flow on a modern platform up to the settings check.
fn flow_at_settings_check() -> SaveFlow {
    let (mut flow, first) = started(GeofencingChoice::Undecided, 30);
    assert_eq!(first, FlowCommand::CheckPermission(Permission::FineLocation));
    assert_eq!(
        flow.advance(granted()).unwrap(),
        FlowCommand::CheckPermission(Permission::BackgroundLocation)
    );
    assert_eq!(
        flow.advance(granted()).unwrap(),
        FlowCommand::CheckLocationSettings
    );
    flow
}

// ---------------------------------------------------------------------------
// state machine
// ---------------------------------------------------------------------------

#[test]
fn granted_permissions_and_enabled_settings_register_then_persist() {
    let mut flow = flow_at_settings_check();

    assert_eq!(
        flow.advance(FlowInput::LocationSettings(SettingsStatus::Enabled))
            .unwrap(),
        FlowCommand::VerifyPermissions(vec![
            Permission::FineLocation,
            Permission::BackgroundLocation
        ])
    );
    assert_eq!(flow.phase(), FlowPhase::RegisterGeofence);

    let request = match flow
        .advance(FlowInput::PermissionsVerified { granted: true })
        .unwrap()
    {
        FlowCommand::AddGeofence(request) => request,
        other => panic!("unexpected command: {other:?}"),
    };
    assert_eq!(
        request,
        GeofenceRequest {
            request_id: "r-42".to_string(),
            latitude: 48.1,
            longitude: 11.5,
            radius_meters: 100.0,
            transitions: vec![GeofenceTransition::Enter],
            expiration: GeofenceExpiration::Never,
            initial_trigger: Some(GeofenceTransition::Enter),
        }
    );

    assert_eq!(
        flow.advance(FlowInput::GeofenceResult(Ok(()))).unwrap(),
        FlowCommand::Persist {
            reminder: reminder(),
            notice: "Geofence added for reminder location corner shop".to_string(),
        }
    );
    assert_eq!(flow.phase(), FlowPhase::Persist);
    assert!(flow.geofence_registered());
    assert!(flow.is_finished());
}

#[test]
fn older_platforms_check_only_foreground_permission() {
    let (mut flow, first) = started(GeofencingChoice::Undecided, 28);
    assert_eq!(first, FlowCommand::CheckPermission(Permission::FineLocation));
    assert_eq!(
        flow.advance(granted()).unwrap(),
        FlowCommand::CheckLocationSettings
    );
}

#[test]
fn rationale_is_shown_before_requesting() {
    let (mut flow, _) = started(GeofencingChoice::Undecided, 30);

    assert_eq!(
        flow.advance(FlowInput::PermissionStatus {
            granted: false,
            show_rationale: true,
        })
        .unwrap(),
        FlowCommand::ShowPermissionRationale(Permission::FineLocation)
    );
    assert_eq!(
        flow.advance(FlowInput::RationaleAccepted).unwrap(),
        FlowCommand::RequestPermission(Permission::FineLocation)
    );
    assert_eq!(
        flow.advance(FlowInput::PermissionResult { granted: true })
            .unwrap(),
        FlowCommand::CheckPermission(Permission::BackgroundLocation)
    );
}

#[test]
fn missing_permission_without_rationale_is_requested_directly() {
    let (mut flow, _) = started(GeofencingChoice::Undecided, 30);

    assert_eq!(
        flow.advance(FlowInput::PermissionStatus {
            granted: false,
            show_rationale: false,
        })
        .unwrap(),
        FlowCommand::RequestPermission(Permission::FineLocation)
    );
}

#[test]
fn denied_permission_bypasses_geofencing_after_acknowledgement() {
    let (mut flow, _) = started(GeofencingChoice::Undecided, 30);
    flow.advance(granted()).unwrap();
    flow.advance(FlowInput::PermissionStatus {
        granted: false,
        show_rationale: false,
    })
    .unwrap();

    assert_eq!(
        flow.advance(FlowInput::PermissionResult { granted: false })
            .unwrap(),
        FlowCommand::ShowPermissionDenied
    );
    assert_eq!(flow.geofencing(), GeofencingChoice::Undecided);

    assert_eq!(
        flow.advance(FlowInput::NoticeAcknowledged).unwrap(),
        FlowCommand::Persist {
            reminder: reminder(),
            notice: "Not geofencing reminder milk at corner shop".to_string(),
        }
    );
    assert_eq!(flow.geofencing(), GeofencingChoice::Disabled);
    assert!(!flow.geofence_registered());
}

#[test]
fn disabled_choice_goes_straight_to_persist() {
    let (flow, first) = started(GeofencingChoice::Disabled, 30);

    assert!(matches!(first, FlowCommand::Persist { .. }));
    assert_eq!(flow.phase(), FlowPhase::Persist);
}

#[test]
fn accepted_resolution_rechecks_settings() {
    let mut flow = flow_at_settings_check();

    assert_eq!(
        flow.advance(FlowInput::LocationSettings(SettingsStatus::Resolvable))
            .unwrap(),
        FlowCommand::ResolveLocationSettings
    );
    assert_eq!(
        flow.advance(FlowInput::ResolutionResult { accepted: true })
            .unwrap(),
        FlowCommand::CheckLocationSettings
    );
    assert!(matches!(
        flow.advance(FlowInput::LocationSettings(SettingsStatus::Enabled))
            .unwrap(),
        FlowCommand::VerifyPermissions(_)
    ));
}

#[test]
fn declined_resolution_is_not_offered_again() {
    let mut flow = flow_at_settings_check();
    flow.advance(FlowInput::LocationSettings(SettingsStatus::Resolvable))
        .unwrap();

    assert_eq!(
        flow.advance(FlowInput::ResolutionResult { accepted: false })
            .unwrap(),
        FlowCommand::CheckLocationSettings
    );
    assert_eq!(
        flow.advance(FlowInput::LocationSettings(SettingsStatus::Resolvable))
            .unwrap(),
        FlowCommand::ShowLocationSettingsRequired
    );
    assert!(matches!(
        flow.advance(FlowInput::NoticeAcknowledged).unwrap(),
        FlowCommand::Persist { .. }
    ));
    assert_eq!(flow.geofencing(), GeofencingChoice::Disabled);
}

#[test]
fn unresolvable_settings_explain_then_bypass() {
    let mut flow = flow_at_settings_check();

    assert_eq!(
        flow.advance(FlowInput::LocationSettings(SettingsStatus::Unavailable))
            .unwrap(),
        FlowCommand::ShowLocationSettingsRequired
    );
    assert_eq!(flow.phase(), FlowPhase::CheckSettings);
}

#[test]
fn revoked_permission_restarts_the_permission_walk() {
    let mut flow = flow_at_settings_check();
    flow.advance(FlowInput::LocationSettings(SettingsStatus::Enabled))
        .unwrap();

    assert_eq!(
        flow.advance(FlowInput::PermissionsVerified { granted: false })
            .unwrap(),
        FlowCommand::CheckPermission(Permission::FineLocation)
    );
    assert_eq!(flow.phase(), FlowPhase::CheckPermissions);
}

#[test]
fn accuracy_failure_stalls_with_specific_message() {
    let mut flow = flow_at_settings_check();
    flow.advance(FlowInput::LocationSettings(SettingsStatus::Enabled))
        .unwrap();
    flow.advance(FlowInput::PermissionsVerified { granted: true })
        .unwrap();

    assert_eq!(
        flow.advance(FlowInput::GeofenceResult(Err(GeofenceError::new(
            Some(1000),
            "GEOFENCE_NOT_AVAILABLE"
        ))))
        .unwrap(),
        FlowCommand::ReportFailure {
            message: ACCURACY_MESSAGE.to_string(),
        }
    );
    assert_eq!(flow.phase(), FlowPhase::Stalled);
    assert!(matches!(
        flow.advance(FlowInput::GeofenceResult(Ok(()))),
        Err(FlowError::Finished { .. })
    ));
}

#[test]
fn generic_failure_carries_platform_text() {
    let mut flow = flow_at_settings_check();
    flow.advance(FlowInput::LocationSettings(SettingsStatus::Enabled))
        .unwrap();
    flow.advance(FlowInput::PermissionsVerified { granted: true })
        .unwrap();

    assert_eq!(
        flow.advance(FlowInput::GeofenceResult(Err(GeofenceError::new(
            Some(1001),
            "1001: too many geofences"
        ))))
        .unwrap(),
        FlowCommand::ReportFailure {
            message: "Error adding geofence: 1001: too many geofences".to_string(),
        }
    );
}

#[test]
fn late_callbacks_after_persist_are_rejected() {
    let (mut flow, _) = started(GeofencingChoice::Disabled, 30);

    let err = flow
        .advance(FlowInput::PermissionResult { granted: true })
        .unwrap_err();
    assert_eq!(
        err,
        FlowError::Finished {
            state: "persisting"
        }
    );
}

// ---------------------------------------------------------------------------
// driver
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakePermissions {
    granted: Mutex<HashSet<Permission>>,
    rationale: HashSet<Permission>,
    grant_on_request: bool,
    requests: Mutex<Vec<Permission>>,
}

impl FakePermissions {
    fn all_granted() -> Self {
        Self {
            granted: Mutex::new(
                [Permission::FineLocation, Permission::BackgroundLocation]
                    .into_iter()
                    .collect(),
            ),
            ..Self::default()
        }
    }
}

#[async_trait]
impl PermissionService for FakePermissions {
    fn is_granted(&self, permission: Permission) -> bool {
        self.granted.lock().unwrap().contains(&permission)
    }

    fn should_show_rationale(&self, permission: Permission) -> bool {
        self.rationale.contains(&permission)
    }

    async fn request(&self, permission: Permission) -> bool {
        self.requests.lock().unwrap().push(permission);
        if self.grant_on_request {
            self.granted.lock().unwrap().insert(permission);
        }
        self.grant_on_request
    }
}

struct FakeSettings {
    statuses: Mutex<VecDeque<SettingsStatus>>,
    accept_resolution: bool,
}

impl FakeSettings {
    fn enabled() -> Self {
        Self {
            statuses: Mutex::new(VecDeque::new()),
            accept_resolution: true,
        }
    }
}

#[async_trait]
impl LocationSettingsService for FakeSettings {
    async fn check(&self) -> SettingsStatus {
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SettingsStatus::Enabled)
    }

    async fn resolve(&self) -> bool {
        self.accept_resolution
    }
}

struct FakeGeofencing {
    result: Result<(), GeofenceError>,
    requests: Mutex<Vec<GeofenceRequest>>,
}

impl FakeGeofencing {
    fn answering(result: Result<(), GeofenceError>) -> Self {
        Self {
            result,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl GeofencingService for FakeGeofencing {
    async fn add_geofence(&self, request: &GeofenceRequest) -> Result<(), GeofenceError> {
        self.requests.lock().unwrap().push(request.clone());
        self.result.clone()
    }
}

struct FakePrompter {
    accept: bool,
    prompts: AtomicUsize,
}

impl FakePrompter {
    fn answering(accept: bool) -> Self {
        Self {
            accept,
            prompts: AtomicUsize::new(0),
        }
    }

    fn answer(&self) -> bool {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.accept
    }
}

#[async_trait]
impl FlowPrompter for FakePrompter {
    async fn explain_permission(&self, _permission: Permission) -> bool {
        self.answer()
    }

    async fn notify_permission_denied(&self) -> bool {
        self.answer()
    }

    async fn notify_location_settings_required(&self) -> bool {
        self.answer()
    }
}

struct Harness {
    permissions: Arc<FakePermissions>,
    geofencing: Arc<FakeGeofencing>,
    prompter: Arc<FakePrompter>,
    platform: PlatformServices,
    source: LocalReminderSource,
    editor: ReminderEditor<LocalReminderSource>,
    events: UnboundedReceiver<UiEvent>,
}

impl Harness {
    fn new(
        permissions: FakePermissions,
        settings: FakeSettings,
        geofencing: FakeGeofencing,
        prompter: FakePrompter,
    ) -> Self {
        let permissions = Arc::new(permissions);
        let geofencing = Arc::new(geofencing);
        let prompter = Arc::new(prompter);
        let platform = PlatformServices {
            permissions: permissions.clone(),
            location_settings: Arc::new(settings),
            geofencing: geofencing.clone(),
            prompter: prompter.clone(),
        };
        let source = LocalReminderSource::try_new(open_shared_db_in_memory().unwrap()).unwrap();
        let (mut editor, events) = ReminderEditor::new(source.clone());
        editor.set_title("milk");
        editor.set_selected_location("corner shop", 48.1, 11.5);

        Self {
            permissions,
            geofencing,
            prompter,
            platform,
            source,
            editor,
            events,
        }
    }

    async fn run(&mut self) -> FlowReport {
        run_save_flow(&self.platform, &mut self.editor, &FlowSettings::for_platform(30))
            .await
            .unwrap()
    }

    async fn stored(&self) -> Vec<Reminder> {
        match self.source.get_reminders().await {
            Outcome::Success(reminders) => reminders,
            Outcome::Error(message) => panic!("unexpected error: {message}"),
        }
    }

    fn events(&mut self) -> Vec<UiEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

#[tokio::test]
async fn driver_registers_geofence_and_saves() {
    let mut harness = Harness::new(
        FakePermissions::all_granted(),
        FakeSettings::enabled(),
        FakeGeofencing::answering(Ok(())),
        FakePrompter::answering(true),
    );

    assert_eq!(harness.run().await, FlowReport::Saved { geofenced: true });

    let stored = harness.stored().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].title, "milk");

    let requests = harness.geofencing.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].request_id, stored[0].id);
    assert_eq!(requests[0].radius_meters, 100.0);

    let events = harness.events();
    assert!(events.contains(&UiEvent::ShowToast(
        "Geofence added for reminder location corner shop".to_string()
    )));
    assert!(events.contains(&UiEvent::ShowToast("Reminder Saved !".to_string())));
    assert_eq!(events.last(), Some(&UiEvent::NavigateBack));
}

#[tokio::test]
async fn driver_requests_missing_permissions_one_at_a_time() {
    let mut harness = Harness::new(
        FakePermissions {
            grant_on_request: true,
            ..FakePermissions::default()
        },
        FakeSettings::enabled(),
        FakeGeofencing::answering(Ok(())),
        FakePrompter::answering(true),
    );

    assert_eq!(harness.run().await, FlowReport::Saved { geofenced: true });
    assert_eq!(
        harness.permissions.requests.lock().unwrap().as_slice(),
        &[Permission::FineLocation, Permission::BackgroundLocation]
    );
}

#[tokio::test]
async fn driver_bypasses_geofencing_after_denial() {
    let mut harness = Harness::new(
        FakePermissions::default(),
        FakeSettings::enabled(),
        FakeGeofencing::answering(Ok(())),
        FakePrompter::answering(true),
    );

    assert_eq!(harness.run().await, FlowReport::Saved { geofenced: false });
    assert!(harness.geofencing.requests.lock().unwrap().is_empty());
    assert_eq!(harness.editor.geofencing(), GeofencingChoice::Disabled);
    assert_eq!(harness.stored().await.len(), 1);
    assert!(harness.events().contains(&UiEvent::ShowToast(
        "Not geofencing reminder milk at corner shop".to_string()
    )));
}

#[tokio::test]
async fn retry_in_same_session_keeps_the_bypass() {
    let mut harness = Harness::new(
        FakePermissions::default(),
        FakeSettings::enabled(),
        FakeGeofencing::answering(Ok(())),
        FakePrompter::answering(true),
    );

    harness.run().await;
    let requests_after_first = harness.permissions.requests.lock().unwrap().len();
    let prompts_after_first = harness.prompter.prompts.load(Ordering::SeqCst);

    assert_eq!(harness.run().await, FlowReport::Saved { geofenced: false });
    assert_eq!(
        harness.permissions.requests.lock().unwrap().len(),
        requests_after_first
    );
    assert_eq!(
        harness.prompter.prompts.load(Ordering::SeqCst),
        prompts_after_first
    );
}

#[tokio::test]
async fn driver_bypasses_when_location_stays_off() {
    let mut harness = Harness::new(
        FakePermissions::all_granted(),
        FakeSettings {
            statuses: Mutex::new(VecDeque::from([
                SettingsStatus::Resolvable,
                SettingsStatus::Resolvable,
            ])),
            accept_resolution: false,
        },
        FakeGeofencing::answering(Ok(())),
        FakePrompter::answering(true),
    );

    assert_eq!(harness.run().await, FlowReport::Saved { geofenced: false });
    assert!(harness.geofencing.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn driver_stalls_on_registration_failure_without_saving() {
    let mut harness = Harness::new(
        FakePermissions::all_granted(),
        FakeSettings::enabled(),
        FakeGeofencing::answering(Err(GeofenceError::new(None, "1000: "))),
        FakePrompter::answering(true),
    );

    assert_eq!(
        harness.run().await,
        FlowReport::Stalled {
            message: ACCURACY_MESSAGE.to_string(),
        }
    );
    assert!(harness.stored().await.is_empty());
    assert!(harness
        .events()
        .contains(&UiEvent::ShowErrorMessage(ACCURACY_MESSAGE.to_string())));
}

#[tokio::test]
async fn dismissed_rationale_abandons_the_flow() {
    let mut harness = Harness::new(
        FakePermissions {
            rationale: [Permission::FineLocation].into_iter().collect(),
            ..FakePermissions::default()
        },
        FakeSettings::enabled(),
        FakeGeofencing::answering(Ok(())),
        FakePrompter::answering(false),
    );

    assert_eq!(harness.run().await, FlowReport::Abandoned);
    assert!(harness.permissions.requests.lock().unwrap().is_empty());
    assert!(harness.stored().await.is_empty());
}

#[tokio::test]
async fn invalid_candidate_is_rejected_at_persist() {
    let mut harness = Harness::new(
        FakePermissions::all_granted(),
        FakeSettings::enabled(),
        FakeGeofencing::answering(Ok(())),
        FakePrompter::answering(true),
    );
    harness.editor.on_clear();
    harness.editor.set_selected_location("corner shop", 48.1, 11.5);

    assert_eq!(
        harness.run().await,
        FlowReport::Rejected(SaveError::Validation(
            ReminderValidationError::MissingTitle
        ))
    );
    assert!(harness.stored().await.is_empty());
    assert!(harness.events().contains(&UiEvent::ShowSnackbar(
        ReminderValidationError::MissingTitle
    )));
}
