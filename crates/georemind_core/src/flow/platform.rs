//! Platform ports implemented by the UI host.
//!
//! Each method is one asynchronous OS callback of the save flow. Hosts that
//! cannot await natively drive [`crate::flow::machine::SaveFlow`] directly
//! instead (see the FFI crate).

use crate::flow::geofence::{GeofenceError, GeofenceRequest};
use crate::flow::machine::SettingsStatus;
use crate::flow::permission::Permission;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait PermissionService: Send + Sync {
    fn is_granted(&self, permission: Permission) -> bool;
    fn should_show_rationale(&self, permission: Permission) -> bool;
    /// Shows the system permission dialog and reports the user's answer.
    async fn request(&self, permission: Permission) -> bool;
}

#[async_trait]
pub trait LocationSettingsService: Send + Sync {
    async fn check(&self) -> SettingsStatus;
    /// Shows the resolution dialog; `true` when the user turned location on.
    async fn resolve(&self) -> bool;
}

#[async_trait]
pub trait GeofencingService: Send + Sync {
    async fn add_geofence(&self, request: &GeofenceRequest) -> Result<(), GeofenceError>;
}

/// Explanatory prompts. Each returns `false` when the user dismissed the
/// prompt without acting on it.
#[async_trait]
pub trait FlowPrompter: Send + Sync {
    async fn explain_permission(&self, permission: Permission) -> bool;
    async fn notify_permission_denied(&self) -> bool;
    async fn notify_location_settings_required(&self) -> bool;
}

/// Bundle of host services handed to the flow driver.
#[derive(Clone)]
pub struct PlatformServices {
    pub permissions: Arc<dyn PermissionService>,
    pub location_settings: Arc<dyn LocationSettingsService>,
    pub geofencing: Arc<dyn GeofencingService>,
    pub prompter: Arc<dyn FlowPrompter>,
}
