//! Location permissions required before a geofence can be registered.

/// First platform API level (Android 10) that gates background location
/// behind its own permission.
pub const BACKGROUND_LOCATION_MIN_SDK: u32 = 29;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    FineLocation,
    BackgroundLocation,
}

impl Permission {
    /// Platform permission string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FineLocation => "android.permission.ACCESS_FINE_LOCATION",
            Self::BackgroundLocation => "android.permission.ACCESS_BACKGROUND_LOCATION",
        }
    }
}

/// Permissions to walk, in request order, for the given platform API level.
///
/// Foreground access is always requested first; newer platforms reject a
/// background request made before it is granted.
pub fn required_permissions(sdk_int: u32) -> Vec<Permission> {
    let mut permissions = vec![Permission::FineLocation];
    if sdk_int >= BACKGROUND_LOCATION_MIN_SDK {
        permissions.push(Permission::BackgroundLocation);
    }
    permissions
}
