//! Host-side permission facilities used by the capture lifecycle.

use crate::camera::types::PermissionKind;

/// Request identifier the bridge uses when asking the host for the camera
/// permission. Results carrying any other identifier are ignored.
pub const CAMERA_PERMISSION_REQUEST_CODE: i32 = 1;

/// Permission prompt and query surface provided by the host shell.
///
/// `request_permission` is fire-and-forget: the answer comes back later
/// through `CameraBridge::on_permission_result`.
pub trait PermissionHost: Send + Sync {
    /// Whether the permission is currently held by the process.
    fn has_permission(&self, kind: PermissionKind) -> bool;

    /// Ask the host to prompt the user.
    fn request_permission(&self, kind: PermissionKind, request_code: i32);

    /// Show the user why the permission is needed after a denial.
    fn show_rationale(&self, kind: PermissionKind);
}
