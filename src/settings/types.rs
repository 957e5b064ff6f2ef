use serde::{Deserialize, Serialize};

use crate::camera::permission::CAMERA_PERMISSION_REQUEST_CODE;
use crate::camera::types::{CaptureSource, Extent};

/// Default negotiation target when the host does not supply one.
pub const DEFAULT_REQUESTED_EXTENT: Extent = Extent::new(1280, 720);

/// Immutable bridge configuration: which camera to open and the render
/// surface size to negotiate against, plus the permission request code.
///
/// Every field has a default, so a partial JSON document is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeConfig {
    pub source: CaptureSource,
    pub requested_extent: Extent,
    pub permission_request_code: i32,
}

impl BridgeConfig {
    /// Configuration for `source` negotiated against `requested_extent`,
    /// with the default permission request code.
    pub fn new(source: CaptureSource, requested_extent: Extent) -> Self {
        Self {
            source,
            requested_extent,
            ..Self::default()
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            source: CaptureSource::Front,
            requested_extent: DEFAULT_REQUESTED_EXTENT,
            permission_request_code: CAMERA_PERMISSION_REQUEST_CODE,
        }
    }
}
