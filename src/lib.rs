//! Camera-to-render bridge.
//!
//! Moves live camera frames from a platform capture device into a texture
//! consumed by a real-time render loop. The crate coordinates the capture
//! device lifecycle and permission flow, negotiates the preview resolution,
//! coalesces frame notifications from the capture thread, and republishes
//! the texture transform to the render pipeline only when it changes.
//!
//! Hosts provide the platform pieces through [`CaptureBackend`],
//! [`OutputSurface`], [`PermissionHost`] and [`RenderSink`], then drive a
//! [`CameraBridge`] from their lifecycle callbacks and render loop.

pub mod camera;
pub mod diagnostics;
pub mod preview;
pub mod settings;

pub use camera::backend::{CaptureBackend, FrameListener, OutputSurface};
pub use camera::error::{CameraError, Result};
pub use camera::lifecycle::CaptureLifecycle;
pub use camera::permission::{PermissionHost, CAMERA_PERMISSION_REQUEST_CODE};
pub use camera::types::{
    CaptureSource, DeviceHandle, Extent, LifecycleState, PermissionKind, PermissionState,
    SurfaceId, TransformMatrix,
};
pub use diagnostics::stats::DiagnosticSnapshot;
pub use preview::bridge::{CameraBridge, RenderSink};
pub use preview::signal::FrameReadySignal;
pub use preview::transform::TransformCache;
pub use settings::types::BridgeConfig;

use std::sync::Arc;

use camera::synthetic::SyntheticCaptureBackend;

/// Create a bridge over the synthetic camera when `SYNTHETIC_CAMERA=1` is
/// set, so hosts can run without camera hardware. Returns `None` otherwise
/// and the host wires its platform backend as usual.
pub fn synthetic_bridge_from_env(
    config: BridgeConfig,
    permissions: Arc<dyn PermissionHost>,
    sink: Arc<dyn RenderSink>,
) -> Option<CameraBridge<SyntheticCaptureBackend>> {
    synthetic_bridge(
        SyntheticCaptureBackend::is_enabled(),
        config,
        permissions,
        sink,
    )
}

fn synthetic_bridge(
    enabled: bool,
    config: BridgeConfig,
    permissions: Arc<dyn PermissionHost>,
    sink: Arc<dyn RenderSink>,
) -> Option<CameraBridge<SyntheticCaptureBackend>> {
    if !enabled {
        return None;
    }
    tracing::info!("using synthetic {} camera", config.source);
    Some(CameraBridge::new(
        config,
        Arc::new(SyntheticCaptureBackend::new()),
        permissions,
        sink,
    ))
}
