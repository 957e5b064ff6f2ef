//! `CameraBridge` ties the capture lifecycle, the frame-ready signal and the
//! transform cache together behind the host/render-facing API.
//!
//! Three contexts call in: the host's control thread (lifecycle and
//! permission callbacks), the device's capture thread (frame notifications,
//! routed straight into the `FrameReadySignal`), and the render thread
//! (`update_image`, once per tick).

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::camera::backend::{CaptureBackend, OutputSurface};
use crate::camera::error::Result;
use crate::camera::lifecycle::CaptureLifecycle;
use crate::camera::permission::PermissionHost;
use crate::camera::types::{CaptureSource, Extent, LifecycleState, PermissionState, TransformMatrix};
use crate::diagnostics::stats::{DiagnosticSnapshot, DiagnosticStats};
use crate::preview::signal::FrameReadySignal;
use crate::preview::transform::TransformCache;
use crate::settings::types::BridgeConfig;

/// Render pipeline entry point for texture-coordinate transforms.
pub trait RenderSink: Send + Sync {
    /// Called at most once per drained frame, only when the transform
    /// changed. `width`/`height` are the negotiated preview resolution;
    /// consumers key cached state on them.
    fn publish_transform(&self, matrix: &TransformMatrix, width: u32, height: u32);
}

/// Render-thread state.
struct RenderState {
    cache: TransformCache,
    /// Lifecycle open generation the cache was last filled under.
    generation: u64,
    stats: DiagnosticStats,
}

/// Camera-to-render bridge for a single capture device.
pub struct CameraBridge<B: CaptureBackend> {
    config: BridgeConfig,
    signal: Arc<FrameReadySignal>,
    lifecycle: Mutex<CaptureLifecycle<B>>,
    render: Mutex<RenderState>,
    sink: Arc<dyn RenderSink>,
}

impl<B: CaptureBackend> CameraBridge<B> {
    /// Store the configuration and collaborators. Does not open the device.
    pub fn new(
        config: BridgeConfig,
        backend: Arc<B>,
        permissions: Arc<dyn PermissionHost>,
        sink: Arc<dyn RenderSink>,
    ) -> Self {
        let signal = Arc::new(FrameReadySignal::new());
        let lifecycle =
            CaptureLifecycle::new(&config, backend, permissions, Arc::clone(&signal));
        Self {
            config,
            signal,
            lifecycle: Mutex::new(lifecycle),
            render: Mutex::new(RenderState {
                cache: TransformCache::new(),
                generation: 0,
                stats: DiagnosticStats::new(),
            }),
            sink,
        }
    }

    /// Bind the render pipeline's surface and make sure the device streams
    /// into it. Returns the negotiated resolution for surface sizing.
    pub fn create_output(&self, surface: Arc<dyn OutputSurface>) -> Result<Extent> {
        self.lifecycle.lock().attach_surface(surface)
    }

    pub fn resume(&self) -> Result<()> {
        self.lifecycle.lock().resume()
    }

    pub fn pause(&self) {
        self.lifecycle.lock().pause();
    }

    pub fn release(&self) {
        self.lifecycle.lock().release();
    }

    pub fn on_permission_result(&self, granted: bool) -> Result<()> {
        self.lifecycle.lock().on_permission_result(granted)
    }

    /// Host permission callback. Results for request codes the bridge did
    /// not issue are ignored.
    pub fn on_request_permissions_result(&self, request_code: i32, granted: bool) -> Result<()> {
        if request_code != self.config.permission_request_code {
            debug!("ignoring permission result for foreign request code {request_code}");
            return Ok(());
        }
        self.on_permission_result(granted)
    }

    /// Render tick. Returns `true` when a new camera image was latched into
    /// the texture this tick.
    ///
    /// Publishes the transform to the render sink only if it changed. Never
    /// fails: surface errors degrade to "no new image this tick".
    pub fn update_image(&self) -> bool {
        let (surface, resolution, generation) = {
            let lifecycle = self.lifecycle.lock();
            if lifecycle.state() != LifecycleState::Ready {
                return false;
            }
            match (lifecycle.surface(), lifecycle.selected_resolution()) {
                (Some(surface), Some(resolution)) => (
                    Arc::clone(surface),
                    resolution,
                    lifecycle.open_generation(),
                ),
                _ => return false,
            }
        };

        let drained = self.signal.drain_count();
        if drained == 0 {
            return false;
        }
        trace!("drained {drained} frame notification(s)");

        // The sink is host code and may query the bridge, so it is called
        // with no lock held.
        let changed = {
            let mut render = self.render.lock();
            let matrix = match latch(surface.as_ref()) {
                Ok(matrix) => matrix,
                Err(e) => {
                    warn!("camera frame dropped: {e}");
                    render.stats.record_failure();
                    return false;
                }
            };
            render.stats.record_update(drained, resolution);

            if render.generation != generation {
                render.cache.reset();
                render.generation = generation;
            }
            if render.cache.observe(&matrix) {
                render.stats.record_publish();
                Some(matrix)
            } else {
                None
            }
        };

        if let Some(matrix) = changed {
            debug!("camera transform changed at {resolution}");
            self.sink
                .publish_transform(&matrix, resolution.width, resolution.height);
        }
        true
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.lock().state()
    }

    pub fn permission(&self) -> PermissionState {
        self.lifecycle.lock().permission()
    }

    pub fn selected_resolution(&self) -> Option<Extent> {
        self.lifecycle.lock().selected_resolution()
    }

    pub fn source(&self) -> CaptureSource {
        self.config.source
    }

    pub fn requested_extent(&self) -> Extent {
        self.config.requested_extent
    }

    /// Last transform published to the render sink.
    pub fn transform_matrix(&self) -> Option<TransformMatrix> {
        self.render.lock().cache.last_published()
    }

    /// Producer handle for hosts that receive frame notifications outside
    /// the `CaptureBackend` listener.
    pub fn frame_signal(&self) -> Arc<FrameReadySignal> {
        Arc::clone(&self.signal)
    }

    pub fn diagnostics(&self) -> DiagnosticSnapshot {
        self.render
            .lock()
            .stats
            .snapshot(self.signal.total_signaled())
    }
}

/// Latch the newest image and read its transform.
fn latch(surface: &dyn OutputSurface) -> Result<TransformMatrix> {
    surface.update_image()?;
    surface.transform_matrix()
}
