//! Mock collaborators for testing the bridge without a real camera, host, or
//! render pipeline.
//!
//! `MockCaptureBackend` uses a builder pattern to configure preview sizes and
//! error injection, and counts device opens/closes so tests can prove that no
//! handle leaks and none is opened twice.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::camera::backend::{CaptureBackend, FrameListener, OutputSurface};
use crate::camera::error::{CameraError, Result};
use crate::camera::permission::PermissionHost;
use crate::camera::types::{
    CaptureSource, DeviceHandle, Extent, PermissionKind, SurfaceId, TransformMatrix,
};
use crate::preview::bridge::RenderSink;

/// Configurable error injection for a specific operation.
#[derive(Debug, Clone)]
struct ErrorInjection {
    operation: &'static str,
    error: CameraError,
}

/// Pops the first injected error for `operation`, if any.
fn take_injected(injections: &mut Vec<ErrorInjection>, operation: &str) -> Result<()> {
    if let Some(pos) = injections.iter().position(|e| e.operation == operation) {
        let injection = injections.remove(pos);
        return Err(injection.error);
    }
    Ok(())
}

/// Mock capture device service.
///
/// Models a single physical device: opening it while a handle is
/// outstanding fails with `DeviceUnavailable`, as a real camera service
/// reports a busy device.
pub struct MockCaptureBackend {
    state: Mutex<MockState>,
}

struct MockState {
    preview_sizes: Vec<Extent>,
    current_preview_size: Extent,
    next_handle: u64,
    open_handle: Option<DeviceHandle>,
    opened_source: Option<CaptureSource>,
    configured_size: Option<Extent>,
    listener: Option<FrameListener>,
    bound_surface: Option<SurfaceId>,
    streaming: bool,
    open_count: usize,
    close_count: usize,
    calls: Vec<&'static str>,
    error_injections: Vec<ErrorInjection>,
}

impl MockCaptureBackend {
    /// A device supporting 640x480, 800x600 and 1280x720, defaulting to
    /// 640x480.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                preview_sizes: vec![
                    Extent::new(640, 480),
                    Extent::new(800, 600),
                    Extent::new(1280, 720),
                ],
                current_preview_size: Extent::new(640, 480),
                next_handle: 1,
                open_handle: None,
                opened_source: None,
                configured_size: None,
                listener: None,
                bound_surface: None,
                streaming: false,
                open_count: 0,
                close_count: 0,
                calls: Vec::new(),
                error_injections: Vec::new(),
            }),
        }
    }

    /// Replace the supported preview sizes (reported in the given order).
    pub fn with_preview_sizes(self, sizes: Vec<Extent>) -> Self {
        self.state.lock().preview_sizes = sizes;
        self
    }

    /// Set the preview size the device reports as its current default.
    pub fn with_current_preview_size(self, size: Extent) -> Self {
        self.state.lock().current_preview_size = size;
        self
    }

    /// Inject an error for a specific operation name. Each injection fires
    /// once.
    ///
    /// Operation names: `"open"`, `"supported_preview_sizes"`,
    /// `"current_preview_size"`, `"set_preview_size"`,
    /// `"set_frame_listener"`, `"bind_surface"`, `"start_stream"`,
    /// `"stop_stream"`, `"close"`.
    pub fn with_error(self, operation: &'static str, error: CameraError) -> Self {
        self.inject_error(operation, error);
        self
    }

    /// Same as [`with_error`](Self::with_error) for a mock already in use.
    pub fn inject_error(&self, operation: &'static str, error: CameraError) {
        self.state
            .lock()
            .error_injections
            .push(ErrorInjection { operation, error });
    }

    /// Simulate the device delivering a frame. Invokes the registered
    /// listener if the stream is running; returns whether it fired.
    pub fn fire_frame(&self) -> bool {
        let listener = {
            let state = self.state.lock();
            if !state.streaming {
                return false;
            }
            state.listener.clone()
        };
        match listener {
            Some(listener) => {
                listener();
                true
            }
            None => false,
        }
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().open_count
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().close_count
    }

    /// Whether a device handle is currently outstanding.
    pub fn is_open(&self) -> bool {
        self.state.lock().open_handle.is_some()
    }

    pub fn is_streaming(&self) -> bool {
        self.state.lock().streaming
    }

    pub fn opened_source(&self) -> Option<CaptureSource> {
        self.state.lock().opened_source
    }

    pub fn configured_size(&self) -> Option<Extent> {
        self.state.lock().configured_size
    }

    pub fn bound_surface(&self) -> Option<SurfaceId> {
        self.state.lock().bound_surface
    }

    /// Names of all operations invoked so far, in call order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().calls.clone()
    }
}

impl Default for MockCaptureBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    /// Log the call and fire any injected error for it.
    fn enter(&mut self, operation: &'static str) -> Result<()> {
        self.calls.push(operation);
        take_injected(&mut self.error_injections, operation)
    }

    fn check_handle(&self, handle: DeviceHandle) -> Result<()> {
        match self.open_handle {
            Some(open) if open == handle => Ok(()),
            _ => Err(CameraError::DeviceNotFound(format!(
                "mock device handle {}",
                handle.0
            ))),
        }
    }
}

impl CaptureBackend for MockCaptureBackend {
    fn open(&self, source: CaptureSource) -> Result<DeviceHandle> {
        let mut state = self.state.lock();
        state.enter("open")?;
        if state.open_handle.is_some() {
            return Err(CameraError::DeviceUnavailable(
                "mock device busy".to_string(),
            ));
        }
        let handle = DeviceHandle(state.next_handle);
        state.next_handle += 1;
        state.open_handle = Some(handle);
        state.opened_source = Some(source);
        state.open_count += 1;
        Ok(handle)
    }

    fn supported_preview_sizes(&self, handle: DeviceHandle) -> Result<Vec<Extent>> {
        let mut state = self.state.lock();
        state.enter("supported_preview_sizes")?;
        state.check_handle(handle)?;
        Ok(state.preview_sizes.clone())
    }

    fn current_preview_size(&self, handle: DeviceHandle) -> Result<Extent> {
        let mut state = self.state.lock();
        state.enter("current_preview_size")?;
        state.check_handle(handle)?;
        Ok(state.current_preview_size)
    }

    fn set_preview_size(&self, handle: DeviceHandle, size: Extent) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("set_preview_size")?;
        state.check_handle(handle)?;
        state.configured_size = Some(size);
        Ok(())
    }

    fn set_frame_listener(&self, handle: DeviceHandle, listener: FrameListener) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("set_frame_listener")?;
        state.check_handle(handle)?;
        state.listener = Some(listener);
        Ok(())
    }

    fn bind_surface(&self, handle: DeviceHandle, surface: SurfaceId) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("bind_surface")?;
        state.check_handle(handle)?;
        state.bound_surface = Some(surface);
        Ok(())
    }

    fn start_stream(&self, handle: DeviceHandle) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("start_stream")?;
        state.check_handle(handle)?;
        if state.bound_surface.is_none() {
            return Err(CameraError::StreamStart("no surface bound".to_string()));
        }
        state.streaming = true;
        Ok(())
    }

    fn stop_stream(&self, handle: DeviceHandle) -> Result<()> {
        let mut state = self.state.lock();
        state.enter("stop_stream")?;
        state.check_handle(handle)?;
        state.streaming = false;
        Ok(())
    }

    fn close(&self, handle: DeviceHandle) -> Result<()> {
        let mut state = self.state.lock();
        state.check_handle(handle)?;
        // The handle is gone even if the service reports an error on close.
        state.open_handle = None;
        state.listener = None;
        state.bound_surface = None;
        state.streaming = false;
        state.close_count += 1;
        state.enter("close")
    }
}

/// Mock output surface with a settable transform.
pub struct MockSurface {
    id: SurfaceId,
    transform: Mutex<TransformMatrix>,
    updates: AtomicU64,
    error_injections: Mutex<Vec<ErrorInjection>>,
}

impl MockSurface {
    pub fn new(id: u64) -> Self {
        Self {
            id: SurfaceId(id),
            transform: Mutex::new(TransformMatrix::IDENTITY),
            updates: AtomicU64::new(0),
            error_injections: Mutex::new(Vec::new()),
        }
    }

    /// Inject a one-shot error for `"update_image"` or `"transform_matrix"`.
    pub fn with_error(self, operation: &'static str, error: CameraError) -> Self {
        self.error_injections
            .lock()
            .push(ErrorInjection { operation, error });
        self
    }

    /// Transform reported for subsequently latched images.
    pub fn set_transform(&self, matrix: TransformMatrix) {
        *self.transform.lock() = matrix;
    }

    /// Number of successful `update_image` calls.
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }
}

impl OutputSurface for MockSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn update_image(&self) -> Result<()> {
        take_injected(&mut self.error_injections.lock(), "update_image")?;
        self.updates.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn transform_matrix(&self) -> Result<TransformMatrix> {
        take_injected(&mut self.error_injections.lock(), "transform_matrix")?;
        Ok(*self.transform.lock())
    }
}

/// Mock host permission facility that records every prompt.
pub struct MockPermissionHost {
    granted: AtomicBool,
    requests: Mutex<Vec<(PermissionKind, i32)>>,
    rationales: AtomicUsize,
}

impl MockPermissionHost {
    /// Host where the permission is already held.
    pub fn granted() -> Self {
        Self::with_granted(true)
    }

    /// Host where the permission has not been granted yet.
    pub fn denied() -> Self {
        Self::with_granted(false)
    }

    fn with_granted(granted: bool) -> Self {
        Self {
            granted: AtomicBool::new(granted),
            requests: Mutex::new(Vec::new()),
            rationales: AtomicUsize::new(0),
        }
    }

    /// Change what `has_permission` reports, e.g. after the user toggles
    /// the permission in system settings.
    pub fn set_granted(&self, granted: bool) {
        self.granted.store(granted, Ordering::Relaxed);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<(PermissionKind, i32)> {
        self.requests.lock().clone()
    }

    pub fn rationale_count(&self) -> usize {
        self.rationales.load(Ordering::Relaxed)
    }
}

impl PermissionHost for MockPermissionHost {
    fn has_permission(&self, _kind: PermissionKind) -> bool {
        self.granted.load(Ordering::Relaxed)
    }

    fn request_permission(&self, kind: PermissionKind, request_code: i32) {
        self.requests.lock().push((kind, request_code));
    }

    fn show_rationale(&self, _kind: PermissionKind) {
        self.rationales.fetch_add(1, Ordering::Relaxed);
    }
}

/// Render sink that records every published transform.
#[derive(Default)]
pub struct RecordingRenderSink {
    published: Mutex<Vec<(TransformMatrix, u32, u32)>>,
}

impl RecordingRenderSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().len()
    }

    pub fn published(&self) -> Vec<(TransformMatrix, u32, u32)> {
        self.published.lock().clone()
    }

    pub fn last(&self) -> Option<(TransformMatrix, u32, u32)> {
        self.published.lock().last().copied()
    }
}

impl RenderSink for RecordingRenderSink {
    fn publish_transform(&self, matrix: &TransformMatrix, width: u32, height: u32) {
        self.published.lock().push((*matrix, width, height));
    }
}

/// Shared handles to a full set of mocks, as most bridge tests need them.
pub struct MockRig {
    pub backend: Arc<MockCaptureBackend>,
    pub permissions: Arc<MockPermissionHost>,
    pub sink: Arc<RecordingRenderSink>,
    pub surface: Arc<MockSurface>,
}

impl MockRig {
    pub fn new(backend: MockCaptureBackend, permissions: MockPermissionHost) -> Self {
        Self {
            backend: Arc::new(backend),
            permissions: Arc::new(permissions),
            sink: Arc::new(RecordingRenderSink::new()),
            surface: Arc::new(MockSurface::new(7)),
        }
    }
}
