//! Capture device lifecycle and permission state machine.
//!
//! `CaptureLifecycle` is the only owner of the capture device handle. Every
//! public operation is defined for every state, so the host may deliver
//! lifecycle callbacks in any order without the bridge leaking a handle or
//! releasing one twice.
//!
//! ```text
//!   Uninitialized ──resume (no permission)──▶ AwaitingPermission
//!        │                                      │  ▲
//!        └──resume (granted)──▶ Ready ◀─granted─┘  │ open failure
//!                                │  ▲              │
//!                           pause│  │resume ───────┘
//!                                ▼  │
//!                               Paused
//!   any state ──release──▶ Released (inert)
//! ```

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::camera::backend::{CaptureBackend, OutputSurface};
use crate::camera::error::{CameraError, Result};
use crate::camera::permission::PermissionHost;
use crate::camera::resolution;
use crate::camera::types::{
    CaptureSource, DeviceHandle, Extent, LifecycleState, PermissionKind, PermissionState,
    SurfaceId,
};
use crate::preview::signal::FrameReadySignal;
use crate::settings::types::BridgeConfig;

/// An open device handle and whether its stream is running.
#[derive(Debug, Clone, Copy)]
struct OpenDevice {
    handle: DeviceHandle,
    streaming: bool,
}

/// State machine owning the capture device.
pub struct CaptureLifecycle<B: CaptureBackend> {
    backend: Arc<B>,
    permissions: Arc<dyn PermissionHost>,
    signal: Arc<FrameReadySignal>,
    source: CaptureSource,
    requested: Extent,
    request_code: i32,
    state: LifecycleState,
    permission: PermissionState,
    device: Option<OpenDevice>,
    surface: Option<Arc<dyn OutputSurface>>,
    selected: Option<Extent>,
    /// Set once `request_permission` has been issued for the current
    /// AwaitingPermission entry.
    permission_requested: bool,
    /// Set once the denial rationale has been shown. Never cleared.
    rationale_shown: bool,
    /// Bumped on every successful open.
    open_generation: u64,
}

impl<B: CaptureBackend> CaptureLifecycle<B> {
    /// Create a lifecycle in `Uninitialized`. Does not touch the device.
    ///
    /// Frame notifications from the device are routed into `signal`.
    pub fn new(
        config: &BridgeConfig,
        backend: Arc<B>,
        permissions: Arc<dyn PermissionHost>,
        signal: Arc<FrameReadySignal>,
    ) -> Self {
        Self {
            backend,
            permissions,
            signal,
            source: config.source,
            requested: config.requested_extent,
            request_code: config.permission_request_code,
            state: LifecycleState::Uninitialized,
            permission: PermissionState::Unknown,
            device: None,
            surface: None,
            selected: None,
            permission_requested: false,
            rationale_shown: false,
            open_generation: 0,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    pub fn source(&self) -> CaptureSource {
        self.source
    }

    /// Resolution negotiated by the most recent successful open.
    pub fn selected_resolution(&self) -> Option<Extent> {
        self.selected
    }

    /// The output surface frames are streamed into, once attached.
    pub fn surface(&self) -> Option<&Arc<dyn OutputSurface>> {
        self.surface.as_ref()
    }

    /// Number of successful opens so far. Lets the render side notice that
    /// the device was reconfigured between two frames.
    pub fn open_generation(&self) -> u64 {
        self.open_generation
    }

    /// Whether a device handle is currently held.
    pub fn has_device(&self) -> bool {
        self.device.is_some()
    }

    /// Whether the stream into the attached surface is running.
    pub fn is_streaming(&self) -> bool {
        self.device.is_some_and(|d| d.streaming)
    }

    /// Host became visible. Opens the device when permission is held,
    /// otherwise waits for it, prompting at most once per wait.
    ///
    /// Returns `RecoverableOpen` if the open sequence failed; the lifecycle
    /// is then back in `AwaitingPermission` and a later resume retries.
    pub fn resume(&mut self) -> Result<()> {
        match self.state {
            LifecycleState::Released => {
                debug!("resume ignored: capture lifecycle released");
                Ok(())
            }
            LifecycleState::Ready => Ok(()),
            LifecycleState::Uninitialized
            | LifecycleState::Paused
            | LifecycleState::AwaitingPermission => {
                self.refresh_permission();
                if self.permission == PermissionState::Granted {
                    self.open_device()
                } else {
                    self.await_permission();
                    Ok(())
                }
            }
        }
    }

    /// Host went to the background. Stops the stream and closes the device
    /// if one is open; a no-op otherwise.
    pub fn pause(&mut self) {
        match self.state {
            LifecycleState::Ready => {
                self.release_device();
                self.set_state(LifecycleState::Paused);
            }
            // A permission prompt backgrounds the host; keep waiting so the
            // pending request is not repeated on the way back.
            LifecycleState::Uninitialized
            | LifecycleState::AwaitingPermission
            | LifecycleState::Paused
            | LifecycleState::Released => {
                debug!("pause in {:?}: nothing to release", self.state);
            }
        }
    }

    /// Tear down for good. Further calls are no-ops.
    pub fn release(&mut self) {
        if self.state == LifecycleState::Released {
            return;
        }
        self.release_device();
        self.surface = None;
        self.set_state(LifecycleState::Released);
    }

    /// Answer to a permission prompt.
    ///
    /// A grant while waiting runs the open sequence. A denial leaves the
    /// state as is and shows the rationale, once per lifecycle.
    pub fn on_permission_result(&mut self, granted: bool) -> Result<()> {
        if self.state == LifecycleState::Released {
            debug!("permission result ignored: capture lifecycle released");
            return Ok(());
        }

        if granted {
            info!("{} camera permission granted", self.source);
            self.permission = PermissionState::Granted;
            if self.state == LifecycleState::AwaitingPermission {
                return self.open_device();
            }
            return Ok(());
        }

        info!("{} camera permission denied", self.source);
        self.permission = PermissionState::Denied;
        if !self.rationale_shown {
            self.rationale_shown = true;
            self.permissions.show_rationale(PermissionKind::Camera);
        }
        Ok(())
    }

    /// Attach the surface frames should be streamed into and make sure the
    /// device is streaming into it.
    ///
    /// Returns the negotiated resolution, or `CouldNotOpen` when no
    /// streaming device can be produced right now. The surface is kept in
    /// that case and bound by the next successful open.
    pub fn attach_surface(&mut self, surface: Arc<dyn OutputSurface>) -> Result<Extent> {
        match self.state {
            LifecycleState::Released => Err(CameraError::CouldNotOpen(
                "capture lifecycle released".to_string(),
            )),
            LifecycleState::Paused => {
                self.surface = Some(surface);
                Err(CameraError::CouldNotOpen("capture is paused".to_string()))
            }
            LifecycleState::Ready => {
                let id = surface.id();
                self.surface = Some(surface);
                match self.device.map(|d| d.handle) {
                    Some(handle) => {
                        if let Err(e) = self.bind_and_start(handle, id) {
                            self.release_device();
                            let err = self.roll_back(e);
                            return Err(CameraError::CouldNotOpen(err.to_string()));
                        }
                    }
                    None => self
                        .open_device()
                        .map_err(|e| CameraError::CouldNotOpen(e.to_string()))?,
                }
                self.negotiated()
            }
            LifecycleState::Uninitialized | LifecycleState::AwaitingPermission => {
                self.surface = Some(surface);
                self.refresh_permission();
                if self.permission != PermissionState::Granted {
                    return Err(CameraError::CouldNotOpen(
                        "camera permission not granted".to_string(),
                    ));
                }
                self.open_device()
                    .map_err(|e| CameraError::CouldNotOpen(e.to_string()))?;
                self.negotiated()
            }
        }
    }

    fn negotiated(&self) -> Result<Extent> {
        self.selected.ok_or_else(|| {
            CameraError::CouldNotOpen("no preview resolution negotiated".to_string())
        })
    }

    /// Pick up a grant made outside the prompt flow (e.g. system settings).
    /// Denials only arrive through `on_permission_result`.
    fn refresh_permission(&mut self) {
        if self.permission != PermissionState::Granted
            && self.permissions.has_permission(PermissionKind::Camera)
        {
            self.permission = PermissionState::Granted;
        }
    }

    fn await_permission(&mut self) {
        if self.state != LifecycleState::AwaitingPermission {
            self.enter_awaiting();
        }
        if !self.permission_requested {
            self.permission_requested = true;
            info!("requesting {} camera permission", self.source);
            self.permissions
                .request_permission(PermissionKind::Camera, self.request_code);
        }
    }

    fn enter_awaiting(&mut self) {
        self.set_state(LifecycleState::AwaitingPermission);
        self.permission_requested = false;
    }

    /// Open, configure, and (if a surface is attached) start streaming.
    /// Transitions to `Ready` on success; any failure releases the handle
    /// and rolls back to `AwaitingPermission`.
    fn open_device(&mut self) -> Result<()> {
        let handle = match self.backend.open(self.source) {
            Ok(handle) => handle,
            Err(e) => return Err(self.roll_back(e)),
        };
        self.device = Some(OpenDevice {
            handle,
            streaming: false,
        });

        // Notifications left over from a previous session are not new
        // images for this one. Nothing can signal until `configure`
        // installs the listener.
        let stale = self.signal.drain_count();
        if stale > 0 {
            debug!("discarded {stale} stale frame notification(s)");
        }

        match self.configure(handle) {
            Ok(selected) => {
                self.selected = Some(selected);
                self.open_generation += 1;
                self.permission_requested = false;
                info!(
                    "{} camera opened at {selected} (requested {})",
                    self.source, self.requested
                );
                self.set_state(LifecycleState::Ready);
                Ok(())
            }
            Err(e) => {
                self.release_device();
                Err(self.roll_back(e))
            }
        }
    }

    fn configure(&mut self, handle: DeviceHandle) -> Result<Extent> {
        let mut sizes = self.backend.supported_preview_sizes(handle)?;
        resolution::sort_by_width(&mut sizes);
        let default = self.backend.current_preview_size(handle)?;
        let selected = resolution::select(self.requested.width, &sizes, default)?;
        self.backend.set_preview_size(handle, selected)?;

        let signal = Arc::clone(&self.signal);
        self.backend
            .set_frame_listener(handle, Arc::new(move || signal.signal()))?;

        if let Some(id) = self.surface.as_ref().map(|s| s.id()) {
            self.bind_and_start(handle, id)?;
        }
        Ok(selected)
    }

    fn bind_and_start(&mut self, handle: DeviceHandle, surface: SurfaceId) -> Result<()> {
        if self.is_streaming() {
            // Stopped or not, the stream is not retried on this handle.
            self.mark_streaming(false);
            self.backend.stop_stream(handle)?;
        }
        self.backend.bind_surface(handle, surface)?;
        self.backend.start_stream(handle)?;
        self.mark_streaming(true);
        Ok(())
    }

    fn mark_streaming(&mut self, streaming: bool) {
        if let Some(device) = self.device.as_mut() {
            device.streaming = streaming;
        }
    }

    fn roll_back(&mut self, cause: CameraError) -> CameraError {
        warn!("{} camera open failed, waiting for retry: {cause}", self.source);
        self.enter_awaiting();
        CameraError::RecoverableOpen(cause.to_string())
    }

    /// Stop and close the device if one is held. Errors are logged; the
    /// handle is considered gone either way.
    fn release_device(&mut self) {
        let Some(device) = self.device.take() else {
            return;
        };
        if device.streaming {
            if let Err(e) = self.backend.stop_stream(device.handle) {
                warn!("failed to stop {} camera stream: {e}", self.source);
            }
        }
        if let Err(e) = self.backend.close(device.handle) {
            warn!("failed to close {} camera: {e}", self.source);
        }
        debug!("{} camera handle {} released", self.source, device.handle.0);
    }

    fn set_state(&mut self, next: LifecycleState) {
        if self.state != next {
            info!("{} camera: {:?} -> {:?}", self.source, self.state, next);
            self.state = next;
        }
    }
}

impl<B: CaptureBackend> Drop for CaptureLifecycle<B> {
    fn drop(&mut self) {
        self.release_device();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::mock::{MockCaptureBackend, MockPermissionHost, MockSurface};
    use crate::camera::permission::CAMERA_PERMISSION_REQUEST_CODE;

    struct Harness {
        backend: Arc<MockCaptureBackend>,
        host: Arc<MockPermissionHost>,
        signal: Arc<FrameReadySignal>,
        lifecycle: CaptureLifecycle<MockCaptureBackend>,
    }

    fn harness(backend: MockCaptureBackend, host: MockPermissionHost) -> Harness {
        harness_requesting(Extent::new(720, 480), backend, host)
    }

    fn harness_requesting(
        requested: Extent,
        backend: MockCaptureBackend,
        host: MockPermissionHost,
    ) -> Harness {
        let backend = Arc::new(backend);
        let host = Arc::new(host);
        let signal = Arc::new(FrameReadySignal::new());
        let config = BridgeConfig::new(CaptureSource::Front, requested);
        let lifecycle = CaptureLifecycle::new(
            &config,
            Arc::clone(&backend),
            Arc::clone(&host) as Arc<dyn PermissionHost>,
            Arc::clone(&signal),
        );
        Harness {
            backend,
            host,
            signal,
            lifecycle,
        }
    }

    fn surface() -> Arc<dyn OutputSurface> {
        Arc::new(MockSurface::new(9))
    }

    #[test]
    fn starts_uninitialized_without_touching_device() {
        let h = harness(MockCaptureBackend::new(), MockPermissionHost::granted());
        assert_eq!(h.lifecycle.state(), LifecycleState::Uninitialized);
        assert_eq!(h.lifecycle.permission(), PermissionState::Unknown);
        assert!(!h.lifecycle.has_device());
        assert!(h.backend.calls().is_empty());
    }

    #[test]
    fn resume_with_permission_opens_and_negotiates() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::granted());
        h.lifecycle.resume().unwrap();

        assert_eq!(h.lifecycle.state(), LifecycleState::Ready);
        assert_eq!(h.lifecycle.selected_resolution(), Some(Extent::new(800, 600)));
        assert_eq!(h.backend.configured_size(), Some(Extent::new(800, 600)));
        assert_eq!(h.backend.opened_source(), Some(CaptureSource::Front));
        assert_eq!(h.backend.open_count(), 1);
        assert_eq!(h.lifecycle.open_generation(), 1);
        assert_eq!(h.host.request_count(), 0);
    }

    #[test]
    fn unsorted_platform_sizes_are_sorted_before_selection() {
        let backend = MockCaptureBackend::new().with_preview_sizes(vec![
            Extent::new(1920, 1080),
            Extent::new(1280, 720),
            Extent::new(800, 600),
            Extent::new(640, 480),
        ]);
        let mut h = harness(backend, MockPermissionHost::granted());
        h.lifecycle.resume().unwrap();
        assert_eq!(h.lifecycle.selected_resolution(), Some(Extent::new(800, 600)));
    }

    #[test]
    fn request_wider_than_any_size_falls_back_to_current_default() {
        let backend =
            MockCaptureBackend::new().with_current_preview_size(Extent::new(800, 600));
        let mut h = harness_requesting(
            Extent::new(4000, 3000),
            backend,
            MockPermissionHost::granted(),
        );
        h.lifecycle.resume().unwrap();

        assert_eq!(h.lifecycle.state(), LifecycleState::Ready);
        assert_eq!(h.lifecycle.selected_resolution(), Some(Extent::new(800, 600)));
        assert_eq!(h.backend.configured_size(), Some(Extent::new(800, 600)));
    }

    #[test]
    fn resume_without_permission_requests_it_once() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::denied());
        h.lifecycle.resume().unwrap();
        h.lifecycle.resume().unwrap();
        h.lifecycle.resume().unwrap();

        assert_eq!(h.lifecycle.state(), LifecycleState::AwaitingPermission);
        assert_eq!(
            h.host.requests(),
            vec![(PermissionKind::Camera, CAMERA_PERMISSION_REQUEST_CODE)]
        );
        assert_eq!(h.backend.open_count(), 0);
    }

    #[test]
    fn deny_then_grant_reaches_ready_with_single_open() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::denied());
        h.lifecycle.resume().unwrap();
        h.lifecycle.on_permission_result(false).unwrap();
        assert_eq!(h.lifecycle.permission(), PermissionState::Denied);
        assert_eq!(h.lifecycle.state(), LifecycleState::AwaitingPermission);

        h.lifecycle.resume().unwrap();
        h.lifecycle.on_permission_result(true).unwrap();

        assert_eq!(h.lifecycle.state(), LifecycleState::Ready);
        assert_eq!(h.backend.open_count(), 1);

        // A late resume after the grant must not reopen.
        h.lifecycle.resume().unwrap();
        assert_eq!(h.backend.open_count(), 1);
    }

    #[test]
    fn rationale_is_shown_once_per_lifetime() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::denied());
        h.lifecycle.resume().unwrap();
        h.lifecycle.on_permission_result(false).unwrap();
        h.lifecycle.on_permission_result(false).unwrap();
        assert_eq!(h.host.rationale_count(), 1);

        h.lifecycle.on_permission_result(true).unwrap();
        h.lifecycle.pause();
        h.lifecycle.on_permission_result(false).unwrap();
        assert_eq!(h.host.rationale_count(), 1);
    }

    #[test]
    fn grant_made_in_system_settings_is_picked_up_on_resume() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::denied());
        h.lifecycle.resume().unwrap();
        h.host.set_granted(true);
        h.lifecycle.resume().unwrap();
        assert_eq!(h.lifecycle.state(), LifecycleState::Ready);
        assert_eq!(h.host.request_count(), 1);
    }

    #[test]
    fn open_failure_rolls_back_without_leaking() {
        let backend = MockCaptureBackend::new().with_error(
            "start_stream",
            CameraError::StreamStart("injected".to_string()),
        );
        let mut h = harness(backend, MockPermissionHost::granted());
        let _ = h.lifecycle.attach_surface(surface());
        // attach_surface consumed the injected failure on its own open.
        assert_eq!(h.lifecycle.state(), LifecycleState::AwaitingPermission);
        assert!(!h.backend.is_open());
        assert_eq!(h.backend.open_count(), 1);
        assert_eq!(h.backend.close_count(), 1);

        h.lifecycle.resume().unwrap();
        assert_eq!(h.lifecycle.state(), LifecycleState::Ready);
        assert!(h.backend.is_streaming());
    }

    #[test]
    fn resume_reports_recoverable_open_error() {
        let backend = MockCaptureBackend::new().with_error(
            "set_preview_size",
            CameraError::DeviceUnavailable("camera service died".to_string()),
        );
        let mut h = harness(backend, MockPermissionHost::granted());

        let result = h.lifecycle.resume();
        assert!(matches!(result, Err(CameraError::RecoverableOpen(_))));
        assert_eq!(h.lifecycle.state(), LifecycleState::AwaitingPermission);
        assert!(!h.backend.is_open());
        assert_eq!(h.host.request_count(), 0);
    }

    #[test]
    fn busy_device_fails_open_without_close() {
        let backend = MockCaptureBackend::new().with_error(
            "open",
            CameraError::DeviceUnavailable("in use by another app".to_string()),
        );
        let mut h = harness(backend, MockPermissionHost::granted());

        assert!(h.lifecycle.resume().is_err());
        assert_eq!(h.backend.close_count(), 0);
        assert!(!h.lifecycle.has_device());

        h.lifecycle.resume().unwrap();
        assert_eq!(h.lifecycle.state(), LifecycleState::Ready);
    }

    #[test]
    fn empty_size_list_is_recoverable() {
        let backend = MockCaptureBackend::new().with_preview_sizes(vec![]);
        let mut h = harness(backend, MockPermissionHost::granted());

        let result = h.lifecycle.resume();
        assert_eq!(
            result,
            Err(CameraError::RecoverableOpen(
                CameraError::NoCandidate.to_string()
            ))
        );
        assert!(!h.backend.is_open());
        assert_eq!(h.lifecycle.selected_resolution(), None);
    }

    #[test]
    fn pause_releases_device_and_is_idempotent() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::granted());
        h.lifecycle.attach_surface(surface()).unwrap();
        h.lifecycle.pause();

        assert_eq!(h.lifecycle.state(), LifecycleState::Paused);
        assert!(!h.backend.is_open());
        assert!(h.backend.calls().contains(&"stop_stream"));

        h.lifecycle.pause();
        assert_eq!(h.backend.close_count(), 1);
    }

    #[test]
    fn pause_resume_cycles_balance_opens_and_closes() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::granted());
        h.lifecycle.attach_surface(surface()).unwrap();
        for _ in 0..5 {
            h.lifecycle.pause();
            h.lifecycle.resume().unwrap();
        }
        assert_eq!(h.lifecycle.state(), LifecycleState::Ready);
        assert_eq!(h.backend.open_count(), 6);
        assert_eq!(h.backend.close_count(), 5);
        assert_eq!(h.lifecycle.open_generation(), 6);
        assert!(h.backend.is_streaming());
    }

    #[test]
    fn resume_while_ready_is_noop() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::granted());
        h.lifecycle.resume().unwrap();
        h.lifecycle.resume().unwrap();
        assert_eq!(h.backend.open_count(), 1);
    }

    #[test]
    fn release_is_terminal_and_inert() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::granted());
        h.lifecycle.resume().unwrap();
        h.lifecycle.release();
        assert_eq!(h.lifecycle.state(), LifecycleState::Released);
        assert_eq!(h.backend.close_count(), 1);

        h.lifecycle.pause();
        h.lifecycle.release();
        h.lifecycle.resume().unwrap();
        h.lifecycle.on_permission_result(true).unwrap();
        h.lifecycle.on_permission_result(false).unwrap();

        assert_eq!(h.lifecycle.state(), LifecycleState::Released);
        assert_eq!(h.backend.open_count(), 1);
        assert_eq!(h.backend.close_count(), 1);
        assert_eq!(h.host.rationale_count(), 0);
        assert!(matches!(
            h.lifecycle.attach_surface(surface()),
            Err(CameraError::CouldNotOpen(_))
        ));
    }

    #[test]
    fn release_before_anything_opened_is_safe() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::denied());
        h.lifecycle.release();
        h.lifecycle.pause();
        assert_eq!(h.lifecycle.state(), LifecycleState::Released);
        assert!(h.backend.calls().is_empty());
    }

    #[test]
    fn close_error_during_pause_still_drops_handle() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::granted());
        h.lifecycle.resume().unwrap();
        h.backend.inject_error(
            "close",
            CameraError::DeviceUnavailable("injected".to_string()),
        );
        h.lifecycle.pause();
        assert_eq!(h.lifecycle.state(), LifecycleState::Paused);
        assert!(!h.lifecycle.has_device());

        h.lifecycle.resume().unwrap();
        assert_eq!(h.lifecycle.state(), LifecycleState::Ready);
    }

    #[test]
    fn pause_while_awaiting_keeps_waiting_without_reprompt() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::denied());
        h.lifecycle.resume().unwrap();
        h.lifecycle.pause();
        assert_eq!(h.lifecycle.state(), LifecycleState::AwaitingPermission);
        h.lifecycle.resume().unwrap();
        assert_eq!(h.host.request_count(), 1);
    }

    #[test]
    fn grant_while_paused_waits_for_resume() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::granted());
        h.lifecycle.resume().unwrap();
        h.lifecycle.pause();
        h.lifecycle.on_permission_result(true).unwrap();
        assert_eq!(h.lifecycle.state(), LifecycleState::Paused);
        assert_eq!(h.backend.open_count(), 1);
    }

    #[test]
    fn revoked_permission_on_resume_from_pause_keeps_recorded_grant() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::granted());
        h.lifecycle.resume().unwrap();
        h.lifecycle.pause();
        h.host.set_granted(false);
        h.lifecycle.resume().unwrap();
        assert_eq!(h.lifecycle.state(), LifecycleState::Ready);
    }

    #[test]
    fn attach_surface_when_ready_binds_and_starts_stream() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::granted());
        h.lifecycle.resume().unwrap();
        assert!(!h.lifecycle.is_streaming());

        let selected = h.lifecycle.attach_surface(surface()).unwrap();
        assert_eq!(selected, Extent::new(800, 600));
        assert!(h.lifecycle.is_streaming());
        assert_eq!(h.backend.bound_surface(), Some(SurfaceId(9)));
        assert_eq!(h.backend.open_count(), 1);
    }

    #[test]
    fn attach_replacement_surface_restarts_stream() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::granted());
        h.lifecycle.attach_surface(surface()).unwrap();
        h.lifecycle
            .attach_surface(Arc::new(MockSurface::new(11)))
            .unwrap();

        assert_eq!(h.backend.bound_surface(), Some(SurfaceId(11)));
        assert!(h.backend.is_streaming());
        let calls = h.backend.calls();
        assert_eq!(calls.iter().filter(|c| **c == "stop_stream").count(), 1);
        assert_eq!(calls.iter().filter(|c| **c == "start_stream").count(), 2);
    }

    #[test]
    fn attach_surface_before_permission_is_kept_for_later_open() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::denied());
        let result = h.lifecycle.attach_surface(surface());
        assert!(matches!(result, Err(CameraError::CouldNotOpen(_))));
        assert!(h.lifecycle.surface().is_some());

        h.lifecycle.resume().unwrap();
        h.lifecycle.on_permission_result(true).unwrap();
        assert_eq!(h.lifecycle.state(), LifecycleState::Ready);
        assert!(h.backend.is_streaming());
        assert_eq!(h.backend.bound_surface(), Some(SurfaceId(9)));
    }

    #[test]
    fn attach_surface_while_paused_binds_on_resume() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::granted());
        h.lifecycle.resume().unwrap();
        h.lifecycle.pause();
        assert!(h.lifecycle.attach_surface(surface()).is_err());
        assert!(!h.backend.is_open());

        h.lifecycle.resume().unwrap();
        assert!(h.backend.is_streaming());
    }

    #[test]
    fn rebind_failure_when_ready_releases_device() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::granted());
        h.lifecycle.resume().unwrap();
        h.backend.inject_error(
            "bind_surface",
            CameraError::SurfaceBind("surface abandoned".to_string()),
        );

        let result = h.lifecycle.attach_surface(surface());
        assert!(matches!(result, Err(CameraError::CouldNotOpen(_))));
        assert_eq!(h.lifecycle.state(), LifecycleState::AwaitingPermission);
        assert!(!h.backend.is_open());
    }

    #[test]
    fn frame_listener_feeds_the_signal() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::granted());
        h.lifecycle.attach_surface(surface()).unwrap();
        assert!(h.backend.fire_frame());
        assert!(h.backend.fire_frame());
        assert_eq!(h.signal.pending(), 2);

        h.lifecycle.pause();
        assert!(!h.backend.fire_frame());
        assert_eq!(h.signal.pending(), 2);
    }

    #[test]
    fn reopen_discards_notifications_from_previous_session() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::granted());
        h.lifecycle.attach_surface(surface()).unwrap();
        assert!(h.backend.fire_frame());
        h.lifecycle.pause();
        assert_eq!(h.signal.pending(), 1);

        h.lifecycle.resume().unwrap();
        assert_eq!(h.signal.pending(), 0);
        assert!(h.backend.fire_frame());
        assert_eq!(h.signal.pending(), 1);
    }

    #[test]
    fn failed_stop_during_rebind_is_not_repeated_on_release() {
        let mut h = harness(MockCaptureBackend::new(), MockPermissionHost::granted());
        h.lifecycle.attach_surface(surface()).unwrap();
        h.backend.inject_error(
            "stop_stream",
            CameraError::DeviceUnavailable("injected".to_string()),
        );

        let result = h.lifecycle.attach_surface(Arc::new(MockSurface::new(11)));
        assert!(matches!(result, Err(CameraError::CouldNotOpen(_))));
        assert!(!h.lifecycle.has_device());
        assert!(!h.backend.is_open());
        let calls = h.backend.calls();
        assert_eq!(calls.iter().filter(|c| **c == "stop_stream").count(), 1);
        assert_eq!(h.backend.close_count(), 1);
    }

    #[test]
    fn drop_closes_open_device() {
        let h = harness(MockCaptureBackend::new(), MockPermissionHost::granted());
        let backend = Arc::clone(&h.backend);
        let mut lifecycle = h.lifecycle;
        lifecycle.resume().unwrap();
        drop(lifecycle);
        assert!(!backend.is_open());
        assert_eq!(backend.close_count(), 1);
    }
}
