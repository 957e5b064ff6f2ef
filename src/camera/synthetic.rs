//! Synthetic capture backend for running without camera hardware.
//!
//! Once streaming, a producer thread fires the frame listener at a fixed
//! interval, standing in for the platform's capture callback thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::camera::backend::{CaptureBackend, FrameListener, OutputSurface};
use crate::camera::error::{CameraError, Result};
use crate::camera::types::{CaptureSource, DeviceHandle, Extent, SurfaceId, TransformMatrix};

/// Default frame interval (~30fps).
const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Preview sizes reported by the synthetic device, in the descending order
/// mobile camera services commonly use.
const SYNTHETIC_PREVIEW_SIZES: &[Extent] = &[
    Extent::new(1920, 1080),
    Extent::new(1280, 720),
    Extent::new(800, 600),
    Extent::new(640, 480),
    Extent::new(320, 240),
];

const SYNTHETIC_DEFAULT_SIZE: Extent = Extent::new(640, 480);

/// Running producer thread.
struct Producer {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Producer {
    fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

struct SyntheticState {
    next_handle: u64,
    open: Option<DeviceHandle>,
    preview_size: Extent,
    listener: Option<FrameListener>,
    bound_surface: Option<SurfaceId>,
    producer: Option<Producer>,
}

/// A fake capture device that produces frame notifications on its own
/// thread.
///
/// Enable via `SYNTHETIC_CAMERA=1` environment variable.
pub struct SyntheticCaptureBackend {
    interval: Duration,
    state: Mutex<SyntheticState>,
}

impl SyntheticCaptureBackend {
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_FRAME_INTERVAL)
    }

    /// Custom frame interval (useful for testing).
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            state: Mutex::new(SyntheticState {
                next_handle: 1,
                open: None,
                preview_size: SYNTHETIC_DEFAULT_SIZE,
                listener: None,
                bound_surface: None,
                producer: None,
            }),
        }
    }

    /// Whether the synthetic camera is enabled via environment variable.
    pub fn is_enabled() -> bool {
        std::env::var("SYNTHETIC_CAMERA").is_ok_and(|v| v == "1" || v == "true")
    }

    /// Whether the producer thread is running.
    pub fn is_streaming(&self) -> bool {
        self.state.lock().producer.is_some()
    }

    fn check_handle(state: &SyntheticState, handle: DeviceHandle) -> Result<()> {
        match state.open {
            Some(open) if open == handle => Ok(()),
            _ => Err(CameraError::DeviceNotFound(format!(
                "synthetic device handle {}",
                handle.0
            ))),
        }
    }
}

impl Default for SyntheticCaptureBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SyntheticCaptureBackend {
    fn drop(&mut self) {
        if let Some(producer) = self.state.get_mut().producer.take() {
            producer.stop();
        }
    }
}

impl CaptureBackend for SyntheticCaptureBackend {
    fn open(&self, source: CaptureSource) -> Result<DeviceHandle> {
        let mut state = self.state.lock();
        if state.open.is_some() {
            return Err(CameraError::DeviceUnavailable(
                "synthetic device busy".to_string(),
            ));
        }
        let handle = DeviceHandle(state.next_handle);
        state.next_handle += 1;
        state.open = Some(handle);
        info!("synthetic {source} camera opened as handle {}", handle.0);
        Ok(handle)
    }

    fn supported_preview_sizes(&self, handle: DeviceHandle) -> Result<Vec<Extent>> {
        let state = self.state.lock();
        Self::check_handle(&state, handle)?;
        Ok(SYNTHETIC_PREVIEW_SIZES.to_vec())
    }

    fn current_preview_size(&self, handle: DeviceHandle) -> Result<Extent> {
        let state = self.state.lock();
        Self::check_handle(&state, handle)?;
        Ok(state.preview_size)
    }

    fn set_preview_size(&self, handle: DeviceHandle, size: Extent) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_handle(&state, handle)?;
        state.preview_size = size;
        Ok(())
    }

    fn set_frame_listener(&self, handle: DeviceHandle, listener: FrameListener) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_handle(&state, handle)?;
        state.listener = Some(listener);
        Ok(())
    }

    fn bind_surface(&self, handle: DeviceHandle, surface: SurfaceId) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_handle(&state, handle)?;
        state.bound_surface = Some(surface);
        Ok(())
    }

    fn start_stream(&self, handle: DeviceHandle) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_handle(&state, handle)?;
        if state.producer.is_some() {
            return Ok(());
        }
        if state.bound_surface.is_none() {
            return Err(CameraError::StreamStart("no surface bound".to_string()));
        }
        let listener = state
            .listener
            .clone()
            .ok_or_else(|| CameraError::StreamStart("no frame listener".to_string()))?;

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);
        let interval = self.interval;

        let thread = std::thread::Builder::new()
            .name(format!("synthetic-camera-{}", handle.0))
            .spawn(move || produce_frames(&*listener, &running_clone, interval))
            .map_err(|e| {
                CameraError::StreamStart(format!("failed to spawn producer thread: {e}"))
            })?;

        state.producer = Some(Producer {
            running,
            thread: Some(thread),
        });
        Ok(())
    }

    fn stop_stream(&self, handle: DeviceHandle) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_handle(&state, handle)?;
        if let Some(producer) = state.producer.take() {
            producer.stop();
        }
        Ok(())
    }

    fn close(&self, handle: DeviceHandle) -> Result<()> {
        let mut state = self.state.lock();
        Self::check_handle(&state, handle)?;
        if let Some(producer) = state.producer.take() {
            producer.stop();
        }
        state.open = None;
        state.listener = None;
        state.bound_surface = None;
        debug!("synthetic camera handle {} closed", handle.0);
        Ok(())
    }
}

/// Producer loop that runs on the synthetic capture thread.
fn produce_frames(
    listener: &(dyn Fn() + Send + Sync),
    running: &AtomicBool,
    interval: Duration,
) {
    while running.load(Ordering::Relaxed) {
        listener();
        std::thread::sleep(interval);
    }
}

/// Output surface paired with the synthetic backend.
///
/// Reports a vertical flip, the transform camera textures typically need.
pub struct SyntheticSurface {
    id: SurfaceId,
    transform: TransformMatrix,
    latched: AtomicU64,
}

impl SyntheticSurface {
    pub fn new(id: u64) -> Self {
        let mut transform = TransformMatrix::IDENTITY;
        transform.0[5] = -1.0;
        transform.0[13] = 1.0;
        Self {
            id: SurfaceId(id),
            transform,
            latched: AtomicU64::new(0),
        }
    }

    /// Number of images latched so far.
    pub fn latched(&self) -> u64 {
        self.latched.load(Ordering::Relaxed)
    }
}

impl OutputSurface for SyntheticSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn update_image(&self) -> Result<()> {
        self.latched.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn transform_matrix(&self) -> Result<TransformMatrix> {
        Ok(self.transform)
    }
}
