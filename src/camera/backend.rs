use std::sync::Arc;

use crate::camera::error::Result;
use crate::camera::types::{CaptureSource, DeviceHandle, Extent, SurfaceId, TransformMatrix};

/// Callback fired by the backend every time a new frame is available on
/// the bound surface. Invoked on the backend's own capture thread.
pub type FrameListener = Arc<dyn Fn() + Send + Sync>;

/// Platform capture device service.
///
/// Implemented per platform (Camera2 on Android, AVFoundation on iOS, V4L2
/// on Linux) and by the mock/synthetic backends used in tests. All methods
/// take `&self`; implementations manage interior mutability themselves.
///
/// Every call is a bounded synchronous operation: failures return
/// immediately and the caller never retries inside the same transition.
pub trait CaptureBackend: Send + Sync {
    /// Open the device for `source`, returning an exclusive handle.
    fn open(&self, source: CaptureSource) -> Result<DeviceHandle>;

    /// Preview sizes the opened device supports, in platform order.
    fn supported_preview_sizes(&self, handle: DeviceHandle) -> Result<Vec<Extent>>;

    /// The preview size the device is currently configured with.
    fn current_preview_size(&self, handle: DeviceHandle) -> Result<Extent>;

    /// Configure the preview size used by the capture stream.
    fn set_preview_size(&self, handle: DeviceHandle, size: Extent) -> Result<()>;

    /// Register the frame-available callback for this device.
    fn set_frame_listener(&self, handle: DeviceHandle, listener: FrameListener) -> Result<()>;

    /// Direct the capture stream into the given output surface.
    fn bind_surface(&self, handle: DeviceHandle, surface: SurfaceId) -> Result<()>;

    /// Start streaming frames into the bound surface.
    fn start_stream(&self, handle: DeviceHandle) -> Result<()>;

    /// Stop streaming. The frame listener must not fire after this returns.
    fn stop_stream(&self, handle: DeviceHandle) -> Result<()>;

    /// Release the device. The handle is invalid afterwards.
    fn close(&self, handle: DeviceHandle) -> Result<()>;
}

/// Renderable surface the capture device writes decoded frames into.
///
/// The render pipeline samples it as an external texture; the bridge only
/// needs to latch the newest image and read its coordinate transform.
pub trait OutputSurface: Send + Sync {
    /// Stable identifier passed to `CaptureBackend::bind_surface`.
    fn id(&self) -> SurfaceId;

    /// Latch the most recent frame into the texture. Render thread only.
    fn update_image(&self) -> Result<()>;

    /// Texture-coordinate transform for the currently latched image.
    fn transform_matrix(&self) -> Result<TransformMatrix>;
}
