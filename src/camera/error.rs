use thiserror::Error;

/// Camera bridge errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("surface bind failed: {0}")]
    SurfaceBind(String),

    #[error("capture stream start failed: {0}")]
    StreamStart(String),

    #[error("surface update failed: {0}")]
    SurfaceUpdate(String),

    #[error("no supported preview sizes reported by the device")]
    NoCandidate,

    #[error("capture device open failed: {0}")]
    RecoverableOpen(String),

    #[error("could not open camera output: {0}")]
    CouldNotOpen(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, CameraError>;
