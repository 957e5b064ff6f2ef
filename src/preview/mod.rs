// Preview pipeline — frame-ready signalling, transform change detection, and
// the render-facing bridge.

pub mod bridge;
pub mod signal;
pub mod transform;
