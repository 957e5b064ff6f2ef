// Camera domain — capture devices and their lifecycle.

pub mod backend;
pub mod error;
pub mod lifecycle;
pub mod mock;
pub mod permission;
pub mod resolution;
pub mod synthetic;
pub mod types;
