// Bridge configuration — types and read-only loading.

pub mod loader;
pub mod types;
