//! Shared camera and viewport tracking for linked map views.

mod camera;
mod viewport;

pub use camera::{Camera, CameraCell, CameraError, CameraLimits, CameraRef};
pub use viewport::{ViewportError, ViewportState, ViewportTracker};
