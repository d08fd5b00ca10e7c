//! Free-look camera.
//!
//! Produces the view-projection matrix the renderer consumes each frame. The
//! renderer treats it as opaque; nothing here knows about the GPU.

mod freelook;

pub use freelook::{Camera, CameraInput, CameraState};
