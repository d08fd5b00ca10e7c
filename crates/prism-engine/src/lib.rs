//! Prism engine crate.
//!
//! Per-frame orchestration for an instanced cube renderer: mesh upload,
//! pipeline build and live reload, depth-attachment management and command
//! recording, behind a small backend-neutral GPU layer. The window runtime,
//! wgpu device layer, input, camera and time pieces drive it in a real
//! window; [`gpu::HeadlessBackend`] drives it in tests.

pub mod camera;
pub mod core;
pub mod device;
pub mod gpu;
pub mod input;
pub mod logging;
pub mod mesh;
pub mod render;
pub mod time;
pub mod window;
