//! Time subsystem.
//!
//! - [`FrameClock`]: one per render loop, `tick()` once per presented frame
//! - [`ShaderClock`]: looping elapsed seconds handed to shaders

mod frame_clock;
mod shader_clock;

pub use frame_clock::{FrameClock, FrameTime};
pub use shader_clock::ShaderClock;
