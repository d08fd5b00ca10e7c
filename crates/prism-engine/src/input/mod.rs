//! Input subsystem.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! The window runtime translates platform events into [`InputEvent`]s via
//! [`platform::translate_window_event`].

mod frame;
pub mod platform;
mod state;
mod types;

pub use frame::InputFrame;
pub use state::InputState;
pub use types::{
    InputEvent, Key, KeyState, Modifiers, MouseButton, MouseButtonState, PointerButtonEvent,
    PointerMoveEvent,
};
