use std::collections::HashSet;

use super::types::{InputEvent, Key, Modifiers, MouseButton};

/// Per-frame input deltas.
///
/// [`InputState`](super::InputState) holds what is currently down;
/// `InputFrame` holds what changed since the last frame.
#[derive(Debug, Default)]
pub struct InputFrame {
    /// Raw events in arrival order.
    pub events: Vec<InputEvent>,

    pub keys_pressed: HashSet<Key>,
    pub keys_released: HashSet<Key>,

    pub buttons_pressed: HashSet<MouseButton>,
    pub buttons_released: HashSet<MouseButton>,

    /// Accumulated pointer motion in physical pixels.
    pub pointer_delta: (f32, f32),

    /// Modifier state when each key in `keys_pressed` went down.
    pub chords: Vec<(Modifiers, Key)>,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.events.clear();
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.pointer_delta = (0.0, 0.0);
        self.chords.clear();
    }

    pub fn push_event(&mut self, ev: InputEvent) {
        self.events.push(ev);
    }

    /// True if `key` was pressed this frame while at least the `modifiers`
    /// were held.
    pub fn chord_pressed(&self, modifiers: Modifiers, key: Key) -> bool {
        self.chords.iter().any(|(held, k)| {
            *k == key
                && (!modifiers.ctrl || held.ctrl)
                && (!modifiers.shift || held.shift)
                && (!modifiers.alt || held.alt)
                && (!modifiers.meta || held.meta)
        })
    }
}
