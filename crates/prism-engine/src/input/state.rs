use std::collections::HashSet;

use super::frame::InputFrame;
use super::types::{
    InputEvent, Key, KeyState, Modifiers, MouseButton, MouseButtonState, PointerButtonEvent,
    PointerMoveEvent,
};

/// Current input state for a single window.
#[derive(Debug, Default)]
pub struct InputState {
    pub modifiers: Modifiers,
    pub focused: bool,

    /// Pointer position in physical pixels.
    pub pointer_pos: Option<(f32, f32)>,

    pub keys_down: HashSet<Key>,
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    /// Applies an event to the current state and writes deltas to `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match &ev {
            InputEvent::ModifiersChanged(m) => {
                self.modifiers = *m;
            }

            InputEvent::Focused(f) => {
                self.focused = *f;
                if !*f {
                    // Avoid stuck keys when focus changes mid-press.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved(PointerMoveEvent { x, y }) => {
                if let Some((px, py)) = self.pointer_pos {
                    frame.pointer_delta.0 += x - px;
                    frame.pointer_delta.1 += y - py;
                }
                self.pointer_pos = Some((*x, *y));
            }

            InputEvent::PointerLeft => {
                self.pointer_pos = None;
            }

            InputEvent::Key {
                key,
                state,
                modifiers,
                ..
            } => {
                self.modifiers = *modifiers;
                match state {
                    KeyState::Pressed => {
                        if self.keys_down.insert(*key) {
                            frame.keys_pressed.insert(*key);
                            frame.chords.push((*modifiers, *key));
                        }
                    }
                    KeyState::Released => {
                        if self.keys_down.remove(key) {
                            frame.keys_released.insert(*key);
                        }
                    }
                }
            }

            InputEvent::PointerButton(PointerButtonEvent {
                button,
                state,
                modifiers,
            }) => {
                self.modifiers = *modifiers;
                match state {
                    MouseButtonState::Pressed => {
                        if self.buttons_down.insert(*button) {
                            frame.buttons_pressed.insert(*button);
                        }
                    }
                    MouseButtonState::Released => {
                        if self.buttons_down.remove(button) {
                            frame.buttons_released.insert(*button);
                        }
                    }
                }
            }
        }

        frame.push_event(ev);
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn button_down(&self, btn: MouseButton) -> bool {
        self.buttons_down.contains(&btn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: Key, state: KeyState, modifiers: Modifiers) -> InputEvent {
        InputEvent::Key {
            key,
            state,
            modifiers,
            repeat: false,
        }
    }

    #[test]
    fn ctrl_r_is_a_chord() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::Control, KeyState::Pressed, Modifiers::CTRL));
        state.apply_event(&mut frame, key(Key::R, KeyState::Pressed, Modifiers::CTRL));

        assert!(frame.chord_pressed(Modifiers::CTRL, Key::R));
        assert!(frame.chord_pressed(Modifiers::default(), Key::R));
        assert!(state.key_down(Key::R));
    }

    #[test]
    fn plain_r_is_not_ctrl_r() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, key(Key::R, KeyState::Pressed, Modifiers::default()));
        assert!(!frame.chord_pressed(Modifiers::CTRL, Key::R));
    }

    #[test]
    fn held_key_repeats_do_not_retrigger() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, key(Key::R, KeyState::Pressed, Modifiers::CTRL));
        frame.clear();
        state.apply_event(&mut frame, key(Key::R, KeyState::Pressed, Modifiers::CTRL));
        assert!(!frame.chord_pressed(Modifiers::CTRL, Key::R));
    }

    #[test]
    fn pointer_delta_accumulates_within_a_frame() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        let moved = |x, y| InputEvent::PointerMoved(PointerMoveEvent { x, y });

        state.apply_event(&mut frame, moved(10.0, 10.0));
        assert_eq!(frame.pointer_delta, (0.0, 0.0));
        state.apply_event(&mut frame, moved(13.0, 8.0));
        state.apply_event(&mut frame, moved(15.0, 9.0));
        assert_eq!(frame.pointer_delta, (5.0, -1.0));

        frame.clear();
        assert_eq!(frame.pointer_delta, (0.0, 0.0));
    }

    #[test]
    fn focus_loss_releases_everything() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, key(Key::W, KeyState::Pressed, Modifiers::default()));
        state.apply_event(
            &mut frame,
            InputEvent::PointerButton(PointerButtonEvent {
                button: MouseButton::Right,
                state: MouseButtonState::Pressed,
                modifiers: Modifiers::default(),
            }),
        );
        state.apply_event(&mut frame, InputEvent::Focused(false));
        assert!(!state.key_down(Key::W));
        assert!(!state.button_down(MouseButton::Right));
    }
}
