use glam::{Mat4, Quat, Vec2, Vec3};

use crate::input::{InputFrame, InputState, Key, MouseButton};

/// Radians of rotation per pixel of pointer motion at sensitivity 1.
const RADIANS_PER_PIXEL: f32 = 0.005;
const PITCH_LIMIT: f32 = 89.0 * std::f32::consts::PI / 180.0;

pub const NEAR: f32 = 0.1;
pub const FAR: f32 = 1000.0;

/// Camera pose and lens.
///
/// `yaw` and `pitch` are in radians; at zero the camera looks down -Z with
/// +Y up.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov_deg: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            yaw: 0.0,
            pitch: 0.0,
            fov_deg: 60.0,
        }
    }
}

/// Movement tuning.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraState {
    /// World units per second.
    pub fly_speed: f32,
    pub mouse_sensitivity: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            fly_speed: 1.0,
            mouse_sensitivity: 1.0,
        }
    }
}

/// One frame of camera intent.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct CameraInput {
    /// Camera-space direction: +X right, +Y up, +Z forward. Not normalized.
    pub movement: Vec3,
    /// Pointer motion in pixels.
    pub look: Vec2,
}

impl CameraInput {
    /// WASD moves, Space/Shift rise and sink, right-drag looks around.
    pub fn from_input(state: &InputState, frame: &InputFrame) -> Self {
        let axis = |pos: Key, neg: Key| {
            (state.key_down(pos) as i8 - state.key_down(neg) as i8) as f32
        };
        let movement = Vec3::new(
            axis(Key::D, Key::A),
            axis(Key::Space, Key::Shift),
            axis(Key::W, Key::S),
        );

        let look = if state.button_down(MouseButton::Right) {
            Vec2::new(frame.pointer_delta.0, frame.pointer_delta.1)
        } else {
            Vec2::ZERO
        };

        Self { movement, look }
    }
}

impl Camera {
    pub fn orientation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch)
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation() * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.orientation() * Vec3::X
    }

    /// Applies one frame of input. Vertical movement is along world +Y.
    pub fn move_freelook(&mut self, input: &CameraInput, state: &CameraState, dt: f32) {
        let k = RADIANS_PER_PIXEL * state.mouse_sensitivity;
        self.yaw -= input.look.x * k;
        self.pitch = (self.pitch - input.look.y * k).clamp(-PITCH_LIMIT, PITCH_LIMIT);

        let m = input.movement;
        let dir = self.right() * m.x + Vec3::Y * m.y + self.forward() * m.z;
        self.position += dir * state.fly_speed * dt;
    }

    /// Right-handed perspective (depth 0..1, clip Y up) times the inverse
    /// camera pose.
    pub fn view_matrix(&self, width: u32, height: u32) -> Mat4 {
        let aspect = if width == 0 || height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
        let proj = Mat4::perspective_rh(self.fov_deg.to_radians(), aspect, NEAR, FAR);
        let look = Mat4::from_quat(self.orientation().inverse());
        proj * look * Mat4::from_translation(-self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputEvent, Modifiers, MouseButtonState, PointerButtonEvent, PointerMoveEvent};
    use glam::Vec4;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn default_camera_sees_the_origin_centered() {
        let camera = Camera::default();
        let clip = camera.view_matrix(800, 600) * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn points_above_project_up() {
        let camera = Camera::default();
        let clip = camera.view_matrix(100, 100) * Vec4::new(0.0, 1.0, 0.0, 1.0);
        assert!(clip.y / clip.w > 0.0);
    }

    #[test]
    fn forward_flies_toward_negative_z() {
        let mut camera = Camera::default();
        let input = CameraInput {
            movement: Vec3::Z,
            look: Vec2::ZERO,
        };
        camera.move_freelook(&input, &CameraState::default(), 1.0);
        assert!(approx(camera.position, Vec3::new(0.0, 0.0, 2.0)));
    }

    #[test]
    fn dragging_right_turns_right() {
        let mut camera = Camera::default();
        let input = CameraInput {
            movement: Vec3::ZERO,
            look: Vec2::new(100.0, 0.0),
        };
        camera.move_freelook(&input, &CameraState::default(), 0.016);
        assert!(camera.forward().x > 0.0);
        assert_eq!(camera.position, Camera::default().position);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = Camera::default();
        let input = CameraInput {
            movement: Vec3::ZERO,
            look: Vec2::new(0.0, -1.0e6),
        };
        camera.move_freelook(&input, &CameraState::default(), 0.016);
        assert_eq!(camera.pitch, PITCH_LIMIT);
        assert!(camera.forward().y > 0.99);
    }

    #[test]
    fn look_requires_right_button() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        let moved = |x, y| InputEvent::PointerMoved(PointerMoveEvent { x, y });

        state.apply_event(&mut frame, moved(0.0, 0.0));
        state.apply_event(&mut frame, moved(4.0, 2.0));
        assert_eq!(CameraInput::from_input(&state, &frame).look, Vec2::ZERO);

        state.apply_event(
            &mut frame,
            InputEvent::PointerButton(PointerButtonEvent {
                button: MouseButton::Right,
                state: MouseButtonState::Pressed,
                modifiers: Modifiers::default(),
            }),
        );
        assert_eq!(CameraInput::from_input(&state, &frame).look, Vec2::new(4.0, 2.0));
    }

    #[test]
    fn opposing_keys_cancel() {
        let mut state = InputState::default();
        state.keys_down.extend([Key::W, Key::S, Key::D, Key::Space]);
        let input = CameraInput::from_input(&state, &InputFrame::default());
        assert_eq!(input.movement, Vec3::new(1.0, 1.0, 0.0));
    }
}
