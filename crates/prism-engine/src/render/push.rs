use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::gpu::DeviceAddress;

/// Per-draw inline constants shared with the shaders.
///
/// Layout (version 1, 80 bytes, little endian):
///
/// | offset | size | field           |
/// |--------|------|-----------------|
/// | 0      | 8    | `vertex_buffer` |
/// | 8      | 64   | `model`         |
/// | 72     | 4    | `time`          |
/// | 76     | 4    | padding         |
///
/// `model` is column major. Shaders decode the block as 20 `u32` words, so
/// the layout does not depend on any shading language's struct rules.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PushConstants {
    pub vertex_buffer: u64,
    pub model: [[f32; 4]; 4],
    pub time: f32,
    _pad: u32,
}

impl PushConstants {
    pub const SIZE: usize = 80;

    pub const VERTEX_BUFFER_OFFSET: usize = 0;
    pub const MODEL_OFFSET: usize = 8;
    pub const TIME_OFFSET: usize = 72;

    pub fn new(vertex_buffer: DeviceAddress, model: Mat4, time: f32) -> Self {
        Self {
            vertex_buffer: vertex_buffer.get(),
            model: model.to_cols_array_2d(),
            time,
            _pad: 0,
        }
    }

    #[inline]
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Decodes a block recorded into a command list.
    pub fn read(bytes: &[u8]) -> Option<Self> {
        (bytes.len() == Self::SIZE).then(|| bytemuck::pod_read_unaligned(bytes))
    }
}

const _: () = assert!(std::mem::size_of::<PushConstants>() == PushConstants::SIZE);
const _: () = assert!(std::mem::offset_of!(PushConstants, vertex_buffer) == PushConstants::VERTEX_BUFFER_OFFSET);
const _: () = assert!(std::mem::offset_of!(PushConstants, model) == PushConstants::MODEL_OFFSET);
const _: () = assert!(std::mem::offset_of!(PushConstants, time) == PushConstants::TIME_OFFSET);

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn byte_layout_matches_the_shader_contract() {
        let model = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let pc = PushConstants::new(DeviceAddress(0x1122_3344_5566_7788), model, 2.5);
        let bytes = pc.as_bytes();

        assert_eq!(bytes.len(), 80);
        assert_eq!(&bytes[0..8], &0x1122_3344_5566_7788u64.to_le_bytes());

        // Column 3 holds the translation: floats 12..15 of the matrix.
        let word = |i: usize| {
            let at = PushConstants::MODEL_OFFSET + i * 4;
            f32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
        };
        assert_eq!([word(12), word(13), word(14), word(15)], [1.0, 2.0, 3.0, 1.0]);

        let t = &bytes[PushConstants::TIME_OFFSET..PushConstants::TIME_OFFSET + 4];
        assert_eq!(f32::from_le_bytes(t.try_into().unwrap()), 2.5);
        assert_eq!(&bytes[76..80], &[0; 4]);
    }

    #[test]
    fn read_back_recorded_bytes() {
        let pc = PushConstants::new(DeviceAddress(64), Mat4::IDENTITY, 0.25);
        let copied = pc.as_bytes().to_vec();
        assert_eq!(PushConstants::read(&copied), Some(pc));
        assert_eq!(PushConstants::read(&copied[..40]), None);
    }
}
