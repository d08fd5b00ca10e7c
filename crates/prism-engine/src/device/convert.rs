//! Mapping between the backend-neutral vocabulary and wgpu types.

use crate::gpu::{CompareOp, ImageFormat, IndexFormat, ShaderStage};

pub fn texture_format(format: ImageFormat) -> wgpu::TextureFormat {
    match format {
        ImageFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        ImageFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
        ImageFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        ImageFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        ImageFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        ImageFormat::Rgb10a2Unorm => wgpu::TextureFormat::Rgb10a2Unorm,
        ImageFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
    }
}

/// Inverse of [`texture_format`]; `None` for formats the renderer never uses.
pub fn image_format(format: wgpu::TextureFormat) -> Option<ImageFormat> {
    Some(match format {
        wgpu::TextureFormat::Bgra8Unorm => ImageFormat::Bgra8Unorm,
        wgpu::TextureFormat::Bgra8UnormSrgb => ImageFormat::Bgra8UnormSrgb,
        wgpu::TextureFormat::Rgba8Unorm => ImageFormat::Rgba8Unorm,
        wgpu::TextureFormat::Rgba8UnormSrgb => ImageFormat::Rgba8UnormSrgb,
        wgpu::TextureFormat::Rgba16Float => ImageFormat::Rgba16Float,
        wgpu::TextureFormat::Rgb10a2Unorm => ImageFormat::Rgb10a2Unorm,
        wgpu::TextureFormat::Depth32Float => ImageFormat::Depth32Float,
        _ => return None,
    })
}

pub fn compare_function(op: CompareOp) -> wgpu::CompareFunction {
    match op {
        CompareOp::Less => wgpu::CompareFunction::Less,
        CompareOp::LessOrEqual => wgpu::CompareFunction::LessEqual,
        CompareOp::Always => wgpu::CompareFunction::Always,
    }
}

pub fn index_format(format: IndexFormat) -> wgpu::IndexFormat {
    match format {
        IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
        IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
    }
}

pub fn shader_stage(stage: ShaderStage) -> wgpu::ShaderStages {
    match stage {
        ShaderStage::Vertex => wgpu::ShaderStages::VERTEX,
        ShaderStage::Fragment => wgpu::ShaderStages::FRAGMENT,
    }
}

pub fn clear_color(rgba: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: rgba[0] as f64,
        g: rgba[1] as f64,
        b: rgba[2] as f64,
        a: rgba[3] as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_round_trip() {
        for format in [
            ImageFormat::Bgra8Unorm,
            ImageFormat::Bgra8UnormSrgb,
            ImageFormat::Rgba8Unorm,
            ImageFormat::Rgba8UnormSrgb,
            ImageFormat::Rgba16Float,
            ImageFormat::Rgb10a2Unorm,
            ImageFormat::Depth32Float,
        ] {
            assert_eq!(image_format(texture_format(format)), Some(format));
        }
    }

    #[test]
    fn unused_surface_formats_are_rejected() {
        assert_eq!(image_format(wgpu::TextureFormat::R8Unorm), None);
        assert_eq!(image_format(wgpu::TextureFormat::Depth24Plus), None);
    }
}
