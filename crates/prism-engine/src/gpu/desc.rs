use std::path::Path;

/// Buffer usage flags.
///
/// Stored as booleans rather than bitflags to keep call sites explicit.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct BufferUsage {
    /// Buffer may be written by upload/copy commands.
    pub transfer_dst: bool,
    /// Buffer may be bound as an index buffer.
    pub index: bool,
    /// Buffer is readable from shaders as storage.
    pub storage: bool,
    /// Buffer exposes a [`DeviceAddress`](super::DeviceAddress) to shaders.
    pub shader_address: bool,
}

impl BufferUsage {
    /// Read-only shader storage reached through a device address.
    pub const STORAGE: Self = Self {
        transfer_dst: true,
        index: false,
        storage: true,
        shader_address: true,
    };

    /// Index data that shaders may also reach through a device address.
    pub const INDEX: Self = Self {
        transfer_dst: true,
        index: true,
        storage: false,
        shader_address: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    /// Size in bytes; must equal the payload that will be uploaded.
    pub size: u64,
    pub usage: BufferUsage,
}

/// Image usage flags.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ImageUsage {
    pub transfer_dst: bool,
    pub color_attachment: bool,
    pub depth_stencil_attachment: bool,
}

impl ImageUsage {
    pub const DEPTH_TARGET: Self = Self {
        transfer_dst: true,
        color_attachment: false,
        depth_stencil_attachment: true,
    };

    pub const COLOR_TARGET: Self = Self {
        transfer_dst: true,
        color_attachment: true,
        depth_stencil_attachment: false,
    };
}

/// Image size in physical pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

impl Extent2d {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height; `1.0` for degenerate extents.
    #[inline]
    pub fn aspect(self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Image formats understood by the renderer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ImageFormat {
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Rgba16Float,
    Rgb10a2Unorm,
    Depth32Float,
}

impl ImageFormat {
    #[inline]
    pub const fn is_depth(self) -> bool {
        matches!(self, ImageFormat::Depth32Float)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDesc<'a> {
    pub label: &'a str,
    pub extent: Extent2d,
    pub format: ImageFormat,
    pub usage: ImageUsage,
}

/// Color and depth formats a pipeline renders into.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RenderTargetFormats {
    pub color: ImageFormat,
    pub depth: ImageFormat,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Infers the stage and code flavor from a shader file name.
    ///
    /// `*.vert.spv` / `*.vert.wgsl` are vertex shaders, `*.frag.spv` /
    /// `*.frag.wgsl` fragment shaders. Anything else returns `None`.
    pub fn from_path(path: &Path) -> Option<(ShaderStage, ShaderFlavor)> {
        let name = path.file_name()?.to_str()?;
        let table = [
            (".vert.spv", ShaderStage::Vertex, ShaderFlavor::SpirV),
            (".frag.spv", ShaderStage::Fragment, ShaderFlavor::SpirV),
            (".vert.wgsl", ShaderStage::Vertex, ShaderFlavor::Wgsl),
            (".frag.wgsl", ShaderStage::Fragment, ShaderFlavor::Wgsl),
        ];
        table
            .into_iter()
            .find(|(suffix, _, _)| name.ends_with(suffix))
            .map(|(_, stage, flavor)| (stage, flavor))
    }
}

/// Encoding of a shader artifact on disk.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderFlavor {
    SpirV,
    Wgsl,
}

/// Shader code as loaded from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderCode {
    SpirV(Vec<u8>),
    Wgsl(String),
}

#[derive(Debug, Clone, Copy)]
pub struct ShaderModuleDesc<'a> {
    pub label: &'a str,
    pub stage: ShaderStage,
    pub entry_point: &'a str,
    pub code: &'a ShaderCode,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CompareOp {
    Less,
    LessOrEqual,
    Always,
}

/// Fixed-function state baked into a graphics pipeline.
///
/// The viewport is always dynamic and is taken from the render targets at
/// record time; it is not part of this state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FixedFunctionState {
    pub cull_back_faces: bool,
    pub sample_count: u32,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: CompareOp,
    pub blend: bool,
}

impl Default for FixedFunctionState {
    /// Triangle list, solid fill, single sample, depth test+write, no blending.
    fn default() -> Self {
        Self {
            cull_back_faces: false,
            sample_count: 1,
            depth_test: true,
            depth_write: true,
            depth_compare: CompareOp::Less,
            blend: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineDesc<'a> {
    pub label: &'a str,
    pub stages: &'a [ShaderModuleDesc<'a>],
    pub targets: RenderTargetFormats,
    pub state: FixedFunctionState,
    /// Bytes of push-constant data visible to every stage.
    pub push_constant_size: u32,
}
