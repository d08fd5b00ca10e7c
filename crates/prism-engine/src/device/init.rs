use crate::render::PushConstants;

/// Bytes reserved for device-addressable buffers by default.
pub const DEFAULT_ADDRESS_SPACE: u64 = 16 << 20;

/// Initialization parameters for the GPU layer.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior).
    ///
    /// FIFO is broadly supported and paces the loop to the display.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features.
    ///
    /// Must contain `IMMEDIATES`; per-draw constants are pushed as immediates.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface.
    ///
    /// This value is a hint; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,

    /// Size in bytes of the buffer backing all device-addressable allocations.
    pub address_space_size: u64,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::IMMEDIATES,
            required_limits: wgpu::Limits {
                max_immediate_size: PushConstants::SIZE as u32,
                ..wgpu::Limits::default()
            },
            desired_maximum_frame_latency: 2,
            address_space_size: DEFAULT_ADDRESS_SPACE,
        }
    }
}
