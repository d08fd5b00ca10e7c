use super::command::CommandList;
use super::desc::{BufferDesc, ImageDesc, PipelineDesc};
use super::error::GpuError;
use super::handle::{BufferHandle, DeviceAddress, ImageHandle, PipelineHandle};

/// Orientation of clip-space Y on a backend.
///
/// Camera matrices are produced Y-up; a Y-down backend needs a flip in the
/// per-frame base transform.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ClipSpace {
    /// +Y points down the screen (Vulkan convention).
    YDown,
    /// +Y points up the screen (wgpu / D3D / Metal convention).
    YUp,
}

/// Resource and submission interface implemented by each GPU backend.
///
/// All calls happen on the submitting thread. Destruction calls must only be
/// made once no submitted work references the resource; callers guarantee
/// this with [`GpuBackend::drain`].
pub trait GpuBackend {
    /// Allocates a device-resident buffer of exactly `desc.size` bytes.
    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferHandle, GpuError>;

    /// Copies `data` into `buffer` at `offset` and returns once the data is
    /// visible to subsequently submitted GPU work.
    fn upload_buffer_sync(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GpuError>;

    /// Returns the shader-visible address of `buffer`.
    fn buffer_address(&self, buffer: BufferHandle) -> Result<DeviceAddress, GpuError>;

    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// Allocates an image. Its contents and layout are undefined until a
    /// layout transition has been recorded for it.
    fn create_image(&mut self, desc: &ImageDesc<'_>) -> Result<ImageHandle, GpuError>;

    fn destroy_image(&mut self, image: ImageHandle);

    fn create_pipeline(&mut self, desc: &PipelineDesc<'_>) -> Result<PipelineHandle, GpuError>;

    fn destroy_pipeline(&mut self, pipeline: PipelineHandle);

    /// Executes a recorded command list.
    fn submit(&mut self, commands: CommandList) -> Result<(), GpuError>;

    /// Blocks until every previously submitted command list has finished.
    fn drain(&mut self) -> Result<(), GpuError>;

    fn clip_space(&self) -> ClipSpace;
}
