//! Backend-neutral GPU vocabulary.
//!
//! Renderer code talks to the GPU only through the types in this module:
//! - typed handles issued by a [`GpuBackend`]
//! - resource descriptors (buffers, images, pipelines)
//! - an ordered [`CommandList`] that a backend executes on submit
//!
//! Keeping recording separate from execution lets the frame orchestration be
//! inspected command by command without a GPU (see [`HeadlessBackend`]).

mod backend;
mod command;
mod desc;
mod error;
mod handle;
mod headless;

pub use backend::{ClipSpace, GpuBackend};
pub use command::{
    Access, Command, CommandKind, CommandList, DrawIndexed, ImageBarrier, ImageLayout,
    IndexFormat, MemoryBarrier, PipelineStages, RenderTargets,
};
pub use desc::{
    BufferDesc, BufferUsage, CompareOp, Extent2d, FixedFunctionState, ImageDesc, ImageFormat,
    ImageUsage, PipelineDesc, RenderTargetFormats, ShaderCode, ShaderFlavor, ShaderModuleDesc,
    ShaderStage,
};
pub use error::GpuError;
pub use handle::{BufferHandle, DeviceAddress, ImageHandle, PipelineHandle};
pub use headless::{DeviceEvent, HeadlessBackend};
