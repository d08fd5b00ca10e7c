//! Cube renderer.
//!
//! Per-frame orchestration on top of the [`gpu`](crate::gpu) vocabulary:
//! - [`upload`]: one-shot mesh upload at startup
//! - [`pipeline`]: the single graphics pipeline and its reload protocol
//! - [`depth`]: depth attachment kept in sync with the output extent
//! - [`frame`]: the frame state machine tying it all together

pub mod depth;
pub mod frame;
pub mod pipeline;
pub mod push;
pub mod reload;
pub mod upload;

pub use depth::{DepthAttachment, DepthManager};
pub use frame::{FrameContext, FrameStats, RenderError, Renderer, RendererConfig};
pub use pipeline::{Pipeline, PipelineError, PipelineManager, build_pipeline};
pub use push::PushConstants;
pub use reload::ReloadSignal;
pub use upload::{UploadedBuffer, UploadedMesh, upload_mesh};
