//! wgpu device, surface and [`GpuBackend`](crate::gpu::GpuBackend) implementation.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain)
//! - executing [`CommandList`](crate::gpu::CommandList)s on the device
//! - emulating buffer device addresses over one storage buffer

mod arena;
mod backend;
mod context;
mod convert;
mod error;
mod init;
mod surface;

pub use arena::{ALIGN, AddressSpace, RESERVED, Range};
pub use backend::WgpuBackend;
pub use context::{Gpu, GpuFrame};
pub use error::SurfaceErrorAction;
pub use init::{DEFAULT_ADDRESS_SPACE, GpuInit};
