use thiserror::Error;

/// Errors raised by a [`GpuBackend`](super::GpuBackend).
///
/// None of these are retried: buffer sizes are static, and a failure while
/// recording or submitting leaves GPU state that cannot be safely resumed.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("failed to allocate {what} ({size} bytes)")]
    Allocation { what: String, size: u64 },

    #[error("device address space exhausted: requested {requested} bytes, {available} available")]
    OutOfAddressSpace { requested: u64, available: u64 },

    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u32 },

    #[error("upload of {len} bytes at offset {offset} does not fit buffer {id} ({size} bytes)")]
    UploadOutOfBounds {
        id: u32,
        offset: u64,
        len: u64,
        size: u64,
    },

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("pipeline creation failed: {0}")]
    PipelineCreation(String),

    #[error("device lost: {0}")]
    DeviceLost(String),
}
