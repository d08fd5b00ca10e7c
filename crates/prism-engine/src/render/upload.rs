use crate::gpu::{BufferDesc, BufferHandle, BufferUsage, DeviceAddress, GpuBackend, GpuError};
use crate::mesh::CubeMesh;

/// A device buffer together with its shader-visible address.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UploadedBuffer {
    pub handle: BufferHandle,
    pub address: DeviceAddress,
    pub size: u64,
}

/// Cube mesh resident on the GPU.
///
/// Read-only after upload; released by [`UploadedMesh::destroy`] once the
/// device has been drained.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UploadedMesh {
    /// Positions followed by face colors.
    pub vertices: UploadedBuffer,
    pub indices: UploadedBuffer,
    /// Face id per triangle. Uploaded for per-face shading; its address is
    /// not part of the push-constant block.
    pub face_ids: UploadedBuffer,
    pub index_count: u32,
}

impl UploadedMesh {
    pub fn destroy(self, backend: &mut impl GpuBackend) {
        backend.destroy_buffer(self.vertices.handle);
        backend.destroy_buffer(self.indices.handle);
        backend.destroy_buffer(self.face_ids.handle);
    }
}

/// Allocates and synchronously fills the three cube buffers.
///
/// Any failure is fatal for startup; nothing is retried because every size
/// here is static. Buffers created before the failure are destroyed.
pub fn upload_mesh(backend: &mut impl GpuBackend, mesh: &CubeMesh) -> Result<UploadedMesh, GpuError> {
    let buffers = mesh.buffers();
    let face_index = mesh.face_index_buffer();

    let sources: [(&str, BufferUsage, &[u8]); 3] = [
        (
            "cube vertices",
            BufferUsage::STORAGE,
            bytemuck::cast_slice(&buffers.vertices),
        ),
        (
            "cube indices",
            BufferUsage::INDEX,
            bytemuck::cast_slice(&buffers.indices),
        ),
        (
            "cube face ids",
            BufferUsage::STORAGE,
            bytemuck::cast_slice(&face_index.face_ids),
        ),
    ];

    let mut uploaded = Vec::with_capacity(sources.len());
    for (label, usage, bytes) in sources {
        match upload(backend, label, usage, bytes) {
            Ok(buffer) => uploaded.push(buffer),
            Err(err) => {
                for buffer in uploaded {
                    backend.destroy_buffer(buffer.handle);
                }
                return Err(err);
            }
        }
    }
    let [vertices, indices, face_ids] = [uploaded[0], uploaded[1], uploaded[2]];

    log::debug!(
        "uploaded cube mesh: vertices {} ({} B), indices {} ({} B), face ids {} ({} B)",
        vertices.address,
        vertices.size,
        indices.address,
        indices.size,
        face_ids.address,
        face_ids.size,
    );

    Ok(UploadedMesh {
        vertices,
        indices,
        face_ids,
        index_count: buffers.indices.len() as u32,
    })
}

fn upload(
    backend: &mut impl GpuBackend,
    label: &str,
    usage: BufferUsage,
    bytes: &[u8],
) -> Result<UploadedBuffer, GpuError> {
    let size = bytes.len() as u64;
    let handle = backend.create_buffer(&BufferDesc { label, size, usage })?;
    let address = backend
        .upload_buffer_sync(handle, 0, bytes)
        .and_then(|()| backend.buffer_address(handle));
    match address {
        Ok(address) => Ok(UploadedBuffer {
            handle,
            address,
            size,
        }),
        Err(err) => {
            backend.destroy_buffer(handle);
            Err(err)
        }
    }
}
