//! CPU-side mesh data.
//!
//! Meshes here are immutable once built; the uploader copies them to the GPU
//! exactly once.

mod cube;

pub use cube::{
    CubeMesh, FaceIndexBuffer, FaceRecord, MeshBuffers, Vertex, CUBE_FACES, CUBE_INDEX_COUNT,
    CUBE_TRIANGLES, CUBE_VERTICES,
};
