use bytemuck::{Pod, Zeroable};

/// Number of unique cube corners.
pub const CUBE_VERTICES: usize = 8;
pub const CUBE_FACES: usize = 6;
pub const CUBE_TRIANGLES: usize = CUBE_FACES * 2;
pub const CUBE_INDEX_COUNT: usize = CUBE_TRIANGLES * 3;

/// A cube corner position.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
}

impl Vertex {
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { position: [x, y, z] }
    }
}

/// One quad face: four corner indices and a flat color.
///
/// Corners are ordered so that the quad splits along the v0-v3 / v1-v3
/// diagonal:
///
/// ```text
/// v0 --- v3
///  |   / |
///  |  /  |
///  | /   |
/// v1 --- v2
/// ```
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FaceRecord {
    pub corners: [u32; 4],
    pub color: [f32; 3],
}

impl FaceRecord {
    /// The two triangles of this face, always `(v0, v1, v3)` then `(v1, v2, v3)`.
    #[inline]
    pub const fn triangles(&self) -> [[u32; 3]; 2] {
        let [v0, v1, v2, v3] = self.corners;
        [[v0, v1, v3], [v1, v2, v3]]
    }
}

/// Host copies of everything the cube needs on the GPU.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBuffers {
    /// 8 corner positions followed by 6 face colors, three floats each.
    pub vertices: Vec<[f32; 3]>,
    /// 12 triangles indexing into the corner positions.
    pub indices: Vec<u32>,
}

/// Source face id of each emitted triangle, parallel to the triangle list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceIndexBuffer {
    pub face_ids: Vec<u32>,
}

/// Unit cube spanning `[0, 1]` on every axis, Y up, right-handed.
///
/// ```text
///  +Y
///  ^
///  |
///  D------C.
///  |\     |\
///  | H----+-G
///  | |    | |
///  A-+----B | ---> +X
///   \|     \|
///    E------F
///     \
///      v +Z
/// ```
///
/// Every face is wound clockwise when seen from outside the cube, so the
/// right-hand normal of each triangle points inward. A Y-flipping projection
/// turns that into counter-clockwise on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeMesh {
    vertices: [Vertex; CUBE_VERTICES],
    faces: [FaceRecord; CUBE_FACES],
}

impl CubeMesh {
    pub fn unit() -> Self {
        const A: u32 = 0;
        const B: u32 = 1;
        const C: u32 = 2;
        const D: u32 = 3;
        const E: u32 = 4;
        const F: u32 = 5;
        const G: u32 = 6;
        const H: u32 = 7;

        let vertices = [
            Vertex::new(0.0, 0.0, 0.0), // A
            Vertex::new(1.0, 0.0, 0.0), // B
            Vertex::new(1.0, 1.0, 0.0), // C
            Vertex::new(0.0, 1.0, 0.0), // D
            Vertex::new(0.0, 0.0, 1.0), // E
            Vertex::new(1.0, 0.0, 1.0), // F
            Vertex::new(1.0, 1.0, 1.0), // G
            Vertex::new(0.0, 1.0, 1.0), // H
        ];

        let face = |corners: [u32; 4], color: [f32; 3]| FaceRecord { corners, color };
        let faces = [
            face([H, D, C, G], [0.0, 1.0, 0.0]), // top
            face([A, B, C, D], [1.0, 0.0, 0.0]), // north
            face([A, D, H, E], [0.0, 0.0, 1.0]), // west
            face([F, G, C, B], [1.0, 0.0, 1.0]), // east
            face([E, H, G, F], [0.0, 1.0, 1.0]), // south
            face([E, F, B, A], [1.0, 1.0, 0.0]), // bottom
        ];

        Self { vertices, faces }
    }

    pub fn vertices(&self) -> &[Vertex; CUBE_VERTICES] {
        &self.vertices
    }

    pub fn faces(&self) -> &[FaceRecord; CUBE_FACES] {
        &self.faces
    }

    /// Triangles in emission order: face 0 first triangle, face 0 second, ...
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.faces.iter().flat_map(FaceRecord::triangles)
    }

    /// Combined vertex storage and index list.
    pub fn buffers(&self) -> MeshBuffers {
        let vertices = self
            .vertices
            .iter()
            .map(|v| v.position)
            .chain(self.faces.iter().map(|f| f.color))
            .collect();
        let indices = self.triangles().flatten().collect();
        MeshBuffers { vertices, indices }
    }

    pub fn face_index_buffer(&self) -> FaceIndexBuffer {
        let face_ids = (0..self.faces.len() as u32)
            .flat_map(|face| [face, face])
            .collect();
        FaceIndexBuffer { face_ids }
    }
}

impl Default for CubeMesh {
    fn default() -> Self {
        Self::unit()
    }
}
