/// A triangle mesh with shared vertices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    // The vertex positions.
    vertices: Vec<[f64; 3]>,
    // Vertex indices of each triangle.
    faces: Vec<[usize; 3]>,
}

impl TriangleMesh {
    /// Create a mesh from vertices and triangles.
    ///
    /// The caller guarantees every face index is smaller than `vertices.len()`.
    pub fn new(vertices: Vec<[f64; 3]>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Get as reference the vertices.
    pub fn vertices(&self) -> &[[f64; 3]] {
        &self.vertices
    }

    /// Get as reference the triangles.
    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    /// Number of triangles.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh has no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Axis aligned bounds as `(min, max)`, `None` for a mesh without vertices.
    pub fn bounds(&self) -> Option<([f64; 3], [f64; 3])> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(mut lo, mut hi), v| {
            for i in 0..3 {
                lo[i] = lo[i].min(v[i]);
                hi[i] = hi[i].max(v[i]);
            }
            (lo, hi)
        }))
    }

    /// The three corner positions of a triangle.
    #[inline]
    pub fn triangle(&self, face: usize) -> [[f64; 3]; 3] {
        let [a, b, c] = self.faces[face];
        [self.vertices[a], self.vertices[b], self.vertices[c]]
    }
}
