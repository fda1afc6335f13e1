//! Indexed triangle meshes.

use kerf_geom::{Bounds3, Point3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlicerError};

/// An indexed triangle mesh.
///
/// Vertices are stored flat as `[x0, y0, z0, x1, y1, z1, ...]` and every three
/// indices form one triangle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    /// Flat vertex coordinates.
    pub vertices: Vec<f32>,
    /// Triangle vertex indices.
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    /// Build a mesh from unindexed triangles.
    pub fn from_triangles(triangles: &[[Point3; 3]]) -> Self {
        let mut mesh = Self::default();
        for tri in triangles {
            for p in tri {
                mesh.indices.push((mesh.vertices.len() / 3) as u32);
                mesh.vertices.extend([p.x as f32, p.y as f32, p.z as f32]);
            }
        }
        mesh
    }

    /// Closed axis-aligned box between two corners, outward facing.
    pub fn cuboid(min: Point3, max: Point3) -> Self {
        let b = Bounds3::new(min, max);
        let (x0, y0, z0) = (b.min.x as f32, b.min.y as f32, b.min.z as f32);
        let (x1, y1, z1) = (b.max.x as f32, b.max.y as f32, b.max.z as f32);
        let vertices = vec![
            x0, y0, z0, x1, y0, z0, x1, y1, z0, x0, y1, z0, //
            x0, y0, z1, x1, y0, z1, x1, y1, z1, x0, y1, z1,
        ];
        let indices = vec![
            0, 2, 1, 0, 3, 2, // bottom
            4, 5, 6, 4, 6, 7, // top
            0, 1, 5, 0, 5, 4, // front
            2, 3, 7, 2, 7, 6, // back
            0, 4, 7, 0, 7, 3, // left
            1, 2, 6, 1, 6, 5, // right
        ];
        Self { vertices, indices }
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.indices.len() < 3 || self.vertices.len() < 9
    }

    /// Bounding box of every vertex.
    pub fn bounds(&self) -> Option<Bounds3> {
        let points: Vec<Point3> = self
            .vertices
            .chunks_exact(3)
            .map(|v| Point3::new(v[0] as f64, v[1] as f64, v[2] as f64))
            .collect();
        Bounds3::from_points(&points)
    }

    /// Resolve indices into triangles of `f64` points.
    pub fn triangles(&self) -> Result<Vec<[Point3; 3]>> {
        if self.is_empty() {
            return Err(SlicerError::EmptyMesh);
        }
        let vertex_count = self.vertices.len() / 3;
        let vertex = |i: u32| -> Result<Point3> {
            let i = i as usize;
            if i >= vertex_count {
                return Err(SlicerError::DegenerateMesh(format!(
                    "index {i} out of range for {vertex_count} vertices"
                )));
            }
            let v = &self.vertices[i * 3..i * 3 + 3];
            Ok(Point3::new(v[0] as f64, v[1] as f64, v[2] as f64))
        };

        self.indices
            .chunks_exact(3)
            .map(|t| Ok([vertex(t[0])?, vertex(t[1])?, vertex(t[2])?]))
            .collect()
    }
}
