use crate::connectivity::Tri3Connectivity;
use nalgebra::{Point2, Scalar};
use serde::{Deserialize, Serialize};

pub mod procedural;

/// Index-based data structure for conforming triangle meshes in two dimensions
/// (i.e. no hanging nodes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct TriangleMesh2d<T>
where
    T: Scalar,
{
    vertices: Vec<Point2<T>>,
    connectivity: Vec<Tri3Connectivity>,
}

impl<T> TriangleMesh2d<T>
where
    T: Scalar,
{
    /// Construct a mesh from vertices and connectivity.
    ///
    /// The provided connectivity is expected only to contain valid (i.e. in-bounds)
    /// vertex indices, but this cannot be trusted. Users of the mesh are permitted
    /// to panic when they encounter indices out of bounds.
    pub fn from_vertices_and_connectivity(vertices: Vec<Point2<T>>, connectivity: Vec<Tri3Connectivity>) -> Self {
        Self { vertices, connectivity }
    }

    pub fn vertices(&self) -> &[Point2<T>] {
        &self.vertices
    }

    pub fn connectivity(&self) -> &[Tri3Connectivity] {
        &self.connectivity
    }

    /// The corner vertices of the cell with the given index.
    pub fn cell_vertices(&self, index: usize) -> Option<[Point2<T>; 3]> {
        let conn = self.connectivity.get(index)?;
        Some([
            self.vertices[conn[0]].clone(),
            self.vertices[conn[1]].clone(),
            self.vertices[conn[2]].clone(),
        ])
    }
}
