//! Basic procedural mesh generation routines.
use crate::connectivity::Tri3Connectivity;
use crate::mesh::TriangleMesh2d;
use crate::Real;
use nalgebra::Point2;

/// Generates a uniform triangulation of the unit square `[0, 1]^2`.
///
/// The square is divided into `cells_per_dim * cells_per_dim` grid cells, each of
/// which is split into two triangles, giving `(cells_per_dim + 1)^2` vertices.
/// All cells are counter-clockwise oriented.
pub fn create_unit_square_uniform_tri_mesh_2d<T>(cells_per_dim: usize) -> TriangleMesh2d<T>
where
    T: Real,
{
    if cells_per_dim == 0 {
        return TriangleMesh2d::from_vertices_and_connectivity(Vec::new(), Vec::new());
    }

    let mut vertices = Vec::new();
    let mut cells = Vec::new();

    let num_vertices_per_dim = cells_per_dim + 1;
    let cell_size = T::one() / T::from_usize(cells_per_dim).expect("Must be able to fit usize in T");

    let to_global_vertex_index = |i: usize, j: usize| num_vertices_per_dim * j + i;

    for j in 0..num_vertices_per_dim {
        for i in 0..num_vertices_per_dim {
            let i_as_t = T::from_usize(i).expect("Must be able to fit usize in T");
            let j_as_t = T::from_usize(j).expect("Must be able to fit usize in T");
            vertices.push(Point2::new(i_as_t * cell_size, j_as_t * cell_size));
        }
    }

    for j in 0..cells_per_dim {
        for i in 0..cells_per_dim {
            let idx = &to_global_vertex_index;
            cells.push(Tri3Connectivity([idx(i, j), idx(i + 1, j), idx(i + 1, j + 1)]));
            cells.push(Tri3Connectivity([idx(i, j), idx(i + 1, j + 1), idx(i, j + 1)]));
        }
    }

    TriangleMesh2d::from_vertices_and_connectivity(vertices, cells)
}
