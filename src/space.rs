use crate::element::Tri3Element;
use crate::mesh::TriangleMesh2d;
use crate::Real;
use nalgebra::{DVector, Point2, Scalar};

/// A continuous piecewise linear (degree 1 Lagrange) function space over a triangle mesh.
///
/// Every mesh vertex carries exactly one degree of freedom, so functions in the space
/// are identified with vectors of nodal values.
#[derive(Debug, Clone)]
pub struct FunctionSpace<T>
where
    T: Scalar,
{
    mesh: TriangleMesh2d<T>,
}

impl<T> FunctionSpace<T>
where
    T: Scalar,
{
    pub fn from_mesh(mesh: TriangleMesh2d<T>) -> Self {
        Self { mesh }
    }

    pub fn mesh(&self) -> &TriangleMesh2d<T> {
        &self.mesh
    }

    pub fn num_dofs(&self) -> usize {
        self.mesh.vertices().len()
    }

    pub fn num_elements(&self) -> usize {
        self.mesh.connectivity().len()
    }

    pub fn element_node_count(&self, _element_index: usize) -> usize {
        3
    }

    pub fn populate_element_nodes(&self, output: &mut [usize], element_index: usize) {
        output.copy_from_slice(self.mesh.connectivity()[element_index].vertex_indices());
    }

    /// The coordinates of the degree of freedom with the given index.
    pub fn dof_coordinates(&self, dof: usize) -> &Point2<T> {
        &self.mesh.vertices()[dof]
    }
}

impl<T> FunctionSpace<T>
where
    T: Real,
{
    /// The geometric element associated with the given cell index.
    ///
    /// Panics if the index is out of bounds.
    pub fn element(&self, element_index: usize) -> Tri3Element<T> {
        let conn = &self.mesh.connectivity()[element_index];
        let vertices = self.mesh.vertices();
        Tri3Element::from_vertices([vertices[conn[0]], vertices[conn[1]], vertices[conn[2]]])
    }

    /// A zero-initialized vector of nodal values.
    pub fn create_dof_vector(&self) -> DVector<T> {
        DVector::zeros(self.num_dofs())
    }

    /// Nodal interpolation of the given function onto the space.
    pub fn interpolate(&self, f: impl Fn(&Point2<T>) -> T) -> DVector<T> {
        DVector::from_iterator(self.num_dofs(), self.mesh.vertices().iter().map(|v| f(v)))
    }
}

/// Returns the sorted indices of all degrees of freedom whose coordinates satisfy
/// the given predicate.
pub fn locate_dofs_geometrical<T>(
    space: &FunctionSpace<T>,
    predicate: impl Fn(&Point2<T>) -> bool,
) -> Vec<usize>
where
    T: Scalar,
{
    space
        .mesh()
        .vertices()
        .iter()
        .enumerate()
        .filter_map(|(i, v)| if predicate(v) { Some(i) } else { None })
        .collect()
}
