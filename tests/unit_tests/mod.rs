use galerkin::mesh::procedural::create_unit_square_uniform_tri_mesh_2d;
use galerkin::space::FunctionSpace;
use nalgebra::Point2;

mod bc;
mod newton_pde;
mod problem;
mod quadrature;

pub fn unit_square_space(cells_per_dim: usize) -> FunctionSpace<f64> {
    FunctionSpace::from_mesh(create_unit_square_uniform_tri_mesh_2d(cells_per_dim))
}

/// Dirichlet boundary of the test problems: the edges x = 0 and x = 1.
pub fn is_left_or_right_boundary(x: &Point2<f64>) -> bool {
    x.x < 1.0e-8 || x.x > 1.0 - 1.0e-8
}
