pub mod assembly;
pub mod bc;
pub mod connectivity;
pub mod element;
pub mod forms;
pub mod mesh;
pub mod problem;
pub mod quadrature;
pub mod space;

pub mod optimize {
    pub use galerkin_optimize::*;
}

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

pub use galerkin_traits::Real;
