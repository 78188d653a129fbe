pub mod calculus;
pub mod newton;

pub use galerkin_traits::Real;
