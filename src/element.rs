use crate::Real;
use nalgebra::{Matrix1x3, Matrix2, Matrix2x3, OPoint, Point2, Scalar, Vector2};
use numeric_literals::replace_float_literals;

/// A finite element representing linear basis functions on a triangle, in two dimensions.
///
/// The reference element is the unit triangle with corners (0, 0), (1, 0), (0, 1),
/// which matches the domain of the quadrature rules in [`crate::quadrature`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tri3Element<T>
where
    T: Scalar,
{
    vertices: [Point2<T>; 3],
}

impl<T> Tri3Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point2<T>; 3]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point2<T>; 3] {
        &self.vertices
    }
}

impl<T> Tri3Element<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn reference() -> Self {
        Self::from_vertices([Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)])
    }

    /// Evaluates the three nodal basis functions at the given reference coordinates.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn evaluate_basis(&self, xi: &Point2<T>) -> Matrix1x3<T> {
        Matrix1x3::new(1.0 - xi.x - xi.y, xi.x, xi.y)
    }

    /// Gradients of the basis functions with respect to the reference coordinates,
    /// one column per basis function. Constant for a linear triangle.
    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn gradients(&self) -> Matrix2x3<T> {
        Matrix2x3::from_columns(&[
            Vector2::new(-1.0, -1.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(0.0, 1.0)
        ])
    }

    /// The Jacobian of the map from reference to physical coordinates.
    /// Constant for a linear triangle.
    #[allow(non_snake_case)]
    pub fn reference_jacobian(&self) -> Matrix2<T> {
        let X: Matrix2x3<T> = Matrix2x3::from_fn(|i, j| self.vertices[j][i]);
        let G = self.gradients();
        X * G.transpose()
    }

    #[allow(non_snake_case)]
    pub fn map_reference_coords(&self, xi: &Point2<T>) -> Point2<T> {
        let X: Matrix2x3<T> = Matrix2x3::from_fn(|i, j| self.vertices[j][i]);
        let N = self.evaluate_basis(xi);
        OPoint::from(&X * &N.transpose())
    }
}
