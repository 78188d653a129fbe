//! Quadrature rules on the reference triangle with corners (0, 0), (1, 0), (0, 1).
use crate::Real;
use nalgebra::Point2;
use numeric_literals::replace_float_literals;

/// Weights and points of a quadrature rule on the reference triangle.
pub type QuadraturePair2d<T> = (Vec<T>, Vec<Point2<T>>);

/// The centroid rule. Exact for polynomials of total degree 1.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn triangle_quadrature_strength_1<T>() -> QuadraturePair2d<T>
where
    T: Real,
{
    (vec![0.5], vec![Point2::new(1.0 / 3.0, 1.0 / 3.0)])
}

/// The symmetric three-point rule. Exact for polynomials of total degree 2.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn triangle_quadrature_strength_2<T>() -> QuadraturePair2d<T>
where
    T: Real,
{
    let weights = vec![1.0 / 6.0; 3];
    let points = vec![
        Point2::new(1.0 / 6.0, 1.0 / 6.0),
        Point2::new(2.0 / 3.0, 1.0 / 6.0),
        Point2::new(1.0 / 6.0, 2.0 / 3.0),
    ];
    (weights, points)
}
