use galerkin::quadrature::{triangle_quadrature_strength_1, triangle_quadrature_strength_2};

fn integrate(rule: &galerkin::quadrature::QuadraturePair2d<f64>, f: impl Fn(f64, f64) -> f64) -> f64 {
    let (weights, points) = rule;
    weights.iter().zip(points).map(|(w, p)| w * f(p.x, p.y)).sum()
}

#[test]
fn quadrature_weights_sum_to_reference_triangle_area() {
    let (weights, _) = triangle_quadrature_strength_1::<f64>();
    assert!((weights.iter().sum::<f64>() - 0.5).abs() < 1e-15);

    let (weights, _) = triangle_quadrature_strength_2::<f64>();
    assert!((weights.iter().sum::<f64>() - 0.5).abs() < 1e-15);
}

#[test]
fn strength_1_rule_integrates_linears_exactly() {
    let rule = triangle_quadrature_strength_1::<f64>();
    assert!((integrate(&rule, |x, _| x) - 1.0 / 6.0).abs() < 1e-15);
    assert!((integrate(&rule, |_, y| y) - 1.0 / 6.0).abs() < 1e-15);
}

#[test]
fn strength_2_rule_integrates_quadratics_exactly() {
    let rule = triangle_quadrature_strength_2::<f64>();
    assert!((integrate(&rule, |x, _| x) - 1.0 / 6.0).abs() < 1e-15);
    assert!((integrate(&rule, |x, _| x * x) - 1.0 / 12.0).abs() < 1e-15);
    assert!((integrate(&rule, |_, y| y * y) - 1.0 / 12.0).abs() < 1e-15);
    assert!((integrate(&rule, |x, y| x * y) - 1.0 / 24.0).abs() < 1e-15);
}
