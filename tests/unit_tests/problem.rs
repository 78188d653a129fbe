use galerkin::assembly::AssemblyError;
use galerkin::bc::DirichletBC;
use galerkin::forms::{Coefficient, FormError, ResidualForm, SourceTerm};
use galerkin::problem::{NonlinearPdeProblem, NonlinearProblem};
use galerkin::space::locate_dofs_geometrical;
use nalgebra::{DVector, DVectorView, DVectorViewMut};
use proptest::collection::vec;
use proptest::prelude::*;

use super::{is_left_or_right_boundary, unit_square_space};

fn nonlinear_form() -> ResidualForm<f64> {
    ResidualForm::new(
        SourceTerm::constant(5.0),
        Coefficient::of_state(|u: f64| 1.0 + u * u, |u: f64| 2.0 * u),
        Coefficient::of_state(|u: f64| u, |_| 1.0),
    )
}

#[test]
fn construction_fails_for_non_differentiable_form() {
    let space = unit_square_space(2);
    let dofs = locate_dofs_geometrical(&space, is_left_or_right_boundary);
    let bc = DirichletBC::with_constant_value(dofs, 1.0);
    let form = ResidualForm::new(
        SourceTerm::constant(1.0),
        Coefficient::of_state_without_derivative(|u: f64| u * u),
        Coefficient::constant(0.0),
    );

    let error = NonlinearPdeProblem::new(&space, form, bc).expect_err("Derivation must fail");
    assert_eq!(error, FormError::MissingDerivative { term: "diffusion" });
}

#[test]
fn residual_at_constrained_dofs_equals_deviation_from_boundary_values() {
    let space = unit_square_space(4);
    let dofs = locate_dofs_geometrical(&space, is_left_or_right_boundary);
    let bc = DirichletBC::with_constant_value(dofs, 1.0);
    let mut problem = NonlinearPdeProblem::new(&space, nonlinear_form(), bc).unwrap();

    // An arbitrary state that satisfies the constraints nowhere
    let x = space.interpolate(|p| 0.3 + p.x + 2.0 * p.y * p.y);
    let mut b = problem.create_vector();
    problem
        .assemble_residual_into(&mut DVectorViewMut::from(&mut b), &DVectorView::from(&x))
        .unwrap();

    for (dof, g) in problem.bc().iter() {
        assert_eq!(b[dof], x[dof] - g);
    }
}

#[test]
fn created_matrices_share_the_derived_sparsity_pattern() {
    let space = unit_square_space(3);
    let dofs = locate_dofs_geometrical(&space, is_left_or_right_boundary);
    let bc = DirichletBC::with_constant_value(dofs, 1.0);
    let problem = NonlinearPdeProblem::new(&space, nonlinear_form(), bc).unwrap();

    let a1 = problem.create_matrix();
    let a2 = problem.create_matrix();
    assert_eq!(a1.pattern(), a2.pattern());
    assert_eq!(a1.nrows(), space.num_dofs());
}

#[test]
fn non_finite_coefficient_values_surface_as_assembly_errors() {
    let space = unit_square_space(2);
    let dofs = locate_dofs_geometrical(&space, is_left_or_right_boundary);
    let bc = DirichletBC::with_constant_value(dofs, 1.0);
    let form = ResidualForm::new(
        SourceTerm::constant(1.0),
        // sqrt is NaN for negative states and has no finite derivative at zero
        Coefficient::of_state(|u: f64| u.sqrt(), |u: f64| 0.5 / u.sqrt()),
        Coefficient::constant(0.0),
    );
    let mut problem = NonlinearPdeProblem::new(&space, form, bc).unwrap();

    let x = DVector::from_element(space.num_dofs(), -1.0);
    let mut b = problem.create_vector();
    let report = problem
        .assemble_residual_into(&mut DVectorViewMut::from(&mut b), &DVectorView::from(&x))
        .expect_err("Assembly must fail on NaN coefficients");

    let assembly_error = report
        .downcast_ref::<AssemblyError>()
        .expect("Error must be an assembly error");
    assert!(matches!(assembly_error, AssemblyError::NonFiniteCoefficient { .. }));
}

proptest! {
    #[test]
    fn residual_evaluation_is_idempotent(values in vec(-1.0..2.0f64, 25)) {
        let space = unit_square_space(4);
        prop_assert_eq!(space.num_dofs(), values.len());
        let dofs = locate_dofs_geometrical(&space, is_left_or_right_boundary);
        let bc = DirichletBC::with_constant_value(dofs, 1.0);
        let mut problem = NonlinearPdeProblem::new(&space, nonlinear_form(), bc).unwrap();

        let x = DVector::from_vec(values);
        let mut b1 = problem.create_vector();
        let mut b2 = problem.create_vector();
        problem.assemble_residual_into(&mut DVectorViewMut::from(&mut b1), &DVectorView::from(&x)).unwrap();
        problem.assemble_residual_into(&mut DVectorViewMut::from(&mut b2), &DVectorView::from(&x)).unwrap();

        // Repeated evaluation at a fixed state must be reproducible bit for bit
        prop_assert_eq!(b1, b2);
    }
}
