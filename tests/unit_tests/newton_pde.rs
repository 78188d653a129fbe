use galerkin::bc::DirichletBC;
use galerkin::forms::{Coefficient, ResidualForm, SourceTerm};
use galerkin::optimize::newton::{newton, newton_line_search, BacktrackingLineSearch, NewtonSettings};
use galerkin::problem::{NewtonPdeFunction, NonlinearPdeProblem, NonlinearProblem};
use galerkin::space::{locate_dofs_geometrical, FunctionSpace};

use super::{is_left_or_right_boundary, unit_square_space};

/// F(u; v) = ∫ 10 v dx − ∫ ∇u·∇v dx with u = g on x = 0 and x = 1.
fn linear_poisson_form() -> ResidualForm<f64> {
    ResidualForm::new(
        SourceTerm::constant(10.0),
        Coefficient::constant(1.0),
        Coefficient::constant(0.0),
    )
}

/// F(u; v) = ∫ 5 v dx − ∫ |u| ∇u·∇v dx − ∫ u v dx with u = g on x = 0 and x = 1.
fn nonlinear_poisson_form() -> ResidualForm<f64> {
    ResidualForm::new(
        SourceTerm::constant(5.0),
        Coefficient::of_state(|u: f64| u.abs(), |u: f64| u.signum()),
        Coefficient::of_state(|u: f64| u, |_| 1.0),
    )
}

fn boundary_bc(space: &FunctionSpace<f64>, value: f64) -> DirichletBC<f64> {
    let dofs = locate_dofs_geometrical(space, is_left_or_right_boundary);
    DirichletBC::with_constant_value(dofs, value)
}

#[test]
fn newton_converges_in_single_iteration_for_linear_pde() {
    let space = unit_square_space(12);
    let problem = NonlinearPdeProblem::new(&space, linear_poisson_form(), boundary_bc(&space, 1.0))
        .expect("Form is differentiable");

    let mut x = problem.create_vector();
    let mut f = problem.create_vector();
    let mut dx = problem.create_vector();
    let mut function = NewtonPdeFunction::new(problem);

    let settings = NewtonSettings {
        max_iterations: Some(10),
        tolerance: 1e-10,
    };

    let iterations = newton(&mut function, &mut x, &mut f, &mut dx, settings).expect("Newton must converge");
    assert_eq!(iterations, 1);

    for &dof in function.problem().bc().dofs() {
        assert!((x[dof] - 1.0).abs() < 1e-10);
    }
    // On this structured mesh the nodal values reproduce the exact solution
    // u = 1 + 5 x (1 - x); at the center of the square u = 2.25.
    let center_dof = 6 * 13 + 6;
    assert!((x[center_dof] - 2.25).abs() < 1e-9);

    // Increment the boundary condition and solve again: the same adapter (same
    // forms, same sparsity) must again converge in a single iteration.
    function.problem_mut().bc_mut().set_value(2.0);
    let iterations = newton(&mut function, &mut x, &mut f, &mut dx, settings).expect("Newton must converge");
    assert_eq!(iterations, 1);
    for &dof in function.problem().bc().dofs() {
        assert!((x[dof] - 2.0).abs() < 1e-10);
    }
    assert!((x[center_dof] - 3.25).abs() < 1e-9);
}

#[test]
fn linear_pde_iteration_count_is_independent_of_initial_guess() {
    let space = unit_square_space(8);
    let problem = NonlinearPdeProblem::new(&space, linear_poisson_form(), boundary_bc(&space, 1.0))
        .expect("Form is differentiable");

    let mut x = space.interpolate(|p| 3.0 * p.x * p.y - 0.7);
    let mut f = problem.create_vector();
    let mut dx = problem.create_vector();
    let mut function = NewtonPdeFunction::new(problem);

    let settings = NewtonSettings {
        max_iterations: Some(10),
        tolerance: 1e-10,
    };

    let iterations = newton(&mut function, &mut x, &mut f, &mut dx, settings).expect("Newton must converge");
    assert_eq!(iterations, 1);
}

#[test]
fn newton_converges_for_nonlinear_pde() {
    let space = unit_square_space(12);
    let problem = NonlinearPdeProblem::new(&space, nonlinear_poisson_form(), boundary_bc(&space, 1.0))
        .expect("Form is differentiable");

    let mut x = problem.create_vector();
    x.fill(0.9);
    let mut f = problem.create_vector();
    let mut dx = problem.create_vector();
    let mut function = NewtonPdeFunction::new(problem);

    let settings = NewtonSettings {
        max_iterations: Some(10),
        tolerance: 1e-8,
    };

    let iterations = newton(&mut function, &mut x, &mut f, &mut dx, settings).expect("Newton must converge");
    assert!(iterations < 6, "Expected convergence in less than 6 iterations, got {}", iterations);

    // Modify the boundary condition and solve again
    function.problem_mut().bc_mut().set_value(0.5);
    let iterations = newton(&mut function, &mut x, &mut f, &mut dx, settings).expect("Newton must converge");
    assert!(iterations < 6, "Expected convergence in less than 6 iterations, got {}", iterations);
    for &dof in function.problem().bc().dofs() {
        assert!((x[dof] - 0.5).abs() < 1e-10);
    }
}

#[test]
fn newton_with_line_search_converges_for_nonlinear_pde() {
    let space = unit_square_space(15);
    let problem = NonlinearPdeProblem::new(&space, nonlinear_poisson_form(), boundary_bc(&space, 1.0))
        .expect("Form is differentiable");

    let mut x = problem.create_vector();
    x.fill(0.9);
    let mut f = problem.create_vector();
    let mut dx = problem.create_vector();
    let mut function = NewtonPdeFunction::new(problem);

    let settings = NewtonSettings {
        max_iterations: Some(10),
        tolerance: 1e-8,
    };

    let iterations = newton_line_search(
        &mut function,
        &mut x,
        &mut f,
        &mut dx,
        settings,
        &mut BacktrackingLineSearch,
    )
    .expect("Newton must converge");
    assert!(iterations < 6, "Expected convergence in less than 6 iterations, got {}", iterations);

    // Modify the boundary condition and solve again
    function.problem_mut().bc_mut().set_value(0.6);
    let iterations = newton_line_search(
        &mut function,
        &mut x,
        &mut f,
        &mut dx,
        settings,
        &mut BacktrackingLineSearch,
    )
    .expect("Newton must converge");
    assert!(iterations < 6, "Expected convergence in less than 6 iterations, got {}", iterations);
}
