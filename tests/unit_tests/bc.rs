use galerkin::bc::{set_bc, DirichletBC};
use galerkin::space::locate_dofs_geometrical;
use nalgebra::DVector;

use super::{is_left_or_right_boundary, unit_square_space};

#[test]
fn locate_dofs_geometrical_finds_left_and_right_edges() {
    let space = unit_square_space(4);
    let dofs = locate_dofs_geometrical(&space, is_left_or_right_boundary);
    // 5 vertices on each of the two constrained edges
    assert_eq!(dofs.len(), 10);
    for &dof in &dofs {
        let x = space.dof_coordinates(dof).x;
        assert!(x == 0.0 || x == 1.0);
    }
}

#[test]
fn constrained_dofs_are_sorted_and_deduplicated() {
    let bc = DirichletBC::with_constant_value(vec![5, 1, 3, 1, 5], 2.0);
    assert_eq!(bc.dofs(), &[1, 3, 5]);
    assert_eq!(bc.values(), &[2.0, 2.0, 2.0]);
}

#[test]
fn set_bc_overwrites_constrained_entries() {
    let bc = DirichletBC::with_constant_value(vec![0, 2], 1.5);
    let x = DVector::from_column_slice(&[0.5, 10.0, 2.0]);
    // Pre-existing values must be discarded, not accumulated
    let mut b = DVector::from_column_slice(&[100.0, 100.0, 100.0]);

    set_bc(&mut b, &bc, &x, -1.0);

    assert_eq!(b[0], -(1.5 - 0.5));
    assert_eq!(b[1], 100.0);
    assert_eq!(b[2], -(1.5 - 2.0));
}

#[test]
fn prescribed_values_can_change_between_solves() {
    let mut bc = DirichletBC::with_constant_value(vec![0, 1], 1.0);
    bc.set_value(2.0);
    assert_eq!(bc.values(), &[2.0, 2.0]);
    bc.set_values(&[3.0, 4.0]);
    assert_eq!(bc.values(), &[3.0, 4.0]);
    // The dof set is unchanged throughout
    assert_eq!(bc.dofs(), &[0, 1]);
}

#[test]
#[should_panic]
fn set_values_panics_on_length_mismatch() {
    let mut bc = DirichletBC::with_constant_value(vec![0, 1], 1.0);
    bc.set_values(&[3.0]);
}
