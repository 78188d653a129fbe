use crate::space::FunctionSpace;
use crate::Real;
use itertools::izip;
use nalgebra::{DVectorView, DVectorViewMut, Point2, Scalar};

/// A Dirichlet constraint: a set of degrees of freedom fixed to prescribed values.
///
/// The constrained dof set is fixed at construction; the prescribed values may be
/// changed between solves through [`DirichletBC::set_value`] and
/// [`DirichletBC::set_values`].
#[derive(Debug, Clone, PartialEq)]
pub struct DirichletBC<T>
where
    T: Scalar,
{
    dofs: Vec<usize>,
    values: Vec<T>,
}

impl<T> DirichletBC<T>
where
    T: Real,
{
    /// Constrains the given dofs to a single constant value.
    ///
    /// The dof set is sorted and deduplicated.
    pub fn with_constant_value(mut dofs: Vec<usize>, value: T) -> Self {
        dofs.sort_unstable();
        dofs.dedup();
        let values = vec![value; dofs.len()];
        Self { dofs, values }
    }

    /// Constrains the given dofs to the values of `g` evaluated at the dof coordinates.
    pub fn from_fn(space: &FunctionSpace<T>, mut dofs: Vec<usize>, g: impl Fn(&Point2<T>) -> T) -> Self {
        dofs.sort_unstable();
        dofs.dedup();
        let values = dofs.iter().map(|&dof| g(space.dof_coordinates(dof))).collect();
        Self { dofs, values }
    }

    pub fn dofs(&self) -> &[usize] {
        &self.dofs
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Replaces the prescribed value of every constrained dof with the given value.
    pub fn set_value(&mut self, value: T) {
        for v in &mut self.values {
            *v = value;
        }
    }

    /// Replaces the prescribed values, one per constrained dof.
    ///
    /// Panics if the number of values does not match the number of constrained dofs.
    pub fn set_values(&mut self, values: &[T]) {
        assert_eq!(
            values.len(),
            self.values.len(),
            "Number of values must match number of constrained dofs."
        );
        self.values.copy_from_slice(values);
    }

    /// Iterates over pairs of (constrained dof, prescribed value).
    pub fn iter(&self) -> impl Iterator<Item = (usize, T)> + '_ {
        izip!(&self.dofs, &self.values).map(|(&dof, &g)| (dof, g))
    }
}

/// Overwrites the entries of `b` at constrained dofs with `scale * (g - x[dof])`.
///
/// The overwrite deliberately discards any value previously accumulated in the
/// constrained entries, so that these entries read exactly the (scaled) deviation
/// of the current state from the prescribed boundary values.
pub fn set_bc<'a, T>(
    b: impl Into<DVectorViewMut<'a, T>>,
    bc: &DirichletBC<T>,
    x: impl Into<DVectorView<'a, T>>,
    scale: T,
) where
    T: Real,
{
    let mut b = b.into();
    let x = x.into();
    for (dof, g) in bc.iter() {
        b[dof] = scale * (g - x[dof]);
    }
}
