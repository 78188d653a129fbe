//! Adapters that expose nonlinear PDE problems to generic Newton-type solvers.
use crate::assembly::{
    apply_dirichlet_identity_csr, apply_lifting, assemble_pattern, CsrAssembler, ElementJacobianAssembler,
    ElementResidualAssembler, VectorAssembler,
};
use crate::bc::{set_bc, DirichletBC};
use crate::forms::{FormError, JacobianForm, ResidualForm};
use crate::optimize::calculus::{DifferentiableVectorFunction, VectorFunction};
use crate::quadrature::{triangle_quadrature_strength_2, QuadraturePair2d};
use crate::space::FunctionSpace;
use crate::Real;
use log::debug;
use nalgebra::{DVector, DVectorView, DVectorViewMut, Scalar};
use nalgebra_sparse::convert::serial::convert_csr_dense;
use nalgebra_sparse::csr::CsrMatrix;
use nalgebra_sparse::pattern::SparsityPattern;
use std::error::Error;

/// The capability interface a nonlinear problem exposes to a Newton-type driver.
///
/// A driver holds the iterate and caller-owned residual/Jacobian storage obtained
/// once from the factory methods, and alternates between the pre-evaluation hook and
/// the two assembly operations. Both assembly operations refill the provided storage
/// in place; neither allocates output storage.
pub trait NonlinearProblem<T>
where
    T: Scalar,
{
    /// The number of degrees of freedom of the problem.
    fn num_dofs(&self) -> usize;

    /// Pre-evaluation hook: synchronizes internal coefficient state with the
    /// iterate `x`, so that subsequent assembly calls observe a consistent state.
    fn update_state(&mut self, x: &DVectorView<T>);

    /// Assembles the residual `F(x)` into `b`.
    fn assemble_residual_into(&mut self, b: &mut DVectorViewMut<T>, x: &DVectorView<T>) -> eyre::Result<()>;

    /// Assembles the Jacobian `dF/dx (x)` into `a`, which must have been created by
    /// [`NonlinearProblem::create_matrix`]. Only values are written; the sparsity
    /// pattern is never modified.
    fn assemble_jacobian_into(&mut self, a: &mut CsrMatrix<T>, x: &DVectorView<T>) -> eyre::Result<()>;

    /// Creates a zeroed vector matching the residual dimension.
    fn create_vector(&self) -> DVector<T>;

    /// Creates a zeroed matrix mirroring the Jacobian sparsity.
    fn create_matrix(&self) -> CsrMatrix<T>;
}

/// A nonlinear PDE problem defined by a weak-form residual, its (derived) Jacobian
/// form and a set of Dirichlet constraints.
///
/// The Jacobian form and the matrix sparsity pattern are derived once at
/// construction; only coefficient values change between evaluations. The prescribed
/// boundary values may be changed between solves through [`NonlinearPdeProblem::bc_mut`]
/// without invalidating either.
///
/// Residual evaluation performs, in order: state synchronization, an exact zero of
/// the output, assembly of the weak-form residual, boundary lifting with scale −1
/// against the reference state `x`, and finally the overwrite of constrained entries
/// with `x[dof] − g`. Jacobian evaluation resets the values (structure retained),
/// assembles the Jacobian form and replaces constrained rows/columns by identity.
#[derive(Debug)]
pub struct NonlinearPdeProblem<'a, T>
where
    T: Scalar,
{
    space: &'a FunctionSpace<T>,
    residual_form: ResidualForm<T>,
    jacobian_form: JacobianForm<T>,
    bc: DirichletBC<T>,
    quadrature: QuadraturePair2d<T>,
    pattern: SparsityPattern,
    u: DVector<T>,
    vector_assembler: VectorAssembler<T>,
    csr_assembler: CsrAssembler<T>,
}

impl<'a, T> NonlinearPdeProblem<'a, T>
where
    T: Real,
{
    /// Creates a new problem, deriving the Jacobian form from the residual form.
    ///
    /// Fails if the residual form cannot be differentiated.
    pub fn new(space: &'a FunctionSpace<T>, residual_form: ResidualForm<T>, bc: DirichletBC<T>) -> Result<Self, FormError> {
        let jacobian_form = residual_form.derivative()?;
        let pattern = assemble_pattern(space);
        debug!(
            "Constructed nonlinear PDE problem: {} dofs, {} constrained, {} Jacobian nonzeros",
            space.num_dofs(),
            bc.dofs().len(),
            pattern.nnz()
        );
        Ok(Self {
            space,
            residual_form,
            jacobian_form,
            bc,
            quadrature: triangle_quadrature_strength_2(),
            pattern,
            u: DVector::zeros(space.num_dofs()),
            vector_assembler: VectorAssembler::default(),
            csr_assembler: CsrAssembler::default(),
        })
    }

    pub fn space(&self) -> &FunctionSpace<T> {
        self.space
    }

    pub fn residual_form(&self) -> &ResidualForm<T> {
        &self.residual_form
    }

    pub fn jacobian_form(&self) -> &JacobianForm<T> {
        &self.jacobian_form
    }

    pub fn bc(&self) -> &DirichletBC<T> {
        &self.bc
    }

    /// Mutable access to the boundary constraint, so that prescribed values can be
    /// changed between solves. The constrained dof set itself cannot change.
    pub fn bc_mut(&mut self) -> &mut DirichletBC<T> {
        &mut self.bc
    }
}

impl<'a, T> NonlinearProblem<T> for NonlinearPdeProblem<'a, T>
where
    T: Real,
{
    fn num_dofs(&self) -> usize {
        self.space.num_dofs()
    }

    fn update_state(&mut self, x: &DVectorView<T>) {
        assert_eq!(x.len(), self.u.len(), "Iterate dimension must match number of dofs.");
        self.u.copy_from(x);
    }

    fn assemble_residual_into(&mut self, b: &mut DVectorViewMut<T>, x: &DVectorView<T>) -> eyre::Result<()> {
        // Re-synchronize unconditionally so that the method is correct even if the
        // driver does not invoke the pre-evaluation hook
        self.update_state(x);

        b.fill(T::zero());

        let residual_assembler =
            ElementResidualAssembler::new(self.space, &self.residual_form, &self.u, &self.quadrature);
        self.vector_assembler
            .assemble_into(DVectorViewMut::from(&mut *b), &residual_assembler)?;

        // Account for the eliminated Jacobian columns of the constrained dofs, then
        // overwrite the constrained entries themselves. The overwrite must come last:
        // it wins over any accumulated contribution at constrained dofs.
        let jacobian_assembler =
            ElementJacobianAssembler::new(self.space, &self.jacobian_form, &self.u, &self.quadrature);
        apply_lifting(
            DVectorViewMut::from(&mut *b),
            &jacobian_assembler,
            &self.bc,
            *x,
            -T::one(),
        )?;
        set_bc(DVectorViewMut::from(&mut *b), &self.bc, *x, -T::one());

        Ok(())
    }

    fn assemble_jacobian_into(&mut self, a: &mut CsrMatrix<T>, x: &DVectorView<T>) -> eyre::Result<()> {
        self.update_state(x);

        a.values_mut().fill(T::zero());

        let jacobian_assembler =
            ElementJacobianAssembler::new(self.space, &self.jacobian_form, &self.u, &self.quadrature);
        self.csr_assembler.assemble_into_csr(a, &jacobian_assembler)?;
        apply_dirichlet_identity_csr(a, self.bc.dofs());

        Ok(())
    }

    fn create_vector(&self) -> DVector<T> {
        DVector::zeros(self.num_dofs())
    }

    fn create_matrix(&self) -> CsrMatrix<T> {
        let values = vec![T::zero(); self.pattern.nnz()];
        CsrMatrix::try_from_pattern_and_values(self.pattern.clone(), values)
            .expect("Pattern and values are consistent by construction")
    }
}

/// Adapts a [`NonlinearProblem`] to the vector-function interface consumed by the
/// Newton drivers in [`crate::optimize`].
///
/// The wrapper owns the Jacobian storage, obtained once from the problem's factory
/// and refilled on every linear solve. The linear correction system is solved by a
/// dense LU factorization of the assembled Jacobian.
pub struct NewtonPdeFunction<T, P>
where
    T: Scalar,
{
    problem: P,
    jacobian: CsrMatrix<T>,
}

impl<T, P> NewtonPdeFunction<T, P>
where
    T: Real,
    P: NonlinearProblem<T>,
{
    pub fn new(problem: P) -> Self {
        let jacobian = problem.create_matrix();
        Self { problem, jacobian }
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }

    pub fn problem_mut(&mut self) -> &mut P {
        &mut self.problem
    }

    /// The Jacobian storage as filled by the most recent linear solve.
    pub fn jacobian(&self) -> &CsrMatrix<T> {
        &self.jacobian
    }
}

impl<T, P> VectorFunction<T> for NewtonPdeFunction<T, P>
where
    T: Real,
    P: NonlinearProblem<T>,
{
    fn dimension(&self) -> usize {
        self.problem.num_dofs()
    }

    fn eval_into(&mut self, f: &mut DVectorViewMut<T>, x: &DVectorView<T>) -> Result<(), Box<dyn Error>> {
        self.problem.update_state(x);
        self.problem
            .assemble_residual_into(f, x)
            .map_err(Box::<dyn Error>::from)
    }
}

impl<T, P> DifferentiableVectorFunction<T> for NewtonPdeFunction<T, P>
where
    T: Real,
    P: NonlinearProblem<T>,
{
    fn solve_jacobian_system(
        &mut self,
        sol: &mut DVectorViewMut<T>,
        x: &DVectorView<T>,
        rhs: &DVectorView<T>,
    ) -> Result<(), Box<dyn Error>> {
        self.problem
            .assemble_jacobian_into(&mut self.jacobian, x)
            .map_err(Box::<dyn Error>::from)?;

        let dense_jacobian = convert_csr_dense(&self.jacobian);
        let solution = dense_jacobian
            .lu()
            .solve(rhs)
            .ok_or_else(|| Box::<dyn Error>::from("Jacobian matrix is singular"))?;
        sol.copy_from(&solution);
        Ok(())
    }
}
