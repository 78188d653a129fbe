use crate::assembly::AssemblyError;
use crate::element::Tri3Element;
use crate::forms::{JacobianForm, ResidualForm};
use crate::quadrature::QuadraturePair2d;
use crate::space::FunctionSpace;
use crate::Real;
use itertools::izip;
use nalgebra::{DMatrixViewMut, DVector, DVectorViewMut, Matrix2x3, Scalar, Vector3};

/// Vocabulary trait for anything that can map element-local degrees of freedom to
/// global ones.
pub trait ElementConnectivityAssembler {
    fn num_elements(&self) -> usize;

    /// Total number of degrees of freedom of the underlying space.
    fn num_nodes(&self) -> usize;

    fn element_node_count(&self, element_index: usize) -> usize;

    fn populate_element_nodes(&self, output: &mut [usize], element_index: usize);
}

impl<T> ElementConnectivityAssembler for FunctionSpace<T>
where
    T: Scalar,
{
    fn num_elements(&self) -> usize {
        self.num_elements()
    }

    fn num_nodes(&self) -> usize {
        self.num_dofs()
    }

    fn element_node_count(&self, element_index: usize) -> usize {
        self.element_node_count(element_index)
    }

    fn populate_element_nodes(&self, output: &mut [usize], element_index: usize) {
        self.populate_element_nodes(output, element_index)
    }
}

pub trait ElementVectorAssembler<T>: ElementConnectivityAssembler {
    fn assemble_element_vector_into(&self, element_index: usize, output: DVectorViewMut<T>) -> eyre::Result<()>;
}

pub trait ElementMatrixAssembler<T>: ElementConnectivityAssembler {
    fn assemble_element_matrix_into(&self, element_index: usize, output: DMatrixViewMut<T>) -> eyre::Result<()>;
}

/// Precomputed per-element geometry: physical basis gradients and the Jacobian
/// determinant of the reference map. Both are constant on a linear triangle.
struct ElementGeometry<T>
where
    T: Scalar,
{
    gradients: Matrix2x3<T>,
    jacobian_det: T,
}

impl<T> ElementGeometry<T>
where
    T: Real,
{
    fn try_from_element(element: &Tri3Element<T>, element_index: usize) -> Result<Self, AssemblyError> {
        let j = element.reference_jacobian();
        let jacobian_det = j.determinant();
        if !jacobian_det.is_finite() {
            return Err(AssemblyError::SingularElementJacobian { element_index });
        }
        let j_inv_t = j
            .try_inverse()
            .ok_or(AssemblyError::SingularElementJacobian { element_index })?
            .transpose();
        Ok(Self {
            gradients: j_inv_t * element.gradients(),
            jacobian_det,
        })
    }
}

fn gather_element_dofs<T>(u: &DVector<T>, nodes: &[usize; 3]) -> Vector3<T>
where
    T: Real,
{
    Vector3::new(u[nodes[0]], u[nodes[1]], u[nodes[2]])
}

/// Assembles local residual vectors for a reaction-diffusion weak form evaluated at a
/// fixed state `u`.
pub struct ElementResidualAssembler<'a, T>
where
    T: Scalar,
{
    space: &'a FunctionSpace<T>,
    form: &'a ResidualForm<T>,
    u: &'a DVector<T>,
    quadrature: &'a QuadraturePair2d<T>,
}

impl<'a, T> ElementResidualAssembler<'a, T>
where
    T: Scalar,
{
    pub fn new(
        space: &'a FunctionSpace<T>,
        form: &'a ResidualForm<T>,
        u: &'a DVector<T>,
        quadrature: &'a QuadraturePair2d<T>,
    ) -> Self {
        assert_eq!(
            u.len(),
            space.num_dofs(),
            "State vector length must match number of dofs in space."
        );
        Self {
            space,
            form,
            u,
            quadrature,
        }
    }
}

impl<'a, T> ElementConnectivityAssembler for ElementResidualAssembler<'a, T>
where
    T: Scalar,
{
    fn num_elements(&self) -> usize {
        self.space.num_elements()
    }

    fn num_nodes(&self) -> usize {
        self.space.num_dofs()
    }

    fn element_node_count(&self, element_index: usize) -> usize {
        self.space.element_node_count(element_index)
    }

    fn populate_element_nodes(&self, output: &mut [usize], element_index: usize) {
        self.space.populate_element_nodes(output, element_index)
    }
}

impl<'a, T> ElementVectorAssembler<T> for ElementResidualAssembler<'a, T>
where
    T: Real,
{
    fn assemble_element_vector_into(&self, element_index: usize, mut output: DVectorViewMut<T>) -> eyre::Result<()> {
        assert_eq!(output.len(), 3, "Output vector dimension must match element node count.");

        let mut nodes = [0; 3];
        self.space.populate_element_nodes(&mut nodes, element_index);
        let u_element = gather_element_dofs(self.u, &nodes);

        let element = self.space.element(element_index);
        let geometry = ElementGeometry::try_from_element(&element, element_index)?;
        let grad_u = geometry.gradients * u_element;

        output.fill(T::zero());

        let (weights, points) = self.quadrature;
        for (w, xi) in izip!(weights, points) {
            let phi = element.evaluate_basis(xi);
            let u_q = (phi * u_element)[0];
            let x_q = element.map_reference_coords(xi);

            let f_q = self.form.source().evaluate(&x_q);
            let kappa_q = self.form.diffusion().evaluate(u_q);
            let r_q = self.form.reaction().evaluate(u_q);
            if !(f_q.is_finite() && kappa_q.is_finite() && r_q.is_finite()) {
                return Err(AssemblyError::NonFiniteCoefficient { element_index }.into());
            }

            let scale = *w * geometry.jacobian_det.abs();
            for i in 0..3 {
                let grad_i = geometry.gradients.column(i);
                output[i] += scale * (f_q * phi[i] - kappa_q * grad_u.dot(&grad_i) - r_q * phi[i]);
            }
        }

        Ok(())
    }
}

/// Assembles local Jacobian matrices for the derivative of a reaction-diffusion weak
/// form evaluated at a fixed state `u`.
pub struct ElementJacobianAssembler<'a, T>
where
    T: Scalar,
{
    space: &'a FunctionSpace<T>,
    form: &'a JacobianForm<T>,
    u: &'a DVector<T>,
    quadrature: &'a QuadraturePair2d<T>,
}

impl<'a, T> ElementJacobianAssembler<'a, T>
where
    T: Scalar,
{
    pub fn new(
        space: &'a FunctionSpace<T>,
        form: &'a JacobianForm<T>,
        u: &'a DVector<T>,
        quadrature: &'a QuadraturePair2d<T>,
    ) -> Self {
        assert_eq!(
            u.len(),
            space.num_dofs(),
            "State vector length must match number of dofs in space."
        );
        Self {
            space,
            form,
            u,
            quadrature,
        }
    }
}

impl<'a, T> ElementConnectivityAssembler for ElementJacobianAssembler<'a, T>
where
    T: Scalar,
{
    fn num_elements(&self) -> usize {
        self.space.num_elements()
    }

    fn num_nodes(&self) -> usize {
        self.space.num_dofs()
    }

    fn element_node_count(&self, element_index: usize) -> usize {
        self.space.element_node_count(element_index)
    }

    fn populate_element_nodes(&self, output: &mut [usize], element_index: usize) {
        self.space.populate_element_nodes(output, element_index)
    }
}

impl<'a, T> ElementMatrixAssembler<T> for ElementJacobianAssembler<'a, T>
where
    T: Real,
{
    fn assemble_element_matrix_into(&self, element_index: usize, mut output: DMatrixViewMut<T>) -> eyre::Result<()> {
        assert_eq!(output.nrows(), 3, "Output matrix dimension must match element node count.");
        assert_eq!(output.ncols(), 3, "Output matrix dimension must match element node count.");

        let mut nodes = [0; 3];
        self.space.populate_element_nodes(&mut nodes, element_index);
        let u_element = gather_element_dofs(self.u, &nodes);

        let element = self.space.element(element_index);
        let geometry = ElementGeometry::try_from_element(&element, element_index)?;
        let grad_u = geometry.gradients * u_element;

        output.fill(T::zero());

        let (weights, points) = self.quadrature;
        for (w, xi) in izip!(weights, points) {
            let phi = element.evaluate_basis(xi);
            let u_q = (phi * u_element)[0];

            let kappa_q = self.form.diffusion().evaluate(u_q);
            let kappa_prime_q = self.form.diffusion_derivative().evaluate(u_q);
            let r_prime_q = self.form.reaction_derivative().evaluate(u_q);
            if !(kappa_q.is_finite() && kappa_prime_q.is_finite() && r_prime_q.is_finite()) {
                return Err(AssemblyError::NonFiniteCoefficient { element_index }.into());
            }

            let scale = *w * geometry.jacobian_det.abs();
            for i in 0..3 {
                let grad_i = geometry.gradients.column(i);
                for j in 0..3 {
                    let grad_j = geometry.gradients.column(j);
                    output[(i, j)] += scale
                        * (-kappa_q * grad_j.dot(&grad_i)
                            - kappa_prime_q * phi[j] * grad_u.dot(&grad_i)
                            - r_prime_q * phi[j] * phi[i]);
                }
            }
        }

        Ok(())
    }
}
