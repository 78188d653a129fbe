//! Weak forms for scalar reaction-diffusion problems.
//!
//! The residual form describes the weak residual
//!
//! ```text
//! F(u; v) = ∫ f v dx − ∫ κ(u) ∇u·∇v dx − ∫ r(u) v dx
//! ```
//!
//! over trial/test pairs of a scalar function space. The associated Jacobian form is
//! its derivative with respect to the solution,
//!
//! ```text
//! a(δu, v; u) = −∫ κ(u) ∇δu·∇v dx − ∫ κ'(u) δu ∇u·∇v dx − ∫ r'(u) δu v dx,
//! ```
//!
//! and is derived once through [`ResidualForm::derivative`]. Linearity in the test
//! function is enforced by construction: the typed representation cannot express a
//! form that is nonlinear in `v`, so only missing coefficient derivatives can make
//! derivation fail.
use crate::Real;
use nalgebra::{Point2, Scalar};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

type StateFn<T> = Arc<dyn Fn(T) -> T + Send + Sync>;
type PositionFn<T> = Arc<dyn Fn(&Point2<T>) -> T + Send + Sync>;

/// A coefficient in a weak form: either a constant or a function of the solution value.
#[derive(Clone)]
pub enum Coefficient<T> {
    Constant(T),
    OfState {
        value: StateFn<T>,
        derivative: Option<StateFn<T>>,
    },
}

impl<T> Coefficient<T>
where
    T: Real,
{
    pub fn constant(value: T) -> Self {
        Self::Constant(value)
    }

    /// A state-dependent coefficient with its derivative with respect to the state.
    pub fn of_state(
        value: impl Fn(T) -> T + Send + Sync + 'static,
        derivative: impl Fn(T) -> T + Send + Sync + 'static,
    ) -> Self {
        Self::OfState {
            value: Arc::new(value),
            derivative: Some(Arc::new(derivative)),
        }
    }

    /// A state-dependent coefficient without a registered derivative.
    ///
    /// A form containing such a coefficient cannot be differentiated.
    pub fn of_state_without_derivative(value: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
        Self::OfState {
            value: Arc::new(value),
            derivative: None,
        }
    }

    pub fn evaluate(&self, u: T) -> T {
        match self {
            Self::Constant(value) => *value,
            Self::OfState { value, .. } => value(u),
        }
    }

    /// The derivative of the coefficient with respect to the state, if available.
    fn derivative(&self) -> Option<Coefficient<T>> {
        match self {
            Self::Constant(_) => Some(Self::Constant(T::zero())),
            Self::OfState {
                derivative: Some(derivative),
                ..
            } => Some(Self::OfState {
                value: Arc::clone(derivative),
                derivative: None,
            }),
            Self::OfState { derivative: None, .. } => None,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Coefficient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::OfState { derivative, .. } => f
                .debug_struct("OfState")
                .field("has_derivative", &derivative.is_some())
                .finish(),
        }
    }
}

/// The source term of a weak form: either a constant or a function of position.
pub enum SourceTerm<T: Scalar> {
    Constant(T),
    OfPosition(PositionFn<T>),
}

impl<T: Scalar> Clone for SourceTerm<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Constant(value) => Self::Constant(value.clone()),
            Self::OfPosition(f) => Self::OfPosition(Arc::clone(f)),
        }
    }
}

impl<T> SourceTerm<T>
where
    T: Real,
{
    pub fn constant(value: T) -> Self {
        Self::Constant(value)
    }

    pub fn of_position(f: impl Fn(&Point2<T>) -> T + Send + Sync + 'static) -> Self {
        Self::OfPosition(Arc::new(f))
    }

    pub fn evaluate(&self, x: &Point2<T>) -> T {
        match self {
            Self::Constant(value) => *value,
            Self::OfPosition(f) => f(x),
        }
    }
}

impl<T: Scalar + fmt::Debug> fmt::Debug for SourceTerm<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::OfPosition(_) => f.write_str("OfPosition"),
        }
    }
}

/// Error produced when a residual form cannot be differentiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// A state-dependent coefficient of the named term has no registered derivative.
    MissingDerivative { term: &'static str },
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormError::MissingDerivative { term } => {
                write!(
                    f,
                    "Cannot differentiate form: the {} coefficient has no registered derivative.",
                    term
                )
            }
        }
    }
}

impl Error for FormError {}

/// The weak residual of a scalar reaction-diffusion problem. Immutable once built.
#[derive(Debug, Clone)]
pub struct ResidualForm<T>
where
    T: Scalar,
{
    source: SourceTerm<T>,
    diffusion: Coefficient<T>,
    reaction: Coefficient<T>,
}

impl<T> ResidualForm<T>
where
    T: Real,
{
    pub fn new(source: SourceTerm<T>, diffusion: Coefficient<T>, reaction: Coefficient<T>) -> Self {
        Self {
            source,
            diffusion,
            reaction,
        }
    }

    pub fn source(&self) -> &SourceTerm<T> {
        &self.source
    }

    pub fn diffusion(&self) -> &Coefficient<T> {
        &self.diffusion
    }

    pub fn reaction(&self) -> &Coefficient<T> {
        &self.reaction
    }

    /// Differentiates the form with respect to the solution, producing the Jacobian form.
    ///
    /// Fails if a state-dependent coefficient has no registered derivative.
    pub fn derivative(&self) -> Result<JacobianForm<T>, FormError> {
        let diffusion_derivative = self
            .diffusion
            .derivative()
            .ok_or(FormError::MissingDerivative { term: "diffusion" })?;
        let reaction_derivative = self
            .reaction
            .derivative()
            .ok_or(FormError::MissingDerivative { term: "reaction" })?;
        Ok(JacobianForm {
            diffusion: self.diffusion.clone(),
            diffusion_derivative,
            reaction_derivative,
        })
    }
}

/// The derivative of a [`ResidualForm`] with respect to the solution. Immutable once built.
///
/// The structure of the form (and hence the sparsity pattern of matrices assembled
/// from it) is fixed; only the coefficient values vary with the state at which the
/// form is evaluated.
#[derive(Debug, Clone)]
pub struct JacobianForm<T>
where
    T: Scalar,
{
    diffusion: Coefficient<T>,
    diffusion_derivative: Coefficient<T>,
    reaction_derivative: Coefficient<T>,
}

impl<T> JacobianForm<T>
where
    T: Real,
{
    pub fn diffusion(&self) -> &Coefficient<T> {
        &self.diffusion
    }

    pub fn diffusion_derivative(&self) -> &Coefficient<T> {
        &self.diffusion_derivative
    }

    pub fn reaction_derivative(&self) -> &Coefficient<T> {
        &self.reaction_derivative
    }
}
