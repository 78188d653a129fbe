//! Assembly of global vectors and matrices from local element contributions.
use std::error::Error;
use std::fmt;

pub mod global;
pub mod local;

pub use global::*;
pub use local::*;

/// Error produced when element assembly encounters an invalid numerical state.
///
/// Assembly errors signal divergence or broken input data rather than recoverable
/// numerical noise, so they are surfaced to the caller and never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    /// A coefficient or source evaluation produced a non-finite value.
    NonFiniteCoefficient { element_index: usize },
    /// The geometry map of an element is not invertible (degenerate element).
    SingularElementJacobian { element_index: usize },
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblyError::NonFiniteCoefficient { element_index } => {
                write!(
                    f,
                    "Non-finite coefficient value encountered while assembling element {}.",
                    element_index
                )
            }
            AssemblyError::SingularElementJacobian { element_index } => {
                write!(f, "Reference Jacobian of element {} is singular.", element_index)
            }
        }
    }
}

impl Error for AssemblyError {}
