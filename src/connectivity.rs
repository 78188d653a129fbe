use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

/// Connectivity of a linear triangle cell in two dimensions.
///
/// Stores the indices of the three corner vertices, in counter-clockwise order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tri3Connectivity(pub [usize; 3]);

impl Tri3Connectivity {
    pub fn vertex_indices(&self) -> &[usize] {
        &self.0
    }
}

impl Deref for Tri3Connectivity {
    type Target = [usize; 3];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Tri3Connectivity {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
