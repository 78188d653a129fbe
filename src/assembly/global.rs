use crate::assembly::local::{ElementConnectivityAssembler, ElementMatrixAssembler, ElementVectorAssembler};
use crate::bc::DirichletBC;
use crate::Real;
use nalgebra::base::storage::Storage;
use nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorView, DVectorViewMut, Dyn, Matrix, Scalar, U1};
use nalgebra_sparse::csr::{CsrMatrix, CsrRowMut};
use nalgebra_sparse::pattern::SparsityPattern;
use std::cell::RefCell;
use std::collections::BTreeSet;

/// Builds the CSR sparsity pattern induced by the element connectivity of the given
/// assembler.
///
/// The pattern contains an entry for every pair of dofs that share an element. It is
/// fixed for the lifetime of the space, so matrices created from it can be reused
/// across evaluations with only their values reset.
pub fn assemble_pattern<A>(element_assembler: &A) -> SparsityPattern
where
    A: ?Sized + ElementConnectivityAssembler,
{
    // By collecting into a BTreeSet we store each matrix entry exactly once and obtain
    // the entries in the row-major order the pattern construction below requires.
    let mut matrix_entries = BTreeSet::new();
    let mut element_global_nodes = Vec::new();
    for i in 0..element_assembler.num_elements() {
        let element_node_count = element_assembler.element_node_count(i);
        element_global_nodes.resize(element_node_count, usize::MAX);
        element_assembler.populate_element_nodes(&mut element_global_nodes, i);

        for node_i in &element_global_nodes {
            for node_j in &element_global_nodes {
                matrix_entries.insert((*node_i, *node_j));
            }
        }
    }

    let num_rows = element_assembler.num_nodes();
    let mut offsets = Vec::with_capacity(num_rows + 1);
    let mut column_indices = Vec::with_capacity(matrix_entries.len());

    offsets.push(0);
    for (i, j) in matrix_entries {
        while i + 1 > offsets.len() {
            // This condition indicates that we have reached a new row. We need to run this
            // in a while loop to correctly handle consecutive empty rows
            offsets.push(column_indices.len());
        }
        column_indices.push(j);
    }

    // Make sure we fill out the remaining offsets if the last rows are empty
    while offsets.len() < (num_rows + 1) {
        offsets.push(column_indices.len());
    }

    SparsityPattern::try_from_offsets_and_indices(num_rows, num_rows, offsets, column_indices)
        .expect("Offsets and indices constructed sorted and in bounds must form a valid pattern")
}

/// An assembler for global vectors.
///
/// Element contributions are *added* into the output, so contributions of elements
/// sharing a dof are summed. Callers reset the output before assembly.
#[derive(Debug, Clone)]
pub struct VectorAssembler<T: Scalar> {
    // All members are buffers that help prevent unnecessary allocations
    // when assembling multiple vectors with the same assembler
    workspace: RefCell<VectorAssemblerWorkspace<T>>,
}

impl<T: Real> Default for VectorAssembler<T> {
    fn default() -> Self {
        Self {
            workspace: RefCell::new(VectorAssemblerWorkspace::default()),
        }
    }
}

#[derive(Debug, Clone)]
struct VectorAssemblerWorkspace<T: Scalar> {
    element_global_nodes: Vec<usize>,
    element_vector: DVector<T>,
}

impl<T: Real> Default for VectorAssemblerWorkspace<T> {
    fn default() -> Self {
        Self {
            element_global_nodes: Vec::new(),
            element_vector: DVector::zeros(0),
        }
    }
}

impl<T: Real> VectorAssembler<T> {
    pub fn assemble_into<'a>(
        &self,
        b: impl Into<DVectorViewMut<'a, T>>,
        element_assembler: &dyn ElementVectorAssembler<T>,
    ) -> eyre::Result<()> {
        let mut b = b.into();
        assert_eq!(
            b.len(),
            element_assembler.num_nodes(),
            "Output vector dimension must match number of dofs."
        );

        // Reuse previously allocated buffers
        let ws = &mut *self.workspace.borrow_mut();
        let element_global_nodes = &mut ws.element_global_nodes;
        let element_vector = &mut ws.element_vector;

        for i in 0..element_assembler.num_elements() {
            let element_node_count = element_assembler.element_node_count(i);

            element_global_nodes.resize(element_node_count, 0);
            element_vector.resize_vertically_mut(element_node_count, T::zero());
            element_vector.fill(T::zero());

            element_assembler.assemble_element_vector_into(i, DVectorViewMut::from(&mut *element_vector))?;
            element_assembler.populate_element_nodes(element_global_nodes, i);

            for (local_idx, global_idx) in element_global_nodes.iter().enumerate() {
                b[*global_idx] += element_vector[local_idx];
            }
        }

        Ok(())
    }
}

/// An assembler for CSR matrices.
#[derive(Debug, Clone)]
pub struct CsrAssembler<T: Scalar> {
    // All members are buffers that help prevent unnecessary allocations
    // when assembling multiple matrices with the same assembler
    workspace: RefCell<CsrAssemblerWorkspace<T>>,
}

impl<T: Scalar> Default for CsrAssembler<T> {
    fn default() -> Self {
        Self {
            workspace: RefCell::new(CsrAssemblerWorkspace::default()),
        }
    }
}

#[derive(Debug, Clone)]
struct CsrAssemblerWorkspace<T: Scalar> {
    connectivity_permutation: Vec<usize>,
    element_global_nodes: Vec<usize>,
    element_matrix: DMatrix<T>,
}

impl<T: Scalar> Default for CsrAssemblerWorkspace<T> {
    fn default() -> Self {
        Self {
            connectivity_permutation: Vec::new(),
            element_global_nodes: Vec::new(),
            element_matrix: DMatrix::from_row_slice(0, 0, &[]),
        }
    }
}

impl<T: Real> CsrAssembler<T> {
    /// Assembles a new CSR matrix, with sparsity pattern derived from the element
    /// connectivity of the assembler.
    pub fn assemble(&self, element_assembler: &dyn ElementMatrixAssembler<T>) -> eyre::Result<CsrMatrix<T>> {
        let pattern = assemble_pattern(element_assembler);
        let initial_matrix_values = vec![T::zero(); pattern.nnz()];
        let mut matrix = CsrMatrix::try_from_pattern_and_values(pattern, initial_matrix_values)
            .expect("Pattern and values are consistent by construction");
        self.assemble_into_csr(&mut matrix, element_assembler)?;
        Ok(matrix)
    }

    /// Adds element matrix contributions into the given CSR matrix.
    ///
    /// The matrix must structurally contain every element coupling; values are added,
    /// so callers reset the values before assembly. The sparsity pattern is never
    /// modified.
    pub fn assemble_into_csr(
        &self,
        csr: &mut CsrMatrix<T>,
        element_assembler: &dyn ElementMatrixAssembler<T>,
    ) -> eyre::Result<()> {
        // Reuse previously allocated buffers
        let ws = &mut *self.workspace.borrow_mut();
        let connectivity_permutation = &mut ws.connectivity_permutation;
        let element_global_nodes = &mut ws.element_global_nodes;
        let element_matrix = &mut ws.element_matrix;

        for i in 0..element_assembler.num_elements() {
            let element_node_count = element_assembler.element_node_count(i);

            element_global_nodes.resize(element_node_count, 0);
            element_matrix.resize_mut(element_node_count, element_node_count, T::zero());
            element_matrix.fill(T::zero());

            element_assembler.assemble_element_matrix_into(i, DMatrixViewMut::from(&mut *element_matrix))?;
            element_assembler.populate_element_nodes(element_global_nodes, i);

            connectivity_permutation.clear();
            connectivity_permutation.extend(0..element_node_count);
            connectivity_permutation.sort_unstable_by_key(|i| element_global_nodes[*i]);

            for local_node_idx in 0..element_node_count {
                let global_node_idx = element_global_nodes[local_node_idx];
                let mut csr_row = csr.row_mut(global_node_idx);
                let local_row = element_matrix.row(local_node_idx);
                add_element_row_to_csr_row(&mut csr_row, element_global_nodes, connectivity_permutation, &local_row);
            }
        }

        Ok(())
    }
}

/// Add a row of a local element matrix to the provided row of a CSR matrix.
///
/// `node_connectivity`: The global indices of nodes.
/// `sorted_permutation`: The local indices of nodes in the element, ordered such that the
///    corresponding global indices are sorted.
/// `local_row`: The local row of the element matrix that should be added to the CSR matrix.
fn add_element_row_to_csr_row<T, S>(
    row: &mut CsrRowMut<T>,
    node_connectivity: &[usize],
    sorted_permutation: &[usize],
    local_row: &Matrix<T, U1, Dyn, S>,
) where
    T: Real,
    S: Storage<T, U1, Dyn>,
{
    assert_eq!(node_connectivity.len(), sorted_permutation.len());
    assert_eq!(node_connectivity.len(), local_row.ncols());

    let (column_indices, values) = row.cols_and_values_mut();
    let mut csr_col_idx_iter = column_indices.iter().copied().enumerate();

    for &node_local_idx in sorted_permutation {
        let node_global_idx = node_connectivity[node_local_idx];

        let (local_csr_col_idx, _) = csr_col_idx_iter
            .find(|(_, csr_col_idx)| *csr_col_idx == node_global_idx)
            .expect("Could not find column index associated with node in CSR row");
        values[local_csr_col_idx] += local_row[node_local_idx];
    }
}

/// Modifies `b` according to `b ← b − scale · A_e(x0) (g − x0)`, accumulated over the
/// constrained columns of every element's local Jacobian contribution `A_e`.
///
/// This accounts for the effect of non-homogeneous Dirichlet data on the
/// unconstrained equations when the constrained columns of the assembled matrix are
/// eliminated. Entries of `b` at constrained dofs are modified as well; callers are
/// expected to overwrite them afterwards with [`crate::bc::set_bc`].
pub fn apply_lifting<'a, T>(
    b: impl Into<DVectorViewMut<'a, T>>,
    jacobian_assembler: &dyn ElementMatrixAssembler<T>,
    bc: &DirichletBC<T>,
    x0: impl Into<DVectorView<'a, T>>,
    scale: T,
) -> eyre::Result<()>
where
    T: Real,
{
    let mut b = b.into();
    let x0 = x0.into();
    assert_eq!(
        b.len(),
        jacobian_assembler.num_nodes(),
        "Output vector dimension must match number of dofs."
    );
    assert_eq!(b.len(), x0.len(), "Reference state dimension must match output dimension.");

    let mut prescribed = vec![None; jacobian_assembler.num_nodes()];
    for (dof, g) in bc.iter() {
        prescribed[dof] = Some(g);
    }

    let mut element_global_nodes = Vec::new();
    let mut element_matrix = DMatrix::from_row_slice(0, 0, &[]);

    for i in 0..jacobian_assembler.num_elements() {
        let element_node_count = jacobian_assembler.element_node_count(i);
        element_global_nodes.resize(element_node_count, 0);
        jacobian_assembler.populate_element_nodes(&mut element_global_nodes, i);

        // Only elements touching a constrained dof contribute
        if element_global_nodes.iter().all(|node| prescribed[*node].is_none()) {
            continue;
        }

        element_matrix.resize_mut(element_node_count, element_node_count, T::zero());
        element_matrix.fill(T::zero());
        jacobian_assembler.assemble_element_matrix_into(i, DMatrixViewMut::from(&mut element_matrix))?;

        for (local_j, &global_j) in element_global_nodes.iter().enumerate() {
            if let Some(g) = prescribed[global_j] {
                let delta = g - x0[global_j];
                for (local_i, &global_i) in element_global_nodes.iter().enumerate() {
                    b[global_i] -= scale * element_matrix[(local_i, local_j)] * delta;
                }
            }
        }
    }

    Ok(())
}

/// Replaces the rows and columns of the matrix associated with the given dofs by the
/// corresponding rows and columns of the identity matrix.
///
/// The symmetric elimination ensures that a linear correction solve leaves the
/// constrained dofs decoupled from the unconstrained equations; the effect of the
/// eliminated columns on the right-hand side must be accounted for separately through
/// [`apply_lifting`].
pub fn apply_dirichlet_identity_csr<T>(matrix: &mut CsrMatrix<T>, dofs: &[usize])
where
    T: Real,
{
    let num_rows = matrix.nrows();

    // We need to do the following:
    //  - zero all rows corresponding to constrained dofs
    //  - zero all columns corresponding to constrained dofs
    //  - set diagonal entries corresponding to constrained dofs to one
    // In order to zero all columns, a naive approach would need to visit all elements
    // in the matrix, which might be very expensive.
    // Instead, we can exploit structural symmetry to determine that if we visit
    // column j in row i, where i corresponds to a constrained dof, we would also need
    // to visit row j in order to zero out columns.
    let mut dirichlet_membership = vec![false; num_rows];
    let mut rows_to_visit = vec![false; num_rows];

    for &dof in dofs {
        dirichlet_membership[dof] = true;
        let mut row = matrix.row_mut(dof);
        let (cols, values) = row.cols_and_values_mut();

        for (&col_idx, val) in cols.iter().zip(values) {
            if col_idx == dof {
                *val = T::one();
            } else {
                *val = T::zero();
                // If we need to zero out (r, c), then we also need to zero out (c, r),
                // so we need to visit column c in row r later
                rows_to_visit[col_idx] = true;
            }
        }
    }

    let row_visit_iter = rows_to_visit
        .iter()
        .enumerate()
        .filter_map(|(index, &should_visit)| if should_visit { Some(index) } else { None });
    for row_index in row_visit_iter {
        let row_is_dirichlet = dirichlet_membership[row_index];
        if !row_is_dirichlet {
            let mut row = matrix.row_mut(row_index);
            let (cols, values) = row.cols_and_values_mut();
            for (local_idx, &global_idx) in cols.iter().enumerate() {
                if dirichlet_membership[global_idx] {
                    values[local_idx] = T::zero();
                }
            }
        }
    }
}
