// Copyright © 2024 pomerust contributors
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the
// License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either
// express or implied. See the License for the specific language governing permissions and
// limitations under the License.

//! Block-to-block sparse images of a single monomial operator in the Hamiltonian eigenbasis.

use std::collections::HashMap;

use ndarray::Array2;
use num_complex::Complex64;

use crate::comm::{Communicator, MpiDispatcher};
use crate::error::{EdError, EdResult};
use crate::expression::fermion_product::FermionProduct;
use crate::expression::operator::apply_product;
use crate::hamiltonian::Hamiltonian;
use crate::sparse::Sparse;
use crate::states_classification::{BlockNumber, StatesClassification};
use crate::thermal::Status;

/// The sparse image of a monomial operator between one ordered pair of blocks, stored in
/// both row-major and column-major layouts (the correlator assembly walks one factor by
/// rows while chasing another by columns at the same time).
#[derive(Debug, Clone)]
pub struct MonomialOperatorPart {
    left: BlockNumber,
    right: BlockNumber,
    row_major: Option<Sparse>,
    col_major: Option<Sparse>,
    status: Status,
}

impl MonomialOperatorPart {
    fn new(left: BlockNumber, right: BlockNumber) -> Self {
        MonomialOperatorPart {
            left,
            right,
            row_major: None,
            col_major: None,
            status: Status::Constructed,
        }
    }

    /// Block this part maps *into*.
    pub fn left(&self) -> BlockNumber {
        self.left
    }

    /// Block this part maps *from*.
    pub fn right(&self) -> BlockNumber {
        self.right
    }

    /// Row-major view, `(L, R)` matrix: iterate entries of one row (fixed `L`-eigenstate)
    /// ascending in `R`-eigenstate.
    pub fn row_major(&self) -> EdResult<&Sparse> {
        self.row_major.as_ref().ok_or(EdError::StatusMismatch {
            expected: Status::Computed,
            found: self.status,
            op: "MonomialOperatorPart::row_major",
        })
    }

    /// Column-major view of the same matrix.
    pub fn col_major(&self) -> EdResult<&Sparse> {
        self.col_major.as_ref().ok_or(EdError::StatusMismatch {
            expected: Status::Computed,
            found: self.status,
            op: "MonomialOperatorPart::col_major",
        })
    }

    fn from_adjoint_of(other: &MonomialOperatorPart) -> EdResult<Self> {
        let other_row = other.row_major()?;
        let other_col = other.col_major()?;
        let (nl, nr) = other_row.shape();
        Ok(MonomialOperatorPart {
            left: other.right,
            right: other.left,
            row_major: Some(other_col.relabel_conjugate(nr, nl)),
            col_major: Some(other_row.relabel_conjugate(nr, nl)),
            status: Status::Computed,
        })
    }
}

/// A single monomial operator (`c_i`, `c^dagger_i`, `c^dagger_i c_j`, ...) represented
/// block-to-block in the Hamiltonian eigenbasis.
///
/// Constrained to exactly one monomial so that [`MonomialOperator::left_right_blocks`] can
/// be a genuine bijection, which the Lehmann-term assembly relies on.
#[derive(Debug, Clone)]
pub struct MonomialOperator {
    product: FermionProduct,
    coefficient: Complex64,
    parts: Vec<MonomialOperatorPart>,
    part_by_left: HashMap<BlockNumber, usize>,
    part_by_right: HashMap<BlockNumber, usize>,
    status: Status,
}

impl MonomialOperator {
    /// Builds a monomial operator `coefficient * product`.
    pub fn new(product: FermionProduct, coefficient: Complex64) -> Self {
        MonomialOperator {
            product,
            coefficient,
            parts: Vec::new(),
            part_by_left: HashMap::new(),
            part_by_right: HashMap::new(),
            status: Status::Constructed,
        }
    }

    /// Discovers every `(left, right)` block pair this operator connects, by applying the
    /// monomial to every Fock state of every block and recording the image's block.
    ///
    /// Fails with [`EdError::ConstructionError`] if a single right block would need to map
    /// into more than one left block (the partitioner in
    /// [`crate::hilbert_space::HilbertSpace`] should have prevented this if the operator was
    /// registered via `refine_with` before `compute`).
    pub fn prepare(&mut self, sc: &StatesClassification) -> EdResult<()> {
        for right in 0..sc.number_of_blocks() as BlockNumber {
            let mut left_block: Option<BlockNumber> = None;
            for j in 0..sc.block_size(right)? {
                let state = sc.fock_state(right, j)?;
                if let Some((image, _sign)) = apply_product(&self.product, state) {
                    let image_block = sc.block_number(image)?;
                    match left_block {
                        None => left_block = Some(image_block),
                        Some(existing) if existing != image_block => {
                            return Err(EdError::ConstructionError(format!(
                                "monomial operator maps block {right} into both {existing} and \
                                 {image_block}; this violates the single-image property monomial \
                                 operators require"
                            )));
                        }
                        _ => {}
                    }
                }
            }
            if let Some(left) = left_block {
                if self.part_by_left.contains_key(&left) {
                    let existing_idx = self.part_by_left[&left];
                    if self.parts[existing_idx].right != right {
                        return Err(EdError::ConstructionError(format!(
                            "monomial operator maps both block {} and block {right} into block \
                             {left}; LeftRightBlocks must be a bijection",
                            self.parts[existing_idx].right
                        )));
                    }
                }
                let idx = self.parts.len();
                self.parts.push(MonomialOperatorPart::new(left, right));
                self.part_by_left.insert(left, idx);
                self.part_by_right.insert(right, idx);
            }
        }
        self.status = Status::Prepared;
        Ok(())
    }

    /// Computes every part's eigenbasis matrix via the three-step chain: apply the monomial
    /// to the Fock basis of `right`, rotate from the right by `right`'s eigenvectors, rotate
    /// from the left by `left`'s adjoint eigenvectors, then prune by `tol`.
    pub fn compute<C: Communicator>(
        &mut self,
        tol: f64,
        hamiltonian: &Hamiltonian,
        sc: &StatesClassification,
        comm: &C,
    ) -> EdResult<()> {
        crate::thermal::require_status(self.status, Status::Prepared, "MonomialOperator::compute")?;
        let mut dispatcher = MpiDispatcher::new(self.parts.len());
        let parts = &mut self.parts;
        let product = &self.product;
        let coefficient = self.coefficient;
        let mut first_error = None;
        dispatcher.run_all(comm, |job| {
            if first_error.is_some() {
                return;
            }
            if let Err(e) =
                compute_one_part(&mut parts[job], product, coefficient, hamiltonian, sc, tol)
            {
                first_error = Some(e);
            }
        });
        if let Some(e) = first_error {
            return Err(e);
        }
        self.status = Status::Computed;
        Ok(())
    }

    /// Builds this operator's parts as the Hermitian conjugate of an already-computed
    /// operator, by relabeling row/col storage and conjugating instead of recomputing from
    /// scratch. `other` must be `c_i` (or `c^dagger_i`) for this operator's `c^dagger_i` (or
    /// `c_i`) at the same single-particle index.
    pub fn compute_as_adjoint_of(&mut self, other: &MonomialOperator) -> EdResult<()> {
        crate::thermal::require_status(other.status, Status::Computed, "MonomialOperator::compute_as_adjoint_of")?;
        self.parts = Vec::with_capacity(other.parts.len());
        self.part_by_left.clear();
        self.part_by_right.clear();
        for other_part in &other.parts {
            let part = MonomialOperatorPart::from_adjoint_of(other_part)?;
            let idx = self.parts.len();
            self.part_by_left.insert(part.left, idx);
            self.part_by_right.insert(part.right, idx);
            self.parts.push(part);
        }
        self.status = Status::Computed;
        Ok(())
    }

    /// The part mapping block `right` to its (unique) image block, if any.
    pub fn part_by_right(&self, right: BlockNumber) -> Option<&MonomialOperatorPart> {
        self.part_by_right.get(&right).map(|&i| &self.parts[i])
    }

    /// The part mapping into block `left` from its (unique) source block, if any.
    pub fn part_by_left(&self, left: BlockNumber) -> Option<&MonomialOperatorPart> {
        self.part_by_left.get(&left).map(|&i| &self.parts[i])
    }

    /// All `(left, right)` edges, a bijection between this operator's domain and range block
    /// sets.
    pub fn left_right_blocks(&self) -> impl Iterator<Item = (BlockNumber, BlockNumber)> + '_ {
        self.parts.iter().map(|p| (p.left, p.right))
    }

    /// Lifecycle status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// The single monomial this operator represents.
    pub fn product(&self) -> &FermionProduct {
        &self.product
    }
}

fn compute_one_part(
    part: &mut MonomialOperatorPart,
    product: &FermionProduct,
    coefficient: Complex64,
    hamiltonian: &Hamiltonian,
    sc: &StatesClassification,
    tol: f64,
) -> EdResult<()> {
    let left_part = hamiltonian.part(part.left)?;
    let right_part = hamiltonian.part(part.right)?;
    let nl = left_part.dim();
    let nr = right_part.dim();

    // Step 1: Fock-basis image of the monomial, restricted to the surviving (post-cutoff)
    // Fock indices of each block.
    let mut fock_image = Array2::<Complex64>::zeros((nl, nr));
    for j in 0..nr {
        let state = sc.fock_state(part.right, j)?;
        if let Some((image, sign)) = apply_product(product, state) {
            if sc.block_number(image)? == part.left {
                let i = sc.inner_state(image)?;
                if i < nl {
                    fock_image[(i, j)] += coefficient * sign;
                }
            }
        }
    }

    // Step 2: apply from the right by `right`'s eigenvector matrix.
    let mut right_eigenvectors = Array2::<Complex64>::zeros((nr, nr));
    for row in 0..nr {
        for col in 0..nr {
            right_eigenvectors[(row, col)] = right_part.entry(row, col)?;
        }
    }
    let rotated_right = fock_image.dot(&right_eigenvectors);

    // Step 3: apply from the left by `left`'s adjoint eigenvector matrix.
    let mut left_eigenvectors_adjoint = Array2::<Complex64>::zeros((nl, nl));
    for row in 0..nl {
        for col in 0..nl {
            left_eigenvectors_adjoint[(row, col)] = left_part.entry(col, row)?.conj();
        }
    }
    let eigenbasis = left_eigenvectors_adjoint.dot(&rotated_right);

    let mut triplets = Vec::new();
    for a in 0..nl {
        for b in 0..nr {
            let v = eigenbasis[(a, b)];
            if v.norm() > tol {
                triplets.push((a, b, v));
            }
        }
    }
    part.row_major = Some(Sparse::from_row_triplets(nl, nr, triplets.iter().copied(), tol));
    part.col_major = Some(Sparse::from_col_triplets(nl, nr, triplets, tol));
    part.status = Status::Computed;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SingleProcessComm;
    use crate::expression::builders::quadratic_operator;
    use crate::expression::FermionProduct as FP;
    use crate::hilbert_space::HilbertSpace;

    fn two_site_setup() -> (Hamiltonian, StatesClassification) {
        let mut h = quadratic_operator(0, 1);
        h.add_term(FP::new([1], [0]).unwrap(), Complex64::new(1.0, 0.0));
        let mut hs = HilbertSpace::new(4, h.clone());
        hs.refine_with(Box::new(crate::expression::builders::creation_operator(0)));
        hs.refine_with(Box::new(crate::expression::builders::annihilation_operator(0)));
        hs.refine_with(Box::new(crate::expression::builders::creation_operator(1)));
        hs.refine_with(Box::new(crate::expression::builders::annihilation_operator(1)));
        hs.compute().unwrap();
        let mut sc = StatesClassification::new();
        sc.compute(&hs).unwrap();
        let mut ham = Hamiltonian::new();
        ham.prepare(&sc, &h, 1e-9, &SingleProcessComm).unwrap();
        ham.compute(&SingleProcessComm).unwrap();
        (ham, sc)
    }

    #[test]
    fn left_right_blocks_form_a_bijection() {
        let (ham, sc) = two_site_setup();
        let mut c0 = MonomialOperator::new(FP::new([], [0]).unwrap(), Complex64::new(1.0, 0.0));
        c0.prepare(&sc).unwrap();
        c0.compute(1e-9, &ham, &sc, &SingleProcessComm).unwrap();
        let edges: Vec<_> = c0.left_right_blocks().collect();
        let mut lefts: Vec<_> = edges.iter().map(|(l, _)| *l).collect();
        let mut rights: Vec<_> = edges.iter().map(|(_, r)| *r).collect();
        lefts.sort();
        rights.sort();
        let lefts_len = lefts.len();
        let rights_len = rights.len();
        lefts.dedup();
        rights.dedup();
        assert_eq!(lefts.len(), lefts_len);
        assert_eq!(rights.len(), rights_len);
    }

    #[test]
    fn adjoint_matches_conjugate_transpose() {
        let (ham, sc) = two_site_setup();
        let mut cdag0 = MonomialOperator::new(FP::new([0], []).unwrap(), Complex64::new(1.0, 0.0));
        cdag0.prepare(&sc).unwrap();
        cdag0.compute(1e-9, &ham, &sc, &SingleProcessComm).unwrap();

        let mut c0 = MonomialOperator::new(FP::new([], [0]).unwrap(), Complex64::new(1.0, 0.0));
        c0.compute_as_adjoint_of(&cdag0).unwrap();

        for (left, right) in cdag0.left_right_blocks() {
            let a_part = cdag0.part_by_left(left).unwrap();
            let b_part = c0.part_by_right(left).unwrap();
            assert_eq!(b_part.right(), left);
            assert_eq!(b_part.left(), right);
            let (nl, nr) = a_part.row_major().unwrap().shape();
            for i in 0..nl {
                for &(j, v) in a_part.row_major().unwrap().outer_slice(i) {
                    let found = b_part
                        .col_major()
                        .unwrap()
                        .outer_slice(i)
                        .iter()
                        .find(|&&(r, _)| r == j)
                        .map(|&(_, bv)| bv);
                    assert_eq!(found, Some(v.conj()));
                }
            }
            let _ = nr;
        }
    }
}
