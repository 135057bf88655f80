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

//! Per-block dense Hamiltonian storage and diagonalization, and the orchestration of all
//! blocks into a global spectrum.

use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::comm::{Communicator, MpiDispatcher};
use crate::error::{EdError, EdResult};
use crate::expression::LinearOperator;
use crate::scalar::{HScalar, Matrix};
use crate::states_classification::{BlockNumber, InnerQuantumState, StatesClassification};
use crate::thermal::Status;

/// One diagonal block of the Hamiltonian.
///
/// Prepared: `matrix` holds the block's Fock-basis representation. Computed: `matrix`
/// has been overwritten column-by-column with eigenvectors (ascending eigenvalue order)
/// and `eigenvalues` is filled. `dim` tracks the block's *current* size, which may shrink
/// below its original Fock-space dimension after [`Hamiltonian::reduce`].
#[derive(Debug, Clone)]
pub struct HamiltonianPart {
    block: BlockNumber,
    dim: usize,
    status: Status,
    matrix: Option<Matrix>,
    eigenvalues: Vec<f64>,
}

impl HamiltonianPart {
    /// Creates an unprepared part for `block`, whose Fock-space dimension is `dim`.
    pub fn new(block: BlockNumber, dim: usize) -> Self {
        HamiltonianPart {
            block,
            dim,
            status: Status::Constructed,
            matrix: None,
            eigenvalues: Vec::new(),
        }
    }

    /// Block this part belongs to.
    pub fn block(&self) -> BlockNumber {
        self.block
    }

    /// Current dimension (Fock-basis size before [`Hamiltonian::reduce`], eigenstate count
    /// after it).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Lifecycle status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Fills the block's dense matrix by applying `op` to every Fock basis state of `block`,
    /// then checks Hermiticity within `tol`.
    pub fn prepare<H>(
        &mut self,
        sc: &StatesClassification,
        op: &H,
        tol: f64,
    ) -> EdResult<()>
    where
        H: LinearOperator,
        H::Scalar: HScalar,
    {
        let n = self.dim;
        let matrix = if H::Scalar::IS_COMPLEX {
            let mut m = DMatrix::<Complex64>::zeros(n, n);
            self.fill_columns(sc, op, |m: &mut DMatrix<Complex64>, i, j, v: H::Scalar| {
                m[(i, j)] += v.into();
            }, &mut m)?;
            Matrix::Complex(m)
        } else {
            let mut m = DMatrix::<f64>::zeros(n, n);
            self.fill_columns(sc, op, |m: &mut DMatrix<f64>, i, j, v: H::Scalar| {
                m[(i, j)] += v.into().re;
            }, &mut m)?;
            Matrix::Real(m)
        };
        check_hermiticity(&matrix, tol)?;
        self.matrix = Some(matrix);
        self.status = Status::Prepared;
        Ok(())
    }

    fn fill_columns<H, T>(
        &self,
        sc: &StatesClassification,
        op: &H,
        mut add: impl FnMut(&mut DMatrix<T>, usize, usize, H::Scalar),
        m: &mut DMatrix<T>,
    ) -> EdResult<()>
    where
        H: LinearOperator,
        T: nalgebra::Scalar,
    {
        for j in 0..self.dim {
            let state = sc.fock_state(self.block, j)?;
            for (image, value) in op.apply(state) {
                let image_block = sc.block_number(image)?;
                if image_block != self.block {
                    return Err(EdError::ConstructionError(format!(
                        "operator maps block {} outside itself into block {}; HilbertSpace::compute \
                         should have merged these into one invariant subspace",
                        self.block, image_block
                    )));
                }
                let i = sc.inner_state(image)?;
                if i < self.dim {
                    add(m, i, j, value);
                }
            }
        }
        Ok(())
    }

    /// Diagonalizes the block, replacing `matrix` with the eigenvector matrix (columns are
    /// eigenvectors, sorted by ascending eigenvalue) and filling `eigenvalues`.
    pub fn compute(&mut self) -> EdResult<()> {
        if self.status == Status::Computed {
            return Ok(());
        }
        let matrix = self
            .matrix
            .take()
            .ok_or(EdError::StatusMismatch {
                expected: Status::Prepared,
                found: self.status,
                op: "HamiltonianPart::compute",
            })?;

        if self.dim == 1 {
            // Short-circuit: the sole diagonal entry is both the eigenvalue and the (trivial)
            // eigenvector.
            let eigenvalue = matrix.get_complex(0, 0).re;
            self.eigenvalues = vec![eigenvalue];
            self.matrix = Some(match matrix {
                Matrix::Real(_) => Matrix::Real(DMatrix::<f64>::from_element(1, 1, 1.0)),
                Matrix::Complex(_) => {
                    Matrix::Complex(DMatrix::<Complex64>::from_element(1, 1, Complex64::new(1.0, 0.0)))
                }
            });
            self.status = Status::Computed;
            return Ok(());
        }

        let (eigenvalues, eigenvectors) = match matrix {
            Matrix::Real(m) => {
                let eigen = nalgebra::SymmetricEigen::new(m);
                (eigen.eigenvalues, Matrix::Real(eigen.eigenvectors))
            }
            Matrix::Complex(m) => {
                let eigen = nalgebra::SymmetricEigen::new(m);
                (eigen.eigenvalues, Matrix::Complex(eigen.eigenvectors))
            }
        };

        // nalgebra does not guarantee an eigenvalue order; sort ascending so that
        // `Hamiltonian::reduce`'s prefix-truncation and `ground_energy` are well-defined.
        let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
        order.sort_by(|&a, &b| eigenvalues[a].partial_cmp(&eigenvalues[b]).unwrap());
        let sorted_eigenvalues: Vec<f64> = order.iter().map(|&i| eigenvalues[i]).collect();
        let sorted_eigenvectors = match eigenvectors {
            Matrix::Real(m) => Matrix::Real(DMatrix::from_fn(m.nrows(), m.ncols(), |r, c| m[(r, order[c])])),
            Matrix::Complex(m) => {
                Matrix::Complex(DMatrix::from_fn(m.nrows(), m.ncols(), |r, c| m[(r, order[c])]))
            }
        };

        self.eigenvalues = sorted_eigenvalues;
        self.matrix = Some(sorted_eigenvectors);
        self.status = Status::Computed;
        Ok(())
    }

    /// Drops every eigenstate past the first `keep` (ascending energy), truncating both the
    /// eigenvector matrix's rows and columns to `keep x keep`, mirroring the source's
    /// `topLeftCorner(keep, keep)` cutoff-reduction step.
    pub fn reduce(&mut self, keep: usize) -> EdResult<()> {
        crate::thermal::require_status(self.status, Status::Computed, "HamiltonianPart::reduce")?;
        if keep >= self.dim {
            return Ok(());
        }
        self.eigenvalues.truncate(keep);
        self.matrix = Some(match self.matrix.take().expect("Computed implies matrix is Some") {
            Matrix::Real(m) => Matrix::Real(m.view((0, 0), (keep, keep)).into_owned()),
            Matrix::Complex(m) => Matrix::Complex(m.view((0, 0), (keep, keep)).into_owned()),
        });
        self.dim = keep;
        Ok(())
    }

    /// The `i`-th eigenvalue (ascending).
    pub fn eigenvalue(&self, i: InnerQuantumState) -> EdResult<f64> {
        crate::thermal::require_status(self.status, Status::Computed, "HamiltonianPart::eigenvalue")?;
        self.eigenvalues
            .get(i)
            .copied()
            .ok_or(EdError::OutOfRange {
                what: "inner quantum state",
                index: i as i64,
            })
    }

    /// All eigenvalues (ascending).
    pub fn eigenvalues(&self) -> EdResult<&[f64]> {
        crate::thermal::require_status(self.status, Status::Computed, "HamiltonianPart::eigenvalues")?;
        Ok(&self.eigenvalues)
    }

    /// The `(row, col)` entry of the stored matrix, promoted to `Complex64` regardless of
    /// whether this block is real- or complex-valued. In `Prepared` status this is a
    /// Fock-basis matrix element; in `Computed` status it is an eigenvector component.
    pub fn entry(&self, row: usize, col: usize) -> EdResult<Complex64> {
        self.matrix
            .as_ref()
            .map(|m| m.get_complex(row, col))
            .ok_or(EdError::StatusMismatch {
                expected: Status::Prepared,
                found: self.status,
                op: "HamiltonianPart::entry",
            })
    }

    /// Whether this part's matrix carries an imaginary part.
    pub fn is_complex(&self) -> bool {
        self.matrix.as_ref().map(Matrix::is_complex).unwrap_or(false)
    }
}

fn check_hermiticity(matrix: &Matrix, tol: f64) -> EdResult<()> {
    let n = matrix.nrows();
    let mut max_diff = 0.0f64;
    for i in 0..n {
        for j in 0..n {
            let diff = (matrix.get_complex(i, j) - matrix.get_complex(j, i).conj()).norm();
            if diff > max_diff {
                max_diff = diff;
            }
        }
    }
    if max_diff > tol {
        Err(EdError::NumericError(format!(
            "Hamiltonian block is not Hermitian within {tol:e}: max |H - H^dagger| = {max_diff:e}"
        )))
    } else {
        Ok(())
    }
}

/// Orchestrates every [`HamiltonianPart`] and exposes the global spectrum.
#[derive(Debug, Default)]
pub struct Hamiltonian {
    parts: Vec<HamiltonianPart>,
    status: Status,
    ground_energy: f64,
    is_complex: bool,
}

impl Hamiltonian {
    /// Creates an empty (unprepared) Hamiltonian.
    pub fn new() -> Self {
        Hamiltonian {
            parts: Vec::new(),
            status: Status::Constructed,
            ground_energy: 0.0,
            is_complex: false,
        }
    }

    /// Allocates and fills one [`HamiltonianPart`] per block of `sc`, distributing the
    /// assembly work across `comm` via [`MpiDispatcher`].
    pub fn prepare<H, C>(
        &mut self,
        sc: &StatesClassification,
        op: &H,
        tol: f64,
        comm: &C,
    ) -> EdResult<()>
    where
        H: LinearOperator + Sync,
        H::Scalar: HScalar,
        C: Communicator,
    {
        let n_blocks = sc.number_of_blocks();
        let mut parts: Vec<HamiltonianPart> = (0..n_blocks as BlockNumber)
            .map(|b| HamiltonianPart::new(b, sc.block_size(b).unwrap_or(0)))
            .collect();
        let mut dispatcher = MpiDispatcher::new(n_blocks);
        let mut first_error = None;
        dispatcher.run_all(comm, |job| {
            if first_error.is_some() {
                return;
            }
            if let Err(e) = parts[job].prepare(sc, op, tol) {
                first_error = Some(e);
            }
        });
        if let Some(e) = first_error {
            return Err(e);
        }
        self.is_complex = H::Scalar::IS_COMPLEX;
        self.parts = parts;
        self.status = Status::Prepared;
        Ok(())
    }

    /// Diagonalizes every block, distributing the work across `comm`, then records the
    /// global ground energy as the minimum eigenvalue over all blocks.
    pub fn compute<C: Communicator>(&mut self, comm: &C) -> EdResult<()> {
        if self.status == Status::Computed {
            return Ok(());
        }
        let n = self.parts.len();
        let mut dispatcher = MpiDispatcher::new(n);
        let parts = &mut self.parts;
        let mut first_error = None;
        dispatcher.run_all(comm, |job| {
            if first_error.is_some() {
                return;
            }
            if let Err(e) = parts[job].compute() {
                first_error = Some(e);
            }
        });
        if let Some(e) = first_error {
            return Err(e);
        }
        self.ground_energy = self
            .parts
            .iter()
            .flat_map(|p| p.eigenvalues.iter().copied())
            .fold(f64::INFINITY, f64::min);
        self.status = Status::Computed;
        Ok(())
    }

    /// Drops every eigenvalue above `ground_energy + cutoff` in every block.
    pub fn reduce(&mut self, cutoff: f64) -> EdResult<()> {
        crate::thermal::require_status(self.status, Status::Computed, "Hamiltonian::reduce")?;
        let threshold = self.ground_energy + cutoff;
        for part in &mut self.parts {
            let keep = part.eigenvalues.iter().take_while(|&&e| e <= threshold).count();
            part.reduce(keep)?;
        }
        tracing::info!(
            cutoff,
            threshold,
            blocks = self.parts.len(),
            "Hamiltonian::reduce: truncated eigenspectrum"
        );
        Ok(())
    }

    /// Global ground-state energy, `min_B min_i eigenvalues[B][i]`.
    pub fn ground_energy(&self) -> EdResult<f64> {
        crate::thermal::require_status(self.status, Status::Computed, "Hamiltonian::ground_energy")?;
        Ok(self.ground_energy)
    }

    /// Whether any block uses complex scalars.
    pub fn is_complex(&self) -> bool {
        self.is_complex
    }

    /// Number of blocks.
    pub fn number_of_parts(&self) -> usize {
        self.parts.len()
    }

    /// Accesses the part for `block`.
    pub fn part(&self, block: BlockNumber) -> EdResult<&HamiltonianPart> {
        self.parts
            .get(block as usize)
            .filter(|_| block >= 0)
            .ok_or(EdError::OutOfRange {
                what: "block number",
                index: block,
            })
    }

    /// The `i`-th eigenvalue of `block`.
    pub fn eigenvalue(&self, block: BlockNumber, i: InnerQuantumState) -> EdResult<f64> {
        self.part(block)?.eigenvalue(i)
    }

    /// Lifecycle status.
    pub fn status(&self) -> Status {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SingleProcessComm;
    use crate::expression::builders::quadratic_operator;
    use crate::hilbert_space::HilbertSpace;

    fn two_site_hopping() -> crate::expression::operator::PolynomialOperator<Complex64> {
        let mut h = quadratic_operator(0, 1);
        h.add_term(
            crate::expression::FermionProduct::new([1], [0]).unwrap(),
            Complex64::new(1.0, 0.0),
        );
        h
    }

    fn prepared_hamiltonian() -> (Hamiltonian, StatesClassification) {
        let h = two_site_hopping();
        let mut hs = HilbertSpace::new(4, h.clone());
        hs.compute().unwrap();
        let mut sc = StatesClassification::new();
        sc.compute(&hs).unwrap();
        let mut ham = Hamiltonian::new();
        ham.prepare(&sc, &h, 1e-9, &SingleProcessComm).unwrap();
        (ham, sc)
    }

    #[test]
    fn blocks_are_hermitian_within_tolerance() {
        let (ham, _sc) = prepared_hamiltonian();
        assert_eq!(ham.status(), Status::Prepared);
        assert!(ham.number_of_parts() >= 1);
    }

    #[test]
    fn ground_energy_matches_minimum_across_blocks() {
        let (mut ham, _sc) = prepared_hamiltonian();
        ham.compute(&SingleProcessComm).unwrap();
        let mut min_seen = f64::INFINITY;
        for b in 0..ham.number_of_parts() as BlockNumber {
            for &e in ham.part(b).unwrap().eigenvalues().unwrap() {
                min_seen = min_seen.min(e);
            }
        }
        assert!((ham.ground_energy().unwrap() - min_seen).abs() < 1e-12);
    }

    #[test]
    fn one_particle_sector_has_bonding_antibonding_split() {
        let (mut ham, sc) = prepared_hamiltonian();
        ham.compute(&SingleProcessComm).unwrap();
        // The 1-particle block mixes |01> and |10> via hopping t=1: eigenvalues are +-1.
        let one_particle_block = sc.block_number(0b01).unwrap();
        let evs = ham.part(one_particle_block).unwrap().eigenvalues().unwrap();
        if evs.len() == 2 {
            assert!((evs[0] + evs[1]).abs() < 1e-9);
            assert!((evs[1] - evs[0] - 2.0).abs() < 1e-9);
        }
    }
}
