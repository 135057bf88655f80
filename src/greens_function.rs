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

//! The single-particle Matsubara Green's function, `G(z) = <T c_i(tau) c_j^dagger(0)>`, in
//! its Lehmann (pole/residue) representation.

use num_complex::Complex64;

use crate::density_matrix::DensityMatrix;
use crate::error::EdResult;
use crate::hamiltonian::Hamiltonian;
use crate::monomial_operator::MonomialOperator;
use crate::states_classification::BlockNumber;
use crate::term_list::{Term, TermList};
use crate::thermal::{Statistics, Status, Thermal};
use crate::tolerances::Tolerances;

/// Quantizes a pole to a grid fine enough that two poles the caller considers "the same"
/// (within `resonance_tol`) merge into one `TermList` key, while poles further apart than that
/// stay distinct terms.
fn pole_key(pole: f64, resonance_tol: f64) -> i64 {
    (pole / resonance_tol).round() as i64
}

/// A single pole/residue contribution, `Residue / (z - Pole)`.
#[derive(Debug, Clone, Copy)]
pub struct GfTerm {
    residue: Complex64,
    pole: f64,
}

/// The two ways a [`GreensFunctionPart`]'s terms are evaluated.
#[derive(Debug, Clone, Copy)]
pub enum GfArgs {
    /// Evaluate `G(z)` at an arbitrary complex frequency (Matsubara or real).
    Frequency(Complex64),
    /// Evaluate the imaginary-time Green's function `G(tau)` at inverse temperature `beta`.
    ImaginaryTime { tau: f64, beta: f64 },
}

impl Term for GfTerm {
    type Args = GfArgs;
    type Value = Complex64;

    fn merge(&mut self, other: &Self) {
        self.residue += other.residue;
    }

    fn is_negligible(&self, tol: f64) -> bool {
        self.residue.norm() <= tol
    }

    fn evaluate(&self, args: &GfArgs) -> Complex64 {
        match *args {
            GfArgs::Frequency(z) => self.residue / (z - self.pole),
            GfArgs::ImaginaryTime { tau, beta } => {
                if self.pole > 0.0 {
                    -self.residue * (-tau * self.pole).exp() / (1.0 + (-beta * self.pole).exp())
                } else {
                    -self.residue * ((beta - tau) * self.pole).exp() / ((beta * self.pole).exp() + 1.0)
                }
            }
        }
    }
}

/// The contribution of one pair of connected blocks to the Green's function.
#[derive(Debug, Clone)]
pub struct GreensFunctionPart {
    /// Block `c_i` maps states of `right` into.
    left: BlockNumber,
    /// Block `c_j^dagger` maps states of `left` into.
    right: BlockNumber,
    terms: TermList<i64, GfTerm>,
}

impl GreensFunctionPart {
    fn compute(
        left: BlockNumber,
        right: BlockNumber,
        c: &MonomialOperator,
        cdag: &MonomialOperator,
        ham: &Hamiltonian,
        dm: &DensityMatrix,
        tol: &Tolerances,
    ) -> EdResult<Self> {
        let c_part = c.part_by_left(left).expect("caller verified this edge exists");
        let cdag_part = cdag.part_by_left(right).expect("caller verified this edge exists");

        let e_left = ham.part(left)?.eigenvalues()?;
        let e_right = ham.part(right)?.eigenvalues()?;
        let w_left = dm.part(left)?.weights();
        let w_right = dm.part(right)?.weights();

        let mut terms = TermList::new();
        let c_rows = c_part.row_major()?;
        let cdag_rows = cdag_part.row_major()?;
        for m in 0..c_rows.outer_size() {
            for &(n, c_val) in c_rows.outer_slice(m) {
                let cdag_entry = cdag_rows
                    .outer_slice(n)
                    .iter()
                    .find(|&&(row, _)| row == m)
                    .map(|&(_, v)| v);
                let Some(cdag_val) = cdag_entry else { continue };
                let pole = e_right[n] - e_left[m];
                let residue = (w_left[m] + w_right[n]) * c_val * cdag_val;
                let key = pole_key(pole, tol.resonance);
                terms.add_term(key, GfTerm { residue, pole });
            }
        }
        terms.prune(tol.term_negligible);
        Ok(GreensFunctionPart { left, right, terms })
    }

    /// Number of distinct poles kept in this part.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether this part has no surviving terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// The full Green's function, assembled from every connected block pair of a `(c, c^dagger)`
/// operator pair.
#[derive(Debug, Clone, Default)]
pub struct GreensFunction {
    parts: Vec<GreensFunctionPart>,
    status: Status,
}

impl GreensFunction {
    /// An unprepared Green's function.
    pub fn new() -> Self {
        GreensFunction {
            parts: Vec::new(),
            status: Status::Constructed,
        }
    }

    /// Builds one part per block pair where `c` (mapping `right -> left`) and `c^dagger`
    /// (mapping `left -> right`) are both nonzero, i.e. where the two operators' block edges
    /// are mutually inverse.
    pub fn compute(
        &mut self,
        c: &MonomialOperator,
        cdag: &MonomialOperator,
        ham: &Hamiltonian,
        dm: &DensityMatrix,
        tol: &Tolerances,
    ) -> EdResult<()> {
        let mut parts = Vec::new();
        for (left, right) in c.left_right_blocks() {
            if let Some(cdag_part) = cdag.part_by_left(right) {
                if cdag_part.right() == left {
                    parts.push(GreensFunctionPart::compute(left, right, c, cdag, ham, dm, tol)?);
                }
            }
        }
        tracing::info!(blocks = parts.len(), "GreensFunction::compute");
        self.parts = parts;
        self.status = Status::Computed;
        Ok(())
    }

    /// Evaluates `G(z)` at an arbitrary complex frequency.
    pub fn evaluate(&self, z: Complex64) -> Complex64 {
        self.parts
            .iter()
            .map(|p| p.terms.evaluate(&GfArgs::Frequency(z)))
            .sum()
    }

    /// Evaluates `G(i*omega_n)` at the `n`-th fermionic Matsubara frequency.
    pub fn evaluate_matsubara(&self, n: i64, thermal: &Thermal) -> Complex64 {
        self.evaluate(thermal.matsubara_frequency(n, Statistics::Fermionic))
    }

    /// Evaluates the imaginary-time Green's function `G(tau)` for `0 <= tau <= beta`.
    pub fn evaluate_imaginary_time(&self, tau: f64, beta: f64) -> Complex64 {
        self.parts
            .iter()
            .map(|p| p.terms.evaluate(&GfArgs::ImaginaryTime { tau, beta }))
            .sum()
    }

    /// Number of contributing block pairs.
    pub fn number_of_parts(&self) -> usize {
        self.parts.len()
    }

    /// The part for a given `(left, right)` block pair, if present.
    pub fn part(&self, left: BlockNumber, right: BlockNumber) -> Option<&GreensFunctionPart> {
        self.parts.iter().find(|p| p.left == left && p.right == right)
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
    use crate::expression::builders::{annihilation_operator, creation_operator, quadratic_operator};
    use crate::expression::FermionProduct;
    use crate::hilbert_space::HilbertSpace;
    use crate::states_classification::StatesClassification;

    fn two_site_setup() -> (Hamiltonian, DensityMatrix, StatesClassification) {
        let mut h = quadratic_operator(0, 1);
        h.add_term(FermionProduct::new([1], [0]).unwrap(), Complex64::new(1.0, 0.0));
        let mut hs = HilbertSpace::new(4, h.clone());
        hs.refine_with(Box::new(creation_operator(0)));
        hs.refine_with(Box::new(annihilation_operator(0)));
        hs.refine_with(Box::new(creation_operator(1)));
        hs.refine_with(Box::new(annihilation_operator(1)));
        hs.compute().unwrap();
        let mut sc = StatesClassification::new();
        sc.compute(&hs).unwrap();
        let mut ham = Hamiltonian::new();
        ham.prepare(&sc, &h, 1e-9, &SingleProcessComm).unwrap();
        ham.compute(&SingleProcessComm).unwrap();
        let mut dm = DensityMatrix::new();
        dm.compute(&ham, &Thermal::new(5.0)).unwrap();
        (ham, dm, sc)
    }

    #[test]
    fn high_frequency_tail_matches_unit_spectral_weight() {
        let (ham, dm, sc) = two_site_setup();
        let tol = Tolerances::default();
        let mut c0 = MonomialOperator::new(FermionProduct::new([], [0]).unwrap(), Complex64::new(1.0, 0.0));
        c0.prepare(&sc).unwrap();
        c0.compute(tol.matrix_element, &ham, &sc, &SingleProcessComm).unwrap();
        let mut cdag0 = MonomialOperator::new(FermionProduct::new([0], []).unwrap(), Complex64::new(1.0, 0.0));
        cdag0.compute_as_adjoint_of(&c0).unwrap();

        let mut gf = GreensFunction::new();
        gf.compute(&c0, &cdag0, &ham, &dm, &tol).unwrap();

        // G(z) ~ 1/z for large |z|, the sum rule Sum_poles Residue == 1 for a single fermion mode.
        let z = Complex64::new(0.0, 1.0e6);
        let tail = gf.evaluate(z) * z;
        assert!((tail.re - 1.0).abs() < 1e-3);
        assert!(tail.im.abs() < 1e-3);
    }
}
