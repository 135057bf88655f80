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

//! The bosonic two-operator susceptibility, `chi(tau) = <T_tau A(tau) B(0)>`, in its Lehmann
//! representation, with the disconnected (ensemble-average product) piece handled separately
//! from the pole terms.

use num_complex::Complex64;

use crate::density_matrix::DensityMatrix;
use crate::error::EdResult;
use crate::hamiltonian::Hamiltonian;
use crate::monomial_operator::MonomialOperator;
use crate::states_classification::BlockNumber;
use crate::term_list::{Term, TermList};
use crate::thermal::{Statistics, Status, Thermal};
use crate::tolerances::Tolerances;

fn pole_key(pole: f64, resonance_tol: f64) -> i64 {
    (pole / resonance_tol).round() as i64
}

/// A single non-degenerate pole/residue contribution, `-Residue / (z - Pole)`.
#[derive(Debug, Clone, Copy)]
pub struct SuscTerm {
    residue: Complex64,
    pole: f64,
}

/// The two ways a [`SusceptibilityPart`]'s pole terms are evaluated.
#[derive(Debug, Clone, Copy)]
pub enum SuscArgs {
    /// Evaluate `chi(z)` at an arbitrary complex frequency (bosonic Matsubara or real).
    Frequency(Complex64),
    /// Evaluate the imaginary-time susceptibility at inverse temperature `beta`.
    ImaginaryTime { tau: f64, beta: f64 },
}

impl Term for SuscTerm {
    type Args = SuscArgs;
    type Value = Complex64;

    fn merge(&mut self, other: &Self) {
        self.residue += other.residue;
    }

    fn is_negligible(&self, tol: f64) -> bool {
        self.residue.norm() <= tol
    }

    fn evaluate(&self, args: &SuscArgs) -> Complex64 {
        match *args {
            SuscArgs::Frequency(z) => -self.residue / (z - self.pole),
            SuscArgs::ImaginaryTime { tau, beta } => {
                if self.pole > 0.0 {
                    -self.residue * (-tau * self.pole).exp() / (-beta * self.pole).exp_m1()
                } else {
                    self.residue * ((beta - tau) * self.pole).exp() / (beta * self.pole).exp_m1()
                }
            }
        }
    }
}

/// The contribution of one pair of connected blocks to the susceptibility.
#[derive(Debug, Clone)]
pub struct SusceptibilityPart {
    left: BlockNumber,
    right: BlockNumber,
    terms: TermList<i64, SuscTerm>,
    /// Accumulated weight of pole pairs too close together (`|Pole| <= resonance_tol`) to
    /// treat as a regular `Term`; contributes a constant (not frequency-dependent, except at
    /// exactly `z == 0`) piece instead.
    zero_pole_weight: f64,
}

impl SusceptibilityPart {
    fn compute(
        left: BlockNumber,
        right: BlockNumber,
        a: &MonomialOperator,
        b: &MonomialOperator,
        ham: &Hamiltonian,
        dm: &DensityMatrix,
        tol: &Tolerances,
    ) -> EdResult<Self> {
        let a_part = a.part_by_left(left).expect("caller verified this edge exists");
        let b_part = b.part_by_left(right).expect("caller verified this edge exists");

        let e_left = ham.part(left)?.eigenvalues()?;
        let e_right = ham.part(right)?.eigenvalues()?;
        let w_left = dm.part(left)?.weights();
        let w_right = dm.part(right)?.weights();

        let mut terms = TermList::new();
        let mut zero_pole_weight = 0.0;
        let a_rows = a_part.row_major()?;
        let b_rows = b_part.row_major()?;
        for m in 0..a_rows.outer_size() {
            for &(n, a_val) in a_rows.outer_slice(m) {
                let b_entry = b_rows
                    .outer_slice(n)
                    .iter()
                    .find(|&&(row, _)| row == m)
                    .map(|&(_, v)| v);
                let Some(b_val) = b_entry else { continue };
                let pole = e_right[n] - e_left[m];
                if pole.abs() <= tol.resonance {
                    zero_pole_weight -= w_left[m] * (a_val * b_val).re;
                } else {
                    let residue = (w_left[m] - w_right[n]) * a_val * b_val;
                    let key = pole_key(pole, tol.resonance);
                    terms.add_term(key, SuscTerm { residue, pole });
                }
            }
        }
        terms.prune(tol.term_negligible);
        Ok(SusceptibilityPart {
            left,
            right,
            terms,
            zero_pole_weight,
        })
    }

    /// Evaluates the imaginary-time form, the only one this part handles directly; the `z ==
    /// 0` frequency-domain case needs `beta`, which [`Susceptibility::evaluate`] supplies.
    fn evaluate_imaginary_time(&self, tau: f64, beta: f64) -> Complex64 {
        let pole_sum: Complex64 = self.terms.evaluate(&SuscArgs::ImaginaryTime { tau, beta });
        pole_sum + self.zero_pole_weight
    }
}

/// The full susceptibility `chi(tau) = <T_tau A(tau) B(0)>`, assembled from every connected
/// block pair of an `(A, B)` operator pair.
#[derive(Debug, Clone, Default)]
pub struct Susceptibility {
    parts: Vec<SusceptibilityPart>,
    status: Status,
}

impl Susceptibility {
    /// An unprepared susceptibility.
    pub fn new() -> Self {
        Susceptibility {
            parts: Vec::new(),
            status: Status::Constructed,
        }
    }

    /// Merge-joins the block edges of `a` and `b` (ascending block number) and builds a part
    /// for every pair where `a: right -> left`, `b: left -> right`, and at least one of
    /// `(left, right)` is retained in `dm`.
    pub fn compute(
        &mut self,
        a: &MonomialOperator,
        b: &MonomialOperator,
        ham: &Hamiltonian,
        dm: &DensityMatrix,
        tol: &Tolerances,
    ) -> EdResult<()> {
        let mut edges: Vec<(BlockNumber, BlockNumber)> = a.left_right_blocks().collect();
        edges.sort();
        let mut parts = Vec::new();
        for (left, right) in edges {
            let Some(b_part) = b.part_by_left(right) else { continue };
            if b_part.right() != left {
                continue;
            }
            let left_retained = dm.part(left)?.is_retained();
            let right_retained = dm.part(right)?.is_retained();
            if !left_retained && !right_retained {
                continue;
            }
            parts.push(SusceptibilityPart::compute(left, right, a, b, ham, dm, tol)?);
        }
        tracing::info!(blocks = parts.len(), "Susceptibility::compute");
        self.parts = parts;
        self.status = Status::Computed;
        Ok(())
    }

    /// Subtracts `a_avg * b_avg` (already computed elsewhere) from every part's zero-pole
    /// weight, dropping the disconnected piece iff `|a_avg * b_avg| > cutoff`.
    pub fn subtract_disconnected_precomputed(&mut self, a_avg: Complex64, b_avg: Complex64, cutoff: f64) {
        let disconnected = a_avg * b_avg;
        if disconnected.norm() <= cutoff {
            return;
        }
        if let Some(first) = self.parts.first_mut() {
            first.zero_pole_weight -= disconnected.re;
        }
    }

    /// Computes `<A>` and `<B>` as ensemble averages (`Sum_i w_i O_ii` over every diagonal
    /// block edge) and subtracts their product as in
    /// [`subtract_disconnected_precomputed`](Self::subtract_disconnected_precomputed).
    pub fn subtract_disconnected_ensemble(
        &mut self,
        a: &MonomialOperator,
        b: &MonomialOperator,
        dm: &DensityMatrix,
        cutoff: f64,
    ) -> EdResult<()> {
        let a_avg = ensemble_average(a, dm)?;
        let b_avg = ensemble_average(b, dm)?;
        self.subtract_disconnected_precomputed(a_avg, b_avg, cutoff);
        Ok(())
    }

    /// Evaluates `chi(z)` at an arbitrary complex frequency, substituting the `beta`-scaled
    /// zero-pole contribution exactly at `z == 0`.
    pub fn evaluate(&self, z: Complex64, beta: f64) -> Complex64 {
        if z == Complex64::new(0.0, 0.0) {
            self.parts
                .iter()
                .map(|p| {
                    let pole_sum: Complex64 = p.terms.evaluate(&SuscArgs::Frequency(z));
                    pole_sum + beta * p.zero_pole_weight
                })
                .sum()
        } else {
            self.parts
                .iter()
                .map(|p| p.terms.evaluate(&SuscArgs::Frequency(z)))
                .sum()
        }
    }

    /// Evaluates `chi(i*omega_n)` at the `n`-th bosonic Matsubara frequency.
    pub fn evaluate_matsubara(&self, n: i64, thermal: &Thermal) -> Complex64 {
        self.evaluate(thermal.matsubara_frequency(n, Statistics::Bosonic), thermal.beta)
    }

    /// Evaluates the imaginary-time susceptibility `chi(tau)` for `0 <= tau <= beta`.
    pub fn evaluate_imaginary_time(&self, tau: f64, beta: f64) -> Complex64 {
        self.parts
            .iter()
            .map(|p| p.evaluate_imaginary_time(tau, beta))
            .sum()
    }

    /// Number of contributing block pairs.
    pub fn number_of_parts(&self) -> usize {
        self.parts.len()
    }

    /// Lifecycle status.
    pub fn status(&self) -> Status {
        self.status
    }
}

/// `Sum_i w_i O_ii`, the ensemble (thermal) average of a monomial operator, summed over every
/// block edge that maps a block into itself.
pub fn ensemble_average(op: &MonomialOperator, dm: &DensityMatrix) -> EdResult<Complex64> {
    let mut total = Complex64::new(0.0, 0.0);
    for (left, right) in op.left_right_blocks() {
        if left != right {
            continue;
        }
        let part = op.part_by_left(left).expect("edge came from left_right_blocks");
        let weights = dm.part(left)?.weights();
        let row_major = part.row_major()?;
        for i in 0..row_major.outer_size() {
            if let Some(&(_, value)) = row_major.outer_slice(i).iter().find(|&&(col, _)| col == i) {
                total += weights[i] * value;
            }
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SingleProcessComm;
    use crate::expression::builders::quadratic_operator;
    use crate::expression::FermionProduct;
    use crate::hilbert_space::HilbertSpace;
    use crate::states_classification::StatesClassification;

    fn two_site_setup() -> (Hamiltonian, DensityMatrix, StatesClassification) {
        let mut h = quadratic_operator(0, 1);
        h.add_term(FermionProduct::new([1], [0]).unwrap(), Complex64::new(1.0, 0.0));
        let mut hs = HilbertSpace::new(4, h.clone());
        hs.compute().unwrap();
        let mut sc = StatesClassification::new();
        sc.compute(&hs).unwrap();
        let mut ham = Hamiltonian::new();
        ham.prepare(&sc, &h, 1e-9, &SingleProcessComm).unwrap();
        ham.compute(&SingleProcessComm).unwrap();
        let mut dm = DensityMatrix::new();
        dm.compute(&ham, &Thermal::new(5.0)).unwrap();
        dm.truncate_blocks(1e-14);
        (ham, dm, sc)
    }

    #[test]
    fn density_density_susceptibility_is_real_on_the_imaginary_axis() {
        let (ham, dm, sc) = two_site_setup();
        let tol = Tolerances::default();
        let mut n0_op = MonomialOperator::new(FermionProduct::new([0], [0]).unwrap(), Complex64::new(1.0, 0.0));
        n0_op.prepare(&sc).unwrap();
        n0_op.compute(tol.matrix_element, &ham, &sc, &SingleProcessComm).unwrap();
        let mut chi = Susceptibility::new();
        chi.compute(&n0_op, &n0_op, &ham, &dm, &tol).unwrap();
        let beta = 5.0;
        let value = chi.evaluate_imaginary_time(0.5 * beta, beta);
        assert!(value.im.abs() < 1e-9);
    }
}
