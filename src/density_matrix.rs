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

//! The block-diagonal Gibbs density matrix `rho = exp(-beta H) / Z`.
//!
//! Computed in two phases so that the ground-energy shift (required to keep the largest
//! unnormalized weight bounded by 1) can be applied before any cross-block sum is taken:
//! each part first computes its own unnormalized weights and partial partition function,
//! then [`DensityMatrix::compute`] sums the partial `Z`s and has every part normalize
//! against the same global `Z`.

use crate::error::EdResult;
use crate::hamiltonian::Hamiltonian;
use crate::states_classification::BlockNumber;
use crate::thermal::{Status, Thermal};

/// Per-block Gibbs weights.
#[derive(Debug, Clone, Default)]
pub struct DensityMatrixPart {
    block: BlockNumber,
    /// `weights[i] = exp(-beta (E_i - E_0))`, normalized in place once the global `Z` is
    /// known.
    weights: Vec<f64>,
    /// This block's contribution to `Z`, likewise normalized in place.
    z_part: f64,
    retained: bool,
    status: Status,
}

impl DensityMatrixPart {
    /// Creates an unprepared part for `block`.
    pub fn new(block: BlockNumber) -> Self {
        DensityMatrixPart {
            block,
            weights: Vec::new(),
            z_part: 0.0,
            retained: true,
            status: Status::Constructed,
        }
    }

    fn compute_unnormalized(&mut self, eigenvalues: &[f64], ground_energy: f64, thermal: &Thermal) {
        self.weights = eigenvalues
            .iter()
            .map(|&e| (-thermal.beta * (e - ground_energy)).exp())
            .collect();
        self.z_part = self.weights.iter().sum();
        self.status = Status::Prepared;
    }

    fn normalize(&mut self, z: f64) {
        for w in &mut self.weights {
            *w /= z;
        }
        self.z_part /= z;
        self.status = Status::Computed;
    }

    /// Block this part belongs to.
    pub fn block(&self) -> BlockNumber {
        self.block
    }

    /// This block's normalized weights.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// This block's contribution to the (normalized) partition function.
    pub fn z_part(&self) -> f64 {
        self.z_part
    }

    /// `Sum_i w_i E_i` restricted to this block.
    pub fn average_energy(&self, eigenvalues: &[f64]) -> f64 {
        self.weights
            .iter()
            .zip(eigenvalues)
            .map(|(w, e)| w * e)
            .sum()
    }

    /// Whether this block should feed correlator construction, per
    /// [`DensityMatrix::truncate_blocks`].
    pub fn is_retained(&self) -> bool {
        self.retained
    }
}

/// Orchestrates every [`DensityMatrixPart`] and the global partition function.
#[derive(Debug, Default)]
pub struct DensityMatrix {
    parts: Vec<DensityMatrixPart>,
    z: f64,
    status: Status,
}

impl DensityMatrix {
    /// Creates an empty (unprepared) density matrix.
    pub fn new() -> Self {
        DensityMatrix {
            parts: Vec::new(),
            z: 0.0,
            status: Status::Constructed,
        }
    }

    /// Computes unnormalized per-block weights, sums them into the global partition
    /// function, then normalizes every block's weights and partial `Z` against it.
    pub fn compute(&mut self, hamiltonian: &Hamiltonian, thermal: &Thermal) -> EdResult<()> {
        let ground_energy = hamiltonian.ground_energy()?;
        let mut parts: Vec<DensityMatrixPart> = (0..hamiltonian.number_of_parts() as BlockNumber)
            .map(DensityMatrixPart::new)
            .collect();
        for part in &mut parts {
            let eigenvalues = hamiltonian.part(part.block())?.eigenvalues()?;
            part.compute_unnormalized(eigenvalues, ground_energy, thermal);
        }
        let z: f64 = parts.iter().map(|p| p.z_part).sum();
        for part in &mut parts {
            part.normalize(z);
        }
        self.parts = parts;
        self.z = z;
        self.status = Status::Computed;
        Ok(())
    }

    /// Global partition function (post-shift, pre-normalization value; always 1-consistent
    /// after `compute` since every weight is already normalized, this is the raw `Z` used to
    /// get there).
    pub fn z(&self) -> f64 {
        self.z
    }

    /// Marks a block "retained" iff any of its (normalized) weights exceeds `tol`.
    /// Retention gates correlator-part construction downstream.
    pub fn truncate_blocks(&mut self, tol: f64) {
        let mut retained_count = 0;
        for part in &mut self.parts {
            part.retained = part.weights.iter().any(|&w| w > tol);
            if part.retained {
                retained_count += 1;
            }
        }
        tracing::info!(
            tol,
            retained_blocks = retained_count,
            total_blocks = self.parts.len(),
            "DensityMatrix::truncate_blocks"
        );
    }

    /// Accesses the part for `block`.
    pub fn part(&self, block: BlockNumber) -> EdResult<&DensityMatrixPart> {
        self.parts
            .get(block as usize)
            .filter(|_| block >= 0)
            .ok_or(crate::error::EdError::OutOfRange {
                what: "block number",
                index: block,
            })
    }

    /// `Sum_B Sum_i w_i E_i`, the thermal average energy.
    pub fn average_energy(&self, hamiltonian: &Hamiltonian) -> EdResult<f64> {
        let mut total = 0.0;
        for part in &self.parts {
            let eigenvalues = hamiltonian.part(part.block())?.eigenvalues()?;
            total += part.average_energy(eigenvalues);
        }
        Ok(total)
    }

    /// Lifecycle status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Number of blocks.
    pub fn number_of_parts(&self) -> usize {
        self.parts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SingleProcessComm;
    use crate::expression::builders::quadratic_operator;
    use crate::expression::FermionProduct;
    use crate::hilbert_space::HilbertSpace;
    use crate::states_classification::StatesClassification;
    use num_complex::Complex64;

    fn two_site_hamiltonian() -> (Hamiltonian, StatesClassification) {
        let mut h = quadratic_operator(0, 1);
        h.add_term(FermionProduct::new([1], [0]).unwrap(), Complex64::new(1.0, 0.0));
        let mut hs = HilbertSpace::new(4, h.clone());
        hs.compute().unwrap();
        let mut sc = StatesClassification::new();
        sc.compute(&hs).unwrap();
        let mut ham = Hamiltonian::new();
        ham.prepare(&sc, &h, 1e-9, &SingleProcessComm).unwrap();
        ham.compute(&SingleProcessComm).unwrap();
        (ham, sc)
    }

    #[test]
    fn weights_sum_to_one() {
        let (ham, _sc) = two_site_hamiltonian();
        let mut dm = DensityMatrix::new();
        dm.compute(&ham, &Thermal::new(10.0)).unwrap();
        let total: f64 = (0..dm.number_of_parts() as BlockNumber)
            .map(|b| dm.part(b).unwrap().weights().iter().sum::<f64>())
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ground_state_only_limit_concentrates_weight() {
        let (ham, _sc) = two_site_hamiltonian();
        let mut dm = DensityMatrix::new();
        dm.compute(&ham, &Thermal::new(1.0e6)).unwrap();
        let ground_energy = ham.ground_energy().unwrap();
        let average_energy = dm.average_energy(&ham).unwrap();
        assert!((average_energy - ground_energy).abs() < 1e-6);
    }

    #[test]
    fn truncate_blocks_is_monotone_in_tolerance() {
        let (ham, _sc) = two_site_hamiltonian();
        let mut dm = DensityMatrix::new();
        dm.compute(&ham, &Thermal::new(10.0)).unwrap();
        let count_at = |tol: f64| {
            let mut dm2 = DensityMatrix::new();
            dm2.compute(&ham, &Thermal::new(10.0)).unwrap();
            dm2.truncate_blocks(tol);
            (0..dm2.number_of_parts() as BlockNumber)
                .filter(|&b| dm2.part(b).unwrap().is_retained())
                .count()
        };
        assert!(count_at(1e-15) >= count_at(1e-3));
    }
}
