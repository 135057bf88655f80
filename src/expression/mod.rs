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

//! Minimal second-quantized expression algebra: fermionic monomials, polynomial operators
//! over them, and the Fock-space linear-operator action (including the fermionic sign).
//!
//! This module is the concrete, simplified stand-in for the "expression algebra" external
//! collaborator described in the design: a polynomial expression with scalar coefficients
//! and a linear-operator representation that maps a state to its image.

pub mod builders;
pub mod fermion_product;
pub mod index_map;
pub mod operator;

pub use builders::{annihilation_operator, creation_operator, quadratic_operator, quartic_operator};
pub use fermion_product::FermionProduct;
pub use index_map::{IndexMap, ParticleIndex, QuantumState};
pub use operator::{apply_product, LinearOperator, PolynomialOperator};

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn creation_then_annihilation_returns_original_state() {
        let cdag = creation_operator(0);
        let c = annihilation_operator(0);
        let vacuum: QuantumState = 0;
        let (occ, sign) = cdag.apply(vacuum)[0];
        assert_eq!(occ, 1);
        assert_eq!(sign, Complex64::new(1.0, 0.0));
        let image = c.apply(occ);
        assert_eq!(image[0].0, vacuum);
    }

    #[test]
    fn pauli_exclusion_annihilates_double_occupation() {
        let cdag = creation_operator(2);
        let already_occupied: QuantumState = 0b100;
        assert!(cdag.apply(already_occupied).is_empty());
    }

    #[test]
    fn sign_flips_across_an_occupied_lower_mode() {
        let cdag1 = creation_operator(1);
        let state_with_mode0_filled: QuantumState = 0b01;
        let (_, sign) = cdag1.apply(state_with_mode0_filled)[0];
        assert_eq!(sign, Complex64::new(-1.0, 0.0));
    }
}
