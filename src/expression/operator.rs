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

use indexmap::IndexMap as OrderedMap;
use num_complex::Complex64;

use crate::error::{EdError, EdResult};
use crate::expression::fermion_product::FermionProduct;
use crate::expression::index_map::QuantumState;

/// Gives the fermionic sign picked up by acting with a single creation/annihilation operator
/// at bit position `slot` on `state`, i.e. `(-1)` to the number of occupied modes below
/// `slot` (the standard Jordan-Wigner string convention).
fn jordan_wigner_sign(state: QuantumState, slot: usize) -> f64 {
    let mask = (1u64 << slot) - 1;
    if (state & mask).count_ones() % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

/// Applies a single annihilation operator at `slot` to `state`.
///
/// Returns `None` if the mode is empty (the operator annihilates the state); otherwise the
/// resulting state and the accumulated fermionic sign.
fn apply_annihilator(state: QuantumState, slot: usize) -> Option<(QuantumState, f64)> {
    if state & (1 << slot) == 0 {
        None
    } else {
        let sign = jordan_wigner_sign(state, slot);
        Some((state & !(1 << slot), sign))
    }
}

/// Applies a single creation operator at `slot` to `state`.
///
/// Returns `None` if the mode is already occupied (Pauli exclusion); otherwise the resulting
/// state and the accumulated fermionic sign.
fn apply_creator(state: QuantumState, slot: usize) -> Option<(QuantumState, f64)> {
    if state & (1 << slot) != 0 {
        None
    } else {
        let sign = jordan_wigner_sign(state, slot);
        Some((state | (1 << slot), sign))
    }
}

/// Applies one [`FermionProduct`] monomial, `c^dagger_{i1}...c^dagger_{ip} c_{j1}...c_{jq}`,
/// to a Fock state, right to left (annihilators act first).
///
/// Returns `None` if any elementary operator in the chain annihilates the state, otherwise
/// the resulting state and the total fermionic sign.
pub fn apply_product(product: &FermionProduct, mut state: QuantumState) -> Option<(QuantumState, f64)> {
    let mut sign = 1.0;
    for &slot in product.annihilators.iter().rev() {
        let (next_state, s) = apply_annihilator(state, slot)?;
        state = next_state;
        sign *= s;
    }
    for &slot in product.creators.iter().rev() {
        let (next_state, s) = apply_creator(state, slot)?;
        state = next_state;
        sign *= s;
    }
    Some((state, sign))
}

/// A polynomial operator: a sum of [`FermionProduct`] monomials with scalar coefficients.
///
/// `S` is `f64` for a real operator and `Complex64` for a complex one; see the design note
/// on scalar dispatch in [`crate::scalar`].
#[derive(Debug, Clone)]
pub struct PolynomialOperator<S> {
    terms: OrderedMap<FermionProduct, S>,
}

impl<S: Copy + Default + std::ops::AddAssign> PolynomialOperator<S> {
    /// Creates an operator with no terms.
    pub fn new() -> Self {
        PolynomialOperator {
            terms: OrderedMap::new(),
        }
    }

    /// Adds `coefficient * product` to the operator, accumulating into any existing term for
    /// the same monomial.
    pub fn add_term(&mut self, product: FermionProduct, coefficient: S) {
        self.terms
            .entry(product)
            .and_modify(|c| *c += coefficient)
            .or_insert(coefficient);
    }

    /// Iterates over the `(monomial, coefficient)` pairs making up this operator.
    pub fn iter(&self) -> impl Iterator<Item = (&FermionProduct, &S)> {
        self.terms.iter()
    }

    /// Number of distinct monomials.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the operator has no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// If this operator consists of exactly one monomial, returns it together with its
    /// coefficient; otherwise a [`EdError::ConstructionError`].
    pub fn as_monomial(&self) -> EdResult<(&FermionProduct, &S)> {
        if self.terms.len() == 1 {
            Ok(self.terms.iter().next().expect("checked len == 1"))
        } else {
            Err(EdError::ConstructionError(format!(
                "expected a single monomial, found {}",
                self.terms.len()
            )))
        }
    }
}

impl<S: Copy + Default + std::ops::AddAssign> Default for PolynomialOperator<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// A trait for objects that can act on a Fock basis state and report the (possibly empty)
/// image, the concrete stand-in for the "linear operator" external collaborator of the
/// design (§6).
pub trait LinearOperator {
    /// Scalar type of the matrix elements produced by this operator.
    type Scalar: Copy;

    /// Returns the nonzero images of `state` under this operator, each paired with its
    /// matrix element.
    fn apply(&self, state: QuantumState) -> Vec<(QuantumState, Self::Scalar)>;
}

impl LinearOperator for PolynomialOperator<Complex64> {
    type Scalar = Complex64;

    fn apply(&self, state: QuantumState) -> Vec<(QuantumState, Complex64)> {
        let mut out = Vec::new();
        for (product, coeff) in self.terms.iter() {
            if let Some((image, sign)) = apply_product(product, state) {
                out.push((image, coeff * sign));
            }
        }
        out
    }
}

impl LinearOperator for PolynomialOperator<f64> {
    type Scalar = f64;

    fn apply(&self, state: QuantumState) -> Vec<(QuantumState, f64)> {
        let mut out = Vec::new();
        for (product, coeff) in self.terms.iter() {
            if let Some((image, sign)) = apply_product(product, state) {
                out.push((image, coeff * sign));
            }
        }
        out
    }
}
