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

use num_complex::Complex64;

use crate::expression::fermion_product::FermionProduct;
use crate::expression::operator::PolynomialOperator;

/// Builds the single-monomial operator `c^dagger_i`.
pub fn creation_operator(i: usize) -> PolynomialOperator<Complex64> {
    let mut op = PolynomialOperator::new();
    op.add_term(
        FermionProduct::new([i], []).expect("single-index product is always ordered"),
        Complex64::new(1.0, 0.0),
    );
    op
}

/// Builds the single-monomial operator `c_i`.
pub fn annihilation_operator(i: usize) -> PolynomialOperator<Complex64> {
    let mut op = PolynomialOperator::new();
    op.add_term(
        FermionProduct::new([], [i]).expect("single-index product is always ordered"),
        Complex64::new(1.0, 0.0),
    );
    op
}

/// Builds the single-monomial operator `c^dagger_i c_j`.
pub fn quadratic_operator(i: usize, j: usize) -> PolynomialOperator<Complex64> {
    let mut op = PolynomialOperator::new();
    op.add_term(
        FermionProduct::new([i], [j]).expect("single-creator/single-annihilator is ordered"),
        Complex64::new(1.0, 0.0),
    );
    op
}

/// Builds the single-monomial operator `c^dagger_i c^dagger_j c_k c_l`, requiring `i < j`
/// and `k < l` (normal-ordered indices).
pub fn quartic_operator(i: usize, j: usize, k: usize, l: usize) -> crate::error::EdResult<PolynomialOperator<Complex64>> {
    let mut op = PolynomialOperator::new();
    op.add_term(
        FermionProduct::new([i, j], [k, l])?,
        Complex64::new(1.0, 0.0),
    );
    Ok(op)
}
