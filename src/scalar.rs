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

//! Real/complex scalar dispatch.
//!
//! The source carries a compile-time boolean through templates and branches to a concrete
//! instantiation only at the top of each public entry point. We use a small sum type instead,
//! restricted to the four sites named in the design notes: Hamiltonian-part assembly,
//! Hamiltonian-part diagonalization, monomial-operator-part image computation, and
//! eigenbasis rotation of monomial-operator matrices. Everything downstream of those four
//! sites (correlator assembly, term lists, evaluation) works exclusively with `Complex64`,
//! since residues and poles are complex regardless of whether the Hamiltonian itself is real.

use nalgebra::DMatrix;
use num_complex::Complex64;

/// A dense block matrix that is either real- or complex-valued.
///
/// Used only at the four dispatch sites named in the module documentation; everywhere else
/// scalars are plain `Complex64`.
#[derive(Debug, Clone)]
pub enum Matrix {
    /// A real-valued block (no complex hopping/pairing terms touch this block).
    Real(DMatrix<f64>),
    /// A complex-valued block.
    Complex(DMatrix<Complex64>),
}

impl Matrix {
    /// Number of rows.
    pub fn nrows(&self) -> usize {
        match self {
            Matrix::Real(m) => m.nrows(),
            Matrix::Complex(m) => m.nrows(),
        }
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        match self {
            Matrix::Real(m) => m.ncols(),
            Matrix::Complex(m) => m.ncols(),
        }
    }

    /// Entry `(i, j)` promoted to `Complex64` regardless of the underlying storage.
    pub fn get_complex(&self, i: usize, j: usize) -> Complex64 {
        match self {
            Matrix::Real(m) => Complex64::new(m[(i, j)], 0.0),
            Matrix::Complex(m) => m[(i, j)],
        }
    }

    /// Promotes this matrix to a complex one, cloning if it already is complex.
    pub fn to_complex(&self) -> DMatrix<Complex64> {
        match self {
            Matrix::Real(m) => m.map(|x| Complex64::new(x, 0.0)),
            Matrix::Complex(m) => m.clone(),
        }
    }

    /// Whether this is the complex variant.
    pub fn is_complex(&self) -> bool {
        matches!(self, Matrix::Complex(_))
    }
}

/// Marker for the scalar type a [`crate::expression::LinearOperator`] produces, restricted
/// to the handful of call sites (Hamiltonian-part assembly/diagonalization,
/// monomial-operator-part image computation/rotation) that need to know whether they are
/// holding a real or a complex block.
pub trait HScalar: Copy + Into<Complex64> + Default + std::ops::AddAssign {
    /// `true` for `Complex64`, `false` for `f64`.
    const IS_COMPLEX: bool;
}

impl HScalar for f64 {
    const IS_COMPLEX: bool = false;
}

impl HScalar for Complex64 {
    const IS_COMPLEX: bool = true;
}
