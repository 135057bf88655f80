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

//! Lifecycle and thermal bookkeeping shared by most components.
//!
//! The source this crate is modeled on threads a `ComputableObject` mixin and a `Thermal`
//! mixin through a deep class hierarchy. Rust has no need for the mixin: every type that
//! needs lifecycle tracking just holds a [`Status`], and every type that needs an inverse
//! temperature holds a [`Thermal`].

use std::f64::consts::PI;

use crate::error::{EdError, EdResult};

/// Three-phase lifecycle shared by `HilbertSpace`, `HamiltonianPart`, `MonomialOperatorPart`,
/// and the correlator parts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    /// Freshly constructed, no storage allocated yet.
    #[default]
    Constructed,
    /// Storage allocated and filled in the "natural" basis.
    Prepared,
    /// Final representation computed (eigenbasis, Lehmann terms, ...).
    Computed,
}

/// Checks that `status >= expected`, otherwise returns a [`EdError::StatusMismatch`].
pub fn require_status(status: Status, expected: Status, op: &'static str) -> EdResult<()> {
    if status >= expected {
        Ok(())
    } else {
        Err(EdError::StatusMismatch {
            expected,
            found: status,
            op,
        })
    }
}

/// Whether a mode obeys Fermi-Dirac or Bose-Einstein statistics, which fixes the spacing of
/// its Matsubara frequencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistics {
    /// `omega_n = pi (2n+1) / beta`.
    Fermionic,
    /// `omega_n = 2 pi n / beta`.
    Bosonic,
}

/// Inverse temperature shared by density matrices and correlators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thermal {
    /// Inverse temperature `1/T`.
    pub beta: f64,
}

impl Thermal {
    /// Creates a new thermal component at the given inverse temperature.
    pub fn new(beta: f64) -> Self {
        Thermal { beta }
    }

    /// The `n`-th Matsubara frequency `i*omega_n` for the given statistics.
    pub fn matsubara_frequency(&self, n: i64, statistics: Statistics) -> num_complex::Complex64 {
        let omega = match statistics {
            Statistics::Fermionic => PI * (2.0 * n as f64 + 1.0) / self.beta,
            Statistics::Bosonic => 2.0 * PI * n as f64 / self.beta,
        };
        num_complex::Complex64::new(0.0, omega)
    }
}
