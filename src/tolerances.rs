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

//! Caller-provided numerical tolerances.
//!
//! There is no configuration file format in this crate (per the design, tolerances and
//! presets are the only "configuration" the core accepts); callers construct a
//! [`Tolerances`] and thread it through every `prepare`/`compute` call that needs a
//! numerical cutoff.

/// Numerical tolerances used across block assembly, operator pruning, and correlator term
/// aggregation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// Maximum allowed `|H - H^dagger|` (Hermiticity sanity check on an assembled
    /// Hamiltonian block), scaled by the block dimension at the call site.
    pub hamiltonian_hermiticity: f64,
    /// Matrix elements of a monomial operator at or below this magnitude are pruned when
    /// rotating into the eigenbasis.
    pub matrix_element: f64,
    /// Base scale for `TermList` negligibility; the effective per-term tolerance is this
    /// value divided by `container_size + 1`.
    pub term_negligible: f64,
    /// Two poles (or an energy difference) closer than this are treated as coincident,
    /// triggering resonant-term handling.
    pub resonance: f64,
    /// Threshold below which a disconnected-subtraction average is treated as exactly zero.
    pub disconnected_cutoff: f64,
}

impl Default for Tolerances {
    /// Matches the constants named in the testable-properties section: `tol_H = 100*eps`,
    /// `tol_GF = 1e-7`, `tol_2PGF = 1e-6`, `tol_resonance = 1e-8`.
    fn default() -> Self {
        Tolerances {
            hamiltonian_hermiticity: 100.0 * f64::EPSILON,
            matrix_element: 1e-7,
            term_negligible: 1e-6,
            resonance: 1e-8,
            disconnected_cutoff: 1e-10,
        }
    }
}
