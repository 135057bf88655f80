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

// #![deny(missing_docs)]
// #![warn(private_intra_doc_links)]
// #![deny(missing_debug_implementations)]

//! Exact diagonalization of finite-size lattice fermion models.
//!
//! `pomerust` builds the full many-body Hilbert space of a second-quantized fermionic
//! Hamiltonian, decomposes it into invariant (block) subspaces via the Hamiltonian's and a
//! set of elementary operators' connectivity, diagonalizes each block, and evaluates
//! finite-temperature correlators (Green's functions, susceptibilities, two-particle
//! quantities, and the connected vertex) in their Lehmann pole representation.
//!
//! The pipeline mirrors the source's `HilbertSpace -> StatesClassification -> Hamiltonian ->
//! DensityMatrix -> MonomialOperator -> {GreensFunction, Susceptibility, ...}` dependency
//! chain; each stage is its own module below, built on the previous one.
//!
//! ```no_run
//! use num_complex::Complex64;
//! use pomerust::comm::SingleProcessComm;
//! use pomerust::density_matrix::DensityMatrix;
//! use pomerust::hamiltonian::Hamiltonian;
//! use pomerust::hilbert_space::HilbertSpace;
//! use pomerust::presets::hubbard_dimer;
//! use pomerust::states_classification::StatesClassification;
//! use pomerust::thermal::Thermal;
//!
//! let h = hubbard_dimer(2.0, -1.0, 1.0);
//! let mut hs = HilbertSpace::new(16, h.clone()); // 2 sites * 2 spins = 4 modes, dim = 2^4
//! hs.compute().unwrap();
//! let mut sc = StatesClassification::new();
//! sc.compute(&hs).unwrap();
//! let mut ham = Hamiltonian::new();
//! ham.prepare(&sc, &h, 1e-9, &SingleProcessComm).unwrap();
//! ham.compute(&SingleProcessComm).unwrap();
//! let mut dm = DensityMatrix::new();
//! dm.compute(&ham, &Thermal::new(10.0)).unwrap();
//! ```

pub mod comm;
pub mod density_matrix;
pub mod error;
pub mod expression;
pub mod greens_function;
pub mod hamiltonian;
pub mod hilbert_space;
pub mod index_container;
pub mod monomial_operator;
pub mod presets;
pub mod scalar;
pub mod sparse;
pub mod states_classification;
pub mod susceptibility;
pub mod term_list;
pub mod thermal;
pub mod three_point_susceptibility;
pub mod tolerances;
pub mod two_particle_gf;
pub mod vertex4;

pub use error::{EdError, EdResult};
pub use thermal::{Statistics, Status, Thermal};
pub use tolerances::Tolerances;
