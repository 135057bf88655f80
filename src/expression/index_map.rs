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

use indexmap::IndexSet;

use crate::error::{EdError, EdResult};

/// Index of a single-particle degree of freedom.
pub type ParticleIndex = usize;

/// A basis state of the many-body Fock space, encoded as an integer bit pattern (bit `i`
/// set means mode `i` is occupied).
pub type QuantumState = u64;

/// Bijection between opaque single-particle labels and a contiguous range `[0, N)`.
///
/// Callers that compose a label out of several quantum numbers (site, spin, orbital, ...)
/// are expected to flatten it into a single `usize` before handing it to `IndexMap`; this
/// crate carries no orbital/spin symbol layer of its own, mirroring the fact that the
/// expression algebra is treated as an external collaborator.
#[derive(Debug, Clone, Default)]
pub struct IndexMap {
    indices: IndexSet<ParticleIndex>,
}

impl IndexMap {
    /// Creates an empty index map.
    pub fn new() -> Self {
        IndexMap {
            indices: IndexSet::new(),
        }
    }

    /// Registers `index`, assigning it the next contiguous slot if it has not been seen
    /// before. Returns the slot.
    pub fn insert(&mut self, index: ParticleIndex) -> usize {
        self.indices.insert_full(index).0
    }

    /// Number of distinct single-particle indices registered so far.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether no index has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Maps a registered single-particle label to its contiguous slot.
    pub fn slot_of(&self, index: ParticleIndex) -> EdResult<usize> {
        self.indices
            .get_index_of(&index)
            .ok_or(EdError::OutOfRange {
                what: "particle index",
                index: index as i64,
            })
    }

    /// Maps a contiguous slot back to the single-particle label it was registered under.
    pub fn index_of_slot(&self, slot: usize) -> EdResult<ParticleIndex> {
        self.indices.get_index(slot).copied().ok_or(EdError::OutOfRange {
            what: "particle slot",
            index: slot as i64,
        })
    }

    /// Dimension of the full Fock space spanned by the registered modes (`2^n`).
    pub fn full_dimension(&self) -> QuantumState {
        1u64 << self.len()
    }
}
