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

//! Renumbers a [`HilbertSpace`](crate::hilbert_space::HilbertSpace) partition into contiguous
//! block numbers and keeps the two bookkeeping tables every downstream component needs: the
//! list of Fock states spanning each block, and the reverse state -> block map.

use std::collections::HashMap;

use crate::error::{EdError, EdResult};
use crate::expression::{LinearOperator, QuantumState};
use crate::hilbert_space::HilbertSpace;
use crate::thermal::Status;

/// Index of an invariant subspace (block) within the full Hilbert space.
pub type BlockNumber = i64;

/// Sentinel for "no such block", used as an absent edge in block-to-block maps.
pub const INVALID_BLOCK_NUMBER: BlockNumber = -1;

/// Index of a state inside its block.
pub type InnerQuantumState = usize;

/// Classification of Fock states into the bases of the invariant subspaces of a Hamiltonian.
#[derive(Debug, Default)]
pub struct StatesClassification {
    states: Vec<Vec<QuantumState>>,
    state_block_index: Vec<BlockNumber>,
    status: Status,
}

impl StatesClassification {
    /// Creates an empty classification (use [`compute`](Self::compute) to populate it).
    pub fn new() -> Self {
        StatesClassification {
            states: Vec::new(),
            state_block_index: Vec::new(),
            status: Status::Constructed,
        }
    }

    /// Populates the Fock-state lists from a computed [`HilbertSpace`]. If the Hilbert space
    /// has not been computed, a single block spanning the whole space is assumed.
    pub fn compute<H: LinearOperator<Scalar = num_complex::Complex64>>(
        &mut self,
        hs: &HilbertSpace<H>,
    ) -> EdResult<()> {
        if self.status == Status::Computed {
            return Ok(());
        }
        let dim = hs.dim() as usize;
        if hs.status() == Status::Computed {
            let partition = hs.partition()?;
            let mut block_of_representative: HashMap<usize, BlockNumber> = HashMap::new();
            self.state_block_index = vec![INVALID_BLOCK_NUMBER; dim];
            for state in 0..dim {
                let representative = partition[state];
                let block = match block_of_representative.get(&representative) {
                    Some(&b) => b,
                    None => {
                        self.states.push(Vec::new());
                        let b = self.states.len() as BlockNumber - 1;
                        block_of_representative.insert(representative, b);
                        b
                    }
                };
                self.state_block_index[state] = block;
                self.states[block as usize].push(state as QuantumState);
            }
        } else {
            self.state_block_index = vec![0; dim];
            self.states = vec![(0..dim as QuantumState).collect()];
        }
        self.status = Status::Computed;
        Ok(())
    }

    /// Total number of Fock states.
    pub fn number_of_states(&self) -> usize {
        self.state_block_index.len()
    }

    /// Number of invariant subspaces.
    pub fn number_of_blocks(&self) -> usize {
        self.states.len()
    }

    /// Number of Fock states spanning block `block`.
    pub fn block_size(&self, block: BlockNumber) -> EdResult<usize> {
        self.fock_states(block).map(<[_]>::len)
    }

    /// All Fock states spanning `block`, in the order they were discovered.
    pub fn fock_states(&self, block: BlockNumber) -> EdResult<&[QuantumState]> {
        if block < 0 || block as usize >= self.states.len() {
            return Err(EdError::OutOfRange {
                what: "block number",
                index: block,
            });
        }
        Ok(&self.states[block as usize])
    }

    /// The `i`-th Fock state of `block`.
    pub fn fock_state(&self, block: BlockNumber, i: InnerQuantumState) -> EdResult<QuantumState> {
        self.fock_states(block)?
            .get(i)
            .copied()
            .ok_or(EdError::OutOfRange {
                what: "inner quantum state",
                index: i as i64,
            })
    }

    /// The block a given Fock state belongs to.
    pub fn block_number(&self, state: QuantumState) -> EdResult<BlockNumber> {
        self.state_block_index
            .get(state as usize)
            .copied()
            .ok_or(EdError::OutOfRange {
                what: "Fock state",
                index: state as i64,
            })
    }

    /// The index of a Fock state within the block it belongs to.
    pub fn inner_state(&self, state: QuantumState) -> EdResult<InnerQuantumState> {
        let block = self.block_number(state)?;
        self.fock_states(block)?
            .iter()
            .position(|&s| s == state)
            .ok_or(EdError::OutOfRange {
                what: "Fock state",
                index: state as i64,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_state_maps_back_into_its_own_block() {
        use crate::expression::builders::quadratic_operator;
        let h = quadratic_operator(0, 1);
        let mut hs = HilbertSpace::new(4, h);
        hs.compute().unwrap();
        let mut sc = StatesClassification::new();
        sc.compute(&hs).unwrap();
        for block in 0..sc.number_of_blocks() as BlockNumber {
            for i in 0..sc.block_size(block).unwrap() {
                let state = sc.fock_state(block, i).unwrap();
                assert_eq!(sc.block_number(state).unwrap(), block);
                assert_eq!(sc.inner_state(state).unwrap(), i);
            }
        }
    }
}
