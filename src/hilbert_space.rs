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

//! Partitioning of the full Fock space into the invariant subspaces (blocks) of a
//! Hamiltonian.
//!
//! `compute()` runs in two refinement phases. Phase I starts from the singleton partition
//! `{ {s} : s in states }` and greedily merges any two parts connected by a nonzero matrix
//! element of the Hamiltonian. Phase II additionally merges, for every elementary
//! creation/annihilation operator handed to [`HilbertSpace::refine_with`], any parts whose
//! images under that operator would otherwise straddle more than one part — this is what
//! guarantees later that every `MonomialOperatorPart` connects exactly one (block, block)
//! pair per operator.

use crate::error::{EdError, EdResult};
use crate::expression::{LinearOperator, QuantumState};
use crate::thermal::Status;

/// Disjoint-set (union-find) partition of `0..dim` used internally by [`HilbertSpace`].
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        UnionFind {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

/// Owns the full Fock space dimension and, after [`HilbertSpace::compute`], the partition of
/// its basis states into invariant subspaces.
pub struct HilbertSpace<H: LinearOperator<Scalar = num_complex::Complex64>> {
    dim: QuantumState,
    hamiltonian: H,
    refining_operators: Vec<Box<dyn LinearOperator<Scalar = num_complex::Complex64>>>,
    partition: Option<Vec<usize>>,
    status: Status,
}

impl<H: LinearOperator<Scalar = num_complex::Complex64>> HilbertSpace<H> {
    /// Creates a Hilbert space of dimension `dim` (number of Fock states, i.e. `2^n_modes`)
    /// carrying the given Hamiltonian linear operator.
    pub fn new(dim: QuantumState, hamiltonian: H) -> Self {
        HilbertSpace {
            dim,
            hamiltonian,
            refining_operators: Vec::new(),
            partition: None,
            status: Status::Constructed,
        }
    }

    /// Registers an elementary fermionic creation/annihilation operator to be used in Phase
    /// II of [`compute`](Self::compute). Must be called before `compute()`.
    pub fn refine_with(&mut self, op: Box<dyn LinearOperator<Scalar = num_complex::Complex64>>) {
        self.refining_operators.push(op);
    }

    /// Full Fock space dimension.
    pub fn dim(&self) -> QuantumState {
        self.dim
    }

    /// Partitions the full Hilbert space into invariant subspaces. Phase I merges states
    /// connected by a nonzero matrix element of the Hamiltonian; Phase II merges, for each
    /// registered refining operator, any two target blocks that a single source block would
    /// otherwise map into (preserving the single-image property required of monomial
    /// operators downstream).
    pub fn compute(&mut self) -> EdResult<()> {
        if self.status == Status::Computed {
            return Ok(());
        }
        let n = self.dim as usize;
        let mut uf = UnionFind::new(n);

        for state in 0..self.dim {
            for (image, _) in self.hamiltonian.apply(state) {
                uf.union(state as usize, image as usize);
            }
        }

        loop {
            let mut merged_any = false;
            for op in &self.refining_operators {
                // For every source block, collect the set of distinct target blocks its
                // states are mapped into; more than one means those targets must merge.
                let mut block_targets: std::collections::HashMap<usize, usize> =
                    std::collections::HashMap::new();
                for state in 0..self.dim {
                    let source_block = uf.find(state as usize);
                    for (image, _) in op.apply(state) {
                        let target_block = uf.find(image as usize);
                        match block_targets.get(&source_block) {
                            Some(&existing) if existing != target_block => {
                                uf.union(existing, target_block);
                                merged_any = true;
                            }
                            _ => {
                                block_targets.insert(source_block, target_block);
                            }
                        }
                    }
                }
            }
            if !merged_any {
                break;
            }
        }

        let partition: Vec<usize> = (0..n).map(|s| uf.find(s)).collect();
        self.partition = Some(partition);
        self.status = Status::Computed;
        Ok(())
    }

    /// Read-only access to the computed partition: `partition()[state]` is an arbitrary but
    /// stable representative of the block `state` belongs to (not renumbered to `0..n_blocks`
    /// — see [`crate::states_classification::StatesClassification::compute`] for that).
    pub fn partition(&self) -> EdResult<&[usize]> {
        self.partition.as_deref().ok_or(EdError::StatusMismatch {
            expected: Status::Computed,
            found: self.status,
            op: "HilbertSpace::partition",
        })
    }

    /// Lifecycle status.
    pub fn status(&self) -> Status {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::builders::{annihilation_operator, creation_operator, quadratic_operator};
    use crate::expression::operator::PolynomialOperator;
    use num_complex::Complex64;

    fn two_site_hopping() -> PolynomialOperator<Complex64> {
        let mut h = quadratic_operator(0, 1);
        h.add_term(
            crate::expression::FermionProduct::new([1], [0]).unwrap(),
            Complex64::new(1.0, 0.0),
        );
        h
    }

    #[test]
    fn hopping_hamiltonian_has_four_blocks_by_particle_number() {
        let h = two_site_hopping();
        let mut hs = HilbertSpace::new(4, h);
        hs.compute().unwrap();
        let partition = hs.partition().unwrap();
        // |00> and |11> are fixed points (particle number 0 and 2); |01> <-> |10> mix.
        assert_eq!(partition[0], partition[0]);
        assert_ne!(partition[0b00], partition[0b11]);
        assert_eq!(
            {
                let p = partition.to_vec();
                p[0b01] == p[0b10]
            },
            true
        );
    }

    #[test]
    fn refinement_merges_blocks_split_by_elementary_operators() {
        let h = two_site_hopping();
        let mut hs = HilbertSpace::new(4, h);
        hs.refine_with(Box::new(creation_operator(0)));
        hs.refine_with(Box::new(annihilation_operator(0)));
        hs.refine_with(Box::new(creation_operator(1)));
        hs.refine_with(Box::new(annihilation_operator(1)));
        hs.compute().unwrap();
        let partition = hs.partition().unwrap();
        // With refinement by both elementary operators, particle-number-conserving hopping
        // still keeps 0- and 2-particle sectors apart from the mixed 1-particle sector.
        assert_ne!(partition[0b00], partition[0b11]);
    }
}
