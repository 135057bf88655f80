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

//! On-demand caches for correlators indexed by one or two mode-index pairs.
//!
//! Building a [`crate::greens_function::GreensFunction`] or
//! [`crate::two_particle_gf::TwoParticleGf`] is the expensive step; these containers memoize
//! that work per distinct set of mode indices a caller asks for, and for the four-index case
//! additionally exploit the fermionic antisymmetry under `i <-> j` or `k <-> l` exchange so
//! that one computed correlator answers every index tuple equivalent to it up to sign.

use std::cell::RefCell;
use std::collections::HashMap;

/// Caches a value of type `V` per `(i, j)` index pair, computing it lazily on first access.
#[derive(Debug, Default)]
pub struct IndexContainer2<V> {
    cache: RefCell<HashMap<(usize, usize), V>>,
}

impl<V: Clone> IndexContainer2<V> {
    /// An empty cache.
    pub fn new() -> Self {
        IndexContainer2 { cache: RefCell::new(HashMap::new()) }
    }

    /// Returns the cached value for `(i, j)`, computing and storing it via `build` if absent.
    pub fn get_or_compute<F: FnOnce(usize, usize) -> V>(&self, i: usize, j: usize, build: F) -> V {
        if let Some(value) = self.cache.borrow().get(&(i, j)) {
            return value.clone();
        }
        let value = build(i, j);
        self.cache.borrow_mut().insert((i, j), value.clone());
        value
    }

    /// Number of distinct index pairs computed so far.
    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Whether no index pair has been computed yet.
    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }

    /// Drops every cached value.
    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
    }
}

/// Caches a value of type `V` per `(i, j, k, l)` mode-index quadruple, computing it lazily
/// and reusing the result (up to a sign) for every quadruple related by swapping `i <-> j`,
/// `k <-> l`, or both -- the fermionic exchange symmetry of a two-particle correlator.
#[derive(Debug, Default)]
pub struct IndexContainer4<V> {
    cache: RefCell<HashMap<(usize, usize, usize, usize), V>>,
}

impl<V: Clone + std::ops::Neg<Output = V>> IndexContainer4<V> {
    /// An empty cache.
    pub fn new() -> Self {
        IndexContainer4 { cache: RefCell::new(HashMap::new()) }
    }

    /// Returns the value for `(i, j, k, l)`, reusing (with the appropriate sign flip) any of
    /// the three index-swapped equivalents already cached, or computing it fresh via `build`
    /// (called with the canonical, `i <= j` and `k <= l`, ordering).
    pub fn get_or_compute<F: FnOnce(usize, usize, usize, usize) -> V>(
        &self,
        i: usize,
        j: usize,
        k: usize,
        l: usize,
        build: F,
    ) -> V {
        let (ci, cj, sign_ij) = if i <= j { (i, j, 1.0) } else { (j, i, -1.0) };
        let (ck, cl, sign_kl) = if k <= l { (k, l, 1.0) } else { (l, k, -1.0) };

        let value = if let Some(value) = self.cache.borrow().get(&(ci, cj, ck, cl)) {
            value.clone()
        } else {
            let value = build(ci, cj, ck, cl);
            self.cache.borrow_mut().insert((ci, cj, ck, cl), value.clone());
            value
        };

        if sign_ij * sign_kl < 0.0 {
            -value
        } else {
            value
        }
    }

    /// Number of distinct canonical quadruples computed so far (each one answers up to four
    /// equivalent index tuples).
    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Whether no quadruple has been computed yet.
    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }

    /// Drops every cached value.
    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_container2_computes_once_per_pair() {
        let container: IndexContainer2<i32> = IndexContainer2::new();
        let calls = RefCell::new(0);
        let compute = |_i: usize, _j: usize| {
            *calls.borrow_mut() += 1;
            42
        };
        assert_eq!(container.get_or_compute(1, 2, compute), 42);
        assert_eq!(container.get_or_compute(1, 2, compute), 42);
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn index_container4_reuses_swapped_quadruples_with_sign() {
        let container: IndexContainer4<f64> = IndexContainer4::new();
        let calls = RefCell::new(0);
        let compute = |_i: usize, _j: usize, _k: usize, _l: usize| {
            *calls.borrow_mut() += 1;
            7.0
        };
        assert_eq!(container.get_or_compute(1, 2, 3, 4, compute), 7.0);
        // swap i<->j: one transposition, sign flips
        assert_eq!(container.get_or_compute(2, 1, 3, 4, compute), -7.0);
        // swap k<->l: one transposition, sign flips
        assert_eq!(container.get_or_compute(1, 2, 4, 3, compute), -7.0);
        // swap both: two transpositions, sign restored
        assert_eq!(container.get_or_compute(2, 1, 4, 3, compute), 7.0);
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(container.len(), 1);
    }
}
