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

//! A deduplicating aggregator for Lehmann-representation terms.
//!
//! Every correlator (Green's function, susceptibility, two-particle quantities) is, at its
//! core, a sum of simple rational terms sharing the same pole structure with different
//! residue weights. `TermList<T>` merges terms whose poles coincide (within the aggregator's
//! own negligibility policy) instead of keeping one entry per contributing eigenstate pair,
//! which is what keeps the term count bounded as the Hilbert space grows.

use crate::comm::{BroadcastElement, Communicator};

/// A pole/residue term contributed to a correlator.
pub trait Term: Clone {
    /// The value this term evaluates to at `args` (frequencies, or an imaginary time).
    type Args;
    /// The evaluated scalar type.
    type Value: std::ops::AddAssign + Default;

    /// Merges `other` into `self`, assuming the caller has already verified they share a key.
    fn merge(&mut self, other: &Self);

    /// Whether this term's weight has decayed below `tol` and can be dropped.
    fn is_negligible(&self, tol: f64) -> bool;

    /// Evaluates this single term's contribution.
    fn evaluate(&self, args: &Self::Args) -> Self::Value;
}

/// Deduplicating, tolerance-pruning collection of [`Term`]s, keyed by `K`.
///
/// `K` plays the role of the term's "pole signature" (e.g. a tuple of rounded energy
/// differences); two terms with equal keys are merged via [`Term::merge`] rather than stored
/// separately. The effective negligibility tolerance passed to `is_negligible` scales down as
/// the list grows (`term_negligible / (len + 1)`), mirroring the source's running-count
/// normalization so that a correlator built from many small contributions doesn't silently
/// accumulate a large aggregate error from individually-negligible terms.
#[derive(Debug, Clone)]
pub struct TermList<K, T> {
    entries: Vec<(K, T)>,
}

impl<K: PartialEq + Clone, T: Term> TermList<K, T> {
    /// An empty term list.
    pub fn new() -> Self {
        TermList { entries: Vec::new() }
    }

    /// Adds `term` keyed by `key`, merging into an existing entry with an equal key if one
    /// exists.
    pub fn add_term(&mut self, key: K, term: T) {
        if let Some((_, existing)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            existing.merge(&term);
        } else {
            self.entries.push((key, term));
        }
    }

    /// Drops every term whose weight is negligible at the scaled tolerance
    /// `base_tol / (len + 1)`.
    pub fn prune(&mut self, base_tol: f64) {
        let scale = self.entries.len() as f64 + 1.0;
        let tol = base_tol / scale;
        self.entries.retain(|(_, term)| !term.is_negligible(tol));
    }

    /// Number of distinct (post-merge) terms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list holds no terms.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the stored `(key, term)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = &(K, T)> {
        self.entries.iter()
    }

    /// Sums every term's contribution at `args`.
    pub fn evaluate(&self, args: &T::Args) -> T::Value {
        let mut total = T::Value::default();
        for (_, term) in &self.entries {
            total += term.evaluate(args);
        }
        total
    }
}

impl<K: PartialEq + Clone, T: Term> Default for TermList<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: BroadcastElement, T: BroadcastElement> TermList<K, T> {
    /// Broadcasts this term list's raw entries from `root` to every rank. Each rank ends up
    /// with an identical (unmerged, unpruned) copy; call [`TermList::prune`] afterwards if
    /// the receivers need a deduplicated view.
    pub fn broadcast<C: Communicator>(&mut self, comm: &C, root: usize) {
        let mut keys: Vec<K> = self.entries.iter().map(|(k, _)| k.clone()).collect();
        let mut terms: Vec<T> = self.entries.iter().map(|(_, t)| t.clone()).collect();
        comm.broadcast_vec(&mut keys, root);
        comm.broadcast_vec(&mut terms, root);
        self.entries = keys.into_iter().zip(terms).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Weighted(f64);

    impl Term for Weighted {
        type Args = ();
        type Value = f64;

        fn merge(&mut self, other: &Self) {
            self.0 += other.0;
        }

        fn is_negligible(&self, tol: f64) -> bool {
            self.0.abs() <= tol
        }

        fn evaluate(&self, _args: &()) -> f64 {
            self.0
        }
    }

    #[test]
    fn terms_sharing_a_key_are_merged_not_duplicated() {
        let mut list: TermList<i64, Weighted> = TermList::new();
        list.add_term(0, Weighted(1.0));
        list.add_term(0, Weighted(2.0));
        list.add_term(1, Weighted(3.0));
        assert_eq!(list.len(), 2);
        assert_eq!(list.evaluate(&()), 6.0);
    }

    #[test]
    fn prune_drops_negligible_terms_scaled_by_list_size() {
        let mut list: TermList<i64, Weighted> = TermList::new();
        list.add_term(0, Weighted(1e-9));
        list.add_term(1, Weighted(1.0));
        list.prune(1e-6);
        assert_eq!(list.len(), 1);
        assert_eq!(list.iter().next().unwrap().0, 1);
    }
}
