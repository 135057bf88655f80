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

use std::fmt;

use crate::error::{EdError, EdResult};

/// A single monomial of creation and annihilation operators,
/// `c^dagger_{i1} ... c^dagger_{ip} c_{j1} ... c_{jq}`, in canonical (index-sorted,
/// duplicate-free) form.
///
/// Canonicalization stores only the *normal-ordered* index lists; any sign picked up while
/// bringing a user-supplied product into this order is the caller's responsibility (builders
/// in [`crate::expression::builders`] only ever construct already-ordered monomials of degree
/// one or two, so no reordering sign ever needs to be tracked there).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FermionProduct {
    /// Slots (see [`crate::expression::IndexMap`]) of the creation operators, ascending.
    pub creators: Vec<usize>,
    /// Slots of the annihilation operators, ascending.
    pub annihilators: Vec<usize>,
}

impl FermionProduct {
    /// Builds a product from creator/annihilator slot lists, checking that each list is
    /// strictly ascending and duplicate-free.
    pub fn new(
        creators: impl IntoIterator<Item = usize>,
        annihilators: impl IntoIterator<Item = usize>,
    ) -> EdResult<Self> {
        let creators: Vec<usize> = creators.into_iter().collect();
        let annihilators: Vec<usize> = annihilators.into_iter().collect();
        Self::check_ordered(&creators)?;
        Self::check_ordered(&annihilators)?;
        Ok(FermionProduct {
            creators,
            annihilators,
        })
    }

    fn check_ordered(slots: &[usize]) -> EdResult<()> {
        for pair in slots.windows(2) {
            if pair[0] >= pair[1] {
                return Err(EdError::ConstructionError(format!(
                    "indices must be strictly ascending and free of duplicates, got {:?}",
                    slots
                )));
            }
        }
        Ok(())
    }

    /// Total number of elementary operators in this monomial.
    pub fn degree(&self) -> usize {
        self.creators.len() + self.annihilators.len()
    }
}

impl fmt::Display for FermionProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.creators {
            write!(f, "c{}^+ ", c)?;
        }
        for a in &self.annihilators {
            write!(f, "c{} ", a)?;
        }
        Ok(())
    }
}
