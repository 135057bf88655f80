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

//! A small sparse-matrix type in compressed-outer-index form.
//!
//! The correlator assembly traverses operator matrices along one of its two natural
//! orderings (rows of one factor, columns of another) while chasing a second, independently
//! sorted sequence of inner indices. `Sparse` stores exactly what's needed for that: a list
//! of outer slices, each a sorted-by-inner-index list of `(inner, value)` pairs. The same
//! type serves as both the row-major and the column-major view of a `MonomialOperatorPart`
//! block (the two are transposes of one another; see [`Sparse::transpose`]).

use num_complex::Complex64;

/// A sparse matrix stored as a list of outer slices, each a list of `(inner_index, value)`
/// pairs sorted ascending by `inner_index`.
#[derive(Debug, Clone)]
pub struct Sparse {
    nrows: usize,
    ncols: usize,
    /// `outer[k]` holds a row (if this is a row-major matrix) or column (if column-major).
    outer: Vec<Vec<(usize, Complex64)>>,
}

impl Sparse {
    /// Builds a row-major sparse matrix with `nrows` rows and `ncols` columns from triplets,
    /// dropping entries with `|value| <= tol`.
    pub fn from_row_triplets(
        nrows: usize,
        ncols: usize,
        triplets: impl IntoIterator<Item = (usize, usize, Complex64)>,
        tol: f64,
    ) -> Self {
        let mut outer = vec![Vec::new(); nrows];
        for (r, c, v) in triplets {
            if v.norm() > tol {
                outer[r].push((c, v));
            }
        }
        for row in &mut outer {
            row.sort_by_key(|(c, _)| *c);
        }
        Sparse { nrows, ncols, outer }
    }

    /// Builds a column-major sparse matrix with `nrows` rows and `ncols` columns from
    /// triplets, dropping entries with `|value| <= tol`.
    pub fn from_col_triplets(
        nrows: usize,
        ncols: usize,
        triplets: impl IntoIterator<Item = (usize, usize, Complex64)>,
        tol: f64,
    ) -> Self {
        let mut outer = vec![Vec::new(); ncols];
        for (r, c, v) in triplets {
            if v.norm() > tol {
                outer[c].push((r, v));
            }
        }
        for col in &mut outer {
            col.sort_by_key(|(r, _)| *r);
        }
        Sparse { nrows, ncols, outer }
    }

    /// Number of outer slices (rows if row-major, columns if column-major).
    pub fn outer_size(&self) -> usize {
        self.outer.len()
    }

    /// Shape `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// The sorted `(inner_index, value)` pairs of the `k`-th outer slice.
    pub fn outer_slice(&self, k: usize) -> &[(usize, Complex64)] {
        &self.outer[k]
    }

    /// Transposes this matrix, turning a row-major view into a column-major one and vice
    /// versa, with the same nonzero pattern.
    pub fn transpose(&self) -> Sparse {
        let new_len = if self.outer.len() == self.ncols {
            self.nrows
        } else {
            self.ncols
        };
        let mut new_outer: Vec<Vec<(usize, Complex64)>> = vec![Vec::new(); new_len];
        for (k, slice) in self.outer.iter().enumerate() {
            for &(inner, value) in slice {
                new_outer[inner].push((k, value));
            }
        }
        for slice in &mut new_outer {
            slice.sort_by_key(|(idx, _)| *idx);
        }
        Sparse {
            nrows: self.ncols,
            ncols: self.nrows,
            outer: new_outer,
        }
    }

    /// Element-wise conjugate, preserving layout.
    pub fn conjugate(&self) -> Sparse {
        Sparse {
            nrows: self.nrows,
            ncols: self.ncols,
            outer: self
                .outer
                .iter()
                .map(|slice| slice.iter().map(|&(i, v)| (i, v.conj())).collect())
                .collect(),
        }
    }

    /// Adjoint (conjugate transpose).
    pub fn adjoint(&self) -> Sparse {
        self.transpose().conjugate()
    }

    /// Reuses this matrix's outer/inner layout verbatim, just relabeling its shape to
    /// `new_nrows x new_ncols` and conjugating every entry.
    ///
    /// This is the monomial-operator adjoint shortcut of §4.4: if `self` is the column-major
    /// view of `M: R -> L`, its outer slices are already grouped by `R`-index with `L`-index
    /// entries — exactly the row-major layout `M^dagger: L -> R` needs, once conjugated. No
    /// data movement beyond the conjugation is required.
    pub fn relabel_conjugate(&self, new_nrows: usize, new_ncols: usize) -> Sparse {
        Sparse {
            nrows: new_nrows,
            ncols: new_ncols,
            outer: self
                .outer
                .iter()
                .map(|slice| slice.iter().map(|&(i, v)| (i, v.conj())).collect())
                .collect(),
        }
    }
}

/// Advances `lhs`/`rhs` pointers, each over a sequence that is sorted ascending, until they
/// point at the same value or one sequence is exhausted.
///
/// Mirrors the source's `chaseIndices`: the two cursors represent the current inner index of
/// two independently-iterated sparse slices; this returns `true` (cursors synchronized) or
/// `false` (one side exhausted, caller should stop).
pub fn chase_indices(lhs: &[(usize, Complex64)], rhs: &[(usize, Complex64)]) -> (usize, usize) {
    let mut i = 0;
    let mut j = 0;
    while i < lhs.len() && j < rhs.len() {
        match lhs[i].0.cmp(&rhs[j].0) {
            std::cmp::Ordering::Equal => break,
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }
    (i, j)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transpose_round_trips() {
        let m = Sparse::from_row_triplets(
            2,
            3,
            [
                (0, 1, Complex64::new(1.0, 0.0)),
                (1, 2, Complex64::new(2.0, 0.0)),
            ],
            1e-12,
        );
        let t = m.transpose();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t.outer_slice(1), &[(0, Complex64::new(1.0, 0.0))]);
        assert_eq!(t.outer_slice(2), &[(1, Complex64::new(2.0, 0.0))]);
    }

    #[test]
    fn chase_indices_finds_common_inner_index() {
        let lhs = vec![(0, Complex64::new(1.0, 0.0)), (3, Complex64::new(1.0, 0.0))];
        let rhs = vec![(1, Complex64::new(1.0, 0.0)), (3, Complex64::new(1.0, 0.0))];
        let (i, j) = chase_indices(&lhs, &rhs);
        assert_eq!(lhs[i].0, 3);
        assert_eq!(rhs[j].0, 3);
    }
}
