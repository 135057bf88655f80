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

//! Ready-made single-orbital lattice Hamiltonians, for quickly standing up a model instead of
//! building it term by term.
//!
//! Every site carries two modes, spin up (`spin = 0`) and spin down (`spin = 1`), flattened
//! into a single index space via [`mode`]. Hopping and hybridization terms are added together
//! with their Hermitian conjugate so the resulting operator is Hermitian whenever the supplied
//! amplitudes are real, which all four presets assume.

use num_complex::Complex64;

use crate::expression::fermion_product::FermionProduct;
use crate::expression::operator::PolynomialOperator;

/// Flattens a `(site, spin)` pair into a single mode index, `spin = 0` for up and `spin = 1`
/// for down.
pub fn mode(site: usize, spin: usize) -> usize {
    2 * site + spin
}

fn add_level(op: &mut PolynomialOperator<Complex64>, i: usize, value: f64) {
    if value == 0.0 {
        return;
    }
    op.add_term(FermionProduct::new([i], [i]).expect("single-mode product is ordered"), Complex64::new(value, 0.0));
}

fn add_hopping(op: &mut PolynomialOperator<Complex64>, i: usize, j: usize, t: f64) {
    if i == j || t == 0.0 {
        return;
    }
    op.add_term(FermionProduct::new([i], [j]).expect("single-mode product is ordered"), Complex64::new(t, 0.0));
    op.add_term(FermionProduct::new([j], [i]).expect("single-mode product is ordered"), Complex64::new(t, 0.0));
}

/// Adds `U * n_i * n_j` for `i != j`, normal-ordered as
/// `-U * c^dagger_min c^dagger_max c_min c_max`.
fn add_density_density(op: &mut PolynomialOperator<Complex64>, i: usize, j: usize, u: f64) {
    if i == j || u == 0.0 {
        return;
    }
    let (lo, hi) = if i < j { (i, j) } else { (j, i) };
    op.add_term(
        FermionProduct::new([lo, hi], [lo, hi]).expect("ascending indices are ordered"),
        Complex64::new(-u, 0.0),
    );
}

/// A ring of `levels.len()` single-orbital sites, each with an on-site Hubbard `U` and a
/// nearest-neighbor hopping to the next site (wrapping around), matching the four-site chain
/// of the source's regression tests.
///
/// `hoppings[k]` is the amplitude between site `k` and site `(k + 1) % levels.len()`.
/// `hoppings` and `hubbard_u` must have the same length as `levels`.
pub fn bath_chain(levels: &[f64], hoppings: &[f64], hubbard_u: &[f64]) -> PolynomialOperator<Complex64> {
    let n = levels.len();
    assert_eq!(hoppings.len(), n, "bath_chain: hoppings must match levels in length");
    assert_eq!(hubbard_u.len(), n, "bath_chain: hubbard_u must match levels in length");

    let mut op = PolynomialOperator::new();
    for site in 0..n {
        let up = mode(site, 0);
        let down = mode(site, 1);
        add_level(&mut op, up, levels[site]);
        add_level(&mut op, down, levels[site]);
        add_density_density(&mut op, up, down, hubbard_u[site]);

        let next = (site + 1) % n;
        add_hopping(&mut op, up, mode(next, 0), hoppings[site]);
        add_hopping(&mut op, down, mode(next, 1), hoppings[site]);
    }
    op
}

/// A single-orbital Anderson impurity (site 0) coupled to `bath_levels.len()` bath sites
/// (sites `1..=bath_levels.len()`), with impurity interaction `u` and chemical potential `mu`.
///
/// `hybridizations[k]` couples the impurity to bath site `k + 1`. `hybridizations` must have
/// the same length as `bath_levels`.
pub fn anderson_impurity(u: f64, mu: f64, bath_levels: &[f64], hybridizations: &[f64]) -> PolynomialOperator<Complex64> {
    assert_eq!(
        hybridizations.len(),
        bath_levels.len(),
        "anderson_impurity: hybridizations must match bath_levels in length"
    );

    let mut op = PolynomialOperator::new();
    let imp_up = mode(0, 0);
    let imp_down = mode(0, 1);
    add_level(&mut op, imp_up, -mu);
    add_level(&mut op, imp_down, -mu);
    add_density_density(&mut op, imp_up, imp_down, u);

    for (k, &level) in bath_levels.iter().enumerate() {
        let bath_site = k + 1;
        let bath_up = mode(bath_site, 0);
        let bath_down = mode(bath_site, 1);
        add_level(&mut op, bath_up, level);
        add_level(&mut op, bath_down, level);
        add_hopping(&mut op, imp_up, bath_up, hybridizations[k]);
        add_hopping(&mut op, imp_down, bath_down, hybridizations[k]);
    }
    op
}

/// A single isolated Hubbard site: `U n_up n_down - mu (n_up + n_down)`.
pub fn hubbard_atom(u: f64, mu: f64) -> PolynomialOperator<Complex64> {
    let mut op = PolynomialOperator::new();
    let up = mode(0, 0);
    let down = mode(0, 1);
    add_level(&mut op, up, -mu);
    add_level(&mut op, down, -mu);
    add_density_density(&mut op, up, down, u);
    op
}

/// Two Hubbard sites connected by a spin-preserving hopping `t`, each with interaction `u`
/// and chemical potential `mu`.
pub fn hubbard_dimer(u: f64, t: f64, mu: f64) -> PolynomialOperator<Complex64> {
    let mut op = PolynomialOperator::new();
    for site in 0..2 {
        let up = mode(site, 0);
        let down = mode(site, 1);
        add_level(&mut op, up, -mu);
        add_level(&mut op, down, -mu);
        add_density_density(&mut op, up, down, u);
    }
    add_hopping(&mut op, mode(0, 0), mode(1, 0), t);
    add_hopping(&mut op, mode(0, 1), mode(1, 1), t);
    op
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hubbard_atom_has_two_terms_at_half_filling() {
        let op = hubbard_atom(1.0, 0.5);
        // Two level terms (up, down) plus one density-density term.
        assert_eq!(op.len(), 3);
    }

    #[test]
    fn bath_chain_matches_s1_term_count() {
        let levels = [-0.5, -1.1, -0.7, -1.1];
        let hoppings = [-1.3, -0.45, -0.127, -0.255];
        let hubbard_u = [1.0, 2.0, 3.0, 4.0];
        let op = bath_chain(&levels, &hoppings, &hubbard_u);
        // 4 sites * (2 levels + 1 density-density) + 4 bonds * 2 spins * 2 (term + conjugate).
        assert_eq!(op.len(), 4 * 3 + 4 * 2 * 2);
    }

    #[test]
    fn hubbard_dimer_is_symmetric_under_site_exchange() {
        let op = hubbard_dimer(2.0, -1.0, 1.0);
        assert_eq!(op.len(), 2 * 3 + 2 * 2);
    }
}
