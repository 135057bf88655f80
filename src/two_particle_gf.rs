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

//! The two-particle Green's function `<T c_i(tau1) c_j(tau2) c^dagger_k(tau3) c^dagger_l(0)>`,
//! assembled as a sum over the six permutations of `{c_i, c_j, c^dagger_k}` that close a
//! four-block Lehmann loop with `c^dagger_l`.

use num_complex::Complex64;

use crate::density_matrix::DensityMatrix;
use crate::error::EdResult;
use crate::hamiltonian::Hamiltonian;
use crate::monomial_operator::MonomialOperator;
use crate::term_list::{Term, TermList};
use crate::thermal::Thermal;
use crate::tolerances::Tolerances;

fn bucket(x: f64, tol: f64) -> i64 {
    (x / tol).round() as i64
}

/// One of the six orderings of `{c_i, c_j, c^dagger_k}` contributing to the time-ordered
/// correlator, carrying the sign of the corresponding fermionic permutation.
#[derive(Debug, Clone, Copy)]
pub struct Permutation3 {
    pub order: [usize; 3],
    pub sign: f64,
}

impl Permutation3 {
    /// All six permutations of three elements with their parity sign.
    pub fn all() -> [Permutation3; 6] {
        [
            Permutation3 { order: [0, 1, 2], sign: 1.0 },
            Permutation3 { order: [0, 2, 1], sign: -1.0 },
            Permutation3 { order: [1, 0, 2], sign: -1.0 },
            Permutation3 { order: [1, 2, 0], sign: 1.0 },
            Permutation3 { order: [2, 0, 1], sign: 1.0 },
            Permutation3 { order: [2, 1, 0], sign: -1.0 },
        ]
    }

    fn permute(self, freqs: [Complex64; 3]) -> (Complex64, Complex64, Complex64) {
        (freqs[self.order[0]], freqs[self.order[1]], freqs[self.order[2]])
    }
}

/// Arguments passed to every two-particle term: three independent frequencies and the
/// resonance tolerance the resonant flavor needs.
#[derive(Debug, Clone, Copy)]
pub struct TwoParticleArgs {
    pub z1: Complex64,
    pub z2: Complex64,
    pub z3: Complex64,
    pub resonance_tol: f64,
}

/// `is_z4 ? C/((z1-P0)(z1+z2+z3-P0-P1-P2)(z3-P2)) : C/((z1-P0)(z2-P1)(z3-P2))`.
#[derive(Debug, Clone, Copy)]
pub struct NonResonantTerm {
    coeff: Complex64,
    poles: [f64; 3],
    is_z4: bool,
    weight: u64,
}

impl Term for NonResonantTerm {
    type Args = TwoParticleArgs;
    type Value = Complex64;

    fn merge(&mut self, other: &Self) {
        self.coeff += other.coeff;
        let total = self.weight + other.weight;
        for i in 0..3 {
            self.poles[i] = (self.poles[i] * self.weight as f64 + other.poles[i] * other.weight as f64) / total as f64;
        }
        self.weight = total;
    }

    fn is_negligible(&self, tol: f64) -> bool {
        self.coeff.norm() <= tol
    }

    fn evaluate(&self, args: &TwoParticleArgs) -> Complex64 {
        let [p0, p1, p2] = self.poles;
        if self.is_z4 {
            self.coeff
                / ((args.z1 - p0) * (args.z1 + args.z2 + args.z3 - p0 - p1 - p2) * (args.z3 - p2))
        } else {
            self.coeff / ((args.z1 - p0) * (args.z2 - p1) * (args.z3 - p2))
        }
    }
}

/// The resonant flavor, switching between a resonant and non-resonant form depending on
/// whether `z1 + z2 - P0 - P1` (or `z2 + z3 - P1 - P2`) falls within `resonance_tol` of zero.
#[derive(Debug, Clone, Copy)]
pub struct ResonantTerm {
    res_coeff: Complex64,
    non_res_coeff: Complex64,
    poles: [f64; 3],
    is_z1z2: bool,
    weight: u64,
}

impl Term for ResonantTerm {
    type Args = TwoParticleArgs;
    type Value = Complex64;

    fn merge(&mut self, other: &Self) {
        self.res_coeff += other.res_coeff;
        self.non_res_coeff += other.non_res_coeff;
        let total = self.weight + other.weight;
        for i in 0..3 {
            self.poles[i] = (self.poles[i] * self.weight as f64 + other.poles[i] * other.weight as f64) / total as f64;
        }
        self.weight = total;
    }

    fn is_negligible(&self, tol: f64) -> bool {
        self.res_coeff.norm() <= tol && self.non_res_coeff.norm() <= tol
    }

    fn evaluate(&self, args: &TwoParticleArgs) -> Complex64 {
        let [p0, p1, p2] = self.poles;
        let diff = if self.is_z1z2 {
            args.z1 + args.z2 - p0 - p1
        } else {
            args.z2 + args.z3 - p1 - p2
        };
        let base = (args.z1 - p0) * (args.z3 - p2);
        if diff.norm() < args.resonance_tol {
            self.res_coeff / base
        } else {
            self.non_res_coeff / (diff * base)
        }
    }
}

/// The two-particle Green's function for a fixed operator quadruple, summed over all six
/// fermionic orderings.
///
/// One `(non_resonant, resonant)` term-list pair is kept per entry of [`Permutation3::all`],
/// mirroring the source's one-`TwoParticleGFPart`-per-permutation layout: each permutation's
/// terms are built from its own reordering of `(E1,E2,E3,E4)` and must be evaluated with the
/// matching reordering of `(z1,z2,z3)`, so they cannot share a single merged term list.
#[derive(Debug, Clone, Default)]
pub struct TwoParticleGf {
    non_resonant: [TermList<(i64, i64, i64, bool), NonResonantTerm>; 6],
    resonant: [TermList<(i64, i64, i64, bool), ResonantTerm>; 6],
}

impl TwoParticleGf {
    /// An empty two-particle Green's function.
    pub fn new() -> Self {
        TwoParticleGf {
            non_resonant: Default::default(),
            resonant: Default::default(),
        }
    }

    /// Assembles every term of the `(c_i, c_j, c^dagger_k, c^dagger_l)` Lehmann loop, one
    /// term-list pair per permutation of the first three operators.
    #[allow(clippy::too_many_arguments)]
    pub fn compute(
        &mut self,
        ci: &MonomialOperator,
        cj: &MonomialOperator,
        cdagk: &MonomialOperator,
        cdagl: &MonomialOperator,
        ham: &Hamiltonian,
        dm: &DensityMatrix,
        thermal: &Thermal,
        tol: &Tolerances,
    ) -> EdResult<()> {
        let mut non_resonant: [TermList<(i64, i64, i64, bool), NonResonantTerm>; 6] = Default::default();
        let mut resonant: [TermList<(i64, i64, i64, bool), ResonantTerm>; 6] = Default::default();

        for (index, permutation) in Permutation3::all().into_iter().enumerate() {
            let ops = [ci, cj, cdagk];
            let (o1, o2, o3) = (ops[permutation.order[0]], ops[permutation.order[1]], ops[permutation.order[2]]);
            self.compute_permutation(
                &mut non_resonant[index],
                &mut resonant[index],
                o1,
                o2,
                o3,
                cdagl,
                permutation.sign,
                ham,
                dm,
                thermal,
                tol,
            )?;
            non_resonant[index].prune(tol.term_negligible);
            resonant[index].prune(tol.term_negligible);
        }

        tracing::info!(
            non_resonant = non_resonant.iter().map(TermList::len).sum::<usize>(),
            resonant = resonant.iter().map(TermList::len).sum::<usize>(),
            "TwoParticleGf::compute"
        );
        self.non_resonant = non_resonant;
        self.resonant = resonant;
        Ok(())
    }

    /// One permutation's contribution: `O1` maps block2->block1, `O2` maps block3->block2,
    /// `O3` maps block4->block3, and `cx4` (= `c^dagger_l`) maps block1->block4, closing the
    /// four-block cyclic loop.
    #[allow(clippy::too_many_arguments)]
    fn compute_permutation(
        &self,
        non_resonant: &mut TermList<(i64, i64, i64, bool), NonResonantTerm>,
        resonant: &mut TermList<(i64, i64, i64, bool), ResonantTerm>,
        o1: &MonomialOperator,
        o2: &MonomialOperator,
        o3: &MonomialOperator,
        cx4: &MonomialOperator,
        sign: f64,
        ham: &Hamiltonian,
        dm: &DensityMatrix,
        thermal: &Thermal,
        tol: &Tolerances,
    ) -> EdResult<()> {
        for (block1, block2) in o1.left_right_blocks() {
            let Some(cx4_part) = cx4.part_by_left(block1) else { continue };
            let block4 = cx4_part.right();
            let Some(o2_part) = o2.part_by_left(block2) else { continue };
            let block3 = o2_part.right();
            let Some(o3_part) = o3.part_by_left(block3) else { continue };
            if o3_part.right() != block4 {
                continue;
            }
            let o1_part = o1.part_by_left(block1).expect("came from left_right_blocks");

            let e1 = ham.part(block1)?.eigenvalues()?;
            let e2 = ham.part(block2)?.eigenvalues()?;
            let e3 = ham.part(block3)?.eigenvalues()?;
            let e4 = ham.part(block4)?.eigenvalues()?;
            let w1 = dm.part(block1)?.weights();
            let w2 = dm.part(block2)?.weights();
            let w3 = dm.part(block3)?.weights();
            let w4 = dm.part(block4)?.weights();

            let o1_rows = o1_part.row_major()?;
            let o2_cols = o2_part.col_major()?;
            let o3_rows = o3_part.row_major()?;
            let cx4_cols = cx4_part.col_major()?;

            for index1 in 0..cx4_cols.outer_size().min(o1_rows.outer_size()) {
                let cx4_col = cx4_cols.outer_slice(index1);
                let o1_row = o1_rows.outer_slice(index1);
                for index3 in 0..o3_rows.outer_size() {
                    let o3_row = o3_rows.outer_slice(index3);
                    // chase cx4's column (index1, index4) against o3's row (index3, index4)
                    let matching_index4: Vec<(usize, Complex64, Complex64)> = {
                        let (mut ai, mut bi) = (0usize, 0usize);
                        let mut out = Vec::new();
                        while ai < cx4_col.len() && bi < o3_row.len() {
                            match cx4_col[ai].0.cmp(&o3_row[bi].0) {
                                std::cmp::Ordering::Equal => {
                                    out.push((cx4_col[ai].0, cx4_col[ai].1, o3_row[bi].1));
                                    ai += 1;
                                    bi += 1;
                                }
                                std::cmp::Ordering::Less => ai += 1,
                                std::cmp::Ordering::Greater => bi += 1,
                            }
                        }
                        out
                    };
                    if matching_index4.is_empty() {
                        continue;
                    }
                    let o2_col = o2_cols.outer_slice(index3);
                    // chase o2's column (index3, index2) against o1's row (index1, index2)
                    let (mut ai, mut bi) = (0usize, 0usize);
                    while ai < o2_col.len() && bi < o1_row.len() {
                        match o2_col[ai].0.cmp(&o1_row[bi].0) {
                            std::cmp::Ordering::Equal => {
                                let index2 = o2_col[ai].0;
                                let v_o2 = o2_col[ai].1;
                                let v_o1 = o1_row[bi].1;
                                for &(index4, v_cx4, v_o3) in &matching_index4 {
                                    if w1[index1] + w2[index2] + w3[index3] + w4[index4] < tol.matrix_element {
                                        continue;
                                    }
                                    let matrix_element = v_o1 * v_o2 * v_o3 * v_cx4 * sign;
                                    add_multiterm(
                                        non_resonant,
                                        resonant,
                                        matrix_element,
                                        thermal.beta,
                                        e1[index1],
                                        e2[index2],
                                        e3[index3],
                                        e4[index4],
                                        w1[index1],
                                        w2[index2],
                                        w3[index3],
                                        w4[index4],
                                        tol,
                                    );
                                }
                                ai += 1;
                                bi += 1;
                            }
                            std::cmp::Ordering::Less => ai += 1,
                            std::cmp::Ordering::Greater => bi += 1,
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Evaluates the two-particle Green's function at `(z1, z2, z3)`, with `z4` implied by
    /// overall frequency conservation. Each permutation's term list is evaluated with its own
    /// reordering of `[z1, z2, -z3]`, per [`Permutation3::permute`].
    pub fn evaluate(&self, z1: Complex64, z2: Complex64, z3: Complex64, resonance_tol: f64) -> Complex64 {
        let frequencies = [z1, z2, -z3];
        let mut total = Complex64::new(0.0, 0.0);
        for (index, permutation) in Permutation3::all().into_iter().enumerate() {
            let (pz1, pz2, pz3) = permutation.permute(frequencies);
            let args = TwoParticleArgs { z1: pz1, z2: pz2, z3: pz3, resonance_tol };
            total += self.non_resonant[index].evaluate(&args) + self.resonant[index].evaluate(&args);
        }
        total
    }

    /// Total number of surviving terms.
    pub fn len(&self) -> usize {
        self.non_resonant.iter().map(TermList::len).sum::<usize>()
            + self.resonant.iter().map(TermList::len).sum::<usize>()
    }

    /// Whether both term lists are empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `add_multiterm` of the source's `computeImpl`: turns one four-block cyclic
/// `(E1,E2,E3,E4,w1,w2,w3,w4)` tuple into up to four pole terms.
#[allow(clippy::too_many_arguments)]
fn add_multiterm(
    non_resonant: &mut TermList<(i64, i64, i64, bool), NonResonantTerm>,
    resonant: &mut TermList<(i64, i64, i64, bool), ResonantTerm>,
    coeff: Complex64,
    beta: f64,
    e1: f64,
    e2: f64,
    e3: f64,
    e4: f64,
    w1: f64,
    w2: f64,
    w3: f64,
    w4: f64,
    tol: &Tolerances,
) {
    let p1 = e2 - e1;
    let p2 = e3 - e2;
    let p3 = e4 - e3;

    let coeff_z2 = -coeff * (w2 + w3);
    if coeff_z2.norm() > tol.term_negligible {
        let poles = [p1, p2, p3];
        let key = (bucket(p1, tol.resonance), bucket(p2, tol.resonance), bucket(p3, tol.resonance), false);
        non_resonant.add_term(key, NonResonantTerm { coeff: coeff_z2, poles, is_z4: false, weight: 1 });
    }

    let coeff_z4 = coeff * (w1 + w4);
    if coeff_z4.norm() > tol.term_negligible {
        let poles = [p1, p2, p3];
        let key = (bucket(p1, tol.resonance), bucket(p2, tol.resonance), bucket(p3, tol.resonance), true);
        non_resonant.add_term(key, NonResonantTerm { coeff: coeff_z4, poles, is_z4: true, weight: 1 });
    }

    let res1 = coeff * beta * w1;
    let non_res1 = coeff * (w3 - w1);
    if res1.norm() > tol.term_negligible || non_res1.norm() > tol.term_negligible {
        let poles = [p1, p2, p3];
        let key = (bucket(p1, tol.resonance), bucket(p2, tol.resonance), bucket(p3, tol.resonance), true);
        resonant.add_term(
            key,
            ResonantTerm {
                res_coeff: res1,
                non_res_coeff: non_res1,
                poles,
                is_z1z2: true,
                weight: 1,
            },
        );
    }

    let res2 = -coeff * beta * w2;
    let non_res2 = coeff * (w2 - w4);
    if res2.norm() > tol.term_negligible || non_res2.norm() > tol.term_negligible {
        let poles = [p1, p2, p3];
        let key = (bucket(p1, tol.resonance), bucket(p2, tol.resonance), bucket(p3, tol.resonance), false);
        resonant.add_term(
            key,
            ResonantTerm {
                res_coeff: res2,
                non_res_coeff: non_res2,
                poles,
                is_z1z2: false,
                weight: 1,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SingleProcessComm;
    use crate::expression::builders::{annihilation_operator, creation_operator, quadratic_operator};
    use crate::expression::FermionProduct;
    use crate::hilbert_space::HilbertSpace;
    use crate::states_classification::StatesClassification;

    fn two_site_setup() -> (Hamiltonian, DensityMatrix, StatesClassification, Thermal) {
        let mut h = quadratic_operator(0, 1);
        h.add_term(FermionProduct::new([1], [0]).unwrap(), Complex64::new(1.0, 0.0));
        let mut hs = HilbertSpace::new(4, h.clone());
        hs.refine_with(Box::new(creation_operator(0)));
        hs.refine_with(Box::new(annihilation_operator(0)));
        hs.refine_with(Box::new(creation_operator(1)));
        hs.refine_with(Box::new(annihilation_operator(1)));
        hs.compute().unwrap();
        let mut sc = StatesClassification::new();
        sc.compute(&hs).unwrap();
        let mut ham = Hamiltonian::new();
        ham.prepare(&sc, &h, 1e-9, &SingleProcessComm).unwrap();
        ham.compute(&SingleProcessComm).unwrap();
        let thermal = Thermal::new(5.0);
        let mut dm = DensityMatrix::new();
        dm.compute(&ham, &thermal).unwrap();
        (ham, dm, sc, thermal)
    }

    #[test]
    fn compute_runs_and_produces_finite_values_on_a_two_site_chain() {
        let (ham, dm, sc, thermal) = two_site_setup();
        let tol = Tolerances::default();

        let mut c0 = MonomialOperator::new(FermionProduct::new([], [0]).unwrap(), Complex64::new(1.0, 0.0));
        c0.prepare(&sc).unwrap();
        c0.compute(tol.matrix_element, &ham, &sc, &SingleProcessComm).unwrap();
        let mut cdag0 = MonomialOperator::new(FermionProduct::new([0], []).unwrap(), Complex64::new(1.0, 0.0));
        cdag0.compute_as_adjoint_of(&c0).unwrap();

        let mut gf2 = TwoParticleGf::new();
        gf2.compute(&c0, &c0, &cdag0, &cdag0, &ham, &dm, &thermal, &tol).unwrap();

        let value = gf2.evaluate(
            Complex64::new(0.0, 3.0),
            Complex64::new(0.0, 5.0),
            Complex64::new(0.0, 7.0),
            tol.resonance,
        );
        assert!(value.re.is_finite());
        assert!(value.im.is_finite());
    }
}
