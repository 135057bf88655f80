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

//! The three-point susceptibility `chi3(z1, z2)`, assembled from a cyclic loop of three
//! operator insertions (`F1`, `F2`, and a combined bosonic factor `B`) across three blocks.
//!
//! The particle-particle (PP), particle-hole (PH), and crossed particle-hole (xPH) channels
//! differ only in the sign conventions threaded through [`Channel::sign_pp`] and the
//! `swapped` flag below, not in the assembly loop itself.

use num_complex::Complex64;

use crate::density_matrix::DensityMatrix;
use crate::error::EdResult;
use crate::hamiltonian::Hamiltonian;
use crate::monomial_operator::MonomialOperator;
use crate::term_list::{Term, TermList};
use crate::thermal::Thermal;
use crate::tolerances::Tolerances;

/// Which two-particle channel a three-point susceptibility is evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Particle-particle.
    PP,
    /// Particle-hole.
    PH,
    /// Crossed particle-hole.
    XPh,
}

impl Channel {
    fn sign_pp(&self, x: f64) -> f64 {
        if *self == Channel::PP {
            -x
        } else {
            x
        }
    }

    fn xi(&self) -> f64 {
        if *self == Channel::PP {
            -1.0
        } else {
            1.0
        }
    }
}

fn bucket(x: f64, tol: f64) -> i64 {
    (x / tol).round() as i64
}

/// Arguments shared by every term flavor: the two independent frequencies and the resonance
/// tolerance the [`ResonantTerm`] needs to decide whether it contributes at all.
#[derive(Debug, Clone, Copy)]
pub struct ThreePointArgs {
    pub z1: Complex64,
    pub z2: Complex64,
    pub resonance_tol: f64,
}

/// `C / ((z1 - P0)(z2 - P1))`.
#[derive(Debug, Clone, Copy)]
pub struct NonResonantFfTerm {
    coeff: Complex64,
    p0: f64,
    p1: f64,
    weight: u64,
}

impl Term for NonResonantFfTerm {
    type Args = ThreePointArgs;
    type Value = Complex64;

    fn merge(&mut self, other: &Self) {
        self.coeff += other.coeff;
        let total = self.weight + other.weight;
        self.p0 = (self.p0 * self.weight as f64 + other.p0 * other.weight as f64) / total as f64;
        self.p1 = (self.p1 * self.weight as f64 + other.p1 * other.weight as f64) / total as f64;
        self.weight = total;
    }

    fn is_negligible(&self, tol: f64) -> bool {
        self.coeff.norm() <= tol
    }

    fn evaluate(&self, args: &ThreePointArgs) -> Complex64 {
        self.coeff / ((args.z1 - self.p0) * (args.z2 - self.p1))
    }
}

/// `C / ((z1 - p1)(z1 - xi*z2 - p12))`.
#[derive(Debug, Clone, Copy)]
pub struct NonResonantFbTerm {
    coeff: Complex64,
    p1: f64,
    p12: f64,
    xi: f64,
    weight: u64,
}

impl Term for NonResonantFbTerm {
    type Args = ThreePointArgs;
    type Value = Complex64;

    fn merge(&mut self, other: &Self) {
        self.coeff += other.coeff;
        let total = self.weight + other.weight;
        self.p1 = (self.p1 * self.weight as f64 + other.p1 * other.weight as f64) / total as f64;
        self.p12 = (self.p12 * self.weight as f64 + other.p12 * other.weight as f64) / total as f64;
        self.weight = total;
    }

    fn is_negligible(&self, tol: f64) -> bool {
        self.coeff.norm() <= tol
    }

    fn evaluate(&self, args: &ThreePointArgs) -> Complex64 {
        self.coeff / ((args.z1 - self.p1) * (args.z1 - self.xi * args.z2 - self.p12))
    }
}

/// `|z1 - xi*z2| < resonance_tol ? C/(z1 - pole) : 0`.
#[derive(Debug, Clone, Copy)]
pub struct ResonantTerm {
    coeff: Complex64,
    pole: f64,
    xi: f64,
    weight: u64,
}

impl Term for ResonantTerm {
    type Args = ThreePointArgs;
    type Value = Complex64;

    fn merge(&mut self, other: &Self) {
        self.coeff += other.coeff;
        let total = self.weight + other.weight;
        self.pole = (self.pole * self.weight as f64 + other.pole * other.weight as f64) / total as f64;
        self.weight = total;
    }

    fn is_negligible(&self, tol: f64) -> bool {
        self.coeff.norm() <= tol
    }

    fn evaluate(&self, args: &ThreePointArgs) -> Complex64 {
        if (args.z1 - self.xi * args.z2).norm() < args.resonance_tol {
            self.coeff / (args.z1 - self.pole)
        } else {
            Complex64::new(0.0, 0.0)
        }
    }
}

/// The three-point susceptibility, holding one `TermList` per term flavor.
#[derive(Debug, Clone, Default)]
pub struct ThreePointSusceptibility {
    non_resonant_ff: TermList<(i64, i64), NonResonantFfTerm>,
    non_resonant_fb: TermList<(i64, i64, i8), NonResonantFbTerm>,
    resonant: TermList<(i64, i8), ResonantTerm>,
}

impl ThreePointSusceptibility {
    /// An empty three-point susceptibility.
    pub fn new() -> Self {
        ThreePointSusceptibility {
            non_resonant_ff: TermList::new(),
            non_resonant_fb: TermList::new(),
            resonant: TermList::new(),
        }
    }

    /// Assembles every term of the cyclic `F1(block2->block1) * B(block3->block1) *
    /// F2(block3->block2)` loop, for blocks where all three legs connect.
    ///
    /// `b` stands for the combined bosonic factor `B1 * B2` of the source's `computeImpl`;
    /// composing the two bosonic insertions into a single operator before calling this
    /// function is the caller's responsibility (typically via
    /// [`MonomialOperator::compute_as_adjoint_of`]-style construction, or by precomposing the
    /// two monomials before `prepare`/`compute`).
    pub fn compute(
        &mut self,
        channel: Channel,
        swapped: bool,
        f1: &MonomialOperator,
        f2: &MonomialOperator,
        b: &MonomialOperator,
        ham: &Hamiltonian,
        dm: &DensityMatrix,
        thermal: &Thermal,
        tol: &Tolerances,
    ) -> EdResult<()> {
        let prefactor = if (channel == Channel::PH) == swapped { 1.0 } else { -1.0 };
        let mut non_resonant_ff = TermList::new();
        let mut non_resonant_fb = TermList::new();
        let mut resonant = TermList::new();

        for (block1, block2) in f1.left_right_blocks() {
            let Some(b_part) = b.part_by_left(block1) else { continue };
            let block3 = b_part.right();
            let Some(f2_part) = f2.part_by_left(block2) else { continue };
            if f2_part.right() != block3 {
                continue;
            }
            let f1_part = f1.part_by_left(block1).expect("came from left_right_blocks");

            let e1 = ham.part(block1)?.eigenvalues()?;
            let e2 = ham.part(block2)?.eigenvalues()?;
            let e3 = ham.part(block3)?.eigenvalues()?;
            let w1 = dm.part(block1)?.weights();
            let w2 = dm.part(block2)?.weights();
            let w3 = dm.part(block3)?.weights();

            let f1_rows = f1_part.row_major()?;
            let b_rows = b_part.row_major()?;
            let f2_rows = f2_part.row_major()?;

            for index1 in 0..f1_rows.outer_size() {
                let b_row = b_rows.outer_slice(index1);
                for &(index2, v_f1) in f1_rows.outer_slice(index1) {
                    let f2_row = f2_rows.outer_slice(index2);
                    let (mut bi, mut fi) = (0usize, 0usize);
                    while bi < b_row.len() && fi < f2_row.len() {
                        match b_row[bi].0.cmp(&f2_row[fi].0) {
                            std::cmp::Ordering::Equal => {
                                let index3 = b_row[bi].0;
                                let v_b = b_row[bi].1;
                                let v_f2 = f2_row[fi].1;
                                let matrix_element = v_f1 * v_b * v_f2 * prefactor;
                                add_multiterm(
                                    &mut non_resonant_ff,
                                    &mut non_resonant_fb,
                                    &mut resonant,
                                    channel,
                                    swapped,
                                    matrix_element,
                                    thermal.beta,
                                    e1[index1],
                                    e2[index2],
                                    e3[index3],
                                    w1[index1],
                                    w2[index2],
                                    w3[index3],
                                    tol,
                                );
                                bi += 1;
                                fi += 1;
                            }
                            std::cmp::Ordering::Less => bi += 1,
                            std::cmp::Ordering::Greater => fi += 1,
                        }
                    }
                }
            }
        }

        non_resonant_ff.prune(tol.term_negligible);
        non_resonant_fb.prune(tol.term_negligible);
        resonant.prune(tol.term_negligible);
        tracing::info!(
            ff = non_resonant_ff.len(),
            fb = non_resonant_fb.len(),
            resonant = resonant.len(),
            "ThreePointSusceptibility::compute"
        );
        self.non_resonant_ff = non_resonant_ff;
        self.non_resonant_fb = non_resonant_fb;
        self.resonant = resonant;
        Ok(())
    }

    /// `chi3(z1, z2) = NRFF(z1,z2) + NRFB(z1,z2) + Resonant(z1,z2,resonance_tol)`.
    pub fn evaluate(&self, z1: Complex64, z2: Complex64, resonance_tol: f64) -> Complex64 {
        let args = ThreePointArgs { z1, z2, resonance_tol };
        self.non_resonant_ff.evaluate(&args) + self.non_resonant_fb.evaluate(&args) + self.resonant.evaluate(&args)
    }

    /// Total number of surviving terms across all three flavors.
    pub fn len(&self) -> usize {
        self.non_resonant_ff.len() + self.non_resonant_fb.len() + self.resonant.len()
    }

    /// Whether every flavor is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `add_multiterm` of the source's `computeImpl`: turns one cyclic `(E1,E2,E3,w1,w2,w3)`
/// triple into up to four pole terms split across the three flavor lists.
#[allow(clippy::too_many_arguments)]
fn add_multiterm(
    non_resonant_ff: &mut TermList<(i64, i64), NonResonantFfTerm>,
    non_resonant_fb: &mut TermList<(i64, i64, i8), NonResonantFbTerm>,
    resonant: &mut TermList<(i64, i8), ResonantTerm>,
    channel: Channel,
    swapped: bool,
    coeff: Complex64,
    beta: f64,
    e1: f64,
    e2: f64,
    e3: f64,
    w1: f64,
    w2: f64,
    w3: f64,
    tol: &Tolerances,
) {
    let eij = e1 - e2;
    let ejk = e2 - e3;
    let eik = e1 - e3;
    let xi = channel.xi();

    let coeff_nrff = coeff * (w1 + w2);
    if coeff_nrff.norm() > tol.term_negligible {
        let p0 = if swapped { ejk } else { eij };
        let p1 = (if swapped { eij } else { ejk }) * channel.sign_pp(1.0);
        let key = (bucket(p0, tol.resonance), bucket(p1, tol.resonance));
        non_resonant_ff.add_term(
            key,
            NonResonantFfTerm {
                coeff: Complex64::new(channel.sign_pp(1.0), 0.0) * coeff_nrff,
                p0,
                p1,
                weight: 1,
            },
        );
    }

    if eik.abs() < tol.resonance {
        let coeff_r = -coeff * beta * w1;
        if coeff_r.norm() > tol.term_negligible {
            let value = if swapped { -coeff_r } else { coeff_r };
            let pole = if swapped { ejk } else { -ejk };
            let key = (bucket(pole, tol.resonance), xi as i8);
            resonant.add_term(key, ResonantTerm { coeff: value, pole, xi, weight: 1 });
        }
    } else {
        let coeff_nrfb = coeff * (w3 - w1);
        if coeff_nrfb.norm() > tol.term_negligible {
            let value = if swapped { -coeff_nrfb } else { coeff_nrfb };
            let p1 = if swapped { ejk } else { eij };
            let key = (bucket(p1, tol.resonance), bucket(eik, tol.resonance), xi as i8);
            non_resonant_fb.add_term(
                key,
                NonResonantFbTerm {
                    coeff: value,
                    p1,
                    p12: eik,
                    xi,
                    weight: 1,
                },
            );
        }
        if !swapped {
            let coeff_ff2 = Complex64::new(channel.sign_pp(1.0), 0.0) * coeff_nrfb;
            if coeff_ff2.norm() > tol.term_negligible {
                let p1 = if channel == Channel::PP { ejk } else { -ejk };
                let key = (bucket(eij, tol.resonance), bucket(p1, tol.resonance));
                non_resonant_ff.add_term(
                    key,
                    NonResonantFfTerm {
                        coeff: coeff_ff2,
                        p0: eij,
                        p1,
                        weight: 1,
                    },
                );
            }
        }
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
    fn compute_runs_and_produces_finite_terms_on_a_two_site_chain() {
        let (ham, dm, sc, thermal) = two_site_setup();
        let tol = Tolerances::default();

        let mut c0 = MonomialOperator::new(FermionProduct::new([], [0]).unwrap(), Complex64::new(1.0, 0.0));
        c0.prepare(&sc).unwrap();
        c0.compute(tol.matrix_element, &ham, &sc, &SingleProcessComm).unwrap();
        let mut cdag0 = MonomialOperator::new(FermionProduct::new([0], []).unwrap(), Complex64::new(1.0, 0.0));
        cdag0.compute_as_adjoint_of(&c0).unwrap();
        let mut n0 = MonomialOperator::new(FermionProduct::new([0], [0]).unwrap(), Complex64::new(1.0, 0.0));
        n0.prepare(&sc).unwrap();
        n0.compute(tol.matrix_element, &ham, &sc, &SingleProcessComm).unwrap();

        let mut chi3 = ThreePointSusceptibility::new();
        chi3.compute(Channel::PH, false, &c0, &c0, &n0, &ham, &dm, &thermal, &tol).unwrap();

        let value = chi3.evaluate(Complex64::new(0.0, 3.0), Complex64::new(0.0, 5.0), tol.resonance);
        assert!(value.re.is_finite());
        assert!(value.im.is_finite());
    }
}
