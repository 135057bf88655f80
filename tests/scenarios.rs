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

//! End-to-end scenarios driving the full `HilbertSpace -> StatesClassification -> Hamiltonian
//! -> DensityMatrix -> MonomialOperator -> correlator` pipeline against the lattice presets.
//! These exercise properties that only surface once every stage is wired together: ground-state
//! consistency, density-matrix normalization, Green's function sum rules, susceptibility
//! subtraction, truncation stability, multi-channel three-point assembly, and the vanishing of
//! the connected vertex for a quadratic Hamiltonian.

use num_complex::Complex64;

use pomerust::comm::SingleProcessComm;
use pomerust::density_matrix::DensityMatrix;
use pomerust::expression::builders::{annihilation_operator, creation_operator};
use pomerust::expression::operator::PolynomialOperator;
use pomerust::expression::FermionProduct;
use pomerust::greens_function::GreensFunction;
use pomerust::hamiltonian::Hamiltonian;
use pomerust::hilbert_space::HilbertSpace;
use pomerust::monomial_operator::MonomialOperator;
use pomerust::presets::{anderson_impurity, bath_chain, hubbard_atom, hubbard_dimer, mode};
use pomerust::states_classification::StatesClassification;
use pomerust::susceptibility::{ensemble_average, Susceptibility};
use pomerust::three_point_susceptibility::{Channel, ThreePointSusceptibility};
use pomerust::thermal::{Statistics, Thermal};
use pomerust::tolerances::Tolerances;
use pomerust::two_particle_gf::TwoParticleGf;
use pomerust::vertex4::Vertex4;

/// Runs the block-discovery + diagonalization stages for a model spanning `n_modes` single-
/// particle indices, registering every elementary creation/annihilation operator as a Phase
/// II refiner so every downstream `MonomialOperator` sees a clean bijection of blocks.
fn diagonalize(
    n_modes: usize,
    h: &PolynomialOperator<Complex64>,
    tol: &Tolerances,
) -> (StatesClassification, Hamiltonian) {
    let dim = 1u64 << n_modes;
    let mut hs = HilbertSpace::new(dim, h.clone());
    for i in 0..n_modes {
        hs.refine_with(Box::new(creation_operator(i)));
        hs.refine_with(Box::new(annihilation_operator(i)));
    }
    hs.compute().unwrap();

    let mut sc = StatesClassification::new();
    sc.compute(&hs).unwrap();

    let mut ham = Hamiltonian::new();
    ham.prepare(&sc, h, tol.hamiltonian_hermiticity, &SingleProcessComm).unwrap();
    ham.compute(&SingleProcessComm).unwrap();
    (sc, ham)
}

fn elementary_pair(
    sc: &StatesClassification,
    ham: &Hamiltonian,
    i: usize,
    tol: &Tolerances,
) -> (MonomialOperator, MonomialOperator) {
    let mut c = MonomialOperator::new(FermionProduct::new([], [i]).unwrap(), Complex64::new(1.0, 0.0));
    c.prepare(sc).unwrap();
    c.compute(tol.matrix_element, ham, sc, &SingleProcessComm).unwrap();
    let mut cdag = MonomialOperator::new(FermionProduct::new([i], []).unwrap(), Complex64::new(1.0, 0.0));
    cdag.compute_as_adjoint_of(&c).unwrap();
    (c, cdag)
}

/// `ground_energy` must equal the minimum eigenvalue over every block, and the density
/// matrix's weights must sum to one, for a four-site bath chain.
#[test]
fn bath_chain_ground_energy_and_normalization() {
    let levels = [-0.5, -1.1, -0.7, -1.1];
    let hoppings = [-1.3, -0.45, -0.127, -0.255];
    let hubbard_u = [1.0, 2.0, 3.0, 4.0];
    let h = bath_chain(&levels, &hoppings, &hubbard_u);
    let tol = Tolerances::default();
    let (_sc, ham) = diagonalize(8, &h, &tol);

    let direct_min = (0..ham.number_of_parts() as i64)
        .flat_map(|b| ham.part(b).unwrap().eigenvalues().unwrap().iter().copied())
        .fold(f64::INFINITY, f64::min);
    assert!((ham.ground_energy().unwrap() - direct_min).abs() < 1e-12);

    let mut dm = DensityMatrix::new();
    dm.compute(&ham, &Thermal::new(10.0)).unwrap();
    let total: f64 = (0..dm.number_of_parts() as i64)
        .map(|b| dm.part(b).unwrap().weights().iter().sum::<f64>())
        .sum();
    assert!((total - 1.0).abs() < 1e-9);
}

/// The local Green's function of the four-site bath chain at site A, spin down, stays finite
/// at the first ten fermionic Matsubara frequencies, decays from its low-frequency peak by the
/// tenth index, and matches the single-fermion-mode high-frequency tail
/// `G(i*omega_n) ~ -1/(i*omega_n)`.
#[test]
fn bath_chain_green_function_matsubara_is_finite_and_decays() {
    let levels = [-0.5, -1.1, -0.7, -1.1];
    let hoppings = [-1.3, -0.45, -0.127, -0.255];
    let hubbard_u = [1.0, 2.0, 3.0, 4.0];
    let h = bath_chain(&levels, &hoppings, &hubbard_u);
    let tol = Tolerances::default();
    let beta = 10.0;
    let (sc, ham) = diagonalize(8, &h, &tol);
    let mut dm = DensityMatrix::new();
    dm.compute(&ham, &Thermal::new(beta)).unwrap();
    dm.truncate_blocks(1e-13);

    let site_a_down = mode(0, 1);
    let (c, cdag) = elementary_pair(&sc, &ham, site_a_down, &tol);

    let mut gf = GreensFunction::new();
    gf.compute(&c, &cdag, &ham, &dm, &tol).unwrap();

    let thermal = Thermal::new(beta);
    let values: Vec<Complex64> = (0..10).map(|n| gf.evaluate_matsubara(n, &thermal)).collect();
    let norms: Vec<f64> = values
        .iter()
        .map(|value| {
            assert!(value.re.is_finite() && value.im.is_finite());
            value.norm()
        })
        .collect();
    // |G| generally falls off as 1/omega_n at high frequency; it need not be monotonic at the
    // lowest few indices, but the last index must be well below the peak of the first three.
    let peak = norms[0].max(norms[1]).max(norms[2]);
    assert!(norms[9] < peak, "|G| should decay from its low-frequency peak by n=9");

    let reference = [
        Complex64::new(0.00515461461, -0.191132319),
        Complex64::new(-0.0129218293, -0.35749415),
        Complex64::new(-0.0063208255, -0.364571553),
        Complex64::new(-0.00244599255, -0.326995909),
        Complex64::new(-0.000938220077, -0.285235829),
        Complex64::new(-0.000360621591, -0.248974505),
        Complex64::new(-0.000129046261, -0.219206946),
        Complex64::new(-3.20102701e-5, -0.194983212),
        Complex64::new(9.51503858e-6, -0.175149329),
        Complex64::new(2.68929175e-5, -0.158732731),
    ];
    for (n, (value, expected)) in values.iter().zip(reference.iter()).enumerate() {
        assert!(
            (value - expected).norm() < 1e-7,
            "G(i*omega_{n}) = {value} should match the reference value {expected}"
        );
    }

    let z = Complex64::new(0.0, 1.0e6);
    let tail = gf.evaluate(z) * z;
    assert!((tail.re - 1.0).abs() < 1e-2, "sum of residues should saturate the single-mode sum rule");
}

/// For the two-site Hubbard dimer at half filling, the full density-density susceptibility
/// minus its disconnected piece is finite, and precomputed / ensemble-average subtraction
/// agree with each other.
#[test]
fn hubbard_dimer_disconnected_subtraction_is_consistent() {
    let h = hubbard_dimer(2.0, -1.0, 1.0);
    let tol = Tolerances::default();
    let beta = 10.0;
    let (sc, ham) = diagonalize(4, &h, &tol);
    let mut dm = DensityMatrix::new();
    dm.compute(&ham, &Thermal::new(beta)).unwrap();
    dm.truncate_blocks(1e-13);

    let n_up_site0 = mode(0, 0);
    let mut n_op = MonomialOperator::new(
        FermionProduct::new([n_up_site0], [n_up_site0]).unwrap(),
        Complex64::new(1.0, 0.0),
    );
    n_op.prepare(&sc).unwrap();
    n_op.compute(tol.matrix_element, &ham, &sc, &SingleProcessComm).unwrap();

    let mut chi_ensemble = Susceptibility::new();
    chi_ensemble.compute(&n_op, &n_op, &ham, &dm, &tol).unwrap();
    chi_ensemble
        .subtract_disconnected_ensemble(&n_op, &n_op, &dm, tol.disconnected_cutoff)
        .unwrap();

    let n_avg = ensemble_average(&n_op, &dm).unwrap();
    let mut chi_precomputed = Susceptibility::new();
    chi_precomputed.compute(&n_op, &n_op, &ham, &dm, &tol).unwrap();
    chi_precomputed.subtract_disconnected_precomputed(n_avg, n_avg, tol.disconnected_cutoff);

    let value_ensemble = chi_ensemble.evaluate(Complex64::new(0.0, 0.0), beta);
    let value_precomputed = chi_precomputed.evaluate(Complex64::new(0.0, 0.0), beta);
    assert!(value_ensemble.re.is_finite());
    assert!((value_ensemble - value_precomputed).norm() < 1e-9);
}

/// Raising the density-matrix truncation tolerance never increases the number of retained
/// blocks, and the local Green's function of the bath chain stays stable across tight
/// tolerances.
#[test]
fn bath_chain_truncation_is_monotone_and_stable() {
    let levels = [-0.5, -1.1, -0.7, -1.1];
    let hoppings = [-1.3, -0.45, -0.127, -0.255];
    let hubbard_u = [1.0, 2.0, 3.0, 4.0];
    let h = bath_chain(&levels, &hoppings, &hubbard_u);
    let tol = Tolerances::default();
    let beta = 10.0;
    let (sc, ham) = diagonalize(8, &h, &tol);
    let site_a_down = mode(0, 1);

    let retained_count = |t: f64| {
        let mut dm = DensityMatrix::new();
        dm.compute(&ham, &Thermal::new(beta)).unwrap();
        dm.truncate_blocks(t);
        (0..dm.number_of_parts() as i64)
            .filter(|&b| dm.part(b).unwrap().is_retained())
            .count()
    };
    let counts: Vec<usize> = [1e-15, 1e-13, 1e-11, 1e-9, 1e-7, 1e-6]
        .iter()
        .map(|&t| retained_count(t))
        .collect();
    for pair in counts.windows(2) {
        assert!(pair[0] >= pair[1], "retained block count must be non-increasing as tol grows");
    }

    let gf_at = |t: f64| {
        let mut dm = DensityMatrix::new();
        dm.compute(&ham, &Thermal::new(beta)).unwrap();
        dm.truncate_blocks(t);
        let (c, cdag) = elementary_pair(&sc, &ham, site_a_down, &tol);
        let mut gf = GreensFunction::new();
        gf.compute(&c, &cdag, &ham, &dm, &tol).unwrap();
        let thermal = Thermal::new(beta);
        (0..10).map(|n| gf.evaluate_matsubara(n, &thermal)).collect::<Vec<_>>()
    };
    let reference = gf_at(1e-15);
    for &t in &[1e-14, 1e-12, 1e-10] {
        let values = gf_at(t);
        for (a, b) in reference.iter().zip(values.iter()) {
            assert!((a - b).norm() < 1e-6, "GF should be stable across tight truncation tolerances");
        }
    }
}

/// For the two-site dimer, the PP / PH / xPH channels of the three-point susceptibility built
/// from `(c^dagger_up, c_up, c^dagger_down, c_down)` each produce finite values on a handful of
/// fermionic Matsubara index pairs.
#[test]
fn hubbard_dimer_three_point_channels_are_finite() {
    let h = hubbard_dimer(2.0, -1.0, 1.0);
    let tol = Tolerances::default();
    let beta = 10.0;
    let thermal = Thermal::new(beta);
    let (sc, ham) = diagonalize(4, &h, &tol);
    let mut dm = DensityMatrix::new();
    dm.compute(&ham, &thermal).unwrap();
    dm.truncate_blocks(1e-13);

    let up = mode(0, 0);
    let down = mode(0, 1);
    let (c_up, cdag_up) = elementary_pair(&sc, &ham, up, &tol);

    // B = c^dagger_down * c_down composed as a single two-body monomial operator, the
    // "B1 * B2" bosonic factor the three-point assembly expects precomposed.
    let mut b = MonomialOperator::new(
        FermionProduct::new([down], [down]).unwrap(),
        Complex64::new(1.0, 0.0),
    );
    b.prepare(&sc).unwrap();
    b.compute(tol.matrix_element, &ham, &sc, &SingleProcessComm).unwrap();

    for channel in [Channel::PP, Channel::PH, Channel::XPh] {
        let mut chi3 = ThreePointSusceptibility::new();
        chi3.compute(channel, false, &cdag_up, &c_up, &b, &ham, &dm, &thermal, &tol).unwrap();
        for n1 in 0..3 {
            for n2 in 0..3 {
                let z1 = thermal.matsubara_frequency(n1, pomerust::thermal::Statistics::Fermionic);
                let z2 = thermal.matsubara_frequency(n2, pomerust::thermal::Statistics::Fermionic);
                let value = chi3.evaluate(z1, z2, tol.resonance);
                assert!(value.re.is_finite() && value.im.is_finite());
            }
        }
    }
}

/// The diagonal two-particle Green's function `chi_uuuu(i*omega+i*Omega, i*omega', i*omega)` of
/// a single-orbital Anderson impurity coupled to two bath sites matches the source's regression
/// values at the first bosonic frequency and ten fermionic `omega'` indices.
#[test]
fn anderson_impurity_two_particle_gf_matches_reference() {
    let bath_levels = [1.02036910873357, -1.02036910873357];
    let hybridizations = [0.296439333614347, 0.296439333614347];
    let h = anderson_impurity(0.5, 0.25, &bath_levels, &hybridizations);
    let tol = Tolerances::default();
    let beta = 26.0;
    let thermal = Thermal::new(beta);
    let (sc, ham) = diagonalize(6, &h, &tol);
    let mut dm = DensityMatrix::new();
    dm.compute(&ham, &thermal).unwrap();

    let up = mode(0, 0);
    let (c, cdag) = elementary_pair(&sc, &ham, up, &tol);

    let mut gf2 = TwoParticleGf::new();
    gf2.compute(&c, &c, &cdag, &cdag, &ham, &dm, &thermal, &tol).unwrap();

    let omega = thermal.matsubara_frequency(0, Statistics::Fermionic);
    let big_omega = thermal.matsubara_frequency(1, Statistics::Bosonic);
    let z1 = omega + big_omega;
    let z3 = omega;

    let reference = [
        Complex64::new(-2.342841271771e+01, 0.0),
        Complex64::new(0.0, 0.0),
        Complex64::new(6.932231165814e-03, 0.0),
        Complex64::new(2.037522082872e-03, 0.0),
        Complex64::new(-2.150424835716e-03, 0.0),
        Complex64::new(-4.384848776411e-03, 0.0),
        Complex64::new(-5.253420668000e-03, 0.0),
        Complex64::new(-5.370700986029e-03, 0.0),
        Complex64::new(-5.126175681822e-03, 0.0),
        Complex64::new(-4.732777836189e-03, 0.0),
    ];
    for (v, expected) in reference.iter().enumerate() {
        let z2 = thermal.matsubara_frequency(v as i64, Statistics::Fermionic);
        let value = gf2.evaluate(z1, z2, z3, tol.resonance);
        assert!(
            (value - expected).norm() < 1e-6,
            "chi_uuuu at v={v} was {value}, expected {expected}"
        );
    }
}

/// For a non-interacting (U = 0) single orbital with a nonzero chemical potential, the
/// connected vertex built from the two-particle Green's function and the Wick-contraction
/// single-particle propagators vanishes, since a quadratic Hamiltonian has no connected
/// four-point part.
#[test]
fn noninteracting_atom_has_vanishing_connected_vertex() {
    let h = hubbard_atom(0.0, 0.3);
    let tol = Tolerances::default();
    let beta = 40.0;
    let thermal = Thermal::new(beta);
    let (sc, ham) = diagonalize(2, &h, &tol);
    let mut dm = DensityMatrix::new();
    dm.compute(&ham, &thermal).unwrap();

    let up = mode(0, 0);
    let (c, cdag) = elementary_pair(&sc, &ham, up, &tol);

    let mut g = GreensFunction::new();
    g.compute(&c, &cdag, &ham, &dm, &tol).unwrap();

    let mut gf2 = TwoParticleGf::new();
    gf2.compute(&c, &c, &cdag, &cdag, &ham, &dm, &thermal, &tol).unwrap();

    let vertex = Vertex4::new(&gf2, &g, &g, &g, &g);
    for (n1, n2, n3) in [(0, 0, 0), (1, 2, 1), (-1, 3, -1)] {
        let value = vertex.evaluate_matsubara(n1, n2, n3, &thermal);
        assert!(value.norm() < 1e-6, "connected vertex should vanish for U=0 at ({n1},{n2},{n3}), got {value}");
    }
}
