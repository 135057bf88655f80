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

//! The connected two-particle vertex `Gamma`, obtained from a [`TwoParticleGf`] by subtracting
//! the disconnected (Wick) piece built from single-particle [`GreensFunction`]s.

use num_complex::Complex64;

use crate::greens_function::GreensFunction;
use crate::thermal::Thermal;
use crate::two_particle_gf::TwoParticleGf;

/// `Gamma(n1, n2, n3) = chi(n1, n2, n3) + beta * G13(n1) * G24(n2) * [n1 == n3] - beta *
/// G14(n1) * G23(n2) * [n2 == n3]`.
///
/// `chi` here is the two-particle Green's function itself (not the bosonic susceptibility);
/// the two subtracted terms are the disconnected contributions a non-interacting (Wick's
/// theorem) four-point function would already produce from its constituent propagators, so
/// what remains isolates the genuinely connected, interaction-driven part of the vertex.
#[derive(Debug, Clone, Copy)]
pub struct Vertex4<'a> {
    two_particle: &'a TwoParticleGf,
    g13: &'a GreensFunction,
    g24: &'a GreensFunction,
    g14: &'a GreensFunction,
    g23: &'a GreensFunction,
}

impl<'a> Vertex4<'a> {
    /// Builds a vertex view over an already-computed two-particle Green's function and the
    /// four single-particle propagators needed for the disconnected subtraction.
    pub fn new(
        two_particle: &'a TwoParticleGf,
        g13: &'a GreensFunction,
        g24: &'a GreensFunction,
        g14: &'a GreensFunction,
        g23: &'a GreensFunction,
    ) -> Self {
        Vertex4 { two_particle, g13, g24, g14, g23 }
    }

    /// Evaluates the connected vertex at the three independent fermionic Matsubara indices
    /// `(n1, n2, n3)`.
    pub fn evaluate_matsubara(&self, n1: i64, n2: i64, n3: i64, thermal: &Thermal) -> Complex64 {
        let z1 = thermal.matsubara_frequency(n1, crate::thermal::Statistics::Fermionic);
        let z2 = thermal.matsubara_frequency(n2, crate::thermal::Statistics::Fermionic);
        let z3 = thermal.matsubara_frequency(n3, crate::thermal::Statistics::Fermionic);
        let resonance_tol = 1e-8;
        let chi = self.two_particle.evaluate(z1, z2, z3, resonance_tol);

        let mut disconnected = Complex64::new(0.0, 0.0);
        if n1 == n3 {
            disconnected += thermal.beta * self.g13.evaluate_matsubara(n1, thermal) * self.g24.evaluate_matsubara(n2, thermal);
        }
        if n2 == n3 {
            disconnected -= thermal.beta * self.g14.evaluate_matsubara(n1, thermal) * self.g23.evaluate_matsubara(n2, thermal);
        }
        chi + disconnected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SingleProcessComm;
    use crate::density_matrix::DensityMatrix;
    use crate::expression::builders::{annihilation_operator, creation_operator, quadratic_operator};
    use crate::expression::FermionProduct;
    use crate::hamiltonian::Hamiltonian;
    use crate::hilbert_space::HilbertSpace;
    use crate::states_classification::StatesClassification;
    use crate::tolerances::Tolerances;

    #[test]
    fn connected_vertex_is_finite_away_from_poles() {
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
        let tol = Tolerances::default();

        let mut c0 = crate::monomial_operator::MonomialOperator::new(
            FermionProduct::new([], [0]).unwrap(),
            Complex64::new(1.0, 0.0),
        );
        c0.prepare(&sc).unwrap();
        c0.compute(tol.matrix_element, &ham, &sc, &SingleProcessComm).unwrap();
        let mut cdag0 = crate::monomial_operator::MonomialOperator::new(
            FermionProduct::new([0], []).unwrap(),
            Complex64::new(1.0, 0.0),
        );
        cdag0.compute_as_adjoint_of(&c0).unwrap();

        let mut g = GreensFunction::new();
        g.compute(&c0, &cdag0, &ham, &dm, &tol).unwrap();

        let mut gf2 = TwoParticleGf::new();
        gf2.compute(&c0, &c0, &cdag0, &cdag0, &ham, &dm, &thermal, &tol).unwrap();

        let vertex = Vertex4::new(&gf2, &g, &g, &g, &g);
        let value = vertex.evaluate_matsubara(1, 2, 7, &thermal);
        assert!(value.re.is_finite());
        assert!(value.im.is_finite());
    }
}
