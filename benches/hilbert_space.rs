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

//! Benchmarks the block-partitioning pass on the four-site bath chain used throughout the
//! scenario tests: this is the step whose cost is least predictable from the Fock-space
//! dimension alone, since it depends on how quickly the union-find merges converge.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pomerust::expression::builders::{annihilation_operator, creation_operator};
use pomerust::hilbert_space::HilbertSpace;
use pomerust::presets::bath_chain;

fn four_site_chain_partition(c: &mut Criterion) {
    let levels = [-0.5, -1.1, -0.7, -1.1];
    let hoppings = [-1.3, -0.45, -0.127, -0.255];
    let hubbard_u = [1.0, 2.0, 3.0, 4.0];
    let h = bath_chain(&levels, &hoppings, &hubbard_u);

    c.bench_function("hilbert_space_compute_bath_chain_4site", |b| {
        b.iter(|| {
            let mut hs = HilbertSpace::new(1u64 << 8, h.clone());
            for i in 0..8 {
                hs.refine_with(Box::new(creation_operator(i)));
                hs.refine_with(Box::new(annihilation_operator(i)));
            }
            hs.compute().unwrap();
            black_box(hs.partition().unwrap().len());
        });
    });
}

criterion_group!(benches, four_site_chain_partition);
criterion_main!(benches);
