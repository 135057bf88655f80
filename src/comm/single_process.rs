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

use crate::comm::{BroadcastElement, Communicator};

/// A single-rank communicator: `rank() == 0`, `size() == 1`, and every broadcast is a no-op
/// since there is nobody else to send to. Requires no system MPI library; this is the
/// default communicator used throughout the crate's tests and examples.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcessComm;

impl Communicator for SingleProcessComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn broadcast_vec<T: BroadcastElement>(&self, _items: &mut Vec<T>, _root: usize) {
        // Only one rank exists; the sender's data is already where it needs to be.
    }

    fn broadcast_scalar<T: BroadcastElement + Copy>(&self, _value: &mut T, _root: usize) {}
}
