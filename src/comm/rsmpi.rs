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

//! [`Communicator`] implementation backed by the real `mpi` crate (rsmpi), available behind
//! the `mpi` Cargo feature for callers that link a system MPI implementation.

use mpi::topology::Communicator as RsmpiTopologyCommunicator;
use mpi::traits::Root;

use crate::comm::{BroadcastElement, Communicator};

/// Wraps an `mpi::topology::SimpleCommunicator` (typically `world()`) behind this crate's
/// [`Communicator`] trait.
pub struct RsmpiComm {
    world: mpi::topology::SimpleCommunicator,
}

impl RsmpiComm {
    /// Wraps the given rsmpi world communicator.
    pub fn new(world: mpi::topology::SimpleCommunicator) -> Self {
        RsmpiComm { world }
    }
}

impl Communicator for RsmpiComm {
    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn broadcast_vec<T: BroadcastElement>(&self, items: &mut Vec<T>, root: usize) {
        let root_process = self.world.process_at_rank(root as i32);
        let mut len = items.len() as u64;
        root_process.broadcast_into(&mut len);
        items.resize(len as usize, T::default());
        root_process.broadcast_into(&mut items[..]);
    }

    fn broadcast_scalar<T: BroadcastElement + Copy>(&self, value: &mut T, root: usize) {
        let root_process = self.world.process_at_rank(root as i32);
        root_process.broadcast_into(value);
    }
}
