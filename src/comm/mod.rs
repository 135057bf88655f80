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

//! Communicator abstraction over the "MPI transport" external collaborator, plus the
//! master/worker job dispatcher that sits on top of it.
//!
//! [`SingleProcessComm`] is the default and requires no system MPI installation; the `mpi`
//! Cargo feature adds [`rsmpi::RsmpiComm`], a thin wrapper around the real `mpi` crate for
//! callers that do have a system MPI available.

mod dispatcher;
mod single_process;

#[cfg(feature = "mpi")]
pub mod rsmpi;

pub use dispatcher::{JobId, MpiDispatcher};
pub use single_process::SingleProcessComm;

/// Marker bound for values that can cross a [`Communicator`] broadcast.
///
/// Without the `mpi` feature this is just `Clone + Default`; with it, it also requires
/// `mpi::traits::Equivalence` so [`rsmpi::RsmpiComm`] can hand the value straight to the
/// underlying MPI call. Keeping the extra bound behind the feature means the default,
/// system-MPI-free build never needs to name the `mpi` crate's types.
#[cfg(not(feature = "mpi"))]
pub trait BroadcastElement: Clone + Default {}
#[cfg(not(feature = "mpi"))]
impl<T: Clone + Default> BroadcastElement for T {}

#[cfg(feature = "mpi")]
pub trait BroadcastElement: Clone + Default + mpi::traits::Equivalence {}
#[cfg(feature = "mpi")]
impl<T: Clone + Default + mpi::traits::Equivalence> BroadcastElement for T {}

/// Abstraction over point-to-point broadcast and rank/size queries, the minimal surface the
/// correlator assembly and the job dispatcher need from an MPI-like transport.
pub trait Communicator {
    /// This process's rank.
    fn rank(&self) -> usize;

    /// Total number of ranks in the communicator.
    fn size(&self) -> usize;

    /// Broadcasts `items` from `root` to every rank, growing or shrinking the receivers'
    /// vectors to match the sender's.
    fn broadcast_vec<T: BroadcastElement>(&self, items: &mut Vec<T>, root: usize);

    /// Broadcasts a single scalar value from `root` to every rank.
    fn broadcast_scalar<T: BroadcastElement + Copy>(&self, value: &mut T, root: usize);
}
