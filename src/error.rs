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

use thiserror::Error;

use crate::thermal::Status;

/// Errors that can occur while building or evaluating the exact-diagonalization engine.
#[derive(Debug, Error, PartialEq)]
pub enum EdError {
    /// An operation was invoked before its prerequisite lifecycle phase was reached.
    #[error("operation `{op}` requires status {expected:?}, object is at {found:?}")]
    StatusMismatch {
        /// The status the object needed to be in.
        expected: Status,
        /// The status the object was actually in.
        found: Status,
        /// Name of the operation that was attempted.
        op: &'static str,
    },
    /// The expression or Hilbert space could not be constructed as requested.
    #[error("construction failed: {0}")]
    ConstructionError(String),
    /// A numerical sanity check failed (Hermiticity, eigensolver convergence).
    #[error("numeric error: {0}")]
    NumericError(String),
    /// A requested block, state, or single-particle index does not exist.
    #[error("{what} index {index} is out of range")]
    OutOfRange {
        /// Name of the quantity that was out of range (block, state, particle index, ...).
        what: &'static str,
        /// The offending index.
        index: i64,
    },
}

/// Convenience alias for results returned by this crate's fallible operations.
pub type EdResult<T> = Result<T, EdError>;
