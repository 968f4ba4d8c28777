// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Engine-level errors returned synchronously at the API boundary.

use crate::word::WidthError;

/// Errors returned by [`ParallelAccumulator`](crate::ParallelAccumulator) operations.
///
/// Every failing call leaves the engine state unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Wide-parallel lanes did not match the bank count.
    #[error("[ENGINE_LANE_MISMATCH] expected {expected} lanes, got {deltas} deltas and {valid} valid flags")]
    LaneMismatch {
        /// Number of banks.
        expected: usize,
        /// Length of the delta slice.
        deltas: usize,
        /// Length of the validity mask.
        valid: usize,
    },
    /// An engine needs at least one bank.
    #[error("[ENGINE_NO_BANKS] bank count must be at least 1")]
    NoBanks,
    /// Bulk ingestion needs at least one worker.
    #[error("[ENGINE_NO_WORKERS] worker count must be at least 1")]
    NoWorkers,
    /// Width rejected.
    #[error(transparent)]
    Width(#[from] WidthError),
}
