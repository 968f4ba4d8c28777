// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Construction-time engine parameters.

use crate::accumulator::{DispatchMode, LoadPolicy, ParallelAccumulator};
use crate::error::EngineError;
use crate::merge::MergeStrategy;
use crate::word::DeltaWidth;

/// Default bank count.
pub const DEFAULT_BANKS: usize = 4;

/// Parameters an engine is built from.
///
/// With the `serde` feature every field is optional on input and falls back to
/// [`EngineConfig::default`]; `width_bits` is validated on deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Word width `W`.
    #[cfg_attr(feature = "serde", serde(rename = "width_bits"))]
    pub width: DeltaWidth,
    /// Number of banks `N`.
    pub banks: usize,
    /// Bulk dispatch topology.
    pub dispatch: DispatchMode,
    /// LOAD behaviour towards the banks.
    pub load_policy: LoadPolicy,
    /// Merge fold shape.
    pub merge: MergeStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: DeltaWidth::W64,
            banks: DEFAULT_BANKS,
            dispatch: DispatchMode::RoundRobin,
            load_policy: LoadPolicy::PreserveBanks,
            merge: MergeStrategy::Tree,
        }
    }
}

impl EngineConfig {
    /// Builds a zeroed engine from these parameters.
    pub fn build(&self) -> Result<ParallelAccumulator, EngineError> {
        Ok(ParallelAccumulator::new(self.width, self.banks, self.dispatch)?
            .with_load_policy(self.load_policy)
            .with_merge_strategy(self.merge))
    }
}
