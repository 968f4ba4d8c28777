// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Banked XOR accumulator with round-robin and wide-parallel dispatch.
//!
//! # State
//!
//! ```text
//! CurrentState = InitialState ^ merge(bank[0], .., bank[N-1])
//! ```
//!
//! `CurrentState` is derived on every [`read`](ParallelAccumulator::read); it
//! is never stored.
//!
//! # Dispatch Topologies
//!
//! Both topologies feed the same bank array:
//!
//! - [`accumulate`](ParallelAccumulator::accumulate) routes one delta to
//!   `bank[cursor % N]` and advances the cursor.
//! - [`accumulate_parallel`](ParallelAccumulator::accumulate_parallel) applies
//!   up to N deltas, lane `i` to bank `i`, inside one `&mut` step.
//!
//! [`submit`](ParallelAccumulator::submit) selects between the two by
//! [`DispatchMode`].

use crate::bank::DeltaBank;
use crate::error::EngineError;
use crate::merge::MergeStrategy;
use crate::word::{DeltaWidth, DeltaWord};

/// Which entry point bulk submissions are routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DispatchMode {
    /// One delta per operation, cycling across banks.
    #[default]
    RoundRobin,
    /// Up to N deltas per operation, one per bank lane.
    WideParallel,
}

/// What LOAD does to the bank accumulators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LoadPolicy {
    /// LOAD replaces only the initial state; accumulated deltas survive.
    #[default]
    PreserveBanks,
    /// LOAD also zeroes every bank and rewinds the dispatch cursor.
    ClearBanks,
}

/// Read-only counters describing what an accumulator has done.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccumulatorStats {
    /// Deltas applied through any entry point.
    pub accumulated: u64,
    /// Wide-parallel steps taken.
    pub wide_steps: u64,
    /// LOAD operations.
    pub loads: u64,
    /// Full resets.
    pub resets: u64,
    /// Round-robin cursor.
    pub cursor: u64,
    /// Per-bank values, bank 0 first.
    pub banks: Vec<DeltaWord>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    accumulated: u64,
    wide_steps: u64,
    loads: u64,
    resets: u64,
}

/// N-bank XOR accumulator plus the LOADed baseline.
///
/// Engines share nothing: every instance owns its initial state, banks and
/// cursor.
#[derive(Debug, Clone)]
pub struct ParallelAccumulator {
    width: DeltaWidth,
    mode: DispatchMode,
    load_policy: LoadPolicy,
    merge: MergeStrategy,
    initial: DeltaWord,
    banks: Vec<DeltaBank>,
    cursor: u64,
    counters: Counters,
}

impl ParallelAccumulator {
    /// Creates a zeroed engine with `n_banks` banks.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoBanks`] when `n_banks == 0`.
    pub fn new(width: DeltaWidth, n_banks: usize, mode: DispatchMode) -> Result<Self, EngineError> {
        if n_banks == 0 {
            return Err(EngineError::NoBanks);
        }
        Ok(Self {
            width,
            mode,
            load_policy: LoadPolicy::default(),
            merge: MergeStrategy::default(),
            initial: DeltaWord::ZERO,
            banks: vec![DeltaBank::new(); n_banks],
            cursor: 0,
            counters: Counters::default(),
        })
    }

    /// Sets the LOAD policy.
    pub fn with_load_policy(mut self, policy: LoadPolicy) -> Self {
        self.load_policy = policy;
        self
    }

    /// Sets the merge fold shape.
    pub fn with_merge_strategy(mut self, merge: MergeStrategy) -> Self {
        self.merge = merge;
        self
    }

    /// Word width.
    pub fn width(&self) -> DeltaWidth {
        self.width
    }

    /// Number of banks (N).
    pub fn bank_count(&self) -> usize {
        self.banks.len()
    }

    /// Configured dispatch mode.
    pub fn dispatch_mode(&self) -> DispatchMode {
        self.mode
    }

    /// Configured LOAD policy.
    pub fn load_policy(&self) -> LoadPolicy {
        self.load_policy
    }

    /// Configured merge fold.
    pub fn merge_strategy(&self) -> MergeStrategy {
        self.merge
    }

    /// The LOADed baseline (S₀).
    pub fn initial_state(&self) -> DeltaWord {
        self.initial
    }

    /// Round-robin cursor (total single-delta dispatches since the last clear).
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Bank values, bank 0 first.
    pub fn bank_values(&self) -> Vec<DeltaWord> {
        self.banks.iter().map(DeltaBank::get).collect()
    }

    /// Sets the initial state. Banks are touched only under
    /// [`LoadPolicy::ClearBanks`].
    pub fn load_initial(&mut self, value: DeltaWord) {
        self.initial = self.width.truncate(value);
        if self.load_policy == LoadPolicy::ClearBanks {
            self.clear_banks();
        }
        self.counters.loads += 1;
    }

    /// Round-robin dispatch of one delta to `bank[cursor % N]`.
    pub fn accumulate(&mut self, delta: DeltaWord) {
        let bank = self.next_bank();
        self.banks[bank].accept(self.width.truncate(delta));
        self.cursor = self.cursor.wrapping_add(1);
        self.counters.accumulated += 1;
    }

    /// Wide-parallel dispatch: lane `i` goes to bank `i` when `valid[i]`.
    ///
    /// All lanes land within this one call; nothing can observe a partially
    /// applied step.
    ///
    /// # Errors
    ///
    /// [`EngineError::LaneMismatch`] when either slice length differs from
    /// the bank count. The engine is left unchanged.
    pub fn accumulate_parallel(
        &mut self,
        deltas: &[DeltaWord],
        valid: &[bool],
    ) -> Result<(), EngineError> {
        let expected = self.banks.len();
        if deltas.len() != expected || valid.len() != expected {
            return Err(EngineError::LaneMismatch {
                expected,
                deltas: deltas.len(),
                valid: valid.len(),
            });
        }
        let width = self.width;
        for ((bank, delta), ok) in self.banks.iter_mut().zip(deltas).zip(valid) {
            if *ok {
                bank.accept(width.truncate(*delta));
                self.counters.accumulated += 1;
            }
        }
        self.counters.wide_steps += 1;
        Ok(())
    }

    /// Routes a batch through the configured [`DispatchMode`].
    ///
    /// Wide-parallel batches are cut into N-lane steps; a short tail step
    /// marks its missing lanes invalid.
    pub fn submit(&mut self, batch: &[DeltaWord]) -> Result<(), EngineError> {
        match self.mode {
            DispatchMode::RoundRobin => {
                for delta in batch {
                    self.accumulate(*delta);
                }
            }
            DispatchMode::WideParallel => {
                let n = self.banks.len();
                let mut lanes = vec![DeltaWord::ZERO; n];
                let mut valid = vec![false; n];
                for chunk in batch.chunks(n) {
                    for (i, (lane, ok)) in lanes.iter_mut().zip(valid.iter_mut()).enumerate() {
                        *lane = chunk.get(i).copied().unwrap_or(DeltaWord::ZERO);
                        *ok = i < chunk.len();
                    }
                    self.accumulate_parallel(&lanes, &valid)?;
                }
            }
        }
        Ok(())
    }

    /// XOR-reduce of every bank.
    pub fn merge(&self) -> DeltaWord {
        self.merge.fold(&self.bank_values())
    }

    /// `InitialState ^ merge(banks)`.
    pub fn read(&self) -> DeltaWord {
        self.initial ^ self.merge()
    }

    /// True iff the merged accumulator is zero.
    pub fn is_zero(&self) -> bool {
        self.merge().is_zero()
    }

    /// Clears the initial state, every bank and the cursor.
    pub fn reset(&mut self) {
        self.initial = DeltaWord::ZERO;
        self.clear_banks();
        self.counters.resets += 1;
    }

    /// Snapshot of counters and bank values.
    pub fn stats(&self) -> AccumulatorStats {
        AccumulatorStats {
            accumulated: self.counters.accumulated,
            wide_steps: self.counters.wide_steps,
            loads: self.counters.loads,
            resets: self.counters.resets,
            cursor: self.cursor,
            banks: self.bank_values(),
        }
    }

    fn next_bank(&self) -> usize {
        // bank count is non-zero and fits in usize, so the remainder does too
        (self.cursor % self.banks.len() as u64) as usize
    }

    fn clear_banks(&mut self) {
        for bank in &mut self.banks {
            bank.reset();
        }
        self.cursor = 0;
    }

    pub(crate) fn apply_partials(&mut self, partials: &[DeltaWord], applied: usize) {
        for (bank, partial) in self.banks.iter_mut().zip(partials) {
            bank.accept(*partial);
        }
        self.cursor = self.cursor.wrapping_add(applied as u64);
        self.counters.accumulated += applied as u64;
    }
}
