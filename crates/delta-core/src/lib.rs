// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! delta-core: banked XOR delta-accumulation engine.
//!
//! State is a LOADed baseline plus N bank accumulators. Deltas are XORed into
//! banks either one per operation (round-robin) or up to N per operation
//! (wide-parallel); the current state is the baseline XOR the merged banks.
//! XOR's commutativity, associativity and self-inverse property are the only
//! correctness mechanism the dispatch and merge paths rely on.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::use_self
)]

mod accumulator;
mod bank;
mod config;
mod error;
/// Passive observers of engine operations.
pub mod instrument;
/// Order-independent folds over bank values.
pub mod merge;
mod parallel;
mod word;

/// Banked accumulator, dispatch topologies and LOAD policy.
pub use accumulator::{AccumulatorStats, DispatchMode, LoadPolicy, ParallelAccumulator};
/// Single-partition accumulator.
pub use bank::DeltaBank;
/// Construction-time parameters.
pub use config::{EngineConfig, DEFAULT_BANKS};
/// Engine-level errors.
pub use error::EngineError;
/// Fold shapes.
pub use merge::MergeStrategy;
/// Delta words and their width.
pub use word::{DeltaWidth, DeltaWord, WidthError};
