// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for delta crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`reference`] - Reference XOR fold and the fixed scenario patterns
//! - [`transport`] - Scripted byte transport with simulated busy cycles

pub mod config;
pub mod reference;
pub mod transport;

// Re-export commonly used items at crate root for convenience
pub use config::InMemoryConfigStore;
pub use reference::{reference_fold, ALTERNATING_5, ALTERNATING_A, SCENARIO_B_DELTAS};
pub use transport::{run_to_idle, ScriptedTransport};
