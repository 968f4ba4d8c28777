// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for delta tools (config, node prefs).
//! Keeps the daemon and CLI adapters thin.

pub mod config;
pub mod prefs;
