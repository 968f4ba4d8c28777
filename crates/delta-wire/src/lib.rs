// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! delta-wire: byte-framed command protocol for the delta accumulation engine.
//!
//! The engine side is [`CommandProtocol`], a step-driven state machine over any
//! [`ByteTransport`]. The host side is the [`frame`] codec, which builds the same
//! frames and decodes the fixed-size responses.
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
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::use_self
)]

use std::path::PathBuf;

/// Opcodes, frames and response decoding.
pub mod frame;
mod protocol;
mod transport;

pub use frame::{Command, FrameError, Opcode, STATUS_NONZERO, STATUS_ZERO};
pub use protocol::{CommandProtocol, ProtocolState, Step};
pub use transport::{ByteTransport, QueueTransport, TransportError};

/// Default Unix socket path for the node.
///
/// Prefers a per-user runtime dir (`XDG_RUNTIME_DIR`) and falls back to `/tmp`
/// when unavailable.
pub fn default_socket_path() -> PathBuf {
    let base = std::env::var_os("XDG_RUNTIME_DIR").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
    base.join("deltad.sock")
}
