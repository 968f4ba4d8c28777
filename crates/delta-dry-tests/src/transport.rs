// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scripted byte transport that simulates a slow transmitter.

use bytes::{BufMut, Bytes, BytesMut};
use delta_core::instrument::EngineObserver;
use delta_wire::{ByteTransport, CommandProtocol, Step, TransportError};
use std::cell::Cell;
use std::collections::VecDeque;

/// Upper bound on steps [`run_to_idle`] takes before giving up.
pub const RUN_STEP_LIMIT: u64 = 1 << 20;

/// [`ByteTransport`] that reports `busy` for a fixed number of polls after
/// every send, the way a UART transmitter holds its busy line for a byte time.
///
/// # Example
///
/// ```
/// use delta_dry_tests::ScriptedTransport;
/// use delta_wire::ByteTransport;
///
/// let mut t = ScriptedTransport::with_busy_cycles(2);
/// t.send(0x80).unwrap();
/// assert!(t.busy());
/// assert!(t.busy());
/// assert!(!t.busy());
/// assert_eq!(t.busy_polls(), 2);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    rx: VecDeque<u8>,
    tx: BytesMut,
    busy_cycles: u32,
    busy_left: Cell<u32>,
    busy_polls: Cell<u64>,
    sends: u64,
}

impl ScriptedTransport {
    /// Transport that is never busy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport busy for `cycles` polls after each send.
    pub fn with_busy_cycles(cycles: u32) -> Self {
        Self {
            busy_cycles: cycles,
            ..Self::default()
        }
    }

    /// Appends bytes to the receive script.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Bytes not yet received.
    pub fn pending_input(&self) -> usize {
        self.rx.len()
    }

    /// Everything sent so far, without draining it.
    pub fn output(&self) -> &[u8] {
        &self.tx
    }

    /// Drains everything sent so far.
    pub fn take_output(&mut self) -> Bytes {
        self.tx.split().freeze()
    }

    /// Number of `busy` polls that answered `true`.
    pub fn busy_polls(&self) -> u64 {
        self.busy_polls.get()
    }

    /// Number of bytes sent.
    pub fn sends(&self) -> u64 {
        self.sends
    }
}

impl ByteTransport for ScriptedTransport {
    fn receive(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn send(&mut self, byte: u8) -> Result<(), TransportError> {
        self.tx.put_u8(byte);
        self.sends += 1;
        self.busy_left.set(self.busy_cycles);
        Ok(())
    }

    fn busy(&self) -> bool {
        let left = self.busy_left.get();
        if left == 0 {
            return false;
        }
        self.busy_left.set(left - 1);
        self.busy_polls.set(self.busy_polls.get() + 1);
        true
    }
}

/// Steps `protocol` until it is starved for input, riding out busy cycles.
///
/// Returns the number of non-starved steps taken. Stops early after
/// [`RUN_STEP_LIMIT`] steps.
pub fn run_to_idle<O, T>(protocol: &mut CommandProtocol<O>, transport: &mut T) -> Result<u64, TransportError>
where
    O: EngineObserver,
    T: ByteTransport + ?Sized,
{
    let mut steps = 0;
    while steps < RUN_STEP_LIMIT {
        match protocol.step(transport)? {
            Step::Starved => break,
            Step::Progressed | Step::Blocked => steps += 1,
        }
    }
    Ok(steps)
}
