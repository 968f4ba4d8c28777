// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Byte transport port and an in-memory queue adapter.

use bytes::{BufMut, Bytes, BytesMut};
use std::collections::VecDeque;

/// Errors a transport can report on send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The peer is gone; nothing more can be sent.
    #[error("[TRANSPORT_CLOSED] transport closed")]
    Closed,
}

/// Reliable, ordered, one-byte-at-a-time channel.
///
/// `receive` yields bytes in arrival order. `send` queues one byte; while it
/// is in flight `busy` reports `true` and callers must not send another.
pub trait ByteTransport {
    /// Next received byte, or `None` when nothing is buffered.
    fn receive(&mut self) -> Option<u8>;
    /// Queues one byte for transmission.
    fn send(&mut self, byte: u8) -> Result<(), TransportError>;
    /// True while a previously sent byte is still in flight.
    fn busy(&self) -> bool;
}

/// In-memory transport backed by a bounded receive queue and an output buffer.
///
/// Socket adapters feed received bytes in with [`feed`](Self::feed) and drain
/// protocol output with [`take_output`](Self::take_output). Sends complete
/// immediately, so the transport is never busy.
#[derive(Debug)]
pub struct QueueTransport {
    rx: VecDeque<u8>,
    tx: BytesMut,
    capacity: usize,
    closed: bool,
}

impl QueueTransport {
    /// Receive queue holding at most `capacity` bytes (minimum one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rx: VecDeque::with_capacity(capacity.min(4096)),
            tx: BytesMut::new(),
            capacity,
            closed: false,
        }
    }

    /// Receive queue without a bound.
    pub fn unbounded() -> Self {
        Self::with_capacity(usize::MAX)
    }

    /// Queues as many of `bytes` as fit and returns how many were accepted.
    ///
    /// A short count is backpressure: the caller keeps the rest and retries
    /// once the protocol has consumed some input.
    pub fn feed(&mut self, bytes: &[u8]) -> usize {
        let room = self.capacity.saturating_sub(self.rx.len());
        let accepted = room.min(bytes.len());
        self.rx.extend(&bytes[..accepted]);
        accepted
    }

    /// Bytes waiting to be received.
    pub fn pending_input(&self) -> usize {
        self.rx.len()
    }

    /// Drops buffered input.
    pub fn discard_input(&mut self) {
        self.rx.clear();
    }

    /// Takes everything sent so far.
    pub fn take_output(&mut self) -> Bytes {
        self.tx.split().freeze()
    }

    /// Refuses further sends.
    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl Default for QueueTransport {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl ByteTransport for QueueTransport {
    fn receive(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn send(&mut self, byte: u8) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.tx.put_u8(byte);
        Ok(())
    }

    fn busy(&self) -> bool {
        false
    }
}
