// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Engine-side command state machine.
//!
//! ```text
//! Idle ──opcode──▶ CollectingPayload ──last byte──▶ Dispatch ──▶ Responding ──last byte──▶ Idle
//!   │                                                  ▲   │
//!   └──payload-less opcode─────────────────────────────┘   └──no response──▶ Idle
//! ```
//!
//! Each call to [`CommandProtocol::step`] performs at most one transition.
//! The machine never reads the next opcode until the current command, including
//! its response, has finished.

use delta_core::instrument::{EngineObserver, LogicalClock, OpEvent, OpKind, OpPhase};
use delta_core::{DeltaWidth, DeltaWord, ParallelAccumulator};
use tracing::{debug, trace};

use crate::frame::{Command, Opcode, STATUS_NONZERO, STATUS_ZERO};
use crate::transport::{ByteTransport, TransportError};

const MAX_RESPONSE: usize = 16;

/// Where the state machine is within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    /// Waiting for an opcode byte.
    Idle,
    /// Assembling a big-endian payload.
    CollectingPayload {
        /// Command being assembled.
        opcode: Opcode,
        /// Payload bytes the command takes.
        needed: usize,
        /// Payload bytes received so far.
        received: usize,
    },
    /// Frame complete; the next step executes it.
    Dispatch {
        /// Command to execute.
        command: Command,
    },
    /// Transmitting the response one byte at a time.
    Responding {
        /// Command being answered.
        opcode: Opcode,
        /// Bytes already handed to the transport.
        sent: usize,
        /// Response length.
        len: usize,
    },
}

impl ProtocolState {
    /// The opcode of the frame in progress, if any.
    pub const fn opcode(&self) -> Option<Opcode> {
        match self {
            Self::Idle => None,
            Self::CollectingPayload { opcode, .. } | Self::Responding { opcode, .. } => {
                Some(*opcode)
            }
            Self::Dispatch { command } => Some(command.opcode()),
        }
    }
}

/// Outcome of one [`CommandProtocol::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nothing to do until more input arrives.
    Starved,
    /// A transition happened.
    Progressed,
    /// A response byte is ready but the transport is busy.
    Blocked,
}

/// Byte-framed front end owning one engine.
///
/// The observer only ever sees the logical clock and operation events; it has
/// no path to the engine.
#[derive(Debug)]
pub struct CommandProtocol<O = ()> {
    engine: ParallelAccumulator,
    observer: O,
    clock: LogicalClock,
    state: ProtocolState,
    payload: u128,
    response: [u8; MAX_RESPONSE],
}

impl CommandProtocol<()> {
    /// Protocol without instrumentation.
    pub fn new(engine: ParallelAccumulator) -> Self {
        Self::with_observer(engine, ())
    }
}

impl<O: EngineObserver> CommandProtocol<O> {
    /// Protocol reporting steps and operation events to `observer`.
    pub fn with_observer(engine: ParallelAccumulator, observer: O) -> Self {
        Self {
            engine,
            observer,
            clock: LogicalClock::default(),
            state: ProtocolState::Idle,
            payload: 0,
            response: [0; MAX_RESPONSE],
        }
    }

    /// Word width the frames are sized for.
    pub fn width(&self) -> DeltaWidth {
        self.engine.width()
    }

    /// Current state.
    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// True unless idle.
    pub fn is_mid_frame(&self) -> bool {
        self.state != ProtocolState::Idle
    }

    /// Logical steps taken so far.
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// The engine, read-only.
    pub fn engine(&self) -> &ParallelAccumulator {
        &self.engine
    }

    /// The engine, for bulk entry points that bypass the byte protocol.
    ///
    /// Must only be used between frames.
    pub fn engine_mut(&mut self) -> &mut ParallelAccumulator {
        &mut self.engine
    }

    /// The observer.
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// The observer, mutably (e.g. to start a perf counter).
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Consumes the protocol, returning the engine.
    pub fn into_engine(self) -> ParallelAccumulator {
        self.engine
    }

    /// Performs at most one transition.
    ///
    /// # Errors
    /// Propagates a failed send; the byte is retried on the next step.
    pub fn step<T: ByteTransport + ?Sized>(&mut self, transport: &mut T) -> Result<Step, TransportError> {
        match self.state {
            ProtocolState::Idle => {
                let Some(byte) = transport.receive() else {
                    return Ok(Step::Starved);
                };
                let now = self.advance();
                match Opcode::from_byte(byte) {
                    Some(opcode) => self.begin(opcode, now),
                    None => trace!(byte, "ignoring unknown opcode"),
                }
                Ok(Step::Progressed)
            }
            ProtocolState::CollectingPayload {
                opcode,
                needed,
                received,
            } => {
                let Some(byte) = transport.receive() else {
                    return Ok(Step::Starved);
                };
                self.advance();
                self.payload = (self.payload << 8) | u128::from(byte);
                let received = received + 1;
                self.state = if received == needed {
                    let payload = self.width().truncate(DeltaWord(self.payload));
                    ProtocolState::Dispatch {
                        command: Command::from_parts(opcode, payload),
                    }
                } else {
                    ProtocolState::CollectingPayload {
                        opcode,
                        needed,
                        received,
                    }
                };
                Ok(Step::Progressed)
            }
            ProtocolState::Dispatch { command } => {
                let now = self.advance();
                self.dispatch(command, now);
                Ok(Step::Progressed)
            }
            ProtocolState::Responding { opcode, sent, len } => {
                if transport.busy() {
                    self.advance();
                    return Ok(Step::Blocked);
                }
                transport.send(self.response[sent])?;
                let now = self.advance();
                let sent = sent + 1;
                if sent == len {
                    self.state = ProtocolState::Idle;
                    self.emit(opcode.kind(), OpPhase::End, now);
                } else {
                    self.state = ProtocolState::Responding { opcode, sent, len };
                }
                Ok(Step::Progressed)
            }
        }
    }

    /// Steps until starved or blocked, returning the transitions taken.
    ///
    /// # Errors
    /// Propagates a failed send.
    pub fn pump<T: ByteTransport + ?Sized>(&mut self, transport: &mut T) -> Result<u64, TransportError> {
        let mut taken = 0;
        while self.step(transport)? == Step::Progressed {
            taken += 1;
        }
        Ok(taken)
    }

    /// Drops the frame in progress and returns to idle; engine state is kept.
    ///
    /// Returns `true` if a frame was discarded.
    pub fn abort_frame(&mut self) -> bool {
        let Some(opcode) = self.state.opcode() else {
            return false;
        };
        debug!(?opcode, state = ?self.state, "aborting frame");
        self.state = ProtocolState::Idle;
        self.payload = 0;
        let now = self.clock.now();
        self.emit(opcode.kind(), OpPhase::Abort, now);
        true
    }

    /// Aborts any frame in progress and zeroes the engine.
    pub fn reset(&mut self) {
        self.abort_frame();
        let now = self.clock.now();
        self.emit(OpKind::Reset, OpPhase::Begin, now);
        self.engine.reset();
        self.emit(OpKind::Reset, OpPhase::End, now);
        debug!("engine reset");
    }

    fn advance(&mut self) -> u64 {
        let now = self.clock.tick();
        self.observer.on_step(now);
        now
    }

    fn emit(&mut self, kind: OpKind, phase: OpPhase, at: u64) {
        self.observer.on_event(&OpEvent { kind, phase, at });
    }

    fn begin(&mut self, opcode: Opcode, now: u64) {
        trace!(?opcode, "opcode");
        self.emit(opcode.kind(), OpPhase::Begin, now);
        self.payload = 0;
        let needed = opcode.payload_len(self.width());
        self.state = if needed == 0 {
            ProtocolState::Dispatch {
                command: Command::from_parts(opcode, DeltaWord::ZERO),
            }
        } else {
            ProtocolState::CollectingPayload {
                opcode,
                needed,
                received: 0,
            }
        };
    }

    fn dispatch(&mut self, command: Command, now: u64) {
        debug!(?command, "dispatch");
        let width = self.width();
        let len = command.expected_response_len(width);
        match command {
            Command::Load(value) => self.engine.load_initial(value),
            Command::Accumulate(delta) => self.engine.accumulate(delta),
            Command::Read => self.stage_word(width, self.engine.read()),
            Command::Debug => self.stage_word(width, self.engine.initial_state()),
            Command::Status => {
                self.response[0] = if self.engine.is_zero() {
                    STATUS_ZERO
                } else {
                    STATUS_NONZERO
                };
            }
        }
        let opcode = command.opcode();
        self.payload = 0;
        if len == 0 {
            self.state = ProtocolState::Idle;
            self.emit(opcode.kind(), OpPhase::End, now);
        } else {
            self.state = ProtocolState::Responding {
                opcode,
                sent: 0,
                len,
            };
        }
    }

    fn stage_word(&mut self, width: DeltaWidth, word: DeltaWord) {
        let bytes = width.to_be_bytes(word);
        self.response[..bytes.len()].copy_from_slice(&bytes);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::transport::QueueTransport;
    use delta_core::DispatchMode;

    fn protocol() -> CommandProtocol {
        let engine = ParallelAccumulator::new(DeltaWidth::W64, 4, DispatchMode::RoundRobin)
            .expect("engine");
        CommandProtocol::new(engine)
    }

    #[test]
    fn starved_when_no_input() {
        let mut p = protocol();
        let mut t = QueueTransport::unbounded();
        assert_eq!(p.step(&mut t).unwrap(), Step::Starved);
        assert_eq!(p.now(), 0);
    }

    #[test]
    fn unknown_opcode_consumes_one_byte_and_stays_idle() {
        let mut p = protocol();
        let mut t = QueueTransport::unbounded();
        t.feed(&[b'Z']);
        assert_eq!(p.step(&mut t).unwrap(), Step::Progressed);
        assert_eq!(p.state(), ProtocolState::Idle);
        assert!(t.take_output().is_empty());
    }

    #[test]
    fn payload_bytes_shift_in_msb_first() {
        let mut p = protocol();
        let mut t = QueueTransport::unbounded();
        t.feed(&[b'L', 0x01, 0x02]);
        p.pump(&mut t).unwrap();
        assert_eq!(
            p.state(),
            ProtocolState::CollectingPayload {
                opcode: Opcode::Load,
                needed: 8,
                received: 2
            }
        );
        t.feed(&[0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
        p.pump(&mut t).unwrap();
        assert_eq!(p.state(), ProtocolState::Idle);
        assert_eq!(p.engine().initial_state(), DeltaWord::from(0x0102_0304_0506_0708u64));
    }

    #[test]
    fn read_transmits_state_msb_first() {
        let mut p = protocol();
        let mut t = QueueTransport::unbounded();
        p.engine_mut().load_initial(DeltaWord::from(0xA1B2_C3D4_E5F6_0718u64));
        t.feed(&[b'R']);
        p.pump(&mut t).unwrap();
        assert_eq!(
            &t.take_output()[..],
            &[0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6, 0x07, 0x18]
        );
    }

    #[test]
    fn abort_discards_partial_payload_but_keeps_engine() {
        let mut p = protocol();
        let mut t = QueueTransport::unbounded();
        t.feed(&[b'A', 0, 0, 0, 0, 0, 0, 0, 1]);
        p.pump(&mut t).unwrap();
        t.feed(&[b'A', 0xFF, 0xFF]);
        p.pump(&mut t).unwrap();
        assert!(p.is_mid_frame());
        assert!(p.abort_frame());
        assert!(!p.abort_frame());
        assert_eq!(p.engine().merge(), DeltaWord::from(1u64));

        // the next byte is treated as an opcode again
        t.feed(&[b'S']);
        p.pump(&mut t).unwrap();
        assert_eq!(&t.take_output()[..], &[STATUS_NONZERO]);
    }

    #[test]
    fn reset_zeroes_engine_and_framing() {
        let mut p = protocol();
        let mut t = QueueTransport::unbounded();
        t.feed(&[b'L', 0, 0, 0, 0, 0, 0, 0, 9, b'A', 0, 0]);
        p.pump(&mut t).unwrap();
        p.reset();
        assert_eq!(p.state(), ProtocolState::Idle);
        assert_eq!(p.engine().read(), DeltaWord::ZERO);
        assert_eq!(p.engine().cursor(), 0);
    }

    #[test]
    fn failed_send_is_retried() {
        let mut p = protocol();
        let mut t = QueueTransport::unbounded();
        t.feed(&[b'S']);
        t.close();
        p.step(&mut t).unwrap();
        p.step(&mut t).unwrap();
        assert_eq!(p.step(&mut t), Err(TransportError::Closed));
        assert!(matches!(p.state(), ProtocolState::Responding { sent: 0, .. }));
    }
}
