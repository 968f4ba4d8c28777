// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Opcodes, command frames and fixed-size responses.
//!
//! Frame layout:
//!
//! ```text
//! OPCODE(1) || PAYLOAD(0 or W/8, big-endian)
//! ```
//!
//! | Opcode | Byte | Payload | Response |
//! |---|---|---|---|
//! | LOAD | `0x4C` `'L'` | W/8 | none |
//! | ACCUMULATE | `0x41` `'A'` | W/8 | none |
//! | READ | `0x52` `'R'` | none | W/8, current state |
//! | STATUS | `0x53` `'S'` | none | 1: `0x80` zero / `0x00` non-zero |
//! | DEBUG | `0x44` `'D'` | none | W/8, initial state |
//!
//! There is no checksum, acknowledgement or error byte.

use bytes::{BufMut, Bytes, BytesMut};
use delta_core::instrument::OpKind;
use delta_core::{DeltaWidth, DeltaWord, WidthError};

/// STATUS response when the merged accumulator is zero.
pub const STATUS_ZERO: u8 = 0x80;
/// STATUS response when the merged accumulator is non-zero.
pub const STATUS_NONZERO: u8 = 0x00;

/// Host-side framing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Byte is not a known opcode.
    #[error("[FRAME_UNKNOWN_OPCODE] {0:#04x}")]
    UnknownOpcode(u8),
    /// A response had the wrong length.
    #[error("[FRAME_RESPONSE_LEN] expected {expected} bytes, got {actual}")]
    ResponseLength {
        /// Bytes the command answers with.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
    /// Payload did not fit the width.
    #[error(transparent)]
    Width(#[from] WidthError),
}

/// Command opcode bytes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// `'L'`: set the initial state.
    Load = 0x4C,
    /// `'A'`: accumulate one delta (round-robin).
    Accumulate = 0x41,
    /// `'R'`: read the current state.
    Read = 0x52,
    /// `'S'`: query the zero flag.
    Status = 0x53,
    /// `'D'`: read back the initial state.
    Debug = 0x44,
}

impl Opcode {
    /// Every opcode, in table order.
    pub const ALL: [Self; 5] = [
        Self::Load,
        Self::Accumulate,
        Self::Read,
        Self::Status,
        Self::Debug,
    ];

    /// Recognizes an opcode byte.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x4C => Some(Self::Load),
            0x41 => Some(Self::Accumulate),
            0x52 => Some(Self::Read),
            0x53 => Some(Self::Status),
            0x44 => Some(Self::Debug),
            _ => None,
        }
    }

    /// The opcode byte.
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Payload bytes that follow the opcode.
    pub const fn payload_len(self, width: DeltaWidth) -> usize {
        match self {
            Self::Load | Self::Accumulate => width.bytes(),
            Self::Read | Self::Status | Self::Debug => 0,
        }
    }

    /// Response bytes the engine transmits.
    pub const fn response_len(self, width: DeltaWidth) -> usize {
        match self {
            Self::Read | Self::Debug => width.bytes(),
            Self::Status => 1,
            Self::Load | Self::Accumulate => 0,
        }
    }

    /// Instrumentation kind.
    pub const fn kind(self) -> OpKind {
        match self {
            Self::Load => OpKind::Load,
            Self::Accumulate => OpKind::Accumulate,
            Self::Read => OpKind::Read,
            Self::Status => OpKind::Status,
            Self::Debug => OpKind::Debug,
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = FrameError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_byte(byte).ok_or(FrameError::UnknownOpcode(byte))
    }
}

/// A decoded command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Set the initial state.
    Load(DeltaWord),
    /// Accumulate one delta.
    Accumulate(DeltaWord),
    /// Read the current state.
    Read,
    /// Query the zero flag.
    Status,
    /// Read back the initial state.
    Debug,
}

impl Command {
    /// Pairs an opcode with its assembled payload (ignored for payload-less opcodes).
    pub const fn from_parts(opcode: Opcode, payload: DeltaWord) -> Self {
        match opcode {
            Opcode::Load => Self::Load(payload),
            Opcode::Accumulate => Self::Accumulate(payload),
            Opcode::Read => Self::Read,
            Opcode::Status => Self::Status,
            Opcode::Debug => Self::Debug,
        }
    }

    /// The command's opcode.
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Load(_) => Opcode::Load,
            Self::Accumulate(_) => Opcode::Accumulate,
            Self::Read => Opcode::Read,
            Self::Status => Opcode::Status,
            Self::Debug => Opcode::Debug,
        }
    }

    /// Bytes the engine answers this command with.
    pub const fn expected_response_len(&self, width: DeltaWidth) -> usize {
        self.opcode().response_len(width)
    }

    /// Appends the frame to `dst`.
    pub fn encode(&self, width: DeltaWidth, dst: &mut BytesMut) {
        dst.put_u8(self.opcode().byte());
        match self {
            Self::Load(v) | Self::Accumulate(v) => dst.put_slice(&width.to_be_bytes(*v)),
            Self::Read | Self::Status | Self::Debug => {}
        }
    }

    /// The frame as a standalone buffer.
    pub fn to_frame(&self, width: DeltaWidth) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + self.opcode().payload_len(width));
        self.encode(width, &mut buf);
        buf.freeze()
    }
}

/// Decodes a READ or DEBUG response.
pub fn decode_state(width: DeltaWidth, bytes: &[u8]) -> Result<DeltaWord, FrameError> {
    if bytes.len() != width.bytes() {
        return Err(FrameError::ResponseLength {
            expected: width.bytes(),
            actual: bytes.len(),
        });
    }
    Ok(width.from_be_bytes(bytes)?)
}

/// Decodes a STATUS response; `true` means the accumulator is zero.
///
/// Only bit 7 is significant.
pub fn decode_status(bytes: &[u8]) -> Result<bool, FrameError> {
    match bytes {
        [flag] => Ok(flag & STATUS_ZERO != 0),
        _ => Err(FrameError::ResponseLength {
            expected: 1,
            actual: bytes.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn opcode_bytes_are_ascii_letters() {
        assert_eq!(Opcode::Load.byte(), b'L');
        assert_eq!(Opcode::Accumulate.byte(), b'A');
        assert_eq!(Opcode::Read.byte(), b'R');
        assert_eq!(Opcode::Status.byte(), b'S');
        assert_eq!(Opcode::Debug.byte(), b'D');
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_byte(op.byte()), Some(op));
        }
        assert_eq!(Opcode::try_from(b'X'), Err(FrameError::UnknownOpcode(b'X')));
    }

    #[test]
    fn load_frame_is_opcode_then_big_endian_payload() {
        let frame = Command::Load(DeltaWord::from(0x0102_0304_0506_0708u64)).to_frame(DeltaWidth::W64);
        assert_eq!(&frame[..], &[b'L', 1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn payloadless_frames_are_one_byte() {
        for cmd in [Command::Read, Command::Status, Command::Debug] {
            assert_eq!(cmd.to_frame(DeltaWidth::W64).len(), 1);
        }
    }

    #[test]
    fn response_lengths_follow_width() {
        let w = DeltaWidth::new(32).unwrap();
        assert_eq!(Command::Read.expected_response_len(w), 4);
        assert_eq!(Command::Debug.expected_response_len(w), 4);
        assert_eq!(Command::Status.expected_response_len(w), 1);
        assert_eq!(Command::Load(DeltaWord::ZERO).expected_response_len(w), 0);
    }

    #[test]
    fn status_decodes_bit_seven() {
        assert_eq!(decode_status(&[STATUS_ZERO]), Ok(true));
        assert_eq!(decode_status(&[STATUS_NONZERO]), Ok(false));
        assert!(decode_status(&[]).is_err());
    }

    #[test]
    fn short_state_response_is_rejected() {
        let err = decode_state(DeltaWidth::W64, &[0; 7]).unwrap_err();
        assert_eq!(
            err,
            FrameError::ResponseLength {
                expected: 8,
                actual: 7
            }
        );
    }
}
