// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fixed-width delta words and the width they are interpreted at.
//!
//! A [`DeltaWord`] is an opaque bit vector. The only operation the engine ever
//! applies to one is XOR, so the type exposes `^`/`^=` and nothing arithmetic.
//! Words are stored in a `u128` and the engine's [`DeltaWidth`] masks every
//! incoming value down to `W` bits.
//!
//! # Wire Representation
//!
//! On the wire a word of width `W` occupies exactly `W / 8` bytes, most
//! significant byte first.

use std::fmt;
use std::ops::{BitXor, BitXorAssign};

/// Errors raised when a width or a byte payload does not fit the engine width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WidthError {
    /// Width is not a multiple of 8 in `8..=128`.
    #[error("[WIDTH_UNSUPPORTED] {bits} bits (expected a multiple of 8 in 8..=128)")]
    Unsupported {
        /// The rejected bit width.
        bits: u32,
    },
    /// A big-endian payload had the wrong number of bytes.
    #[error("[WIDTH_PAYLOAD_LEN] expected {expected} bytes, got {actual}")]
    PayloadLength {
        /// Bytes required by the width.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
}

/// An opaque delta value combined only via XOR.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeltaWord(pub u128);

impl DeltaWord {
    /// The XOR identity.
    pub const ZERO: Self = Self(0);

    /// Raw bits.
    pub const fn bits(self) -> u128 {
        self.0
    }

    /// True when every bit is clear.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<u128> for DeltaWord {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<u64> for DeltaWord {
    fn from(value: u64) -> Self {
        Self(u128::from(value))
    }
}

impl From<u32> for DeltaWord {
    fn from(value: u32) -> Self {
        Self(u128::from(value))
    }
}

impl BitXor for DeltaWord {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

impl BitXorAssign for DeltaWord {
    fn bitxor_assign(&mut self, rhs: Self) {
        self.0 ^= rhs.0;
    }
}

impl fmt::Debug for DeltaWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeltaWord({:#x})", self.0)
    }
}

impl fmt::Display for DeltaWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::LowerHex for DeltaWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Bit width `W` every word of an engine is interpreted at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u32", into = "u32"))]
pub struct DeltaWidth {
    bits: u32,
}

impl DeltaWidth {
    /// 64-bit words, the width of the reference accumulator core.
    pub const W64: Self = Self { bits: 64 };
    /// Widest supported word.
    pub const MAX_BITS: u32 = 128;

    /// Validates and wraps a bit width.
    pub fn new(bits: u32) -> Result<Self, WidthError> {
        if bits == 0 || bits > Self::MAX_BITS || bits % 8 != 0 {
            return Err(WidthError::Unsupported { bits });
        }
        Ok(Self { bits })
    }

    /// Width in bits.
    pub const fn bits(self) -> u32 {
        self.bits
    }

    /// Payload size in bytes (`W / 8`).
    pub const fn bytes(self) -> usize {
        (self.bits / 8) as usize
    }

    /// Mask with the low `W` bits set.
    pub const fn mask(self) -> u128 {
        if self.bits == Self::MAX_BITS {
            u128::MAX
        } else {
            (1u128 << self.bits) - 1
        }
    }

    /// Drops every bit above `W`.
    pub const fn truncate(self, word: DeltaWord) -> DeltaWord {
        DeltaWord(word.0 & self.mask())
    }

    /// Encodes `word` as exactly `W / 8` bytes, MSB first.
    pub fn to_be_bytes(self, word: DeltaWord) -> Vec<u8> {
        let full = self.truncate(word).0.to_be_bytes();
        full[full.len() - self.bytes()..].to_vec()
    }

    /// Decodes exactly `W / 8` big-endian bytes.
    pub fn from_be_bytes(self, bytes: &[u8]) -> Result<DeltaWord, WidthError> {
        if bytes.len() != self.bytes() {
            return Err(WidthError::PayloadLength {
                expected: self.bytes(),
                actual: bytes.len(),
            });
        }
        let value = bytes
            .iter()
            .fold(0u128, |acc, b| (acc << 8) | u128::from(*b));
        Ok(DeltaWord(value))
    }
}

impl Default for DeltaWidth {
    fn default() -> Self {
        Self::W64
    }
}

impl TryFrom<u32> for DeltaWidth {
    type Error = WidthError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        Self::new(bits)
    }
}

impl From<DeltaWidth> for u32 {
    fn from(width: DeltaWidth) -> Self {
        width.bits
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn rejects_unaligned_and_oversized_widths() {
        assert_eq!(DeltaWidth::new(0), Err(WidthError::Unsupported { bits: 0 }));
        assert_eq!(DeltaWidth::new(12), Err(WidthError::Unsupported { bits: 12 }));
        assert_eq!(
            DeltaWidth::new(136),
            Err(WidthError::Unsupported { bits: 136 })
        );
        assert!(DeltaWidth::new(8).is_ok());
        assert!(DeltaWidth::new(128).is_ok());
    }

    #[test]
    fn mask_covers_exactly_w_bits() {
        assert_eq!(DeltaWidth::W64.mask(), u128::from(u64::MAX));
        assert_eq!(DeltaWidth::new(8).unwrap().mask(), 0xFF);
        assert_eq!(DeltaWidth::new(128).unwrap().mask(), u128::MAX);
    }

    #[test]
    fn big_endian_bytes_are_msb_first() {
        let w = DeltaWidth::W64;
        let bytes = w.to_be_bytes(DeltaWord::from(0x1122_3344_5566_7788u64));
        assert_eq!(bytes, vec![0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]);
        assert_eq!(
            w.from_be_bytes(&bytes).unwrap(),
            DeltaWord::from(0x1122_3344_5566_7788u64)
        );
    }

    #[test]
    fn encoding_truncates_high_bits() {
        let w = DeltaWidth::new(16).unwrap();
        assert_eq!(w.to_be_bytes(DeltaWord(0xABCD_1234)), vec![0x12, 0x34]);
    }

    #[test]
    fn short_payload_is_rejected() {
        let err = DeltaWidth::W64.from_be_bytes(&[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            WidthError::PayloadLength {
                expected: 8,
                actual: 3
            }
        );
    }

    #[test]
    fn xor_is_self_inverse() {
        let d = DeltaWord::from(0xAAAA_AAAA_AAAA_AAAAu64);
        assert_eq!(d ^ d, DeltaWord::ZERO);
        let mut acc = DeltaWord::ZERO;
        acc ^= d;
        acc ^= d;
        assert!(acc.is_zero());
    }
}
