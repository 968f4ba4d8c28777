// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Single-partition XOR accumulator.

use crate::word::DeltaWord;

/// One partition's accumulator.
///
/// `accept` is XOR, so it commutes with every other bank's updates and is
/// **not** idempotent: accepting the same delta twice cancels it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeltaBank {
    value: DeltaWord,
}

impl DeltaBank {
    /// A zeroed bank.
    pub const fn new() -> Self {
        Self {
            value: DeltaWord::ZERO,
        }
    }

    /// XORs `delta` into the stored value.
    #[inline]
    pub fn accept(&mut self, delta: DeltaWord) {
        self.value ^= delta;
    }

    /// Clears the stored value.
    #[inline]
    pub fn reset(&mut self) {
        self.value = DeltaWord::ZERO;
    }

    /// Current accumulated value.
    #[inline]
    pub const fn get(&self) -> DeltaWord {
        self.value
    }
}
