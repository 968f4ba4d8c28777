// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Reference results the engine is checked against.

use delta_core::DeltaWord;

/// `0xAAAA…`: alternating ones from the top bit.
pub const ALTERNATING_A: u64 = 0xAAAA_AAAA_AAAA_AAAA;

/// `0x5555…`: the complement of [`ALTERNATING_A`].
pub const ALTERNATING_5: u64 = 0x5555_5555_5555_5555;

/// The four lanes of the wide-parallel reference scenario.
pub const SCENARIO_B_DELTAS: [u64; 4] = [
    ALTERNATING_A,
    ALTERNATING_5,
    0x1234_5678_9ABC_DEF0,
    0xFEDC_BA09_8765_4321,
];

/// Plain left-to-right XOR of `values`, written independently of the engine's folds.
pub fn reference_fold(values: &[DeltaWord]) -> DeltaWord {
    let mut acc = 0u128;
    for v in values {
        acc ^= v.bits();
    }
    DeltaWord(acc)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn scenario_b_reference_value() {
        let lanes = SCENARIO_B_DELTAS.map(DeltaWord::from);
        // A ^ 5 is all ones; the remaining two lanes are folded into that
        let expected = !0u64 ^ 0x1234_5678_9ABC_DEF0 ^ 0xFEDC_BA09_8765_4321;
        assert_eq!(reference_fold(&lanes), DeltaWord::from(expected));
    }

    #[test]
    fn empty_fold_is_zero() {
        assert_eq!(reference_fold(&[]), DeltaWord::ZERO);
    }
}
