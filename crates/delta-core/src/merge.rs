// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Order-independent merge of bank accumulators.
//!
//! # Algebra
//!
//! XOR over fixed-width words is a commutative monoid with identity `0` in
//! which every element is its own inverse. The merge is therefore
//! permutation-invariant and association-invariant: a left fold and a balanced
//! pairwise tree over the same bank values produce bit-identical words.
//!
//! # Empty Input
//!
//! Both folds return [`DeltaWord::ZERO`] for an empty slice.

use crate::word::DeltaWord;

/// How bank values are reduced into the merged accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MergeStrategy {
    /// Left fold `((b0 ^ b1) ^ b2) ^ ...`.
    Sequential,
    /// Pairwise reduction by level, the shape of a hardware merge tree.
    #[default]
    Tree,
}

impl MergeStrategy {
    /// Reduces `values` with this strategy.
    pub fn fold(self, values: &[DeltaWord]) -> DeltaWord {
        match self {
            Self::Sequential => fold_sequential(values),
            Self::Tree => fold_tree(values),
        }
    }
}

/// Left fold over `values`.
pub fn fold_sequential(values: &[DeltaWord]) -> DeltaWord {
    values.iter().fold(DeltaWord::ZERO, |acc, v| acc ^ *v)
}

/// Balanced pairwise fold over `values`.
///
/// Each level XORs neighbours `(0,1), (2,3), ...`; an odd trailing value is
/// carried up unchanged. Depth is `ceil(log2(n))`.
pub fn fold_tree(values: &[DeltaWord]) -> DeltaWord {
    match values {
        [] => DeltaWord::ZERO,
        [only] => *only,
        _ => {
            let mut level: Vec<DeltaWord> = values.to_vec();
            while level.len() > 1 {
                level = level
                    .chunks(2)
                    .map(|pair| match pair {
                        [a, b] => *a ^ *b,
                        [a] => *a,
                        _ => DeltaWord::ZERO,
                    })
                    .collect();
            }
            level.first().copied().unwrap_or(DeltaWord::ZERO)
        }
    }
}
