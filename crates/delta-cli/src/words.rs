// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Hex text <-> delta words.

use anyhow::{bail, Context, Result};
use delta_core::{DeltaWidth, DeltaWord};

/// Parses `0x`-prefixed or bare hex, with optional `_` separators.
///
/// Shorter inputs are zero-extended; longer ones are an error.
pub fn parse_word(width: DeltaWidth, text: &str) -> Result<DeltaWord> {
    let trimmed = text.trim();
    let digits: String = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
        .chars()
        .filter(|c| *c != '_')
        .collect();
    if digits.is_empty() {
        bail!("empty hex value");
    }
    let max = width.bytes() * 2;
    if digits.len() > max {
        bail!("{text:?} is wider than {} bits", width.bits());
    }
    let padded = format!("{digits:0>max$}");
    let bytes = hex::decode(&padded).with_context(|| format!("invalid hex {text:?}"))?;
    Ok(width.from_be_bytes(&bytes)?)
}

/// Formats a word as full-width `0x…` hex.
pub fn format_word(width: DeltaWidth, word: DeltaWord) -> String {
    format!("0x{}", hex::encode(width.to_be_bytes(word)))
}

/// Reads one delta per line; blank lines and `#` comments are skipped.
pub fn parse_delta_list(width: DeltaWidth, text: &str) -> Result<Vec<DeltaWord>> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let line = line.split('#').next().unwrap_or_default().trim();
            (!line.is_empty()).then_some((i + 1, line))
        })
        .map(|(lineno, line)| parse_word(width, line).with_context(|| format!("line {lineno}")))
        .collect()
}
