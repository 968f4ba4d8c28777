// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scoped-thread bulk ingestion.
//!
//! The batch is cut into contiguous chunks, one per worker. Each worker folds
//! its chunk into a private vector of per-bank partials using the same
//! `(cursor + index) % N` routing as round-robin dispatch. Partials are then
//! XOR-merged into the banks on the calling thread.
//!
//! # Determinism
//!
//! Workers race, but XOR is commutative and associative, so every bank ends
//! bit-identical to serial [`accumulate`](crate::ParallelAccumulator::accumulate)
//! calls over the same batch.

use crate::accumulator::ParallelAccumulator;
use crate::error::EngineError;
use crate::word::{DeltaWidth, DeltaWord};

impl ParallelAccumulator {
    /// Ingests `batch` across up to `workers` threads.
    ///
    /// Workers are capped at the batch length. An empty batch is a no-op.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoWorkers`] when `workers == 0`.
    pub fn ingest_parallel(&mut self, batch: &[DeltaWord], workers: usize) -> Result<(), EngineError> {
        if workers == 0 {
            return Err(EngineError::NoWorkers);
        }
        if batch.is_empty() {
            return Ok(());
        }

        let n = self.bank_count();
        let base = self.cursor();
        let width = self.width();
        let chunk_len = batch.len().div_ceil(workers.min(batch.len()));

        let partials: Vec<Vec<DeltaWord>> = std::thread::scope(|s| {
            let handles: Vec<_> = batch
                .chunks(chunk_len)
                .enumerate()
                .map(|(w, chunk)| {
                    let offset = base.wrapping_add((w * chunk_len) as u64);
                    s.spawn(move || fold_chunk(chunk, offset, n, width))
                })
                .collect();

            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(partial) => partial,
                    Err(e) => std::panic::resume_unwind(e),
                })
                .collect()
        });

        let mut merged = vec![DeltaWord::ZERO; n];
        for partial in &partials {
            for (slot, value) in merged.iter_mut().zip(partial) {
                *slot ^= *value;
            }
        }
        self.apply_partials(&merged, batch.len());
        Ok(())
    }
}

fn fold_chunk(chunk: &[DeltaWord], offset: u64, n: usize, width: DeltaWidth) -> Vec<DeltaWord> {
    let mut partial = vec![DeltaWord::ZERO; n];
    for (i, delta) in chunk.iter().enumerate() {
        let bank = (offset.wrapping_add(i as u64) % n as u64) as usize;
        partial[bank] ^= width.truncate(*delta);
    }
    partial
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::DispatchMode;

    fn batch(len: u64) -> Vec<DeltaWord> {
        (0..len)
            .map(|i| DeltaWord::from(i.wrapping_mul(0x9E37_79B9_7F4A_7C15)))
            .collect()
    }

    #[test]
    fn matches_serial_round_robin_per_bank() {
        for workers in [1, 2, 3, 8, 64] {
            let mut serial = ParallelAccumulator::new(DeltaWidth::W64, 4, DispatchMode::RoundRobin).unwrap();
            let mut threaded = serial.clone();
            // start from a non-zero cursor so the offset math is exercised
            serial.accumulate(DeltaWord::from(0xABu64));
            threaded.accumulate(DeltaWord::from(0xABu64));

            let b = batch(101);
            for d in &b {
                serial.accumulate(*d);
            }
            threaded.ingest_parallel(&b, workers).unwrap();

            assert_eq!(threaded.bank_values(), serial.bank_values(), "workers = {workers}");
            assert_eq!(threaded.cursor(), serial.cursor());
        }
    }

    #[test]
    fn zero_workers_is_rejected() {
        let mut e = ParallelAccumulator::new(DeltaWidth::W64, 2, DispatchMode::RoundRobin).unwrap();
        assert_eq!(e.ingest_parallel(&batch(4), 0), Err(EngineError::NoWorkers));
    }

    #[test]
    fn empty_batch_is_noop() {
        let mut e = ParallelAccumulator::new(DeltaWidth::W64, 2, DispatchMode::RoundRobin).unwrap();
        e.ingest_parallel(&[], 4).unwrap();
        assert_eq!(e.cursor(), 0);
        assert!(e.is_zero());
    }
}
