// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-kind operation latency.

use super::{EngineObserver, OpEvent, OpKind, OpPhase};

const SLOTS: usize = 3;

/// Measures the steps between an operation's start and its matching done
/// signal, keeping the most recent result for LOAD, ACCUMULATE and READ.
///
/// Other kinds are ignored. A done signal for a kind that is not in flight
/// is ignored as well.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatencyTimer {
    in_flight: Option<(OpKind, u64)>,
    last: [Option<u64>; SLOTS],
}

fn slot(kind: OpKind) -> Option<usize> {
    match kind {
        OpKind::Load => Some(0),
        OpKind::Accumulate => Some(1),
        OpKind::Read => Some(2),
        OpKind::Status | OpKind::Debug | OpKind::Reset => None,
    }
}

impl LatencyTimer {
    /// Nothing measured yet.
    pub const fn new() -> Self {
        Self {
            in_flight: None,
            last: [None; SLOTS],
        }
    }

    /// Begins measuring `kind` at step `at`; replaces any measurement in flight.
    pub fn op_start(&mut self, kind: OpKind, at: u64) {
        if slot(kind).is_some() {
            self.in_flight = Some((kind, at));
        }
    }

    /// Completes the in-flight measurement of `kind`, returning the latency.
    pub fn op_done(&mut self, kind: OpKind, at: u64) -> Option<u64> {
        match self.in_flight {
            Some((pending, started)) if pending == kind => {
                self.in_flight = None;
                let elapsed = at.saturating_sub(started);
                if let Some(i) = slot(kind) {
                    self.last[i] = Some(elapsed);
                }
                Some(elapsed)
            }
            _ => None,
        }
    }

    /// Drops the in-flight measurement without recording it.
    pub fn abort(&mut self) {
        self.in_flight = None;
    }

    /// True while a measurement is in flight.
    pub fn measuring(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Most recent latency for `kind`.
    pub fn latency(&self, kind: OpKind) -> Option<u64> {
        slot(kind).and_then(|i| self.last[i])
    }
}

impl EngineObserver for LatencyTimer {
    fn on_event(&mut self, event: &OpEvent) {
        match event.phase {
            OpPhase::Begin => self.op_start(event.kind, event.at),
            OpPhase::End => {
                let _ = self.op_done(event.kind, event.at);
            }
            OpPhase::Abort => self.abort(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn records_most_recent_latency_per_kind() {
        let mut t = LatencyTimer::new();
        t.op_start(OpKind::Load, 10);
        assert!(t.measuring());
        assert_eq!(t.op_done(OpKind::Load, 19), Some(9));
        assert!(!t.measuring());

        t.op_start(OpKind::Load, 20);
        t.op_done(OpKind::Load, 22);
        t.op_start(OpKind::Read, 30);
        t.op_done(OpKind::Read, 40);

        assert_eq!(t.latency(OpKind::Load), Some(2));
        assert_eq!(t.latency(OpKind::Read), Some(10));
        assert_eq!(t.latency(OpKind::Accumulate), None);
    }

    #[test]
    fn mismatched_done_is_ignored() {
        let mut t = LatencyTimer::new();
        t.op_start(OpKind::Accumulate, 0);
        assert_eq!(t.op_done(OpKind::Read, 5), None);
        assert!(t.measuring());
    }

    #[test]
    fn untracked_kinds_never_measure() {
        let mut t = LatencyTimer::new();
        t.op_start(OpKind::Status, 0);
        assert!(!t.measuring());
        assert_eq!(t.latency(OpKind::Status), None);
    }

    #[test]
    fn abort_clears_in_flight() {
        let mut t = LatencyTimer::new();
        t.on_event(&OpEvent {
            kind: OpKind::Load,
            phase: OpPhase::Begin,
            at: 1,
        });
        t.on_event(&OpEvent {
            kind: OpKind::Load,
            phase: OpPhase::Abort,
            at: 3,
        });
        assert!(!t.measuring());
        assert_eq!(t.latency(OpKind::Load), None);
    }
}
