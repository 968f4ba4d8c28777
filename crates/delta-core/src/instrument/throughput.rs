// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fixed-window completion counter.

use super::{EngineObserver, OpEvent, OpKind, OpPhase};

/// Counts completed operations per window of `window` logical steps.
///
/// When a window closes, its count is latched into [`ops_result`](Self::ops_result),
/// added to the cumulative [`ops_count`](Self::ops_count), and the live
/// counter restarts from zero. Only commands count; a RESET is not a
/// completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThroughputMonitor {
    window: u64,
    elapsed: u64,
    current: u64,
    ops_result: u64,
    ops_count: u64,
    windows: u64,
}

impl ThroughputMonitor {
    /// Creates a monitor; a zero window is treated as one step.
    pub fn new(window: u64) -> Self {
        Self {
            window: window.max(1),
            elapsed: 0,
            current: 0,
            ops_result: 0,
            ops_count: 0,
            windows: 0,
        }
    }

    /// Window length in steps.
    pub fn window(&self) -> u64 {
        self.window
    }

    /// Counts one completion in the open window.
    pub fn record_completion(&mut self) {
        self.current = self.current.saturating_add(1);
    }

    /// Advances one step, closing the window on its boundary.
    pub fn tick(&mut self) {
        self.elapsed += 1;
        if self.elapsed >= self.window {
            self.ops_result = self.current;
            self.ops_count = self.ops_count.saturating_add(self.current);
            self.windows += 1;
            self.current = 0;
            self.elapsed = 0;
        }
    }

    /// Completions in the most recently closed window.
    pub fn ops_result(&self) -> u64 {
        self.ops_result
    }

    /// Completions across every closed window.
    pub fn ops_count(&self) -> u64 {
        self.ops_count
    }

    /// Completions in the open window so far.
    pub fn in_window(&self) -> u64 {
        self.current
    }

    /// Windows closed so far.
    pub fn windows(&self) -> u64 {
        self.windows
    }
}

impl EngineObserver for ThroughputMonitor {
    fn on_step(&mut self, _now: u64) {
        self.tick();
    }

    fn on_event(&mut self, event: &OpEvent) {
        if event.phase == OpPhase::End && event.kind != OpKind::Reset {
            self.record_completion();
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn window_boundary_latches_and_restarts() {
        let mut m = ThroughputMonitor::new(3);
        m.record_completion();
        m.record_completion();
        m.tick();
        m.tick();
        assert_eq!(m.ops_result(), 0);
        assert_eq!(m.in_window(), 2);
        m.tick();
        assert_eq!(m.ops_result(), 2);
        assert_eq!(m.ops_count(), 2);
        assert_eq!(m.in_window(), 0);
        assert_eq!(m.windows(), 1);

        m.record_completion();
        for _ in 0..3 {
            m.tick();
        }
        assert_eq!(m.ops_result(), 1);
        assert_eq!(m.ops_count(), 3);
        assert_eq!(m.windows(), 2);
    }

    #[test]
    fn empty_window_latches_zero() {
        let mut m = ThroughputMonitor::new(1);
        m.record_completion();
        m.tick();
        m.tick();
        assert_eq!(m.ops_result(), 0);
        assert_eq!(m.ops_count(), 1);
    }

    #[test]
    fn reset_is_not_a_completion() {
        let mut m = ThroughputMonitor::new(2);
        for (kind, phase) in [
            (OpKind::Reset, OpPhase::Begin),
            (OpKind::Reset, OpPhase::End),
            (OpKind::Status, OpPhase::Begin),
            (OpKind::Status, OpPhase::End),
        ] {
            m.on_event(&OpEvent { kind, phase, at: 1 });
        }
        assert_eq!(m.in_window(), 1);
        m.on_step(1);
        m.on_step(2);
        assert_eq!(m.ops_result(), 1);
        assert_eq!(m.ops_count(), 1);
    }

    #[test]
    fn zero_window_is_clamped() {
        assert_eq!(ThroughputMonitor::new(0).window(), 1);
    }
}
