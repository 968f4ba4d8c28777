// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Start/stop step counter.

use super::EngineObserver;

/// Counts logical steps between [`start`](Self::start) and [`stop`](Self::stop).
///
/// `done` latches after a stop and stays set until the next start or clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerfCounter {
    count: u64,
    running: bool,
    done: bool,
}

impl PerfCounter {
    /// A cleared, stopped counter.
    pub const fn new() -> Self {
        Self {
            count: 0,
            running: false,
            done: false,
        }
    }

    /// Zeroes the count and begins counting.
    pub fn start(&mut self) {
        self.count = 0;
        self.running = true;
        self.done = false;
    }

    /// Stops counting; the count is held. No-op when not running.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.done = true;
        }
    }

    /// Back to the power-on state.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Advances one step if running.
    pub fn tick(&mut self) {
        if self.running {
            self.count = self.count.saturating_add(1);
        }
    }

    /// Steps counted since the last start.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// True between start and stop.
    pub fn running(&self) -> bool {
        self.running
    }

    /// True once a started measurement has been stopped.
    pub fn done(&self) -> bool {
        self.done
    }
}

impl EngineObserver for PerfCounter {
    fn on_step(&mut self, _now: u64) {
        self.tick();
    }
}
