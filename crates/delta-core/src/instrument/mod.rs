// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Passive instrumentation for engine operations.
//!
//! Observers see two things: a step signal from a [`LogicalClock`] and
//! begin/end [`OpEvent`]s. They never receive a handle to the engine, so they
//! cannot mutate it.
//!
//! # Time Unit
//!
//! Elapsed time is measured in logical steps. The command protocol advances
//! its clock once per state-machine step (a byte consumed, a dispatch, a byte
//! transmitted or a busy wait). Callers driving the engine directly advance a
//! clock of their own.

mod latency;
mod perf;
mod throughput;

pub use latency::LatencyTimer;
pub use perf::PerfCounter;
pub use throughput::ThroughputMonitor;

/// Engine operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OpKind {
    /// Initial state load.
    Load,
    /// Delta accumulation.
    Accumulate,
    /// Current state read.
    Read,
    /// Zero-flag query.
    Status,
    /// Initial state read-back.
    Debug,
    /// Full engine reset.
    Reset,
}

/// Where in its lifetime an operation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpPhase {
    /// Operation accepted (opcode recognized).
    Begin,
    /// Operation finished, including any response transmission.
    End,
    /// Operation abandoned before it finished (frame abort).
    Abort,
}

/// One operation lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpEvent {
    /// Operation kind.
    pub kind: OpKind,
    /// Lifecycle phase.
    pub phase: OpPhase,
    /// Logical step at which the event happened.
    pub at: u64,
}

/// Subscriber to engine operation events.
///
/// Both methods default to no-ops so observers only implement what they use.
pub trait EngineObserver {
    /// Called once per logical step with the post-increment clock value.
    fn on_step(&mut self, now: u64) {
        let _ = now;
    }

    /// Called for each operation lifecycle event.
    fn on_event(&mut self, event: &OpEvent) {
        let _ = event;
    }
}

impl EngineObserver for () {}

/// Monotonic logical step counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogicalClock {
    now: u64,
}

impl LogicalClock {
    /// Current step.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Advances one step and returns the new value.
    pub fn tick(&mut self) -> u64 {
        self.now = self.now.wrapping_add(1);
        self.now
    }
}

/// The three standard observers, fanned out from one subscription.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instruments {
    /// Step counter gated by start/stop.
    pub perf: PerfCounter,
    /// Windowed completion counter.
    pub throughput: ThroughputMonitor,
    /// Per-kind most-recent latency.
    pub latency: LatencyTimer,
}

impl Instruments {
    /// Creates the set with a throughput window of `window` steps.
    pub fn new(window: u64) -> Self {
        Self {
            perf: PerfCounter::new(),
            throughput: ThroughputMonitor::new(window),
            latency: LatencyTimer::new(),
        }
    }
}

impl EngineObserver for Instruments {
    fn on_step(&mut self, now: u64) {
        self.perf.on_step(now);
        self.throughput.on_step(now);
        self.latency.on_step(now);
    }

    fn on_event(&mut self, event: &OpEvent) {
        self.perf.on_event(event);
        self.throughput.on_event(event);
        self.latency.on_event(event);
    }
}
