// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-process engine run over a delta list.
//!
//! Round-robin runs on one worker go through the byte protocol, so the
//! instrumentation sees real frames. Wide-parallel and multi-worker runs use
//! the bulk entry points; LOAD, READ and STATUS still go over the protocol.

use anyhow::Result;
use bytes::BytesMut;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use delta_core::instrument::{Instruments, OpKind};
use delta_core::{DeltaWord, DispatchMode, EngineConfig};
use delta_wire::frame::{decode_state, decode_status};
use delta_wire::{Command, CommandProtocol, QueueTransport};
use serde::Serialize;

use crate::words::format_word;

/// What to simulate.
#[derive(Debug, Clone)]
pub struct Simulation {
    /// Engine parameters.
    pub engine: EngineConfig,
    /// LOADed before any delta.
    pub initial: DeltaWord,
    /// Deltas in arrival order.
    pub deltas: Vec<DeltaWord>,
    /// Threads for bulk ingestion; 1 keeps everything on the protocol path.
    pub workers: usize,
    /// Throughput window, in logical steps.
    pub window: u64,
}

/// Outcome of a [`Simulation`].
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Word width in bits.
    pub width_bits: u32,
    /// Dispatch topology used.
    pub dispatch: DispatchMode,
    /// Deltas applied.
    pub deltas: usize,
    /// Initial state.
    pub initial: String,
    /// Merged banks.
    pub merged: String,
    /// Initial XOR merged, as read back over the protocol.
    pub state: String,
    /// STATUS result.
    pub zero: bool,
    /// Bank values, bank 0 first.
    pub banks: Vec<String>,
    /// Wide-parallel steps taken.
    pub wide_steps: u64,
    /// Logical protocol steps.
    pub steps: u64,
    /// Completions in the last full throughput window.
    pub ops_result: u64,
    /// Completions across all full windows.
    pub ops_count: u64,
    /// Most recent LOAD latency, in steps.
    pub load_latency: Option<u64>,
    /// Most recent ACCUMULATE latency, in steps.
    pub accumulate_latency: Option<u64>,
    /// Most recent READ latency, in steps.
    pub read_latency: Option<u64>,
}

fn exchange(
    protocol: &mut CommandProtocol<Instruments>,
    transport: &mut QueueTransport,
    frames: &mut BytesMut,
    command: Command,
) -> Result<bytes::Bytes> {
    frames.clear();
    command.encode(protocol.width(), frames);
    transport.feed(frames);
    protocol.pump(transport)?;
    Ok(transport.take_output())
}

impl Simulation {
    /// Runs the simulation to completion.
    pub fn run(&self) -> Result<SimulationReport> {
        let engine = self.engine.build()?;
        let width = engine.width();
        let mut protocol = CommandProtocol::with_observer(engine, Instruments::new(self.window));
        let mut transport = QueueTransport::unbounded();
        let mut frames = BytesMut::new();

        protocol.observer_mut().perf.start();
        exchange(&mut protocol, &mut transport, &mut frames, Command::Load(self.initial))?;

        let bulk = self.engine.dispatch == DispatchMode::WideParallel || self.workers > 1;
        if !bulk {
            for delta in &self.deltas {
                exchange(&mut protocol, &mut transport, &mut frames, Command::Accumulate(*delta))?;
            }
        } else if self.workers > 1 {
            protocol.engine_mut().ingest_parallel(&self.deltas, self.workers)?;
        } else {
            protocol.engine_mut().submit(&self.deltas)?;
        }

        let state = exchange(&mut protocol, &mut transport, &mut frames, Command::Read)?;
        let state = decode_state(width, &state)?;
        let zero = exchange(&mut protocol, &mut transport, &mut frames, Command::Status)?;
        let zero = decode_status(&zero)?;
        protocol.observer_mut().perf.stop();

        let engine = protocol.engine();
        let stats = engine.stats();
        let instruments = protocol.observer();
        Ok(SimulationReport {
            width_bits: width.bits(),
            dispatch: self.engine.dispatch,
            deltas: self.deltas.len(),
            initial: format_word(width, engine.initial_state()),
            merged: format_word(width, engine.merge()),
            state: format_word(width, state),
            zero,
            banks: stats.banks.iter().map(|b| format_word(width, *b)).collect(),
            wide_steps: stats.wide_steps,
            steps: instruments.perf.count(),
            ops_result: instruments.throughput.ops_result(),
            ops_count: instruments.throughput.ops_count(),
            load_latency: instruments.latency.latency(OpKind::Load),
            accumulate_latency: instruments.latency.latency(OpKind::Accumulate),
            read_latency: instruments.latency.latency(OpKind::Read),
        })
    }
}

fn opt(v: Option<u64>) -> String {
    v.map_or_else(|| "-".to_owned(), |v| v.to_string())
}

impl SimulationReport {
    /// Summary and per-bank tables.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![Cell::new("field"), Cell::new("value")]);
        let rows = [
            ("width_bits", self.width_bits.to_string()),
            ("dispatch", format!("{:?}", self.dispatch)),
            ("deltas", self.deltas.to_string()),
            ("initial", self.initial.clone()),
            ("merged", self.merged.clone()),
            ("state", self.state.clone()),
            ("zero", self.zero.to_string()),
            ("wide_steps", self.wide_steps.to_string()),
            ("steps", self.steps.to_string()),
            ("ops_result", self.ops_result.to_string()),
            ("ops_count", self.ops_count.to_string()),
            ("load_latency", opt(self.load_latency)),
            ("accumulate_latency", opt(self.accumulate_latency)),
            ("read_latency", opt(self.read_latency)),
        ];
        for (field, value) in rows {
            table.add_row(vec![Cell::new(field), Cell::new(value)]);
        }
        for (i, bank) in self.banks.iter().enumerate() {
            table.add_row(vec![Cell::new(format!("bank[{i}]")), Cell::new(bank)]);
        }
        table
    }
}
