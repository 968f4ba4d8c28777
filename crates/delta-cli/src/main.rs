// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! delta-cli: controller for `deltad` and an offline engine simulator.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use delta_core::{DeltaWidth, DeltaWord, DispatchMode, EngineConfig, LoadPolicy, DEFAULT_BANKS};
use delta_wire::default_socket_path;
use serde_json::json;

mod client;
mod simulate;
mod words;

use client::Client;
use simulate::Simulation;
use words::{format_word, parse_delta_list, parse_word};

#[derive(Parser)]
#[command(author, version, about = "Drive a delta accumulation engine")]
struct Cli {
    /// Node socket (defaults to `$XDG_RUNTIME_DIR/deltad.sock`).
    #[arg(long, global = true)]
    socket: Option<PathBuf>,
    /// Word width in bits; must match the node.
    #[arg(long, global = true, default_value_t = 64)]
    width_bits: u32,
    /// Emit JSON instead of text.
    #[arg(long, global = true)]
    json: bool,
    /// Milliseconds to wait for a response.
    #[arg(long, global = true, default_value_t = 2_000)]
    timeout_ms: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set the initial state.
    Load {
        /// Value in hex.
        value: String,
    },
    /// Accumulate one or more deltas, in order.
    Accumulate {
        /// Deltas in hex.
        #[arg(required = true)]
        deltas: Vec<String>,
    },
    /// Print the current state.
    Read,
    /// Print whether the merged accumulator is zero.
    Status,
    /// Print the initial state.
    Debug,
    /// Run an in-process engine over a delta list.
    Simulate(SimulateArgs),
}

#[derive(Args)]
struct SimulateArgs {
    /// File with one hex delta per line (`#` starts a comment).
    #[arg(long)]
    deltas: PathBuf,
    /// Number of banks.
    #[arg(long, default_value_t = DEFAULT_BANKS)]
    banks: usize,
    /// Dispatch topology.
    #[arg(long, value_enum, default_value_t = Dispatch::RoundRobin)]
    dispatch: Dispatch,
    /// Initial state in hex.
    #[arg(long, default_value = "0")]
    initial: String,
    /// Worker threads for bulk ingestion.
    #[arg(long, default_value_t = 1)]
    workers: usize,
    /// Throughput window, in logical steps.
    #[arg(long, default_value_t = 64)]
    window: u64,
    /// Zero the banks on LOAD.
    #[arg(long)]
    clear_on_load: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Dispatch {
    RoundRobin,
    WideParallel,
}

impl From<Dispatch> for DispatchMode {
    fn from(value: Dispatch) -> Self {
        match value {
            Dispatch::RoundRobin => Self::RoundRobin,
            Dispatch::WideParallel => Self::WideParallel,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let width = DeltaWidth::new(cli.width_bits)?;
    let mut out = io::stdout().lock();

    if let Commands::Simulate(args) = &cli.command {
        return run_simulate(&mut out, width, cli.json, args);
    }

    let socket = cli.socket.clone().unwrap_or_else(default_socket_path);
    let mut client = Client::connect(&socket, width, Duration::from_millis(cli.timeout_ms))?;
    match &cli.command {
        Commands::Load { value } => {
            client.load(parse_word(width, value)?)?;
            ack(&mut out, cli.json, "load")
        }
        Commands::Accumulate { deltas } => {
            // parse everything before sending anything
            let parsed = deltas
                .iter()
                .map(|d| parse_word(width, d))
                .collect::<Result<Vec<_>>>()?;
            for delta in parsed {
                client.accumulate(delta)?;
            }
            ack(&mut out, cli.json, "accumulate")
        }
        Commands::Read => {
            let state = client.read()?;
            word(&mut out, cli.json, "read", width, state)
        }
        Commands::Debug => {
            let initial = client.debug()?;
            word(&mut out, cli.json, "debug", width, initial)
        }
        Commands::Status => {
            let zero = client.status()?;
            if cli.json {
                writeln!(out, "{}", json!({ "command": "status", "zero": zero }))?;
            } else {
                writeln!(out, "{}", if zero { "zero" } else { "nonzero" })?;
            }
            Ok(())
        }
        Commands::Simulate(_) => Ok(()),
    }
}

fn ack(out: &mut impl Write, json: bool, command: &str) -> Result<()> {
    if json {
        writeln!(out, "{}", json!({ "command": command, "ok": true }))?;
    } else {
        writeln!(out, "ok")?;
    }
    Ok(())
}

fn word(out: &mut impl Write, json: bool, command: &str, width: DeltaWidth, value: DeltaWord) -> Result<()> {
    let hex = format_word(width, value);
    if json {
        writeln!(out, "{}", json!({ "command": command, "state": hex }))?;
    } else {
        writeln!(out, "{hex}")?;
    }
    Ok(())
}

fn run_simulate(out: &mut impl Write, width: DeltaWidth, json: bool, args: &SimulateArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.deltas)
        .with_context(|| format!("reading {}", args.deltas.display()))?;
    let sim = Simulation {
        engine: EngineConfig {
            width,
            banks: args.banks,
            dispatch: args.dispatch.into(),
            load_policy: if args.clear_on_load {
                LoadPolicy::ClearBanks
            } else {
                LoadPolicy::PreserveBanks
            },
            ..EngineConfig::default()
        },
        initial: parse_word(width, &args.initial).context("--initial")?,
        deltas: parse_delta_list(width, &text)
            .with_context(|| format!("parsing {}", args.deltas.display()))?,
        workers: args.workers,
        window: args.window,
    };
    let report = sim.run()?;
    if json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
    } else {
        writeln!(out, "{}", report.to_table())?;
    }
    Ok(())
}
