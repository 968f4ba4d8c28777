// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `deltad`: serves a delta accumulation engine on a Unix socket.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use delta_app_core::config::ConfigService;
use delta_app_core::prefs::NodePrefs;
use delta_config_fs::FsConfigStore;
use delta_core::{DeltaWidth, DispatchMode, LoadPolicy};
use delta_node::{bind, Node};
use delta_wire::default_socket_path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Delta accumulation engine daemon")]
struct Args {
    /// Unix socket to listen on (overrides saved prefs).
    #[arg(long)]
    socket: Option<PathBuf>,
    /// Directory holding `deltad.json` (defaults to the platform config dir).
    #[arg(long)]
    config_dir: Option<PathBuf>,
    /// Word width in bits.
    #[arg(long)]
    width_bits: Option<u32>,
    /// Number of banks.
    #[arg(long)]
    banks: Option<usize>,
    /// Bulk dispatch topology.
    #[arg(long, value_enum)]
    dispatch: Option<Dispatch>,
    /// Zero the banks on every LOAD.
    #[arg(long)]
    clear_on_load: bool,
    /// Milliseconds a frame may stall before it is aborted (0 disables).
    #[arg(long)]
    frame_timeout_ms: Option<u64>,
    /// Write the effective prefs back to the config store.
    #[arg(long)]
    save_prefs: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
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

impl Args {
    fn apply(&self, prefs: &mut NodePrefs) -> Result<()> {
        if let Some(socket) = &self.socket {
            prefs.socket_path = Some(socket.clone());
        }
        if let Some(bits) = self.width_bits {
            prefs.engine.width = DeltaWidth::new(bits)?;
        }
        if let Some(banks) = self.banks {
            prefs.engine.banks = banks;
        }
        if let Some(dispatch) = self.dispatch {
            prefs.engine.dispatch = dispatch.into();
        }
        if self.clear_on_load {
            prefs.engine.load_policy = LoadPolicy::ClearBanks;
        }
        if let Some(ms) = self.frame_timeout_ms {
            prefs.frame_timeout_ms = ms;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args = Args::parse();

    let store = match &args.config_dir {
        Some(dir) => FsConfigStore::at(dir),
        None => FsConfigStore::new(),
    };
    // Config is best-effort: an unusable store falls back to defaults.
    let config = store
        .map(ConfigService::new)
        .map_err(|err| warn!(%err, "config store unavailable; using defaults"))
        .ok();

    let mut prefs = match &config {
        Some(service) => NodePrefs::load(service).context("loading node prefs")?,
        None => NodePrefs::default(),
    };
    args.apply(&mut prefs)?;

    if args.save_prefs {
        if let Some(service) = &config {
            prefs.save(service).context("saving node prefs")?;
        }
    }

    let mut node = Node::from_prefs(&prefs)?;
    let socket = prefs.socket_path.clone().unwrap_or_else(default_socket_path);
    let listener = bind(&socket)?;
    info!(
        socket = %socket.display(),
        width = prefs.engine.width.bits(),
        banks = prefs.engine.banks,
        frame_timeout_ms = prefs.frame_timeout_ms,
        "deltad listening"
    );

    node.serve(listener, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(%err, "ctrl-c handler failed; serving until killed");
            std::future::pending::<()>().await;
        }
    })
    .await?;

    let _ = std::fs::remove_file(&socket);
    Ok(())
}
