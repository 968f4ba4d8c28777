// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Serves one delta engine over a byte stream.
//!
//! A [`Node`] owns the engine (inside a [`CommandProtocol`]) for the whole
//! process. Controllers connect one at a time; each connection's bytes are fed
//! through the protocol and its responses written back. Engine state survives
//! disconnects; only a partial frame is dropped.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use bytes::{Buf, BytesMut};
use delta_app_core::prefs::NodePrefs;
use delta_core::instrument::{Instruments, OpKind};
use delta_core::EngineError;
use delta_wire::{CommandProtocol, QueueTransport};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixListener;
use tracing::{debug, info, instrument, warn};

const READ_CHUNK: usize = 4 * 1024;

/// Per-connection totals, logged when the controller disconnects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionSummary {
    /// Bytes received from the controller.
    pub bytes_in: u64,
    /// Response bytes written back.
    pub bytes_out: u64,
    /// Frames the watchdog aborted.
    pub watchdog_aborts: u64,
    /// True if the controller left mid-frame.
    pub dropped_partial: bool,
    /// Logical steps taken while connected.
    pub steps: u64,
    /// True if node shutdown ended the session.
    pub interrupted: bool,
}

/// Engine plus protocol, serving controllers sequentially.
#[derive(Debug)]
pub struct Node {
    protocol: CommandProtocol<Instruments>,
    frame_timeout: Option<Duration>,
    next_conn: u64,
}

impl Node {
    /// Builds the engine and instruments described by `prefs`.
    pub fn from_prefs(prefs: &NodePrefs) -> Result<Self, EngineError> {
        let engine = prefs.engine.build()?;
        let instruments = Instruments::new(prefs.throughput_window);
        Ok(Self {
            protocol: CommandProtocol::with_observer(engine, instruments),
            frame_timeout: (prefs.frame_timeout_ms > 0)
                .then(|| Duration::from_millis(prefs.frame_timeout_ms)),
            next_conn: 0,
        })
    }

    /// The protocol and engine, read-only.
    pub fn protocol(&self) -> &CommandProtocol<Instruments> {
        &self.protocol
    }

    /// Accepts controllers on `listener` one at a time until `shutdown` resolves.
    ///
    /// Further connections wait in the listen backlog while one is served.
    /// `shutdown` also ends the session in progress.
    pub async fn serve<F>(&mut self, listener: UnixListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        loop {
            let stream = tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown requested");
                    return Ok(());
                }
                accepted = listener.accept() => accepted?.0,
            };
            let conn = self.next_conn;
            self.next_conn += 1;
            match self.handle_client_until(stream, conn, shutdown.as_mut()).await {
                Ok(summary) if summary.interrupted => {
                    info!("shutdown requested");
                    return Ok(());
                }
                Ok(_) => {}
                Err(err) => warn!(?err, conn, "client handler error"),
            }
        }
    }

    /// Serves one controller until it disconnects.
    pub async fn handle_client<S>(&mut self, stream: S, conn: u64) -> Result<ConnectionSummary>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        self.handle_client_until(stream, conn, std::future::pending()).await
    }

    /// Serves one controller until it disconnects, fails, or `shutdown` resolves.
    ///
    /// However the session ends, a partial frame is aborted and the summary
    /// logged before returning.
    #[instrument(skip(self, stream, shutdown))]
    pub async fn handle_client_until<S, F>(&mut self, stream: S, conn: u64, shutdown: F) -> Result<ConnectionSummary>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
        F: Future<Output = ()> + Send,
    {
        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut summary = ConnectionSummary::default();
        let started = self.protocol.now();

        self.protocol.observer_mut().perf.start();
        info!("controller connected");

        let outcome = self
            .session(&mut reader, &mut writer, &mut summary, shutdown)
            .await;

        if self.protocol.abort_frame() {
            debug!("controller left mid-frame");
            summary.dropped_partial = true;
        }
        self.protocol.observer_mut().perf.stop();
        summary.steps = self.protocol.now().wrapping_sub(started);
        self.log_summary(&summary);
        outcome.map(|()| summary)
    }

    async fn session<R, W, F>(
        &mut self,
        reader: &mut R,
        writer: &mut W,
        summary: &mut ConnectionSummary,
        shutdown: F,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        let mut transport = QueueTransport::with_capacity(READ_CHUNK);
        let mut pending = BytesMut::with_capacity(READ_CHUNK);
        let mut read_buf = vec![0u8; READ_CHUNK];

        loop {
            let watchdog = self.frame_timeout.filter(|_| self.protocol.is_mid_frame());
            let read = tokio::select! {
                () = &mut shutdown => {
                    summary.interrupted = true;
                    return Ok(());
                }
                read = read_chunk(reader, &mut read_buf, watchdog) => read,
            };
            let Some(read) = read else {
                warn!(state = ?self.protocol.state(), "frame stalled; aborting");
                self.protocol.abort_frame();
                summary.watchdog_aborts += 1;
                continue;
            };
            let n = read?;
            if n == 0 {
                return Ok(());
            }
            summary.bytes_in += n as u64;
            pending.extend_from_slice(&read_buf[..n]);
            let written = tokio::select! {
                () = &mut shutdown => {
                    summary.interrupted = true;
                    return Ok(());
                }
                written = self.drain(&mut pending, &mut transport, writer) => written?,
            };
            summary.bytes_out += written;
        }
    }

    /// Feeds `pending` through the protocol, writing responses as they appear.
    async fn drain<W>(&mut self, pending: &mut BytesMut, transport: &mut QueueTransport, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut written = 0;
        loop {
            let accepted = transport.feed(&pending[..]);
            pending.advance(accepted);
            self.protocol.pump(transport)?;
            let out = transport.take_output();
            if !out.is_empty() {
                writer.write_all(&out).await?;
                written += out.len() as u64;
            }
            if pending.is_empty() {
                break;
            }
        }
        writer.flush().await?;
        Ok(written)
    }

    fn log_summary(&self, summary: &ConnectionSummary) {
        let instruments = self.protocol.observer();
        let stats = self.protocol.engine().stats();
        info!(
            bytes_in = summary.bytes_in,
            bytes_out = summary.bytes_out,
            watchdog_aborts = summary.watchdog_aborts,
            steps = instruments.perf.count(),
            ops_result = instruments.throughput.ops_result(),
            ops_count = instruments.throughput.ops_count(),
            load_latency = ?instruments.latency.latency(OpKind::Load),
            accumulate_latency = ?instruments.latency.latency(OpKind::Accumulate),
            read_latency = ?instruments.latency.latency(OpKind::Read),
            accumulated = stats.accumulated,
            loads = stats.loads,
            "controller disconnected"
        );
    }
}

/// Reads one chunk; `None` means `limit` elapsed first.
async fn read_chunk<R>(reader: &mut R, buf: &mut [u8], limit: Option<Duration>) -> Option<std::io::Result<usize>>
where
    R: AsyncRead + Unpin + Send,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, reader.read(buf)).await.ok(),
        None => Some(reader.read(buf).await),
    }
}

/// Binds `path`, replacing a stale socket file left by an earlier run.
pub fn bind(path: &Path) -> Result<UnixListener> {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed stale socket"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }
    Ok(UnixListener::bind(path)?)
}
