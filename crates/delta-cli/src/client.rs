// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Blocking controller connection to `deltad`.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::BytesMut;
use delta_core::{DeltaWidth, DeltaWord};
use delta_wire::frame::{decode_state, decode_status};
use delta_wire::Command;

/// One controller session.
pub struct Client {
    stream: UnixStream,
    width: DeltaWidth,
    buf: BytesMut,
}

impl Client {
    /// Connects to the node socket; reads give up after `timeout`.
    pub fn connect(path: &Path, width: DeltaWidth, timeout: Duration) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .with_context(|| format!("connecting to {}", path.display()))?;
        stream.set_read_timeout(Some(timeout))?;
        Ok(Self {
            stream,
            width,
            buf: BytesMut::new(),
        })
    }

    /// Sends one frame and reads its fixed-size response.
    pub fn exchange(&mut self, command: Command) -> Result<Vec<u8>> {
        self.buf.clear();
        command.encode(self.width, &mut self.buf);
        self.stream.write_all(&self.buf)?;
        let mut response = vec![0u8; command.expected_response_len(self.width)];
        if !response.is_empty() {
            self.stream
                .read_exact(&mut response)
                .with_context(|| format!("waiting for {:?} response", command.opcode()))?;
        }
        Ok(response)
    }

    /// LOAD.
    pub fn load(&mut self, value: DeltaWord) -> Result<()> {
        self.exchange(Command::Load(value)).map(drop)
    }

    /// ACCUMULATE.
    pub fn accumulate(&mut self, delta: DeltaWord) -> Result<()> {
        self.exchange(Command::Accumulate(delta)).map(drop)
    }

    /// READ: current state.
    pub fn read(&mut self) -> Result<DeltaWord> {
        let bytes = self.exchange(Command::Read)?;
        Ok(decode_state(self.width, &bytes)?)
    }

    /// DEBUG: initial state.
    pub fn debug(&mut self) -> Result<DeltaWord> {
        let bytes = self.exchange(Command::Debug)?;
        Ok(decode_state(self.width, &bytes)?)
    }

    /// STATUS: true when the merged accumulator is zero.
    pub fn status(&mut self) -> Result<bool> {
        let bytes = self.exchange(Command::Status)?;
        Ok(decode_status(&bytes)?)
    }
}
