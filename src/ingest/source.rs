//! Ingestion line sources
//!
//! The sensor channel delivers complete, newline-terminated UTF-8 text
//! lines; byte-level framing is the transport's concern. Two sources are
//! available: a serial-over-TCP bridge for real hardware and a scripted
//! generator for demos and tests.

use crate::error::{ClasswatchError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::sleep;

/// A connectable source of raw sensor lines
#[async_trait]
pub trait LineSource: Send {
    /// Open the channel. Called again by the supervisor after every failure.
    async fn connect(&mut self) -> Result<()>;

    /// Next complete line, without its terminator. `Ok(None)` means the
    /// channel closed cleanly.
    async fn next_line(&mut self) -> Result<Option<String>>;

    /// Short channel description for logs
    fn describe(&self) -> String;
}

/// Reads CRLF-delimited lines from a serial-over-TCP bridge
pub struct TcpLineSource {
    addr: String,
    reader: Option<BufReader<TcpStream>>,
}

impl TcpLineSource {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            reader: None,
        }
    }
}

#[async_trait]
impl LineSource for TcpLineSource {
    async fn connect(&mut self) -> Result<()> {
        let stream = TcpStream::connect(self.addr.as_str()).await.map_err(|e| {
            ClasswatchError::connection(format!("Failed to open channel {}: {e}", self.addr))
        })?;
        self.reader = Some(BufReader::new(stream));
        Ok(())
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| ClasswatchError::connection("Channel not open"))?;

        let mut line = String::new();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| ClasswatchError::connection(format!("Channel read failed: {e}")))?;

        if read == 0 {
            self.reader = None;
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.addr)
    }
}

/// Cycles through a fixed script of sensor lines on a fixed interval.
/// Never fails; used when no hardware channel is attached.
pub struct SimulatedLineSource {
    script: Vec<String>,
    cursor: usize,
    interval: Duration,
}

impl SimulatedLineSource {
    pub fn new(interval: Duration) -> Self {
        Self::with_script(interval, default_script())
    }

    pub fn with_script(interval: Duration, script: Vec<String>) -> Self {
        Self {
            script,
            cursor: 0,
            interval,
        }
    }
}

#[async_trait]
impl LineSource for SimulatedLineSource {
    async fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        if self.script.is_empty() {
            return Ok(None);
        }
        sleep(self.interval).await;
        let line = self.script[self.cursor % self.script.len()].clone();
        self.cursor += 1;
        Ok(Some(line))
    }

    fn describe(&self) -> String {
        format!("simulated ({}s interval)", self.interval.as_secs())
    }
}

fn default_script() -> Vec<String> {
    [
        "UID: 01:40:3B:2E",
        "Motion detected!",
        "DB: 42.3",
        "No motion",
        "UID: E2:D9:E5:2E",
        "DB: 28.1",
        "UID: DE:AD:BE:EF",
        "Movement!",
        "UID: 01:40:3B:2E",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}
