//! Connection supervisor
//!
//! Owns the lifecycle of the ingestion channel: opens the source, feeds
//! each arriving line to the pipeline strictly one at a time in arrival
//! order, and on any failure or close schedules a reconnect after a fixed
//! delay, unconditionally and indefinitely. No backoff, no retry cap.

use crate::ingest::source::LineSource;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Sensor channel lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

/// Shared view of the channel state, written only by the supervisor
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    state: Arc<RwLock<LinkState>>,
}

impl ConnectionStatus {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(LinkState::Disconnected)),
        }
    }

    pub async fn state(&self) -> LinkState {
        *self.state.read().await
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await == LinkState::Connected
    }

    async fn set(&self, state: LinkState) {
        *self.state.write().await = state;
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer of raw sensor lines. Implemented by the service pipeline;
/// must not fail, ingestion errors are its own concern.
#[async_trait]
pub trait LineHandler: Send + Sync {
    async fn handle_line(&self, line: &str);
}

/// Keeps the ingestion channel alive and drives lines through the handler
pub struct ConnectionSupervisor {
    source: Box<dyn LineSource>,
    handler: Arc<dyn LineHandler>,
    status: ConnectionStatus,
    reconnect_delay: Duration,
}

impl ConnectionSupervisor {
    pub fn new(
        source: Box<dyn LineSource>,
        handler: Arc<dyn LineHandler>,
        status: ConnectionStatus,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            source,
            handler,
            status,
            reconnect_delay,
        }
    }

    /// Run the supervision loop on a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            self.status.set(LinkState::Connecting).await;
            if attempt > 1 {
                info!(attempt, channel = %self.source.describe(), "Reconnecting sensor channel");
            }

            match self.source.connect().await {
                Ok(()) => {
                    info!(channel = %self.source.describe(), "Sensor channel open");
                    self.status.set(LinkState::Connected).await;
                    self.pump().await;
                }
                Err(e) => {
                    warn!("Failed to open sensor channel: {e}");
                }
            }

            self.status.set(LinkState::Disconnected).await;
            debug!(
                delay_secs = self.reconnect_delay.as_secs(),
                "Sensor channel down, reconnect scheduled"
            );
            sleep(self.reconnect_delay).await;
        }
    }

    /// Read lines until the channel closes or errors. Lines are handed to
    /// the handler synchronously, so no two lines are processed at once.
    async fn pump(&mut self) {
        loop {
            match self.source.next_line().await {
                Ok(Some(line)) => {
                    debug!(line = %line, "Sensor line received");
                    self.handler.handle_line(&line).await;
                }
                Ok(None) => {
                    warn!("Sensor channel closed");
                    return;
                }
                Err(e) => {
                    warn!("Sensor channel error: {e}");
                    return;
                }
            }
        }
    }
}
