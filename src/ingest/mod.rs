//! Sensor channel ingestion
//!
//! Line sources for the hardware channel plus the connection supervisor
//! that keeps one of them alive and feeds the classification pipeline.

pub mod source;
pub mod supervisor;

pub use source::{LineSource, SimulatedLineSource, TcpLineSource};
pub use supervisor::{ConnectionStatus, ConnectionSupervisor, LineHandler, LinkState};

use crate::config::ChannelConfig;

/// Build the line source selected by configuration
pub fn source_for(channel: &ChannelConfig) -> Box<dyn LineSource> {
    match channel {
        ChannelConfig::Tcp { addr } => Box::new(TcpLineSource::new(addr.clone())),
        ChannelConfig::Simulated { interval } => Box::new(SimulatedLineSource::new(*interval)),
    }
}
