//! Server configuration
//!
//! Runtime settings for the classwatch service. The CLI in `main.rs` fills
//! these from arguments and environment variables; tests construct them
//! directly.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A registry entry seeded into the database at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedUser {
    pub uid: String,
    pub name: String,
}

impl SeedUser {
    pub fn new(uid: &str, name: &str) -> Self {
        Self {
            uid: uid.to_string(),
            name: name.to_string(),
        }
    }
}

/// Ingestion channel selection
#[derive(Debug, Clone)]
pub enum ChannelConfig {
    /// Newline-delimited sensor lines from a serial-over-TCP bridge
    Tcp { addr: String },
    /// Synthetic sensor lines on a fixed interval
    Simulated { interval: Duration },
}

/// Top-level service configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the HTTP API
    pub http_port: u16,

    /// Path of the local database file (":memory:" for tests)
    pub database_path: String,

    /// Delay between reconnect attempts on the sensor channel
    pub reconnect_delay: Duration,

    /// Row cap on the log query endpoints
    pub log_query_cap: usize,

    /// Registry entries inserted at startup if absent
    pub seed_users: Vec<SeedUser>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 3002,
            database_path: "./classwatch.db".to_string(),
            reconnect_delay: Duration::from_secs(5),
            log_query_cap: 50,
            seed_users: default_roster(),
        }
    }
}

/// The fixed classroom roster shipped with the device
pub fn default_roster() -> Vec<SeedUser> {
    vec![
        SeedUser::new("01:40:3B:2E", "Reefah Tasnia"),
        SeedUser::new("01:2D:3D:2E", "Mehnaj Hridi"),
        SeedUser::new("E2:D9:E5:2E", "Progga Ray"),
        SeedUser::new("94:6A:F8:03", "Sifat Bin Asad"),
    ]
}
