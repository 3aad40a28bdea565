//! Service wiring
//!
//! One `Service` instance owns every shared component: the database, the
//! attendance engine, the duplicate tracker, the stats aggregator and the
//! channel status cell. Construction runs the startup sequence (schema,
//! session-log purge, roster seeding); `process_line` is the single entry
//! point for sensor lines from both the supervisor and `POST /simulate`.

use crate::classifier::{classify, Event, NoiseStatus};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::ingest::{ConnectionStatus, ConnectionSupervisor, LineHandler, LineSource};
use crate::services::{AttendanceEngine, DuplicateTracker, Outcome, StatsAggregator};
use crate::storage::Database;
use async_trait::async_trait;
use chrono::Local;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// What happened to one classified event
#[derive(Debug, Clone)]
pub enum EventOutcome {
    Attendance(Outcome),
    Motion { time: String },
    Noise { db: f64, status: NoiseStatus },
}

/// The classwatch service instance
pub struct Service {
    config: ServerConfig,
    db: Arc<Database>,
    tracker: DuplicateTracker,
    engine: AttendanceEngine,
    stats: StatsAggregator,
    status: ConnectionStatus,
}

impl Service {
    /// Open the database, run the startup sequence and wire the components
    pub async fn new(config: ServerConfig) -> Result<Arc<Self>> {
        let db = Arc::new(Database::open(&config.database_path).await?);
        db.purge_session_logs().await?;
        db.seed_roster(&config.seed_users).await?;
        info!(
            roster = config.seed_users.len(),
            "Registry seeded, service ready"
        );

        let tracker = DuplicateTracker::new();
        let status = ConnectionStatus::new();
        let engine = AttendanceEngine::new(db.clone(), tracker.clone());
        let stats = StatsAggregator::new(db.clone(), status.clone());

        Ok(Arc::new(Self {
            config,
            db,
            tracker,
            engine,
            stats,
            status,
        }))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn database(&self) -> Arc<Database> {
        self.db.clone()
    }

    pub fn duplicates(&self) -> &DuplicateTracker {
        &self.tracker
    }

    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.status.clone()
    }

    /// Start the connection supervisor on the configured source
    pub fn spawn_supervisor(self: &Arc<Self>, source: Box<dyn LineSource>) -> JoinHandle<()> {
        ConnectionSupervisor::new(
            source,
            self.clone(),
            self.status.clone(),
            self.config.reconnect_delay,
        )
        .spawn()
    }

    /// Classify one raw line and apply every resulting event.
    ///
    /// Fails on the first persistence error; the remaining events of the
    /// line are abandoned, nothing is re-queued.
    pub async fn process_line(&self, line: &str) -> Result<Vec<EventOutcome>> {
        let events = classify(line, Local::now());
        if events.is_empty() {
            debug!(line = %line, "Line matched no sensor pattern");
            return Ok(Vec::new());
        }

        let mut outcomes = Vec::with_capacity(events.len());
        for event in events {
            match event {
                Event::Noise(reading) => {
                    self.db
                        .insert_noise(&reading.time, reading.db, reading.status.as_str())
                        .await?;
                    debug!(db = reading.db, status = reading.status.as_str(), "Noise reading logged");
                    outcomes.push(EventOutcome::Noise {
                        db: reading.db,
                        status: reading.status,
                    });
                }
                Event::Motion(motion) => {
                    self.db.insert_motion(&motion.time).await?;
                    info!(time = %motion.time, "Motion detected");
                    outcomes.push(EventOutcome::Motion { time: motion.time });
                }
                Event::Rfid(scan) => {
                    let outcome = self.engine.decide(&scan).await?;
                    outcomes.push(EventOutcome::Attendance(outcome));
                }
            }
        }
        Ok(outcomes)
    }
}

#[async_trait]
impl LineHandler for Service {
    async fn handle_line(&self, line: &str) {
        if let Err(e) = self.process_line(line).await {
            // Ingestion-path persistence failures are logged and abandoned
            error!("Failed to process sensor line: {e}");
        }
    }
}
