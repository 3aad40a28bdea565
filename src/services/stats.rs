//! Stats aggregator
//!
//! Read-time summary counters for the dashboard. Each call performs three
//! independent log reads; they are not transactionally consistent with each
//! other, which is acceptable for a polling dashboard.

use crate::classifier::date_string;
use crate::error::Result;
use crate::ingest::ConnectionStatus;
use crate::storage::Database;
use chrono::Local;
use serde::Serialize;
use std::sync::Arc;

/// Sentinel reported when the motion log is empty
const NEVER: &str = "Never";

/// Aggregated counters for `GET /stats`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub connected: bool,
    pub total_present: i64,
    pub total_motion_detected: i64,
    pub last_motion_time: String,
}

/// Computes summary counters fresh on every call
pub struct StatsAggregator {
    db: Arc<Database>,
    status: ConnectionStatus,
}

impl StatsAggregator {
    pub fn new(db: Arc<Database>, status: ConnectionStatus) -> Self {
        Self { db, status }
    }

    pub async fn compute(&self) -> Result<Stats> {
        let today = date_string(Local::now());

        let connected = self.status.is_connected().await;
        let total_present = self.db.count_present_on(&today).await?;
        let total_motion_detected = self.db.count_motion_today().await?;
        let last_motion_time = self
            .db
            .last_motion_time()
            .await?
            .unwrap_or_else(|| NEVER.to_string());

        Ok(Stats {
            connected,
            total_present,
            total_motion_detected,
            last_motion_time,
        })
    }
}
