//! Attendance decision engine
//!
//! Consumes RFID scan events and decides between three outcomes: a new
//! present record, an unauthorized-entry record, or a duplicate attempt.
//! Decisions are serialized through an internal mutex so the lookup and the
//! insert behave as one step even when scans arrive back to back; the
//! storage layer's partial unique index on present rows is the backstop.

use crate::classifier::RfidScan;
use crate::error::Result;
use crate::services::duplicate_tracker::{DuplicateAttempt, DuplicateTracker};
use crate::storage::{AttendanceRow, Database, RecordKind};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Name stored on attendance rows for unrecognized tags
pub const UNAUTHORIZED_NAME: &str = "Unauthorized entry";

/// Result of one attendance decision
#[derive(Debug, Clone)]
pub enum Outcome {
    /// First scan of a registered tag today; a present row was appended
    Present(AttendanceRow),
    /// Unrecognized tag; an unauthorized row was appended (every time, no dedup)
    Unauthorized(AttendanceRow),
    /// Registered tag already present today; tracked, attendance log untouched
    Duplicate(DuplicateAttempt),
}

/// Decides what an RFID scan means for today's attendance ledger
pub struct AttendanceEngine {
    db: Arc<Database>,
    tracker: DuplicateTracker,
    // Serializes lookup + insert across concurrent callers
    gate: Mutex<()>,
}

impl AttendanceEngine {
    pub fn new(db: Arc<Database>, tracker: DuplicateTracker) -> Self {
        Self {
            db,
            tracker,
            gate: Mutex::new(()),
        }
    }

    /// Decide and record the outcome of one scan
    pub async fn decide(&self, scan: &RfidScan) -> Result<Outcome> {
        let _serialized = self.gate.lock().await;

        let user = match self.db.find_user(&scan.uid).await? {
            Some(user) => user,
            None => {
                let id = self
                    .db
                    .insert_attendance(
                        &scan.uid,
                        UNAUTHORIZED_NAME,
                        &scan.time,
                        &scan.date,
                        RecordKind::Unauthorized,
                    )
                    .await?;
                warn!(uid = %scan.uid, "Unauthorized entry logged");
                return Ok(Outcome::Unauthorized(AttendanceRow {
                    id,
                    uid: scan.uid.clone(),
                    name: UNAUTHORIZED_NAME.to_string(),
                    time: scan.time.clone(),
                    date: scan.date.clone(),
                    kind: RecordKind::Unauthorized.as_str().to_string(),
                }));
            }
        };

        if self.db.has_present(&scan.uid, &scan.date).await? {
            let attempt = DuplicateAttempt {
                uid: scan.uid.clone(),
                name: user.name.clone(),
                time: scan.time.clone(),
                date: scan.date.clone(),
                detected_at: Utc::now().to_rfc3339(),
            };
            self.tracker.push(attempt.clone()).await;
            info!(name = %user.name, uid = %scan.uid, "Duplicate check-in, already present today");
            return Ok(Outcome::Duplicate(attempt));
        }

        let id = self
            .db
            .insert_attendance(
                &scan.uid,
                &user.name,
                &scan.time,
                &scan.date,
                RecordKind::Present,
            )
            .await?;
        info!(name = %user.name, uid = %scan.uid, time = %scan.time, "Attendance logged");
        Ok(Outcome::Present(AttendanceRow {
            id,
            uid: scan.uid.clone(),
            name: user.name,
            time: scan.time.clone(),
            date: scan.date.clone(),
            kind: RecordKind::Present.as_str().to_string(),
        }))
    }
}
