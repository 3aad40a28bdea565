//! Local database client
//!
//! Connection management and query execution for the classwatch database,
//! with automatic schema management. Four tables: the RFID registry, the
//! attendance log, the motion log and the noise log. Attendance and motion
//! logs are session-scoped and purged at startup; the registry and the
//! noise log persist across restarts.

use crate::config::SeedUser;
use crate::error::{ClasswatchError, Result};
use libsql::Connection;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Attendance row kind. `Present` rows are first-of-day check-ins of a
/// registered tag; `Unauthorized` rows accumulate for every unrecognized
/// scan with no dedup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Present,
    Unauthorized,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Unauthorized => "unauthorized",
        }
    }
}

/// A registered RFID tag
#[derive(Debug, Clone, Serialize)]
pub struct RfidUser {
    pub id: i64,
    pub uid: String,
    pub name: String,
    pub created_at: String,
}

/// One attendance log row
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRow {
    pub id: i64,
    pub uid: String,
    pub name: String,
    pub time: String,
    pub date: String,
    pub kind: String,
}

/// One motion log row
#[derive(Debug, Clone, Serialize)]
pub struct MotionRow {
    pub id: i64,
    pub time: String,
}

/// One noise log row
#[derive(Debug, Clone, Serialize)]
pub struct NoiseRow {
    pub id: i64,
    pub time: String,
    #[serde(rename = "dB")]
    pub db: f64,
    pub status: String,
}

/// Database client with automatic schema management
pub struct Database {
    // Kept alive for the lifetime of the connection
    _db: libsql::Database,
    connection: Arc<RwLock<Connection>>,
}

impl Database {
    /// Open (or create) the database at `path` and initialize the schema
    pub async fn open(path: &str) -> Result<Self> {
        debug!("Opening database at {path}");

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to open database: {e}")))?;

        let connection = db
            .connect()
            .map_err(|e| ClasswatchError::database(format!("Failed to create connection: {e}")))?;

        let database = Self {
            _db: db,
            connection: Arc::new(RwLock::new(connection)),
        };

        database.initialize_schema().await?;
        Ok(database)
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection.write().await;

        let tables = [
            r#"
            CREATE TABLE IF NOT EXISTS rfid_users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uid TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS attendance_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uid TEXT NOT NULL,
                name TEXT NOT NULL,
                time TEXT NOT NULL,
                date TEXT NOT NULL,
                kind TEXT NOT NULL DEFAULT 'present',
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS motion_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                time TEXT NOT NULL,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS noise_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                time TEXT NOT NULL,
                db_level REAL NOT NULL,
                status TEXT NOT NULL
            )
            "#,
        ];

        for table_sql in &tables {
            conn.execute(table_sql, ())
                .await
                .map_err(|e| ClasswatchError::database(format!("Failed to create table: {e}")))?;
        }

        // At most one present row per tag and day, enforced at the storage
        // layer as well as by engine serialization.
        let indexes = [
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_attendance_present_once \
             ON attendance_logs (uid, date) WHERE kind = 'present'",
            "CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance_logs (date)",
        ];

        for index_sql in &indexes {
            if let Err(e) = conn.execute(index_sql, ()).await {
                warn!("Failed to create index: {index_sql} - {e}");
            }
        }

        debug!("Database schema initialized");
        Ok(())
    }

    /// Clear the session-scoped logs. The attendance and motion tables hold
    /// today's ledger only; the registry and noise log are left alone.
    pub async fn purge_session_logs(&self) -> Result<()> {
        let conn = self.connection.write().await;

        conn.execute("DELETE FROM attendance_logs", ())
            .await
            .map_err(|e| {
                ClasswatchError::database(format!("Failed to clear attendance logs: {e}"))
            })?;
        conn.execute("DELETE FROM motion_logs", ())
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to clear motion logs: {e}")))?;

        info!("Previous attendance and motion logs cleared on server start");
        Ok(())
    }

    /// Insert roster entries that are not registered yet
    pub async fn seed_roster(&self, roster: &[SeedUser]) -> Result<()> {
        let conn = self.connection.write().await;

        for user in roster {
            conn.execute(
                "INSERT OR IGNORE INTO rfid_users (uid, name) VALUES (?1, ?2)",
                (user.uid.as_str(), user.name.as_str()),
            )
            .await
            .map_err(|e| {
                ClasswatchError::database(format!("Failed to seed user {}: {e}", user.name))
            })?;
        }

        Ok(())
    }

    /// Look up a registered tag by uid
    pub async fn find_user(&self, uid: &str) -> Result<Option<RfidUser>> {
        let conn = self.connection.read().await;

        let mut stmt = conn
            .prepare("SELECT id, uid, name, created_at FROM rfid_users WHERE uid = ?1")
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to prepare query: {e}")))?;
        let mut rows = stmt
            .query(libsql::params![uid])
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to execute query: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to fetch row: {e}")))?
        {
            Some(row) => Ok(Some(read_user_row(&row)?)),
            None => Ok(None),
        }
    }

    /// All registered tags, ordered by display name
    pub async fn list_users(&self) -> Result<Vec<RfidUser>> {
        let conn = self.connection.read().await;

        let mut stmt = conn
            .prepare("SELECT id, uid, name, created_at FROM rfid_users ORDER BY name")
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to prepare query: {e}")))?;
        let mut rows = stmt
            .query(())
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to execute query: {e}")))?;

        let mut users = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to fetch row: {e}")))?
        {
            users.push(read_user_row(&row)?);
        }
        Ok(users)
    }

    /// Register a tag, replacing any existing mapping for the uid
    pub async fn upsert_user(&self, uid: &str, name: &str) -> Result<i64> {
        let conn = self.connection.write().await;

        conn.execute(
            "INSERT OR REPLACE INTO rfid_users (uid, name) VALUES (?1, ?2)",
            (uid, name),
        )
        .await
        .map_err(|e| ClasswatchError::database(format!("Failed to register user: {e}")))?;

        Ok(conn.last_insert_rowid())
    }

    /// Append an attendance row and return its id
    pub async fn insert_attendance(
        &self,
        uid: &str,
        name: &str,
        time: &str,
        date: &str,
        kind: RecordKind,
    ) -> Result<i64> {
        let conn = self.connection.write().await;

        conn.execute(
            "INSERT INTO attendance_logs (uid, name, time, date, kind) VALUES (?1, ?2, ?3, ?4, ?5)",
            (uid, name, time, date, kind.as_str()),
        )
        .await
        .map_err(|e| ClasswatchError::database(format!("Failed to log attendance: {e}")))?;

        Ok(conn.last_insert_rowid())
    }

    /// Whether a present row already exists for this tag and day.
    /// Unauthorized rows never count as a first occurrence.
    pub async fn has_present(&self, uid: &str, date: &str) -> Result<bool> {
        let conn = self.connection.read().await;

        let mut stmt = conn
            .prepare(
                "SELECT 1 FROM attendance_logs \
                 WHERE uid = ?1 AND date = ?2 AND kind = 'present' LIMIT 1",
            )
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to prepare query: {e}")))?;
        let mut rows = stmt
            .query(libsql::params![uid, date])
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to execute query: {e}")))?;

        let found = rows
            .next()
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to fetch row: {e}")))?
            .is_some();
        Ok(found)
    }

    /// Attendance rows for a given date, newest first
    pub async fn attendance_on(&self, date: &str, limit: usize) -> Result<Vec<AttendanceRow>> {
        let conn = self.connection.read().await;

        let mut stmt = conn
            .prepare(
                "SELECT id, uid, name, time, date, kind FROM attendance_logs \
                 WHERE date = ?1 ORDER BY id DESC LIMIT ?2",
            )
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to prepare query: {e}")))?;
        let mut rows = stmt
            .query(libsql::params![date, limit as i64])
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to execute query: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to fetch row: {e}")))?
        {
            records.push(AttendanceRow {
                id: row
                    .get(0)
                    .map_err(|e| ClasswatchError::database(format!("Failed to get id: {e}")))?,
                uid: row
                    .get(1)
                    .map_err(|e| ClasswatchError::database(format!("Failed to get uid: {e}")))?,
                name: row
                    .get(2)
                    .map_err(|e| ClasswatchError::database(format!("Failed to get name: {e}")))?,
                time: row
                    .get(3)
                    .map_err(|e| ClasswatchError::database(format!("Failed to get time: {e}")))?,
                date: row
                    .get(4)
                    .map_err(|e| ClasswatchError::database(format!("Failed to get date: {e}")))?,
                kind: row
                    .get(5)
                    .map_err(|e| ClasswatchError::database(format!("Failed to get kind: {e}")))?,
            });
        }
        Ok(records)
    }

    /// Count of distinct tags with a present row on the given date
    pub async fn count_present_on(&self, date: &str) -> Result<i64> {
        let conn = self.connection.read().await;

        let mut stmt = conn
            .prepare(
                "SELECT COUNT(DISTINCT uid) FROM attendance_logs \
                 WHERE date = ?1 AND kind = 'present'",
            )
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to prepare query: {e}")))?;
        let mut rows = stmt
            .query(libsql::params![date])
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to execute query: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to fetch row: {e}")))?
        {
            Some(row) => row
                .get(0)
                .map_err(|e| ClasswatchError::database(format!("Failed to get count: {e}"))),
            None => Ok(0),
        }
    }

    /// Append a motion row
    pub async fn insert_motion(&self, time: &str) -> Result<i64> {
        let conn = self.connection.write().await;

        conn.execute(
            "INSERT INTO motion_logs (time) VALUES (?1)",
            libsql::params![time],
        )
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to log motion: {e}")))?;

        Ok(conn.last_insert_rowid())
    }

    /// Today's motion rows, newest first
    pub async fn motion_today(&self, limit: usize) -> Result<Vec<MotionRow>> {
        let conn = self.connection.read().await;

        let mut stmt = conn
            .prepare(
                "SELECT id, time FROM motion_logs \
                 WHERE date(timestamp, 'localtime') = date('now', 'localtime') \
                 ORDER BY id DESC LIMIT ?1",
            )
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to prepare query: {e}")))?;
        let mut rows = stmt
            .query(libsql::params![limit as i64])
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to execute query: {e}")))?;

        let mut entries = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to fetch row: {e}")))?
        {
            entries.push(MotionRow {
                id: row
                    .get(0)
                    .map_err(|e| ClasswatchError::database(format!("Failed to get id: {e}")))?,
                time: row
                    .get(1)
                    .map_err(|e| ClasswatchError::database(format!("Failed to get time: {e}")))?,
            });
        }
        Ok(entries)
    }

    /// Count of motion rows stamped today
    pub async fn count_motion_today(&self) -> Result<i64> {
        let conn = self.connection.read().await;

        let mut stmt = conn
            .prepare(
                "SELECT COUNT(*) FROM motion_logs \
                 WHERE date(timestamp, 'localtime') = date('now', 'localtime')",
            )
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to prepare query: {e}")))?;
        let mut rows = stmt
            .query(())
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to execute query: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to fetch row: {e}")))?
        {
            Some(row) => row
                .get(0)
                .map_err(|e| ClasswatchError::database(format!("Failed to get count: {e}"))),
            None => Ok(0),
        }
    }

    /// Time of the most recent motion row overall, if any
    pub async fn last_motion_time(&self) -> Result<Option<String>> {
        let conn = self.connection.read().await;

        let mut stmt = conn
            .prepare("SELECT time FROM motion_logs ORDER BY id DESC LIMIT 1")
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to prepare query: {e}")))?;
        let mut rows = stmt
            .query(())
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to execute query: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to fetch row: {e}")))?
        {
            Some(row) => Ok(Some(row.get(0).map_err(|e| {
                ClasswatchError::database(format!("Failed to get time: {e}"))
            })?)),
            None => Ok(None),
        }
    }

    /// Append a noise row
    pub async fn insert_noise(&self, time: &str, db: f64, status: &str) -> Result<i64> {
        let conn = self.connection.write().await;

        conn.execute(
            "INSERT INTO noise_logs (time, db_level, status) VALUES (?1, ?2, ?3)",
            (time, db, status),
        )
        .await
        .map_err(|e| ClasswatchError::database(format!("Failed to log noise reading: {e}")))?;

        Ok(conn.last_insert_rowid())
    }

    /// Most recent noise rows, newest first
    pub async fn noise_log(&self, limit: usize) -> Result<Vec<NoiseRow>> {
        let conn = self.connection.read().await;

        let mut stmt = conn
            .prepare("SELECT id, time, db_level, status FROM noise_logs ORDER BY id DESC LIMIT ?1")
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to prepare query: {e}")))?;
        let mut rows = stmt
            .query(libsql::params![limit as i64])
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to execute query: {e}")))?;

        let mut entries = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| ClasswatchError::database(format!("Failed to fetch row: {e}")))?
        {
            entries.push(NoiseRow {
                id: row
                    .get(0)
                    .map_err(|e| ClasswatchError::database(format!("Failed to get id: {e}")))?,
                time: row
                    .get(1)
                    .map_err(|e| ClasswatchError::database(format!("Failed to get time: {e}")))?,
                db: row
                    .get(2)
                    .map_err(|e| ClasswatchError::database(format!("Failed to get dB: {e}")))?,
                status: row
                    .get(3)
                    .map_err(|e| ClasswatchError::database(format!("Failed to get status: {e}")))?,
            });
        }
        Ok(entries)
    }
}

fn read_user_row(row: &libsql::Row) -> Result<RfidUser> {
    Ok(RfidUser {
        id: row
            .get(0)
            .map_err(|e| ClasswatchError::database(format!("Failed to get id: {e}")))?,
        uid: row
            .get(1)
            .map_err(|e| ClasswatchError::database(format!("Failed to get uid: {e}")))?,
        name: row
            .get(2)
            .map_err(|e| ClasswatchError::database(format!("Failed to get name: {e}")))?,
        created_at: row
            .get(3)
            .map_err(|e| ClasswatchError::database(format!("Failed to get created_at: {e}")))?,
    })
}
