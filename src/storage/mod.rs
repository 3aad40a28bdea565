//! Storage layer for the classwatch database
//!
//! Durable tables behind an async libsql connection: the RFID registry,
//! the attendance log, the motion log and the noise log.

pub mod database;

pub use database::{AttendanceRow, Database, MotionRow, NoiseRow, RecordKind, RfidUser};
