//! Sensor line classifier
//!
//! Turns one raw text line from the sensor channel into zero or more typed
//! events. The three patterns (noise reading, motion trigger, RFID scan) are
//! checked independently, so a single line can yield several events.

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Decibel cutoff separating `Quiet` from `Noise`
pub const NOISE_THRESHOLD_DB: f64 = 35.0;

static UID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"UID:\s*([A-Fa-f0-9:]+)").expect("valid UID pattern"));

/// Noise level relative to the fixed threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoiseStatus {
    Quiet,
    Noise,
}

impl NoiseStatus {
    /// Status for a decibel value
    pub fn for_level(db: f64) -> Self {
        if db >= NOISE_THRESHOLD_DB {
            Self::Noise
        } else {
            Self::Quiet
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quiet => "Quiet",
            Self::Noise => "Noise",
        }
    }
}

/// A decibel reading reported by the sound sensor
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseReading {
    pub db: f64,
    pub status: NoiseStatus,
    pub time: String,
}

/// A motion trigger from the PIR/ultrasonic sensor. Motion events carry no
/// distance or sensor id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionEvent {
    pub time: String,
}

/// An RFID tag scan with its uppercased hex-colon uid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RfidScan {
    pub uid: String,
    pub time: String,
    pub date: String,
}

/// Typed event extracted from a raw sensor line
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Noise(NoiseReading),
    Motion(MotionEvent),
    Rfid(RfidScan),
}

/// Human-facing timestamp used in log rows
pub fn time_string(at: DateTime<Local>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Calendar-day key used for duplicate detection
pub fn date_string(at: DateTime<Local>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Classify one raw line into typed events.
///
/// Each pattern is evaluated unconditionally; a line that matches none of
/// them yields an empty vec rather than an error. Malformed numeric payloads
/// after `DB:` are dropped silently.
pub fn classify(line: &str, at: DateTime<Local>) -> Vec<Event> {
    let mut events = Vec::new();

    if let Some(payload) = line.strip_prefix("DB:") {
        if let Ok(db) = payload.trim().parse::<f64>() {
            events.push(Event::Noise(NoiseReading {
                db,
                status: NoiseStatus::for_level(db),
                time: time_string(at),
            }));
        }
    }

    if line.to_lowercase().contains("motion detected") || line.contains("Movement!") {
        events.push(Event::Motion(MotionEvent {
            time: time_string(at),
        }));
    }

    if line.contains("UID:") {
        if let Some(captures) = UID_PATTERN.captures(line) {
            events.push(Event::Rfid(RfidScan {
                uid: captures[1].to_uppercase(),
                time: time_string(at),
                date: date_string(at),
            }));
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap()
    }

    #[test]
    fn noise_reading_above_threshold_is_noise() {
        let events = classify("DB: 42.3", at());
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::Noise(reading) => {
                assert_eq!(reading.db, 42.3);
                assert_eq!(reading.status, NoiseStatus::Noise);
            }
            other => panic!("expected noise reading, got {other:?}"),
        }
    }

    #[test]
    fn noise_reading_below_threshold_is_quiet() {
        match &classify("DB: 28.1", at())[0] {
            Event::Noise(reading) => assert_eq!(reading.status, NoiseStatus::Quiet),
            other => panic!("expected noise reading, got {other:?}"),
        }
    }

    #[test]
    fn threshold_value_itself_counts_as_noise() {
        match &classify("DB: 35.0", at())[0] {
            Event::Noise(reading) => assert_eq!(reading.status, NoiseStatus::Noise),
            other => panic!("expected noise reading, got {other:?}"),
        }
    }

    #[test]
    fn malformed_noise_payload_is_dropped() {
        assert!(classify("DB: abc", at()).is_empty());
    }

    #[test]
    fn motion_patterns_match_case_insensitively() {
        assert_eq!(classify("Motion detected!", at()).len(), 1);
        assert_eq!(classify("motion detected near door", at()).len(), 1);
        assert_eq!(classify("Movement!", at()).len(), 1);
        assert!(classify("No motion", at()).is_empty());
    }

    #[test]
    fn uid_is_extracted_and_uppercased() {
        match &classify("UID: aa:bb:cc:dd", at())[0] {
            Event::Rfid(scan) => {
                assert_eq!(scan.uid, "AA:BB:CC:DD");
                assert_eq!(scan.date, "2025-03-14");
            }
            other => panic!("expected rfid scan, got {other:?}"),
        }
    }

    #[test]
    fn uid_marker_without_hex_token_yields_nothing() {
        assert!(classify("UID: zz-not-hex", at()).is_empty());
    }

    #[test]
    fn one_line_can_yield_several_events() {
        let events = classify("UID: FF:FF:FF:FF Motion detected", at());
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::Motion(_)));
        assert!(matches!(events[1], Event::Rfid(_)));
    }

    #[test]
    fn unmatched_lines_produce_no_events() {
        assert!(classify("Arduino boot v1.2", at()).is_empty());
        assert!(classify("", at()).is_empty());
    }
}
