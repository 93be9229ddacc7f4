// src/gps/data.rs
//! Position fixture data structures

use crate::error::{GpsError, Result};
use chrono::{Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A fixed geographic position in signed decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,   // -90..90, not validated
    pub longitude: f64,  // -180..180, not validated
    pub elevation: f64,  // meters
}

impl GeoPosition {
    pub fn new(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
        }
    }
}

/// Which civil clock a fix timestamp is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeReference {
    #[default]
    Utc,
    Local,
}

impl TimeReference {
    /// Resolve the current wall-clock time into a civil timestamp
    pub fn now(&self) -> NaiveDateTime {
        match self {
            TimeReference::Utc => Utc::now().naive_utc(),
            TimeReference::Local => Local::now().naive_local(),
        }
    }
}

impl fmt::Display for TimeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeReference::Utc => write!(f, "utc"),
            TimeReference::Local => write!(f, "local"),
        }
    }
}

impl FromStr for TimeReference {
    type Err = GpsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utc" => Ok(TimeReference::Utc),
            "local" => Ok(TimeReference::Local),
            other => Err(GpsError::Config(format!(
                "unknown time reference '{}', expected 'utc' or 'local'",
                other
            ))),
        }
    }
}

/// One instantaneous position and time sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub timestamp: NaiveDateTime,
    pub position: GeoPosition,
}

impl Fix {
    pub fn new(timestamp: NaiveDateTime, position: GeoPosition) -> Self {
        Self {
            timestamp,
            position,
        }
    }

    /// Build a fix for the current instant on the given clock
    pub fn now(position: GeoPosition, time_reference: TimeReference) -> Self {
        Self::new(time_reference.now(), position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_position_is_origin() {
        let position = GeoPosition::default();
        assert_eq!(position, GeoPosition::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_time_reference_parsing() {
        assert_eq!("utc".parse::<TimeReference>().unwrap(), TimeReference::Utc);
        assert_eq!(" Local ".parse::<TimeReference>().unwrap(), TimeReference::Local);
        assert!("gmt".parse::<TimeReference>().is_err());
    }

    #[test]
    fn test_time_reference_serde() {
        let json = serde_json::to_string(&TimeReference::Local).unwrap();
        assert_eq!(json, "\"local\"");
        let parsed: TimeReference = serde_json::from_str("\"utc\"").unwrap();
        assert_eq!(parsed, TimeReference::Utc);
    }

    #[test]
    fn test_fix_now_keeps_position() {
        let position = GeoPosition::new(52.2298, -2.01187, 10.0);
        let fix = Fix::now(position, TimeReference::Utc);
        assert_eq!(fix.position, position);
    }
}
