// src/lib.rs
//! Virtual GPS Library
//!
//! Emulates a GPS receiver by writing NMEA-0183 sentences for a fixed
//! position to a pseudo-terminal once per second.

pub mod config;
pub mod emulator;
pub mod error;
pub mod gps;

// Re-export main types for convenience
pub use config::EmulatorConfig;
pub use emulator::VirtualGps;
pub use error::{GpsError, Result};
pub use gps::data::{Fix, GeoPosition, TimeReference};
pub use gps::nmea::{encode, Sentence};
