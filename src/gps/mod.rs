// src/gps/mod.rs
//! Position fixture and NMEA encoding

pub mod data;
pub mod nmea;

pub use data::{Fix, GeoPosition, TimeReference};
