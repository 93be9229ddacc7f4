// src/gps/nmea.rs
//! NMEA sentence generation

use super::data::Fix;
use crate::error::{GpsError, Result};
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::fmt;

/// Compute the NMEA checksum: XOR of every byte after an optional leading
/// `$`, up to the first `*` or the end of the string.
pub fn checksum(sentence: &str) -> u8 {
    let bytes = sentence.as_bytes();
    let bytes = bytes.strip_prefix(b"$").unwrap_or(bytes);

    bytes
        .iter()
        .take_while(|&&b| b != b'*')
        .fold(0u8, |acc, &b| acc ^ b)
}

/// Hemisphere for a latitude. Zero counts as south.
pub fn latitude_hemisphere(value: f64) -> char {
    if value > 0.0 { 'N' } else { 'S' }
}

/// Hemisphere for a longitude. Zero counts as west.
pub fn longitude_hemisphere(value: f64) -> char {
    if value > 0.0 { 'E' } else { 'W' }
}

/// A coordinate split into NMEA degrees and decimal minutes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub degrees: u32,
    pub minutes: f64,
    pub hemisphere: char,
    degree_width: usize,
}

impl Coordinate {
    /// Latitude as `DDMM.MMMM`
    pub fn latitude(value: f64) -> Self {
        Self::split(value, latitude_hemisphere(value), 2)
    }

    /// Longitude as `DDDMM.MMMM`
    pub fn longitude(value: f64) -> Self {
        Self::split(value, longitude_hemisphere(value), 3)
    }

    fn split(value: f64, hemisphere: char, degree_width: usize) -> Self {
        let magnitude = value.abs();
        let mut degrees = magnitude.floor();
        let mut minutes = (magnitude - degrees) * 60.0;

        // 59.99995 and up would print as 60.0000
        if (minutes * 10_000.0).round() >= 600_000.0 {
            degrees += 1.0;
            minutes = 0.0;
        }

        Self {
            degrees: degrees as u32,
            minutes,
            hemisphere,
            degree_width,
        }
    }

    /// Degrees and minutes rendered as a single NMEA field
    pub fn text(&self) -> String {
        format!(
            "{:0width$}{:07.4}",
            self.degrees,
            self.minutes,
            width = self.degree_width
        )
    }
}

/// `HHMMSS` from the timestamp's civil time
pub fn time_now(timestamp: &NaiveDateTime) -> String {
    format!(
        "{:02}{:02}{:02}",
        timestamp.hour(),
        timestamp.minute(),
        timestamp.second()
    )
}

/// `DDMMYY` from the timestamp's civil date
pub fn date_now(timestamp: &NaiveDateTime) -> String {
    format!(
        "{:02}{:02}{:02}",
        timestamp.day(),
        timestamp.month(),
        timestamp.year().rem_euclid(100)
    )
}

/// A complete framed sentence: `$<body>*<XX>\r\n`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    text: String,
    body_len: usize,
}

impl Sentence {
    /// Frame a body (talker plus fields, no `$`) with its checksum
    pub fn from_body(body: &str) -> Self {
        let text = format!("${}*{:02X}\r\n", body, checksum(body));
        Self {
            text,
            body_len: body.len(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    /// The part the checksum covers
    pub fn body(&self) -> &str {
        &self.text[1..1 + self.body_len]
    }

    /// Talker and sentence type, e.g. `GPGGA`
    pub fn talker(&self) -> &str {
        self.body().split(',').next().unwrap_or("")
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Encode one fix as GGA, GSA and RMC, in that order
pub fn encode(fix: &Fix) -> [Sentence; 3] {
    let position = &fix.position;
    let lat = Coordinate::latitude(position.latitude);
    let lon = Coordinate::longitude(position.longitude);
    let lat_text = lat.text();
    let lon_text = lon.text();
    let time = time_now(&fix.timestamp);
    let date = date_now(&fix.timestamp);

    // Fix quality 1, 12 satellites, no DGPS age/station
    let gga = format!(
        "GPGGA,{},{},{},{},{},1,12,1.0,{:.2},M,0.0,M,,",
        time, lat_text, lat.hemisphere, lon_text, lon.hemisphere, position.elevation
    );

    let gsa = "GPGSA,A,3,,,,,,,,,,,,,1.0,1.0,1.0";

    let rmc = format!(
        "GPRMC,{},A,{},{},{},{},,,{},000.0,W",
        time, lat_text, lat.hemisphere, lon_text, lon.hemisphere, date
    );

    [
        Sentence::from_body(&gga),
        Sentence::from_body(gsa),
        Sentence::from_body(&rmc),
    ]
}

/// Check framing and checksum of a single sentence.
/// A trailing CRLF is optional.
pub fn verify_sentence(line: &str) -> Result<()> {
    let line = line.strip_suffix("\r\n").unwrap_or(line);

    let rest = line
        .strip_prefix('$')
        .ok_or_else(|| GpsError::MalformedInput(format!("missing '$' in {:?}", line)))?;

    let (body, digits) = rest
        .rsplit_once('*')
        .ok_or_else(|| GpsError::MalformedInput(format!("missing '*' in {:?}", line)))?;

    if body.contains(|c: char| c == '$' || c == '*') || !body.is_ascii() {
        return Err(GpsError::MalformedInput(format!("invalid body in {:?}", line)));
    }

    let well_formed = digits.len() == 2
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c));
    if !well_formed {
        return Err(GpsError::MalformedInput(format!(
            "checksum must be two uppercase hex digits in {:?}",
            line
        )));
    }

    let expected = u8::from_str_radix(digits, 16)
        .map_err(|e| GpsError::MalformedInput(format!("bad checksum in {:?}: {}", line, e)))?;
    let actual = checksum(body);

    if actual != expected {
        return Err(GpsError::EncodingInvariant(format!(
            "{:?} carries {:02X}, body hashes to {:02X}",
            line, expected, actual
        )));
    }

    Ok(())
}
