// src/config.rs
//! Emulator configuration: defaults, config file, command-line overrides

use crate::{
    error::{GpsError, Result},
    gps::data::{GeoPosition, TimeReference},
};
use serde::{Deserialize, Serialize};
use std::{
    io::ErrorKind,
    path::Path,
};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/vgps.conf";

/// Settings read from a config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    pub time: Option<TimeReference>,
    pub verbose: Option<bool>,
}

/// Values supplied on the command line, applied after the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    pub time: Option<TimeReference>,
    pub verbose: bool,
}

/// Effective configuration, built once at startup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmulatorConfig {
    pub position: GeoPosition,
    pub time_reference: TimeReference,
    pub verbose: bool,
}

impl EmulatorConfig {
    /// Build from the config file at `path` (if present) plus overrides
    pub fn load(path: &Path, overrides: &Overrides) -> Result<Self> {
        let settings = FileSettings::load(path)?;
        let mut config = Self::default();
        config.apply_file(&settings);
        config.apply_overrides(overrides);
        Ok(config)
    }

    pub fn apply_file(&mut self, settings: &FileSettings) {
        if let Some(latitude) = settings.latitude {
            self.position.latitude = latitude;
        }
        if let Some(longitude) = settings.longitude {
            self.position.longitude = longitude;
        }
        if let Some(elevation) = settings.elevation {
            self.position.elevation = elevation;
        }
        if let Some(time) = settings.time {
            self.time_reference = time;
        }
        if let Some(verbose) = settings.verbose {
            self.verbose = verbose;
        }
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(latitude) = overrides.latitude {
            self.position.latitude = latitude;
        }
        if let Some(longitude) = overrides.longitude {
            self.position.longitude = longitude;
        }
        if let Some(elevation) = overrides.elevation {
            self.position.elevation = elevation;
        }
        if let Some(time) = overrides.time {
            self.time_reference = time;
        }
        self.verbose = self.verbose || overrides.verbose;
    }

    /// Render the effective configuration as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl FileSettings {
    /// Read settings from `path`. A missing or unreadable file yields
    /// empty settings; any other read error is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let Some(contents) = readable_contents(path, std::fs::read_to_string(path))? else {
            return Ok(Self::default());
        };

        let settings = if is_json(path) {
            Self::parse_json(&contents)?
        } else {
            Self::parse_key_value(&contents)?
        };

        tracing::debug!("Loaded config file {}: {:?}", path.display(), settings);
        Ok(settings)
    }

    pub fn parse_json(contents: &str) -> Result<Self> {
        let mut settings: Self = serde_json::from_str(contents)?;
        settings.latitude = settings.latitude.map(truncate_micro);
        settings.longitude = settings.longitude.map(truncate_micro);
        settings.elevation = settings.elevation.map(truncate_micro);
        Ok(settings)
    }

    /// Parse `key=value` lines. Blank lines and `#` comments are skipped,
    /// unknown keys are ignored.
    pub fn parse_key_value(contents: &str) -> Result<Self> {
        let mut settings = Self::default();

        for (index, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                tracing::warn!("Ignoring config line {} without '=': {:?}", index + 1, raw);
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "latitude" => settings.latitude = Some(parse_coordinate(key, value, index)?),
                "longitude" => settings.longitude = Some(parse_coordinate(key, value, index)?),
                "elevation" => settings.elevation = Some(parse_coordinate(key, value, index)?),
                "time" => settings.time = Some(value.parse()?),
                "verbose" => settings.verbose = Some(parse_flag(value, index)?),
                other => tracing::warn!("Ignoring unknown config key '{}'", other),
            }
        }

        Ok(settings)
    }
}

fn readable_contents(path: &Path, read: std::io::Result<String>) -> Result<Option<String>> {
    match read {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            tracing::debug!("Config file {} is not readable, using defaults", path.display());
            Ok(None)
        }
        Err(e) => Err(GpsError::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))),
    }
}

fn parse_flag(value: &str, index: usize) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(GpsError::Config(format!(
            "Invalid verbose '{}' on line {}",
            value,
            index + 1
        ))),
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"))
}

fn parse_coordinate(key: &str, value: &str, index: usize) -> Result<f64> {
    value.parse::<f64>().map(truncate_micro).map_err(|e| {
        GpsError::Config(format!(
            "Invalid {} '{}' on line {}: {}",
            key,
            value,
            index + 1,
            e
        ))
    })
}

/// Truncate to six decimal places (about 0.1 m of latitude)
pub fn truncate_micro(value: f64) -> f64 {
    (1_000_000.0 * value).floor() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmulatorConfig::default();
        assert_eq!(config.position, GeoPosition::default());
        assert_eq!(config.time_reference, TimeReference::Utc);
        assert!(!config.verbose);
    }

    #[test]
    fn test_parse_key_value() {
        let contents = "\
# virtual gps position
latitude=52.2298
longitude = -2.01187

elevation=101.5
colour=blue
";
        let settings = FileSettings::parse_key_value(contents).unwrap();
        assert_eq!(settings.latitude, Some(52.2298));
        assert_eq!(settings.longitude, Some(-2.01187));
        assert_eq!(settings.elevation, Some(101.5));
        assert_eq!(settings.time, None);
    }

    #[test]
    fn test_parse_key_value_time() {
        let settings = FileSettings::parse_key_value("time=local\n").unwrap();
        assert_eq!(settings.time, Some(TimeReference::Local));
    }

    #[test]
    fn test_parse_key_value_rejects_bad_number() {
        let result = FileSettings::parse_key_value("latitude=north\n");
        assert!(matches!(result, Err(GpsError::Config(_))));
    }

    #[test]
    fn test_values_truncated_to_six_places() {
        let settings = FileSettings::parse_key_value("latitude=52.12345678\n").unwrap();
        assert!((settings.latitude.unwrap() - 52.123456).abs() < 1e-9);
        assert_eq!(truncate_micro(-2.0000019), -2.000002);
    }

    #[test]
    fn test_parse_json() {
        let settings =
            FileSettings::parse_json(r#"{"latitude": 48.117, "time": "local"}"#).unwrap();
        assert_eq!(settings.latitude, Some(48.117));
        assert_eq!(settings.longitude, None);
        assert_eq!(settings.time, Some(TimeReference::Local));

        assert!(FileSettings::parse_json(r#"{"lattitude": 1.0}"#).is_err());
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut config = EmulatorConfig::default();
        config.apply_file(&FileSettings {
            latitude: Some(10.0),
            longitude: Some(20.0),
            elevation: Some(30.0),
            time: Some(TimeReference::Local),
            verbose: None,
        });
        config.apply_overrides(&Overrides {
            latitude: Some(-1.5),
            verbose: true,
            ..Default::default()
        });

        assert_eq!(config.position, GeoPosition::new(-1.5, 20.0, 30.0));
        assert_eq!(config.time_reference, TimeReference::Local);
        assert!(config.verbose);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("virtual-gps-does-not-exist.conf");
        let config = EmulatorConfig::load(&path, &Overrides::default()).unwrap();
        assert_eq!(config, EmulatorConfig::default());
    }

    #[test]
    fn test_load_file_from_disk() {
        let path = std::env::temp_dir().join(format!("virtual-gps-{}.conf", std::process::id()));
        std::fs::write(&path, "latitude=1.25\nlongitude=2.5\n").unwrap();

        let config = EmulatorConfig::load(&path, &Overrides::default()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.position, GeoPosition::new(1.25, 2.5, 0.0));
    }

    #[test]
    fn test_verbose_from_file() {
        let settings = FileSettings::parse_key_value("verbose=yes\n").unwrap();
        assert_eq!(settings.verbose, Some(true));

        let mut config = EmulatorConfig::default();
        config.apply_file(&settings);
        assert!(config.verbose);

        assert!(FileSettings::parse_key_value("verbose=loud\n").is_err());
    }

    #[test]
    fn test_permission_denied_uses_defaults() {
        let path = Path::new("/etc/vgps.conf");
        let denied = std::io::Error::from(ErrorKind::PermissionDenied);
        assert_eq!(readable_contents(path, Err(denied)).unwrap(), None);

        let other = std::io::Error::from(ErrorKind::InvalidData);
        assert!(matches!(
            readable_contents(path, Err(other)),
            Err(GpsError::Config(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_does_not_fail_startup() {
        use std::os::unix::fs::PermissionsExt;

        let path = std::env::temp_dir().join(format!("virtual-gps-locked-{}.conf", std::process::id()));
        std::fs::write(&path, "latitude=1.25\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();

        // root can still read it, everyone else gets defaults
        let result = EmulatorConfig::load(&path, &Overrides::default());
        std::fs::remove_file(&path).unwrap();

        let config = result.unwrap();
        assert!(config.position.latitude == 0.0 || config.position.latitude == 1.25);
    }

    #[test]
    fn test_to_json() {
        let json = EmulatorConfig::default().to_json().unwrap();
        assert!(json.contains("\"time_reference\": \"utc\""));
    }
}
