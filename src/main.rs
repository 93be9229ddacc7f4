// src/main.rs
//! vgps - virtual GPS receiver on a pseudo-terminal

use clap::Parser;
use std::{
    path::PathBuf,
    sync::{atomic::AtomicBool, Arc},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use virtual_gps::{
    config::{self, EmulatorConfig, Overrides},
    emulator, TimeReference, VirtualGps,
};

#[derive(Debug, Parser)]
#[command(name = "vgps", version, about = "Emit NMEA sentences for a fixed position on a pseudo-terminal")]
struct Args {
    /// Latitude in signed decimal degrees
    #[arg(short = 't', long, allow_negative_numbers = true)]
    latitude: Option<f64>,

    /// Longitude in signed decimal degrees
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    longitude: Option<f64>,

    /// Elevation in meters
    #[arg(short = 'e', long, allow_negative_numbers = true)]
    elevation: Option<f64>,

    /// Clock used for sentence timestamps: utc or local
    #[arg(long)]
    time: Option<TimeReference>,

    /// Config file (key=value, or JSON with a .json extension)
    #[arg(short = 'c', long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Enable diagnostic logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            latitude: self.latitude,
            longitude: self.longitude,
            elevation: self.elevation,
            time: self.time,
            verbose: self.verbose,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = EmulatorConfig::load(&args.config, &args.overrides())?;
    init_tracing(config.verbose);

    if args.print_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    tracing::info!(
        "Position {:.6}, {:.6} at {:.2} m, {} time",
        config.position.latitude,
        config.position.longitude,
        config.position.elevation,
        config.time_reference
    );

    let mut gps = VirtualGps::open()?;

    // Consumers read the device path from stdout
    println!("{}", gps.device_path().display());

    gps.set_read_only()?;

    let running = Arc::new(AtomicBool::new(true));
    emulator::install_shutdown_handler(Arc::clone(&running))?;

    gps.run(&config, running).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_flags() {
        let args = Args::try_parse_from(["vgps", "-t", "52.2298", "-n", "-2.01187", "-e", "12", "-v"])
            .unwrap();
        assert_eq!(args.latitude, Some(52.2298));
        assert_eq!(args.longitude, Some(-2.01187));
        assert_eq!(args.elevation, Some(12.0));
        assert!(args.verbose);
        assert_eq!(args.config, PathBuf::from("/etc/vgps.conf"));
    }

    #[test]
    fn test_time_flag() {
        let args = Args::try_parse_from(["vgps", "--time", "local"]).unwrap();
        assert_eq!(args.overrides().time, Some(TimeReference::Local));
        assert!(Args::try_parse_from(["vgps", "--time", "mars"]).is_err());
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Args::try_parse_from(["vgps", "-x"]).is_err());
    }
}
