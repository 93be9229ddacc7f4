// src/emulator.rs
//! Pseudo-terminal setup and the once-per-second emission loop

use crate::{
    config::EmulatorConfig,
    error::{GpsError, Result},
    gps::{
        data::Fix,
        nmea::{self, Sentence},
    },
};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    time::{interval, MissedTickBehavior},
};
use tokio_serial::SerialStream;

/// Interval between emission cycles
pub const TICK: Duration = Duration::from_secs(1);

/// A virtual GPS device backed by a pseudo-terminal pair
pub struct VirtualGps {
    master: SerialStream,
    // Held open so writes to the master never see a hung-up slave
    _slave: SerialStream,
    device_path: PathBuf,
}

impl VirtualGps {
    /// Open a pseudo-terminal pair. Must be called inside a tokio runtime.
    #[cfg(unix)]
    pub fn open() -> Result<Self> {
        use tokio_serial::SerialPort;

        let (master, slave) = SerialStream::pair()?;
        let device_path = slave
            .name()
            .map(PathBuf::from)
            .ok_or_else(|| GpsError::Other("Unable to get the slave pty name".to_string()))?;

        tracing::info!("Opened pseudo-terminal {}", device_path.display());

        Ok(Self {
            master,
            _slave: slave,
            device_path,
        })
    }

    #[cfg(not(unix))]
    pub fn open() -> Result<Self> {
        Err(GpsError::Other("Pseudo-terminals are only available on Unix".to_string()))
    }

    /// Path consumers open to read the NMEA stream
    pub fn device_path(&self) -> &Path {
        &self.device_path
    }

    /// Make the device read-only for everyone (0444)
    #[cfg(unix)]
    pub fn set_read_only(&self) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        std::fs::set_permissions(&self.device_path, std::fs::Permissions::from_mode(0o444))
            .map_err(|e| {
                GpsError::Other(format!(
                    "Unable to change permissions of '{}': {}",
                    self.device_path.display(),
                    e
                ))
            })
    }

    #[cfg(not(unix))]
    pub fn set_read_only(&self) -> Result<()> {
        Err(GpsError::Other("Pseudo-terminals are only available on Unix".to_string()))
    }

    /// Emit sentences until `running` is cleared
    pub async fn run(&mut self, config: &EmulatorConfig, running: Arc<AtomicBool>) -> Result<()> {
        drive(&mut self.master, config, running).await
    }
}

/// Generate, write and wait for the next tick until `running` is cleared.
/// A failed write ends the loop with an error.
pub async fn drive<W>(writer: &mut W, config: &EmulatorConfig, running: Arc<AtomicBool>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut cycles: u64 = 0;
    let mut ticker = interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // First tick completes immediately
    ticker.tick().await;

    while running.load(Ordering::Relaxed) {
        let fix = Fix::now(config.position, config.time_reference);
        emit_cycle(writer, &fix).await?;
        cycles += 1;

        ticker.tick().await;
    }

    tracing::info!("Shutdown requested, stopping after {} cycles", cycles);
    Ok(())
}

/// Encode one fix and write its three sentences in order
pub async fn emit_cycle<W>(writer: &mut W, fix: &Fix) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let sentences = nmea::encode(fix);

    for sentence in &sentences {
        nmea::verify_sentence(sentence.as_str())?;
    }

    for sentence in &sentences {
        write_sentence(writer, sentence).await?;
    }
    writer.flush().await?;

    Ok(())
}

async fn write_sentence<W>(writer: &mut W, sentence: &Sentence) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    tracing::debug!("{}", sentence.as_str().trim_end());
    writer.write_all(sentence.as_bytes()).await.map_err(|e| {
        tracing::error!("Failed to write {}: {}", sentence.talker(), e);
        GpsError::Io(e)
    })
}

/// Clear `running` on SIGINT or SIGTERM. Only the flag is touched;
/// the loop logs once it notices.
#[cfg(unix)]
pub fn install_shutdown_handler(running: Arc<AtomicBool>) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())
        .map_err(|e| GpsError::Other(format!("Unable to handle the SIGINT signal: {}", e)))?;
    let mut terminate = signal(SignalKind::terminate())
        .map_err(|e| GpsError::Other(format!("Unable to handle the SIGTERM signal: {}", e)))?;

    tokio::spawn(async move {
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
        running.store(false, Ordering::Relaxed);
    });

    Ok(())
}

#[cfg(not(unix))]
pub fn install_shutdown_handler(running: Arc<AtomicBool>) -> Result<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            running.store(false, Ordering::Relaxed);
        }
    });

    Ok(())
}
