//! Weather station service: entry point.
//!
//! Samples the sensors into a circular log kept in an EEPROM image and serves
//! entries from that log to WiFi clients through an AT-command modem.
//!
//! # Usage
//!
//! ```text
//! weather-station [OPTIONS]
//!
//! Options:
//!   --config          <PATH>  TOML configuration file [default: weather-station.toml]
//!   --modem-addr      <ADDR>  TCP serial bridge of the modem UART (overrides modem.address)
//!   --sample-interval <SECS>  Seconds between samples (overrides station.sample_interval_secs)
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                  | Description                         |
//! |---------------------------|-------------------------------------|
//! | `WEATHER_CONFIG`          | Same as `--config`                  |
//! | `WEATHER_MODEM_ADDR`      | Same as `--modem-addr`              |
//! | `WEATHER_SAMPLE_INTERVAL` | Same as `--sample-interval`         |
//! | `RUST_LOG`                | Log filter; beats `station.log_level` |
//!
//! # Startup sequence
//!
//! 1. Load and validate the config, applying CLI overrides.
//! 2. Open the EEPROM image and recover the log's cursor and count.
//! 3. Connect to the modem, bring up the access point and start listening.
//! 4. Sample on a timer and serve requests until Ctrl+C.
//! 5. Stop the modem's server before exiting.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use weather_core::CircularLog;
use weather_station::application::{share_log, LogRequestHandler, SampleLogger};
use weather_station::domain::{load_config, StationConfig};
use weather_station::infrastructure::{
    spawn_frame_reader, AtSession, FileEeprom, SimulatedSensor, SystemClock,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Weather station sample logger and WiFi log server.
#[derive(Debug, Parser)]
#[command(
    name = "weather-station",
    about = "Logs sensor samples and serves them over an AT-command WiFi modem",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.  Missing means all defaults.
    #[arg(long, default_value = "weather-station.toml", env = "WEATHER_CONFIG")]
    config: PathBuf,

    /// `host:port` of the TCP serial bridge the modem UART is exposed on.
    #[arg(long, env = "WEATHER_MODEM_ADDR")]
    modem_addr: Option<String>,

    /// Seconds between sensor samples.
    #[arg(long, env = "WEATHER_SAMPLE_INTERVAL")]
    sample_interval: Option<u64>,
}

impl Cli {
    /// Loads the config file and applies the command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting config does not validate.
    fn into_station_config(self) -> anyhow::Result<StationConfig> {
        let mut config = load_config(&self.config)
            .with_context(|| format!("loading config from {}", self.config.display()))?;

        if let Some(addr) = self.modem_addr {
            config.modem.address = addr;
        }
        if let Some(secs) = self.sample_interval {
            config.station.sample_interval_secs = secs;
        }

        config.validate().context("validating config")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_station_config()?;

    let level = config.station.log_level.clone();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    info!(
        "weather station starting: modem={}, port={}, image={}",
        config.modem.address,
        config.server.port,
        config.storage.image_path.display()
    );

    // ── Sample log ────────────────────────────────────────────────────────────
    let eeprom = FileEeprom::open(&config.storage.image_path, config.storage.eeprom_size)
        .context("opening EEPROM image")?;
    let mut log = CircularLog::new(eeprom, SystemClock, config.storage.geometry())
        .context("building sample log")?;
    log.init().context("recovering sample log")?;
    info!(stored = log.len(), capacity = log.capacity(), "sample log ready");
    let log = share_log(log);

    // ── Modem link ────────────────────────────────────────────────────────────
    let stream = TcpStream::connect(&config.modem.address)
        .await
        .with_context(|| format!("connecting to modem at {}", config.modem.address))?;
    let (read_half, write_half) = stream.into_split();
    let (frames, reader_task) = spawn_frame_reader(
        BufReader::new(read_half),
        config.modem.rx_buffer_capacity,
        config.modem.byte_timeout(),
        config.modem.frame_queue_depth,
    );

    let mut session = AtSession::new(
        write_half,
        frames,
        LogRequestHandler::new(Arc::clone(&log)),
        config.modem.response_timeout(),
    );
    session
        .enter_access_point_mode(&config.access_point)
        .await
        .context("configuring access point")?;
    session
        .start_server(config.server.port)
        .await
        .context("starting modem server")?;

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    let sampler = tokio::spawn(
        SampleLogger::new(SimulatedSensor::new(), log)
            .run(config.station.sample_interval(), Arc::clone(&running)),
    );

    let served = session.run(Arc::clone(&running)).await;
    running.store(false, Ordering::Relaxed);

    if let Err(e) = &served {
        error!("service loop ended: {e}");
    } else if let Err(e) = session.stop_server().await {
        warn!("failed to stop modem server: {e}");
    }

    if let Err(e) = sampler.await {
        warn!("sampler task failed: {e}");
    }
    reader_task.abort();

    info!("weather station stopped");
    served.context("serving clients")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
