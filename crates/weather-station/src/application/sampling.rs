//! Periodic sensor sampling into the journal.
//!
//! [`SampleLogger::run`] wakes every `interval`, reads one [`Sample`] from the
//! [`SensorSource`], and appends it to the shared log.  A failed read or a
//! failed append is logged and skipped; the next tick tries again.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use thiserror::Error;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use weather_core::{Clock, NvMemory, Sample, StorageError};

use super::log_service::SharedLog;

/// How often the loop wakes to check the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum SensorError {
    /// The sensor did not answer within its protocol timing.
    #[error("{sensor} sensor did not respond")]
    NoResponse { sensor: &'static str },

    /// The sensor answered but its checksum did not match.
    #[error("{sensor} sensor checksum mismatch")]
    Checksum { sensor: &'static str },
}

/// Anything that can produce one reading of all three channels.
pub trait SensorSource: Send {
    fn read(&mut self) -> Result<Sample, SensorError>;
}

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("sensor read failed: {0}")]
    Sensor(#[from] SensorError),

    #[error("append failed: {0}")]
    Storage(#[from] StorageError),

    #[error("log lock poisoned by a panicked reader")]
    Poisoned,
}

pub struct SampleLogger<S, M, C> {
    sensor: S,
    log: SharedLog<M, C>,
}

impl<S, M, C> SampleLogger<S, M, C>
where
    S: SensorSource,
    M: NvMemory,
    C: Clock,
{
    pub fn new(sensor: S, log: SharedLog<M, C>) -> Self {
        Self { sensor, log }
    }

    /// Takes one reading and appends it.
    ///
    /// # Errors
    ///
    /// Returns the sensor or storage failure; nothing is appended on error.
    pub fn sample_once(&mut self) -> Result<Sample, SampleError> {
        let sample = self.sensor.read()?;
        let mut log = self.log.lock().map_err(|_| SampleError::Poisoned)?;
        log.append(&sample.to_bytes())?;
        debug!(
            temperature = sample.temperature,
            humidity = sample.humidity,
            light = sample.light,
            stored = log.len(),
            "sample logged"
        );
        Ok(sample)
    }
}

impl<S, M, C> SampleLogger<S, M, C>
where
    S: SensorSource + 'static,
    M: NvMemory + Send + 'static,
    C: Clock + Send + 'static,
{
    /// Samples every `period` until `running` is cleared.
    ///
    /// The first sample is taken immediately.  Each sample runs on the
    /// blocking pool, since the append syncs the EEPROM image to disk.
    pub async fn run(self, period: Duration, running: Arc<AtomicBool>) {
        let mut logger = self;
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("sampling every {}s", period.as_secs());

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping sampler");
                break;
            }

            // `tick` is cancel-safe, so the short timeout only lets the loop
            // look at the flag; it never loses a tick.
            if timeout(SHUTDOWN_POLL, ticker.tick()).await.is_err() {
                continue;
            }

            let joined = tokio::task::spawn_blocking(move || {
                let result = logger.sample_once();
                (logger, result)
            })
            .await;
            let result = match joined {
                Ok((returned, result)) => {
                    logger = returned;
                    result
                }
                Err(e) => {
                    error!("sampler task failed: {e}");
                    break;
                }
            };
            if let Err(e) = result {
                warn!("sample skipped: {e}");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
