//! TOML configuration for the station.
//!
//! Every field has a default, so a missing file, a missing section, or a
//! missing key all fall back to the values the firmware shipped with:
//!
//! ```toml
//! [access_point]
//! ssid = "Weather_AP"
//! password = "10203040"
//! channel = 11
//! encryption = 4
//!
//! [server]
//! port = 12345
//!
//! [modem]
//! address = "127.0.0.1:2000"
//! rx_buffer_capacity = 200
//! byte_timeout_ms = 20
//! response_timeout_ms = 2000
//! frame_queue_depth = 8
//!
//! [storage]
//! image_path = "weather-eeprom.bin"
//! eeprom_size = 1024
//! base_address = 0
//! region_size = 1020
//! metadata_address = 1020
//!
//! [station]
//! sample_interval_secs = 600
//! log_level = "info"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use weather_core::LogGeometry;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value parsed but is not usable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StationConfig {
    #[serde(default)]
    pub access_point: AccessPointConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub modem: ModemConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub station: StationSettings,
}

/// Soft access point the modem brings up.
///
/// The SSID and password are sent to the modem unescaped; neither may
/// contain `"` or `,`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessPointConfig {
    #[serde(default = "default_ssid")]
    pub ssid: String,
    #[serde(default = "default_password")]
    pub password: String,
    /// WiFi channel, 1-13.
    #[serde(default = "default_channel")]
    pub channel: u8,
    /// Modem encryption code (4 = WPA/WPA2-PSK).
    #[serde(default = "default_encryption")]
    pub encryption: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// TCP port the modem listens on for clients.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// The serial link to the modem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModemConfig {
    /// `host:port` of the TCP serial bridge the modem's UART is exposed on.
    #[serde(default = "default_modem_address")]
    pub address: String,
    /// Receive buffer size; a frame reaching it is dropped as overflowed.
    #[serde(default = "default_rx_buffer_capacity")]
    pub rx_buffer_capacity: usize,
    /// Line silence that ends a frame.
    #[serde(default = "default_byte_timeout_ms")]
    pub byte_timeout_ms: u64,
    /// How long to wait for any response to a command.
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    /// Frames buffered between the reader task and the session.
    #[serde(default = "default_frame_queue_depth")]
    pub frame_queue_depth: usize,
}

/// EEPROM image and log placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default = "default_image_path")]
    pub image_path: PathBuf,
    #[serde(default = "default_eeprom_size")]
    pub eeprom_size: usize,
    #[serde(default = "default_base_address")]
    pub base_address: usize,
    #[serde(default = "default_region_size")]
    pub region_size: usize,
    #[serde(default = "default_metadata_address")]
    pub metadata_address: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StationSettings {
    /// Seconds between sensor samples.
    #[serde(default = "default_sample_interval_secs")]
    pub sample_interval_secs: u64,
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_ssid() -> String {
    "Weather_AP".to_string()
}
fn default_password() -> String {
    "10203040".to_string()
}
fn default_channel() -> u8 {
    11
}
fn default_encryption() -> u8 {
    4
}
fn default_port() -> u16 {
    12345
}
fn default_modem_address() -> String {
    "127.0.0.1:2000".to_string()
}
fn default_rx_buffer_capacity() -> usize {
    200
}
fn default_byte_timeout_ms() -> u64 {
    20
}
fn default_response_timeout_ms() -> u64 {
    2000
}
fn default_frame_queue_depth() -> usize {
    8
}
fn default_image_path() -> PathBuf {
    PathBuf::from("weather-eeprom.bin")
}
fn default_eeprom_size() -> usize {
    1024
}
fn default_base_address() -> usize {
    0
}
fn default_region_size() -> usize {
    1020
}
fn default_metadata_address() -> usize {
    1020
}
fn default_sample_interval_secs() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AccessPointConfig {
    fn default() -> Self {
        Self {
            ssid: default_ssid(),
            password: default_password(),
            channel: default_channel(),
            encryption: default_encryption(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            address: default_modem_address(),
            rx_buffer_capacity: default_rx_buffer_capacity(),
            byte_timeout_ms: default_byte_timeout_ms(),
            response_timeout_ms: default_response_timeout_ms(),
            frame_queue_depth: default_frame_queue_depth(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_path: default_image_path(),
            eeprom_size: default_eeprom_size(),
            base_address: default_base_address(),
            region_size: default_region_size(),
            metadata_address: default_metadata_address(),
        }
    }
}

impl Default for StationSettings {
    fn default() -> Self {
        Self {
            sample_interval_secs: default_sample_interval_secs(),
            log_level: default_log_level(),
        }
    }
}

// ── Derived values ────────────────────────────────────────────────────────────

impl ModemConfig {
    pub fn byte_timeout(&self) -> Duration {
        Duration::from_millis(self.byte_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

impl StorageConfig {
    pub fn geometry(&self) -> LogGeometry {
        LogGeometry {
            base_address: self.base_address,
            region_size: self.region_size,
            metadata_address: self.metadata_address,
        }
    }
}

impl StationSettings {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }
}

impl StationConfig {
    /// Rejects values that parse but cannot run.
    ///
    /// Log geometry is checked separately when the log is built.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.station.sample_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "station.sample_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.modem.rx_buffer_capacity < 2 {
            return Err(ConfigError::Invalid(
                "modem.rx_buffer_capacity must be at least 2".to_string(),
            ));
        }
        if self.modem.frame_queue_depth == 0 {
            return Err(ConfigError::Invalid(
                "modem.frame_queue_depth must be greater than zero".to_string(),
            ));
        }
        if self.modem.byte_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "modem.byte_timeout_ms must be greater than zero".to_string(),
            ));
        }
        for (key, value) in [
            ("access_point.ssid", &self.access_point.ssid),
            ("access_point.password", &self.access_point.password),
        ] {
            if value.contains(&['"', ','][..]) {
                return Err(ConfigError::Invalid(format!(
                    "{key} must not contain '\"' or ','"
                )));
            }
        }
        Ok(())
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Loads `StationConfig` from `path`, returning the defaults if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<StationConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: StationConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StationConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating the parent directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(path: &Path, config: &StationConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
