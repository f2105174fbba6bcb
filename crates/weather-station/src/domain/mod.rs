//! Domain layer: configuration and the JSON exchanged with WiFi clients.
//!
//! Nothing here opens a socket or spawns a task.  `config` also owns loading
//! and saving its TOML file.

pub mod config;
pub mod messages;

pub use config::{
    load_config, save_config, AccessPointConfig, ConfigError, ModemConfig, ServerConfig,
    StationConfig, StationSettings, StorageConfig,
};
pub use messages::{ErrorReply, LogEntryReply, LogReply, LogRequest};
