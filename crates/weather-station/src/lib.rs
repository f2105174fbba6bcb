//! weather-station library crate.
//!
//! Serves the station's sample journal to WiFi clients through an AT-command
//! modem, and keeps that journal filled from the sensors.
//!
//! # Architecture
//!
//! ```text
//! WiFi client  ({"index": N} over TCP, via the modem's soft access point)
//!       ↕
//! AT-command modem  (serial line, reached through a TCP serial bridge)
//!       ↕
//! [weather-station]
//!   ├── domain/           StationConfig (TOML), request/reply JSON types
//!   ├── application/      LogRequestHandler, SampleLogger
//!   └── infrastructure/
//!         ├── frame_receiver  serial bytes → RxFrame, reader task → mpsc
//!         ├── at_session      modem state machine, dispatcher, service loop
//!         ├── eeprom_file     file-backed EEPROM image
//!         ├── system_clock    host clock in the RTC's BCD encoding
//!         └── sensors         simulated sensor source
//! ```
//!
//! # Layer rules
//!
//! - `domain` does no I/O.
//! - `application` depends on `domain` and `weather-core` only; it never
//!   touches tokio I/O types directly.
//! - `infrastructure` owns every socket, file, and task.

pub mod application;
pub mod domain;
pub mod infrastructure;
