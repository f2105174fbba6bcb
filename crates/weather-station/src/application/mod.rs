//! Application layer: the two use cases the station runs.
//!
//! - [`log_service`] answers client requests from the journal.
//! - [`sampling`] fills the journal from the sensors.

pub mod log_service;
pub mod sampling;

pub use log_service::{share_log, LogRequestHandler, LookupError, SharedLog};
pub use sampling::{SampleError, SampleLogger, SensorError, SensorSource};
