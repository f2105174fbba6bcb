//! Infrastructure layer: the serial link to the modem, the EEPROM image, the
//! host clock, and the sensors.

pub mod at_session;
pub mod eeprom_file;
pub mod frame_receiver;
pub mod sensors;
pub mod system_clock;

pub use at_session::{AtSession, DispatchOutcome, SessionError, SessionState};
pub use eeprom_file::FileEeprom;
pub use frame_receiver::{spawn_frame_reader, FrameReceiver};
pub use sensors::SimulatedSensor;
pub use system_clock::SystemClock;
