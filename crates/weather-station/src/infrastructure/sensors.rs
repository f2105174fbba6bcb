//! Sensor sources available on a host build.
//!
//! The station's real sensors hang off GPIO and an ADC, which a host process
//! cannot reach.  [`SimulatedSensor`] stands in for them with a slow,
//! deterministic drift so the journal fills with plausible readings.

use tracing::trace;
use weather_core::Sample;

use crate::application::{SensorError, SensorSource};

/// Produces a repeating pattern of readings.
#[derive(Debug, Clone, Default)]
pub struct SimulatedSensor {
    tick: u32,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SensorSource for SimulatedSensor {
    fn read(&mut self) -> Result<Sample, SensorError> {
        let t = self.tick;
        self.tick = self.tick.wrapping_add(1);

        // Temperature 18..=27 C, humidity 40..=69 %, light 0..=255.
        let sample = Sample::new(
            18 + (t % 10) as u8,
            40 + (t.wrapping_mul(7) % 30) as u8,
            (t.wrapping_mul(37) % 256) as u8,
        );
        trace!(tick = t, ?sample, "simulated reading");
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readings_stay_in_range_and_change() {
        let mut sensor = SimulatedSensor::new();

        let readings: Vec<Sample> = (0..50).map(|_| sensor.read().unwrap()).collect();

        assert!(readings.iter().all(|s| (18..=27).contains(&s.temperature)));
        assert!(readings.iter().all(|s| (40..=69).contains(&s.humidity)));
        assert_ne!(readings[0], readings[1]);
    }
}
