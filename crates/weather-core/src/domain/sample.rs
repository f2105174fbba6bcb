//! One sensor reading.

use serde::{Deserialize, Serialize};

/// Number of payload bytes a [`Sample`] occupies in a journal record.
pub const SAMPLE_WIDTH: usize = 3;

/// A single reading from the station's three sensors.
///
/// Each channel is an 8-bit value as produced by the sensor front-end; units
/// are device-specific and not interpreted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Sample {
    pub temperature: u8,
    pub humidity: u8,
    pub light: u8,
}

impl Sample {
    pub const fn new(temperature: u8, humidity: u8, light: u8) -> Self {
        Self {
            temperature,
            humidity,
            light,
        }
    }

    /// Journal payload layout: temperature, humidity, light.
    pub const fn to_bytes(&self) -> [u8; SAMPLE_WIDTH] {
        [self.temperature, self.humidity, self.light]
    }

    pub const fn from_bytes(bytes: [u8; SAMPLE_WIDTH]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_payload_order_is_temperature_humidity_light() {
        let sample = Sample::new(21, 55, 200);

        assert_eq!(sample.to_bytes(), [21, 55, 200]);
        assert_eq!(Sample::from_bytes([21, 55, 200]), sample);
    }
}
