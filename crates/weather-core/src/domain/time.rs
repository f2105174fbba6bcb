//! Clock timestamps: the packed register form and the decoded calendar form.
//!
//! The station's real-time clock keeps every calendar field as packed binary
//! coded decimal (BCD): the tens digit in the high nibble and the units digit
//! in the low nibble, so `0x59` means fifty-nine.  Journal records store the
//! seven register bytes exactly as the clock returned them; decoding to plain
//! integers happens only when a reply is built.
//!
//! ```text
//! register order:  seconds minutes hours day_of_week day_of_month month year
//! example bytes:   0x30    0x15    0x09  0x02        0x14         0x05  0x24
//! decoded:         30      15      9     2 (Mon)     14           5     24
//! ```
//!
//! Day-of-week follows the clock chip convention of `1..=7` with `1` being
//! Sunday.  The year is the two-digit year within the century.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Width in bytes of an [`RtcTime`] once flattened to register order.
pub const RTC_TIME_WIDTH: usize = 7;

/// Error returned when a calendar field cannot be represented by the clock.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TimeError {
    /// A field is outside the range the clock register accepts.
    #[error("calendar field {field} out of range: {value}")]
    FieldOutOfRange { field: &'static str, value: u8 },
}

// ── Bcd ───────────────────────────────────────────────────────────────────────

/// A single packed two-digit BCD byte.
///
/// Raw bytes are accepted as-is (an erased EEPROM cell reads `0xFF`, which is
/// not valid BCD but must still round-trip through storage unchanged).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bcd(u8);

impl Bcd {
    /// Wraps a raw register byte without validation.
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// Packs a decimal value in `0..=99`.
    ///
    /// Returns `None` for values that need more than two decimal digits.
    pub const fn encode(value: u8) -> Option<Self> {
        if value > 99 {
            return None;
        }
        Some(Self(((value / 10) << 4) | (value % 10)))
    }

    /// Returns the raw register byte.
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Unpacks the two nibbles into a decimal value.
    ///
    /// Invalid nibbles are decoded arithmetically rather than rejected, so
    /// `0xFF` decodes to `165`.
    pub const fn decode(self) -> u8 {
        (self.0 >> 4) * 10 + (self.0 & 0x0F)
    }
}

// ── RtcTime ───────────────────────────────────────────────────────────────────

/// A timestamp in the clock chip's native packed encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RtcTime {
    pub seconds: Bcd,
    pub minutes: Bcd,
    pub hours: Bcd,
    pub day_of_week: Bcd,
    pub day_of_month: Bcd,
    pub month: Bcd,
    pub year: Bcd,
}

impl RtcTime {
    /// Flattens the timestamp into register order.
    pub fn to_bytes(&self) -> [u8; RTC_TIME_WIDTH] {
        [
            self.seconds.raw(),
            self.minutes.raw(),
            self.hours.raw(),
            self.day_of_week.raw(),
            self.day_of_month.raw(),
            self.month.raw(),
            self.year.raw(),
        ]
    }

    /// Rebuilds a timestamp from register-ordered bytes.
    pub fn from_bytes(bytes: [u8; RTC_TIME_WIDTH]) -> Self {
        Self {
            seconds: Bcd::from_raw(bytes[0]),
            minutes: Bcd::from_raw(bytes[1]),
            hours: Bcd::from_raw(bytes[2]),
            day_of_week: Bcd::from_raw(bytes[3]),
            day_of_month: Bcd::from_raw(bytes[4]),
            month: Bcd::from_raw(bytes[5]),
            year: Bcd::from_raw(bytes[6]),
        }
    }

    /// Decodes every field to a plain decimal integer.
    pub fn decode(&self) -> CalendarTime {
        CalendarTime {
            hour: self.hours.decode(),
            minute: self.minutes.decode(),
            second: self.seconds.decode(),
            day_of_month: self.day_of_month.decode(),
            month: self.month.decode(),
            year: self.year.decode(),
            day_of_week: self.day_of_week.decode(),
        }
    }
}

// ── CalendarTime ──────────────────────────────────────────────────────────────

/// A decoded timestamp with plain integer fields.
///
/// The serde representation is the `timestamp` object of the reply JSON, so
/// field declaration order is also the key order on the wire:
///
/// ```json
/// {"hour":9,"minute":15,"second":30,"dayOfMonth":14,"month":5,"year":24,"dayOfWeek":3}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub day_of_month: u8,
    pub month: u8,
    /// Two-digit year within the century.
    pub year: u8,
    /// `1..=7`, Sunday is `1`.
    pub day_of_week: u8,
}

impl CalendarTime {
    /// Packs the calendar fields into the clock's BCD encoding.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::FieldOutOfRange`] for the first field that the
    /// clock registers cannot hold.
    pub fn encode(&self) -> Result<RtcTime, TimeError> {
        check("second", self.second, 0, 59)?;
        check("minute", self.minute, 0, 59)?;
        check("hour", self.hour, 0, 23)?;
        check("day_of_week", self.day_of_week, 1, 7)?;
        check("day_of_month", self.day_of_month, 1, 31)?;
        check("month", self.month, 1, 12)?;
        check("year", self.year, 0, 99)?;

        // Every field is now known to be <= 99, so `encode` cannot fail.
        let pack = |v: u8| Bcd::encode(v).unwrap_or_default();
        Ok(RtcTime {
            seconds: pack(self.second),
            minutes: pack(self.minute),
            hours: pack(self.hour),
            day_of_week: pack(self.day_of_week),
            day_of_month: pack(self.day_of_month),
            month: pack(self.month),
            year: pack(self.year),
        })
    }

    /// Converts seconds since the Unix epoch (UTC) to calendar fields.
    ///
    /// Uses Howard Hinnant's O(1) `civil_from_days` algorithm.
    /// Reference: <http://howardhinnant.github.io/date_algorithms.html>
    pub fn from_unix_secs(unix_secs: u64) -> Self {
        const SECONDS_PER_DAY: u64 = 86_400;

        let days = (unix_secs / SECONDS_PER_DAY) as i64;
        let secs_today = unix_secs % SECONDS_PER_DAY;
        let (year, month, day) = civil_from_days(days);

        // 1970-01-01 was a Thursday, which is 5 when Sunday is 1.
        let day_of_week = ((days + 4) % 7) as u8 + 1;

        Self {
            hour: (secs_today / 3600) as u8,
            minute: ((secs_today % 3600) / 60) as u8,
            second: (secs_today % 60) as u8,
            day_of_month: day,
            month,
            year: (year % 100) as u8,
            day_of_week,
        }
    }
}

fn check(field: &'static str, value: u8, min: u8, max: u8) -> Result<(), TimeError> {
    if value < min || value > max {
        return Err(TimeError::FieldOutOfRange { field, value });
    }
    Ok(())
}

/// Days since 1970-01-01 to a civil `(year, month, day)`.
fn civil_from_days(days_since_epoch: i64) -> (i64, u8, u8) {
    // Shift the epoch to 0000-03-01 so the leap day is the last day of a year.
    let z = days_since_epoch + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097; // [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365; // [0, 399]
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * doy + 2) / 153; // March = 0
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
