//! Date/time arithmetic for end-of-aggregation timestamps.
//!
//! Grounded on the teacher's `src/time.rs` (`UtcDateTime`, a plain
//! Y/M/D/h/m/s value type backed by `chrono` for the actual calendar
//! math). Unlike the teacher's `time-calculation`-feature-gated module,
//! `chrono` is an unconditional dependency here (see DESIGN.md).

use chrono::{DateTime, Datelike, TimeDelta, TimeZone, Timelike, Utc};
use std::fmt::{self, Display, Formatter};

use crate::error::GribError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtcDateTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

impl UtcDateTime {
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    fn to_chrono(self) -> Result<DateTime<Utc>, GribError> {
        Utc.with_ymd_and_hms(self.year, self.month, self.day, self.hour, self.minute, self.second)
            .single()
            .ok_or_else(|| {
                GribError::InvariantViolation(format!("invalid date/time: {self}"))
            })
    }

    fn from_chrono(dt: DateTime<Utc>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
        }
    }
}

/// Time-unit codes shared by GRIB1 `fcst_units` and the low range of
/// GRIB2 Code Table 4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
}

impl TimeUnit {
    /// GRIB1 `fcst_units`: 0 -> minutes, 1 -> hours, 2 -> days.
    pub fn from_grib1_code(code: u8) -> Result<Self, GribError> {
        match code {
            0 => Ok(Self::Minute),
            1 => Ok(Self::Hour),
            2 => Ok(Self::Day),
            n => Err(GribError::InvariantViolation(format!(
                "unsupported GRIB1 forecast time unit: {n}"
            ))),
        }
    }

    /// GRIB2 Code Table 4.4 low codes: 0 -> minutes, 1 -> hours, 2 -> days.
    pub fn from_grib2_table_4_4(code: u8) -> Result<Self, GribError> {
        match code {
            0 => Ok(Self::Minute),
            1 => Ok(Self::Hour),
            2 => Ok(Self::Day),
            n => Err(GribError::InvariantViolation(format!(
                "unsupported GRIB2 time unit (table 4.4): {n}"
            ))),
        }
    }

    pub fn to_grib1_code(self) -> u8 {
        match self {
            Self::Minute => 0,
            Self::Hour => 1,
            Self::Day => 2,
        }
    }

    pub fn to_grib2_table_4_4(self) -> u8 {
        match self {
            Self::Minute => 0,
            Self::Hour => 1,
            Self::Day => 2,
        }
    }
}

/// Adds `amount` units of `unit` to `ref_time`, applying Gregorian
/// month-length and leap-year rollover (delegated to `chrono`, which
/// performs the field-by-field carry the spec describes).
pub fn add_duration(ref_time: UtcDateTime, amount: i64, unit: TimeUnit) -> Result<UtcDateTime, GribError> {
    let base = ref_time.to_chrono()?;
    let delta = match unit {
        TimeUnit::Minute => TimeDelta::minutes(amount),
        TimeUnit::Hour => TimeDelta::hours(amount),
        TimeUnit::Day => TimeDelta::days(amount),
    };
    let result = base
        .checked_add_signed(delta)
        .ok_or_else(|| GribError::InvariantViolation("date arithmetic overflow".to_owned()))?;
    Ok(UtcDateTime::from_chrono(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_add_duration {
        ($(($name:ident, $ref:expr, $amount:expr, $unit:expr, $expected:expr),)*) => ($(
            #[test]
            fn $name() {
                let actual = add_duration($ref, $amount, $unit).unwrap();
                assert_eq!(actual, $expected);
            }
        )*);
    }

    test_add_duration! {
        (
            month_end_rollover_scenario_3,
            UtcDateTime::new(2023, 1, 31, 18, 0, 0),
            6,
            TimeUnit::Hour,
            UtcDateTime::new(2023, 2, 1, 0, 0, 0)
        ),
        (
            leap_year_day_rollover,
            UtcDateTime::new(2024, 2, 28, 12, 0, 0),
            2,
            TimeUnit::Day,
            UtcDateTime::new(2024, 3, 1, 12, 0, 0)
        ),
        (
            year_rollover,
            UtcDateTime::new(2023, 12, 31, 23, 0, 0),
            90,
            TimeUnit::Minute,
            UtcDateTime::new(2024, 1, 1, 0, 30, 0)
        ),
    }

    #[test]
    fn time_unit_round_trips_grib1_codes() {
        for code in [0u8, 1, 2] {
            let unit = TimeUnit::from_grib1_code(code).unwrap();
            assert_eq!(unit.to_grib1_code(), code);
        }
    }
}
