//! Readout window in device standard time
//!
//! Meters keep their clock in local standard time all year round and never
//! switch to daylight saving time. A point in time is therefore converted to
//! the meter's zone and the daylight saving part of the offset is taken off
//! again.

use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::{OffsetComponents, Tz};
use std::fmt;

/// Convert an instant to the wall clock of a meter in `meter_timezone`
pub fn to_standard_time<Z: TimeZone>(instant: &DateTime<Z>, meter_timezone: &Tz) -> NaiveDateTime {
    let local = instant.with_timezone(meter_timezone);
    let dst = local.offset().dst_offset();
    local.naive_local() - dst
}

/// Bounds of one readout, both in device standard time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadoutWindow {
    pub oldest: NaiveDateTime,
    pub newest: NaiveDateTime,
}

impl ReadoutWindow {
    pub fn new<A: TimeZone, B: TimeZone>(
        oldest: &DateTime<A>,
        newest: &DateTime<B>,
        meter_timezone: &Tz,
    ) -> Self {
        Self {
            oldest: to_standard_time(oldest, meter_timezone),
            newest: to_standard_time(newest, meter_timezone),
        }
    }
}

impl fmt::Display for ReadoutWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.oldest, self.newest)
    }
}
