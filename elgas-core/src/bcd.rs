//! Binary-coded-decimal timestamps
//!
//! Archive records and by-time requests carry timestamps as six BCD bytes,
//! least significant field first:
//!
//! | byte | field  |
//! |------|--------|
//! | 0    | second |
//! | 1    | minute |
//! | 2    | hour   |
//! | 3    | day    |
//! | 4    | month  |
//! | 5    | year - 2000 |
//!
//! The timestamps carry no zone information; the device reports them in its
//! standard (non daylight-saving) local time.

use crate::error::{ElgasError, ElgasResult};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// Length of an encoded BCD timestamp
pub const BCD_TIMESTAMP_LENGTH: usize = 6;

const BASE_YEAR: i32 = 2000;

fn bcd_to_u8(byte: u8) -> ElgasResult<u8> {
    let high = byte >> 4;
    let low = byte & 0x0F;
    if high > 9 || low > 9 {
        return Err(ElgasError::InvalidData(format!(
            "Invalid BCD digit in byte 0x{:02X}",
            byte
        )));
    }
    Ok(high * 10 + low)
}

fn u8_to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Decode a BCD timestamp
///
/// Only the first [`BCD_TIMESTAMP_LENGTH`] bytes of `data` are used.
///
/// # Errors
/// Returns `InvalidData` if the slice is too short, a nibble is not a decimal
/// digit, or the fields do not form a valid calendar date and time.
pub fn decode_timestamp(data: &[u8]) -> ElgasResult<NaiveDateTime> {
    if data.len() < BCD_TIMESTAMP_LENGTH {
        return Err(ElgasError::InvalidData(format!(
            "BCD timestamp too short: expected {}, got {}",
            BCD_TIMESTAMP_LENGTH,
            data.len()
        )));
    }

    let second = bcd_to_u8(data[0])?;
    let minute = bcd_to_u8(data[1])?;
    let hour = bcd_to_u8(data[2])?;
    let day = bcd_to_u8(data[3])?;
    let month = bcd_to_u8(data[4])?;
    let year = BASE_YEAR + bcd_to_u8(data[5])? as i32;

    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .ok_or_else(|| {
            ElgasError::InvalidData(format!(
                "Invalid BCD timestamp: {:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            ))
        })
}

/// Encode a timestamp as six BCD bytes
///
/// # Errors
/// Returns `InvalidData` for years outside 2000..=2099, which cannot be
/// represented.
pub fn encode_timestamp(timestamp: &NaiveDateTime) -> ElgasResult<[u8; BCD_TIMESTAMP_LENGTH]> {
    let year = timestamp.year() - BASE_YEAR;
    if !(0..100).contains(&year) {
        return Err(ElgasError::InvalidData(format!(
            "Year {} cannot be encoded as BCD timestamp",
            timestamp.year()
        )));
    }

    Ok([
        u8_to_bcd(timestamp.second() as u8),
        u8_to_bcd(timestamp.minute() as u8),
        u8_to_bcd(timestamp.hour() as u8),
        u8_to_bcd(timestamp.day() as u8),
        u8_to_bcd(timestamp.month() as u8),
        u8_to_bcd(year as u8),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_timestamp() {
        // 2024-03-15 14:30:45
        let bytes = [0x45, 0x30, 0x14, 0x15, 0x03, 0x24];
        let ts = decode_timestamp(&bytes).unwrap();
        assert_eq!(
            ts,
            NaiveDate::from_ymd_opt(2024, 3, 15)
                .unwrap()
                .and_hms_opt(14, 30, 45)
                .unwrap()
        );
    }

    #[test]
    fn test_encode_timestamp() {
        let ts = NaiveDate::from_ymd_opt(2023, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 0)
            .unwrap();
        assert_eq!(encode_timestamp(&ts).unwrap(), [0x00, 0x59, 0x23, 0x31, 0x12, 0x23]);
    }

    #[test]
    fn test_decode_rejects_bad_nibble() {
        let bytes = [0x4A, 0x30, 0x14, 0x15, 0x03, 0x24];
        assert!(matches!(decode_timestamp(&bytes), Err(ElgasError::InvalidData(_))));
    }

    #[test]
    fn test_decode_rejects_impossible_date() {
        // February 30th
        let bytes = [0x00, 0x00, 0x00, 0x30, 0x02, 0x24];
        assert!(decode_timestamp(&bytes).is_err());
    }

    #[test]
    fn test_decode_short_slice() {
        assert!(decode_timestamp(&[0x00, 0x00, 0x00]).is_err());
    }

    #[test]
    fn test_encode_out_of_range_year() {
        let ts = NaiveDate::from_ymd_opt(1999, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(encode_timestamp(&ts).is_err());
    }
}
