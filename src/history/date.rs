//! Packed date codec for history records.
//!
//! History records carry their timestamp in one of two bit-packed forms:
//!
//! 1. **Full** (5 bytes) - seconds, minutes, hours, day and year in the low bits
//!    of each byte, with the month split across the top two bits of bytes 0 and 1.
//! 2. **Midnight** (daily totals) - day, month and year only; time of day is zero.
//!
//! ## Bit layout (full)
//!
//! ```text
//! byte0  MMss ssss   seconds = b0 & 0x3F, month high = (b0 & 0xC0) >> 4
//! byte1  mmmm mmmm   minutes = b1 & 0x3F, month low  = (b1 & 0xC0) >> 6
//! byte2  ...h hhhh   hours   = b2 & 0x1F
//! byte3  .... dddd   day     = b3 & 0x0F
//! byte4  .... yyyy   year    = (b4 & 0x0F) + 2000
//! ```
//!
//! Extraction is total over the fixed width. Calendar construction is strict and
//! fails with [`NotADate`] instead of clamping.
//!
//! The 4-bit day mask is known to decode some captured pages to the wrong day
//! while the time of day stays correct. Output must stay bit-compatible with
//! existing history exports, so the arithmetic is kept as is.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::NotADate;

/// Width of a full packed date.
pub const FULL_DATE_LEN: usize = 5;

/// Bytes read by the midnight decoder.
pub const MIDNIGHT_DATE_LEN: usize = 2;

const TIME_MASK: u8 = 0x3F;
const MONTH_BITS: u8 = 0xC0;
const HOUR_MASK: u8 = 0x1F;
const NIBBLE: u8 = 0x0F;

/// Raw `(year, month, day, hour, minute, second)` values from a packed date.
///
/// Values are whatever the bits say; nothing guarantees they form a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateTuple {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTuple {
    pub fn as_tuple(&self) -> (u16, u8, u8, u8, u8, u8) {
        (self.year, self.month, self.day, self.hour, self.minute, self.second)
    }

    /// Strict calendar construction.
    pub fn to_datetime(self) -> Result<NaiveDateTime, NotADate> {
        NaiveDate::from_ymd_opt(self.year.into(), self.month.into(), self.day.into())
            .and_then(|date| {
                date.and_hms_opt(self.hour.into(), self.minute.into(), self.second.into())
            })
            .ok_or(NotADate { tuple: self })
    }
}

impl fmt::Display for DateTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {}, {})",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// How a record's date segment is packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateEncoding {
    /// The record has no date segment.
    None,
    /// Five byte timestamp.
    Full,
    /// Day-resolution date used by daily totals.
    Midnight,
}

/// Outcome of decoding a record's date segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodedDate {
    Valid(NaiveDateTime),
    /// Bits were extracted but do not form a calendar date.
    NotADate(DateTuple),
    /// No date segment, or too few bytes to extract one.
    Absent,
}

impl DecodedDate {
    pub fn datetime(&self) -> Option<NaiveDateTime> {
        match self {
            DecodedDate::Valid(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, DecodedDate::Valid(_))
    }
}

impl fmt::Display for DecodedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedDate::Valid(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            DecodedDate::NotADate(tuple) => write!(f, "NotADate{}", tuple),
            DecodedDate::Absent => f.write_str("unknown"),
        }
    }
}

pub fn parse_seconds(byte: u8) -> u8 {
    byte & TIME_MASK
}

pub fn parse_minutes(byte: u8) -> u8 {
    byte & TIME_MASK
}

pub fn parse_hours(byte: u8) -> u8 {
    byte & HOUR_MASK
}

pub fn parse_day(byte: u8) -> u8 {
    byte & NIBBLE
}

pub fn parse_years(byte: u8) -> u16 {
    u16::from(byte & NIBBLE) + 2000
}

/// Month from the top bits of the seconds and minutes bytes.
pub fn parse_months(seconds: u8, minutes: u8) -> u8 {
    let high = (seconds & MONTH_BITS) >> 4;
    let low = (minutes & MONTH_BITS) >> 6;
    high | low
}

/// Extract the six date fields from a full packed date. Never fails.
pub fn unmask_date(data: &[u8; FULL_DATE_LEN]) -> DateTuple {
    DateTuple {
        year: parse_years(data[4]),
        month: parse_months(data[0], data[1]),
        day: parse_day(data[3]),
        hour: parse_hours(data[2]),
        minute: parse_minutes(data[1]),
        second: parse_seconds(data[0]),
    }
}

/// Extract a midnight-only date. Returns `None` with fewer than two bytes.
pub fn unmask_midnight(data: &[u8]) -> Option<DateTuple> {
    let &[b0, b1, ..] = data else {
        return None;
    };
    let month_high = (b0 & 0xE0) >> 4;
    let month_low = (b1 & 0x80) >> 7;
    Some(DateTuple {
        year: parse_years(b1),
        month: month_high | month_low,
        day: (b0 & 0x1F) + 1,
        hour: 0,
        minute: 0,
        second: 0,
    })
}

/// Unmask a full date and build a calendar timestamp from it.
///
/// ```rust
/// use pumplink::history::date::parse_date;
///
/// let dt = parse_date(&[0x6f, 0xd7, 0x08, 0x01, 0x06]).unwrap();
/// assert_eq!(dt.to_string(), "2006-07-01 08:23:47");
/// ```
pub fn parse_date(data: &[u8; FULL_DATE_LEN]) -> Result<NaiveDateTime, NotADate> {
    unmask_date(data).to_datetime()
}

/// Midnight variant of [`parse_date`]. `Ok(None)` means too few bytes.
pub fn parse_midnight(data: &[u8]) -> Result<Option<NaiveDateTime>, NotADate> {
    unmask_midnight(data).map(DateTuple::to_datetime).transpose()
}

/// Unmask `data` in the given mode and build a calendar timestamp.
///
/// `Ok(None)` means the encoding carries no date or `data` is too short.
pub fn parse_strict(encoding: DateEncoding, data: &[u8]) -> Result<Option<NaiveDateTime>, NotADate> {
    match decode_date(encoding, data) {
        DecodedDate::Valid(dt) => Ok(Some(dt)),
        DecodedDate::NotADate(tuple) => Err(NotADate { tuple }),
        DecodedDate::Absent => Ok(None),
    }
}

/// Decode a record's date segment according to its encoding.
pub fn decode_date(encoding: DateEncoding, data: &[u8]) -> DecodedDate {
    let tuple = match encoding {
        DateEncoding::None => None,
        DateEncoding::Full => data
            .get(..FULL_DATE_LEN)
            .and_then(|bytes| <&[u8; FULL_DATE_LEN]>::try_from(bytes).ok())
            .map(unmask_date),
        DateEncoding::Midnight => unmask_midnight(data),
    };

    match tuple {
        None => DecodedDate::Absent,
        Some(tuple) => match tuple.to_datetime() {
            Ok(dt) => DecodedDate::Valid(dt),
            Err(NotADate { tuple }) => DecodedDate::NotADate(tuple),
        },
    }
}

/// Pack seconds, minutes and month into the first two bytes of a full date.
pub fn encode_month_bytes(second: u8, minute: u8, month: u8) -> [u8; 2] {
    [encode_second(second, month), encode_minute(minute, month)]
}

/// Seconds byte carrying the high two month bits.
pub fn encode_second(second: u8, month: u8) -> u8 {
    let high = (month & 0x0C) >> 2;
    second | (high << 6)
}

/// Minutes byte carrying the low two month bits.
pub fn encode_minute(minute: u8, month: u8) -> u8 {
    let low = month & 0x03;
    minute | (low << 6)
}

/// The four high bits of a year byte, most significant first.
pub fn extra_year_bits(byte: u8) -> [u8; 4] {
    [(byte & 0x80) >> 7, (byte & 0x40) >> 6, (byte & 0x20) >> 5, (byte & 0x10) >> 4]
}

/// The three high bits of an hour byte, most significant first.
pub fn extra_hour_bits(byte: u8) -> [u8; 3] {
    [(byte & 0x80) >> 7, (byte & 0x40) >> 6, (byte & 0x20) >> 5]
}
