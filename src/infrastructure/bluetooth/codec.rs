//! Binary record codec for the NB2 status registers.
//!
//! All multi-byte fields are little-endian; signed fields are 16-bit two's
//! complement.

use crate::domain::models::{BatteryRecord, DateRecord};
use crate::infrastructure::bluetooth::error::CodecError;

/// Size of the battery properties register
pub const BATTERY_RECORD_LEN: usize = 10;

/// Size of the date register
pub const DATE_RECORD_LEN: usize = 4;

fn exact<const N: usize>(bytes: &[u8]) -> Result<&[u8; N], CodecError> {
    bytes.try_into().map_err(|_| CodecError::LengthMismatch {
        expected: N,
        actual: bytes.len(),
    })
}

/// Decode the 10-byte battery properties register
pub fn decode_battery_record(bytes: &[u8]) -> Result<BatteryRecord, CodecError> {
    let b = exact::<BATTERY_RECORD_LEN>(bytes)?;

    Ok(BatteryRecord {
        capacity_mah: u16::from_le_bytes([b[0], b[1]]),
        level_per_mille: u16::from_le_bytes([b[2], b[3]]),
        voltage_mv: u16::from_le_bytes([b[4], b[5]]),
        current_ma: i16::from_le_bytes([b[6], b[7]]),
        temperature_decicelsius: i16::from_le_bytes([b[8], b[9]]),
    })
}

/// Decode the 4-byte date register
///
/// ```text
/// [0-1] : Year (u16 little-endian)
/// [2]   : Month
/// [3]   : Day
/// ```
pub fn decode_date_record(bytes: &[u8]) -> Result<DateRecord, CodecError> {
    let b = exact::<DATE_RECORD_LEN>(bytes)?;

    Ok(DateRecord {
        year: u16::from_le_bytes([b[0], b[1]]),
        month: b[2],
        day: b[3],
    })
}

/// Decode the date register the way older tooling did, overlaying the
/// battery register: only the year's high byte comes from the date buffer.
pub fn decode_date_record_legacy(date: &[u8], battery: &[u8]) -> Result<DateRecord, CodecError> {
    let d = exact::<DATE_RECORD_LEN>(date)?;
    let b = exact::<BATTERY_RECORD_LEN>(battery)?;

    Ok(DateRecord {
        year: u16::from_le_bytes([b[0], d[1]]),
        month: b[2],
        day: b[3],
    })
}

/// Decode a fixed-width text field.
///
/// Takes the first `len` bytes, drops NUL padding and decodes the rest as
/// UTF-8, replacing invalid sequences.
pub fn decode_text_field(bytes: &[u8], len: usize) -> Result<String, CodecError> {
    if bytes.len() < len {
        return Err(CodecError::TooShort {
            needed: len,
            actual: bytes.len(),
        });
    }

    let field = &bytes[..len];
    let end = field.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    Ok(String::from_utf8_lossy(&field[..end]).into_owned())
}
