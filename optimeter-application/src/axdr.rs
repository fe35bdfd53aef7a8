//! A-XDR decoding of the COSEM primitives meters return
//!
//! Only the tags an energy meter actually answers with are supported;
//! anything else surfaces as `UnsupportedDataType` so the session can
//! skip the object instead of misreading it.

use optimeter_core::datatypes::{CosemDateTime, DataValue, ScalerUnit, Unit};
use optimeter_core::{MeterError, MeterResult};

/// A-XDR tag values
pub const TAG_STRUCTURE: u8 = 0x02;
pub const TAG_DOUBLE_LONG_UNSIGNED: u8 = 0x06;
pub const TAG_OCTET_STRING: u8 = 0x09;
pub const TAG_VISIBLE_STRING: u8 = 0x0A;
pub const TAG_INTEGER8: u8 = 0x0F;
pub const TAG_LONG: u8 = 0x10;
pub const TAG_LONG_UNSIGNED: u8 = 0x12;
pub const TAG_ENUM: u8 = 0x16;
pub const TAG_DATE_TIME: u8 = 0x19;

/// Decode a single tagged COSEM value
///
/// Trailing bytes after the value are ignored; a GET-Response-Normal
/// carries exactly one value.
pub fn decode_data(bytes: &[u8]) -> MeterResult<DataValue> {
    let (&tag, rest) = bytes
        .split_first()
        .ok_or_else(|| MeterError::InvalidData("Empty data value".to_string()))?;

    match tag {
        TAG_DOUBLE_LONG_UNSIGNED => {
            let raw = take(rest, 4)?;
            Ok(DataValue::DoubleLongUnsigned(u32::from_be_bytes([
                raw[0], raw[1], raw[2], raw[3],
            ])))
        }
        TAG_LONG => {
            let raw = take(rest, 2)?;
            Ok(DataValue::Long(i16::from_be_bytes([raw[0], raw[1]])))
        }
        TAG_LONG_UNSIGNED => {
            let raw = take(rest, 2)?;
            Ok(DataValue::LongUnsigned(u16::from_be_bytes([raw[0], raw[1]])))
        }
        TAG_OCTET_STRING => {
            let content = take_counted(rest)?;
            Ok(DataValue::OctetString(content.to_vec()))
        }
        TAG_VISIBLE_STRING => {
            let content = take_counted(rest)?;
            Ok(DataValue::VisibleString(
                String::from_utf8_lossy(content).into_owned(),
            ))
        }
        TAG_STRUCTURE => decode_scaler_unit(rest),
        TAG_DATE_TIME => {
            let raw = take(rest, CosemDateTime::LENGTH)?;
            Ok(DataValue::DateTime(CosemDateTime::decode(raw)?))
        }
        other => Err(MeterError::UnsupportedDataType(other)),
    }
}

// The only structure this client reads is a Register's attribute 3:
// two elements, an integer8 scaler and an enum unit.
fn decode_scaler_unit(bytes: &[u8]) -> MeterResult<DataValue> {
    let (&count, rest) = bytes
        .split_first()
        .ok_or_else(|| MeterError::InvalidData("Truncated structure".to_string()))?;
    if count != 2 {
        return Err(MeterError::InvalidData(format!(
            "Expected scaler_unit structure of 2 elements, got {}",
            count
        )));
    }

    let raw = take(rest, 4)?;
    if raw[0] != TAG_INTEGER8 {
        return Err(MeterError::InvalidData(format!(
            "Expected integer8 scaler, got tag 0x{:02X}",
            raw[0]
        )));
    }
    // Any byte >= 0x80 is a negative scaler; plain sign extension.
    let scaler = raw[1] as i8;

    if raw[2] != TAG_ENUM {
        return Err(MeterError::InvalidData(format!(
            "Expected enum unit, got tag 0x{:02X}",
            raw[2]
        )));
    }
    let unit = Unit::from_code(raw[3]);

    Ok(DataValue::ScalerUnit(ScalerUnit::new(scaler, unit)))
}

fn take(bytes: &[u8], n: usize) -> MeterResult<&[u8]> {
    bytes.get(..n).ok_or_else(|| {
        MeterError::InvalidData(format!("Truncated value: need {} bytes, have {}", n, bytes.len()))
    })
}

fn take_counted(bytes: &[u8]) -> MeterResult<&[u8]> {
    let (&len, rest) = bytes
        .split_first()
        .ok_or_else(|| MeterError::InvalidData("Truncated string".to_string()))?;
    take(rest, len as usize)
}
