//! GET service APDUs
//!
//! A GET-Request-Normal travels client-to-server behind the LLC header
//! `E6 E6 00`; the GET-Response-Normal comes back behind `E6 E7 00`.
//! Both sides fit in one HDLC information frame on this link.

use crate::axdr;
use optimeter_core::datatypes::{CosemDateTime, DataValue};
use optimeter_core::{CosemClass, MeterError, MeterResult, ObisCode};

/// LLC header, client to server
pub const LLC_REQUEST: [u8; 3] = [0xE6, 0xE6, 0x00];
/// LLC header, server to client
pub const LLC_RESPONSE: [u8; 3] = [0xE6, 0xE7, 0x00];

const GET_REQUEST: u8 = 0xC0;
const GET_RESPONSE: u8 = 0xC4;
const NORMAL: u8 = 0x01;
const INVOKE_ID_AND_PRIORITY: u8 = 0xC1;

/// Encode a GET-Request-Normal, LLC header included
///
/// Produces the 16-byte information field: LLC, request tag, invoke-id,
/// class id (u16 BE), the 6 OBIS bytes, the attribute id, and an absent
/// access selector.
pub fn encode_get_request(class: CosemClass, obis: &ObisCode, attribute: u8) -> Vec<u8> {
    let mut apdu = Vec::with_capacity(16);
    apdu.extend_from_slice(&LLC_REQUEST);
    apdu.push(GET_REQUEST);
    apdu.push(NORMAL);
    apdu.push(INVOKE_ID_AND_PRIORITY);
    apdu.extend_from_slice(&class.class_id().to_be_bytes());
    apdu.extend_from_slice(obis.as_bytes());
    apdu.push(attribute);
    apdu.push(0x00); // access-selection absent
    apdu
}

/// Decode a GET-Response-Normal information field into its data value
pub fn decode_get_response(info: &[u8]) -> MeterResult<DataValue> {
    // An error response ends at the data-access-result byte.
    if info.len() < 7 {
        return Err(MeterError::UnexpectedResponse(format!(
            "GET response too short: {} bytes",
            info.len()
        )));
    }
    if info[..3] != LLC_RESPONSE {
        return Err(MeterError::UnexpectedResponse(format!(
            "Bad LLC header: {:02X} {:02X} {:02X}",
            info[0], info[1], info[2]
        )));
    }
    if info[3] != GET_RESPONSE || info[4] != NORMAL || info[5] != INVOKE_ID_AND_PRIORITY {
        return Err(MeterError::UnexpectedResponse(format!(
            "Not a GET-Response-Normal: {:02X} {:02X} {:02X}",
            info[3], info[4], info[5]
        )));
    }

    let result = info[6];
    if result != 0x00 {
        return Err(MeterError::ReadFailed(format!(
            "Data access result {} ({})",
            result,
            data_access_result_name(result)
        )));
    }

    axdr::decode_data(&info[7..])
}

/// Interpret a value as a capture time
///
/// Meters return attribute 5 either as a tagged date-time or as a
/// 12-byte octet-string.
pub fn value_as_date_time(value: &DataValue) -> MeterResult<CosemDateTime> {
    match value {
        DataValue::DateTime(dt) => Ok(*dt),
        DataValue::OctetString(bytes) if bytes.len() == CosemDateTime::LENGTH => {
            CosemDateTime::decode(bytes)
        }
        other => Err(MeterError::InvalidData(format!(
            "Value is not a date-time: {:?}",
            other
        ))),
    }
}

/// Name for a data-access-result code, for log context
pub fn data_access_result_name(code: u8) -> &'static str {
    match code {
        0 => "success",
        1 => "hardware-fault",
        2 => "temporary-failure",
        3 => "read-write-denied",
        4 => "object-undefined",
        9 => "object-unavailable",
        11 => "object-class-inconsistent",
        12 => "type-unmatched",
        13 => "scope-of-access-violated",
        14 => "data-block-unavailable",
        _ => "other-reason",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optimeter_core::registry;

    #[test]
    fn test_encode_get_request() {
        let apdu = encode_get_request(CosemClass::Register, &registry::KWH_IMPORT.code, 0x02);
        assert_eq!(
            apdu,
            vec![
                0xE6, 0xE6, 0x00, // LLC
                0xC0, 0x01, 0xC1, // GET-Request-Normal, invoke-id
                0x00, 0x03, // class 3
                0x01, 0x00, 0x01, 0x08, 0x00, 0xFF, // 1-0:1.8.0*255
                0x02, // attribute 2
                0x00, // no access selection
            ]
        );
    }

    #[test]
    fn test_encode_uses_class_id() {
        let apdu = encode_get_request(CosemClass::ExtendedRegister, &registry::MD_KW_IMPORT.code, 0x05);
        assert_eq!(&apdu[6..8], &[0x00, 0x04]);
        assert_eq!(apdu[14], 0x05);
    }

    #[test]
    fn test_decode_value_response() {
        let info = [
            0xE6, 0xE7, 0x00, 0xC4, 0x01, 0xC1, 0x00, 0x06, 0x00, 0x00, 0x27, 0x10,
        ];
        let value = decode_get_response(&info).unwrap();
        assert_eq!(value.as_f64(), Some(10_000.0));
    }

    #[test]
    fn test_decode_access_error() {
        let info = [0xE6, 0xE7, 0x00, 0xC4, 0x01, 0xC1, 0x04];
        let err = decode_get_response(&info).unwrap_err();
        let MeterError::ReadFailed(msg) = err else {
            panic!("expected ReadFailed");
        };
        assert!(msg.contains("object-undefined"));
    }

    #[test]
    fn test_decode_rejects_wrong_llc() {
        let info = [0xE6, 0xE6, 0x00, 0xC4, 0x01, 0xC1, 0x00, 0x06, 0, 0, 0, 1];
        assert!(matches!(
            decode_get_response(&info),
            Err(MeterError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_decode_rejects_wrong_service() {
        let info = [0xE6, 0xE7, 0x00, 0xC5, 0x01, 0xC1, 0x00, 0x00];
        assert!(matches!(
            decode_get_response(&info),
            Err(MeterError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_capture_time_from_octet_string() {
        let value = DataValue::OctetString(vec![
            0x07, 0xE9, 0x0A, 0x02, 0xFF, 0x0C, 0x00, 0x00, 0xFF, 0x00, 0x00, 0x00,
        ]);
        let dt = value_as_date_time(&value).unwrap();
        assert_eq!(dt.to_string(), "2025-10-02 12:00:00");

        let not_dt = DataValue::LongUnsigned(5);
        assert!(value_as_date_time(&not_dt).is_err());
    }
}
