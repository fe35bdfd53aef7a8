//! HDLC type 3 frame construction and parsing
//!
//! Frame layout between the 0x7E flags:
//!
//! ```text
//! ADDR_FMT | LEN_LO | DST | SRC | CONTROL | HCS_LO HCS_HI | INFO... | FCS_LO FCS_HI
//! ```
//!
//! The format byte carries 0xA0 plus the top three bits of the 11-bit
//! frame length. HCS covers the five header bytes; FCS covers everything
//! between the flags except itself. Frames without an information field
//! (DISC and short UA) carry a single trailing FCS over the header.

use crate::hdlc::fcs;
use optimeter_core::{MeterError, MeterResult};

/// HDLC frame delimiter
pub const FLAG: u8 = 0x7E;

/// Largest inbound frame the client accepts, flags included
pub const MAX_FRAME_SIZE: usize = 256;

/// Frame format byte for type 3 framing
const FORMAT_TYPE3: u8 = 0xA0;

/// Control byte values used on this link
pub const CTL_SNRM: u8 = 0x93;
pub const CTL_UA: u8 = 0x73;
pub const CTL_DISC: u8 = 0x53;

// Offsets shared by every frame this client builds.
const DST_OFFSET: usize = 3;
const SRC_OFFSET: usize = 4;
const HCS_OFFSET: usize = 6;

// The 16-octet LLS password inside the AARQ template.
const AARQ_PASSWORD_OFFSET: usize = 41;
const AARQ_PASSWORD_LEN: usize = 16;

/// Canned SNRM request: HDLC parameter negotiation with max info field
/// 0x0501 tx/rx and window size 1 in both directions.
pub const SNRM_FRAME: [u8; 34] = [
    0x7E, 0xA0, 0x20, 0x03, 0x41, 0x93, 0x28, 0xBC, 0x81, 0x80, 0x14, 0x05, 0x02, 0x05, 0x01,
    0x06, 0x02, 0x05, 0x01, 0x07, 0x04, 0x00, 0x00, 0x00, 0x01, 0x08, 0x04, 0x00, 0x00, 0x00,
    0x01, 0xDD, 0x70, 0x7E,
];

/// Canned AARQ request: application context `2.16.756.5.8.1.1` (logical
/// names, no ciphering), LLS mechanism, all-'1' default password, and the
/// initiate-request conformance block.
pub const AARQ_FRAME: [u8; 78] = [
    0x7E, 0xA0, 0x4C, 0x03, 0x41, 0x10, 0x6B, 0x04, 0xE6, 0xE6, 0x00, 0x60, 0x3E, 0xA1, 0x09,
    0x06, 0x07, 0x60, 0x85, 0x74, 0x05, 0x08, 0x01, 0x01, 0x8A, 0x02, 0x07, 0x80, 0x8B, 0x07,
    0x60, 0x85, 0x74, 0x05, 0x08, 0x02, 0x01, 0xAC, 0x12, 0x80, 0x10, 0x31, 0x31, 0x31, 0x31,
    0x31, 0x31, 0x31, 0x31, 0x31, 0x31, 0x31, 0x31, 0x31, 0x31, 0x31, 0x31, 0xBE, 0x10, 0x04,
    0x0E, 0x01, 0x00, 0x00, 0x00, 0x06, 0x5F, 0x1F, 0x04, 0x00, 0x00, 0x18, 0x1D, 0xFF, 0xFF,
    0xB3, 0x3D, 0x7E,
];

/// Canned DISC request
pub const DISC_FRAME: [u8; 9] = [0x7E, 0xA0, 0x07, 0x03, 0x41, 0x53, 0x56, 0xA2, 0x7E];

/// Frame kind derived from the control byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Numbered information frame (LSB clear)
    Information,
    SetNormalResponseMode,
    UnnumberedAcknowledge,
    Disconnect,
    Other,
}

impl FrameKind {
    pub fn from_control(control: u8) -> Self {
        match control {
            CTL_SNRM => FrameKind::SetNormalResponseMode,
            CTL_UA => FrameKind::UnnumberedAcknowledge,
            CTL_DISC => FrameKind::Disconnect,
            c if c & 0x01 == 0 => FrameKind::Information,
            _ => FrameKind::Other,
        }
    }
}

/// A parsed inbound frame with verified checksums
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFrame {
    pub destination: u8,
    pub source: u8,
    pub control: u8,
    pub information: Vec<u8>,
}

impl ParsedFrame {
    pub fn kind(&self) -> FrameKind {
        FrameKind::from_control(self.control)
    }
}

/// Encode an information frame carrying `info`, or a bare control frame
/// when `info` is empty
pub fn encode_information(
    control: u8,
    destination: u8,
    source: u8,
    info: &[u8],
) -> MeterResult<Vec<u8>> {
    let body_len = if info.is_empty() { 7 } else { 9 + info.len() };
    if body_len > 0x07FF {
        return Err(MeterError::FrameFormat(format!(
            "Information field too long: {} bytes",
            info.len()
        )));
    }

    let mut frame = Vec::with_capacity(body_len + 2);
    frame.push(FLAG);
    frame.push(FORMAT_TYPE3 | ((body_len >> 8) & 0x07) as u8);
    frame.push((body_len & 0xFF) as u8);
    frame.push(destination);
    frame.push(source);
    frame.push(control);

    if !info.is_empty() {
        let hcs = fcs::compute(&frame[1..6]);
        frame.extend_from_slice(&fcs::wire_bytes(hcs));
        frame.extend_from_slice(info);
    }

    let crc = fcs::compute(&frame[1..]);
    frame.extend_from_slice(&fcs::wire_bytes(crc));
    frame.push(FLAG);
    Ok(frame)
}

/// Parse and checksum-verify a complete flag-delimited frame
pub fn parse_frame(frame: &[u8]) -> MeterResult<ParsedFrame> {
    if frame.len() < 9 {
        return Err(MeterError::FrameFormat(format!(
            "Frame too short: {} bytes",
            frame.len()
        )));
    }
    if frame[0] != FLAG || frame[frame.len() - 1] != FLAG {
        return Err(MeterError::FrameFormat("Missing frame delimiter".to_string()));
    }

    let body = &frame[1..frame.len() - 1];
    if body[0] & 0xF0 != FORMAT_TYPE3 {
        return Err(MeterError::FrameFormat(format!(
            "Illegal frame format byte: 0x{:02X}",
            body[0]
        )));
    }

    let declared = (((body[0] & 0x07) as usize) << 8) | body[1] as usize;
    if declared != body.len() {
        return Err(MeterError::FrameFormat(format!(
            "Frame length mismatch: header says {}, got {}",
            declared,
            body.len()
        )));
    }

    let fcs_received = u16::from_le_bytes([body[body.len() - 2], body[body.len() - 1]]);
    let fcs_computed = fcs::compute(&body[..body.len() - 2]);
    if fcs_computed != fcs_received {
        return Err(MeterError::CrcMismatch {
            computed: fcs_computed,
            received: fcs_received,
        });
    }

    let information = if body.len() > 7 {
        let hcs_received = u16::from_le_bytes([body[5], body[6]]);
        let hcs_computed = fcs::compute(&body[..5]);
        if hcs_computed != hcs_received {
            return Err(MeterError::CrcMismatch {
                computed: hcs_computed,
                received: hcs_received,
            });
        }
        body[7..body.len() - 2].to_vec()
    } else {
        Vec::new()
    };

    Ok(ParsedFrame {
        destination: body[2],
        source: body[3],
        control: body[4],
        information,
    })
}

/// Recompute and patch HCS/FCS after a template has been edited in place
fn refresh_checksums(frame: &mut [u8]) {
    let len = frame.len();
    if len > 11 {
        let hcs = fcs::wire_bytes(fcs::compute(&frame[1..HCS_OFFSET]));
        frame[HCS_OFFSET] = hcs[0];
        frame[HCS_OFFSET + 1] = hcs[1];
    }
    let crc = fcs::wire_bytes(fcs::compute(&frame[1..len - 3]));
    frame[len - 3] = crc[0];
    frame[len - 2] = crc[1];
}

/// SNRM request for the given addresses
pub fn snrm_frame(server_sap: u8, client_sap: u8) -> Vec<u8> {
    let mut frame = SNRM_FRAME.to_vec();
    frame[DST_OFFSET] = server_sap;
    frame[SRC_OFFSET] = client_sap;
    refresh_checksums(&mut frame);
    frame
}

/// DISC request for the given addresses
pub fn disc_frame(server_sap: u8, client_sap: u8) -> Vec<u8> {
    let mut frame = DISC_FRAME.to_vec();
    frame[DST_OFFSET] = server_sap;
    frame[SRC_OFFSET] = client_sap;
    refresh_checksums(&mut frame);
    frame
}

/// AARQ request with the given addresses and LLS password
pub fn aarq_frame(server_sap: u8, client_sap: u8, password: &[u8]) -> MeterResult<Vec<u8>> {
    if password.len() != AARQ_PASSWORD_LEN {
        return Err(MeterError::InvalidData(format!(
            "LLS password must be {} octets, got {}",
            AARQ_PASSWORD_LEN,
            password.len()
        )));
    }

    let mut frame = AARQ_FRAME.to_vec();
    frame[DST_OFFSET] = server_sap;
    frame[SRC_OFFSET] = client_sap;
    frame[AARQ_PASSWORD_OFFSET..AARQ_PASSWORD_OFFSET + AARQ_PASSWORD_LEN]
        .copy_from_slice(password);
    refresh_checksums(&mut frame);
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_PASSWORD: &[u8] = b"1111111111111111";

    #[test]
    fn test_builders_reproduce_canned_frames() {
        assert_eq!(snrm_frame(0x03, 0x41), SNRM_FRAME.to_vec());
        assert_eq!(disc_frame(0x03, 0x41), DISC_FRAME.to_vec());
        assert_eq!(
            aarq_frame(0x03, 0x41, DEFAULT_PASSWORD).unwrap(),
            AARQ_FRAME.to_vec()
        );
    }

    #[test]
    fn test_canned_frames_verify() {
        for frame in [&SNRM_FRAME[..], &AARQ_FRAME[..], &DISC_FRAME[..]] {
            let body = &frame[1..frame.len() - 1];
            assert!(fcs::verify(body));
        }
    }

    #[test]
    fn test_custom_password_still_parses() {
        let frame = aarq_frame(0x03, 0x41, b"ABCDEFGHIJKLMNOP").unwrap();
        assert_ne!(frame, AARQ_FRAME.to_vec());
        let parsed = parse_frame(&frame).unwrap();
        assert_eq!(parsed.control, 0x10);
        assert_eq!(&parsed.information[..3], &[0xE6, 0xE6, 0x00]);
    }

    #[test]
    fn test_password_length_checked() {
        assert!(matches!(
            aarq_frame(0x03, 0x41, b"short"),
            Err(MeterError::InvalidData(_))
        ));
    }

    #[test]
    fn test_information_round_trip() {
        let apdus: [&[u8]; 4] = [
            &[0x01],
            &[0xE6, 0xE6, 0x00, 0xC0, 0x01, 0xC1, 0x00, 0x03, 0x01, 0x00, 0x01, 0x08, 0x00,
                0xFF, 0x02, 0x00],
            &[0xAB; 100],
            &[0x55; 247],
        ];
        for (i, apdu) in apdus.iter().enumerate() {
            let control = 0x10 + 0x22 * (i as u8 % 4);
            let frame = encode_information(control, 0x03, 0x41, apdu).unwrap();
            let parsed = parse_frame(&frame).unwrap();
            assert_eq!(parsed.control, control);
            assert_eq!(parsed.destination, 0x03);
            assert_eq!(parsed.source, 0x41);
            assert_eq!(parsed.information, apdu.to_vec());
        }
    }

    #[test]
    fn test_get_request_frame_shape() {
        // A GET request wraps a 16-byte APDU into a 27-byte frame.
        let apdu = [
            0xE6, 0xE6, 0x00, 0xC0, 0x01, 0xC1, 0x00, 0x03, 0x01, 0x00, 0x01, 0x08, 0x00, 0xFF,
            0x02, 0x00,
        ];
        let frame = encode_information(0x10, 0x03, 0x41, &apdu).unwrap();
        assert_eq!(frame.len(), 27);
        assert_eq!(&frame[..6], &[0x7E, 0xA0, 0x19, 0x03, 0x41, 0x10]);
        assert_eq!(frame[26], FLAG);
    }

    #[test]
    fn test_empty_info_omits_hcs() {
        let frame = encode_information(CTL_DISC, 0x03, 0x41, &[]).unwrap();
        assert_eq!(frame, DISC_FRAME.to_vec());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            parse_frame(&[0x7E, 0xA0, 0x7E]),
            Err(MeterError::FrameFormat(_))
        ));

        let mut frame = encode_information(0x10, 0x03, 0x41, &[0x01, 0x02]).unwrap();
        frame[0] = 0x00;
        assert!(matches!(parse_frame(&frame), Err(MeterError::FrameFormat(_))));

        // Declared length not matching the byte count
        let mut frame = encode_information(0x10, 0x03, 0x41, &[0x01, 0x02]).unwrap();
        frame[2] ^= 0x01;
        assert!(matches!(parse_frame(&frame), Err(MeterError::FrameFormat(_))));
    }

    #[test]
    fn test_parse_detects_corruption() {
        let mut frame = encode_information(0x10, 0x03, 0x41, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        let payload_at = 8;
        frame[payload_at] ^= 0xFF;
        assert!(matches!(
            parse_frame(&frame),
            Err(MeterError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn test_frame_kind() {
        assert_eq!(FrameKind::from_control(CTL_SNRM), FrameKind::SetNormalResponseMode);
        assert_eq!(FrameKind::from_control(CTL_UA), FrameKind::UnnumberedAcknowledge);
        assert_eq!(FrameKind::from_control(CTL_DISC), FrameKind::Disconnect);
        assert_eq!(FrameKind::from_control(0x10), FrameKind::Information);
        assert_eq!(FrameKind::from_control(0x32), FrameKind::Information);
        assert_eq!(FrameKind::from_control(0x05), FrameKind::Other);
    }
}
