use crate::error::{MeterError, MeterResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OBIS (Object Identification System) code for identifying COSEM objects
///
/// OBIS codes are 6-byte identifiers of the form `A-B:C.D.E*F` used in
/// DLMS/COSEM to uniquely identify objects in a logical device. Byte F is
/// typically 0xFF, selecting the current billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObisCode {
    bytes: [u8; 6],
}

impl ObisCode {
    /// Create a new OBIS code from individual group values
    pub const fn new(a: u8, b: u8, c: u8, d: u8, e: u8, f: u8) -> Self {
        Self {
            bytes: [a, b, c, d, e, f],
        }
    }

    /// Create an OBIS code from a 6-byte array
    pub const fn from_bytes(bytes: [u8; 6]) -> Self {
        Self { bytes }
    }

    /// Parse an OBIS code from string format
    ///
    /// Supports both the dotted form `"1.0.1.8.0.255"` and the display
    /// form `"1-0:1.8.0*255"` (the `*F` part may be omitted, defaulting
    /// to 255).
    pub fn from_string(s: &str) -> MeterResult<Self> {
        if let Ok(code) = Self::parse_dot_format(s) {
            return Ok(code);
        }
        if let Ok(code) = Self::parse_display_format(s) {
            return Ok(code);
        }
        Err(MeterError::InvalidData(format!(
            "Invalid OBIS code format: {}",
            s
        )))
    }

    fn parse_dot_format(s: &str) -> MeterResult<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 6 {
            return Err(MeterError::InvalidData(
                "Expected 6 dot-separated values".to_string(),
            ));
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            bytes[i] = Self::parse_group(part)?;
        }
        Ok(Self { bytes })
    }

    // "A-B:C.D.E*F" or "A-B:C.D.E"
    fn parse_display_format(s: &str) -> MeterResult<Self> {
        let (ab, rest) = s
            .split_once(':')
            .ok_or_else(|| MeterError::InvalidData("Missing ':' separator".to_string()))?;
        let (a, b) = ab
            .split_once('-')
            .ok_or_else(|| MeterError::InvalidData("Missing '-' separator".to_string()))?;

        let (cde, f) = match rest.split_once('*') {
            Some((cde, f)) => (cde, Some(f)),
            None => (rest, None),
        };
        let parts: Vec<&str> = cde.split('.').collect();
        if parts.len() != 3 {
            return Err(MeterError::InvalidData(
                "Expected C.D.E after ':'".to_string(),
            ));
        }

        Ok(Self {
            bytes: [
                Self::parse_group(a)?,
                Self::parse_group(b)?,
                Self::parse_group(parts[0])?,
                Self::parse_group(parts[1])?,
                Self::parse_group(parts[2])?,
                f.map(Self::parse_group).transpose()?.unwrap_or(0xFF),
            ],
        })
    }

    fn parse_group(s: &str) -> MeterResult<u8> {
        s.trim()
            .parse::<u8>()
            .map_err(|_| MeterError::InvalidData(format!("Invalid OBIS group value: {}", s)))
    }

    /// Get the OBIS code as a byte array
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.bytes
    }

    /// Get the OBIS code as a copied byte array
    pub const fn to_bytes(&self) -> [u8; 6] {
        self.bytes
    }
}

impl fmt::Display for ObisCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}:{}.{}.{}*{}",
            self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3], self.bytes[4],
            self.bytes[5]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obis_code_new() {
        let code = ObisCode::new(1, 0, 1, 8, 0, 255);
        assert_eq!(code.to_bytes(), [1, 0, 1, 8, 0, 255]);
    }

    #[test]
    fn test_obis_code_from_dot_string() {
        let code = ObisCode::from_string("1.0.1.8.0.255").unwrap();
        assert_eq!(code, ObisCode::new(1, 0, 1, 8, 0, 255));
    }

    #[test]
    fn test_obis_code_from_display_string() {
        let code = ObisCode::from_string("1-0:1.8.0*255").unwrap();
        assert_eq!(code, ObisCode::new(1, 0, 1, 8, 0, 255));

        // F defaults to 255 when omitted
        let code = ObisCode::from_string("1-0:32.7.0").unwrap();
        assert_eq!(code, ObisCode::new(1, 0, 32, 7, 0, 255));
    }

    #[test]
    fn test_obis_code_rejects_garbage() {
        assert!(ObisCode::from_string("1.2.3").is_err());
        assert!(ObisCode::from_string("1-0:1.8").is_err());
        assert!(ObisCode::from_string("1-0:1.8.x*255").is_err());
    }

    #[test]
    fn test_obis_code_display() {
        let code = ObisCode::new(1, 0, 1, 8, 0, 255);
        assert_eq!(code.to_string(), "1-0:1.8.0*255");
    }
}
