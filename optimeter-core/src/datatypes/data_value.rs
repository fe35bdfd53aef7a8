//! Decoded COSEM primitives and the scaler-unit pair

use crate::datatypes::date_time::CosemDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical unit codes from IEC 62056-62 (the subset energy meters return)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    None,
    Ampere,
    Volt,
    VoltAmpere,
    Watt,
    VoltAmpereReactive,
    VoltAmpereHour,
    WattHour,
    VarHour,
    Hertz,
    Other(u8),
}

impl Unit {
    /// Map a wire enum value to a unit
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Unit::None,
            20 => Unit::Ampere,
            21 => Unit::Volt,
            26 => Unit::VoltAmpere,
            27 => Unit::Watt,
            28 => Unit::VoltAmpereReactive,
            29 => Unit::VoltAmpereHour,
            30 => Unit::WattHour,
            31 => Unit::VarHour,
            35 => Unit::Hertz,
            other => Unit::Other(other),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::None => "",
            Unit::Ampere => "A",
            Unit::Volt => "V",
            Unit::VoltAmpere => "VA",
            Unit::Watt => "W",
            Unit::VoltAmpereReactive => "var",
            Unit::VoltAmpereHour => "VAh",
            Unit::WattHour => "Wh",
            Unit::VarHour => "varh",
            Unit::Hertz => "Hz",
            Unit::Other(_) => "?",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Other(code) => write!(f, "unit({})", code),
            _ => f.write_str(self.symbol()),
        }
    }
}

/// Register attribute 3: a power-of-ten exponent and a unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerUnit {
    pub scaler: i8,
    pub unit: Unit,
}

impl ScalerUnit {
    pub fn new(scaler: i8, unit: Unit) -> Self {
        Self { scaler, unit }
    }

    /// Scale a raw register value into engineering units: raw * 10^scaler
    pub fn apply(&self, raw: f64) -> f64 {
        raw * 10f64.powi(self.scaler as i32)
    }
}

/// A single decoded COSEM data value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    /// double-long-unsigned (u32)
    DoubleLongUnsigned(u32),
    /// long (i16)
    Long(i16),
    /// long-unsigned (u16)
    LongUnsigned(u16),
    /// octet-string
    OctetString(Vec<u8>),
    /// visible-string
    VisibleString(String),
    /// scaler_unit structure
    ScalerUnit(ScalerUnit),
    /// date-time
    DateTime(CosemDateTime),
}

impl DataValue {
    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::DoubleLongUnsigned(v) => Some(*v as f64),
            DataValue::Long(v) => Some(*v as f64),
            DataValue::LongUnsigned(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Textual view of the value, if it has one
    ///
    /// Octet-strings are rendered as ASCII; meters return identification
    /// strings through either string type interchangeably.
    pub fn into_text(self) -> Option<String> {
        match self {
            DataValue::VisibleString(s) => Some(s),
            DataValue::OctetString(bytes) => {
                Some(String::from_utf8_lossy(&bytes).into_owned())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaler_application() {
        // raw * 10^s for scalers across the usual range
        for (raw, scaler, expected) in [
            (10_000u32, -1i8, 1000.0),
            (5_000, -1, 500.0),
            (230, 0, 230.0),
            (50, 2, 5000.0),
            (1234, -3, 1.234),
            (7, 3, 7000.0),
        ] {
            let su = ScalerUnit::new(scaler, Unit::WattHour);
            let got = su.apply(raw as f64);
            assert!((got - expected).abs() < 1e-9, "{} * 10^{}", raw, scaler);
        }
    }

    #[test]
    fn test_unit_codes() {
        assert_eq!(Unit::from_code(30), Unit::WattHour);
        assert_eq!(Unit::from_code(21), Unit::Volt);
        assert_eq!(Unit::from_code(35), Unit::Hertz);
        assert_eq!(Unit::from_code(99), Unit::Other(99));
        assert_eq!(Unit::WattHour.symbol(), "Wh");
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(DataValue::DoubleLongUnsigned(10_000).as_f64(), Some(10_000.0));
        assert_eq!(DataValue::Long(-5).as_f64(), Some(-5.0));
        assert_eq!(DataValue::OctetString(vec![1]).as_f64(), None);
    }

    #[test]
    fn test_text_views() {
        assert_eq!(
            DataValue::VisibleString("EM1234".into()).into_text(),
            Some("EM1234".to_string())
        );
        assert_eq!(
            DataValue::OctetString(b"ACME".to_vec()).into_text(),
            Some("ACME".to_string())
        );
        assert_eq!(DataValue::LongUnsigned(1).into_text(), None);
    }
}
