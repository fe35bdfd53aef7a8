//! Static catalogue of the OBIS objects read from the meter
//!
//! Every descriptor fixes the COSEM class used when issuing the GET, the
//! display name, and the engineering unit. The A..F bytes follow
//! IEC 62056-61.

use crate::obis_code::ObisCode;
use std::fmt;

/// COSEM interface classes the client reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CosemClass {
    /// Class 1: a single primitive value (strings, factors)
    Data,
    /// Class 3: value plus scaler_unit
    Register,
    /// Class 4: value, scaler_unit, and capture time
    ExtendedRegister,
}

impl CosemClass {
    /// Class id as carried in the GET-Request attribute descriptor
    pub const fn class_id(self) -> u16 {
        match self {
            CosemClass::Data => 1,
            CosemClass::Register => 3,
            CosemClass::ExtendedRegister => 4,
        }
    }
}

/// One catalogued meter object: identifier plus read metadata
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObisDescriptor {
    pub code: ObisCode,
    pub name: &'static str,
    pub unit: &'static str,
    pub class: CosemClass,
}

impl ObisDescriptor {
    const fn new(
        bytes: [u8; 6],
        name: &'static str,
        unit: &'static str,
        class: CosemClass,
    ) -> Self {
        Self {
            code: ObisCode::from_bytes(bytes),
            name,
            unit,
            class,
        }
    }
}

impl fmt::Display for ObisDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

use CosemClass::{Data, ExtendedRegister, Register};

// Meter identification
pub const METER_SERIAL_NUMBER: ObisDescriptor =
    ObisDescriptor::new([0x00, 0x00, 0x60, 0x01, 0x00, 0xFF], "Serial Number", "", Data);
pub const METER_MANUFACTURER: ObisDescriptor =
    ObisDescriptor::new([0x00, 0x00, 0x60, 0x01, 0x01, 0xFF], "Manufacturer", "", Data);
pub const METER_TYPE: ObisDescriptor =
    ObisDescriptor::new([0x00, 0x00, 0x60, 0x01, 0x02, 0xFF], "Meter Type", "", Data);
pub const MULTIPLICATION_FACTOR: ObisDescriptor = ObisDescriptor::new(
    [0x01, 0x00, 0x00, 0x04, 0x03, 0xFF],
    "Multiplication Factor",
    "",
    Data,
);

// Energy totals
pub const KWH_IMPORT: ObisDescriptor = ObisDescriptor::new(
    [0x01, 0x00, 0x01, 0x08, 0x00, 0xFF],
    "Active Energy Import",
    "kWh",
    Register,
);
pub const KWH_EXPORT: ObisDescriptor = ObisDescriptor::new(
    [0x01, 0x00, 0x02, 0x08, 0x00, 0xFF],
    "Active Energy Export",
    "kWh",
    Register,
);
pub const KVAH_IMPORT: ObisDescriptor = ObisDescriptor::new(
    [0x01, 0x00, 0x09, 0x08, 0x00, 0xFF],
    "Apparent Energy Import",
    "kVAh",
    Register,
);
pub const KVAH_EXPORT: ObisDescriptor = ObisDescriptor::new(
    [0x01, 0x00, 0x10, 0x08, 0x00, 0xFF],
    "Apparent Energy Export",
    "kVAh",
    Register,
);
pub const KVARH_LAG: ObisDescriptor = ObisDescriptor::new(
    [0x01, 0x00, 0x05, 0x08, 0x00, 0xFF],
    "Reactive Energy Lag",
    "kVArh",
    Register,
);
pub const KVARH_LEAD: ObisDescriptor = ObisDescriptor::new(
    [0x01, 0x00, 0x08, 0x08, 0x00, 0xFF],
    "Reactive Energy Lead",
    "kVArh",
    Register,
);

// Per-tariff energy registers, rates 1..8
pub const KWH_IMPORT_RATES: [ObisDescriptor; 8] = [
    ObisDescriptor::new([0x01, 0x00, 0x01, 0x08, 0x01, 0xFF], "kWh Import Rate 1", "kWh", Register),
    ObisDescriptor::new([0x01, 0x00, 0x01, 0x08, 0x02, 0xFF], "kWh Import Rate 2", "kWh", Register),
    ObisDescriptor::new([0x01, 0x00, 0x01, 0x08, 0x03, 0xFF], "kWh Import Rate 3", "kWh", Register),
    ObisDescriptor::new([0x01, 0x00, 0x01, 0x08, 0x04, 0xFF], "kWh Import Rate 4", "kWh", Register),
    ObisDescriptor::new([0x01, 0x00, 0x01, 0x08, 0x05, 0xFF], "kWh Import Rate 5", "kWh", Register),
    ObisDescriptor::new([0x01, 0x00, 0x01, 0x08, 0x06, 0xFF], "kWh Import Rate 6", "kWh", Register),
    ObisDescriptor::new([0x01, 0x00, 0x01, 0x08, 0x07, 0xFF], "kWh Import Rate 7", "kWh", Register),
    ObisDescriptor::new([0x01, 0x00, 0x01, 0x08, 0x08, 0xFF], "kWh Import Rate 8", "kWh", Register),
];

pub const KVAH_IMPORT_RATES: [ObisDescriptor; 8] = [
    ObisDescriptor::new([0x01, 0x00, 0x09, 0x08, 0x01, 0xFF], "kVAh Import Rate 1", "kVAh", Register),
    ObisDescriptor::new([0x01, 0x00, 0x09, 0x08, 0x02, 0xFF], "kVAh Import Rate 2", "kVAh", Register),
    ObisDescriptor::new([0x01, 0x00, 0x09, 0x08, 0x03, 0xFF], "kVAh Import Rate 3", "kVAh", Register),
    ObisDescriptor::new([0x01, 0x00, 0x09, 0x08, 0x04, 0xFF], "kVAh Import Rate 4", "kVAh", Register),
    ObisDescriptor::new([0x01, 0x00, 0x09, 0x08, 0x05, 0xFF], "kVAh Import Rate 5", "kVAh", Register),
    ObisDescriptor::new([0x01, 0x00, 0x09, 0x08, 0x06, 0xFF], "kVAh Import Rate 6", "kVAh", Register),
    ObisDescriptor::new([0x01, 0x00, 0x09, 0x08, 0x07, 0xFF], "kVAh Import Rate 7", "kVAh", Register),
    ObisDescriptor::new([0x01, 0x00, 0x09, 0x08, 0x08, 0xFF], "kVAh Import Rate 8", "kVAh", Register),
];

// Maximum demand
pub const MD_KW_IMPORT: ObisDescriptor = ObisDescriptor::new(
    [0x01, 0x00, 0x01, 0x06, 0x00, 0xFF],
    "MD Active Import",
    "kW",
    ExtendedRegister,
);
pub const MD_KW_EXPORT: ObisDescriptor = ObisDescriptor::new(
    [0x01, 0x00, 0x02, 0x06, 0x00, 0xFF],
    "MD Active Export",
    "kW",
    ExtendedRegister,
);
pub const MD_KVA_IMPORT: ObisDescriptor = ObisDescriptor::new(
    [0x01, 0x00, 0x09, 0x06, 0x00, 0xFF],
    "MD Apparent Import",
    "kVA",
    ExtendedRegister,
);
pub const MD_KVA_EXPORT: ObisDescriptor = ObisDescriptor::new(
    [0x01, 0x00, 0x10, 0x06, 0x00, 0xFF],
    "MD Apparent Export",
    "kVA",
    ExtendedRegister,
);

pub const MD_KW_IMPORT_RATES: [ObisDescriptor; 8] = [
    ObisDescriptor::new([0x01, 0x00, 0x01, 0x06, 0x01, 0xFF], "MD kW Import Rate 1", "kW", ExtendedRegister),
    ObisDescriptor::new([0x01, 0x00, 0x01, 0x06, 0x02, 0xFF], "MD kW Import Rate 2", "kW", ExtendedRegister),
    ObisDescriptor::new([0x01, 0x00, 0x01, 0x06, 0x03, 0xFF], "MD kW Import Rate 3", "kW", ExtendedRegister),
    ObisDescriptor::new([0x01, 0x00, 0x01, 0x06, 0x04, 0xFF], "MD kW Import Rate 4", "kW", ExtendedRegister),
    ObisDescriptor::new([0x01, 0x00, 0x01, 0x06, 0x05, 0xFF], "MD kW Import Rate 5", "kW", ExtendedRegister),
    ObisDescriptor::new([0x01, 0x00, 0x01, 0x06, 0x06, 0xFF], "MD kW Import Rate 6", "kW", ExtendedRegister),
    ObisDescriptor::new([0x01, 0x00, 0x01, 0x06, 0x07, 0xFF], "MD kW Import Rate 7", "kW", ExtendedRegister),
    ObisDescriptor::new([0x01, 0x00, 0x01, 0x06, 0x08, 0xFF], "MD kW Import Rate 8", "kW", ExtendedRegister),
];

pub const MD_KVA_IMPORT_RATES: [ObisDescriptor; 8] = [
    ObisDescriptor::new([0x01, 0x00, 0x09, 0x06, 0x01, 0xFF], "MD kVA Import Rate 1", "kVA", ExtendedRegister),
    ObisDescriptor::new([0x01, 0x00, 0x09, 0x06, 0x02, 0xFF], "MD kVA Import Rate 2", "kVA", ExtendedRegister),
    ObisDescriptor::new([0x01, 0x00, 0x09, 0x06, 0x03, 0xFF], "MD kVA Import Rate 3", "kVA", ExtendedRegister),
    ObisDescriptor::new([0x01, 0x00, 0x09, 0x06, 0x04, 0xFF], "MD kVA Import Rate 4", "kVA", ExtendedRegister),
    ObisDescriptor::new([0x01, 0x00, 0x09, 0x06, 0x05, 0xFF], "MD kVA Import Rate 5", "kVA", ExtendedRegister),
    ObisDescriptor::new([0x01, 0x00, 0x09, 0x06, 0x06, 0xFF], "MD kVA Import Rate 6", "kVA", ExtendedRegister),
    ObisDescriptor::new([0x01, 0x00, 0x09, 0x06, 0x07, 0xFF], "MD kVA Import Rate 7", "kVA", ExtendedRegister),
    ObisDescriptor::new([0x01, 0x00, 0x09, 0x06, 0x08, 0xFF], "MD kVA Import Rate 8", "kVA", ExtendedRegister),
];

// Instantaneous values
pub const VOLTAGE_R: ObisDescriptor =
    ObisDescriptor::new([0x01, 0x00, 0x20, 0x07, 0x00, 0xFF], "Voltage Phase R", "V", Register);
pub const VOLTAGE_Y: ObisDescriptor =
    ObisDescriptor::new([0x01, 0x00, 0x34, 0x07, 0x00, 0xFF], "Voltage Phase Y", "V", Register);
pub const VOLTAGE_B: ObisDescriptor =
    ObisDescriptor::new([0x01, 0x00, 0x48, 0x07, 0x00, 0xFF], "Voltage Phase B", "V", Register);
pub const CURRENT_R: ObisDescriptor =
    ObisDescriptor::new([0x01, 0x00, 0x1F, 0x07, 0x00, 0xFF], "Current Phase R", "A", Register);
pub const CURRENT_Y: ObisDescriptor =
    ObisDescriptor::new([0x01, 0x00, 0x33, 0x07, 0x00, 0xFF], "Current Phase Y", "A", Register);
pub const CURRENT_B: ObisDescriptor =
    ObisDescriptor::new([0x01, 0x00, 0x47, 0x07, 0x00, 0xFF], "Current Phase B", "A", Register);
pub const CURRENT_NEUTRAL: ObisDescriptor =
    ObisDescriptor::new([0x01, 0x00, 0x5B, 0x07, 0x00, 0xFF], "Current Neutral", "A", Register);
pub const POWER_FACTOR: ObisDescriptor =
    ObisDescriptor::new([0x01, 0x00, 0x0D, 0x07, 0x00, 0xFF], "Power Factor", "", Register);
pub const FREQUENCY: ObisDescriptor =
    ObisDescriptor::new([0x01, 0x00, 0x0E, 0x07, 0x00, 0xFF], "Frequency", "Hz", Register);

/// Every catalogued descriptor, for enumeration
pub const ALL: &[&ObisDescriptor] = &[
    &METER_SERIAL_NUMBER,
    &METER_MANUFACTURER,
    &METER_TYPE,
    &MULTIPLICATION_FACTOR,
    &KWH_IMPORT,
    &KWH_EXPORT,
    &KVAH_IMPORT,
    &KVAH_EXPORT,
    &KVARH_LAG,
    &KVARH_LEAD,
    &KWH_IMPORT_RATES[0],
    &KWH_IMPORT_RATES[1],
    &KWH_IMPORT_RATES[2],
    &KWH_IMPORT_RATES[3],
    &KWH_IMPORT_RATES[4],
    &KWH_IMPORT_RATES[5],
    &KWH_IMPORT_RATES[6],
    &KWH_IMPORT_RATES[7],
    &KVAH_IMPORT_RATES[0],
    &KVAH_IMPORT_RATES[1],
    &KVAH_IMPORT_RATES[2],
    &KVAH_IMPORT_RATES[3],
    &KVAH_IMPORT_RATES[4],
    &KVAH_IMPORT_RATES[5],
    &KVAH_IMPORT_RATES[6],
    &KVAH_IMPORT_RATES[7],
    &MD_KW_IMPORT,
    &MD_KW_EXPORT,
    &MD_KVA_IMPORT,
    &MD_KVA_EXPORT,
    &MD_KW_IMPORT_RATES[0],
    &MD_KW_IMPORT_RATES[1],
    &MD_KW_IMPORT_RATES[2],
    &MD_KW_IMPORT_RATES[3],
    &MD_KW_IMPORT_RATES[4],
    &MD_KW_IMPORT_RATES[5],
    &MD_KW_IMPORT_RATES[6],
    &MD_KW_IMPORT_RATES[7],
    &MD_KVA_IMPORT_RATES[0],
    &MD_KVA_IMPORT_RATES[1],
    &MD_KVA_IMPORT_RATES[2],
    &MD_KVA_IMPORT_RATES[3],
    &MD_KVA_IMPORT_RATES[4],
    &MD_KVA_IMPORT_RATES[5],
    &MD_KVA_IMPORT_RATES[6],
    &MD_KVA_IMPORT_RATES[7],
    &VOLTAGE_R,
    &VOLTAGE_Y,
    &VOLTAGE_B,
    &CURRENT_R,
    &CURRENT_Y,
    &CURRENT_B,
    &CURRENT_NEUTRAL,
    &POWER_FACTOR,
    &FREQUENCY,
];

/// Look up a descriptor by display name
pub fn find_by_name(name: &str) -> Option<&'static ObisDescriptor> {
    ALL.iter().copied().find(|d| d.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_name() {
        let desc = find_by_name("Active Energy Import").unwrap();
        assert_eq!(desc.code, ObisCode::new(1, 0, 1, 8, 0, 255));
        assert_eq!(desc.class, CosemClass::Register);
        assert_eq!(desc.unit, "kWh");

        assert!(find_by_name("No Such Object").is_none());
    }

    #[test]
    fn test_class_ids() {
        assert_eq!(METER_SERIAL_NUMBER.class.class_id(), 1);
        assert_eq!(KWH_IMPORT.class.class_id(), 3);
        assert_eq!(MD_KW_IMPORT.class.class_id(), 4);
    }

    #[test]
    fn test_billing_period_byte() {
        // Every catalogued object addresses the current billing period
        for desc in ALL {
            assert_eq!(desc.code.to_bytes()[5], 0xFF, "{}", desc.name);
        }
    }

    #[test]
    fn test_rate_tables_cover_all_tariffs() {
        for (i, desc) in KWH_IMPORT_RATES.iter().enumerate() {
            assert_eq!(desc.code.to_bytes()[4], (i + 1) as u8);
        }
        for (i, desc) in MD_KVA_IMPORT_RATES.iter().enumerate() {
            assert_eq!(desc.code.to_bytes()[4], (i + 1) as u8);
            assert_eq!(desc.class, CosemClass::ExtendedRegister);
        }
    }
}
