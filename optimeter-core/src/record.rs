//! Meter data record populated by a read cycle
//!
//! The record is owned by the caller and mutably borrowed by the session
//! for the duration of a batch read: cleared first, populated field by
//! field, then its `valid` flag is raised. The serde representation is
//! the consumer-facing JSON schema.

use serde::{Deserialize, Serialize};

pub const TOD_ZONE_COUNT: usize = 8;

/// Meter identification block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterInfo {
    pub serial: String,
    pub manufacturer: String,
    #[serde(rename = "type")]
    pub meter_type: String,
    /// Multiplication factor (CT/PT ratio); 1.0 when the meter is direct
    pub mf: f64,
}

impl Default for MeterInfo {
    fn default() -> Self {
        Self {
            serial: String::new(),
            manufacturer: String::new(),
            meter_type: String::new(),
            mf: 1.0,
        }
    }
}

/// Cumulative energy counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyTotals {
    pub kwh_import: f64,
    pub kvah_import: f64,
    pub kwh_export: f64,
    pub kvah_export: f64,
    pub kvarh_lag: f64,
    pub kvarh_lead: f64,
}

/// Maximum-demand values with their capture times
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaximumDemand {
    pub kw_import: f64,
    pub kw_import_time: String,
    pub kva_import: f64,
    pub kva_import_time: String,
    pub kw_export: f64,
    pub kw_export_time: String,
    pub kva_export: f64,
    pub kva_export_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseVoltages {
    pub r: f64,
    pub y: f64,
    pub b: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseCurrents {
    pub r: f64,
    pub y: f64,
    pub b: f64,
    pub n: f64,
}

/// Instantaneous electrical quantities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instantaneous {
    pub voltage: PhaseVoltages,
    pub current: PhaseCurrents,
    pub power_factor: f64,
    pub frequency: f64,
}

/// One time-of-day tariff zone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodZone {
    pub zone: u8,
    pub kwh: f64,
    pub kvah: f64,
    pub md_kw: f64,
    pub md_kva: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md_kw_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md_kva_time: Option<String>,
}

/// Complete result of one meter read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterRecord {
    pub meter: MeterInfo,
    pub energy: EnergyTotals,
    pub maximum_demand: MaximumDemand,
    pub instantaneous: Instantaneous,
    pub tod_zones: Vec<TodZone>,
    pub timestamp: String,
    pub valid: bool,
    pub error_count: u32,
}

impl MeterRecord {
    pub fn new() -> Self {
        let tod_zones = (1..=TOD_ZONE_COUNT as u8)
            .map(|zone| TodZone {
                zone,
                ..TodZone::default()
            })
            .collect();

        Self {
            meter: MeterInfo::default(),
            energy: EnergyTotals::default(),
            maximum_demand: MaximumDemand::default(),
            instantaneous: Instantaneous::default(),
            tod_zones,
            timestamp: String::new(),
            valid: false,
            error_count: 0,
        }
    }

    /// Reset every field; zone numbering is preserved
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Whether the record holds a usable reading
    ///
    /// Identification plus at least one energy counter must have been
    /// read for the batch to count.
    pub fn is_valid(&self) -> bool {
        self.valid
            && !self.meter.serial.is_empty()
            && (self.energy.kwh_import > 0.0 || self.energy.kvah_import > 0.0)
    }

    /// Total active energy across all TOD zones
    pub fn total_tod_kwh(&self) -> f64 {
        self.tod_zones.iter().map(|z| z.kwh).sum()
    }

    /// Total apparent energy across all TOD zones
    pub fn total_tod_kvah(&self) -> f64 {
        self.tod_zones.iter().map(|z| z.kvah).sum()
    }
}

impl Default for MeterRecord {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_has_numbered_zones() {
        let record = MeterRecord::new();
        assert_eq!(record.tod_zones.len(), TOD_ZONE_COUNT);
        for (i, zone) in record.tod_zones.iter().enumerate() {
            assert_eq!(zone.zone, (i + 1) as u8);
        }
        assert!(!record.valid);
        assert_eq!(record.meter.mf, 1.0);
    }

    #[test]
    fn test_clear_preserves_zone_numbers() {
        let mut record = MeterRecord::new();
        record.energy.kwh_import = 1234.5;
        record.tod_zones[2].kwh = 10.0;
        record.valid = true;

        record.clear();
        assert_eq!(record.energy.kwh_import, 0.0);
        assert_eq!(record.tod_zones[2].kwh, 0.0);
        assert_eq!(record.tod_zones[2].zone, 3);
        assert!(!record.valid);
    }

    #[test]
    fn test_validity_needs_identification_and_energy() {
        let mut record = MeterRecord::new();
        record.valid = true;
        assert!(!record.is_valid());

        record.meter.serial = "EM123456".to_string();
        assert!(!record.is_valid());

        record.energy.kvah_import = 12.0;
        assert!(record.is_valid());
    }

    #[test]
    fn test_tod_totals() {
        let mut record = MeterRecord::new();
        record.tod_zones[0].kwh = 100.0;
        record.tod_zones[1].kwh = 50.0;
        record.tod_zones[0].kvah = 110.0;
        record.tod_zones[5].kvah = 40.0;
        assert_eq!(record.total_tod_kwh(), 150.0);
        assert_eq!(record.total_tod_kvah(), 150.0);
    }

    #[test]
    fn test_json_schema() {
        let mut record = MeterRecord::new();
        record.meter.serial = "EM123456".to_string();
        record.meter.meter_type = "3P4W".to_string();
        record.energy.kwh_import = 1000.0;
        record.maximum_demand.kw_import = 500.0;
        record.maximum_demand.kw_import_time = "2025-10-02 12:00:00".to_string();
        record.instantaneous.voltage.r = 230.1;
        record.tod_zones[0].md_kw_time = Some("2025-10-02 12:00:00".to_string());
        record.timestamp = "2025-10-02 12:05:00".to_string();
        record.valid = true;

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["meter"]["serial"], "EM123456");
        assert_eq!(json["meter"]["type"], "3P4W");
        assert_eq!(json["energy"]["kwh_import"], 1000.0);
        assert_eq!(json["maximum_demand"]["kw_import_time"], "2025-10-02 12:00:00");
        assert_eq!(json["instantaneous"]["voltage"]["r"], 230.1);
        assert_eq!(json["tod_zones"][0]["zone"], 1);
        assert_eq!(json["tod_zones"][0]["md_kw_time"], "2025-10-02 12:00:00");
        // Unset capture times are omitted entirely
        assert!(json["tod_zones"][1].get("md_kw_time").is_none());
        assert_eq!(json["valid"], true);
        assert_eq!(json["error_count"], 0);
    }
}
