//! Zone parameter sets.
//!
//! A [`ZoneSet`] is the validated, immutable snapshot every solve starts from.
//! Callers usually hold their data column-wise (one vector per parameter), so
//! [`ZoneColumns`] borrows those vectors and [`ZoneSet::from_columns`] checks
//! them before any constraint is built.
//!
//! Index 0 is the reference zone (lobby, outdoor-coupled space). It stays in the
//! set so indices line up with the caller's vectors, but the solvers leave it
//! out of the controlled system.

use crate::error::{ShatterError, ShatterResult};
use crate::units::{Cfm, CubicFeet, Fahrenheit, Ppm, Watts};
use serde::{Deserialize, Serialize};

/// Index of the reference zone.
pub const REFERENCE_ZONE: usize = 0;

/// Whether entries are indexed by physical zone or by occupant activity.
///
/// The equations are identical; the kind only changes how entries are labelled
/// in logs and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceKind {
    #[default]
    Zone,
    Activity,
}

impl SpaceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SpaceKind::Zone => "zone",
            SpaceKind::Activity => "activity",
        }
    }
}

impl std::fmt::Display for SpaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Physical and occupancy parameters of one zone (or activity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Number of occupants
    pub occupants: u32,
    /// Temperature setpoint
    pub temperature_setpoint: Fahrenheit,
    /// Air volume
    pub volume: CubicFeet,
    /// CO2 concentration setpoint
    pub co2_setpoint: Ppm,
    /// CO2 emitted per occupant
    pub co2_rate: Cfm,
    /// Heat radiated per occupant
    pub heat_rate: Watts,
    /// Appliance heat attributed to each occupant
    pub appliance_load: Watts,
}

impl Zone {
    /// Heat gain per occupant (body heat plus appliance share).
    pub fn heat_gain_per_occupant(&self) -> Watts {
        self.heat_rate + self.appliance_load
    }

    /// CO2 generation per occupant scaled to ppm·CFM.
    pub fn co2_generation_per_occupant(&self) -> f64 {
        self.co2_rate.value() * 1_000_000.0
    }

    fn validate(&self, kind: SpaceKind, index: usize) -> ShatterResult<()> {
        let fields = [
            ("temperature setpoint", self.temperature_setpoint.value()),
            ("volume", self.volume.value()),
            ("CO2 setpoint", self.co2_setpoint.value()),
            ("CO2 rate", self.co2_rate.value()),
            ("heat rate", self.heat_rate.value()),
            ("appliance load", self.appliance_load.value()),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ShatterError::Validation(format!(
                    "{kind} {index}: {name} is not finite ({value})"
                )));
            }
        }
        if self.volume.value() <= 0.0 {
            return Err(ShatterError::Validation(format!(
                "{kind} {index}: volume must be positive, got {}",
                self.volume.value()
            )));
        }
        let rates = [
            ("CO2 rate", self.co2_rate.value()),
            ("heat rate", self.heat_rate.value()),
            ("appliance load", self.appliance_load.value()),
        ];
        for (name, value) in rates {
            if value < 0.0 {
                return Err(ShatterError::Validation(format!(
                    "{kind} {index}: {name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Borrowed column-wise zone data, one slice per parameter.
///
/// Occupancy is signed so that negative counts can be reported instead of
/// silently wrapping.
#[derive(Debug, Clone, Copy)]
pub struct ZoneColumns<'a> {
    pub occupants: &'a [i64],
    pub temperature_setpoint: &'a [f64],
    pub volume: &'a [f64],
    pub co2_rate: &'a [f64],
    pub heat_rate: &'a [f64],
    pub appliance_load: &'a [f64],
    pub co2_setpoint: &'a [f64],
}

impl ZoneColumns<'_> {
    fn check_lengths(&self, kind: SpaceKind) -> ShatterResult<usize> {
        let n = self.occupants.len();
        let lengths = [
            ("temperature setpoint", self.temperature_setpoint.len()),
            ("volume", self.volume.len()),
            ("CO2 rate", self.co2_rate.len()),
            ("heat rate", self.heat_rate.len()),
            ("appliance load", self.appliance_load.len()),
            ("CO2 setpoint", self.co2_setpoint.len()),
        ];
        for (name, len) in lengths {
            if len != n {
                return Err(ShatterError::Validation(format!(
                    "{name} has {len} entries but occupancy has {n} {kind} entries"
                )));
            }
        }
        Ok(n)
    }
}

/// Validated snapshot of all zones for one control instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSet {
    kind: SpaceKind,
    zones: Vec<Zone>,
    /// Control interval in minutes
    control_time_min: f64,
}

impl ZoneSet {
    /// Build from owned zones, validating every entry.
    pub fn new(kind: SpaceKind, zones: Vec<Zone>, control_time_min: f64) -> ShatterResult<Self> {
        if zones.is_empty() {
            return Err(ShatterError::Validation(format!("no {kind} entries supplied")));
        }
        if !control_time_min.is_finite() || control_time_min <= 0.0 {
            return Err(ShatterError::Validation(format!(
                "control time must be a positive number of minutes, got {control_time_min}"
            )));
        }
        for (index, zone) in zones.iter().enumerate() {
            zone.validate(kind, index)?;
        }
        Ok(Self {
            kind,
            zones,
            control_time_min,
        })
    }

    /// Build from column-wise vectors.
    pub fn from_columns(
        kind: SpaceKind,
        columns: ZoneColumns<'_>,
        control_time_min: f64,
    ) -> ShatterResult<Self> {
        let n = columns.check_lengths(kind)?;
        let mut zones = Vec::with_capacity(n);
        for i in 0..n {
            zones.push(Zone {
                occupants: occupant_count(kind, i, columns.occupants[i])?,
                temperature_setpoint: Fahrenheit(columns.temperature_setpoint[i]),
                volume: CubicFeet(columns.volume[i]),
                co2_setpoint: Ppm(columns.co2_setpoint[i]),
                co2_rate: Cfm(columns.co2_rate[i]),
                heat_rate: Watts(columns.heat_rate[i]),
                appliance_load: Watts(columns.appliance_load[i]),
            });
        }
        Self::new(kind, zones, control_time_min)
    }

    /// Copy of this set with occupancy replaced.
    pub fn with_occupants(&self, occupants: &[i64]) -> ShatterResult<Self> {
        if occupants.len() != self.zones.len() {
            return Err(ShatterError::Validation(format!(
                "occupancy has {} entries but the set has {} {} entries",
                occupants.len(),
                self.zones.len(),
                self.kind
            )));
        }
        let mut zones = self.zones.clone();
        for (i, (zone, &count)) in zones.iter_mut().zip(occupants).enumerate() {
            zone.occupants = occupant_count(self.kind, i, count)?;
        }
        Ok(Self {
            kind: self.kind,
            zones,
            control_time_min: self.control_time_min,
        })
    }

    pub fn kind(&self) -> SpaceKind {
        self.kind
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone(&self, index: usize) -> Option<&Zone> {
        self.zones.get(index)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn control_time_min(&self) -> f64 {
        self.control_time_min
    }

    /// Controlled zones (everything except the reference zone) with their indices.
    pub fn controlled(&self) -> impl Iterator<Item = (usize, &Zone)> {
        self.zones.iter().enumerate().skip(REFERENCE_ZONE + 1)
    }

    /// Occupancy vector, including the reference zone.
    pub fn occupancy(&self) -> Vec<u32> {
        self.zones.iter().map(|z| z.occupants).collect()
    }

    /// Total occupants across every entry, reference zone included.
    pub fn total_occupants(&self) -> u64 {
        self.zones.iter().map(|z| u64::from(z.occupants)).sum()
    }
}

fn occupant_count(kind: SpaceKind, index: usize, count: i64) -> ShatterResult<u32> {
    u32::try_from(count).map_err(|_| {
        ShatterError::Validation(format!(
            "{kind} {index}: occupancy must be a non-negative count, got {count}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns<'a>(occupants: &'a [i64], volume: &'a [f64]) -> ZoneColumns<'a> {
        ZoneColumns {
            occupants,
            temperature_setpoint: &[75.2, 73.4],
            volume,
            co2_rate: &[0.0, 0.013],
            heat_rate: &[0.0, 100.0],
            appliance_load: &[0.0, 180.0],
            co2_setpoint: &[1000.0, 1000.0],
        }
    }

    #[test]
    fn test_from_columns() {
        let set = ZoneSet::from_columns(SpaceKind::Zone, columns(&[0, 3], &[5000.0, 3000.0]), 15.0)
            .expect("valid columns");
        assert_eq!(set.len(), 2);
        assert_eq!(set.occupancy(), vec![0, 3]);
        assert_eq!(set.total_occupants(), 3);
        assert_eq!(set.controlled().count(), 1);
        let zone = set.zone(1).unwrap();
        assert_eq!(zone.heat_gain_per_occupant(), Watts(280.0));
        assert!((zone.co2_generation_per_occupant() - 13_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let cols = ZoneColumns {
            co2_setpoint: &[1000.0],
            ..columns(&[0, 3], &[5000.0, 3000.0])
        };
        let err = ZoneSet::from_columns(SpaceKind::Zone, cols, 15.0).unwrap_err();
        assert!(matches!(err, ShatterError::Validation(_)));
        assert!(err.to_string().contains("CO2 setpoint"));
    }

    #[test]
    fn test_rejects_non_positive_volume() {
        let err = ZoneSet::from_columns(SpaceKind::Zone, columns(&[0, 3], &[5000.0, 0.0]), 15.0)
            .unwrap_err();
        assert!(err.to_string().contains("volume must be positive"));
    }

    #[test]
    fn test_rejects_negative_occupancy() {
        let err = ZoneSet::from_columns(
            SpaceKind::Activity,
            columns(&[0, -2], &[5000.0, 3000.0]),
            15.0,
        )
        .unwrap_err();
        assert!(err.to_string().contains("activity 1"));
    }

    #[test]
    fn test_rejects_bad_control_time() {
        assert!(ZoneSet::from_columns(SpaceKind::Zone, columns(&[0, 3], &[5000.0, 3000.0]), 0.0)
            .is_err());
        assert!(
            ZoneSet::from_columns(SpaceKind::Zone, columns(&[0, 3], &[5000.0, 3000.0]), f64::NAN)
                .is_err()
        );
    }

    #[test]
    fn test_with_occupants_leaves_original_untouched() {
        let set = ZoneSet::from_columns(SpaceKind::Zone, columns(&[0, 3], &[5000.0, 3000.0]), 15.0)
            .unwrap();
        let moved = set.with_occupants(&[1, 7]).unwrap();
        assert_eq!(moved.occupancy(), vec![1, 7]);
        assert_eq!(set.occupancy(), vec![0, 3]);
        assert!(set.with_occupants(&[1]).is_err());
        assert!(set.with_occupants(&[0, -1]).is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let set = ZoneSet::from_columns(SpaceKind::Zone, columns(&[0, 3], &[5000.0, 3000.0]), 15.0)
            .unwrap();
        let json = serde_json::to_string(&set).unwrap();
        let back: ZoneSet = serde_json::from_str(&json).unwrap();
        assert_eq!(set, back);
    }
}
