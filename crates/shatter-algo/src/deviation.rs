//! Temperature and CO2 deviation caused by moving occupants.
//!
//! Given the occupancy delta of each zone and the mixing state the attacker's
//! model settled on, a second LP recovers the zone temperature change and the
//! absolute zone CO2. Every zone contributes two equalities, so the system has
//! no objective; the solve is a feasibility check.
//!
//! ```text
//! Δn·Q·t·60/1000 = V·ρ·c_p·ΔT
//! C_zone = (1 - m/V)·C_set + m·C_mixed/V - Δn·G/V
//! ```
//!
//! `Q` is the per-occupant heat gain (W), `t` the control interval (min), `ρ`
//! the air mass per cubic foot (kg), `c_p` the specific heat of air
//! (kJ/kg·K), `m` the mixed airflow and `G` the per-occupant CO2 generation.

use crate::backend::{LinearProgram, Sense};
use crate::error::{ControlError, SolveStage};
use crate::formulation::ZoneOperatingPoint;
use good_lp::{constraint, variable, Expression, Variable};
use serde::{Deserialize, Serialize};
use shatter_core::{AnalysisConfig, Cfm, Fahrenheit, Ppm, ZoneSet};
use tracing::debug;

/// Air mass per cubic foot (kg).
pub const AIR_MASS_PER_CUBIC_FOOT: f64 = 0.036;

/// Solver noise below this is reported as no temperature change.
const DEVIATION_EPSILON: f64 = 1e-7;

/// Mixing state of a zone held fixed during the deviation solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixingState {
    pub mixed_airflow: Cfm,
    pub mixed_air_co2: Ppm,
}

impl From<&ZoneOperatingPoint> for MixingState {
    fn from(point: &ZoneOperatingPoint) -> Self {
        Self {
            mixed_airflow: point.mixed_airflow,
            mixed_air_co2: point.mixed_air_co2,
        }
    }
}

/// Deviation of one zone from its true state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDeviation {
    pub index: usize,
    pub occupancy_delta: i64,
    /// Temperature change as solved, in °F units
    pub temperature_delta: Fahrenheit,
    /// `temperature_delta` passed through `(x - 32)/1.8`, or 0 when there is no change
    pub temperature_deviation: f64,
    /// Absolute zone CO2 after the change
    pub zone_co2: Ppm,
    /// `zone_co2` minus the CO2 setpoint, or 0 when occupancy is unchanged
    pub co2_deviation: f64,
}

struct DeviationVariables {
    temperature: Variable,
    co2: Variable,
}

/// Solve the deviation system for every entry of `zones`.
///
/// `occupancy_delta` and `mixing` must be aligned with `zones`.
pub fn solve_deviation(
    zones: &ZoneSet,
    occupancy_delta: &[i64],
    mixing: &[MixingState],
    config: &AnalysisConfig,
) -> Result<Vec<ZoneDeviation>, ControlError> {
    if occupancy_delta.len() != zones.len() || mixing.len() != zones.len() {
        return Err(ControlError::InvalidInput(format!(
            "deviation inputs have {} deltas and {} mixing states for {} {} entries",
            occupancy_delta.len(),
            mixing.len(),
            zones.len(),
            zones.kind()
        )));
    }

    let env = &config.environment;
    let interval_seconds = zones.control_time_min() * 60.0;
    let mut program = LinearProgram::new(SolveStage::Deviation);
    let mut vars = Vec::with_capacity(zones.len());

    for ((zone, &delta), state) in zones.zones().iter().zip(occupancy_delta).zip(mixing) {
        let dn = delta as f64;
        let volume = zone.volume.value();
        let temperature = program.add_var(variable());
        let co2 = program.add_var(variable());

        // kJ added by the extra occupants over the interval
        let heat = dn * zone.heat_gain_per_occupant().value() * interval_seconds / 1000.0;
        let thermal_mass = volume * AIR_MASS_PER_CUBIC_FOOT * env.air_specific_heat;
        program.add_constraint(constraint!(thermal_mass * temperature == heat));

        let m = state.mixed_airflow.value();
        let setpoint = zone.co2_setpoint.value();
        let expected = (1.0 - m / volume) * setpoint + m * state.mixed_air_co2.value() / volume
            - dn * zone.co2_generation_per_occupant() / volume;
        program.add_constraint(constraint!(co2 == expected));

        vars.push(DeviationVariables { temperature, co2 });
    }

    let assignment = program.solve(
        Sense::Minimise,
        Expression::from(0.0),
        config.solver.deviation_backend,
        &config.solver,
    )?;

    let deviations: Vec<ZoneDeviation> = zones
        .zones()
        .iter()
        .zip(occupancy_delta)
        .zip(&vars)
        .enumerate()
        .map(|(index, ((zone, &delta), v))| {
            let mut raw = assignment.value(v.temperature);
            if raw.abs() < DEVIATION_EPSILON {
                raw = 0.0;
            }
            let temperature_delta = Fahrenheit(raw);
            let zone_co2 = Ppm(assignment.value(v.co2));
            ZoneDeviation {
                index,
                occupancy_delta: delta,
                temperature_delta,
                temperature_deviation: if raw != 0.0 {
                    temperature_delta.to_celsius().value()
                } else {
                    0.0
                },
                zone_co2,
                co2_deviation: if delta != 0 {
                    zone_co2.value() - zone.co2_setpoint.value()
                } else {
                    0.0
                },
            }
        })
        .collect();

    debug!(
        entries = deviations.len(),
        changed = deviations.iter().filter(|d| d.occupancy_delta != 0).count(),
        "deviation system solved"
    );
    Ok(deviations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shatter_core::{SolverBackend, SpaceKind, ZoneColumns};

    fn zones() -> ZoneSet {
        ZoneSet::from_columns(
            SpaceKind::Zone,
            ZoneColumns {
                occupants: &[0, 5],
                temperature_setpoint: &[75.2, 75.2],
                volume: &[5000.0, 4000.0],
                co2_rate: &[0.0, 0.019],
                heat_rate: &[0.0, 120.0],
                appliance_load: &[0.0, 110.0],
                co2_setpoint: &[1000.0, 1000.0],
            },
            15.0,
        )
        .unwrap()
    }

    fn at_setpoint(zones: &ZoneSet) -> Vec<MixingState> {
        zones
            .zones()
            .iter()
            .map(|z| MixingState {
                mixed_airflow: Cfm(0.0),
                mixed_air_co2: z.co2_setpoint,
            })
            .collect()
    }

    #[test]
    fn test_no_delta_no_deviation() {
        let zones = zones();
        let devs = solve_deviation(
            &zones,
            &[0, 0],
            &at_setpoint(&zones),
            &AnalysisConfig::default(),
        )
        .unwrap();
        for d in &devs {
            assert_eq!(d.temperature_delta, Fahrenheit(0.0));
            assert_eq!(d.temperature_deviation, 0.0);
            assert_eq!(d.co2_deviation, 0.0);
        }
        assert!((devs[1].zone_co2.value() - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_added_occupants_heat_the_zone() {
        let zones = zones();
        let devs = solve_deviation(
            &zones,
            &[0, 2],
            &at_setpoint(&zones),
            &AnalysisConfig::default(),
        )
        .unwrap();
        let d = &devs[1];
        // 2 · 230 W · 900 s / 1000 = 414 kJ into 4000 ft³ of air
        let expected = 414.0 / (4000.0 * 0.036 * 1.006);
        assert!((d.temperature_delta.value() - expected).abs() < 1e-6);
        assert!((d.temperature_deviation - (expected - 32.0) / 1.8).abs() < 1e-6);
        // 2 · 19_000 ppm·CFM spread over 4000 ft³, with the sign negated
        assert!((d.co2_deviation + 2.0 * 19_000.0 / 4000.0).abs() < 1e-6);
    }

    #[test]
    fn test_interior_point_backend_agrees() {
        let zones = zones();
        let config =
            AnalysisConfig::from_toml_str("[solver]\ndeviation_backend = \"clarabel\"\n")
                .unwrap();
        assert_eq!(config.solver.deviation_backend, SolverBackend::Clarabel);

        let mixing = vec![
            MixingState {
                mixed_airflow: Cfm(0.0),
                mixed_air_co2: Ppm(1000.0),
            },
            MixingState {
                mixed_airflow: Cfm(183.4),
                mixed_air_co2: Ppm(482.0),
            },
        ];
        let simplex =
            solve_deviation(&zones, &[0, 2], &mixing, &AnalysisConfig::default()).unwrap();
        let interior = solve_deviation(&zones, &[0, 2], &mixing, &config).unwrap();

        assert_eq!(interior[0].temperature_delta, Fahrenheit(0.0));
        assert_eq!(interior[0].temperature_deviation, 0.0);
        assert_eq!(interior[0].co2_deviation, 0.0);
        for (a, b) in simplex.iter().zip(&interior) {
            assert!((a.temperature_delta.value() - b.temperature_delta.value()).abs() < 1e-5);
            assert!((a.zone_co2.value() - b.zone_co2.value()).abs() < 1e-4);
        }
        assert!(interior[1].temperature_delta.value() > 0.0);
    }

    #[test]
    fn test_misaligned_inputs_rejected() {
        let zones = zones();
        let err = solve_deviation(
            &zones,
            &[0],
            &at_setpoint(&zones),
            &AnalysisConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ControlError::InvalidInput(_)));
    }
}
