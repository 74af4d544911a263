//! Baseline control cost.
//!
//! Feasibility solve with every controlled zone's occupancy fixed to its true
//! value and the economizer/minimum-supply implications active. The reference
//! zone (index 0) is left out of the system and reports no cost.
//!
//! The activity-indexed variant runs the same model over a
//! [`SpaceKind::Activity`] set.

use crate::backend::{LinearProgram, Sense};
use crate::error::{ControlError, SolveStage};
use crate::formulation::{
    formulate_zone, ControlMode, ControlPolicy, FormulationContext, Occupancy, ZoneOperatingPoint,
};
use good_lp::{constraint, variable, Expression};
use serde::{Deserialize, Serialize};
use shatter_core::{AnalysisConfig, Currency, SpaceKind, ZoneColumns, ZoneSet};
use std::time::{Duration, Instant};
use tracing::info;

/// Solved control model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlSolution {
    pub kind: SpaceKind,
    /// Cost summed over controlled entries
    pub total_cost: Currency,
    /// Operating points of controlled entries, in index order
    pub zones: Vec<ZoneOperatingPoint>,
    /// Number of entries including the reference entry
    pub num_entries: usize,
    pub solve_time: Duration,
}

impl ControlSolution {
    pub fn zone(&self, index: usize) -> Option<&ZoneOperatingPoint> {
        self.zones.iter().find(|z| z.index == index)
    }

    /// Per-entry cost aligned with the input vectors; the reference entry is 0.
    pub fn cost_vector(&self) -> Vec<f64> {
        let mut costs = vec![0.0; self.num_entries];
        for point in &self.zones {
            costs[point.index] = point.cost.value();
        }
        costs
    }

    pub fn economizer_count(&self) -> usize {
        self.zones
            .iter()
            .filter(|z| z.mode == ControlMode::Economizer)
            .count()
    }

    /// Format a human-readable summary
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Control Cost Summary\n{}\n", "=".repeat(40)));
        s.push_str(&format!("Total Cost: ${:.6}\n", self.total_cost.value()));
        s.push_str(&format!("Solve Time: {:.2?}\n", self.solve_time));
        for z in &self.zones {
            s.push_str(&format!(
                "  {} {:>2}: n={:<4} {:?} mixed={:.2} CFM fresh={:.2} CFM cost=${:.6}\n",
                self.kind,
                z.index,
                z.occupants,
                z.mode,
                z.mixed_airflow.value(),
                z.fresh_airflow.value(),
                z.cost.value()
            ));
        }
        s
    }
}

/// Solve the control model for `zones` with their current occupancy.
pub fn solve_control(
    zones: &ZoneSet,
    config: &AnalysisConfig,
) -> Result<ControlSolution, ControlError> {
    config.validate()?;
    let start = Instant::now();
    let ctx = FormulationContext {
        environment: &config.environment,
        kind: zones.kind(),
        control_time_min: zones.control_time_min(),
        policy: ControlPolicy::EconomizerSwitch,
    };

    let mut program = LinearProgram::new(SolveStage::Control);
    let mut models = Vec::with_capacity(zones.len().saturating_sub(1));
    for (index, zone) in zones.controlled() {
        models.push(formulate_zone(
            &mut program,
            &ctx,
            index,
            zone,
            Occupancy::Fixed(zone.occupants),
            None,
        )?);
    }

    let total = program.add_var(variable());
    let cost_sum: Expression = models.iter().map(|m| m.cost_var()).sum();
    program.add_constraint(constraint!(total == cost_sum));

    let assignment = program.solve(
        Sense::Minimise,
        Expression::from(0.0),
        config.solver.backend,
        &config.solver,
    )?;

    let tolerance = config.solver.integrality_tolerance;
    let points = models
        .iter()
        .map(|m| m.operating_point(&assignment, tolerance))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|message| ControlError::Solver {
            stage: SolveStage::Control,
            message,
        })?;

    let solution = ControlSolution {
        kind: zones.kind(),
        total_cost: Currency(assignment.value(total)),
        zones: points,
        num_entries: zones.len(),
        solve_time: start.elapsed(),
    };
    info!(
        kind = %solution.kind,
        entries = solution.num_entries,
        economizer = solution.economizer_count(),
        total_cost = solution.total_cost.value(),
        "control model solved"
    );
    Ok(solution)
}

/// Total control cost for zone-indexed vectors.
pub fn baseline_control_cost(
    columns: ZoneColumns<'_>,
    control_time_min: f64,
    config: &AnalysisConfig,
) -> Result<f64, ControlError> {
    let zones = ZoneSet::from_columns(SpaceKind::Zone, columns, control_time_min)?;
    Ok(solve_control(&zones, config)?.total_cost.value())
}

/// Total control cost for activity-indexed vectors.
pub fn activity_control_cost(
    columns: ZoneColumns<'_>,
    control_time_min: f64,
    config: &AnalysisConfig,
) -> Result<f64, ControlError> {
    let activities = ZoneSet::from_columns(SpaceKind::Activity, columns, control_time_min)?;
    Ok(solve_control(&activities, config)?.total_cost.value())
}

/// Per-activity control cost, aligned with the input vectors.
pub fn activity_costs(
    columns: ZoneColumns<'_>,
    control_time_min: f64,
    config: &AnalysisConfig,
) -> Result<Vec<f64>, ControlError> {
    let activities = ZoneSet::from_columns(SpaceKind::Activity, columns, control_time_min)?;
    Ok(solve_control(&activities, config)?.cost_vector())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shatter_core::Ppm;

    fn two_zone_columns<'a>(occupants: &'a [i64]) -> ZoneColumns<'a> {
        ZoneColumns {
            occupants,
            temperature_setpoint: &[75.2, 75.2],
            volume: &[5000.0, 4000.0],
            co2_rate: &[0.0, 0.019],
            heat_rate: &[0.0, 120.0],
            appliance_load: &[0.0, 110.0],
            co2_setpoint: &[1000.0, 1000.0],
        }
    }

    #[test]
    fn test_single_zone_cooling_mode() {
        let config = AnalysisConfig::default();
        let zones =
            ZoneSet::from_columns(SpaceKind::Zone, two_zone_columns(&[0, 5]), 15.0).unwrap();
        let solution = solve_control(&zones, &config).expect("feasible");

        let point = solution.zone(1).expect("zone 1 reported");
        assert_eq!(point.mode, ControlMode::MinimumSupply);
        // cooling airflow 230 W / (0.3167 · 19.8) per occupant
        let mixed = 5.0 * 230.0 / (0.3167 * 19.8);
        assert!((point.mixed_airflow.value() - mixed).abs() < 1e-4);
        assert!((point.supply_temperature.value() - 55.4).abs() < 1e-6);
        // fresh air is exactly the ventilation requirement
        assert!((point.fresh_airflow.value() - 5.0 * 19_000.0 / 600.0).abs() < 1e-4);
        assert!(point.mixed_air_co2 > Ppm(400.0) && point.mixed_air_co2 < Ppm(1000.0));
        assert!(solution.zone(0).is_none());
        assert_eq!(solution.cost_vector()[0], 0.0);
        assert!((solution.total_cost.value() - point.cost.value()).abs() < 1e-9);
        assert!(solution.summary().contains("Total Cost"));
    }

    #[test]
    fn test_activity_variant_matches_zone_variant() {
        let config = AnalysisConfig::default();
        let zone_total = baseline_control_cost(two_zone_columns(&[0, 5]), 15.0, &config).unwrap();
        let activity_total =
            activity_control_cost(two_zone_columns(&[0, 5]), 15.0, &config).unwrap();
        assert!((zone_total - activity_total).abs() < 1e-9);

        let per_activity = activity_costs(two_zone_columns(&[0, 5]), 15.0, &config).unwrap();
        assert_eq!(per_activity.len(), 2);
        assert!((per_activity.iter().sum::<f64>() - activity_total).abs() < 1e-9);
    }

    #[test]
    fn test_reference_zone_only() {
        let config = AnalysisConfig::default();
        let cols = ZoneColumns {
            occupants: &[12],
            temperature_setpoint: &[75.2],
            volume: &[5000.0],
            co2_rate: &[0.0],
            heat_rate: &[0.0],
            appliance_load: &[0.0],
            co2_setpoint: &[1000.0],
        };
        let total = baseline_control_cost(cols, 15.0, &config).unwrap();
        assert!(total.abs() < 1e-12);
    }
}
