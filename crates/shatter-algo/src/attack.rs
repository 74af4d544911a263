//! Adversarial occupancy redistribution.
//!
//! The attacker keeps the building's total head count but may place occupants
//! in any controlled zone. Occupancy becomes an integer decision variable per
//! zone and the model maximizes total control cost subject to the same air
//! handling equations as the baseline solve. The reference zone is pinned to
//! zero occupants.
//!
//! By default the attacker's model holds supply air at the minimum temperature
//! in every zone ([`ControlPolicy::MinimumSupply`]), so zones that would run on
//! economizer under the real controller can only be left empty. The full
//! economizer switch can be enabled with [`AttackProblem::with_control_policy`].
//!
//! After the redistribution is fixed, [`solve_deviation`] recovers the
//! temperature and CO2 change each zone would see.
//!
//! ## Example
//!
//! ```no_run
//! use shatter_algo::attack::AttackProblem;
//! use shatter_core::{AnalysisConfig, SpaceKind, ZoneColumns, ZoneSet};
//!
//! let zones = ZoneSet::from_columns(
//!     SpaceKind::Zone,
//!     ZoneColumns {
//!         occupants: &[0, 5, 3],
//!         temperature_setpoint: &[75.2, 75.2, 71.6],
//!         volume: &[5000.0, 4000.0, 6000.0],
//!         co2_rate: &[0.0, 0.019, 0.0272],
//!         heat_rate: &[0.0, 120.0, 115.0],
//!         appliance_load: &[0.0, 110.0, 1200.0],
//!         co2_setpoint: &[1000.0, 1000.0, 1000.0],
//!     },
//!     15.0,
//! )?;
//! let solution = AttackProblem::new(zones).solve(&AnalysisConfig::default())?;
//! println!("{}", solution.summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::backend::{LinearProgram, Sense};
use crate::control::{solve_control, ControlSolution};
use crate::deviation::{solve_deviation, MixingState, ZoneDeviation};
use crate::error::{ControlError, SolveStage};
use crate::formulation::{
    formulate_idle_zone, formulate_zone, ControlPolicy, FormulationContext, Occupancy,
    UnitCoefficients, ZoneOperatingPoint,
};
use good_lp::{constraint, variable, Expression};
use serde::{Deserialize, Serialize};
use shatter_core::{AnalysisConfig, Currency, SpaceKind, ZoneColumns, ZoneSet, REFERENCE_ZONE};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The four per-zone sequences describing an attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackVector {
    /// Occupancy chosen by the attacker; index 0 is always 0
    pub attacker_occupancy: Vec<u32>,
    /// Attacker occupancy minus true occupancy
    pub occupancy_delta: Vec<i64>,
    /// Celsius-equivalent temperature deviation
    pub temperature_deviation: Vec<f64>,
    /// Zone CO2 minus the CO2 setpoint
    pub co2_deviation: Vec<f64>,
}

/// Result of an attack solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackSolution {
    pub kind: SpaceKind,
    pub policy: ControlPolicy,
    pub true_occupancy: Vec<u32>,
    pub vector: AttackVector,
    /// Maximized total cost under the attacker's occupancy
    pub attacked_cost: Currency,
    /// Operating points under attack, one per entry including the reference entry
    pub zones: Vec<ZoneOperatingPoint>,
    pub deviations: Vec<ZoneDeviation>,
    pub solve_time: Duration,
}

impl AttackSolution {
    /// Entries the attacker added occupants to.
    pub fn targeted(&self) -> Vec<usize> {
        self.vector
            .occupancy_delta
            .iter()
            .enumerate()
            .filter(|(_, d)| **d > 0)
            .map(|(i, _)| i)
            .collect()
    }

    /// Occupants moved away from their true entry.
    pub fn displaced(&self) -> u64 {
        self.vector
            .occupancy_delta
            .iter()
            .filter(|&&d| d > 0)
            .map(|&d| d.unsigned_abs())
            .sum()
    }

    /// Format a human-readable summary
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Attack Summary\n{}\n", "=".repeat(40)));
        s.push_str(&format!("Policy: {:?}\n", self.policy));
        s.push_str(&format!("Attacked Cost: ${:.6}\n", self.attacked_cost.value()));
        s.push_str(&format!("Displaced Occupants: {}\n", self.displaced()));
        s.push_str(&format!("Solve Time: {:.2?}\n", self.solve_time));
        for (i, d) in self.deviations.iter().enumerate() {
            s.push_str(&format!(
                "  {} {:>2}: {} -> {} (Δ{:+}) ΔT={:.4} ΔCO2={:.2}\n",
                self.kind,
                i,
                self.true_occupancy[i],
                self.vector.attacker_occupancy[i],
                d.occupancy_delta,
                d.temperature_deviation,
                d.co2_deviation
            ));
        }
        s
    }
}

/// Attack over a zone set whose occupancy is the true occupancy.
#[derive(Debug, Clone)]
pub struct AttackProblem {
    zones: ZoneSet,
    policy: ControlPolicy,
    coefficients: Option<Vec<UnitCoefficients>>,
}

impl AttackProblem {
    pub fn new(zones: ZoneSet) -> Self {
        Self {
            zones,
            policy: ControlPolicy::MinimumSupply,
            coefficients: None,
        }
    }

    /// Supply-temperature policy the attacker models.
    pub fn with_control_policy(mut self, policy: ControlPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use a fixed table of unit coefficients instead of deriving them.
    ///
    /// The table is indexed like the zone set; the reference entry is ignored.
    pub fn with_unit_coefficients(mut self, coefficients: Vec<UnitCoefficients>) -> Self {
        self.coefficients = Some(coefficients);
        self
    }

    pub fn zones(&self) -> &ZoneSet {
        &self.zones
    }

    pub fn policy(&self) -> ControlPolicy {
        self.policy
    }

    /// Solve the redistribution and the resulting deviations.
    pub fn solve(&self, config: &AnalysisConfig) -> Result<AttackSolution, ControlError> {
        config.validate()?;
        let start = Instant::now();
        let zones = &self.zones;

        if let Some(table) = &self.coefficients {
            if table.len() != zones.len() {
                return Err(ControlError::InvalidInput(format!(
                    "unit coefficient table has {} entries for {} {} entries",
                    table.len(),
                    zones.len(),
                    zones.kind()
                )));
            }
        }

        let true_occupancy = zones.occupancy();
        let total = u32::try_from(zones.total_occupants()).map_err(|_| {
            ControlError::InvalidInput(format!(
                "total occupancy {} exceeds the supported range",
                zones.total_occupants()
            ))
        })?;

        let ctx = FormulationContext {
            environment: &config.environment,
            kind: zones.kind(),
            control_time_min: zones.control_time_min(),
            policy: self.policy,
        };

        let mut program = LinearProgram::new(SolveStage::Attack);
        let mut models = Vec::with_capacity(zones.len());
        for (index, zone) in zones.zones().iter().enumerate() {
            let model = if index == REFERENCE_ZONE {
                formulate_idle_zone(
                    &mut program,
                    index,
                    zone,
                    Occupancy::Free { max: 0 },
                    &config.environment,
                )
            } else {
                let table = self.coefficients.as_ref().map(|t| t[index]);
                formulate_zone(
                    &mut program,
                    &ctx,
                    index,
                    zone,
                    Occupancy::Free { max: total },
                    table,
                )?
            };
            models.push(model);
        }

        let ventilation_bound: Vec<usize> = models
            .iter()
            .filter(|m| m.index() != REFERENCE_ZONE && m.coefficients().favours_economizer())
            .map(|m| m.index())
            .collect();
        debug!(policy = ?self.policy, ?ventilation_bound, "attack model built");

        let placed: Expression = models.iter().map(|m| m.occupancy_expr()).sum();
        let head_count = f64::from(total);
        program.add_constraint(constraint!(placed == head_count));

        let cost_total = program.add_var(variable());
        let cost_sum: Expression = models.iter().map(|m| m.cost_var()).sum();
        program.add_constraint(constraint!(cost_total == cost_sum));

        let assignment = program.solve(
            Sense::Maximise,
            Expression::from(cost_total),
            config.solver.backend,
            &config.solver,
        )?;

        let tolerance = config.solver.integrality_tolerance;
        let points = models
            .iter()
            .map(|m| m.operating_point(&assignment, tolerance))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|message| ControlError::Solver {
                stage: SolveStage::Attack,
                message,
            })?;

        let attacker_occupancy: Vec<u32> = points.iter().map(|p| p.occupants).collect();
        let placed_total: u64 = attacker_occupancy.iter().map(|&n| u64::from(n)).sum();
        if placed_total != u64::from(total) {
            return Err(ControlError::Solver {
                stage: SolveStage::Attack,
                message: format!("attacker placed {placed_total} of {total} occupants"),
            });
        }

        let occupancy_delta: Vec<i64> = attacker_occupancy
            .iter()
            .zip(&true_occupancy)
            .map(|(&a, &t)| i64::from(a) - i64::from(t))
            .collect();
        let mixing: Vec<MixingState> = points.iter().map(MixingState::from).collect();
        let deviations = solve_deviation(zones, &occupancy_delta, &mixing, config)?;

        let vector = AttackVector {
            attacker_occupancy,
            occupancy_delta,
            temperature_deviation: deviations.iter().map(|d| d.temperature_deviation).collect(),
            co2_deviation: deviations.iter().map(|d| d.co2_deviation).collect(),
        };

        let solution = AttackSolution {
            kind: zones.kind(),
            policy: self.policy,
            true_occupancy,
            vector,
            attacked_cost: Currency(assignment.value(cost_total)),
            zones: points,
            deviations,
            solve_time: start.elapsed(),
        };

        if solution.displaced() == 0 {
            warn!(kind = %solution.kind, "attacker found no costlier placement than the true occupancy");
        }
        info!(
            kind = %solution.kind,
            policy = ?solution.policy,
            displaced = solution.displaced(),
            targeted = ?solution.targeted(),
            attacked_cost = solution.attacked_cost.value(),
            "attack model solved"
        );
        Ok(solution)
    }

    /// Re-solve the control model with occupancy set to the attacker's placement.
    pub fn replay(
        &self,
        solution: &AttackSolution,
        config: &AnalysisConfig,
    ) -> Result<ControlSolution, ControlError> {
        let occupants: Vec<i64> = solution
            .vector
            .attacker_occupancy
            .iter()
            .map(|&n| i64::from(n))
            .collect();
        let attacked = self.zones.with_occupants(&occupants)?;
        solve_control(&attacked, config)
    }
}

/// Attack vector for zone-indexed vectors; `columns.occupants` is the true occupancy.
pub fn attack_vector(
    columns: ZoneColumns<'_>,
    control_time_min: f64,
    config: &AnalysisConfig,
) -> Result<AttackVector, ControlError> {
    let zones = ZoneSet::from_columns(SpaceKind::Zone, columns, control_time_min)?;
    Ok(AttackProblem::new(zones).solve(config)?.vector)
}
