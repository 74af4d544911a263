//! Air-handling constraint model.
//!
//! Each controlled zone contributes one block of variables and constraints to
//! a [`LinearProgram`]. The same block is used with fixed occupancy (control
//! cost) and with occupancy as an integer decision variable (attack).
//!
//! ## Linear form
//!
//! The physical relations are stated on flows rather than on mixing ratios, so
//! nothing divides by mixed airflow inside the model:
//!
//! ```text
//! n                 occupants (constant or integer variable)
//! V_vent = a·n      ventilation-required airflow
//! V_temp = c·n      cooling-required airflow
//!
//! (C_set - C_out)·V_fresh = G·n                  CO2 balance
//! V_mixed = V_return + V_fresh                   mass balance
//! k·(T_set - T_min)·V_mixed ≥ Q·n                supply air not below T_min
//! cost = K·[(T_set - T_min)·V_return
//!           + (T_out - T_min)·V_fresh]           = K·V_mixed·(T_mixed - T_min)
//! ```
//!
//! with `G` the per-occupant CO2 generation (ppm·CFM), `Q` the per-occupant
//! heat gain (W), `k = 0.3167` W per CFM·°F and `K = k·t/60000·price`.
//!
//! ## Control policy
//!
//! [`ControlPolicy::EconomizerSwitch`] adds a binary mode `e` and two
//! implications, linearized with a big-M bound:
//!
//! ```text
//! e = 1  ⇔  V_vent ≥ V_temp      (-M(1-e) ≤ V_vent - V_temp ≤ M·e)
//! e = 1  ⇒  V_return = 0         (V_return ≤ M(1-e))
//! e = 0  ⇒  T_supply = T_min     (V_mixed ≤ (Q/k(T_set-T_min))·n + M·e)
//! ```
//!
//! [`ControlPolicy::MinimumSupply`] drops the mode and pins the supply
//! temperature at `T_min` for every zone.
//!
//! Mixed-air CO2, mixed-air temperature and supply temperature are recovered
//! from the solved flows in [`ZoneModel::operating_point`]; zones with no mixed
//! airflow report their setpoints instead of dividing by zero.

use crate::backend::{Assignment, LinearProgram};
use crate::error::ControlError;
use good_lp::{constraint, variable, Expression, Variable};
use serde::{Deserialize, Serialize};
use shatter_core::{Cfm, Currency, Environment, Fahrenheit, Ppm, SpaceKind, Zone};

/// Sensible heat carried per CFM of air per °F (W).
pub const SENSIBLE_HEAT_FACTOR: f64 = 0.3167;

/// Watt-minutes per kWh.
pub const WATT_MINUTES_PER_KWH: f64 = 60_000.0;

/// Flows below this are treated as zero when deriving mixing ratios.
const FLOW_EPSILON: f64 = 1e-9;

/// Supply-temperature policy applied to each zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlPolicy {
    /// Economizer when ventilation covers cooling, otherwise minimum supply temperature
    #[default]
    EconomizerSwitch,
    /// Supply temperature held at the minimum regardless of demand
    MinimumSupply,
}

/// Occupancy of a zone inside a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Fixed(u32),
    /// Integer decision variable in `[0, max]`
    Free { max: u32 },
}

/// Operating mode found by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// 100% outdoor air, no recirculation
    Economizer,
    /// Mechanical cooling at the minimum supply temperature
    MinimumSupply,
    /// No airflow required
    Idle,
}

/// Per-occupant ventilation and cooling airflow requirements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitCoefficients {
    pub ventilation: Cfm,
    pub cooling: Cfm,
}

/// Why a zone cannot hold occupants under the given environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoneLimit {
    /// CO2 setpoint is not above outdoor CO2, so fresh air cannot dilute it
    Co2SetpointNotAboveOutdoor { setpoint: Ppm, outdoor: Ppm },
    /// Temperature setpoint is not above the minimum supply temperature
    SetpointNotAboveSupply {
        setpoint: Fahrenheit,
        min_supply: Fahrenheit,
    },
}

impl std::fmt::Display for ZoneLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneLimit::Co2SetpointNotAboveOutdoor { setpoint, outdoor } => write!(
                f,
                "CO2 setpoint {setpoint} is not above outdoor CO2 {outdoor}"
            ),
            ZoneLimit::SetpointNotAboveSupply {
                setpoint,
                min_supply,
            } => write!(
                f,
                "temperature setpoint {setpoint} cannot be held with supply air at or above {min_supply}"
            ),
        }
    }
}

impl UnitCoefficients {
    /// Derive coefficients from zone parameters.
    ///
    /// Ventilation: `G / (C_set - C_out)`. Cooling: `Q / (k·(T_set - T_min))`.
    pub fn derive(zone: &Zone, env: &Environment) -> Result<Self, ZoneLimit> {
        let co2_margin = zone.co2_setpoint.value() - env.outdoor_co2.value();
        if co2_margin <= 0.0 {
            return Err(ZoneLimit::Co2SetpointNotAboveOutdoor {
                setpoint: zone.co2_setpoint,
                outdoor: env.outdoor_co2,
            });
        }
        let heat = zone.heat_gain_per_occupant().value();
        let supply_margin = zone.temperature_setpoint.value() - env.min_supply_temperature.value();
        let cooling = if heat == 0.0 {
            0.0
        } else if supply_margin > 0.0 {
            heat / (SENSIBLE_HEAT_FACTOR * supply_margin)
        } else {
            return Err(ZoneLimit::SetpointNotAboveSupply {
                setpoint: zone.temperature_setpoint,
                min_supply: env.min_supply_temperature,
            });
        };
        Ok(Self {
            ventilation: Cfm(zone.co2_generation_per_occupant() / co2_margin),
            cooling: Cfm(cooling),
        })
    }

    /// Economizer mode applies when ventilation alone covers cooling.
    pub fn favours_economizer(&self) -> bool {
        self.ventilation.value() >= self.cooling.value()
    }
}

/// Settings shared by every zone block of one model.
#[derive(Debug, Clone, Copy)]
pub struct FormulationContext<'a> {
    pub environment: &'a Environment,
    pub kind: SpaceKind,
    pub control_time_min: f64,
    pub policy: ControlPolicy,
}

impl FormulationContext<'_> {
    /// Converts `V_mixed·(T_mixed - T_min)` (CFM·°F) into currency.
    pub fn cost_factor(&self) -> f64 {
        SENSIBLE_HEAT_FACTOR * (self.control_time_min / WATT_MINUTES_PER_KWH)
            * self.environment.energy_price_per_kwh
    }
}

#[derive(Debug, Clone, Copy)]
enum OccupancyTerm {
    Fixed(u32),
    Variable(Variable),
}

impl OccupancyTerm {
    fn expr(&self) -> Expression {
        match *self {
            OccupancyTerm::Fixed(n) => Expression::from(f64::from(n)),
            OccupancyTerm::Variable(var) => Expression::from(var),
        }
    }
}

/// Variables of one zone block.
#[derive(Debug, Clone, Copy)]
struct ZoneVariables {
    ventilation: Variable,
    cooling: Variable,
    mixed: Variable,
    fresh: Variable,
    ret: Variable,
    cost: Variable,
    economizer: Option<Variable>,
}

/// One zone's block inside a program, ready to be read back after solving.
#[derive(Debug, Clone)]
pub struct ZoneModel {
    index: usize,
    zone: Zone,
    coefficients: UnitCoefficients,
    occupancy: OccupancyTerm,
    vars: ZoneVariables,
    environment: Environment,
}

/// Solved quantities for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneOperatingPoint {
    pub index: usize,
    pub occupants: u32,
    pub mode: ControlMode,
    pub ventilation_airflow: Cfm,
    pub cooling_airflow: Cfm,
    pub mixed_airflow: Cfm,
    pub fresh_airflow: Cfm,
    pub return_airflow: Cfm,
    pub supply_temperature: Fahrenheit,
    pub mixed_air_temperature: Fahrenheit,
    pub mixed_air_co2: Ppm,
    pub cost: Currency,
}

/// Add one zone's variables and constraints to `program`.
///
/// `coefficients` overrides the derived unit coefficients used by the policy
/// comparison; the balance equations always use the zone's own parameters.
pub fn formulate_zone(
    program: &mut LinearProgram,
    ctx: &FormulationContext<'_>,
    index: usize,
    zone: &Zone,
    occupancy: Occupancy,
    coefficients: Option<UnitCoefficients>,
) -> Result<ZoneModel, ControlError> {
    let stage = program.stage();
    let env = ctx.environment;

    let own = match UnitCoefficients::derive(zone, env) {
        Ok(own) => own,
        Err(limit @ ZoneLimit::Co2SetpointNotAboveOutdoor { .. }) => {
            return Err(ControlError::infeasible(
                stage,
                format!("{} {index}: {limit}", ctx.kind),
            ));
        }
        // A zone that cannot be cooled may only stay empty.
        Err(limit) => {
            return match occupancy {
                Occupancy::Fixed(n) if n > 0 => Err(ControlError::infeasible(
                    stage,
                    format!("{} {index} has {n} occupants but {limit}", ctx.kind),
                )),
                _ => Ok(formulate_idle_zone(program, index, zone, occupancy, env)),
            };
        }
    };
    let table = coefficients.unwrap_or(own);

    let occupancy_term = match occupancy {
        Occupancy::Fixed(n) => OccupancyTerm::Fixed(n),
        Occupancy::Free { max } => {
            OccupancyTerm::Variable(program.add_integer(0.0, f64::from(max)))
        }
    };
    let max_occupants = match occupancy {
        Occupancy::Fixed(n) => f64::from(n),
        Occupancy::Free { max } => f64::from(max),
    };
    let n = occupancy_term.expr();

    let co2_margin = zone.co2_setpoint.value() - env.outdoor_co2.value();
    let supply_margin = zone.temperature_setpoint.value() - env.min_supply_temperature.value();
    let outdoor_margin = env.outdoor_temperature.value() - env.min_supply_temperature.value();
    let generation = zone.co2_generation_per_occupant();
    let heat = zone.heat_gain_per_occupant().value();

    let vars = ZoneVariables {
        ventilation: program.add_var(variable().min(0.0)),
        cooling: program.add_var(variable().min(0.0)),
        mixed: program.add_var(variable().min(0.0)),
        fresh: program.add_var(variable().min(0.0)),
        ret: program.add_var(variable().min(0.0)),
        cost: program.add_var(variable()),
        economizer: match ctx.policy {
            ControlPolicy::EconomizerSwitch => Some(program.add_binary()),
            ControlPolicy::MinimumSupply => None,
        },
    };
    let ZoneVariables {
        ventilation,
        cooling,
        mixed,
        fresh,
        ret,
        cost,
        ..
    } = vars;

    let a = table.ventilation.value();
    let c = table.cooling.value();
    program.add_constraint(constraint!(ventilation == n.clone() * a));
    program.add_constraint(constraint!(cooling == n.clone() * c));

    program.add_constraint(constraint!(co2_margin * fresh == n.clone() * generation));
    program.add_constraint(constraint!(mixed == ret + fresh));
    program.add_constraint(constraint!(
        SENSIBLE_HEAT_FACTOR * supply_margin * mixed >= n.clone() * heat
    ));

    let k = ctx.cost_factor();
    program.add_constraint(constraint!(
        cost == k * supply_margin * ret + k * outdoor_margin * fresh
    ));

    // Airflow needed to hold the setpoint with supply air at the minimum.
    let cooling_flow = own.cooling.value();
    match vars.economizer {
        Some(e) => {
            let big_m = (a.abs() + c.abs() + own.ventilation.value() + cooling_flow)
                * max_occupants
                + 1.0;
            program.add_constraint(constraint!(ventilation - cooling + big_m >= big_m * e));
            program.add_constraint(constraint!(ventilation - cooling <= big_m * e));
            program.add_constraint(constraint!(ret + big_m * e <= big_m));
            program.add_constraint(constraint!(mixed <= n.clone() * cooling_flow + big_m * e));
        }
        None => {
            program.add_constraint(constraint!(mixed <= n * cooling_flow));
        }
    }

    Ok(ZoneModel {
        index,
        zone: zone.clone(),
        coefficients: table,
        occupancy: occupancy_term,
        vars,
        environment: *env,
    })
}

/// Block for a zone pinned to zero airflow and zero cost.
///
/// With [`Occupancy::Free`] the occupant variable is pinned to zero as well;
/// this is how the reference zone enters the attack model.
pub fn formulate_idle_zone(
    program: &mut LinearProgram,
    index: usize,
    zone: &Zone,
    occupancy: Occupancy,
    env: &Environment,
) -> ZoneModel {
    let occupancy_term = match occupancy {
        Occupancy::Fixed(n) => OccupancyTerm::Fixed(n),
        Occupancy::Free { .. } => OccupancyTerm::Variable(program.add_integer(0.0, 0.0)),
    };
    let mut zero = || program.add_var(variable().min(0.0).max(0.0));
    let vars = ZoneVariables {
        ventilation: zero(),
        cooling: zero(),
        mixed: zero(),
        fresh: zero(),
        ret: zero(),
        cost: zero(),
        economizer: None,
    };
    ZoneModel {
        index,
        zone: zone.clone(),
        coefficients: UnitCoefficients {
            ventilation: Cfm(0.0),
            cooling: Cfm(0.0),
        },
        occupancy: occupancy_term,
        vars,
        environment: *env,
    }
}

impl ZoneModel {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn coefficients(&self) -> UnitCoefficients {
        self.coefficients
    }

    /// Occupant count as an expression (constant or decision variable).
    pub fn occupancy_expr(&self) -> Expression {
        self.occupancy.expr()
    }

    pub fn cost_var(&self) -> Variable {
        self.vars.cost
    }

    /// Solved occupant count, rounded within `tolerance`.
    pub fn occupants(&self, assignment: &Assignment, tolerance: f64) -> Result<u32, String> {
        match self.occupancy {
            OccupancyTerm::Fixed(n) => Ok(n),
            OccupancyTerm::Variable(var) => {
                let raw = assignment.value(var);
                let rounded = raw.round();
                if (raw - rounded).abs() > tolerance || rounded < 0.0 {
                    return Err(format!(
                        "occupancy of entry {} solved to non-integral {raw}",
                        self.index
                    ));
                }
                Ok(rounded as u32)
            }
        }
    }

    /// Read the solved flows and derive mixed-air and supply conditions.
    pub fn operating_point(
        &self,
        assignment: &Assignment,
        tolerance: f64,
    ) -> Result<ZoneOperatingPoint, String> {
        let occupants = self.occupants(assignment, tolerance)?;
        let flow = |var: Variable| assignment.value(var).max(0.0);
        let mixed = flow(self.vars.mixed);
        let fresh = flow(self.vars.fresh);
        let ret = flow(self.vars.ret);

        let env = &self.environment;
        let t_set = self.zone.temperature_setpoint.value();
        let c_set = self.zone.co2_setpoint.value();

        let (mode, supply, mixed_temp, mixed_co2) = if mixed <= FLOW_EPSILON {
            (
                ControlMode::Idle,
                env.min_supply_temperature.value().max(t_set),
                t_set,
                c_set,
            )
        } else {
            let heat = self.zone.heat_gain_per_occupant().value() * f64::from(occupants);
            let mode = match self.vars.economizer {
                Some(e) if assignment.value(e) > 0.5 => ControlMode::Economizer,
                _ => ControlMode::MinimumSupply,
            };
            (
                mode,
                t_set - heat / (SENSIBLE_HEAT_FACTOR * mixed),
                (ret * t_set + fresh * env.outdoor_temperature.value()) / mixed,
                (ret * c_set + fresh * env.outdoor_co2.value()) / mixed,
            )
        };

        Ok(ZoneOperatingPoint {
            index: self.index,
            occupants,
            mode,
            ventilation_airflow: Cfm(flow(self.vars.ventilation)),
            cooling_airflow: Cfm(flow(self.vars.cooling)),
            mixed_airflow: Cfm(mixed),
            fresh_airflow: Cfm(fresh),
            return_airflow: Cfm(ret),
            supply_temperature: Fahrenheit(supply),
            mixed_air_temperature: Fahrenheit(mixed_temp),
            mixed_air_co2: Ppm(mixed_co2),
            cost: Currency(assignment.value(self.vars.cost)),
        })
    }
}
