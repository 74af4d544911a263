//! # shatter-algo: Control Cost and Occupancy Attack Solvers
//!
//! Optimization models for a multi-zone HVAC controller: the energy cost of
//! serving the true occupancy, and the worst-case cost an attacker can force
//! by misreporting where occupants are.
//!
//! ## Models
//!
//! | Entry point | Description | Problem Class |
//! |-------------|-------------|---------------|
//! | [`baseline_control_cost`] | Fixed occupancy, economizer switch per zone | MILP |
//! | [`activity_control_cost`] | Same model over activity-indexed entries | MILP |
//! | [`attack_vector`] | Occupancy redistribution maximizing cost | MILP |
//! | [`solve_deviation`] | Temperature/CO2 change from an occupancy delta | LP |
//!
//! ### Architecture
//!
//! - **[`formulation`]**: per-zone constraint block shared by every model
//! - **[`backend`]**: program container, backend dispatch and tagged outcomes
//! - **[`control`]** / **[`attack`]** / **[`deviation`]**: the solves
//!
//! Every call builds its own model, solves it and discards it. Results are
//! read only after the backend reports a solution.
//!
//! ## Example
//!
//! ```no_run
//! use shatter_algo::baseline_control_cost;
//! use shatter_core::{AnalysisConfig, ZoneColumns};
//!
//! let cost = baseline_control_cost(
//!     ZoneColumns {
//!         occupants: &[0, 5],
//!         temperature_setpoint: &[75.2, 75.2],
//!         volume: &[5000.0, 4000.0],
//!         co2_rate: &[0.0, 0.019],
//!         heat_rate: &[0.0, 120.0],
//!         appliance_load: &[0.0, 110.0],
//!         co2_setpoint: &[1000.0, 1000.0],
//!     },
//!     15.0,
//!     &AnalysisConfig::default(),
//! )?;
//! println!("cost over the interval: ${cost:.6}");
//! # Ok::<(), shatter_algo::ControlError>(())
//! ```

pub mod attack;
pub mod backend;
pub mod control;
pub mod deviation;
pub mod error;
pub mod formulation;

pub use attack::{attack_vector, AttackProblem, AttackSolution, AttackVector};
pub use backend::{Assignment, LinearProgram, Sense, SolveOutcome};
pub use control::{
    activity_control_cost, activity_costs, baseline_control_cost, solve_control, ControlSolution,
};
pub use deviation::{solve_deviation, MixingState, ZoneDeviation};
pub use error::{ControlError, SolveStage};
pub use formulation::{
    ControlMode, ControlPolicy, Occupancy, UnitCoefficients, ZoneLimit, ZoneOperatingPoint,
};
