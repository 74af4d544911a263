//! # shatter-core: Zone Data Model
//!
//! Data structures shared by the control-cost and attack solvers:
//!
//! - [`Zone`] / [`ZoneSet`]: validated per-zone (or per-activity) parameters
//! - [`units`]: newtypes for °F, ppm, ft³, CFM, W and currency
//! - [`Environment`] / [`SolverSettings`] / [`AnalysisConfig`]: constants and
//!   solver budgets, loadable from TOML
//! - [`ShatterError`]: unified error type
//!
//! ## Quick Start
//!
//! ```rust
//! use shatter_core::{SpaceKind, ZoneColumns, ZoneSet};
//!
//! let zones = ZoneSet::from_columns(
//!     SpaceKind::Zone,
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
//! )?;
//! assert_eq!(zones.total_occupants(), 5);
//! # Ok::<(), shatter_core::ShatterError>(())
//! ```

pub mod config;
pub mod error;
pub mod units;
pub mod zone;

pub use config::{AnalysisConfig, Environment, SolverBackend, SolverSettings};
pub use error::{ShatterError, ShatterResult};
pub use units::{Celsius, Cfm, CubicFeet, Currency, Fahrenheit, Ppm, Watts};
pub use zone::{SpaceKind, Zone, ZoneColumns, ZoneSet, REFERENCE_ZONE};
