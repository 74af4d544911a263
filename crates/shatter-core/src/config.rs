//! Analysis configuration.
//!
//! Environment constants and solver settings, loadable from TOML. Every key is
//! optional; anything left out keeps the default shown below.
//!
//! ```toml
//! [environment]
//! outdoor_co2 = 400.0
//! outdoor_temperature = 91.4
//! air_specific_heat = 1.006
//! min_supply_temperature = 55.4
//! energy_price_per_kwh = 0.1137
//!
//! [solver]
//! backend = "microlp"
//! deviation_backend = "microlp"
//! time_limit_seconds = 60.0
//! integrality_tolerance = 1e-6
//! ```

use crate::error::{ShatterError, ShatterResult};
use crate::units::{Fahrenheit, Ppm};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shared outdoor and plant constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    /// CO2 concentration of outdoor air
    pub outdoor_co2: Ppm,
    /// Outdoor air temperature
    pub outdoor_temperature: Fahrenheit,
    /// Specific heat of air (kJ/kg·K)
    pub air_specific_heat: f64,
    /// Lowest temperature the supply coil can deliver
    pub min_supply_temperature: Fahrenheit,
    /// Energy price per kWh
    pub energy_price_per_kwh: f64,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            outdoor_co2: Ppm(400.0),
            outdoor_temperature: Fahrenheit(91.4),
            air_specific_heat: 1.006,
            min_supply_temperature: Fahrenheit(55.4),
            energy_price_per_kwh: 0.1137,
        }
    }
}

impl Environment {
    pub fn validate(&self) -> ShatterResult<()> {
        let fields = [
            ("outdoor_co2", self.outdoor_co2.value()),
            ("outdoor_temperature", self.outdoor_temperature.value()),
            ("air_specific_heat", self.air_specific_heat),
            ("min_supply_temperature", self.min_supply_temperature.value()),
            ("energy_price_per_kwh", self.energy_price_per_kwh),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ShatterError::Config(format!("{name} is not finite ({value})")));
            }
        }
        if self.outdoor_co2.value() < 0.0 {
            return Err(ShatterError::Config("outdoor_co2 must be non-negative".into()));
        }
        if self.air_specific_heat <= 0.0 {
            return Err(ShatterError::Config("air_specific_heat must be positive".into()));
        }
        if self.energy_price_per_kwh <= 0.0 {
            return Err(ShatterError::Config("energy_price_per_kwh must be positive".into()));
        }
        Ok(())
    }
}

/// LP/MILP backend used for a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverBackend {
    /// Pure-Rust simplex with branch-and-bound (LP and MILP)
    #[default]
    Microlp,
    /// Pure-Rust interior point (LP only)
    Clarabel,
    /// HiGHS (LP and MILP), requires the `solver-highs` feature
    Highs,
}

impl SolverBackend {
    pub fn name(&self) -> &'static str {
        match self {
            SolverBackend::Microlp => "microlp",
            SolverBackend::Clarabel => "clarabel",
            SolverBackend::Highs => "highs",
        }
    }

    /// Whether the backend accepts integer and binary variables.
    pub fn supports_integers(&self) -> bool {
        !matches!(self, SolverBackend::Clarabel)
    }
}

impl std::fmt::Display for SolverBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Solver selection and budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Backend for control and attack models
    pub backend: SolverBackend,
    /// Backend for the deviation system (pure LP)
    pub deviation_backend: SolverBackend,
    /// Wall-clock budget per solve
    pub time_limit_seconds: f64,
    /// Distance from an integer below which a solved count is accepted
    pub integrality_tolerance: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            backend: SolverBackend::Microlp,
            deviation_backend: SolverBackend::Microlp,
            time_limit_seconds: 60.0,
            integrality_tolerance: 1e-6,
        }
    }
}

impl SolverSettings {
    pub fn validate(&self) -> ShatterResult<()> {
        if !self.time_limit_seconds.is_finite() || self.time_limit_seconds <= 0.0 {
            return Err(ShatterError::Config(format!(
                "time_limit_seconds must be positive, got {}",
                self.time_limit_seconds
            )));
        }
        if !(self.integrality_tolerance > 0.0 && self.integrality_tolerance < 0.5) {
            return Err(ShatterError::Config(format!(
                "integrality_tolerance must be in (0, 0.5), got {}",
                self.integrality_tolerance
            )));
        }
        if !self.backend.supports_integers() {
            return Err(ShatterError::Config(format!(
                "backend {} cannot solve integer models",
                self.backend
            )));
        }
        Ok(())
    }

    pub fn time_limit(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.time_limit_seconds)
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub environment: Environment,
    pub solver: SolverSettings,
}

impl AnalysisConfig {
    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> ShatterResult<Self> {
        let config: AnalysisConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> ShatterResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> ShatterResult<()> {
        self.environment.validate()?;
        self.solver.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_plant_constants() {
        let env = Environment::default();
        assert_eq!(env.outdoor_co2, Ppm(400.0));
        assert_eq!(env.outdoor_temperature, Fahrenheit(91.4));
        assert_eq!(env.min_supply_temperature, Fahrenheit(55.4));
        assert_eq!(env.energy_price_per_kwh, 0.1137);
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            [environment]
            energy_price_per_kwh = 0.2

            [solver]
            deviation_backend = "clarabel"
            "#,
        )
        .expect("valid config");
        assert_eq!(config.environment.energy_price_per_kwh, 0.2);
        assert_eq!(config.environment.outdoor_co2, Ppm(400.0));
        assert_eq!(config.solver.backend, SolverBackend::Microlp);
        assert_eq!(config.solver.deviation_backend, SolverBackend::Clarabel);
        assert_eq!(config.solver.time_limit_seconds, 60.0);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let err = AnalysisConfig::from_toml_str("[environment]\nenergy_price_per_kwh = -1.0\n")
            .unwrap_err();
        assert!(matches!(err, ShatterError::Config(_)));

        let err = AnalysisConfig::from_toml_str("[solver]\ntime_limit_seconds = 0.0\n").unwrap_err();
        assert!(matches!(err, ShatterError::Config(_)));

        let err = AnalysisConfig::from_toml_str("[solver]\nbackend = \"clarabel\"\n").unwrap_err();
        assert!(err.to_string().contains("cannot solve integer models"));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = AnalysisConfig::from_toml_str("[solver\nbackend = 3").unwrap_err();
        assert!(matches!(err, ShatterError::Parse(_)));

        let err = AnalysisConfig::from_toml_str("[solver]\nbackend = \"gurobi\"\n").unwrap_err();
        assert!(matches!(err, ShatterError::Parse(_)));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[environment]\noutdoor_temperature = 95.0").unwrap();
        let config = AnalysisConfig::from_path(file.path()).unwrap();
        assert_eq!(config.environment.outdoor_temperature, Fahrenheit(95.0));

        let missing = AnalysisConfig::from_path("/nonexistent/shatter.toml").unwrap_err();
        assert!(matches!(missing, ShatterError::Io(_)));
    }
}
