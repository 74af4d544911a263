//! Error type for control and attack solves.

use shatter_core::{ShatterError, SolverBackend};
use std::time::Duration;
use thiserror::Error;

/// Which model a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolveStage {
    /// Fixed-occupancy control model (zone or activity indexed)
    Control,
    /// Free-occupancy cost maximization
    Attack,
    /// Temperature/CO2 deviation system
    Deviation,
}

impl std::fmt::Display for SolveStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveStage::Control => write!(f, "control"),
            SolveStage::Attack => write!(f, "attack"),
            SolveStage::Deviation => write!(f, "deviation"),
        }
    }
}

/// Control and attack solver errors
#[derive(Debug, Clone, Error)]
pub enum ControlError {
    /// Malformed zone data, rejected before any constraint is built
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The constraint system has no solution
    #[error("{stage} model infeasible: {reason}")]
    Infeasible { stage: SolveStage, reason: String },

    /// The objective can grow without bound
    #[error("{stage} model unbounded")]
    Unbounded { stage: SolveStage },

    /// The solve exceeded its wall-clock budget; no result is reported
    #[error("{stage} solve exceeded its {budget:?} budget (took {elapsed:?})")]
    Timeout {
        stage: SolveStage,
        elapsed: Duration,
        budget: Duration,
    },

    /// Backend not compiled in, or unable to handle the model
    #[error("solver backend {backend} unavailable: {reason}")]
    UnsupportedBackend {
        backend: SolverBackend,
        reason: String,
    },

    /// Solver returned something other than a definite answer
    #[error("{stage} solver failed: {message}")]
    Solver { stage: SolveStage, message: String },
}

impl ControlError {
    pub(crate) fn infeasible(stage: SolveStage, reason: impl Into<String>) -> Self {
        ControlError::Infeasible {
            stage,
            reason: reason.into(),
        }
    }

    /// True for the "no solution exists" outcome.
    pub fn is_infeasible(&self) -> bool {
        matches!(self, ControlError::Infeasible { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ControlError::Timeout { .. })
    }
}

impl From<ShatterError> for ControlError {
    fn from(err: ShatterError) -> Self {
        match err {
            ShatterError::Validation(msg) | ShatterError::Config(msg) => {
                ControlError::InvalidInput(msg)
            }
            other => ControlError::InvalidInput(other.to_string()),
        }
    }
}

impl From<ControlError> for ShatterError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::InvalidInput(msg) => ShatterError::Validation(msg),
            other => ShatterError::Solver(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_stage() {
        let err = ControlError::infeasible(SolveStage::Attack, "no zone can host occupants");
        assert_eq!(
            err.to_string(),
            "attack model infeasible: no zone can host occupants"
        );
        assert!(err.is_infeasible());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_validation_maps_to_invalid_input() {
        let err: ControlError = ShatterError::Validation("volume must be positive".into()).into();
        assert!(matches!(err, ControlError::InvalidInput(_)));
    }

    #[test]
    fn test_roundtrip_into_unified_error() {
        let err: ShatterError = ControlError::Unbounded {
            stage: SolveStage::Control,
        }
        .into();
        assert!(matches!(err, ShatterError::Solver(_)));
        assert!(err.to_string().contains("unbounded"));
    }
}
