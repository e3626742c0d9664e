//! Simulation error taxonomy

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised by the exposure simulation core
///
/// Configuration problems are fatal and detected before any simulation work.
/// Insufficient data is a per-run outcome; the process-window sweep records it
/// as a failing grid point instead of aborting.
#[derive(Debug, Error, Diagnostic, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid configuration: {parameter} = {value} ({reason})")]
    #[diagnostic(
        code(euvsim::configuration),
        help("Check the tool/resist section of the recipe; see `euvsim validate`")
    )]
    Configuration {
        parameter: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Insufficient data: {resolved_rows} resolvable row(s), at least 2 required")]
    #[diagnostic(
        code(euvsim::insufficient_data),
        help("The pattern has no measurable edges on this grid; check line width, pitch and pixel size")
    )]
    InsufficientData { resolved_rows: usize },

    #[error("Invalid mask: {0}")]
    #[diagnostic(code(euvsim::mask))]
    InvalidMask(String),

    #[error("Invalid sweep: {0}")]
    #[diagnostic(code(euvsim::sweep))]
    InvalidSweep(String),
}

impl SimError {
    pub(crate) fn config(parameter: &'static str, value: f64, reason: &'static str) -> Self {
        SimError::Configuration {
            parameter,
            value,
            reason,
        }
    }

    /// True for errors the sweep records per grid point rather than propagating
    pub fn is_per_run(&self) -> bool {
        matches!(self, SimError::InsufficientData { .. })
    }
}

pub type Result<T> = std::result::Result<T, SimError>;

/// Reject NaN/infinite inputs before range checks see them
pub(crate) fn require_finite(parameter: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimError::config(parameter, value, "must be a finite number"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_message_names_parameter() {
        let err = SimError::config("numerical_aperture", 1.2, "must lie in (0, 1]");
        let msg = err.to_string();
        assert!(msg.contains("numerical_aperture"));
        assert!(msg.contains("1.2"));
        assert!(!err.is_per_run());
    }

    #[test]
    fn test_insufficient_data_is_per_run() {
        assert!(SimError::InsufficientData { resolved_rows: 0 }.is_per_run());
    }

    #[test]
    fn test_require_finite() {
        assert!(require_finite("dose", 30.0).is_ok());
        assert!(require_finite("dose", f64::NAN).is_err());
        assert!(require_finite("dose", f64::INFINITY).is_err());
    }
}
