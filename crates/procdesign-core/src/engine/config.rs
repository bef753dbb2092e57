use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Options for the result analyzer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisOptions {
    /// Absolute slack applied to every numeric comparison.
    pub tolerance: f64,
    /// Reject converged runs in which any unit operation reports a non-OK status.
    pub strict_block_status: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-9,
            strict_block_status: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    pub max_iterations: usize,
    pub analysis: AnalysisOptions,
    pub proposal_timeout: Duration,
    pub simulation_timeout: Duration,
}

#[derive(Default)]
pub struct LoopConfigBuilder {
    max_iterations: Option<usize>,
    tolerance: Option<f64>,
    strict_block_status: Option<bool>,
    proposal_timeout: Option<Duration>,
    simulation_timeout: Option<Duration>,
}

impl LoopConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }
    pub fn strict_block_status(mut self, strict: bool) -> Self {
        self.strict_block_status = Some(strict);
        self
    }
    pub fn proposal_timeout(mut self, timeout: Duration) -> Self {
        self.proposal_timeout = Some(timeout);
        self
    }
    pub fn simulation_timeout(mut self, timeout: Duration) -> Self {
        self.simulation_timeout = Some(timeout);
        self
    }

    /// Builds the configuration. Strict block checking defaults to on; every other value is
    /// required.
    pub fn build(self) -> Result<LoopConfig, ConfigError> {
        let max_iterations = self
            .max_iterations
            .ok_or(ConfigError::MissingParameter("max_iterations"))?;
        if max_iterations == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "max_iterations",
                reason: "must be at least 1".to_string(),
            });
        }

        let tolerance = self
            .tolerance
            .ok_or(ConfigError::MissingParameter("tolerance"))?;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "tolerance",
                reason: format!("must be a finite, non-negative number (got {})", tolerance),
            });
        }

        let proposal_timeout = self
            .proposal_timeout
            .ok_or(ConfigError::MissingParameter("proposal_timeout"))?;
        let simulation_timeout = self
            .simulation_timeout
            .ok_or(ConfigError::MissingParameter("simulation_timeout"))?;
        for (name, timeout) in [
            ("proposal_timeout", proposal_timeout),
            ("simulation_timeout", simulation_timeout),
        ] {
            if timeout.is_zero() {
                return Err(ConfigError::InvalidParameter {
                    name,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        Ok(LoopConfig {
            max_iterations,
            analysis: AnalysisOptions {
                tolerance,
                strict_block_status: self.strict_block_status.unwrap_or(true),
            },
            proposal_timeout,
            simulation_timeout,
        })
    }
}
