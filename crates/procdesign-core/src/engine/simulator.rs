use crate::core::models::design::ProcessDesign;
use crate::core::models::material::RawMaterial;
use crate::core::models::simulation::SimulationResult;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    /// The simulator refused the design (unknown block type, bad parameter, ...).
    #[error("Simulator rejected the design: {message}")]
    Submission {
        message: String,
        diagnostics: Vec<String>,
    },

    #[error("Simulation did not converge: {message}")]
    Convergence {
        message: String,
        diagnostics: Vec<String>,
    },

    /// The simulation application is unreachable. Fatal.
    #[error("Lost connection to the simulator: {0}")]
    Connection(String),
}

impl SimulationError {
    /// The message followed by any solver diagnostics.
    pub fn diagnostics(&self) -> Vec<String> {
        match self {
            SimulationError::Submission {
                message,
                diagnostics,
            }
            | SimulationError::Convergence {
                message,
                diagnostics,
            } => std::iter::once(message.clone())
                .chain(diagnostics.iter().cloned())
                .collect(),
            SimulationError::Connection(message) => vec![message.clone()],
        }
    }
}

/// Entry point to a simulation application.
#[async_trait]
pub trait SimulationBackend: Send + Sync {
    /// Opens a session. Each run holds exactly one.
    async fn connect(&self) -> Result<Box<dyn SimulationSession>, SimulationError>;
}

/// An open connection to the simulation application.
///
/// Submissions take `&mut self`, so a session serves one design at a time.
#[async_trait]
pub trait SimulationSession: Send {
    async fn submit(
        &mut self,
        design: &ProcessDesign,
        materials: &[RawMaterial],
    ) -> Result<SimulationResult, SimulationError>;

    /// Closes the session and frees the application.
    async fn release(self: Box<Self>) -> Result<(), SimulationError>;
}
