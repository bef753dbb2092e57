use super::feedback::Feedback;
use super::history::DesignHistory;
use crate::core::models::design::ProcessDesign;
use crate::core::models::material::RawMaterial;
use crate::core::models::specification::ProductSpecification;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProposalError {
    /// The proposer answered, but not with a usable design. Retried.
    #[error("Malformed proposal: {0}")]
    Malformed(String),

    /// The proposer did not answer within the proposal timeout. Retried.
    #[error("Proposal timed out: {0}")]
    TimedOut(String),

    /// The proposer cannot be reached. Fatal.
    #[error("Proposer unavailable: {0}")]
    Unavailable(String),
}

/// Everything a proposer may use to produce the next design.
#[derive(Debug, Clone, Copy)]
pub struct ProposalRequest<'a> {
    /// One-based number of the iteration being proposed for.
    pub iteration: usize,
    pub materials: &'a [RawMaterial],
    pub specifications: &'a [ProductSpecification],
    /// Absent on the first attempt.
    pub feedback: Option<&'a Feedback>,
    pub history: &'a DesignHistory,
}

/// Source of process designs, typically a language model.
#[async_trait]
pub trait DesignProposer: Send + Sync {
    async fn propose(&self, request: ProposalRequest<'_>) -> Result<ProcessDesign, ProposalError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "proposer"
    }
}
