use super::history::IterationRecord;
use super::verdict::VerdictOutcome;
use serde::{Deserialize, Serialize};

/// Corrective information passed to the proposer on the next attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// The iteration this feedback was derived from.
    pub iteration: usize,
    pub outcome: VerdictOutcome,
    pub gaps: Vec<String>,
    pub diagnostics: Vec<String>,
}

impl Feedback {
    pub fn from_record(record: &IterationRecord) -> Self {
        Self {
            iteration: record.iteration,
            outcome: record.verdict.outcome,
            gaps: record.verdict.gaps().map(|c| c.describe()).collect(),
            diagnostics: record.verdict.diagnostics.clone(),
        }
    }

    /// Plain-text rendering suitable for a prompt.
    pub fn render(&self) -> String {
        let headline = match self.outcome {
            VerdictOutcome::Accepted => "The design met every specification.",
            VerdictOutcome::Rejected => {
                "The design simulated successfully but missed these specifications:"
            }
            VerdictOutcome::NotConverged => {
                "The simulation did not converge. Revise the design so the solver can converge:"
            }
            VerdictOutcome::StructuralFailure => {
                "The design is not a valid flowsheet. Fix these structural problems:"
            }
            VerdictOutcome::ProposalFailure => {
                "The previous reply could not be read as a design. Reply with a single JSON object:"
            }
            VerdictOutcome::Aborted => "The previous attempt was aborted:",
        };
        let mut lines = vec![format!("Iteration {}: {}", self.iteration, headline)];
        lines.extend(self.gaps.iter().map(|g| format!("- {}", g)));
        lines.extend(self.diagnostics.iter().map(|d| format!("- {}", d)));
        lines.join("\n")
    }
}
