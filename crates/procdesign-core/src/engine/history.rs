use super::verdict::{CheckStatus, Verdict};
use crate::core::models::design::ProcessDesign;
use crate::core::models::simulation::SimulationResult;
use serde::{Deserialize, Serialize};

/// Everything that happened in one loop iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// One-based.
    pub iteration: usize,
    /// Absent when the proposer failed to produce a design.
    pub design: Option<ProcessDesign>,
    pub simulation: SimulationResult,
    pub verdict: Verdict,
}

/// Append-only, ordered record of every iteration of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesignHistory {
    records: Vec<IterationRecord>,
}

impl DesignHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the next record. Iteration numbers are assigned here, so they always run 1..=n.
    pub fn append(
        &mut self,
        design: Option<ProcessDesign>,
        simulation: SimulationResult,
        verdict: Verdict,
    ) -> &IterationRecord {
        let iteration = self.records.len() + 1;
        self.records.push(IterationRecord {
            iteration,
            design,
            simulation,
            verdict,
        });
        &self.records[iteration - 1]
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&IterationRecord> {
        self.records.last()
    }

    pub fn accepted(&self) -> Option<&IterationRecord> {
        self.records.iter().find(|r| r.verdict.accepted)
    }

    /// The accepted record if any, otherwise the record with the most met checks.
    ///
    /// Ties go to the later iteration.
    pub fn best_record(&self) -> Option<&IterationRecord> {
        self.accepted().or_else(|| {
            self.records
                .iter()
                .filter(|r| r.design.is_some())
                .max_by_key(|r| r.verdict.count(CheckStatus::Met))
        })
    }
}
