//! On-disk history artifact of a finished run.
//!
//! Layout of the output directory:
//!
//! ```text
//! history.json              full outcome: status, fatal reason, every iteration record
//! summary.csv               one row per iteration
//! status.txt                final status word, plus the reason for fatal runs
//! iteration-001/design.json
//! iteration-001/simulation.json
//! iteration-001/verdict.json
//! ```

use super::design_loop::LoopOutcome;
use crate::engine::verdict::CheckStatus;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("File I/O error for '{path}': {source}")]
    Io { path: String, source: io::Error },

    #[error("Failed to serialize '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("Failed to write CSV '{path}': {source}")]
    Csv { path: String, source: csv::Error },
}

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    iteration: usize,
    outcome: &'a str,
    accepted: bool,
    units: usize,
    simulation_status: String,
    met: usize,
    unmet: usize,
    unknown: usize,
}

/// Directory name for one iteration's files, e.g. `iteration-007`.
pub fn iteration_dir_name(iteration: usize) -> String {
    format!("iteration-{:03}", iteration)
}

/// Writes every artifact file for `outcome` into `dir`, creating it if needed.
///
/// Returns the paths written, in order.
pub fn write_artifacts(dir: &Path, outcome: &LoopOutcome) -> Result<Vec<PathBuf>, ArtifactError> {
    create_dir(dir)?;
    let mut written = Vec::new();

    for record in outcome.history.records() {
        let iteration_dir = dir.join(iteration_dir_name(record.iteration));
        create_dir(&iteration_dir)?;
        if let Some(design) = &record.design {
            written.push(write_json(&iteration_dir.join("design.json"), design)?);
        }
        written.push(write_json(
            &iteration_dir.join("simulation.json"),
            &record.simulation,
        )?);
        written.push(write_json(&iteration_dir.join("verdict.json"), &record.verdict)?);
    }

    written.push(write_summary(&dir.join("summary.csv"), outcome)?);
    written.push(write_json(&dir.join("history.json"), outcome)?);

    let status_path = dir.join("status.txt");
    let mut status = outcome.status.to_string();
    if let Some(reason) = &outcome.fatal_reason {
        status.push('\n');
        status.push_str(reason);
    }
    status.push('\n');
    fs::write(&status_path, status).map_err(|e| io_error(&status_path, e))?;
    written.push(status_path);

    info!(
        "Wrote {} artifact file(s) to '{}'.",
        written.len(),
        dir.display()
    );
    Ok(written)
}

fn write_summary(path: &Path, outcome: &LoopOutcome) -> Result<PathBuf, ArtifactError> {
    let csv_error = |e: csv::Error| ArtifactError::Csv {
        path: path.to_string_lossy().to_string(),
        source: e,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    for record in outcome.history.records() {
        let verdict = &record.verdict;
        writer
            .serialize(SummaryRow {
                iteration: record.iteration,
                outcome: verdict.outcome.as_str(),
                accepted: verdict.accepted,
                units: record.design.as_ref().map_or(0, |d| d.units.len()),
                simulation_status: record.simulation.status.to_string(),
                met: verdict.count(CheckStatus::Met),
                unmet: verdict.count(CheckStatus::Unmet),
                unknown: verdict.count(CheckStatus::Unknown),
            })
            .map_err(csv_error)?;
    }
    writer.flush().map_err(|e| io_error(path, e))?;
    Ok(path.to_path_buf())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf, ArtifactError> {
    let content = serde_json::to_string_pretty(value).map_err(|e| ArtifactError::Json {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    fs::write(path, content).map_err(|e| io_error(path, e))?;
    Ok(path.to_path_buf())
}

fn create_dir(path: &Path) -> Result<(), ArtifactError> {
    fs::create_dir_all(path).map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, source: io::Error) -> ArtifactError {
    ArtifactError::Io {
        path: path.to_string_lossy().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::design::ProcessDesign;
    use crate::core::models::simulation::SimulationResult;
    use crate::engine::history::DesignHistory;
    use crate::engine::verdict::{Criterion, SpecCheck, Verdict};
    use crate::workflows::design_loop::LoopStatus;
    use tempfile::TempDir;

    fn fatal_outcome() -> LoopOutcome {
        let mut history = DesignHistory::new();
        history.append(
            None,
            SimulationResult::not_run("no design was proposed"),
            Verdict::proposal_failure("reply was not JSON"),
        );
        let checks = vec![
            SpecCheck::new("Ethanol", Criterion::Presence, CheckStatus::Met, "present"),
            SpecCheck::new("Ethanol", Criterion::Purity, CheckStatus::Unmet, ">= 0.95"),
        ];
        history.append(
            Some(ProcessDesign::default()),
            SimulationResult::not_run("stub"),
            Verdict::from_checks(checks, vec![], false),
        );
        history.append(
            Some(ProcessDesign::default()),
            SimulationResult::failed(vec!["pipe closed".to_string()]),
            Verdict::aborted("pipe closed"),
        );
        serde_json::from_value(serde_json::json!({
            "status": "fatal",
            "fatal_reason": "pipe closed",
            "history": history,
        }))
        .unwrap()
    }

    #[test]
    fn writes_every_file_for_a_fatal_run() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("run");
        let outcome = fatal_outcome();
        assert_eq!(outcome.status, LoopStatus::Fatal);

        let written = write_artifacts(&out, &outcome).unwrap();
        // 2 + 3 + 3 iteration files, summary, history, status.
        assert_eq!(written.len(), 11);
        assert!(!out.join("iteration-001/design.json").exists());
        assert!(out.join("iteration-002/design.json").exists());
        assert!(out.join("iteration-003/verdict.json").exists());

        let status = fs::read_to_string(out.join("status.txt")).unwrap();
        assert_eq!(status, "fatal\npipe closed\n");

        let history: LoopOutcome =
            serde_json::from_str(&fs::read_to_string(out.join("history.json")).unwrap()).unwrap();
        assert_eq!(history, outcome);
    }

    #[test]
    fn summary_has_one_row_per_iteration() {
        let dir = TempDir::new().unwrap();
        write_artifacts(dir.path(), &fatal_outcome()).unwrap();

        let mut reader = csv::Reader::from_path(dir.path().join("summary.csv")).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec![
                "iteration",
                "outcome",
                "accepted",
                "units",
                "simulation_status",
                "met",
                "unmet",
                "unknown"
            ]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][1], "proposal-failure");
        assert_eq!(&rows[1][5], "1");
        assert_eq!(&rows[1][6], "1");
        assert_eq!(&rows[2][4], "failed");
    }

    #[test]
    fn iteration_directories_are_zero_padded() {
        assert_eq!(iteration_dir_name(7), "iteration-007");
        assert_eq!(iteration_dir_name(1234), "iteration-1234");
    }
}
