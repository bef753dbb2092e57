use crate::core::models::design::ProcessDesign;
use crate::core::models::graph::ProcessGraph;
use crate::core::models::material::{RawMaterial, validate_materials};
use crate::core::models::simulation::SimulationResult;
use crate::core::models::specification::{ProductSpecification, validate_specifications};
use crate::engine::analyzer::analyze;
use crate::engine::config::LoopConfig;
use crate::engine::error::EngineError;
use crate::engine::feedback::Feedback;
use crate::engine::history::DesignHistory;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::proposer::{DesignProposer, ProposalError, ProposalRequest};
use crate::engine::simulator::{SimulationBackend, SimulationError, SimulationSession};
use crate::engine::verdict::Verdict;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopStatus {
    /// A design met every specification.
    Satisfied,
    /// The iteration budget ran out.
    Exhausted,
    /// A collaborator became unreachable.
    Fatal,
    /// The caller cancelled between iterations.
    Cancelled,
}

impl LoopStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopStatus::Satisfied => "satisfied",
            LoopStatus::Exhausted => "exhausted",
            LoopStatus::Fatal => "fatal",
            LoopStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for LoopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopOutcome {
    pub status: LoopStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal_reason: Option<String>,
    pub history: DesignHistory,
}

impl LoopOutcome {
    fn new(status: LoopStatus, history: DesignHistory) -> Self {
        Self {
            status,
            fatal_reason: None,
            history,
        }
    }

    fn fatal(history: DesignHistory, reason: String) -> Self {
        Self {
            status: LoopStatus::Fatal,
            fatal_reason: Some(reason),
            history,
        }
    }

    /// The design that met every specification, if the run was satisfied.
    pub fn accepted_design(&self) -> Option<&ProcessDesign> {
        self.history.accepted().and_then(|r| r.design.as_ref())
    }
}

/// The two external collaborators a run talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub proposer: &'a dyn DesignProposer,
    pub backend: &'a dyn SimulationBackend,
}

/// How one iteration ended, from the loop's point of view.
enum Step {
    Continue,
    Accepted,
    Fatal(String),
}

/// Runs the propose, validate, simulate, analyze loop.
///
/// Returns `Err` only for invalid input. Collaborator failures end the loop with
/// [`LoopStatus::Fatal`] and keep the partial history.
#[instrument(skip_all, name = "design_loop")]
pub async fn run(
    materials: &[RawMaterial],
    specifications: &[ProductSpecification],
    config: &LoopConfig,
    collaborators: Collaborators<'_>,
    reporter: &ProgressReporter<'_>,
    cancel: &CancellationToken,
) -> Result<LoopOutcome, EngineError> {
    validate_materials(materials)?;
    validate_specifications(specifications)?;

    reporter.report(Progress::PhaseStart {
        name: "Connecting to simulator",
    });
    let connected = timeout(config.simulation_timeout, collaborators.backend.connect()).await;
    reporter.report(Progress::PhaseFinish);
    let mut session = match connected {
        Ok(Ok(session)) => session,
        Ok(Err(e)) => {
            warn!("Could not open a simulation session: {}", e);
            return Ok(LoopOutcome::fatal(DesignHistory::new(), e.to_string()));
        }
        Err(_) => {
            let reason = format!(
                "Timed out after {}s opening a simulation session",
                config.simulation_timeout.as_secs_f64()
            );
            warn!("{}", reason);
            return Ok(LoopOutcome::fatal(DesignHistory::new(), reason));
        }
    };

    info!(
        materials = materials.len(),
        products = specifications.len(),
        max_iterations = config.max_iterations,
        "Starting design loop."
    );
    reporter.report(Progress::LoopStart {
        max_iterations: config.max_iterations,
    });

    let mut context = LoopContext {
        materials,
        specifications,
        config,
        proposer: collaborators.proposer,
        reporter,
        history: DesignHistory::new(),
        feedback: None,
    };
    let outcome = context.iterate(session.as_mut(), cancel).await;

    match timeout(config.simulation_timeout, session.release()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Failed to release the simulation session cleanly: {}", e),
        Err(_) => warn!(
            "Simulation session did not release within {}s; abandoning it.",
            config.simulation_timeout.as_secs_f64()
        ),
    }
    reporter.report(Progress::LoopFinish);

    let history = context.history;
    let outcome = match outcome {
        Ok(status) => LoopOutcome::new(status, history),
        Err(reason) => LoopOutcome::fatal(history, reason),
    };
    info!(
        status = %outcome.status,
        iterations = outcome.history.len(),
        "Design loop finished."
    );
    Ok(outcome)
}

struct LoopContext<'a> {
    materials: &'a [RawMaterial],
    specifications: &'a [ProductSpecification],
    config: &'a LoopConfig,
    proposer: &'a dyn DesignProposer,
    reporter: &'a ProgressReporter<'a>,
    history: DesignHistory,
    feedback: Option<Feedback>,
}

impl LoopContext<'_> {
    /// Returns the final status, or the fatal reason.
    async fn iterate(
        &mut self,
        session: &mut dyn SimulationSession,
        cancel: &CancellationToken,
    ) -> Result<LoopStatus, String> {
        while self.history.len() < self.config.max_iterations {
            if cancel.is_cancelled() {
                info!("Cancellation requested; stopping before the next iteration.");
                return Ok(LoopStatus::Cancelled);
            }

            let iteration = self.history.len() + 1;
            self.reporter.report(Progress::IterationStart { iteration });
            let step = self.step(iteration, session).await;
            if let Some(record) = self.history.last() {
                self.reporter.report(Progress::IterationFinish {
                    iteration,
                    outcome: record.verdict.outcome,
                });
            }

            match step {
                Step::Accepted => {
                    info!(iteration, "Design accepted.");
                    return Ok(LoopStatus::Satisfied);
                }
                Step::Fatal(reason) => return Err(reason),
                Step::Continue => {}
            }
        }
        info!(
            "Iteration budget of {} exhausted without meeting the specifications.",
            self.config.max_iterations
        );
        Ok(LoopStatus::Exhausted)
    }

    async fn step(&mut self, iteration: usize, session: &mut dyn SimulationSession) -> Step {
        let design = match self.propose(iteration).await {
            Ok(design) => design,
            Err(ProposalError::Malformed(message) | ProposalError::TimedOut(message)) => {
                warn!(iteration, "Proposal could not be used: {}", message);
                self.history.append(
                    None,
                    SimulationResult::not_run("no design was proposed"),
                    Verdict::proposal_failure(message),
                );
                // The next attempt gets the same feedback this one did.
                return Step::Continue;
            }
            Err(ProposalError::Unavailable(message)) => {
                warn!(iteration, "Proposer unavailable: {}", message);
                self.history.append(
                    None,
                    SimulationResult::not_run("proposer unavailable"),
                    Verdict::aborted(message.clone()),
                );
                return Step::Fatal(message);
            }
        };
        debug!(iteration, design = %design.summary(), "Received design.");

        if let Err(e) = ProcessGraph::build(&design) {
            info!(iteration, "Design failed structural validation: {}", e);
            self.record(
                design,
                SimulationResult::not_run("design failed structural validation"),
                Verdict::structural_failure(vec![e.to_string()]),
            );
            return Step::Continue;
        }

        self.reporter.report(Progress::PhaseStart { name: "Simulating" });
        let submitted = timeout(
            self.config.simulation_timeout,
            session.submit(&design, self.materials),
        )
        .await;
        self.reporter.report(Progress::PhaseFinish);

        let (simulation, verdict) = match submitted {
            Ok(Ok(result)) => {
                let verdict = analyze(&result, self.specifications, &self.config.analysis);
                (result, verdict)
            }
            Ok(Err(e @ SimulationError::Submission { .. })) => {
                info!(iteration, "Simulator rejected the design: {}", e);
                let diagnostics = e.diagnostics();
                (
                    SimulationResult::failed(diagnostics.clone()),
                    Verdict::structural_failure(diagnostics),
                )
            }
            Ok(Err(e @ SimulationError::Convergence { .. })) => {
                info!(iteration, "Simulation did not converge: {}", e);
                let diagnostics = e.diagnostics();
                (
                    SimulationResult::not_converged(diagnostics.clone()),
                    Verdict::not_converged(self.specifications, diagnostics),
                )
            }
            Ok(Err(e @ SimulationError::Connection(_))) => {
                let reason = e.to_string();
                warn!(iteration, "{}", reason);
                self.history.append(
                    Some(design),
                    SimulationResult::failed(e.diagnostics()),
                    Verdict::aborted(reason.clone()),
                );
                return Step::Fatal(reason);
            }
            Err(_) => {
                let reason = format!(
                    "Simulation timed out after {}s",
                    self.config.simulation_timeout.as_secs_f64()
                );
                warn!(iteration, "{}", reason);
                self.history.append(
                    Some(design),
                    SimulationResult::failed(vec![reason.clone()]),
                    Verdict::aborted(reason.clone()),
                );
                return Step::Fatal(reason);
            }
        };

        info!(iteration, verdict = %verdict.summary(), "Iteration analyzed.");
        let accepted = verdict.accepted;
        self.record(design, simulation, verdict);
        if accepted { Step::Accepted } else { Step::Continue }
    }

    async fn propose(&self, iteration: usize) -> Result<ProcessDesign, ProposalError> {
        self.reporter.report(Progress::PhaseStart {
            name: "Requesting design",
        });
        let request = ProposalRequest {
            iteration,
            materials: self.materials,
            specifications: self.specifications,
            feedback: self.feedback.as_ref(),
            history: &self.history,
        };
        let proposed = timeout(self.config.proposal_timeout, self.proposer.propose(request)).await;
        self.reporter.report(Progress::PhaseFinish);
        proposed.unwrap_or_else(|_| {
            Err(ProposalError::TimedOut(format!(
                "{} did not answer within {}s",
                self.proposer.name(),
                self.config.proposal_timeout.as_secs_f64()
            )))
        })
    }

    /// Appends a record for a design that was proposed, and derives the next feedback from it.
    fn record(&mut self, design: ProcessDesign, simulation: SimulationResult, verdict: Verdict) {
        let record = self.history.append(Some(design), simulation, verdict);
        self.feedback = Some(Feedback::from_record(record));
    }
}
