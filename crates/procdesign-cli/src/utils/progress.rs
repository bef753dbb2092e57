use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use procdesign::engine::progress::{Progress, ProgressCallback};
use procdesign::engine::verdict::VerdictOutcome;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0)
            .with_style(Self::spinner_style())
            .with_message("Initializing...");
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.disable_steady_tick();
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb_clone = self.pb.clone();

        Box::new(move |progress: Progress| {
            let Ok(mut pb_guard) = pb_clone.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::LoopStart { max_iterations } => {
                    pb_guard.disable_steady_tick();
                    pb_guard.reset();
                    pb_guard.set_length(max_iterations as u64);
                    pb_guard.set_position(0);
                    pb_guard.set_style(Self::bar_style());
                    pb_guard.set_message("Design loop");
                }
                Progress::IterationStart { iteration } => {
                    pb_guard.set_message(format!("Iteration {}", iteration));
                }
                Progress::IterationFinish { iteration, outcome } => {
                    pb_guard.println(format!(
                        "  {} Iteration {}: {}",
                        outcome_marker(outcome),
                        iteration,
                        outcome
                    ));
                    pb_guard.set_position(iteration as u64);
                }
                Progress::LoopFinish => {
                    pb_guard.disable_steady_tick();
                    pb_guard.finish_and_clear();
                }
                Progress::PhaseStart { name } => {
                    // Outside a loop, a phase gets its own spinner.
                    if pb_guard.is_finished() || pb_guard.length() == Some(0) {
                        pb_guard.reset();
                        pb_guard.set_length(0);
                        pb_guard.set_style(Self::spinner_style());
                        pb_guard.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    }
                    pb_guard.set_message(name.to_string());
                }
                Progress::PhaseFinish => {
                    // Phases inside an iteration keep the iteration bar running.
                    if pb_guard.length() == Some(0) {
                        pb_guard.disable_steady_tick();
                        pb_guard.finish_with_message("✓ Done");
                    }
                }
                Progress::Message(msg) => {
                    if !pb_guard.is_finished() {
                        pb_guard.println(format!("  {}", msg));
                    } else {
                        pb_guard.set_message(msg);
                    }
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<20} [{bar:40.cyan/blue}] {pos}/{len} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .with_key(
                "elapsed",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.1}s", state.elapsed().as_secs_f64());
                },
            )
            .progress_chars("##-")
    }
}

fn outcome_marker(outcome: VerdictOutcome) -> &'static str {
    match outcome {
        VerdictOutcome::Accepted => "✓",
        _ => "✗",
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}
