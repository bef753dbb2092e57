use super::check::render_verdict;
use crate::cli::RunArgs;
use crate::config::builder::{build_config, load_file_config};
use crate::config::models::AppConfig;
use crate::error::Result;
use crate::providers::openai::OpenAiProposer;
use crate::simulator::process::ProcessBackend;
use crate::utils::progress::CliProgressHandler;
use procdesign::core::io::documents::{MaterialsDocument, SpecificationsDocument};
use procdesign::core::io::traits::InputDocument;
use procdesign::engine::progress::ProgressReporter;
use procdesign::workflows::artifacts::write_artifacts;
use procdesign::workflows::design_loop::{self, Collaborators, LoopOutcome, LoopStatus};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const EXIT_SATISFIED: u8 = 0;
pub const EXIT_EXHAUSTED: u8 = 2;
pub const EXIT_FATAL: u8 = 3;
pub const EXIT_CANCELLED: u8 = 130;

pub fn exit_code(status: LoopStatus) -> u8 {
    match status {
        LoopStatus::Satisfied => EXIT_SATISFIED,
        LoopStatus::Exhausted => EXIT_EXHAUSTED,
        LoopStatus::Fatal => EXIT_FATAL,
        LoopStatus::Cancelled => EXIT_CANCELLED,
    }
}

pub async fn run(args: RunArgs) -> Result<u8> {
    let file_config = load_file_config(args.config.as_deref())?;
    let config = build_config(&args, file_config, |key| std::env::var(key).ok())?;
    debug!("Resolved configuration: {:?}", config);

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; stopping after the current iteration.");
                eprintln!("\nInterrupted. Finishing the current iteration, press Ctrl-C again to abort.");
                cancel.cancel();
                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(i32::from(EXIT_CANCELLED));
                }
            }
        })
    };

    let outcome = execute(&config, &cancel).await;
    watcher.abort();
    let outcome = outcome?;

    print_outcome(&config, &outcome);
    Ok(exit_code(outcome.status))
}

/// Runs the loop with the resolved configuration and writes the history artifact.
async fn execute(config: &AppConfig, cancel: &CancellationToken) -> Result<LoopOutcome> {
    info!("Loading raw materials from {:?}", &config.materials_path);
    let materials = MaterialsDocument::read_from_path(&config.materials_path)?.materials;
    info!("Loading specifications from {:?}", &config.specifications_path);
    let specifications =
        SpecificationsDocument::read_from_path(&config.specifications_path)?.specifications;

    let proposer = OpenAiProposer::new(config.proposer.clone())?;
    let backend = ProcessBackend::new(config.simulator.clone());

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Designing a process for {} product(s) from {} raw material(s)...",
        specifications.len(),
        materials.len()
    );
    let outcome = design_loop::run(
        &materials,
        &specifications,
        &config.loop_config,
        Collaborators {
            proposer: &proposer,
            backend: &backend,
        },
        &reporter,
        cancel,
    )
    .await?;

    let written = write_artifacts(&config.output_dir, &outcome)?;
    info!(
        "Wrote {} artifact file(s) to {:?}",
        written.len(),
        &config.output_dir
    );
    Ok(outcome)
}

fn print_outcome(config: &AppConfig, outcome: &LoopOutcome) {
    let iterations = outcome.history.len();
    match outcome.status {
        LoopStatus::Satisfied => println!(
            "✓ Specifications met after {} iteration(s).",
            iterations
        ),
        LoopStatus::Exhausted => println!(
            "✗ No design met the specifications within {} iteration(s).",
            iterations
        ),
        LoopStatus::Fatal => println!(
            "✗ Stopped after {} iteration(s): {}",
            iterations,
            outcome.fatal_reason.as_deref().unwrap_or("collaborator unavailable")
        ),
        LoopStatus::Cancelled => println!("Cancelled after {} iteration(s).", iterations),
    }

    if let Some(record) = outcome.history.best_record() {
        if let Some(design) = &record.design {
            println!("Best design (iteration {}): {}", record.iteration, design.summary());
        }
        print!("{}", render_verdict(&record.verdict));
    }
    println!("History written to: {}", config.output_dir.display());
}
