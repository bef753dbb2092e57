use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "procdesign - iterate on chemical process designs with a language model and a process simulator until product specifications are met.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the design loop until the specifications are met or the iteration budget runs out.
    Run(RunArgs),
    /// Check a saved simulation result against product specifications.
    Check(CheckArgs),
    /// Validate input documents (and optionally a design) without contacting any service.
    Validate(ValidateArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    // --- Inputs and outputs ---
    /// Raw materials document (.json or .toml).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub materials: PathBuf,

    /// Product specifications document (.json or .toml).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub specifications: PathBuf,

    /// Directory that receives the history artifact.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Configuration file in TOML format. Defaults to config.toml in the platform config
    /// directory, if present.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Loop overrides ---
    /// Override the maximum number of iterations.
    #[arg(long, value_name = "INT")]
    pub max_iterations: Option<usize>,

    /// Override the absolute tolerance used when comparing measured values to requirements.
    #[arg(long, value_name = "FLOAT")]
    pub tolerance: Option<f64>,

    // --- Collaborator overrides ---
    /// Override the language model name.
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,

    /// Override the simulation adapter executable.
    #[arg(long, value_name = "PATH")]
    pub simulator: Option<PathBuf>,

    /// Override the proposal timeout, in seconds.
    #[arg(long, value_name = "SECS")]
    pub proposal_timeout: Option<u64>,

    /// Override the simulation timeout, in seconds.
    #[arg(long, value_name = "SECS")]
    pub simulation_timeout: Option<u64>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S loop.max-iterations=5
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Product specifications document (.json or .toml).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub specifications: PathBuf,

    /// Simulation result JSON, e.g. iteration-003/simulation.json from a previous run.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub result: PathBuf,

    /// Absolute tolerance used when comparing measured values to requirements.
    #[arg(long, value_name = "FLOAT")]
    pub tolerance: Option<f64>,

    /// Accept converged results even when a unit operation reports a non-OK status.
    #[arg(long)]
    pub lenient_blocks: bool,

    /// Print the verdict as JSON instead of a report.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Raw materials document (.json or .toml).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub materials: PathBuf,

    /// Product specifications document (.json or .toml).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub specifications: PathBuf,

    /// Design JSON to check for structural problems.
    #[arg(short, long, value_name = "PATH")]
    pub design: Option<PathBuf>,
}
