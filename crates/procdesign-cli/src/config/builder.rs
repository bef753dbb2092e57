use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::{AppConfig, ProposerSettings, SimulatorSettings};
use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use directories::ProjectDirs;
use procdesign::engine::config::LoopConfigBuilder;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const CONFIG_FILE_NAME: &str = "config.toml";

const ENV_MODEL: &str = "OPENAI_MODEL";
const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
const ENV_SIMULATOR: &str = "PROCDESIGN_SIMULATOR";
const ENV_TEMPLATE: &str = "SIMULATION_TEMPLATE_PATH";
const ENV_MAX_ITERATIONS: &str = "MAX_ITERATIONS";
const ENV_TEMPERATURE: &str = "TEMPERATURE";

/// Location of the per-user config file, whether or not it exists.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "procdesign").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Loads `--config` if given, else the per-user config file if it exists, else nothing.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return FileConfig::from_file(path);
    }
    match default_config_path() {
        Some(path) if path.is_file() => FileConfig::from_file(&path),
        _ => {
            debug!("No configuration file found; using flags, environment and defaults.");
            Ok(FileConfig::default())
        }
    }
}

/// Values read from the environment. Each one sits below the config file in precedence.
#[derive(Debug, Default)]
struct EnvConfig {
    model: Option<String>,
    base_url: Option<String>,
    simulator: Option<PathBuf>,
    template: Option<PathBuf>,
    max_iterations: Option<usize>,
    temperature: Option<f64>,
}

impl EnvConfig {
    fn from_lookup(env: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        Ok(Self {
            model: get(ENV_MODEL),
            base_url: get(ENV_BASE_URL),
            simulator: get(ENV_SIMULATOR).map(PathBuf::from),
            template: get(ENV_TEMPLATE).map(PathBuf::from),
            max_iterations: get(ENV_MAX_ITERATIONS)
                .map(|v| parse_value(ENV_MAX_ITERATIONS, v.trim()))
                .transpose()?,
            temperature: get(ENV_TEMPERATURE)
                .map(|v| parse_value(ENV_TEMPERATURE, v.trim()))
                .transpose()?,
        })
    }
}

/// Resolves the final configuration for `run`.
///
/// `env` looks up environment variables; callers pass `|k| std::env::var(k).ok()`.
pub fn build_config(
    args: &RunArgs,
    file_config: FileConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = apply_set_values(file_config, &args.set_values)?;
    let env_config = EnvConfig::from_lookup(&env)?;

    let loop_file = file_config.loop_.unwrap_or_default();
    let proposer_file = file_config.proposer.unwrap_or_default();
    let simulator_file = file_config.simulator.unwrap_or_default();

    let max_iterations = args
        .max_iterations
        .or(loop_file.max_iterations)
        .or(env_config.max_iterations)
        .unwrap_or(defaults.max_iterations);
    let tolerance = args
        .tolerance
        .or(loop_file.tolerance)
        .unwrap_or(defaults.tolerance);
    let strict_block_status = loop_file
        .strict_block_status
        .unwrap_or(defaults.strict_block_status);
    let proposal_timeout = Duration::from_secs(
        args.proposal_timeout
            .or(proposer_file.timeout_secs)
            .unwrap_or(defaults.proposal_timeout_secs),
    );
    let simulation_timeout = Duration::from_secs(
        args.simulation_timeout
            .or(simulator_file.timeout_secs)
            .unwrap_or(defaults.simulation_timeout_secs),
    );

    let loop_config = LoopConfigBuilder::new()
        .max_iterations(max_iterations)
        .tolerance(tolerance)
        .strict_block_status(strict_block_status)
        .proposal_timeout(proposal_timeout)
        .simulation_timeout(simulation_timeout)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let temperature = proposer_file
        .temperature
        .or(env_config.temperature)
        .unwrap_or(defaults.temperature);
    if !(0.0..=2.0).contains(&temperature) {
        return Err(CliError::Config(format!(
            "Sampling temperature must be between 0 and 2 (got {})",
            temperature
        )));
    }

    let api_key_env = proposer_file
        .api_key_env
        .unwrap_or(defaults.api_key_env);
    let api_key = env(&api_key_env)
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            CliError::Config(format!(
                "No API key found; set the {} environment variable",
                api_key_env
            ))
        })?;

    let proposer = ProposerSettings {
        model: args
            .model
            .clone()
            .or(proposer_file.model)
            .or(env_config.model)
            .unwrap_or(defaults.model),
        base_url: proposer_file
            .base_url
            .or(env_config.base_url)
            .unwrap_or(defaults.base_url)
            .trim_end_matches('/')
            .to_string(),
        api_key,
        temperature,
        timeout: proposal_timeout,
    };

    let executable = args
        .simulator
        .clone()
        .or(simulator_file.executable)
        .or(env_config.simulator)
        .ok_or_else(|| {
            CliError::Config(format!(
                "No simulation adapter configured; pass --simulator, set simulator.executable, or set {}",
                ENV_SIMULATOR
            ))
        })?;
    let simulator = SimulatorSettings {
        executable,
        args: simulator_file.args.unwrap_or_default(),
        template: simulator_file.template.or(env_config.template),
    };

    Ok(AppConfig {
        materials_path: args.materials.clone(),
        specifications_path: args.specifications.clone(),
        output_dir: args.output_dir.clone(),
        loop_config,
        proposer,
        simulator,
    })
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid value for {}: '{}' ({} expected)",
            key,
            value,
            std::any::type_name::<T>()
        ))
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let key = key.trim();
        let value_str = value_str.trim();

        match key {
            "loop.max-iterations" => {
                config.loop_.get_or_insert_with(Default::default).max_iterations =
                    Some(parse_value(key, value_str)?);
            }
            "loop.tolerance" => {
                config.loop_.get_or_insert_with(Default::default).tolerance =
                    Some(parse_value(key, value_str)?);
            }
            "loop.strict-block-status" => {
                config
                    .loop_
                    .get_or_insert_with(Default::default)
                    .strict_block_status = Some(parse_value(key, value_str)?);
            }
            "proposer.model" => {
                config.proposer.get_or_insert_with(Default::default).model =
                    Some(value_str.to_string());
            }
            "proposer.base-url" => {
                config.proposer.get_or_insert_with(Default::default).base_url =
                    Some(value_str.to_string());
            }
            "proposer.api-key-env" => {
                config.proposer.get_or_insert_with(Default::default).api_key_env =
                    Some(value_str.to_string());
            }
            "proposer.temperature" => {
                config.proposer.get_or_insert_with(Default::default).temperature =
                    Some(parse_value(key, value_str)?);
            }
            "proposer.timeout-secs" => {
                config.proposer.get_or_insert_with(Default::default).timeout_secs =
                    Some(parse_value(key, value_str)?);
            }
            "simulator.executable" => {
                config.simulator.get_or_insert_with(Default::default).executable =
                    Some(PathBuf::from(value_str));
            }
            "simulator.args" => {
                config.simulator.get_or_insert_with(Default::default).args =
                    Some(value_str.split_whitespace().map(String::from).collect());
            }
            "simulator.template" => {
                config.simulator.get_or_insert_with(Default::default).template =
                    Some(PathBuf::from(value_str));
            }
            "simulator.timeout-secs" => {
                config.simulator.get_or_insert_with(Default::default).timeout_secs =
                    Some(parse_value(key, value_str)?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unknown configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
