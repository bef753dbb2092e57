use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileLoopConfig {
    #[serde(rename = "max-iterations")]
    pub max_iterations: Option<usize>,
    pub tolerance: Option<f64>,
    #[serde(rename = "strict-block-status")]
    pub strict_block_status: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileProposerConfig {
    pub model: Option<String>,
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,
    /// Name of the environment variable that holds the API key.
    #[serde(rename = "api-key-env")]
    pub api_key_env: Option<String>,
    pub temperature: Option<f64>,
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileSimulatorConfig {
    pub executable: Option<PathBuf>,
    pub args: Option<Vec<String>>,
    pub template: Option<PathBuf>,
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: Option<u64>,
}

/// The TOML configuration file. Every key is optional.
///
/// ```toml
/// [loop]
/// max-iterations = 15
///
/// [proposer]
/// model = "gpt-4o"
///
/// [simulator]
/// executable = "C:/tools/aspen-bridge.exe"
/// template = "C:/sims/base.bkp"
/// ```
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(rename = "loop")]
    pub loop_: Option<FileLoopConfig>,
    pub proposer: Option<FileProposerConfig>,
    pub simulator: Option<FileSimulatorConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration file '{}'.", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
