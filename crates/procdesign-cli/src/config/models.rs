use procdesign::engine::config::LoopConfig;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, PartialEq)]
pub struct ProposerSettings {
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub temperature: f64,
    pub timeout: Duration,
}

impl fmt::Debug for ProposerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProposerSettings")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorSettings {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub template: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub materials_path: PathBuf,
    pub specifications_path: PathBuf,
    pub output_dir: PathBuf,
    pub loop_config: LoopConfig,
    pub proposer: ProposerSettings,
    pub simulator: SimulatorSettings,
}
