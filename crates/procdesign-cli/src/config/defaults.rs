pub struct DefaultsConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub strict_block_status: bool,
    pub model: String,
    pub base_url: String,
    pub api_key_env: String,
    pub temperature: f64,
    pub proposal_timeout_secs: u64,
    pub simulation_timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tolerance: 1e-9,
            strict_block_status: true,
            model: "gpt-4-turbo".to_string(),
            base_url: "https://api.openai.com".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.2,
            proposal_timeout_secs: 120,
            simulation_timeout_secs: 600,
        }
    }
}
