// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::infra::errors::OptimizerError;
use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub brain: BrainConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub base_url: String,
    pub primary: String,
    /// Model used for the simplified prompt when the primary returns nothing.
    pub fallback: String,
    pub max_tokens: u32,
    pub fallback_max_tokens: u32,
    pub temperature: f32,
    pub referer: String,
    pub title: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".into(),
            primary: "openai/gpt-5-chat".into(),
            fallback: "anthropic/claude-sonnet-4".into(),
            max_tokens: 2000,
            fallback_max_tokens: 1000,
            temperature: 0.7,
            referer: "https://github.com/worldquant-factor-optimizer".into(),
            title: "WorldQuant Factor Optimizer".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    pub base_url: String,
    /// Re-authenticate after this many candidate evaluations (0 disables).
    pub reauth_every: usize,
    pub request_timeout_secs: u64,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.worldquantbrain.com".into(),
            reauth_every: 3,
            request_timeout_secs: 60,
        }
    }
}

/// Evaluation settings sent with every simulation of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub instrument_type: String,
    pub region: String,
    pub universe: String,
    pub delay: u32,
    pub decay: u32,
    pub neutralization: String,
    pub truncation: f64,
    pub pasteurization: String,
    pub unit_handling: String,
    pub nan_handling: String,
    pub language: String,
    pub visualization: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            instrument_type: "EQUITY".into(),
            region: "USA".into(),
            universe: "TOP3000".into(),
            delay: 1,
            decay: 6,
            neutralization: "SUBINDUSTRY".into(),
            truncation: 0.08,
            pasteurization: "ON".into(),
            unit_handling: "VERIFY".into(),
            nan_handling: "ON".into(),
            language: "FASTEXPR".into(),
            visualization: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub credentials: String,
    pub operators: String,
    pub output_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            credentials: paths::DEFAULT_CREDENTIALS_FILE.into(),
            operators: paths::DEFAULT_OPERATORS_FILE.into(),
            output_dir: paths::DEFAULT_OUTPUT_DIR.into(),
        }
    }
}

impl Config {
    /// Load config from the default location, falling back to defaults.
    pub fn load() -> Result<Self, OptimizerError> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, OptimizerError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            OptimizerError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| OptimizerError::Config(format!("invalid {}: {e}", path.display())))
    }
}
