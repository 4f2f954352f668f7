// src/infra/credentials.rs — Credential file loading
//
// Line 1: JSON pair `["username", "password"]` for WorldQuant Brain.
// Remaining lines: `KEY=value` pairs; `OPENROUTER_API_KEY` is required.

use std::fmt;
use std::path::Path;

use crate::infra::errors::OptimizerError;

pub const OPENROUTER_KEY_NAME: &str = "OPENROUTER_API_KEY";

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub openrouter_api_key: String,
}

// Secrets stay out of logs and panics.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("openrouter_api_key", &"***")
            .finish()
    }
}

impl Credentials {
    pub fn load(path: &Path) -> Result<Self, OptimizerError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            OptimizerError::Credentials(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, OptimizerError> {
        let mut lines = content.lines();
        let first = lines
            .next()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or_else(|| OptimizerError::Credentials("credential file is empty".into()))?;

        let pair: Vec<String> = serde_json::from_str(first).map_err(|e| {
            OptimizerError::Credentials(format!(
                "line 1 must be a JSON array [username, password]: {e}"
            ))
        })?;
        let [username, password]: [String; 2] = pair.try_into().map_err(|v: Vec<String>| {
            OptimizerError::Credentials(format!(
                "line 1 must hold exactly two entries, found {}",
                v.len()
            ))
        })?;

        let openrouter_api_key = lines
            .filter_map(|line| line.trim().split_once('='))
            .find(|(key, _)| key.trim() == OPENROUTER_KEY_NAME)
            .map(|(_, value)| value.trim().trim_matches('"').to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                OptimizerError::Credentials(format!("{OPENROUTER_KEY_NAME} not found"))
            })?;

        Ok(Self {
            username,
            password,
            openrouter_api_key,
        })
    }
}
