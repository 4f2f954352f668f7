// src/infra/errors.rs — Error types for the factor optimizer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptimizerError {
    // Startup errors (fatal)
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credentials error: {0}")]
    Credentials(String),

    // Model provider errors (recovered by the suggestion fallback chain)
    #[error("Provider '{provider}' error: {message}")]
    Provider { provider: String, message: String },

    // Evaluation service errors (captured per job)
    #[error("Sign-in failed: HTTP {status}: {body}")]
    Auth { status: u16, body: String },

    #[error("Unexpected response from evaluation service: {0}")]
    Protocol(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OptimizerError {
    /// Errors that must stop the process before any evaluation starts.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            OptimizerError::Config(_) | OptimizerError::Credentials(_) | OptimizerError::Auth { .. }
        )
    }
}
