// src/brain/mod.rs — Remote alpha evaluation service
//
// The service is session based: `BrainApi::sign_in` opens a session, and all
// job traffic goes through that session until it is replaced.

pub mod http;
pub mod simulation;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::infra::config::SimulationConfig;
use crate::infra::errors::OptimizerError;

pub use simulation::{Clock, SimulationClient, TokioClock};

#[async_trait]
pub trait BrainApi: Send + Sync {
    /// Authenticate and open a fresh session.
    async fn sign_in(&self) -> Result<Box<dyn BrainSession>, OptimizerError>;
}

/// One authenticated session. Transport failures are errors; service-level
/// outcomes (rejections, unavailable records) are values.
#[async_trait]
pub trait BrainSession: Send + Sync {
    async fn submit(&self, request: &SimulationRequest) -> Result<Submission, OptimizerError>;

    async fn poll(&self, location: &str) -> Result<PollStatus, OptimizerError>;

    async fn fetch_alpha(&self, alpha_id: &str) -> Result<AlphaDetail, OptimizerError>;
}

// ─── Wire types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub settings: SimulationSettings,
    pub regular: String,
}

impl SimulationRequest {
    pub fn regular(expression: impl Into<String>, settings: &SimulationSettings) -> Self {
        Self {
            kind: "REGULAR".into(),
            settings: settings.clone(),
            regular: expression.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSettings {
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

impl From<&SimulationConfig> for SimulationSettings {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            instrument_type: config.instrument_type.clone(),
            region: config.region.clone(),
            universe: config.universe.clone(),
            delay: config.delay,
            decay: config.decay,
            neutralization: config.neutralization.clone(),
            truncation: config.truncation,
            pasteurization: config.pasteurization.clone(),
            unit_handling: config.unit_handling.clone(),
            nan_handling: config.nan_handling.clone(),
            language: config.language.clone(),
            visualization: config.visualization,
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self::from(&SimulationConfig::default())
    }
}

/// Answer to a job submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Job accepted; poll `location` for progress.
    Created { location: String },
    /// Any non-created status.
    Rejected { status: u16, body: String },
}

/// One poll of a job's progress resource.
#[derive(Debug, Clone, PartialEq)]
pub struct PollStatus {
    /// Zero once the job has resolved.
    pub retry_after: Duration,
    pub body: serde_json::Value,
}

impl PollStatus {
    pub fn is_pending(&self) -> bool {
        !self.retry_after.is_zero()
    }
}

/// Answer to an alpha detail request.
#[derive(Debug, Clone, PartialEq)]
pub enum AlphaDetail {
    Found(serde_json::Value),
    Unavailable { status: u16 },
}
