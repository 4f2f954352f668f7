// src/brain/simulation.rs — Single-job simulation state machine
//
// Submitting -> Polling (self-loop while Retry-After > 0) -> Fetching -> Done.
// Any error along the way ends the job with an error result; `evaluate`
// never fails.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{AlphaDetail, BrainSession, PollStatus, SimulationRequest, SimulationSettings, Submission};
use crate::core::types::{AlphaMetrics, SimulationResult};
use crate::infra::errors::OptimizerError;
use crate::util::truncate_str;

/// Job statuses the service reports for expressions it refused to simulate.
const FAILED_JOB_STATUSES: &[&str] = &["ERROR", "FAIL", "FAILED"];

/// Sleep source for the poll loop; swapped out in tests.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

enum JobState {
    Submitting,
    Polling { location: String, polls: u32 },
    Fetching { alpha_id: String },
    Done(SimulationResult),
}

/// Expression under evaluation, carried into every result it produces.
struct Job<'a> {
    description: &'a str,
    expression: &'a str,
}

impl Job<'_> {
    fn failed(&self, message: impl Into<String>) -> JobState {
        JobState::Done(SimulationResult::failed(
            self.description,
            self.expression,
            message,
        ))
    }
}

pub struct SimulationClient {
    settings: SimulationSettings,
    clock: Arc<dyn Clock>,
}

impl SimulationClient {
    pub fn new(settings: SimulationSettings) -> Self {
        Self {
            settings,
            clock: Arc::new(TokioClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Submit, wait for, and collect one simulation.
    pub async fn evaluate(
        &self,
        session: &dyn BrainSession,
        description: &str,
        expression: &str,
    ) -> SimulationResult {
        let job = Job {
            description,
            expression,
        };
        match self.drive(session, &job).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Simulation of {description:?} errored: {e}");
                SimulationResult::error(description, expression, e.to_string())
            }
        }
    }

    async fn drive(
        &self,
        session: &dyn BrainSession,
        job: &Job<'_>,
    ) -> Result<SimulationResult, OptimizerError> {
        let mut state = JobState::Submitting;
        loop {
            state = match state {
                JobState::Submitting => self.submit(session, job).await?,
                JobState::Polling { location, polls } => {
                    let status = session.poll(&location).await?;
                    self.after_poll(job, location, polls + 1, status).await?
                }
                JobState::Fetching { alpha_id } => self.fetch(session, job, alpha_id).await?,
                JobState::Done(result) => return Ok(result),
            };
        }
    }

    async fn submit(
        &self,
        session: &dyn BrainSession,
        job: &Job<'_>,
    ) -> Result<JobState, OptimizerError> {
        let request = SimulationRequest::regular(job.expression, &self.settings);
        match session.submit(&request).await? {
            Submission::Created { location } => {
                tracing::debug!(%location, "Simulation submitted");
                Ok(JobState::Polling { location, polls: 0 })
            }
            Submission::Rejected { status, body } => {
                let mut message = format!("HTTP {status}");
                if !body.trim().is_empty() {
                    message.push_str(": ");
                    message.push_str(truncate_str(body.trim(), 200));
                }
                tracing::warn!("Simulation submission rejected: {message}");
                Ok(job.failed(message))
            }
        }
    }

    async fn after_poll(
        &self,
        job: &Job<'_>,
        location: String,
        polls: u32,
        status: PollStatus,
    ) -> Result<JobState, OptimizerError> {
        if status.is_pending() {
            tracing::debug!(polls, "Simulation pending, next poll in {:?}", status.retry_after);
            self.clock.sleep(status.retry_after).await;
            return Ok(JobState::Polling { location, polls });
        }

        let body = &status.body;
        if let Some(alpha_id) = body["alpha"].as_str().filter(|id| !id.is_empty()) {
            return Ok(JobState::Fetching {
                alpha_id: alpha_id.to_string(),
            });
        }

        let job_status = body["status"].as_str().unwrap_or_default();
        if FAILED_JOB_STATUSES
            .iter()
            .any(|s| s.eq_ignore_ascii_case(job_status))
        {
            let message = body["message"]
                .as_str()
                .filter(|m| !m.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("simulation finished with status {job_status}"));
            return Ok(job.failed(message));
        }

        Err(OptimizerError::Protocol(format!(
            "simulation completed without an alpha id (status {:?})",
            job_status
        )))
    }

    async fn fetch(
        &self,
        session: &dyn BrainSession,
        job: &Job<'_>,
        alpha_id: String,
    ) -> Result<JobState, OptimizerError> {
        match session.fetch_alpha(&alpha_id).await? {
            AlphaDetail::Found(detail) => {
                let metrics = AlphaMetrics::from_detail(&detail);
                tracing::debug!(%alpha_id, sharpe = metrics.sharpe, "Alpha metrics fetched");
                Ok(JobState::Done(SimulationResult::success(
                    job.description,
                    job.expression,
                    alpha_id,
                    metrics,
                )))
            }
            AlphaDetail::Unavailable { status } => {
                Ok(job.failed(format!("alpha {alpha_id} detail unavailable: HTTP {status}")))
            }
        }
    }
}
