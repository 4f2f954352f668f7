// src/brain/http.rs — WorldQuant Brain REST client
//
// Authentication is cookie based: sign-in sets the session cookie on a fresh
// client, so dropping the session drops the cookie jar with it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{LOCATION, RETRY_AFTER};
use reqwest::StatusCode;
use url::Url;

use super::{AlphaDetail, BrainApi, BrainSession, PollStatus, SimulationRequest, Submission};
use crate::infra::config::BrainConfig;
use crate::infra::errors::OptimizerError;
use crate::util::truncate_str;

pub struct HttpBrainApi {
    base_url: Url,
    username: String,
    password: String,
    timeout: Duration,
}

impl HttpBrainApi {
    pub fn new(
        config: &BrainConfig,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, OptimizerError> {
        Ok(Self {
            base_url: base_url(&config.base_url)?,
            username: username.into(),
            password: password.into(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }
}

#[async_trait]
impl BrainApi for HttpBrainApi {
    async fn sign_in(&self) -> Result<Box<dyn BrainSession>, OptimizerError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(self.timeout)
            .build()?;

        let response = client
            .post(endpoint(&self.base_url, "authentication")?)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(OptimizerError::Auth {
                status: status.as_u16(),
                body: truncate_str(&body, 500).to_string(),
            });
        }

        tracing::debug!(user = %self.username, "Signed in to evaluation service");
        Ok(Box::new(HttpBrainSession {
            client,
            base_url: self.base_url.clone(),
        }))
    }
}

pub struct HttpBrainSession {
    client: reqwest::Client,
    base_url: Url,
}

#[async_trait]
impl BrainSession for HttpBrainSession {
    async fn submit(&self, request: &SimulationRequest) -> Result<Submission, OptimizerError> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "simulations")?)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Ok(Submission::Rejected {
                status: status.as_u16(),
                body: truncate_str(&body, 500).to_string(),
            });
        }

        let raw = response
            .headers()
            .get(LOCATION)
            .ok_or_else(|| OptimizerError::Protocol("simulation created without a Location header".into()))?
            .to_str()
            .map_err(|_| OptimizerError::Protocol("Location header is not valid text".into()))?;

        Ok(Submission::Created {
            location: resolve_location(&self.base_url, raw)?,
        })
    }

    async fn poll(&self, location: &str) -> Result<PollStatus, OptimizerError> {
        let response = self.client.get(location).send().await?.error_for_status()?;

        let retry_after = match response.headers().get(RETRY_AFTER) {
            Some(value) => parse_retry_after(
                value
                    .to_str()
                    .map_err(|_| OptimizerError::Protocol("Retry-After header is not valid text".into()))?,
            )?,
            None => Duration::ZERO,
        };

        if !retry_after.is_zero() {
            return Ok(PollStatus {
                retry_after,
                body: serde_json::Value::Null,
            });
        }

        Ok(PollStatus {
            retry_after,
            body: response.json().await?,
        })
    }

    async fn fetch_alpha(&self, alpha_id: &str) -> Result<AlphaDetail, OptimizerError> {
        let response = self
            .client
            .get(endpoint(&self.base_url, &format!("alphas/{alpha_id}"))?)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Ok(AlphaDetail::Unavailable {
                status: status.as_u16(),
            });
        }
        Ok(AlphaDetail::Found(response.json().await?))
    }
}

/// Parse the base URL, making sure relative joins append to its path.
fn base_url(raw: &str) -> Result<Url, OptimizerError> {
    let mut url = Url::parse(raw)
        .map_err(|e| OptimizerError::Config(format!("invalid brain base_url {raw:?}: {e}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn endpoint(base: &Url, path: &str) -> Result<Url, OptimizerError> {
    base.join(path)
        .map_err(|e| OptimizerError::Protocol(format!("cannot build URL for {path}: {e}")))
}

/// The service may answer with an absolute or a host-relative location.
fn resolve_location(base: &Url, raw: &str) -> Result<String, OptimizerError> {
    base.join(raw.trim())
        .map(String::from)
        .map_err(|e| OptimizerError::Protocol(format!("invalid Location {raw:?}: {e}")))
}

/// Seconds to wait before polling again, possibly fractional.
pub(crate) fn parse_retry_after(raw: &str) -> Result<Duration, OptimizerError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Duration::ZERO);
    }
    let secs: f64 = raw
        .parse()
        .map_err(|_| OptimizerError::Protocol(format!("invalid Retry-After value {raw:?}")))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|_| OptimizerError::Protocol(format!("invalid Retry-After value {raw:?}")))
}
