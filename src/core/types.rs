// src/core/types.rs — Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Description used for the baseline evaluation of the original factor.
pub const BASELINE_DESCRIPTION: &str = "Original factor";

/// A candidate improvement: rationale plus an unvalidated expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub description: String,
    pub expression: String,
}

impl Suggestion {
    pub fn new(description: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            expression: expression.into(),
        }
    }
}

/// Where the evaluated suggestions came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    /// Parsed from the primary model's answer.
    Model,
    /// Parsed from the simplified-prompt retry on the fallback model.
    SimplifiedModel,
    /// Deterministic templates around the original factor.
    Templates,
}

impl fmt::Display for SuggestionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestionSource::Model => write!(f, "model"),
            SuggestionSource::SimplifiedModel => write!(f, "simplified prompt"),
            SuggestionSource::Templates => write!(f, "built-in templates"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationStatus {
    Success,
    Failed,
    Error,
}

impl fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationStatus::Success => write!(f, "success"),
            SimulationStatus::Failed => write!(f, "failed"),
            SimulationStatus::Error => write!(f, "error"),
        }
    }
}

/// In-sample performance of a simulated alpha.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AlphaMetrics {
    pub sharpe: f64,
    pub fitness: f64,
    pub turnover: f64,
    pub returns: f64,
    pub pnl: f64,
}

impl AlphaMetrics {
    /// Read metrics from an alpha detail record; absent fields count as 0.
    pub fn from_detail(detail: &serde_json::Value) -> Self {
        let is = &detail["is"];
        let field = |name: &str| is[name].as_f64().unwrap_or(0.0);
        Self {
            sharpe: field("sharpe"),
            fitness: field("fitness"),
            turnover: field("turnover"),
            returns: field("returns"),
            pnl: field("pnl"),
        }
    }
}

/// Outcome of evaluating one expression. Success carries every metric,
/// failed and error carry only the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub status: SimulationStatus,
    pub description: String,
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharpe: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turnover: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
    #[serde(
        default,
        rename = "error",
        alias = "error_message",
        skip_serializing_if = "Option::is_none"
    )]
    pub error_message: Option<String>,
}

impl SimulationResult {
    pub fn success(
        description: impl Into<String>,
        expression: impl Into<String>,
        alpha_id: impl Into<String>,
        metrics: AlphaMetrics,
    ) -> Self {
        Self {
            status: SimulationStatus::Success,
            description: description.into(),
            expression: expression.into(),
            alpha_id: Some(alpha_id.into()),
            sharpe: Some(metrics.sharpe),
            fitness: Some(metrics.fitness),
            turnover: Some(metrics.turnover),
            returns: Some(metrics.returns),
            pnl: Some(metrics.pnl),
            error_message: None,
        }
    }

    pub fn failed(
        description: impl Into<String>,
        expression: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::unsuccessful(SimulationStatus::Failed, description, expression, message)
    }

    pub fn error(
        description: impl Into<String>,
        expression: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::unsuccessful(SimulationStatus::Error, description, expression, message)
    }

    fn unsuccessful(
        status: SimulationStatus,
        description: impl Into<String>,
        expression: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = format!("simulation {status} without a message");
        }
        Self {
            status,
            description: description.into(),
            expression: expression.into(),
            alpha_id: None,
            sharpe: None,
            fitness: None,
            turnover: None,
            returns: None,
            pnl: None,
            error_message: Some(message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SimulationStatus::Success
    }

    /// Sharpe used for ranking; 0 when the result carries none.
    pub fn sharpe_or_zero(&self) -> f64 {
        self.sharpe.unwrap_or(0.0)
    }
}

/// Durable record of one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub original_factor: String,
    /// Unix seconds at report generation.
    pub timestamp: i64,
    /// Baseline first, then candidates, in evaluation order.
    pub results: Vec<SimulationResult>,
}

/// Real-time progress events emitted by the optimizer.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    SuggestionsReady {
        suggestions: Vec<Suggestion>,
        source: SuggestionSource,
    },
    EvaluationStart {
        /// 0 is the baseline, 1..=total are candidates.
        index: usize,
        total: usize,
        description: String,
        expression: String,
    },
    EvaluationEnd {
        index: usize,
        result: SimulationResult,
    },
    SessionRefreshed {
        after_candidate: usize,
    },
    ReportSaved {
        path: std::path::PathBuf,
    },
}
