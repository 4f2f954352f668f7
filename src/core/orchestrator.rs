// src/core/orchestrator.rs — Optimization pipeline controller
//
// suggest -> evaluate baseline -> evaluate candidates (refreshing the session
// every few jobs) -> rank -> persist. Strictly sequential: one job in flight.

use std::path::PathBuf;
use std::sync::Arc;

use super::ranking::{rank, Ranking};
use super::report::ReportWriter;
use super::types::*;
use crate::brain::{BrainApi, BrainSession, SimulationClient};
use crate::infra::errors::OptimizerError;
use crate::operators::OperatorCatalog;
use crate::suggest::SuggestionService;

/// Default number of candidate evaluations between session refreshes.
pub const DEFAULT_REAUTH_EVERY: usize = 3;

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    pub report: OptimizationReport,
    pub ranking: Ranking,
    pub suggestion_source: SuggestionSource,
    pub report_path: PathBuf,
}

pub struct Optimizer {
    suggestions: SuggestionService,
    simulations: SimulationClient,
    brain: Arc<dyn BrainApi>,
    catalog: OperatorCatalog,
    writer: ReportWriter,
    reauth_every: usize,
    /// Optional callback for real-time progress events.
    on_progress: Option<Box<dyn Fn(ProgressEvent) + Send>>,
}

impl Optimizer {
    pub fn new(
        suggestions: SuggestionService,
        simulations: SimulationClient,
        brain: Arc<dyn BrainApi>,
        catalog: OperatorCatalog,
        writer: ReportWriter,
    ) -> Self {
        Self {
            suggestions,
            simulations,
            brain,
            catalog,
            writer,
            reauth_every: DEFAULT_REAUTH_EVERY,
            on_progress: None,
        }
    }

    /// Refresh the session after every `n` candidates; 0 never refreshes.
    pub fn with_reauth_every(mut self, n: usize) -> Self {
        self.reauth_every = n;
        self
    }

    /// Set a callback for real-time progress events.
    pub fn with_progress(mut self, cb: impl Fn(ProgressEvent) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    /// Run the whole pipeline for one factor. Only sign-in and report
    /// persistence can fail; per-job problems end up in the results.
    pub async fn run(&self, original_factor: &str) -> Result<OptimizationOutcome, OptimizerError> {
        let mut session = self.brain.sign_in().await?;
        tracing::info!("Signed in to evaluation service");

        let set = self.suggestions.suggest(original_factor, &self.catalog).await;
        tracing::info!(
            source = %set.source,
            "Obtained {} suggestions",
            set.suggestions.len()
        );
        self.emit(ProgressEvent::SuggestionsReady {
            suggestions: set.suggestions.clone(),
            source: set.source,
        });

        let total = set.suggestions.len();
        let mut results = Vec::with_capacity(total + 1);
        results.push(
            self.evaluate(&*session, 0, total, BASELINE_DESCRIPTION, original_factor)
                .await,
        );

        for (i, suggestion) in set.suggestions.iter().enumerate() {
            let index = i + 1;
            results.push(
                self.evaluate(
                    &*session,
                    index,
                    total,
                    &suggestion.description,
                    &suggestion.expression,
                )
                .await,
            );

            if self.should_refresh(index, total) {
                match self.brain.sign_in().await {
                    Ok(fresh) => {
                        session = fresh;
                        tracing::info!(after_candidate = index, "Session refreshed");
                        self.emit(ProgressEvent::SessionRefreshed {
                            after_candidate: index,
                        });
                    }
                    Err(e) => {
                        tracing::warn!("Session refresh failed, keeping current session: {e}");
                    }
                }
            }
        }

        let report = OptimizationReport {
            original_factor: original_factor.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            results,
        };
        let ranking = rank(&report.results);

        let report_path = self.writer.write(&report)?;
        tracing::info!("Results saved to {}", report_path.display());
        self.emit(ProgressEvent::ReportSaved {
            path: report_path.clone(),
        });

        Ok(OptimizationOutcome {
            report,
            ranking,
            suggestion_source: set.source,
            report_path,
        })
    }

    fn should_refresh(&self, index: usize, total: usize) -> bool {
        self.reauth_every > 0 && index % self.reauth_every == 0 && index < total
    }

    async fn evaluate(
        &self,
        session: &dyn BrainSession,
        index: usize,
        total: usize,
        description: &str,
        expression: &str,
    ) -> SimulationResult {
        tracing::info!(
            "[{index}/{total}] Evaluating {}: {}",
            description,
            crate::util::preview(expression, 120)
        );
        self.emit(ProgressEvent::EvaluationStart {
            index,
            total,
            description: description.to_string(),
            expression: expression.to_string(),
        });

        let result = self
            .simulations
            .evaluate(session, description, expression)
            .await;

        match result.status {
            SimulationStatus::Success => tracing::info!(
                alpha_id = result.alpha_id.as_deref().unwrap_or_default(),
                "[{index}/{total}] sharpe={:.3}",
                result.sharpe_or_zero()
            ),
            status => tracing::warn!(
                "[{index}/{total}] {status}: {}",
                result.error_message.as_deref().unwrap_or_default()
            ),
        }
        self.emit(ProgressEvent::EvaluationEnd {
            index,
            result: result.clone(),
        });
        result
    }
}
