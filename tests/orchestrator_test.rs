// tests/orchestrator_test.rs — Integration test: optimizer with mock model and mock Brain

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use factor_optimizer::brain::{
    AlphaDetail, BrainApi, BrainSession, Clock, PollStatus, SimulationClient, SimulationRequest,
    SimulationSettings, Submission,
};
use factor_optimizer::core::orchestrator::Optimizer;
use factor_optimizer::core::report::{load_report, ReportWriter};
use factor_optimizer::core::types::{
    ProgressEvent, SimulationStatus, SuggestionSource, BASELINE_DESCRIPTION,
};
use factor_optimizer::infra::config::ModelsConfig;
use factor_optimizer::infra::errors::OptimizerError;
use factor_optimizer::operators::OperatorCatalog;
use factor_optimizer::provider::{ChatRequest, ChatResponse, ModelProvider};
use factor_optimizer::suggest::{default_suggestions, SuggestionService};

const FACTOR: &str = "-ts_corr(rank(open), rank(volume), 10)";
const LOCATION_PREFIX: &str = "https://brain.test/simulations/";

// ─── Mock model ─────────────────────────────────────────────────────────────

/// A mock provider that returns a canned answer, or fails every call.
struct MockProvider {
    answer: Option<String>,
    calls: AtomicUsize,
}

impl MockProvider {
    fn answering(text: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: None,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn id(&self) -> &str {
        "mock"
    }

    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, OptimizerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.answer {
            Some(ref content) => Ok(ChatResponse {
                content: content.clone(),
                ..Default::default()
            }),
            None => Err(OptimizerError::Provider {
                provider: "mock".into(),
                message: "connection refused".into(),
            }),
        }
    }
}

// ─── Mock evaluation service ────────────────────────────────────────────────

/// How the mock service treats one expression.
#[derive(Clone)]
enum Outcome {
    Sharpe(f64),
    Rejected(u16),
    ServiceError(&'static str),
    Transport,
}

#[derive(Debug, Clone)]
struct SubmitRecord {
    session: usize,
    expression: String,
    sign_ins_so_far: usize,
}

struct Shared {
    outcomes: HashMap<String, Outcome>,
    pending_polls: u32,
    polls_seen: Mutex<HashMap<String, u32>>,
    submits: Mutex<Vec<SubmitRecord>>,
    sign_ins: AtomicUsize,
}

impl Shared {
    fn outcome(&self, expression: &str) -> Outcome {
        self.outcomes
            .get(expression)
            .cloned()
            .unwrap_or(Outcome::Sharpe(0.5))
    }
}

struct MockBrain {
    shared: Arc<Shared>,
}

impl MockBrain {
    fn new(outcomes: Vec<(&str, Outcome)>, pending_polls: u32) -> Arc<Self> {
        Arc::new(Self {
            shared: Arc::new(Shared {
                outcomes: outcomes
                    .into_iter()
                    .map(|(e, o)| (e.to_string(), o))
                    .collect(),
                pending_polls,
                polls_seen: Mutex::new(HashMap::new()),
                submits: Mutex::new(Vec::new()),
                sign_ins: AtomicUsize::new(0),
            }),
        })
    }

    fn submits(&self) -> Vec<SubmitRecord> {
        self.shared.submits.lock().unwrap().clone()
    }

    fn sign_ins(&self) -> usize {
        self.shared.sign_ins.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrainApi for MockBrain {
    async fn sign_in(&self) -> Result<Box<dyn BrainSession>, OptimizerError> {
        let id = self.shared.sign_ins.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(MockSession {
            id,
            shared: self.shared.clone(),
        }))
    }
}

struct MockSession {
    id: usize,
    shared: Arc<Shared>,
}

#[async_trait]
impl BrainSession for MockSession {
    async fn submit(&self, request: &SimulationRequest) -> Result<Submission, OptimizerError> {
        self.shared.submits.lock().unwrap().push(SubmitRecord {
            session: self.id,
            expression: request.regular.clone(),
            sign_ins_so_far: self.shared.sign_ins.load(Ordering::SeqCst),
        });
        match self.shared.outcome(&request.regular) {
            Outcome::Rejected(status) => Ok(Submission::Rejected {
                status,
                body: "invalid expression".into(),
            }),
            Outcome::Transport => Err(OptimizerError::Other(anyhow::anyhow!(
                "connection reset by peer"
            ))),
            _ => Ok(Submission::Created {
                location: format!("{LOCATION_PREFIX}{}", request.regular),
            }),
        }
    }

    async fn poll(&self, location: &str) -> Result<PollStatus, OptimizerError> {
        let expression = location.trim_start_matches(LOCATION_PREFIX).to_string();
        let seen = {
            let mut polls = self.shared.polls_seen.lock().unwrap();
            let n = polls.entry(expression.clone()).or_insert(0);
            *n += 1;
            *n
        };
        if seen <= self.shared.pending_polls {
            return Ok(PollStatus {
                retry_after: Duration::from_secs(2),
                body: serde_json::Value::Null,
            });
        }
        let body = match self.shared.outcome(&expression) {
            Outcome::ServiceError(message) => json!({"status": "ERROR", "message": message}),
            _ => json!({"status": "COMPLETE", "alpha": expression}),
        };
        Ok(PollStatus {
            retry_after: Duration::ZERO,
            body,
        })
    }

    async fn fetch_alpha(&self, alpha_id: &str) -> Result<AlphaDetail, OptimizerError> {
        match self.shared.outcome(alpha_id) {
            Outcome::Sharpe(sharpe) => Ok(AlphaDetail::Found(json!({
                "id": alpha_id,
                "is": {
                    "sharpe": sharpe,
                    "fitness": 1.0,
                    "turnover": 0.3,
                    "returns": 0.1,
                    "pnl": 5000.0
                }
            }))),
            _ => Ok(AlphaDetail::Unavailable { status: 404 }),
        }
    }
}

#[derive(Default)]
struct RecordingClock {
    sleeps: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn build_optimizer(
    provider: Arc<MockProvider>,
    brain: Arc<MockBrain>,
    clock: Arc<RecordingClock>,
    dir: &std::path::Path,
) -> Optimizer {
    Optimizer::new(
        SuggestionService::new(provider, ModelsConfig::default()),
        SimulationClient::new(SimulationSettings::default()).with_clock(clock),
        brain,
        OperatorCatalog::builtin(),
        ReportWriter::new(dir),
    )
}

fn model_answer() -> String {
    [
        ("Smooth the signal", "ts_decay_linear(rank(close), 5)"),
        ("Standardise", "zscore(close)"),
        ("Broken syntax", "rank(close"),
        ("Volatility scaled", "ts_std_dev(close, 20)"),
        ("Mean reversion", "-ts_zscore(close, 10)"),
    ]
    .iter()
    .enumerate()
    .map(|(i, (d, e))| format!("### Suggestion {}: {d}\n```\n{e}\n```\n\n", i + 1))
    .collect()
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_model_failure_falls_back_to_templates() {
    let dir = tempfile::tempdir().unwrap();
    let provider = MockProvider::failing();
    let brain = MockBrain::new(vec![], 0);
    let optimizer = build_optimizer(
        provider.clone(),
        brain.clone(),
        Arc::new(RecordingClock::default()),
        dir.path(),
    );

    let outcome = optimizer.run(FACTOR).await.unwrap();

    // Primary error goes straight to templates, no simplified retry
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.suggestion_source, SuggestionSource::Templates);
    assert_eq!(outcome.report.results.len(), 6);

    let expected: Vec<String> = std::iter::once(FACTOR.to_string())
        .chain(default_suggestions(FACTOR).into_iter().map(|s| s.expression))
        .collect();
    let submitted: Vec<String> = brain.submits().into_iter().map(|s| s.expression).collect();
    assert_eq!(submitted, expected);

    let raw = std::fs::read_to_string(&outcome.report_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["original_factor"], FACTOR);
    assert_eq!(json["results"].as_array().unwrap().len(), 6);
    assert_eq!(json["results"][0]["description"], BASELINE_DESCRIPTION);

    let reread = load_report(&outcome.report_path).unwrap();
    assert_eq!(reread, outcome.report);
}

#[tokio::test]
async fn test_session_refreshed_once_before_fourth_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let brain = MockBrain::new(vec![], 0);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let optimizer = build_optimizer(
        MockProvider::failing(),
        brain.clone(),
        Arc::new(RecordingClock::default()),
        dir.path(),
    )
    .with_progress(move |e| sink.lock().unwrap().push(e));

    optimizer.run(FACTOR).await.unwrap();

    let submits = brain.submits();
    assert_eq!(submits.len(), 6);
    // Baseline and candidates 1-3 on the first session
    for record in &submits[..4] {
        assert_eq!(record.session, 1, "{}", record.expression);
        assert_eq!(record.sign_ins_so_far, 1);
    }
    // Candidate 4 starts after exactly one refresh
    assert_eq!(submits[4].session, 2);
    assert_eq!(submits[4].sign_ins_so_far, 2);
    assert_eq!(submits[5].session, 2);
    assert_eq!(brain.sign_ins(), 2);

    let refreshes: Vec<usize> = events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::SessionRefreshed { after_candidate } => Some(*after_candidate),
            _ => None,
        })
        .collect();
    assert_eq!(refreshes, vec![3]);
}

#[tokio::test]
async fn test_mixed_outcomes_ranked_by_sharpe() {
    let dir = tempfile::tempdir().unwrap();
    let brain = MockBrain::new(
        vec![
            (FACTOR, Outcome::Sharpe(0.8)),
            ("ts_decay_linear(rank(close), 5)", Outcome::Sharpe(1.5)),
            ("zscore(close)", Outcome::Rejected(400)),
            ("rank(close", Outcome::ServiceError("Unexpected end of input")),
            ("ts_std_dev(close, 20)", Outcome::Sharpe(-0.2)),
            ("-ts_zscore(close, 10)", Outcome::Transport),
        ],
        0,
    );
    let optimizer = build_optimizer(
        MockProvider::answering(&model_answer()),
        brain,
        Arc::new(RecordingClock::default()),
        dir.path(),
    );

    let outcome = optimizer.run(FACTOR).await.unwrap();
    assert_eq!(outcome.suggestion_source, SuggestionSource::Model);

    let ranked: Vec<f64> = outcome
        .ranking
        .ranked
        .iter()
        .map(|e| e.result.sharpe_or_zero())
        .collect();
    assert_eq!(ranked, vec![1.5, 0.8, -0.2]);

    // Report keeps evaluation order, not rank order
    let statuses: Vec<SimulationStatus> =
        outcome.report.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            SimulationStatus::Success,
            SimulationStatus::Success,
            SimulationStatus::Failed,
            SimulationStatus::Failed,
            SimulationStatus::Success,
            SimulationStatus::Error,
        ]
    );
    assert_eq!(outcome.report.results[2].error_message.as_deref().map(|m| m.contains("HTTP 400")), Some(true));
    assert_eq!(
        outcome.report.results[3].error_message.as_deref(),
        Some("Unexpected end of input")
    );
    assert!(!outcome.report.results[5]
        .error_message
        .as_deref()
        .unwrap_or_default()
        .is_empty());

    let unranked: Vec<usize> = outcome.ranking.unranked.iter().map(|e| e.index).collect();
    assert_eq!(unranked, vec![2, 3, 5]);

    let best = outcome.ranking.best_improvement.unwrap();
    assert_eq!(best.description, "Smooth the signal");
    assert!((best.sharpe_delta.unwrap() - 0.7).abs() < 1e-9);
}

#[tokio::test]
async fn test_polling_waits_on_injected_clock() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(RecordingClock::default());
    let brain = MockBrain::new(vec![], 2);
    let optimizer = build_optimizer(MockProvider::failing(), brain, clock.clone(), dir.path());

    let outcome = optimizer.run(FACTOR).await.unwrap();

    assert!(outcome.report.results.iter().all(|r| r.is_success()));
    // Two pending polls per job, six jobs
    let sleeps = clock.sleeps.lock().unwrap();
    assert_eq!(sleeps.len(), 12);
    assert!(sleeps.iter().all(|d| *d == Duration::from_secs(2)));
}

#[tokio::test]
async fn test_empty_model_answer_uses_simplified_prompt_then_templates() {
    let dir = tempfile::tempdir().unwrap();
    let provider = MockProvider::answering("");
    let optimizer = build_optimizer(
        provider.clone(),
        MockBrain::new(vec![], 0),
        Arc::new(RecordingClock::default()),
        dir.path(),
    );

    let outcome = optimizer.run(FACTOR).await.unwrap();

    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    assert_eq!(outcome.suggestion_source, SuggestionSource::Templates);
    assert_eq!(outcome.report.results.len(), 6);
}
