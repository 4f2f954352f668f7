// src/suggest/templates.rs — Deterministic suggestions around the original factor

use crate::core::types::Suggestion;

pub const SUGGESTION_COUNT: usize = 5;

/// Five fixed rewrites of `factor`, one per optimization direction.
pub fn default_suggestions(factor: &str) -> Vec<Suggestion> {
    vec![
        Suggestion::new(
            "Temporal smoothing: linearly decay the signal to reduce noise",
            format!("ts_decay_linear({factor}, 5)"),
        ),
        Suggestion::new(
            "Volatility scaling: weight the signal by recent price volatility",
            format!("({factor} * ts_stddev(close, 10))"),
        ),
        Suggestion::new(
            "Cross-sectional rank: compare instruments on a uniform scale",
            format!("rank({factor})"),
        ),
        Suggestion::new(
            "Multi-signal combination: blend with price-volume correlation",
            format!("({factor} * ts_corr(rank(close), rank(volume), 10))"),
        ),
        Suggestion::new(
            "Mean reversion: condition on the intraday move",
            format!("({factor} * rank(close - open))"),
        ),
    ]
}
