// src/core/ranking.rs — Order successful results by Sharpe ratio

use super::types::SimulationResult;

/// A result together with its position in evaluation order (0 = baseline).
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub index: usize,
    pub result: SimulationResult,
}

impl RankedEntry {
    pub fn is_baseline(&self) -> bool {
        self.index == 0
    }
}

/// Best successful candidate and how it compares to the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct Improvement {
    pub index: usize,
    pub description: String,
    pub expression: String,
    pub sharpe: f64,
    /// `None` when the baseline itself did not succeed.
    pub sharpe_delta: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ranking {
    /// Successful results, Sharpe descending, ties in evaluation order.
    pub ranked: Vec<RankedEntry>,
    /// Failed and errored results in evaluation order. Never ranked.
    pub unranked: Vec<RankedEntry>,
    pub baseline_sharpe: Option<f64>,
    pub best_improvement: Option<Improvement>,
}

pub fn rank(results: &[SimulationResult]) -> Ranking {
    let (mut ranked, unranked): (Vec<_>, Vec<_>) = results
        .iter()
        .cloned()
        .enumerate()
        .map(|(index, result)| RankedEntry { index, result })
        .partition(|entry| entry.result.is_success());

    // Stable: equal Sharpe keeps submission order
    ranked.sort_by(|a, b| sort_key(b).total_cmp(&sort_key(a)));

    let baseline_sharpe = results
        .first()
        .filter(|r| r.is_success())
        .map(SimulationResult::sharpe_or_zero);

    let best_improvement = ranked
        .iter()
        .find(|entry| !entry.is_baseline())
        .map(|entry| {
            let sharpe = entry.result.sharpe_or_zero();
            Improvement {
                index: entry.index,
                description: entry.result.description.clone(),
                expression: entry.result.expression.clone(),
                sharpe,
                sharpe_delta: baseline_sharpe.map(|base| sharpe - base),
            }
        });

    Ranking {
        ranked,
        unranked,
        baseline_sharpe,
        best_improvement,
    }
}

/// Sharpe with `-0.0` folded into `0.0`, so signed zeros count as a tie.
fn sort_key(entry: &RankedEntry) -> f64 {
    let sharpe = entry.result.sharpe_or_zero();
    if sharpe == 0.0 {
        0.0
    } else {
        sharpe
    }
}
