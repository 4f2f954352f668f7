// src/cli/progress.rs — Terminal progress renderer for real-time run feedback

use crate::core::types::{ProgressEvent, SimulationStatus};
use crate::util::preview;

/// Build a progress callback that writes formatted output to stderr.
///
/// All progress output goes to stderr so stdout remains clean for the final
/// summary. Returns a closure suitable for `Optimizer::with_progress()`.
pub fn terminal_progress() -> impl Fn(ProgressEvent) + Send + 'static {
    move |event| {
        for line in format_event(&event) {
            eprintln!("{line}");
        }
    }
}

/// Render one event as zero or more output lines.
pub fn format_event(event: &ProgressEvent) -> Vec<String> {
    match event {
        ProgressEvent::SuggestionsReady {
            suggestions,
            source,
        } => {
            let mut lines = vec![format!(
                "[suggest] {} suggestion(s) from {}",
                suggestions.len(),
                source
            )];
            lines.extend(suggestions.iter().enumerate().map(|(i, s)| {
                format!("  {}. {} -> {}", i + 1, preview(&s.description, 60), preview(&s.expression, 80))
            }));
            lines
        }
        ProgressEvent::EvaluationStart {
            index,
            total,
            description,
            ..
        } => {
            if *index == 0 {
                vec![format!("[eval 0/{total}] baseline: {}", preview(description, 60))]
            } else {
                vec![format!("[eval {index}/{total}] {}", preview(description, 60))]
            }
        }
        ProgressEvent::EvaluationEnd { index, result } => match result.status {
            SimulationStatus::Success => vec![format!(
                "[eval {index}] sharpe={:.3} fitness={:.3} turnover={:.3}",
                result.sharpe_or_zero(),
                result.fitness.unwrap_or_default(),
                result.turnover.unwrap_or_default(),
            )],
            status => vec![format!(
                "[eval {index}] {status}: {}",
                preview(result.error_message.as_deref().unwrap_or_default(), 100)
            )],
        },
        ProgressEvent::SessionRefreshed { after_candidate } => {
            vec![format!("[auth] session refreshed after candidate {after_candidate}")]
        }
        ProgressEvent::ReportSaved { path } => {
            vec![format!("[done] report saved to {}", path.display())]
        }
    }
}
