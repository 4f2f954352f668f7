// src/cli/run.rs — Default command: optimize one factor

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use super::progress::terminal_progress;
use super::Cli;
use crate::brain::http::HttpBrainApi;
use crate::brain::{SimulationClient, SimulationSettings};
use crate::core::orchestrator::{OptimizationOutcome, Optimizer};
use crate::core::report::ReportWriter;
use crate::infra::config::Config;
use crate::infra::credentials::Credentials;
use crate::infra::errors::OptimizerError;
use crate::operators::{self, OperatorCatalog};
use crate::provider::openrouter::OpenRouterProvider;
use crate::suggest::SuggestionService;
use crate::util::preview;

/// Factor used when the user just presses Enter.
pub const DEFAULT_FACTOR: &str = "(-1 * ts_corr(rank(open), rank(volume), 10))";

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match cli.config {
        Some(ref path) => Config::load_from(Path::new(path))?,
        None => Config::load()?,
    };
    apply_overrides(&mut config, &cli);

    // Startup errors are fatal before anything touches the network
    let credentials = Credentials::load(Path::new(&config.paths.credentials))?;
    let catalog = OperatorCatalog::load(Path::new(&config.paths.operators));

    let factor = match cli.factor {
        Some(ref factor) => {
            let factor = factor.trim().to_string();
            if let Err(rejection) = operators::check(&factor, &catalog) {
                tracing::warn!("Factor may be invalid ({rejection}), submitting anyway");
            }
            factor
        }
        None => prompt_factor(&catalog)?,
    };

    let provider = Arc::new(OpenRouterProvider::new(
        credentials.openrouter_api_key.clone(),
        &config.models,
    ));
    let brain = Arc::new(HttpBrainApi::new(
        &config.brain,
        &credentials.username,
        &credentials.password,
    )?);

    let optimizer = Optimizer::new(
        SuggestionService::new(provider, config.models.clone()),
        SimulationClient::new(SimulationSettings::from(&config.simulation)),
        brain,
        catalog,
        ReportWriter::new(&config.paths.output_dir),
    )
    .with_reauth_every(config.brain.reauth_every);
    let optimizer = if cli.quiet {
        optimizer
    } else {
        optimizer.with_progress(terminal_progress())
    };

    tracing::info!("Optimizing factor: {factor}");
    let outcome = optimizer.run(&factor).await?;
    print!("{}", render_summary(&outcome));
    Ok(())
}

/// CLI flags win over the config file.
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(ref path) = cli.credentials {
        config.paths.credentials = path.clone();
    }
    if let Some(ref path) = cli.operators {
        config.paths.operators = path.clone();
    }
    if let Some(ref dir) = cli.output_dir {
        config.paths.output_dir = dir.clone();
    }
    if let Some(ref model) = cli.model {
        config.models.primary = model.clone();
    }
    if let Some(ref model) = cli.fallback_model {
        config.models.fallback = model.clone();
    }
}

/// Ask for a factor until one passes validation. Without a terminal the
/// default factor is used.
fn prompt_factor(catalog: &OperatorCatalog) -> anyhow::Result<String> {
    if !std::io::stdin().is_terminal() {
        tracing::info!("No factor given and no terminal attached, using the default factor");
        return Ok(DEFAULT_FACTOR.to_string());
    }

    loop {
        let input = inquire::Text::new("Factor expression:")
            .with_default(DEFAULT_FACTOR)
            .with_help_message("Press Enter to use the default factor")
            .prompt()?;
        let factor = match input.trim() {
            "" => DEFAULT_FACTOR.to_string(),
            trimmed => trimmed.to_string(),
        };
        match operators::check(&factor, catalog) {
            Ok(()) => return Ok(factor),
            Err(rejection) => eprintln!("Invalid factor expression: {rejection}. Try again."),
        }
    }
}

/// Message printed before exiting with status 1. Startup problems get a
/// short descriptive line; anything else keeps the full cause chain.
pub fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<OptimizerError>() {
        Some(e) if e.is_fatal_at_startup() => {
            format!("error: cannot start optimization: {e}")
        }
        _ => format!("error: {err:?}"),
    }
}

/// Final ranked summary printed to stdout.
pub fn render_summary(outcome: &OptimizationOutcome) -> String {
    let mut out = String::new();
    let ranking = &outcome.ranking;

    out.push_str(&format!(
        "\nOptimization summary for: {}\n",
        outcome.report.original_factor
    ));
    out.push_str(&format!("Suggestions from: {}\n", outcome.suggestion_source));

    if ranking.ranked.is_empty() {
        out.push_str("\nNo simulation succeeded.\n");
    } else {
        out.push_str("\nRanked by Sharpe:\n");
        out.push_str(&format!(
            "  {:>2}  {:>8}  {:>8}  {:>8}  {}\n",
            "#", "sharpe", "fitness", "turnover", "expression"
        ));
        for (pos, entry) in ranking.ranked.iter().enumerate() {
            let r = &entry.result;
            let marker = if entry.is_baseline() { " (original)" } else { "" };
            out.push_str(&format!(
                "  {:>2}  {:>8.3}  {:>8.3}  {:>8.3}  {}{}\n",
                pos + 1,
                r.sharpe_or_zero(),
                r.fitness.unwrap_or_default(),
                r.turnover.unwrap_or_default(),
                preview(&r.expression, 80),
                marker,
            ));
        }
    }

    if !ranking.unranked.is_empty() {
        out.push_str(&format!("\nNot ranked ({}):\n", ranking.unranked.len()));
        for entry in &ranking.unranked {
            let r = &entry.result;
            out.push_str(&format!(
                "  - [{}] {}: {}\n",
                r.status,
                preview(&r.description, 60),
                preview(r.error_message.as_deref().unwrap_or_default(), 100),
            ));
        }
    }

    if let Some(ref best) = ranking.best_improvement {
        out.push_str(&format!(
            "\nBest suggestion: {}\n  {}\n",
            preview(&best.description, 80),
            best.expression
        ));
        match best.sharpe_delta {
            Some(delta) => out.push_str(&format!(
                "  sharpe {:.3} ({:+.3} vs original)\n",
                best.sharpe, delta
            )),
            None => out.push_str(&format!(
                "  sharpe {:.3} (original factor has no result to compare)\n",
                best.sharpe
            )),
        }
    }

    out.push_str(&format!("\nReport: {}\n", outcome.report_path.display()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ranking::rank;
    use crate::core::types::{
        AlphaMetrics, OptimizationReport, SimulationResult, SuggestionSource, BASELINE_DESCRIPTION,
    };
    use clap::Parser;
    use std::path::PathBuf;

    fn ok(description: &str, expression: &str, sharpe: f64) -> SimulationResult {
        SimulationResult::success(
            description,
            expression,
            "A",
            AlphaMetrics {
                sharpe,
                fitness: 1.0,
                turnover: 0.2,
                ..Default::default()
            },
        )
    }

    fn outcome(results: Vec<SimulationResult>) -> OptimizationOutcome {
        let report = OptimizationReport {
            original_factor: "X".into(),
            timestamp: 1,
            results,
        };
        OptimizationOutcome {
            ranking: rank(&report.results),
            report,
            suggestion_source: SuggestionSource::Model,
            report_path: PathBuf::from("factor_optimization_results_1.json"),
        }
    }

    #[test]
    fn test_default_factor_is_valid() {
        assert!(operators::validate(DEFAULT_FACTOR, &OperatorCatalog::builtin()));
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "factor-optimizer",
            "--credentials",
            "c.txt",
            "--operators",
            "ops.txt",
            "--model",
            "m1",
        ]);
        let mut config = Config::default();
        apply_overrides(&mut config, &cli);
        assert_eq!(config.paths.credentials, "c.txt");
        assert_eq!(config.paths.operators, "ops.txt");
        assert_eq!(config.paths.output_dir, ".");
        assert_eq!(config.models.primary, "m1");
        assert_eq!(config.models.fallback, "anthropic/claude-sonnet-4");
    }

    #[test]
    fn test_summary_lists_ranked_and_failed() {
        let text = render_summary(&outcome(vec![
            ok(BASELINE_DESCRIPTION, "X", 0.8),
            ok("Rank it", "rank(X)", 1.5),
            SimulationResult::failed("Broken", "rank(X", "HTTP 400"),
        ]));
        assert!(text.contains("Ranked by Sharpe:"));
        let rank_line = text.lines().position(|l| l.contains("rank(X)")).unwrap();
        let base_line = text.lines().position(|l| l.contains("(original)")).unwrap();
        assert!(rank_line < base_line);
        assert!(text.contains("[failed] Broken: HTTP 400"));
        assert!(text.contains("+0.700 vs original"));
        assert!(text.contains("Report: factor_optimization_results_1.json"));
    }

    #[test]
    fn test_summary_without_successes() {
        let text = render_summary(&outcome(vec![
            SimulationResult::error(BASELINE_DESCRIPTION, "X", "timeout"),
            SimulationResult::error("a", "rank(X)", "timeout"),
        ]));
        assert!(text.contains("No simulation succeeded."));
        assert!(!text.contains("Best suggestion"));
    }

    #[test]
    fn test_summary_with_failed_baseline() {
        let text = render_summary(&outcome(vec![
            SimulationResult::failed(BASELINE_DESCRIPTION, "X", "HTTP 400"),
            ok("a", "rank(X)", 1.1),
        ]));
        assert!(text.contains("no result to compare"));
    }

    #[test]
    fn test_startup_error_is_short() {
        let err = anyhow::Error::from(OptimizerError::Credentials(
            "OPENROUTER_API_KEY not found".into(),
        ));
        assert_eq!(
            describe_error(&err),
            "error: cannot start optimization: Credentials error: OPENROUTER_API_KEY not found"
        );
    }

    #[test]
    fn test_other_errors_keep_cause_chain() {
        let err = anyhow::Error::from(OptimizerError::Protocol("no alpha".into()))
            .context("report could not be written");
        let text = describe_error(&err);
        assert!(text.starts_with("error: report could not be written"));
        assert!(text.contains("no alpha"));
    }
}
