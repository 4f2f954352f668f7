// src/suggest/prompt.rs — Prompt templates for suggestion requests

use minijinja::{context, Environment};

use super::templates::default_suggestions;
use crate::infra::errors::OptimizerError;
use crate::operators::OperatorCatalog;

pub const SYSTEM_PROMPT: &str = "You are an expert quantitative factor-optimization assistant, \
fluent in WorldQuant Brain FASTEXPR syntax and its operators.";

const PRIMARY_TEMPLATE: &str = r#"Give exactly 5 concrete improvement suggestions for the following WorldQuant Brain alpha factor.

Original factor: {{ original_factor }}

Use ONLY these operators and functions supported by WorldQuant Brain:
{{ operators }}

Requirements:
1. Every suggestion explains the improvement logic.
2. Every suggestion gives the complete improved factor expression.
3. Expressions use only the operators listed above.
4. Give exactly 5 suggestions, no more and no fewer.
5. Each suggestion takes a different direction, focused on raising the Sharpe ratio:
   - time-series stability (smoothing with ts_decay_linear, ts_mean)
   - cross-sectional standardisation (zscore, normalize)
   - volatility adjustment (ts_std_dev, winsorize)
   - multi-signal combination (multiply, add)
   - mean reversion (ts_zscore, ts_rank)
6. Be specific and actionable. Prefer simple expressions over deep nesting to avoid overfitting.

Answer in exactly this format:
{% for n in range(1, 6) %}
### Suggestion {{ n }}: [improvement rationale]
Improved factor: [complete factor expression]
{% endfor %}
Expressions must be complete, executable WorldQuant Brain code."#;

const SIMPLIFIED_TEMPLATE: &str = r#"Give 5 improvement suggestions for the factor '{{ original_factor }}' in this format:
{% for s in examples %}
### Suggestion {{ loop.index }}: {{ s.description }}
Improved factor: {{ s.expression }}
{% endfor %}"#;

/// Full prompt embedding the factor and the operator catalog.
pub fn primary_prompt(
    original_factor: &str,
    catalog: &OperatorCatalog,
) -> Result<String, OptimizerError> {
    let env = Environment::new();
    Ok(env.render_str(
        PRIMARY_TEMPLATE,
        context! {
            original_factor => original_factor,
            operators => catalog.render(),
        },
    )?)
}

/// Short few-shot prompt used when the primary model returns nothing.
pub fn simplified_prompt(original_factor: &str) -> Result<String, OptimizerError> {
    let env = Environment::new();
    Ok(env.render_str(
        SIMPLIFIED_TEMPLATE,
        context! {
            original_factor => original_factor,
            examples => default_suggestions(original_factor),
        },
    )?)
}
