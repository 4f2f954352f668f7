// src/operators/validator.rs — Lexical sanity check for factor expressions
//
// Advisory only: arity and nesting are not checked. The evaluation service
// decides whether an expression is actually valid.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use super::catalog::OperatorCatalog;

pub const MAX_EXPRESSION_LEN: usize = 2000;

fn invocation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("static regex is valid")
    })
}

/// Why an expression was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    NoKnownFunction,
    UnbalancedParentheses { open: usize, close: usize },
    TooLong { len: usize },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Empty => write!(f, "expression is empty"),
            Rejection::NoKnownFunction => write!(f, "no supported operator is invoked"),
            Rejection::UnbalancedParentheses { open, close } => {
                write!(f, "unbalanced parentheses: {open} '(' vs {close} ')'")
            }
            Rejection::TooLong { len } => write!(
                f,
                "expression is {len} characters (limit {MAX_EXPRESSION_LEN}), check for paste errors"
            ),
        }
    }
}

/// Names invoked as functions in `expr`, e.g. `rank` in `rank(close)`.
pub fn invoked_functions(expr: &str) -> BTreeSet<&str> {
    invocation()
        .captures_iter(expr)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Run the checks in order, stopping at the first failure.
pub fn check(expr: &str, catalog: &OperatorCatalog) -> Result<(), Rejection> {
    if expr.trim().is_empty() {
        return Err(Rejection::Empty);
    }

    if !invoked_functions(expr)
        .into_iter()
        .any(|name| catalog.contains(name))
    {
        return Err(Rejection::NoKnownFunction);
    }

    let open = expr.matches('(').count();
    let close = expr.matches(')').count();
    if open != close {
        return Err(Rejection::UnbalancedParentheses { open, close });
    }

    let len = expr.chars().count();
    if len > MAX_EXPRESSION_LEN {
        return Err(Rejection::TooLong { len });
    }

    Ok(())
}

pub fn validate(expr: &str, catalog: &OperatorCatalog) -> bool {
    match check(expr, catalog) {
        Ok(()) => true,
        Err(rejection) => {
            tracing::debug!("Expression rejected: {rejection}");
            false
        }
    }
}
