// src/operators/catalog.rs — Known operator names for advisory validation

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use std::sync::OnceLock;

/// Signatures used when no operator file is available.
const BUILTIN_SIGNATURES: &[&str] = &[
    "abs(x)",
    "add(x, y)",
    "divide(x, y)",
    "multiply(x, y)",
    "power(x, y)",
    "sqrt(x)",
    "subtract(x, y)",
    "max(x, y)",
    "min(x, y)",
    "sign(x)",
    "log(x)",
    "inverse(x)",
    "ts_corr(x, y, d)",
    "ts_covariance(x, y, d)",
    "ts_mean(x, d)",
    "ts_std_dev(x, d)",
    "ts_delta(x, d)",
    "ts_delay(x, d)",
    "ts_decay_linear(x, d)",
    "ts_rank(x, d)",
    "ts_sum(x, d)",
    "ts_product(x, d)",
    "ts_zscore(x, d)",
    "ts_scale(x, d)",
    "rank(x)",
    "scale(x)",
    "normalize(x)",
    "quantile(x)",
    "zscore(x)",
    "winsorize(x)",
    "group_rank(x, group)",
    "group_mean(x, weight, group)",
    "group_neutralize(x, group)",
    "if_else(condition, x, y)",
    "and(x, y)",
    "or(x, y)",
    "not(x)",
];

/// Alternate spellings accepted when their canonical name is known.
const ALIASES: &[(&str, &str)] = &[("ts_std_dev", "ts_stddev")];

fn leading_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("static regex is valid")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Operator {
    name: String,
    signature: String,
}

/// Ordered, immutable set of operator names.
#[derive(Debug, Clone, Default)]
pub struct OperatorCatalog {
    operators: Vec<Operator>,
    names: HashSet<String>,
}

impl OperatorCatalog {
    /// Parse `name(args): ...` lines; blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Self {
        let mut catalog = Self::default();
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(caps) = leading_name().captures(line) {
                catalog.insert(&caps[1], line);
            }
        }
        for (canonical, alias) in ALIASES {
            if catalog.names.contains(*canonical) {
                catalog.names.insert((*alias).to_string());
            }
        }
        catalog
    }

    pub fn builtin() -> Self {
        Self::parse(&BUILTIN_SIGNATURES.join("\n"))
    }

    /// Load the catalog file. Never fails: unreadable or empty files fall
    /// back to the built-in set.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let catalog = Self::parse(&text);
                if catalog.is_empty() {
                    tracing::warn!(
                        "No operators found in {}, using built-in catalog",
                        path.display()
                    );
                    Self::builtin()
                } else {
                    tracing::info!(
                        "Loaded {} operators from {}",
                        catalog.len(),
                        path.display()
                    );
                    catalog
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Cannot read operator list {}: {e}. Using built-in catalog",
                    path.display()
                );
                Self::builtin()
            }
        }
    }

    fn insert(&mut self, name: &str, signature: &str) {
        if self.names.insert(name.to_string()) {
            self.operators.push(Operator {
                name: name.to_string(),
                signature: signature.to_string(),
            });
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Signature list embedded in model prompts, one per line.
    pub fn render(&self) -> String {
        self.operators
            .iter()
            .map(|op| format!("- {}", op.signature))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
