// src/suggest/parser.rs — Extract suggestions from free-form model output
//
// Model output format is not fixed, so parsing runs an ordered chain of
// dialect strategies. A dialect that recognises nothing passes to the next
// one; a dialect that recognises a wrong number of suggestions ends the chain
// early. The chain always terminates at the template fallback, which is total.

use std::sync::OnceLock;

use pulldown_cmark::{CodeBlockKind, Event, Parser as MarkdownParser, Tag, TagEnd};
use regex::Regex;

use super::templates::{default_suggestions, SUGGESTION_COUNT};
use crate::core::types::Suggestion;

/// Result of one strategy over the raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// The dialect found nothing it recognises.
    NoMatch,
    /// The dialect matched but produced the wrong number of suggestions.
    Malformed { extracted: usize },
    /// Exactly [`SUGGESTION_COUNT`] suggestions.
    Complete(Vec<Suggestion>),
}

impl ParseOutcome {
    fn from_extracted(suggestions: Vec<Suggestion>) -> Self {
        match suggestions.len() {
            0 => ParseOutcome::NoMatch,
            SUGGESTION_COUNT => ParseOutcome::Complete(suggestions),
            extracted => ParseOutcome::Malformed { extracted },
        }
    }
}

pub trait ParseStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn try_parse(&self, text: &str, original_factor: &str) -> ParseOutcome;
}

/// Suggestions chosen by the chain and the strategy that produced them.
#[derive(Debug, Clone)]
pub struct ParsedSuggestions {
    pub suggestions: Vec<Suggestion>,
    pub strategy: &'static str,
}

impl ParsedSuggestions {
    pub fn is_fallback(&self) -> bool {
        self.strategy == TemplateFallback::NAME
    }
}

pub struct SuggestionParser {
    /// Dialects in order, always ending with [`TemplateFallback`].
    chain: Vec<Box<dyn ParseStrategy>>,
}

impl Default for SuggestionParser {
    fn default() -> Self {
        Self::with_dialects(vec![Box::new(SectionedDialect), Box::new(InlineBoldDialect)])
    }
}

impl SuggestionParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a chain from `dialects`; [`TemplateFallback`] is appended as the
    /// terminal strategy.
    pub fn with_dialects(mut dialects: Vec<Box<dyn ParseStrategy>>) -> Self {
        dialects.push(Box::new(TemplateFallback));
        Self { chain: dialects }
    }

    /// Always returns exactly [`SUGGESTION_COUNT`] suggestions.
    pub fn parse(&self, text: &str, original_factor: &str) -> ParsedSuggestions {
        let terminal = self.chain.len().saturating_sub(1);
        let mut next = 0;

        while let Some(strategy) = self.chain.get(next) {
            match strategy.try_parse(text, original_factor) {
                ParseOutcome::Complete(suggestions) => {
                    tracing::debug!(strategy = strategy.name(), "parsed model suggestions");
                    return ParsedSuggestions {
                        suggestions,
                        strategy: strategy.name(),
                    };
                }
                ParseOutcome::NoMatch => next += 1,
                ParseOutcome::Malformed { extracted } => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        extracted,
                        "expected {} suggestions, falling back to templates",
                        SUGGESTION_COUNT
                    );
                    next = terminal.max(next + 1);
                }
            }
        }

        // Only reachable if the terminal strategy stops being total
        ParsedSuggestions {
            suggestions: default_suggestions(original_factor),
            strategy: TemplateFallback::NAME,
        }
    }
}

// ─── Shared patterns ────────────────────────────────────────────────────────

fn section_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?im)^[ \t]*#{1,6}[ \t]*\**[ \t]*(?:suggestion|建议)[ \t]*#?(\d+)[ \t]*[:：]")
            .expect("static regex is valid")
    })
}

fn bold_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\*\*[ \t]*(?:suggestion|建议)[ \t]*#?\d*[ \t]*\**[ \t]*[:：](.*)$")
            .expect("static regex is valid")
    })
}

fn expression_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:improved factor|改进后因子)\**[ \t]*[:：](.*)")
            .expect("static regex is valid")
    })
}

fn starts_with_label(line: &str) -> bool {
    let bare = line.trim_start_matches(['*', '-', '>', ' ', '\t']);
    expression_label()
        .find(bare)
        .is_some_and(|m| m.start() == 0)
}

/// Strip markdown emphasis and inline code ticks around a captured value.
fn clean(value: &str) -> String {
    value
        .trim()
        .trim_matches('*')
        .trim()
        .trim_matches('`')
        .trim()
        .to_string()
}

// ─── Dialect A: sectioned / fenced ──────────────────────────────────────────

/// `### Suggestion N: rationale` sections, each carrying the expression in a
/// fenced code block or on an `Improved factor:` line.
pub struct SectionedDialect;

impl SectionedDialect {
    fn parse_section(section: &str) -> Option<Suggestion> {
        let description = section
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with("```") && !starts_with_label(line))
            .map(clean)?;

        let expression = first_fenced_block(section).or_else(|| {
            expression_label()
                .captures(section)
                .map(|caps| clean(&caps[1]))
        })?;

        if description.is_empty() || expression.is_empty() {
            return None;
        }
        Some(Suggestion::new(description, expression))
    }
}

impl ParseStrategy for SectionedDialect {
    fn name(&self) -> &'static str {
        "sectioned"
    }

    fn try_parse(&self, text: &str, _original_factor: &str) -> ParseOutcome {
        let markers: Vec<_> = section_marker().find_iter(text).collect();
        let suggestions = markers
            .iter()
            .enumerate()
            .filter_map(|(i, marker)| {
                let end = markers.get(i + 1).map_or(text.len(), |next| next.start());
                Self::parse_section(&text[marker.end()..end])
            })
            .collect();
        ParseOutcome::from_extracted(suggestions)
    }
}

/// Content of the first non-empty fenced code block, trimmed.
fn first_fenced_block(markdown: &str) -> Option<String> {
    let mut in_block = false;
    let mut code = String::new();

    for event in MarkdownParser::new(markdown) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(_))) => {
                in_block = true;
                code.clear();
            }
            Event::Text(text) if in_block => code.push_str(&text),
            Event::End(TagEnd::CodeBlock) if in_block => {
                in_block = false;
                let trimmed = code.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
            _ => {}
        }
    }
    None
}

// ─── Dialect B: inline bold / legacy ────────────────────────────────────────

/// `**Suggestion N: rationale**` (or `**Suggestion N**: rationale`) headers followed by a fenced block (lines
/// joined by spaces) or an `Improved factor:` line.
pub struct InlineBoldDialect;

#[derive(Default)]
struct Pending {
    description: String,
    expression: String,
}

impl Pending {
    fn finish(self) -> Option<Suggestion> {
        if self.description.is_empty() || self.expression.is_empty() {
            None
        } else {
            Some(Suggestion::new(self.description, self.expression))
        }
    }
}

impl ParseStrategy for InlineBoldDialect {
    fn name(&self) -> &'static str {
        "inline-bold"
    }

    fn try_parse(&self, text: &str, _original_factor: &str) -> ParseOutcome {
        let mut suggestions = Vec::new();
        let mut current: Option<Pending> = None;
        let mut in_code = false;
        let mut code = String::new();

        for line in text.lines().map(str::trim) {
            if let Some(caps) = bold_header().captures(line) {
                if let Some(done) = current.take().and_then(Pending::finish) {
                    suggestions.push(done);
                }
                current = Some(Pending {
                    description: clean(&caps[1].replace("**", "")),
                    expression: String::new(),
                });
                in_code = false;
                code.clear();
            } else if line.starts_with("```") {
                if in_code {
                    in_code = false;
                    if let Some(pending) = current.as_mut().filter(|_| !code.is_empty()) {
                        pending.expression = std::mem::take(&mut code);
                    }
                } else {
                    in_code = true;
                    code.clear();
                }
            } else if in_code {
                if !line.is_empty() {
                    if !code.is_empty() {
                        code.push(' ');
                    }
                    code.push_str(line);
                }
            } else if starts_with_label(line) {
                if let (Some(pending), Some(caps)) =
                    (current.as_mut(), expression_label().captures(line))
                {
                    let expr = clean(&caps[1]);
                    if !expr.is_empty() {
                        pending.expression = expr;
                    }
                }
            }
        }

        if let Some(done) = current.and_then(Pending::finish) {
            suggestions.push(done);
        }
        ParseOutcome::from_extracted(suggestions)
    }
}

// ─── Terminal strategy ──────────────────────────────────────────────────────

/// Total strategy: the deterministic templates around the original factor.
pub struct TemplateFallback;

impl TemplateFallback {
    pub const NAME: &'static str = "templates";
}

impl ParseStrategy for TemplateFallback {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn try_parse(&self, _text: &str, original_factor: &str) -> ParseOutcome {
        ParseOutcome::Complete(default_suggestions(original_factor))
    }
}
