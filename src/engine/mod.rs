//! Analysis engine seam.
//!
//! [`AnalysisEngine`] is the interface a linguistic engine exposes to the
//! checker. [`CheckEngine`] owns one for the length of a session, restricts
//! it to dictionary-based spelling rules, feeds it the session's ignore
//! words and shuts it down when dropped.

pub mod builtin;
pub mod dictionary;
pub mod suggestions;
pub mod tokenizer;

#[cfg(test)]
pub(crate) mod testing;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

pub use builtin::DictionaryEngine;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown rule: {0}")]
    UnknownRule(String),

    #[error("rule {0} does not accept ignore tokens")]
    NotASpellingRule(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Spelling backed by a word list; the only kind left enabled.
    DictionarySpelling,
    /// Spelling rule that works without a dictionary (patterns, heuristics).
    Spelling,
    Grammar,
    Style,
}

impl RuleKind {
    pub fn is_spelling(self) -> bool {
        matches!(self, RuleKind::DictionarySpelling | RuleKind::Spelling)
    }

    pub fn is_dictionary_based_spelling(self) -> bool {
        self == RuleKind::DictionarySpelling
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleInfo {
    pub id: String,
    pub kind: RuleKind,
    pub description: String,
}

impl RuleInfo {
    pub fn new(id: impl Into<String>, kind: RuleKind, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            description: description.into(),
        }
    }
}

/// One potential error reported by an engine for a text span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Character offset of the flagged span within the checked text.
    pub offset: usize,
    /// Length of the flagged span in characters.
    pub length: usize,
    pub rule_id: String,
    pub message: String,
    pub suggestions: Vec<String>,
}

impl Match {
    /// The flagged span within `text`.
    pub fn covered<'t>(&self, text: &'t str) -> &'t str {
        let start = char_to_byte(text, self.offset);
        let end = char_to_byte(text, self.offset + self.length);
        &text[start..end]
    }

    /// `text` before the flagged span.
    pub fn head<'t>(&self, text: &'t str) -> &'t str {
        &text[..char_to_byte(text, self.offset)]
    }

    /// `text` from the start of the flagged span to its end.
    pub fn tail<'t>(&self, text: &'t str) -> &'t str {
        &text[char_to_byte(text, self.offset)..]
    }
}

fn char_to_byte(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// A linguistic analysis engine.
pub trait AnalysisEngine {
    /// Every rule currently enabled.
    fn all_active_rules(&self) -> Vec<RuleInfo>;

    fn disable_rule(&mut self, id: &str);

    /// Register tokens a spelling rule must never flag.
    fn add_ignore_tokens(&mut self, rule_id: &str, tokens: &[String]) -> Result<(), EngineError>;

    fn check(&mut self, text: &str) -> Result<Vec<Match>, EngineError>;

    /// Release resources held by the engine.
    fn shutdown(&mut self) {}
}

impl<E: AnalysisEngine + ?Sized> AnalysisEngine for Box<E> {
    fn all_active_rules(&self) -> Vec<RuleInfo> {
        (**self).all_active_rules()
    }

    fn disable_rule(&mut self, id: &str) {
        (**self).disable_rule(id)
    }

    fn add_ignore_tokens(&mut self, rule_id: &str, tokens: &[String]) -> Result<(), EngineError> {
        (**self).add_ignore_tokens(rule_id, tokens)
    }

    fn check(&mut self, text: &str) -> Result<Vec<Match>, EngineError> {
        (**self).check(text)
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}

/// An engine configured for one spell-checking session.
pub struct CheckEngine<E: AnalysisEngine> {
    engine: E,
}

impl<E: AnalysisEngine> CheckEngine<E> {
    /// Disable every rule that is not dictionary-based spelling, then
    /// register `ignore_words` with each remaining spelling rule.
    ///
    /// The engine is shut down if configuration fails.
    pub fn configure(engine: E, ignore_words: &[String]) -> Result<Self, EngineError> {
        let mut adapter = Self { engine };

        for rule in adapter.engine.all_active_rules() {
            if !rule.kind.is_dictionary_based_spelling() {
                debug!("Disabling {:?} rule {}", rule.kind, rule.id);
                adapter.engine.disable_rule(&rule.id);
            }
        }

        for rule in adapter.engine.all_active_rules() {
            if rule.kind.is_spelling() {
                adapter.engine.add_ignore_tokens(&rule.id, ignore_words)?;
            }
        }

        Ok(adapter)
    }

    pub fn check(&mut self, text: &str) -> Result<Vec<Match>, EngineError> {
        trace!("Checking {} characters", text.chars().count());
        self.engine.check(text)
    }

    pub fn active_rules(&self) -> Vec<RuleInfo> {
        self.engine.all_active_rules()
    }
}

impl<E: AnalysisEngine> Drop for CheckEngine<E> {
    fn drop(&mut self) {
        self.engine.shutdown();
    }
}
