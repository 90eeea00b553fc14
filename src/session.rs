//! One spell-checking session over one document.

use crate::ast::AstNode;
use crate::diagnostics::{Diagnostic, DiagnosticCollector};
use crate::engine::{AnalysisEngine, CheckEngine, EngineError};
use crate::error::CheckError;
use crate::walker::TreeWalker;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

pub const WORDS_TO_IGNORE_ATTR: &str = "spellchecker-words-to-ignore";
pub const SKIP_BLOCKS_ATTR: &str = "spellchecker-skip-blocks";
pub const MAX_MISTAKES_ATTR: &str = "spellchecker-max-mistakes";
pub const ON_ENGINE_FAILURE_ATTR: &str = "spellchecker-on-engine-failure";

pub const DEFAULT_SKIP_BLOCKS: &[&str] = &["listing"];

/// What to do when the engine cannot check a fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineFailurePolicy {
    /// Fail the whole session.
    #[default]
    Abort,
    /// Log the failure and continue with the next fragment.
    Skip,
}

/// Per-session settings, fixed before the walk starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub words_to_ignore: Vec<String>,
    pub skip_blocks: BTreeSet<String>,
    pub max_diagnostics: Option<usize>,
    pub on_engine_failure: EngineFailurePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            words_to_ignore: Vec::new(),
            skip_blocks: DEFAULT_SKIP_BLOCKS.iter().map(|s| s.to_string()).collect(),
            max_diagnostics: None,
            on_engine_failure: EngineFailurePolicy::Abort,
        }
    }
}

impl SessionConfig {
    /// Read the `spellchecker-*` attributes of `document`.
    ///
    /// Word lists may be JSON arrays of strings or strings separated by
    /// commas and/or whitespace. Any other shape is a configuration error.
    pub fn from_document(document: &AstNode) -> Result<Self, CheckError> {
        Self::resolve(document, &SessionOverrides::default())
    }

    /// Document attributes layered over host-level settings.
    ///
    /// Ignore words and skip kinds from both sides are combined. The limit
    /// and the failure policy come from the document when it sets them.
    pub fn resolve(document: &AstNode, overrides: &SessionOverrides) -> Result<Self, CheckError> {
        let mut config = Self::default();

        if let Some(value) = document.attribute(WORDS_TO_IGNORE_ATTR) {
            config.words_to_ignore = word_list(WORDS_TO_IGNORE_ATTR, value)?;
        }
        if let Some(value) = document.attribute(SKIP_BLOCKS_ATTR) {
            config.skip_blocks = word_list(SKIP_BLOCKS_ATTR, value)?.into_iter().collect();
        }
        config.max_diagnostics = match document.attribute(MAX_MISTAKES_ATTR) {
            Some(value) => limit(value)?.or(overrides.max_diagnostics),
            None => overrides.max_diagnostics,
        };
        config.on_engine_failure = match document.attribute(ON_ENGINE_FAILURE_ATTR) {
            Some(value) => failure_policy(value)?,
            None => overrides.on_engine_failure.unwrap_or_default(),
        };

        config
            .words_to_ignore
            .extend(overrides.words_to_ignore.iter().cloned());
        config.words_to_ignore = dedup(config.words_to_ignore);
        config
            .skip_blocks
            .extend(overrides.skip_blocks.iter().cloned());

        Ok(config)
    }
}

/// Settings supplied by the host rather than the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOverrides {
    pub words_to_ignore: Vec<String>,
    pub skip_blocks: Vec<String>,
    pub max_diagnostics: Option<usize>,
    pub on_engine_failure: Option<EngineFailurePolicy>,
}

impl From<&crate::config::Config> for SessionOverrides {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            words_to_ignore: config.words_to_ignore.clone(),
            skip_blocks: config.skip_blocks.clone(),
            max_diagnostics: config.max_mistakes,
            on_engine_failure: config
                .skip_engine_failures
                .then_some(EngineFailurePolicy::Skip),
        }
    }
}

fn dedup(words: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    words.into_iter().filter(|w| seen.insert(w.clone())).collect()
}

fn word_list(name: &str, value: &Value) -> Result<Vec<String>, CheckError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.trim().to_string()),
                other => Err(CheckError::config(format!(
                    "{} must contain only strings, found {}",
                    name, other
                ))),
            })
            .filter(|w| w.as_ref().map_or(true, |w| !w.is_empty()))
            .collect(),
        other => Err(CheckError::config(format!(
            "{} must be a list of words, found {}",
            name, other
        ))),
    }
}

fn limit(value: &Value) -> Result<Option<usize>, CheckError> {
    let invalid = || {
        CheckError::config(format!(
            "{} must be a non-negative integer, found {}",
            MAX_MISTAKES_ATTR, value
        ))
    };
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(invalid),
        Value::String(s) => s.trim().parse::<usize>().map(Some).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn failure_policy(value: &Value) -> Result<EngineFailurePolicy, CheckError> {
    match value.as_str().map(|s| s.trim().to_lowercase()).as_deref() {
        Some("abort") => Ok(EngineFailurePolicy::Abort),
        Some("skip") => Ok(EngineFailurePolicy::Skip),
        _ => Err(CheckError::config(format!(
            "{} must be 'abort' or 'skip', found {}",
            ON_ENGINE_FAILURE_ATTR, value
        ))),
    }
}

/// Everything a session found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub diagnostics: Vec<Diagnostic>,
    pub fragments_checked: usize,
    pub fragments_skipped: usize,
    /// Checking stopped at the configured mistake limit.
    pub truncated: bool,
}

impl SessionReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Creates a fresh engine for each session.
pub trait EngineFactory {
    type Engine: AnalysisEngine;

    fn create(&self) -> Result<Self::Engine, EngineError>;
}

impl<F, E> EngineFactory for F
where
    F: Fn() -> Result<E, EngineError>,
    E: AnalysisEngine,
{
    type Engine = E;

    fn create(&self) -> Result<E, EngineError> {
        self()
    }
}

/// Runs complete sessions: configuration, engine setup, walk.
pub struct SessionRunner<F> {
    factory: F,
    overrides: SessionOverrides,
}

impl<F: EngineFactory> SessionRunner<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            overrides: SessionOverrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: SessionOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Check `document` with a freshly built engine.
    ///
    /// On error nothing is returned for the document, including diagnostics
    /// found before the failure. The engine is shut down on every path.
    pub fn run(&self, document: &AstNode) -> Result<SessionReport, CheckError> {
        let config = SessionConfig::resolve(document, &self.overrides)?;
        let engine = self.factory.create().map_err(CheckError::EngineSetup)?;
        run_session(document, &config, engine)
    }
}

/// Configure `engine` for `config`, walk `document` and collect the results.
pub fn run_session<E: AnalysisEngine>(
    document: &AstNode,
    config: &SessionConfig,
    engine: E,
) -> Result<SessionReport, CheckError> {
    debug!(
        "Starting session: {} ignored words, skipping {:?}",
        config.words_to_ignore.len(),
        config.skip_blocks
    );

    let mut adapter =
        CheckEngine::configure(engine, &config.words_to_ignore).map_err(CheckError::EngineSetup)?;
    let mut collector = DiagnosticCollector::new();

    let stats = TreeWalker::new(&mut adapter, config, &mut collector).walk(document)?;

    debug!(
        "Session finished: {} nodes, {} fragments, {} diagnostics",
        stats.nodes_visited,
        stats.fragments_checked,
        collector.len()
    );

    Ok(SessionReport {
        diagnostics: collector.into_diagnostics(),
        fragments_checked: stats.fragments_checked,
        fragments_skipped: stats.fragments_skipped,
        truncated: stats.truncated,
    })
}
