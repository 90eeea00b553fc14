//! Scriptable in-memory engine for tests.

use super::{AnalysisEngine, EngineError, Match, RuleInfo, RuleKind};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

#[derive(Debug, Default)]
pub(crate) struct EngineState {
    pub checked: Vec<String>,
    pub disabled: Vec<String>,
    pub ignore_tokens: HashMap<String, Vec<String>>,
    pub shut_down: bool,
}

/// Flags every word in its misspelling list and records each call so tests
/// can inspect what the checker sent.
pub(crate) struct ScriptedEngine {
    rules: Vec<RuleInfo>,
    misspelled: HashSet<String>,
    fail_on: Option<String>,
    reject_ignore_tokens: bool,
    state: Rc<RefCell<EngineState>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            rules: vec![
                RuleInfo::new("SPELLING", RuleKind::DictionarySpelling, "dictionary spelling"),
                RuleInfo::new("PATTERN_SPELLING", RuleKind::Spelling, "pattern spelling"),
                RuleInfo::new("GRAMMAR", RuleKind::Grammar, "grammar"),
            ],
            misspelled: HashSet::new(),
            fail_on: None,
            reject_ignore_tokens: false,
            state: Rc::new(RefCell::new(EngineState::default())),
        }
    }

    pub fn misspelling(mut self, words: &[&str]) -> Self {
        self.misspelled.extend(words.iter().map(|w| w.to_string()));
        self
    }

    /// Fail any check whose text contains `needle`.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn rejecting_ignore_tokens(mut self) -> Self {
        self.reject_ignore_tokens = true;
        self
    }

    pub fn state_handle(&self) -> Rc<RefCell<EngineState>> {
        Rc::clone(&self.state)
    }

    fn is_ignored(&self, word: &str) -> bool {
        self.state
            .borrow()
            .ignore_tokens
            .values()
            .any(|tokens| tokens.iter().any(|t| t == word))
    }
}

impl AnalysisEngine for ScriptedEngine {
    fn all_active_rules(&self) -> Vec<RuleInfo> {
        let state = self.state.borrow();
        self.rules
            .iter()
            .filter(|r| !state.disabled.contains(&r.id))
            .cloned()
            .collect()
    }

    fn disable_rule(&mut self, id: &str) {
        self.state.borrow_mut().disabled.push(id.to_string());
    }

    fn add_ignore_tokens(&mut self, rule_id: &str, tokens: &[String]) -> Result<(), EngineError> {
        if self.reject_ignore_tokens {
            return Err(EngineError::NotASpellingRule(rule_id.to_string()));
        }
        self.state
            .borrow_mut()
            .ignore_tokens
            .entry(rule_id.to_string())
            .or_default()
            .extend(tokens.iter().cloned());
        Ok(())
    }

    fn check(&mut self, text: &str) -> Result<Vec<Match>, EngineError> {
        self.state.borrow_mut().checked.push(text.to_string());

        if let Some(needle) = &self.fail_on {
            if text.contains(needle.as_str()) {
                return Err(EngineError::Internal(format!("cannot process '{}'", needle)));
            }
        }

        let mut matches = Vec::new();
        let mut offset = 0;
        for (i, word) in text.split(' ').enumerate() {
            if i > 0 {
                offset += 1;
            }
            let token = word.trim_matches(|c: char| !c.is_alphanumeric());
            if self.misspelled.contains(token) && !self.is_ignored(token) {
                let lead = word.chars().take_while(|c| !c.is_alphanumeric()).count();
                matches.push(Match {
                    offset: offset + lead,
                    length: token.chars().count(),
                    rule_id: "SPELLING".to_string(),
                    message: "Possible spelling mistake found.".to_string(),
                    suggestions: Vec::new(),
                });
            }
            offset += word.chars().count();
        }

        Ok(matches)
    }

    fn shutdown(&mut self) {
        self.state.borrow_mut().shut_down = true;
    }
}
