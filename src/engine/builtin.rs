//! Dictionary-backed analysis engine.

use crate::config::Config;
use crate::engine::dictionary::Dictionary;
use crate::engine::tokenizer::{self, Token};
use crate::engine::{suggestions, AnalysisEngine, EngineError, Match, RuleInfo, RuleKind};
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::ops::Range;
use tracing::{debug, warn};

pub const WORD_REPETITION: &str = "WORD_REPETITION";
pub const UPPERCASE_SENTENCE_START: &str = "UPPERCASE_SENTENCE_START";

const SPELLING_MESSAGE: &str = "Possible spelling mistake found.";

pub struct DictionaryEngine {
    spelling_rule: String,
    dictionary: Dictionary,
    personal_words: HashSet<String>,
    ignore_patterns: Vec<Regex>,
    ignore_tokens: HashSet<String>,
    disabled: HashSet<String>,
    max_suggestions: usize,
}

impl DictionaryEngine {
    /// Build an engine from the installed dictionary for `config.language`
    /// plus the configured personal dictionary and ignore patterns.
    pub fn new(config: &Config) -> Result<Self> {
        let dictionary = Dictionary::load(&config.language)?;
        let mut engine = Self::with_dictionary(&config.language, dictionary);
        engine.max_suggestions = config.max_suggestions;

        if let Some(personal_dict_path) = &config.personal_dictionary {
            if personal_dict_path.exists() {
                let content = fs::read_to_string(personal_dict_path)
                    .context("Failed to read personal dictionary")?;
                for line in content.lines() {
                    let word = line.trim();
                    if !word.is_empty() && !word.starts_with('#') {
                        engine.personal_words.insert(word.to_lowercase());
                    }
                }
            }
        }

        for pattern in &config.ignore_patterns {
            match Regex::new(pattern) {
                Ok(re) => engine.ignore_patterns.push(re),
                Err(e) => warn!("Invalid regex pattern '{}': {}", pattern, e),
            }
        }

        Ok(engine)
    }

    pub fn with_dictionary(language: &str, dictionary: Dictionary) -> Self {
        Self {
            spelling_rule: format!("SPELLING_{}", language.to_uppercase()),
            dictionary,
            personal_words: HashSet::new(),
            ignore_patterns: Vec::new(),
            ignore_tokens: HashSet::new(),
            disabled: HashSet::new(),
            max_suggestions: 5,
        }
    }

    pub fn spelling_rule_id(&self) -> &str {
        &self.spelling_rule
    }

    fn rules(&self) -> Vec<RuleInfo> {
        vec![
            RuleInfo::new(
                self.spelling_rule.clone(),
                RuleKind::DictionarySpelling,
                "Words not found in the dictionary",
            ),
            RuleInfo::new(WORD_REPETITION, RuleKind::Grammar, "The same word twice in a row"),
            RuleInfo::new(
                UPPERCASE_SENTENCE_START,
                RuleKind::Style,
                "Text starting with a lowercase letter",
            ),
        ]
    }

    fn is_enabled(&self, id: &str) -> bool {
        !self.disabled.contains(id)
    }

    fn is_misspelled(&self, word: &str) -> bool {
        if self.ignore_tokens.contains(word) {
            return false;
        }
        if word.chars().count() <= 1 || word.chars().any(|c| c.is_numeric()) {
            return false;
        }

        let lower = word.to_lowercase().replace('\u{2019}', "'");
        if self.personal_words.contains(&lower) || self.dictionary.contains(&lower) {
            return false;
        }
        match lower.strip_suffix("'s") {
            Some(stem) => !self.dictionary.contains(stem) && !self.personal_words.contains(stem),
            None => true,
        }
    }

    fn ignored_ranges(&self, text: &str) -> Vec<Range<usize>> {
        self.ignore_patterns
            .iter()
            .flat_map(|re| re.find_iter(text).map(|m| m.range()))
            .collect()
    }

    fn check_spelling(&self, text: &str, tokens: &[Token<'_>], matches: &mut Vec<Match>) {
        let ignored = self.ignored_ranges(text);

        for token in tokens {
            let covered = ignored
                .iter()
                .any(|r| r.start < token.byte_end() && token.byte_offset < r.end);
            if covered || !self.is_misspelled(token.text) {
                continue;
            }

            let lower = token.text.to_lowercase();
            let suggestions = suggestions::generate(&lower, &self.dictionary, self.max_suggestions)
                .into_iter()
                .map(|s| suggestions::match_case(token.text, &s))
                .collect();

            matches.push(Match {
                offset: token.char_offset,
                length: token.char_len(),
                rule_id: self.spelling_rule.clone(),
                message: SPELLING_MESSAGE.to_string(),
                suggestions,
            });
        }
    }

    fn check_repetition(text: &str, tokens: &[Token<'_>], matches: &mut Vec<Match>) {
        for pair in tokens.windows(2) {
            let (first, second) = (&pair[0], &pair[1]);
            let between = &text[first.byte_end()..second.byte_offset];
            if between.trim().is_empty() && first.text.eq_ignore_ascii_case(second.text) {
                matches.push(Match {
                    offset: second.char_offset,
                    length: second.char_len(),
                    rule_id: WORD_REPETITION.to_string(),
                    message: "Possible typo: you repeated a word.".to_string(),
                    suggestions: Vec::new(),
                });
            }
        }
    }

    fn check_sentence_start(tokens: &[Token<'_>], matches: &mut Vec<Match>) {
        if let Some(first) = tokens.first() {
            if first.text.chars().next().map_or(false, char::is_lowercase) {
                matches.push(Match {
                    offset: first.char_offset,
                    length: first.char_len(),
                    rule_id: UPPERCASE_SENTENCE_START.to_string(),
                    message: "This sentence does not start with an uppercase letter.".to_string(),
                    suggestions: vec![suggestions::match_case("X", first.text)],
                });
            }
        }
    }
}

impl AnalysisEngine for DictionaryEngine {
    fn all_active_rules(&self) -> Vec<RuleInfo> {
        self.rules()
            .into_iter()
            .filter(|r| self.is_enabled(&r.id))
            .collect()
    }

    fn disable_rule(&mut self, id: &str) {
        self.disabled.insert(id.to_string());
    }

    fn add_ignore_tokens(&mut self, rule_id: &str, tokens: &[String]) -> Result<(), EngineError> {
        let rule = self
            .rules()
            .into_iter()
            .find(|r| r.id == rule_id)
            .ok_or_else(|| EngineError::UnknownRule(rule_id.to_string()))?;
        if !rule.kind.is_spelling() {
            return Err(EngineError::NotASpellingRule(rule_id.to_string()));
        }

        self.ignore_tokens.extend(tokens.iter().cloned());
        Ok(())
    }

    fn check(&mut self, text: &str) -> Result<Vec<Match>, EngineError> {
        let tokens = tokenizer::words(text);
        let mut matches = Vec::new();

        if self.is_enabled(&self.spelling_rule) {
            self.check_spelling(text, &tokens, &mut matches);
        }
        if self.is_enabled(WORD_REPETITION) {
            Self::check_repetition(text, &tokens, &mut matches);
        }
        if self.is_enabled(UPPERCASE_SENTENCE_START) {
            Self::check_sentence_start(&tokens, &mut matches);
        }

        matches.sort_by_key(|m| m.offset);
        Ok(matches)
    }

    fn shutdown(&mut self) {
        debug!("Shutting down {} engine", self.spelling_rule);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> DictionaryEngine {
        let dict = Dictionary::from_words(&[
            "this", "is", "a", "correct", "sentence", "example", "manual", "the", "user",
            "guide", "see",
        ])
        .unwrap();
        DictionaryEngine::with_dictionary("en_US", dict)
    }

    #[test]
    fn test_flags_unknown_words_with_suggestions() {
        let mut engine = engine();
        let matches = engine.check("This is a correct sentnce.").unwrap();

        let spelling: Vec<&Match> = matches
            .iter()
            .filter(|m| m.rule_id == "SPELLING_EN_US")
            .collect();
        assert_eq!(spelling.len(), 1);
        assert_eq!(spelling[0].offset, 18);
        assert_eq!(spelling[0].length, 7);
        assert_eq!(spelling[0].message, SPELLING_MESSAGE);
        assert!(spelling[0].suggestions.contains(&"sentence".to_string()));
    }

    #[test]
    fn test_suggestions_keep_capitalization() {
        let mut engine = engine();
        let matches = engine.check("Exmaple Manual").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].suggestions.first().map(String::as_str), Some("Example"));
    }

    #[test]
    fn test_ignore_tokens_are_exact() {
        let mut engine = engine();
        let rule = engine.spelling_rule_id().to_string();
        engine
            .add_ignore_tokens(&rule, &["statusExplanation".to_string()])
            .unwrap();

        assert!(engine.check("The statusExplanation").unwrap().is_empty());
        assert_eq!(engine.check("The statusexplanation").unwrap().len(), 1);
    }

    #[test]
    fn test_ignore_tokens_rejected_for_grammar_rules() {
        let mut engine = engine();
        assert!(matches!(
            engine.add_ignore_tokens(WORD_REPETITION, &[]),
            Err(EngineError::NotASpellingRule(_))
        ));
        assert!(matches!(
            engine.add_ignore_tokens("NOPE", &[]),
            Err(EngineError::UnknownRule(_))
        ));
    }

    #[test]
    fn test_non_spelling_rules_until_disabled() {
        let mut engine = engine();
        let found: Vec<String> = engine
            .check("the the guide")
            .unwrap()
            .into_iter()
            .map(|m| m.rule_id)
            .collect();
        assert!(found.contains(&WORD_REPETITION.to_string()));
        assert!(found.contains(&UPPERCASE_SENTENCE_START.to_string()));

        engine.disable_rule(WORD_REPETITION);
        engine.disable_rule(UPPERCASE_SENTENCE_START);
        assert!(engine.check("the the guide").unwrap().is_empty());
        assert_eq!(engine.all_active_rules().len(), 1);
    }

    #[test]
    fn test_skips_numbers_possessives_and_patterns() {
        let mut engine = engine();
        engine
            .ignore_patterns
            .push(Regex::new(r"https?://\S+").unwrap());

        assert!(engine.check("The user's guide").unwrap().is_empty());
        assert!(engine.check("This is a v2 example").unwrap().is_empty());
        assert!(engine.check("See https://exmaple.org").unwrap().is_empty());
    }
}
