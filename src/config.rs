use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const LOCAL_CONFIG_FILE: &str = ".adocspell.toml";

/// Persistent settings: defaults < global config < local config < CLI.
/// Document attributes are applied later, per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub language: String,
    pub personal_dictionary: Option<PathBuf>,
    pub ignore_patterns: Vec<String>,

    /// Words never reported, in addition to each document's own list.
    pub words_to_ignore: Vec<String>,

    /// Block kinds whose text is not checked. Extends the default `listing`.
    pub skip_blocks: Vec<String>,

    pub max_suggestions: usize,

    /// Stop checking a document once this many mistakes were found.
    pub max_mistakes: Option<usize>,

    /// Skip fragments the engine fails on instead of aborting the document.
    pub skip_engine_failures: bool,
}

fn default_max_suggestions() -> usize {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: "en_US".to_string(),
            personal_dictionary: None,
            ignore_patterns: vec![
                r"\b[A-Z0-9_]{2,}\b".to_string(),    // ALL_CAPS
                r"https?://\S+".to_string(),         // URLs
                r"\b[a-fA-F0-9]{32,}\b".to_string(), // Hashes
                r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}".to_string(), // Emails
            ],
            words_to_ignore: Vec::new(),
            skip_blocks: Vec::new(),
            max_suggestions: default_max_suggestions(),
            max_mistakes: None,
            skip_engine_failures: false,
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub language: Option<String>,
    pub personal_dictionary: Option<PathBuf>,
    pub ignore_patterns: Vec<String>,
    pub words_to_ignore: Vec<String>,
    pub skip_blocks: Vec<String>,
    pub max_mistakes: Option<usize>,
    pub skip_engine_failures: bool,
}

impl Config {
    /// Load configuration with priority: CLI args > local config > global config > defaults
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let mut config = Self::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global_config = Self::from_file(&global_path)?;
                config = config.merge(global_config);
            }
        }

        let local_path = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_path.exists() {
            let local_config = Self::from_file(&local_path)?;
            config = config.merge(local_config);
        }

        Ok(config.apply(overrides))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn merge(mut self, other: Self) -> Self {
        // Merge logic: other's values override self's if they differ from defaults
        if other.language != "en_US" {
            self.language = other.language;
        }
        if other.personal_dictionary.is_some() {
            self.personal_dictionary = other.personal_dictionary;
        }
        if !other.ignore_patterns.is_empty() {
            self.ignore_patterns = other.ignore_patterns;
        }
        self.words_to_ignore.extend(other.words_to_ignore);
        self.skip_blocks.extend(other.skip_blocks);
        if other.max_suggestions != default_max_suggestions() {
            self.max_suggestions = other.max_suggestions;
        }
        if other.max_mistakes.is_some() {
            self.max_mistakes = other.max_mistakes;
        }
        self.skip_engine_failures |= other.skip_engine_failures;
        self
    }

    fn apply(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(language) = overrides.language {
            self.language = language;
        }
        if let Some(dict) = overrides.personal_dictionary {
            self.personal_dictionary = Some(dict);
        }
        self.ignore_patterns.extend(overrides.ignore_patterns);
        self.words_to_ignore.extend(overrides.words_to_ignore);
        self.skip_blocks.extend(overrides.skip_blocks);
        if overrides.max_mistakes.is_some() {
            self.max_mistakes = overrides.max_mistakes;
        }
        self.skip_engine_failures |= overrides.skip_engine_failures;

        if self.personal_dictionary.is_none() {
            self.personal_dictionary = Self::default_personal_dict_path();
        }
        self
    }

    pub fn global_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "adocspell").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn default_personal_dict_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "adocspell").map(|dirs| dirs.config_dir().join("personal.txt"))
    }

    pub fn data_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "adocspell").map(|dirs| dirs.data_dir().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.language, "en_US");
        assert_eq!(config.max_suggestions, 5);
        assert!(config.max_mistakes.is_none());
        assert!(!config.skip_engine_failures);
    }

    #[test]
    fn test_merge_configs() {
        let base = Config {
            words_to_ignore: vec!["foo".to_string()],
            ..Default::default()
        };
        let override_config = Config {
            language: "en_GB".to_string(),
            words_to_ignore: vec!["bar".to_string()],
            max_mistakes: Some(10),
            ..Default::default()
        };

        let merged = base.merge(override_config);
        assert_eq!(merged.language, "en_GB");
        assert_eq!(merged.words_to_ignore, vec!["foo", "bar"]);
        assert_eq!(merged.max_mistakes, Some(10));
    }

    #[test]
    fn test_cli_overrides_win() {
        let config = Config::default().apply(ConfigOverrides {
            language: Some("en_GB".to_string()),
            skip_blocks: vec!["literal".to_string()],
            skip_engine_failures: true,
            ..Default::default()
        });
        assert_eq!(config.language, "en_GB");
        assert_eq!(config.skip_blocks, vec!["literal"]);
        assert!(config.skip_engine_failures);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCAL_CONFIG_FILE);
        fs::write(
            &path,
            "language = \"en_GB\"\nwords_to_ignore = [\"asciidoctor\"]\nmax_mistakes = 3\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.language, "en_GB");
        assert_eq!(config.words_to_ignore, vec!["asciidoctor"]);
        assert_eq!(config.max_mistakes, Some(3));
        assert_eq!(config.max_suggestions, 5);
    }
}
