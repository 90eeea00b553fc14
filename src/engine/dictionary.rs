use anyhow::{Context, Result};
use fst::{Automaton, IntoStreamer, Set, SetBuilder, Streamer};
use memmap2::Mmap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Backing bytes of an FST set: a mapped file or an in-memory build.
enum Storage {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl AsRef<[u8]> for Storage {
    fn as_ref(&self) -> &[u8] {
        match self {
            Storage::Mapped(map) => &map[..],
            Storage::Owned(bytes) => bytes.as_slice(),
        }
    }
}

/// A lowercase word list stored as an FST set.
pub struct Dictionary {
    set: Set<Storage>,
}

impl Dictionary {
    /// Load the installed dictionary for `language`, falling back to the
    /// small embedded word list when none is installed.
    pub fn load(language: &str) -> Result<Self> {
        let dict_path = Self::path_for(language)?;

        if !dict_path.exists() {
            warn!(
                "No dictionary installed for {}; using the embedded word list. Run `adocspell dict install {}`.",
                language, language
            );
            return Self::embedded(language);
        }

        Self::load_from_path(&dict_path)
    }

    /// Memory-map a dictionary file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open dictionary: {}", path.display()))?;

        // SAFETY: `build_from_words` writes a fresh file and renames it over
        // the old one, so a mapped dictionary is never truncated or rewritten.
        let map = unsafe { Mmap::map(&file) }
            .with_context(|| format!("Failed to map dictionary: {}", path.display()))?;
        let set = Set::new(Storage::Mapped(map)).context("Failed to parse dictionary")?;

        debug!("Loaded {} words from {}", set.len(), path.display());
        Ok(Self { set })
    }

    /// Build an in-memory dictionary.
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Result<Self> {
        let mut builder = SetBuilder::memory();
        for word in normalize(words) {
            builder
                .insert(word.as_bytes())
                .context("Failed to insert word into dictionary")?;
        }
        let bytes = builder.into_inner().context("Failed to finalize dictionary")?;
        let set = Set::new(Storage::Owned(bytes)).context("Failed to parse dictionary")?;
        Ok(Self { set })
    }

    /// Check if word exists in dictionary
    pub fn contains(&self, word: &str) -> bool {
        self.set.contains(word.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Get all words with a given prefix
    pub fn words_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut results = Vec::new();
        let mut stream = self
            .set
            .search(fst::automaton::Str::new(prefix).starts_with())
            .into_stream();

        while let Some(key) = stream.next() {
            if let Ok(word) = String::from_utf8(key.to_vec()) {
                results.push(word);
            }
        }

        results
    }

    /// Every word whose length in characters is within one of `len`.
    pub fn words_near_length(&self, len: usize, limit: usize) -> Vec<String> {
        let mut results = Vec::new();
        let mut stream = self.set.stream();

        while let Some(key) = stream.next() {
            if results.len() >= limit {
                break;
            }
            if let Ok(word) = std::str::from_utf8(key) {
                if word.chars().count().abs_diff(len) <= 1 {
                    results.push(word.to_string());
                }
            }
        }

        results
    }

    /// Write a dictionary file built from `words`.
    ///
    /// The set is built in a temporary file next to `output_path` and then
    /// renamed into place; an existing dictionary is replaced, never
    /// rewritten.
    pub fn build_from_words<S: AsRef<str>>(words: &[S], output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).context("Failed to create dictionary directory")?;
        }

        let file_name = output_path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid dictionary path: {}", output_path.display()))?;
        let tmp_path =
            output_path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()));

        if let Err(e) = Self::write_set(words, &tmp_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        fs::rename(&tmp_path, output_path).with_context(|| {
            format!("Failed to move dictionary into place: {}", output_path.display())
        })?;

        Ok(())
    }

    fn write_set<S: AsRef<str>>(words: &[S], path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create dictionary: {}", path.display()))?;

        let writer = BufWriter::new(file);
        let mut builder = SetBuilder::new(writer).context("Failed to create FST builder")?;

        for word in normalize(words) {
            builder
                .insert(word.as_bytes())
                .context("Failed to insert word into dictionary")?;
        }

        builder.finish().context("Failed to finalize dictionary")?;

        Ok(())
    }

    pub fn path_for(language: &str) -> Result<PathBuf> {
        let data_dir = crate::config::Config::data_dir().context("Failed to get data directory")?;
        Ok(data_dir.join(format!("{}.dict", language)))
    }

    fn embedded(language: &str) -> Result<Self> {
        Self::from_words(&basic_wordlist(language))
    }
}

/// Lowercase, sort and dedup, as FST insertion requires.
fn normalize<S: AsRef<str>>(words: &[S]) -> Vec<String> {
    let mut sorted: Vec<String> = words
        .iter()
        .map(|w| w.as_ref().trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();
    sorted.sort();
    sorted.dedup();
    sorted
}

/// Bootstrap list used until a real dictionary is installed.
fn basic_wordlist(language: &str) -> Vec<&'static str> {
    match language {
        "en_US" | "en_GB" => vec![
            "the", "be", "to", "of", "and", "a", "in", "that", "have", "i", "it", "for", "not",
            "on", "with", "he", "as", "you", "do", "at", "this", "but", "his", "by", "from",
            "they", "we", "say", "her", "she", "or", "an", "will", "my", "one", "all", "would",
            "there", "their", "what", "so", "up", "out", "if", "about", "who", "get", "which",
            "go", "me", "when", "make", "can", "like", "time", "no", "just", "him", "know",
            "take", "people", "into", "year", "your", "good", "some", "could", "them", "see",
            "other", "than", "then", "now", "look", "only", "come", "its", "over", "think",
            "also", "back", "after", "use", "two", "how", "our", "work", "first", "well", "way",
            "even", "new", "want", "because", "any", "these", "give", "day", "most", "us", "is",
            "are", "was", "were", "has", "had", "more", "each", "must", "should", "may",
            // Documentation vocabulary
            "document", "documentation", "manual", "guide", "example", "examples", "section",
            "chapter", "introduction", "intro", "overview", "usage", "install", "installation",
            "note", "warning", "tip", "table", "list", "item", "column", "row", "name", "value",
            "text", "sentence", "paragraph", "word", "words", "correct", "see", "following",
            "below", "above", "figure", "appendix", "reference", "index", "title", "content",
            // Programming vocabulary
            "function", "class", "method", "variable", "string", "integer", "boolean", "array",
            "dictionary", "object", "parameter", "return", "import", "export", "async", "await",
            "callback", "error", "exception", "test", "debug", "compile", "build", "deploy",
            "version", "configuration", "file", "code", "command", "option", "default",
        ],
        _ => vec!["the", "be", "to", "of", "and", "a", "in", "that", "have", "i"],
    }
}
