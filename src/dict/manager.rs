use crate::engine::dictionary::Dictionary;
use anyhow::{Context, Result};
use colored::*;
use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

// Pinned commit so installs are reproducible.
const WORDLIST_BASE_URL: &str =
    "https://raw.githubusercontent.com/dwyl/english-words/6e4bc58ad764c3e6df8b5be4048671962c9d6a23";

pub struct DictionaryInfo {
    pub language: String,
    pub path: PathBuf,
    pub word_count: usize,
    pub size_bytes: u64,
    pub sha256: String,
}

fn data_dir() -> Result<PathBuf> {
    crate::config::Config::data_dir().context("Failed to get data directory")
}

/// Languages with a `.dict` file in `dir`, sorted.
fn installed_languages(dir: &Path) -> Result<Vec<String>> {
    let mut languages = Vec::new();
    if !dir.exists() {
        return Ok(languages);
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("dict") {
            if let Some(language) = path.file_stem().and_then(|s| s.to_str()) {
                languages.push(language.to_string());
            }
        }
    }
    languages.sort();
    Ok(languages)
}

pub fn list_dictionaries() -> Result<()> {
    let data_dir = data_dir()?;
    let languages = installed_languages(&data_dir)?;

    if languages.is_empty() {
        println!("{}", "No dictionaries installed.".yellow());
        println!(
            "Run {} to install a dictionary.",
            "adocspell dict install en_US".cyan()
        );
        return Ok(());
    }

    println!("{}", "Installed dictionaries:".bold());
    println!();

    for language in &languages {
        let metadata = fs::metadata(data_dir.join(format!("{}.dict", language)))?;
        println!(
            "  {} {} ({})",
            "✓".green(),
            language.cyan().bold(),
            format!("{}KB", metadata.len() / 1024).dimmed()
        );
    }

    println!();
    println!(
        "Data directory: {}",
        data_dir.display().to_string().dimmed()
    );

    Ok(())
}

fn default_source(language: &str) -> Result<String> {
    match language {
        "en_US" | "en_GB" => Ok(format!("{}/words_alpha.txt", WORDLIST_BASE_URL)),
        other => anyhow::bail!(
            "No default word list for '{}'. Pass one with --from <PATH|URL>.",
            other
        ),
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn fetch(source: &str) -> Result<Vec<u8>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .context("Invalid progress template")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    let bytes = if is_url(source) {
        pb.set_message("Downloading...");
        let response =
            reqwest::blocking::get(source).context("Failed to download word list")?;
        if !response.status().is_success() {
            pb.abandon();
            anyhow::bail!("Failed to download word list: HTTP {}", response.status());
        }
        response.bytes().context("Failed to read response")?.to_vec()
    } else {
        pb.set_message("Reading...");
        fs::read(source).with_context(|| format!("Failed to read word list: {}", source))?
    };

    pb.finish_with_message("Word list loaded");
    Ok(bytes)
}

/// Words of a plain or gzip-compressed list, one per line.
pub fn parse_wordlist(bytes: &[u8], gzipped: bool) -> Result<Vec<String>> {
    let content = if gzipped {
        let mut decoded = String::new();
        GzDecoder::new(bytes)
            .read_to_string(&mut decoded)
            .context("Failed to decompress word list")?;
        decoded
    } else {
        String::from_utf8(bytes.to_vec()).context("Word list is not valid UTF-8")?
    };

    Ok(content
        .lines()
        .map(|line| line.trim().to_lowercase())
        .filter(|line| !line.starts_with('#') && line.chars().count() > 1)
        .collect())
}

fn install_into(data_dir: &Path, language: &str, source: &str) -> Result<PathBuf> {
    let bytes = fetch(source)?;
    let words = parse_wordlist(&bytes, source.ends_with(".gz"))?;
    if words.is_empty() {
        anyhow::bail!("Word list {} contains no words", source);
    }
    debug!("Parsed {} words from {}", words.len(), source);

    println!("Found {} words", words.len().to_string().yellow());

    let dict_path = data_dir.join(format!("{}.dict", language));
    Dictionary::build_from_words(&words, &dict_path)?;
    Ok(dict_path)
}

pub fn install_dictionary(language: &str, from: Option<&str>) -> Result<()> {
    let source = match from {
        Some(source) => source.to_string(),
        None => default_source(language)?,
    };

    println!(
        "{} dictionary for {}...",
        "Installing".cyan().bold(),
        language.yellow()
    );
    println!("Source: {}", source.dimmed());

    let dict_path = install_into(&data_dir()?, language, &source)?;

    println!(
        "{} Dictionary installed: {}",
        "✓".green().bold(),
        dict_path.display().to_string().cyan()
    );

    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn dictionary_info(data_dir: &Path, language: &str) -> Result<Option<DictionaryInfo>> {
    let path = data_dir.join(format!("{}.dict", language));
    if !path.exists() {
        return Ok(None);
    }

    let bytes = fs::read(&path)
        .with_context(|| format!("Failed to read dictionary: {}", path.display()))?;
    let dictionary = Dictionary::load_from_path(&path)?;

    Ok(Some(DictionaryInfo {
        language: language.to_string(),
        word_count: dictionary.len(),
        size_bytes: bytes.len() as u64,
        sha256: sha256_hex(&bytes),
        path,
    }))
}

pub fn show_info(language: &str) -> Result<()> {
    let Some(info) = dictionary_info(&data_dir()?, language)? else {
        println!(
            "{} Dictionary for {} not found.",
            "✗".red().bold(),
            language.yellow()
        );
        println!(
            "Run {} to install it.",
            format!("adocspell dict install {}", language).cyan()
        );
        return Ok(());
    };

    println!("{}", format!("Dictionary: {}", info.language).bold());
    println!("  Path: {}", info.path.display());
    println!("  Size: {} KB", info.size_bytes / 1024);
    println!("  Words: {}", info.word_count);
    println!("  SHA-256: {}", info.sha256);
    println!("  Format: FST (Finite State Transducer)");

    Ok(())
}
