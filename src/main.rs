use adocspell::ast::{asciidoc, AstNode};
use adocspell::cli::output::{self, FileOutcome, OutputFormat};
use adocspell::config::ConfigOverrides;
use adocspell::{dict, Config, DictionaryEngine, EngineError, SessionOverrides, SessionReport, SessionRunner};
use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use rayon::prelude::*;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

const ASCIIDOC_EXTENSIONS: &[&str] = &["adoc", "asciidoc", "asc"];

#[derive(Parser, Debug)]
#[command(name = "adocspell")]
#[command(version, about = "Spell checking for AsciiDoc documents", long_about = None)]
struct Cli {
    /// AsciiDoc files, JSON document trees, or directories to check
    #[arg(value_name = "FILES")]
    files: Vec<PathBuf>,

    /// Language/dictionary to use (e.g., en_US, en_GB)
    #[arg(short, long)]
    language: Option<String>,

    /// Word that is never reported (repeatable)
    #[arg(long, value_name = "WORD")]
    ignore_word: Vec<String>,

    /// Block kind whose text is not checked, in addition to `listing` (repeatable)
    #[arg(long, value_name = "KIND")]
    skip_block: Vec<String>,

    /// Stop checking a document after this many mistakes
    #[arg(long, value_name = "N")]
    max_mistakes: Option<usize>,

    /// Skip fragments the engine fails on instead of aborting the document
    #[arg(long)]
    skip_engine_failures: bool,

    /// Pattern to ignore (regex)
    #[arg(long)]
    ignore_pattern: Vec<String>,

    /// Personal dictionary file
    #[arg(long)]
    personal_dict: Option<PathBuf>,

    /// Output format (text, json, report)
    #[arg(short = 'o', long, default_value = "text")]
    format: OutputFormat,

    /// Write a `<docname>_spelling_mistakes_report.txt` per document here
    #[arg(long, value_name = "DIR")]
    report_dir: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Exit with code 0 even if mistakes are found
    #[arg(long)]
    no_fail: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Generate shell completion script
    #[arg(long, value_name = "SHELL")]
    completion: Option<Shell>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dictionary management
    Dict {
        #[command(subcommand)]
        action: DictCommands,
    },
}

#[derive(Subcommand, Debug)]
enum DictCommands {
    /// List installed dictionaries
    List,
    /// Build a dictionary from a word list
    Install {
        /// Language code (e.g., en_US, en_GB)
        language: String,

        /// Local file or URL of a word list, one word per line (.gz accepted)
        #[arg(long, value_name = "PATH|URL")]
        from: Option<String>,
    },
    /// Show dictionary info
    Info {
        /// Language code
        language: String,
    },
}

enum Outcome {
    Clean,
    Mistakes,
    Failed,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(shell) = cli.completion {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "adocspell", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let no_fail = cli.no_fail;
    match run(cli) {
        Ok(Outcome::Clean) => ExitCode::SUCCESS,
        Ok(Outcome::Mistakes) if no_fail => ExitCode::SUCCESS,
        Ok(Outcome::Mistakes) => ExitCode::from(1),
        Ok(Outcome::Failed) => ExitCode::from(2),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<Outcome> {
    if let Some(command) = cli.command {
        handle_command(command)?;
        return Ok(Outcome::Clean);
    }

    if cli.files.is_empty() {
        anyhow::bail!("No files specified. Use --help for usage information.");
    }

    let config = Config::load(ConfigOverrides {
        language: cli.language,
        personal_dictionary: cli.personal_dict,
        ignore_patterns: cli.ignore_pattern,
        words_to_ignore: cli.ignore_word,
        skip_blocks: cli.skip_block,
        max_mistakes: cli.max_mistakes,
        skip_engine_failures: cli.skip_engine_failures,
    })?;
    debug!("Using configuration: {:?}", config);

    let inputs = collect_inputs(&cli.files);
    if inputs.is_empty() {
        anyhow::bail!("No AsciiDoc files found.");
    }

    let results: Vec<Result<(String, SessionReport)>> =
        inputs.par_iter().map(|path| check_file(path, &config)).collect();

    let colored = !cli.no_color;
    let mut failed = false;
    let mut outcomes = Vec::new();
    for (path, result) in inputs.iter().zip(&results) {
        match result {
            Ok((docname, report)) => {
                if let Some(dir) = &cli.report_dir {
                    if let Some(written) =
                        output::write_report_file(dir, docname, path, &report.diagnostics)?
                    {
                        info!("Wrote {}", written.display());
                    }
                }
                outcomes.push(FileOutcome { path, report });
            }
            Err(e) => {
                error!("{}: {:#}", path.display(), e);
                failed = true;
            }
        }
    }

    output::print_results(&outcomes, colored, cli.format)?;

    let total: usize = outcomes.iter().map(|o| o.report.diagnostics.len()).sum();
    if cli.format == OutputFormat::Text {
        output::print_check_summary(total, outcomes.len(), colored);
    }

    Ok(if failed {
        Outcome::Failed
    } else if total > 0 {
        Outcome::Mistakes
    } else {
        Outcome::Clean
    })
}

/// Expand directories into the AsciiDoc files below them, keeping order.
fn collect_inputs(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut inputs = Vec::new();
    for path in paths {
        if path.is_dir() {
            inputs.extend(
                WalkDir::new(path)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| entry.file_type().is_file())
                    .map(|entry| entry.into_path())
                    .filter(|p| has_extension(p, ASCIIDOC_EXTENSIONS)),
            );
        } else {
            inputs.push(path.clone());
        }
    }
    inputs
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| extensions.contains(&ext.to_lowercase().as_str()))
}

fn load_document(path: &Path) -> Result<AstNode> {
    if has_extension(path, &["json"]) {
        AstNode::from_json_file(path)
    } else {
        asciidoc::parse_file(path)
    }
}

fn check_file(path: &Path, config: &Config) -> Result<(String, SessionReport)> {
    let document = load_document(path)?;
    let docname = document
        .attribute("docname")
        .and_then(|v| v.as_str())
        .unwrap_or("unnamed")
        .to_string();

    let factory = || DictionaryEngine::new(config).map_err(|e| EngineError::Internal(format!("{:#}", e)));
    let report = SessionRunner::new(factory)
        .with_overrides(SessionOverrides::from(config))
        .run(&document)?;

    debug!(
        "{}: {} fragments checked, {} mistakes",
        path.display(),
        report.fragments_checked,
        report.diagnostics.len()
    );
    Ok((docname, report))
}

fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Dict { action } => match action {
            DictCommands::List => {
                dict::manager::list_dictionaries()?;
            }
            DictCommands::Install { language, from } => {
                dict::manager::install_dictionary(&language, from.as_deref())?;
            }
            DictCommands::Info { language } => {
                dict::manager::show_info(&language)?;
            }
        },
    }
    Ok(())
}
