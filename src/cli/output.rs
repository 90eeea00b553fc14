use crate::diagnostics::Diagnostic;
use crate::session::SessionReport;
use anyhow::{Context, Result};
use colored::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const NOT_AVAILABLE: &str = "Not available";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Report,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "report" => Ok(OutputFormat::Report),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Report => write!(f, "report"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonMistake {
    file: String,
    line: Option<usize>,
    column: usize,
    /// One-based row and column of a table cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cell: Option<(usize, usize)>,
    /// Char offset of the flagged span in `text`.
    offset: usize,
    path: String,
    context: String,
    rule: String,
    word: String,
    message: String,
    suggestions: Vec<String>,
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonFile {
    file: String,
    fragments_checked: usize,
    fragments_skipped: usize,
    truncated: bool,
    mistakes: Vec<JsonMistake>,
}

/// Outcome of checking one input file.
pub struct FileOutcome<'a> {
    pub path: &'a Path,
    pub report: &'a SessionReport,
}

pub fn print_results(outcomes: &[FileOutcome<'_>], colored_output: bool, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for outcome in outcomes {
                print_text_mistakes(outcome, colored_output);
            }
        }
        OutputFormat::Json => print_json(outcomes)?,
        OutputFormat::Report => {
            for outcome in outcomes {
                let report = format_report(outcome.path, &outcome.report.diagnostics);
                if !report.is_empty() {
                    print!("{}", report);
                }
            }
        }
    }
    Ok(())
}

fn print_text_mistakes(outcome: &FileOutcome<'_>, colored_output: bool) {
    let diagnostics = &outcome.report.diagnostics;
    if diagnostics.is_empty() {
        return;
    }

    let file_name = outcome.path.display().to_string();

    if colored_output {
        println!("\n{}", file_name.bold().underline());
    } else {
        println!("\n{}", file_name);
    }

    for diagnostic in diagnostics {
        let position = position(diagnostic);
        let word = diagnostic.word();

        if colored_output {
            println!(
                "  {} {} {}",
                position.blue().bold(),
                word.red().bold(),
                highlight(diagnostic)
            );

            if !diagnostic.found.suggestions.is_empty() {
                let suggestions = diagnostic
                    .found
                    .suggestions
                    .iter()
                    .take(5)
                    .map(|s| s.green().to_string())
                    .collect::<Vec<_>>()
                    .join(&", ".dimmed().to_string());
                println!("    {} {}", "→".dimmed(), suggestions);
            }
        } else {
            println!("  {} {} {}", position, word, single_line(&diagnostic.text));

            if !diagnostic.found.suggestions.is_empty() {
                let suggestions = diagnostic
                    .found
                    .suggestions
                    .iter()
                    .take(5)
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                println!("    → {}", suggestions);
            }
        }
    }

    if outcome.report.truncated {
        let note = "  (stopped at the mistake limit)";
        if colored_output {
            println!("{}", note.yellow());
        } else {
            println!("{}", note);
        }
    }
}

/// `line:column` in the source file when the line is known. Otherwise the
/// node path and the line and column inside the fragment. Cell positions
/// name the one-based cell and give the column inside it.
fn position(diagnostic: &Diagnostic) -> String {
    let (line_index, column) = diagnostic.line_column();
    let cell = diagnostic
        .origin
        .cell
        .map(|(row, col)| format!("cell {},{}:", row + 1, col + 1))
        .unwrap_or_default();

    match diagnostic.source_line() {
        Some(line) => format!("{}:{}{}", line, cell, column),
        None => format!(
            "[{}]:{}{}:{}",
            diagnostic.origin.path,
            cell,
            line_index + 1,
            column
        ),
    }
}

fn single_line(text: &str) -> String {
    text.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .collect::<Vec<_>>()
        .join(" ")
}

/// The fragment on one line, split around the flagged span.
fn split_at_match(diagnostic: &Diagnostic) -> (String, &str, String) {
    let word = diagnostic.word();
    let before = single_line(diagnostic.found.head(&diagnostic.text));
    let after = single_line(&diagnostic.details()[word.len()..]);
    (before, word, after)
}

fn highlight(diagnostic: &Diagnostic) -> String {
    let (before, word, after) = split_at_match(diagnostic);
    format!("{}{}{}", before.dimmed(), word.red().bold(), after.dimmed())
}

fn print_json(outcomes: &[FileOutcome<'_>]) -> Result<()> {
    let files: Vec<JsonFile> = outcomes
        .iter()
        .map(|outcome| JsonFile {
            file: outcome.path.display().to_string(),
            fragments_checked: outcome.report.fragments_checked,
            fragments_skipped: outcome.report.fragments_skipped,
            truncated: outcome.report.truncated,
            mistakes: outcome
                .report
                .diagnostics
                .iter()
                .map(|d| json_mistake(outcome.path, d))
                .collect(),
        })
        .collect();

    let output = serde_json::json!({
        "files_checked": files.len(),
        "total_mistakes": files.iter().map(|f| f.mistakes.len()).sum::<usize>(),
        "files": files,
    });

    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("Failed to serialize results")?
    );
    Ok(())
}

fn json_mistake(path: &Path, diagnostic: &Diagnostic) -> JsonMistake {
    let location = diagnostic.origin.location.as_ref();
    JsonMistake {
        file: location
            .and_then(|l| l.file.clone())
            .unwrap_or_else(|| path.display().to_string()),
        line: diagnostic.source_line(),
        column: diagnostic.line_column().1,
        cell: diagnostic.origin.cell.map(|(row, col)| (row + 1, col + 1)),
        offset: diagnostic.found.offset,
        path: diagnostic.origin.path.to_string(),
        context: diagnostic.origin.context.clone(),
        rule: diagnostic.found.rule_id.clone(),
        word: diagnostic.word().to_string(),
        message: diagnostic.found.message.clone(),
        suggestions: diagnostic.found.suggestions.clone(),
        text: diagnostic.text.clone(),
    }
}

/// Plain-text report, one four-line entry per diagnostic.
pub fn format_report(path: &Path, diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();
    for diagnostic in diagnostics {
        let (file, line) = match (&diagnostic.origin.location, diagnostic.source_line()) {
            (Some(location), Some(line)) => (
                location
                    .file
                    .clone()
                    .unwrap_or_else(|| path.display().to_string()),
                line.to_string(),
            ),
            _ => (NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string()),
        };

        out.push_str(&format!("{}:{}: {}\n", file, line, diagnostic.found.message));
        out.push_str("Details:\n");
        out.push_str(&format!("---> {}\n", diagnostic.details()));
        out.push_str(&format!(
            "Suggested correction(s): [{}]\n",
            diagnostic.found.suggestions.join(", ")
        ));
    }
    out
}

/// Write `<docname>_spelling_mistakes_report.txt` into `dir`.
///
/// Nothing is written for a clean document.
pub fn write_report_file(
    dir: &Path,
    docname: &str,
    path: &Path,
    diagnostics: &[Diagnostic],
) -> Result<Option<PathBuf>> {
    if diagnostics.is_empty() {
        return Ok(None);
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create report directory: {}", dir.display()))?;
    let report_path = dir.join(format!("{}_spelling_mistakes_report.txt", docname));
    fs::write(&report_path, format_report(path, diagnostics))
        .with_context(|| format!("Failed to write report: {}", report_path.display()))?;
    Ok(Some(report_path))
}

pub fn print_check_summary(total_mistakes: usize, files_checked: usize, colored: bool) {
    println!();
    if total_mistakes == 0 {
        if colored {
            println!("{}", "✓ No spelling mistakes found!".green().bold());
        } else {
            println!("✓ No spelling mistakes found!");
        }
    } else {
        let mistake_word = if total_mistakes == 1 { "mistake" } else { "mistakes" };
        let file_word = if files_checked == 1 { "file" } else { "files" };
        if colored {
            println!(
                "{} {} potential spelling {} found in {} {}",
                "✗".red().bold(),
                total_mistakes.to_string().red().bold(),
                mistake_word,
                files_checked,
                file_word
            );
        } else {
            println!(
                "✗ {} potential spelling {} found in {} {}",
                total_mistakes, mistake_word, files_checked, file_word
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{NodePath, SourceLocation};
    use crate::engine::Match;
    use crate::extract::Origin;

    fn diagnostic(location: Option<SourceLocation>) -> Diagnostic {
        Diagnostic {
            text: "This is a correct sentnce.".to_string(),
            origin: Origin {
                context: "paragraph".to_string(),
                path: NodePath::from(vec![0, 0]),
                location,
                cell: None,
            },
            found: Match {
                offset: 18,
                length: 7,
                rule_id: "SPELLING_EN_US".to_string(),
                message: "Possible spelling mistake found.".to_string(),
                suggestions: vec!["sentence".to_string(), "sentience".to_string()],
            },
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("report".parse::<OutputFormat>().unwrap(), OutputFormat::Report);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_report_entry() {
        let location = SourceLocation::new(Some("manual.adoc".to_string()), 7);
        let report = format_report(Path::new("other.adoc"), &[diagnostic(Some(location))]);
        assert_eq!(
            report,
            "manual.adoc:7: Possible spelling mistake found.\n\
             Details:\n\
             ---> sentnce.\n\
             Suggested correction(s): [sentence, sentience]\n"
        );
    }

    #[test]
    fn test_report_without_location() {
        let report = format_report(Path::new("tree.json"), &[diagnostic(None)]);
        assert!(report.starts_with("Not available:Not available: Possible spelling mistake found."));
    }

    #[test]
    fn test_report_file_only_written_with_mistakes() {
        let dir = tempfile::tempdir().unwrap();
        let path = Path::new("manual.adoc");

        assert!(write_report_file(dir.path(), "manual", path, &[]).unwrap().is_none());

        let written = write_report_file(dir.path(), "manual", path, &[diagnostic(None)])
            .unwrap()
            .unwrap();
        assert_eq!(
            written.file_name().and_then(|n| n.to_str()),
            Some("manual_spelling_mistakes_report.txt")
        );
        assert!(fs::read_to_string(written).unwrap().contains("---> sentnce."));
    }

    #[test]
    fn test_position_prefers_source_line() {
        let with_line = diagnostic(Some(SourceLocation::new(None, 12)));
        assert_eq!(position(&with_line), "12:19");
        assert_eq!(position(&diagnostic(None)), "[0.0]:1:19");
    }

    #[test]
    fn test_position_in_multiline_paragraph() {
        let mut second_line = diagnostic(Some(SourceLocation::new(None, 12)));
        second_line.text = "This is the first line.\nA correct sentnce.".to_string();
        second_line.found.offset = 34;
        assert_eq!(second_line.word(), "sentnce");

        assert_eq!(position(&second_line), "13:11");
        let json = json_mistake(Path::new("manual.adoc"), &second_line);
        assert_eq!((json.line, json.column, json.offset), (Some(13), 11, 34));
        assert!(format_report(Path::new("manual.adoc"), &[second_line]).starts_with("manual.adoc:13:"));
    }

    #[test]
    fn test_position_in_table_cell() {
        let mut cell = diagnostic(Some(SourceLocation::new(None, 20)));
        cell.text = "a sentnce".to_string();
        cell.found.offset = 2;
        cell.origin.cell = Some((1, 0));

        assert_eq!(position(&cell), "20:cell 2,1:3");
        assert_eq!(json_mistake(Path::new("t.adoc"), &cell).cell, Some((2, 1)));

        cell.origin.location = None;
        assert_eq!(position(&cell), "[0.0]:cell 2,1:1:3");
    }

    #[test]
    fn test_only_flagged_occurrence_is_highlighted() {
        let mut repeated = diagnostic(None);
        repeated.text = "teh cat and\nteh dog".to_string();
        repeated.found.offset = 12;
        repeated.found.length = 3;

        let (before, word, after) = split_at_match(&repeated);
        assert_eq!(before, "teh cat and ");
        assert_eq!(word, "teh");
        assert_eq!(after, " dog");
    }
}
