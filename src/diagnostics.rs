use crate::engine::Match;
use crate::extract::{Origin, TextFragment};
use serde::{Deserialize, Serialize};

/// One potential spelling error together with the fragment it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Full text of the checked fragment.
    pub text: String,
    pub origin: Origin,
    #[serde(rename = "match")]
    pub found: Match,
}

impl Diagnostic {
    /// The flagged word or span.
    pub fn word(&self) -> &str {
        self.found.covered(&self.text)
    }

    /// The fragment from the start of the flagged span onwards.
    pub fn details(&self) -> &str {
        self.found.tail(&self.text)
    }

    /// Zero-based line of the flagged span inside the fragment and its
    /// one-based column on that line, in chars.
    pub fn line_column(&self) -> (usize, usize) {
        let before = self.found.head(&self.text);
        let line = before.matches('\n').count();
        let column = before.rsplit('\n').next().unwrap_or_default().chars().count() + 1;
        (line, column)
    }

    /// Line of the flagged span in the source file.
    ///
    /// Fragment lines start at the node's location. Table cells carry no
    /// line of their own and report the table's.
    pub fn source_line(&self) -> Option<usize> {
        let location = self.origin.location.as_ref()?;
        match self.origin.cell {
            Some(_) => Some(location.line),
            None => Some(location.line + self.line_column().0),
        }
    }
}

/// Accumulates diagnostics in the order the checks ran.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, fragment: &TextFragment<'_>, matches: Vec<Match>) {
        if matches.is_empty() {
            return;
        }
        let origin = fragment.origin();
        self.diagnostics
            .extend(matches.into_iter().map(|found| Diagnostic {
                text: fragment.text.to_string(),
                origin: origin.clone(),
                found,
            }));
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstNode, NodePath, SourceLocation};
    use std::borrow::Cow;

    fn found(offset: usize, length: usize) -> Match {
        Match {
            offset,
            length,
            rule_id: "SPELLING".to_string(),
            message: "Possible spelling mistake found.".to_string(),
            suggestions: vec!["one".to_string(), "two".to_string()],
        }
    }

    #[test]
    fn test_record_keeps_order_and_matches() {
        let node = AstNode::block("paragraph", "teh qiuck fox");
        let fragment = TextFragment {
            text: Cow::Borrowed("teh qiuck fox"),
            node: &node,
            path: NodePath::from(vec![2]),
            cell: None,
        };

        let mut collector = DiagnosticCollector::new();
        collector.record(&fragment, vec![found(0, 3), found(4, 5)]);
        collector.record(&fragment, Vec::new());
        collector.record(&fragment, vec![found(0, 3)]);

        let words: Vec<&str> = collector.diagnostics().iter().map(|d| d.word()).collect();
        assert_eq!(words, vec!["teh", "qiuck", "teh"]);
        assert_eq!(collector.len(), 3);

        let first = &collector.diagnostics()[0];
        assert_eq!(first.origin.context, "paragraph");
        assert_eq!(first.origin.path.to_string(), "2");
        assert_eq!(first.found.suggestions, vec!["one", "two"]);
        assert_eq!(collector.diagnostics()[1].details(), "qiuck fox");
    }

    fn diagnostic(text: &str, offset: usize, cell: Option<(usize, usize)>) -> Diagnostic {
        Diagnostic {
            text: text.to_string(),
            origin: Origin {
                context: "paragraph".to_string(),
                path: NodePath::from(vec![0]),
                location: Some(SourceLocation::new(None, 12)),
                cell,
            },
            found: found(offset, 5),
        }
    }

    #[test]
    fn test_line_column_inside_multiline_fragment() {
        let second_line = diagnostic("first line\nthe secnd one", 15, None);
        assert_eq!(second_line.word(), "secnd");
        assert_eq!(second_line.line_column(), (1, 5));
        assert_eq!(second_line.source_line(), Some(13));

        let first_line = diagnostic("an erorr\nnext", 3, None);
        assert_eq!(first_line.line_column(), (0, 4));
        assert_eq!(first_line.source_line(), Some(12));
    }

    #[test]
    fn test_table_cell_reports_table_line() {
        let cell = diagnostic("a\nmultline cell", 2, Some((1, 0)));
        assert_eq!(cell.line_column(), (1, 1));
        assert_eq!(cell.source_line(), Some(12));

        let unlocated = Diagnostic {
            origin: Origin {
                location: None,
                ..cell.origin.clone()
            },
            ..cell
        };
        assert_eq!(unlocated.source_line(), None);
    }
}
