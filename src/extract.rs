use crate::ast::{AstNode, NodeKind, NodePath, SourceLocation};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;

/// Text taken from one node, ready to be sent to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment<'a> {
    pub text: Cow<'a, str>,
    pub node: &'a AstNode,
    pub path: NodePath,
    /// Row and column for fragments taken from a table cell.
    pub cell: Option<(usize, usize)>,
}

impl TextFragment<'_> {
    pub fn origin(&self) -> Origin {
        Origin {
            context: self.node.context.clone(),
            path: self.path.clone(),
            location: self.node.source_location.clone(),
            cell: self.cell,
        }
    }
}

/// Where a fragment came from, detached from the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub context: String,
    pub path: NodePath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell: Option<(usize, usize)>,
}

/// Checkable text of a single node, children excluded.
///
/// Blocks whose kind is in `skip_blocks` produce nothing. Absent or
/// whitespace-only text is dropped.
pub fn extract<'a>(
    node: &'a AstNode,
    kind: NodeKind<'a>,
    path: &NodePath,
    skip_blocks: &BTreeSet<String>,
) -> Vec<TextFragment<'a>> {
    let fragment = |text: Cow<'a, str>, cell: Option<(usize, usize)>| TextFragment {
        text,
        node,
        path: path.clone(),
        cell,
    };

    let fragments: Vec<TextFragment<'a>> = match kind {
        NodeKind::Document { title, .. } | NodeKind::Section { title } => title
            .map(|t| fragment(Cow::Borrowed(t), None))
            .into_iter()
            .collect(),
        NodeKind::ContentBlock { kind, .. } if skip_blocks.contains(kind) => Vec::new(),
        NodeKind::ContentBlock { lines, .. } => match lines {
            [] => Vec::new(),
            [line] => vec![fragment(Cow::Borrowed(line.as_str()), None)],
            _ => vec![fragment(Cow::Owned(lines.join("\n")), None)],
        },
        NodeKind::ListContainer { .. } => Vec::new(),
        NodeKind::ListItem { text } => text
            .map(|t| fragment(Cow::Borrowed(t), None))
            .into_iter()
            .collect(),
        NodeKind::Table { rows } => rows
            .iter()
            .enumerate()
            .flat_map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .map(move |(c, cell)| (r, c, cell.as_str()))
            })
            .map(|(r, c, cell)| fragment(Cow::Borrowed(cell), Some((r, c))))
            .collect(),
    };

    fragments
        .into_iter()
        .filter(|f| !f.text.trim().is_empty())
        .collect()
}
