//! Document tree consumed by the checker.
//!
//! [`AstNode`] mirrors the shape of an Asciidoctor node: a `context` tag plus
//! whatever text, attributes, table rows and child blocks the parser filled
//! in. It is deliberately opaque; [`kind::classify`] turns it into the closed
//! [`NodeKind`] set the rest of the crate matches on.

pub mod asciidoc;
pub mod kind;

pub use kind::{classify, NodeKind};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AstNode {
    pub context: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Inline text of a list item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Raw source lines of a content block.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, serde_json::Value>,

    /// Table body rows, each an ordered list of cell texts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Vec<String>>,

    /// Table header rows. Kept apart from the body and never checked.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub header_rows: Vec<Vec<String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<AstNode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<SourceLocation>,
}

impl AstNode {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            ..Default::default()
        }
    }

    pub fn document(title: impl Into<String>) -> Self {
        Self::new("document").with_title(title)
    }

    pub fn section(title: impl Into<String>) -> Self {
        Self::new("section").with_title(title)
    }

    /// A content block whose text is `text` split on line breaks.
    pub fn block(context: impl Into<String>, text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
            ..Self::new(context)
        }
    }

    pub fn list(context: impl Into<String>, items: Vec<AstNode>) -> Self {
        Self {
            blocks: items,
            ..Self::new(context)
        }
    }

    pub fn list_item(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new("list_item")
        }
    }

    pub fn table(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows,
            ..Self::new("table")
        }
    }

    pub fn with_header_rows(mut self, header_rows: Vec<Vec<String>>) -> Self {
        self.header_rows = header_rows;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_blocks(mut self, blocks: Vec<AstNode>) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.source_location = Some(location);
        self
    }

    pub fn push(&mut self, child: AstNode) {
        self.blocks.push(child);
    }

    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes.get(name)
    }

    /// Load a tree serialized as JSON.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse document tree: {}", path.display()))
    }
}

/// Where a node came from in its source file, when the parser recorded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub line: usize,
}

impl SourceLocation {
    pub fn new(file: Option<String>, line: usize) -> Self {
        Self { file, line }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}", file, self.line),
            None => write!(f, "{}", self.line),
        }
    }
}

/// Child-index path from the root to a node. The root itself is the empty
/// path and displays as `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}
