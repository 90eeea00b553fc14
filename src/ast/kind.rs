use crate::ast::{AstNode, NodePath};
use crate::error::CheckError;
use serde_json::Value;
use std::collections::BTreeMap;

/// Contexts Asciidoctor models as plain blocks carrying their own lines.
const CONTENT_BLOCK_CONTEXTS: &[&str] = &[
    "paragraph",
    "listing",
    "literal",
    "example",
    "sidebar",
    "quote",
    "verse",
    "admonition",
    "open",
    "pass",
    "preamble",
    "floating_title",
    "image",
    "video",
    "audio",
    "toc",
    "thematic_break",
    "page_break",
];

const LIST_CONTEXTS: &[&str] = &["ulist", "olist", "colist"];

/// The closed set of node kinds the checker understands, borrowing the
/// kind-specific parts of the underlying node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind<'a> {
    Document {
        title: Option<&'a str>,
        attributes: &'a BTreeMap<String, Value>,
    },
    Section {
        title: Option<&'a str>,
    },
    ContentBlock {
        kind: &'a str,
        lines: &'a [String],
    },
    ListContainer {
        items: &'a [AstNode],
    },
    ListItem {
        text: Option<&'a str>,
    },
    Table {
        rows: &'a [Vec<String>],
    },
}

impl NodeKind<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Document { .. } => "document",
            NodeKind::Section { .. } => "section",
            NodeKind::ContentBlock { .. } => "block",
            NodeKind::ListContainer { .. } => "list",
            NodeKind::ListItem { .. } => "list item",
            NodeKind::Table { .. } => "table",
        }
    }
}

/// Classify `node` found at `path`.
///
/// Unknown contexts are an error rather than a silent skip: the node's
/// children would otherwise go unchecked.
pub fn classify<'a>(node: &'a AstNode, path: &NodePath) -> Result<NodeKind<'a>, CheckError> {
    let context = node.context.as_str();

    let kind = match context {
        "document" => NodeKind::Document {
            title: node.title.as_deref(),
            attributes: &node.attributes,
        },
        "section" => NodeKind::Section {
            title: node.title.as_deref(),
        },
        "list_item" => NodeKind::ListItem {
            text: node.text.as_deref(),
        },
        "table" => NodeKind::Table { rows: &node.rows },
        c if LIST_CONTEXTS.contains(&c) => NodeKind::ListContainer {
            items: &node.blocks,
        },
        c if CONTENT_BLOCK_CONTEXTS.contains(&c) => NodeKind::ContentBlock {
            kind: context,
            lines: &node.lines,
        },
        _ => {
            return Err(CheckError::UnsupportedNodeKind {
                context: context.to_string(),
                path: path.clone(),
            })
        }
    };

    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_contexts() {
        let path = NodePath::root();

        let doc = AstNode::document("Title");
        assert!(matches!(
            classify(&doc, &path).unwrap(),
            NodeKind::Document { title: Some("Title"), .. }
        ));

        let listing = AstNode::block("listing", "fn main() {}");
        match classify(&listing, &path).unwrap() {
            NodeKind::ContentBlock { kind, lines } => {
                assert_eq!(kind, "listing");
                assert_eq!(lines.len(), 1);
            }
            other => panic!("unexpected kind: {:?}", other),
        }

        let list = AstNode::list("olist", vec![AstNode::list_item("one")]);
        match classify(&list, &path).unwrap() {
            NodeKind::ListContainer { items } => assert_eq!(items.len(), 1),
            other => panic!("unexpected kind: {:?}", other),
        }

        let item = AstNode::list_item("one");
        assert_eq!(classify(&item, &path).unwrap().name(), "list item");

        let table = AstNode::table(vec![vec!["a".to_string()]]);
        assert_eq!(classify(&table, &path).unwrap().name(), "table");
    }

    #[test]
    fn test_classify_unknown_context() {
        let node = AstNode::new("dlist");
        let path = NodePath::from(vec![0, 3]);

        match classify(&node, &path) {
            Err(CheckError::UnsupportedNodeKind { context, path }) => {
                assert_eq!(context, "dlist");
                assert_eq!(path.to_string(), "0.3");
            }
            other => panic!("expected UnsupportedNodeKind, got {:?}", other),
        }
    }
}
