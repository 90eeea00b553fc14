//! Pre-order traversal of the document tree.
//!
//! Every node is classified, its own fragments are checked, and then its
//! `blocks` are visited in order. `blocks` is the only child accessor used,
//! so list items are reached exactly once, through their list.

use crate::ast::{classify, AstNode, NodePath};
use crate::diagnostics::DiagnosticCollector;
use crate::engine::{AnalysisEngine, CheckEngine};
use crate::error::CheckError;
use crate::extract::{extract, TextFragment};
use crate::session::{EngineFailurePolicy, SessionConfig};
use std::ops::ControlFlow;
use tracing::{trace, warn};

/// Counters describing a finished walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub nodes_visited: usize,
    pub fragments_checked: usize,
    /// Fragments the engine failed on and that were skipped by policy.
    pub fragments_skipped: usize,
    /// A fragment was left unchecked because the diagnostic limit was reached.
    pub truncated: bool,
}

pub struct TreeWalker<'s, E: AnalysisEngine> {
    engine: &'s mut CheckEngine<E>,
    config: &'s SessionConfig,
    collector: &'s mut DiagnosticCollector,
    stats: WalkStats,
}

impl<'s, E: AnalysisEngine> TreeWalker<'s, E> {
    pub fn new(
        engine: &'s mut CheckEngine<E>,
        config: &'s SessionConfig,
        collector: &'s mut DiagnosticCollector,
    ) -> Self {
        Self {
            engine,
            config,
            collector,
            stats: WalkStats::default(),
        }
    }

    /// Walk the tree rooted at `root`.
    ///
    /// Stops at the first unsupported node or, under
    /// [`EngineFailurePolicy::Abort`], the first engine failure.
    pub fn walk(mut self, root: &AstNode) -> Result<WalkStats, CheckError> {
        if let ControlFlow::Break(()) = self.visit(root, NodePath::root())? {
            self.stats.truncated = true;
        }
        Ok(self.stats)
    }

    fn visit(&mut self, node: &AstNode, path: NodePath) -> Result<ControlFlow<()>, CheckError> {
        let kind = classify(node, &path)?;
        self.stats.nodes_visited += 1;
        trace!("Visiting {} '{}' at {}", kind.name(), node.context, path);

        for fragment in extract(node, kind, &path, &self.config.skip_blocks) {
            if self.limit_reached() {
                return Ok(ControlFlow::Break(()));
            }
            self.check(&fragment)?;
        }

        for (index, child) in node.blocks.iter().enumerate() {
            if let ControlFlow::Break(()) = self.visit(child, path.child(index))? {
                return Ok(ControlFlow::Break(()));
            }
        }

        Ok(ControlFlow::Continue(()))
    }

    fn check(&mut self, fragment: &TextFragment<'_>) -> Result<(), CheckError> {
        match self.engine.check(&fragment.text) {
            Ok(matches) => {
                self.stats.fragments_checked += 1;
                self.collector.record(fragment, matches);
                Ok(())
            }
            Err(source) => match self.config.on_engine_failure {
                EngineFailurePolicy::Abort => Err(CheckError::EngineFailure {
                    path: fragment.path.clone(),
                    source,
                }),
                EngineFailurePolicy::Skip => {
                    warn!("Skipping fragment at {}: {}", fragment.path, source);
                    self.stats.fragments_skipped += 1;
                    Ok(())
                }
            },
        }
    }

    fn limit_reached(&self) -> bool {
        self.config
            .max_diagnostics
            .map_or(false, |max| self.collector.len() >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::ScriptedEngine;
    use serde_json::json;

    fn walk_with(
        root: &AstNode,
        engine: ScriptedEngine,
        config: &SessionConfig,
    ) -> (Result<WalkStats, CheckError>, DiagnosticCollector, Vec<String>) {
        let state = engine.state_handle();
        let mut adapter = CheckEngine::configure(engine, &config.words_to_ignore).unwrap();
        let mut collector = DiagnosticCollector::new();
        let result = TreeWalker::new(&mut adapter, config, &mut collector).walk(root);
        let checked = state.borrow().checked.clone();
        (result, collector, checked)
    }

    fn s(text: &str) -> String {
        text.to_string()
    }

    fn sample_tree() -> AstNode {
        AstNode::document("Manual").with_blocks(vec![
            AstNode::section("Intro").with_blocks(vec![
                AstNode::block("paragraph", "First paragraph."),
                AstNode::list(
                    "ulist",
                    vec![
                        AstNode::list_item("one"),
                        AstNode::list_item("two")
                            .with_blocks(vec![AstNode::list("olist", vec![AstNode::list_item("two.a")])]),
                    ],
                ),
            ]),
            AstNode::block("listing", "let skipped = true;")
                .with_blocks(vec![AstNode::block("paragraph", "Inside listing.")]),
            AstNode::table(vec![vec![s("R1C1"), s("R1C2")], vec![s("R2C1"), s("R2C2")]]),
            AstNode::section("Outro"),
        ])
    }

    #[test]
    fn test_document_order_and_completeness() {
        let tree = sample_tree();
        let (result, _, checked) = walk_with(&tree, ScriptedEngine::new(), &SessionConfig::default());

        assert_eq!(
            checked,
            vec![
                "Manual",
                "Intro",
                "First paragraph.",
                "one",
                "two",
                "two.a",
                "Inside listing.",
                "R1C1",
                "R1C2",
                "R2C1",
                "R2C2",
                "Outro",
            ]
        );

        let stats = result.unwrap();
        assert_eq!(stats.nodes_visited, 12);
        assert_eq!(stats.fragments_checked, 12);
        assert!(!stats.truncated);
    }

    #[test]
    fn test_repeated_walks_are_identical() {
        let tree = sample_tree();
        let (_, _, first) = walk_with(&tree, ScriptedEngine::new(), &SessionConfig::default());
        let (_, _, second) = walk_with(&tree, ScriptedEngine::new(), &SessionConfig::default());
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_skip_set_checks_listings() {
        let tree = sample_tree();
        let config = SessionConfig {
            skip_blocks: Default::default(),
            ..SessionConfig::default()
        };
        let (_, _, checked) = walk_with(&tree, ScriptedEngine::new(), &config);
        assert!(checked.contains(&s("let skipped = true;")));
    }

    #[test]
    fn test_unsupported_node_stops_walk() {
        let tree = AstNode::document("Doc").with_blocks(vec![
            AstNode::block("paragraph", "before"),
            AstNode::new("dlist").with_blocks(vec![AstNode::block("paragraph", "child")]),
            AstNode::block("paragraph", "after"),
        ]);

        let (result, _, checked) = walk_with(&tree, ScriptedEngine::new(), &SessionConfig::default());
        match result {
            Err(CheckError::UnsupportedNodeKind { context, path }) => {
                assert_eq!(context, "dlist");
                assert_eq!(path, NodePath::from(vec![1]));
            }
            other => panic!("expected UnsupportedNodeKind, got {:?}", other),
        }
        assert_eq!(checked, vec!["Doc", "before"]);
    }

    #[test]
    fn test_engine_failure_aborts_by_default() {
        let tree = AstNode::document("Doc").with_blocks(vec![
            AstNode::block("paragraph", "boom"),
            AstNode::block("paragraph", "after"),
        ]);
        let engine = ScriptedEngine::new().failing_on("boom");

        let (result, _, checked) = walk_with(&tree, engine, &SessionConfig::default());
        assert!(matches!(result, Err(CheckError::EngineFailure { .. })));
        assert_eq!(checked, vec!["Doc", "boom"]);
    }

    #[test]
    fn test_engine_failure_skipped_by_policy() {
        let tree = AstNode::document("Doc").with_blocks(vec![
            AstNode::block("paragraph", "boom"),
            AstNode::block("paragraph", "teh end"),
        ]);
        let engine = ScriptedEngine::new().failing_on("boom").misspelling(&["teh"]);
        let config = SessionConfig {
            on_engine_failure: EngineFailurePolicy::Skip,
            ..SessionConfig::default()
        };

        let (result, collector, checked) = walk_with(&tree, engine, &config);
        let stats = result.unwrap();
        assert_eq!(stats.fragments_skipped, 1);
        assert_eq!(checked, vec!["Doc", "boom", "teh end"]);
        assert_eq!(collector.len(), 1);
        assert_eq!(collector.diagnostics()[0].origin.path, NodePath::from(vec![1]));
    }

    #[test]
    fn test_limit_truncates_walk() {
        let tree = AstNode::document("teh").with_blocks(vec![
            AstNode::block("paragraph", "teh teh"),
            AstNode::block("paragraph", "teh"),
        ]);
        let engine = ScriptedEngine::new().misspelling(&["teh"]);
        let config = SessionConfig {
            max_diagnostics: Some(2),
            ..SessionConfig::default()
        };

        let (result, collector, checked) = walk_with(&tree, engine, &config);
        assert!(result.unwrap().truncated);
        assert_eq!(checked, vec!["teh", "teh teh"]);
        assert_eq!(collector.len(), 3);
    }

    #[test]
    fn test_zero_limit_checks_nothing() {
        let tree = AstNode::document("teh").with_blocks(vec![AstNode::block("paragraph", "teh")]);
        let engine = ScriptedEngine::new().misspelling(&["teh"]);
        let config = SessionConfig {
            max_diagnostics: Some(0),
            ..SessionConfig::default()
        };

        let (result, collector, checked) = walk_with(&tree, engine, &config);
        let stats = result.unwrap();
        assert!(checked.is_empty());
        assert_eq!(stats.fragments_checked, 0);
        assert!(stats.truncated);
        assert!(collector.is_empty());
    }

    #[test]
    fn test_limit_hit_on_last_fragment_is_not_truncated() {
        let tree = AstNode::document("Doc").with_blocks(vec![AstNode::block("paragraph", "teh")]);
        let engine = ScriptedEngine::new().misspelling(&["teh"]);
        let config = SessionConfig {
            max_diagnostics: Some(1),
            ..SessionConfig::default()
        };

        let (result, collector, checked) = walk_with(&tree, engine, &config);
        assert!(!result.unwrap().truncated);
        assert_eq!(checked, vec!["Doc", "teh"]);
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn test_table_body_rows_only() {
        let source = "text {attr} _italic_ treee  Company(R)\n\n\
                      |===\n\
                      | Name of column 1 | Name of column 2\n\n\
                      | XXX1(C)\n| YYY1(R)\n\n\
                      | XXX2\n| {attr}\n\
                      |===\n";
        let tree = crate::ast::asciidoc::parse(source, None);

        let (_, _, checked) = walk_with(&tree, ScriptedEngine::new(), &SessionConfig::default());
        assert_eq!(
            checked,
            vec![
                "text {attr} _italic_ treee  Company(R)",
                "XXX1(C)",
                "YYY1(R)",
                "XXX2",
                "{attr}",
            ]
        );
    }

    #[test]
    fn test_json_tree_walk() {
        let tree: AstNode = serde_json::from_value(json!({
            "context": "document",
            "blocks": [
                { "context": "table", "rows": [["a", "b"], ["c", "d"]] },
                { "context": "colist", "blocks": [{ "context": "list_item", "text": "callout" }] }
            ]
        }))
        .unwrap();

        let (_, _, checked) = walk_with(&tree, ScriptedEngine::new(), &SessionConfig::default());
        assert_eq!(checked, vec!["a", "b", "c", "d", "callout"]);
    }
}
