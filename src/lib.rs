pub mod ast;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod dict;
pub mod engine;
pub mod error;
pub mod extract;
pub mod session;
pub mod walker;

pub use ast::{AstNode, NodeKind, NodePath, SourceLocation};
pub use config::Config;
pub use diagnostics::Diagnostic;
pub use engine::{AnalysisEngine, CheckEngine, DictionaryEngine, EngineError, Match};
pub use error::CheckError;
pub use session::{EngineFailurePolicy, SessionConfig, SessionOverrides, SessionReport, SessionRunner};
