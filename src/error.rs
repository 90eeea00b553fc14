use crate::ast::NodePath;
use crate::engine::EngineError;
use thiserror::Error;

/// Errors that abort a spell-checking session.
#[derive(Debug, Error)]
pub enum CheckError {
    /// The tree contains a node whose context is not one of the known kinds.
    #[error("unsupported node kind '{context}' at {path}")]
    UnsupportedNodeKind { context: String, path: NodePath },

    /// The analysis engine could not process a fragment.
    #[error("analysis engine failed on fragment at {path}: {source}")]
    EngineFailure {
        path: NodePath,
        #[source]
        source: EngineError,
    },

    /// The analysis engine rejected the session configuration.
    #[error("failed to configure analysis engine: {0}")]
    EngineSetup(#[source] EngineError),

    /// A configuration value has the wrong shape.
    #[error("configuration error: {0}")]
    Config(String),
}

impl CheckError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
