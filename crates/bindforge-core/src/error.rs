use std::path::PathBuf;

use crate::visit::NodeKind;

/// Errors raised while loading, validating or emitting an IR tree.
///
/// Every variant is fatal for the current generation run.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse {file}: {message}")]
    Parse { file: PathBuf, message: String },

    /// The visitor has no handler for a node it was asked to visit.
    #[error("visitor has no handler for {kind} node `{ident}`")]
    UnhandledNode { kind: NodeKind, ident: String },

    #[error("invalid package: {message}")]
    Invalid { message: String },

    #[error("emit error: {message}")]
    Emit { message: String },
}
