//! Domain-specific errors.

use thiserror::Error;

/// Reasons a tag file line is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagParseError {
    #[error("pseudo-tag line")]
    PseudoTag,
    #[error("missing tab-separated field: {0}")]
    MissingField(&'static str),
    #[error("empty tag name")]
    EmptyName,
}

/// Failure to launch an external tag generator.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("generator command is empty")]
    EmptyCommand,
    #[error("failed to spawn `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}
