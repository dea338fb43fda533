//! Error types for the configuration, context-tree, and environment layers.
//!
//! Precondition violations inside the core (agent state-machine misuse,
//! reverting past a snapshot) are programming errors and `panic!`/
//! `debug_assert!` as in the rest of the crate; these types are reserved for
//! recoverable boundary conditions: malformed configuration, an unknown
//! environment name, and context-tree (de)serialization failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required option '{0}'")]
    MissingOption(String),
    #[error("malformed value for option '{key}': '{value}'")]
    MalformedValue { key: String, value: String },
    #[error("unknown environment '{0}'")]
    UnknownEnvironment(String),
    #[error("could not open configuration file '{path}'")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum CtwError {
    #[error("serialized context tree has depth {found}, expected {expected}")]
    DepthMismatch { found: usize, expected: usize },
    #[error("malformed context tree serialization: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
