use std::path::PathBuf;
use thiserror::Error;

/// Error returned by a [`FlagValue`](crate::FlagValue) that rejects a textual value.
pub type ValueError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum FlagError {
    #[error("undefined flag '{name}'")]
    Undefined { name: String },

    #[error("invalid value '{value}' for flag '{name}': {source}")]
    InvalidValue {
        name: String,
        value: String,
        source: ValueError,
    },

    #[error("flag '{name}' is already defined")]
    Redefined { name: String },

    /// A source saw `-h`, `--help` or another reserved help token.
    #[error("help requested")]
    Help,

    #[error(transparent)]
    Flatten(#[from] FlattenError),

    #[error("{source_name}: {message}")]
    Syntax {
        source_name: &'static str,
        message: String,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("required config file not found")]
    NotFound,

    #[error("{format} syntax error: {reason}")]
    Decode {
        format: &'static str,
        reason: String,
    },

    #[error("prompt error: {0}")]
    Prompt(String),
}

impl FlagError {
    pub fn is_help(&self) -> bool {
        matches!(self, FlagError::Help)
    }
}

/// A nested value that cannot be projected onto dotted flag names.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlattenError {
    #[error("can't use empty key as flag name")]
    EmptyKey,

    #[error("can't stringify {kind} value")]
    Unstringifiable { kind: &'static str },
}
