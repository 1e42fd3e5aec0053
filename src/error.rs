//! Error types.
//!
//! None of these are fatal to a loaded style: authoring errors are collected
//! into a [`LoadReport`](crate::LoadReport) and the offending rule or group is
//! dropped, while the rest of the sheet keeps working.

use thiserror::Error;

/// Errors raised while turning stylesheet input into indexed rules.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StyleError {
    /// The right-most selector names a base category the engine does not know.
    #[error("unknown base selector '{base}' in rule #{seq} ({selector})")]
    UnknownBase { base: String, seq: u32, selector: String },

    #[error("invalid condition '{0}'")]
    InvalidCondition(String),

    #[error("invalid regular expression '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("invalid zoom range '{0}' (expected 'a-b', 'a-', '-b' or 'a')")]
    InvalidZoom(String),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// `init_index` was called on an index that already holds a built state.
    #[error("rule index already initialized; call clear() before rebuilding")]
    IndexAlreadyBuilt,

    #[error("failed to read document: {0}")]
    Document(String),
}

impl From<serde_json::Error> for StyleError {
    fn from(err: serde_json::Error) -> Self {
        StyleError::Document(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StyleError>;
