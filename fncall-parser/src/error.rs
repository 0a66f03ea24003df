//! Error types for comment parsing.

use thiserror::Error;

/// Result alias for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors produced while extracting or splitting comment tags.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// A recognized tag's arguments could not be split into their parts.
    #[error("malformed `@{tag}` tag on line {line}: {reason}")]
    MalformedTag {
        /// 1-based line of the offending tag.
        line: usize,
        /// Tag name without the `@`.
        tag: String,
        /// Human-readable reason for rejection.
        reason: String,
    },
}

impl ParseError {
    /// Creates a malformed-tag error.
    #[must_use]
    pub fn malformed(line: usize, tag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedTag {
            line,
            tag: tag.into(),
            reason: reason.into(),
        }
    }

    /// Returns the source line the error refers to.
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::MalformedTag { line, .. } => *line,
        }
    }
}
