//! Parse error types

use std::io;
use thiserror::Error;

/// Error raised while reading or parsing a single note document.
#[derive(Debug, Error)]
pub enum ParseError {
    /// IO error reading the file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Document does not start with a frontmatter delimiter line
    #[error("missing frontmatter delimiter")]
    MissingDelimiter,

    /// Opening delimiter found but no closing delimiter before end of input
    #[error("unterminated frontmatter block")]
    UnterminatedFrontmatter,
}

/// Specialized Result type for parse operations
pub type ParseResult<T> = Result<T, ParseError>;
