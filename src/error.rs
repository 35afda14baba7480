// src/error.rs
use std::io;

use thiserror::Error;

use crate::token::SymbolId;

/// Failures of the binary table codec.
///
/// `Io` means the stream could not be read or written at all; `Corrupt` means it was
/// readable but does not describe a valid value (overrunning runs, bad lengths, bad UTF-8).
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("table stream I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt table data: {0}")]
    Corrupt(String),
    #[error("length {0} cannot be encoded")]
    TooLong(usize),
    #[error("cannot encode {0}")]
    Unencodable(String),
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("bad table signature: expected {expected:?}, found {found:?}")]
    BadSignature { expected: [u8; 8], found: [u8; 8] },
    #[error("inconsistent table: {0}")]
    Inconsistent(String),
    #[error("failed to parse table JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<io::Error> for TableError {
    fn from(e: io::Error) -> Self {
        TableError::Codec(CodecError::Io(e))
    }
}

/// Errors raised by a token source (scanner, preprocessor, or a client stream).
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("I/O error while reading tokens: {0}")]
    Io(#[from] io::Error),
    #[error("syntax exception: {0}")]
    Syntax(String),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("I/O error during parse: {0}")]
    Io(io::Error),
    #[error("syntax exception from token source: {0}")]
    Syntax(String),
    #[error("unrepairable syntax error at {line}:{column} (symbol {symbol})")]
    Unrepairable {
        symbol: SymbolId,
        line: u32,
        column: u32,
    },
    #[error("parser table misbehaved: {0}")]
    Table(String),
}

impl From<StreamError> for ParseError {
    fn from(e: StreamError) -> Self {
        match e {
            StreamError::Io(e) => ParseError::Io(e),
            StreamError::Syntax(s) => ParseError::Syntax(s),
        }
    }
}

/// Table checks read as a list of `ensure(condition, || message)?` lines.
pub(crate) fn ensure(cond: bool, msg: impl FnOnce() -> String) -> Result<(), TableError> {
    if cond {
        Ok(())
    } else {
        Err(TableError::Inconsistent(msg()))
    }
}
