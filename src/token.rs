// src/token.rs
use std::{collections::VecDeque, sync::Arc};

use crate::error::StreamError;

/// Terminal or nonterminal number. Meaning comes only from the tables.
pub type SymbolId = u32;

/// One token as delivered by a scanner or any other token source.
///
/// Every delivery is a fresh value: keeping a token around after the scanner moved on
/// is always safe. `line` and `column` are 1-based and point at the first unit of the
/// token; synthetic tokens made by error repair copy the position of the token that
/// triggered the repair.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<V> {
    pub number: SymbolId,
    pub value: Option<V>,
    pub file: Option<Arc<str>>,
    pub line: u32,
    pub column: u32,
}

impl<V> Token<V> {
    pub fn new(number: SymbolId) -> Self {
        Self {
            number,
            value: None,
            file: None,
            line: 0,
            column: 0,
        }
    }

    pub fn with_value(number: SymbolId, value: V) -> Self {
        Self {
            value: Some(value),
            ..Self::new(number)
        }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    /// A value-less token carrying `number` at the position of `self`.
    pub fn synthetic<W>(&self, number: SymbolId) -> Token<W> {
        Token {
            number,
            value: None,
            file: self.file.clone(),
            line: self.line,
            column: self.column,
        }
    }

    /// Copy of the token without its value.
    pub fn position_only<W>(&self) -> Token<W> {
        self.synthetic(self.number)
    }
}

/// Anything that produces a stream of tokens ending in an end-of-file token.
///
/// After the end-of-file token has been returned, further calls may return it again.
pub trait TokenSource<V> {
    fn next_token(&mut self) -> Result<Token<V>, StreamError>;

    /// Releases the underlying input. Called exactly once by the owner of the source.
    fn close(&mut self) {}
}

impl<V, T: TokenSource<V> + ?Sized> TokenSource<V> for Box<T> {
    fn next_token(&mut self) -> Result<Token<V>, StreamError> {
        (**self).next_token()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Token source replaying a prepared list, then an end-of-file token forever.
pub struct VecTokenSource<V> {
    tokens: VecDeque<Token<V>>,
    eof: Token<()>,
    closed: bool,
}

impl<V> VecTokenSource<V> {
    pub fn new(tokens: impl IntoIterator<Item = Token<V>>, eof_symbol: SymbolId) -> Self {
        let tokens: VecDeque<_> = tokens.into_iter().collect();
        let (line, column) = tokens
            .back()
            .map(|t| (t.line, t.column + 1))
            .unwrap_or((1, 1));
        Self {
            tokens,
            eof: Token::new(eof_symbol).at(line, column),
            closed: false,
        }
    }

    /// Convenience for tests: tokens numbered by `symbols`, values from `values`,
    /// laid out on line 1 one column apart.
    pub fn from_symbols(
        symbols: impl IntoIterator<Item = (SymbolId, Option<V>)>,
        eof_symbol: SymbolId,
    ) -> Self {
        let tokens = symbols
            .into_iter()
            .enumerate()
            .map(|(i, (number, value))| Token {
                number,
                value,
                file: None,
                line: 1,
                column: i as u32 + 1,
            });
        Self::new(tokens, eof_symbol)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<V> TokenSource<V> for VecTokenSource<V> {
    fn next_token(&mut self) -> Result<Token<V>, StreamError> {
        Ok(match self.tokens.pop_front() {
            Some(t) => t,
            None => self.eof.position_only(),
        })
    }

    fn close(&mut self) {
        self.closed = true;
        self.tokens.clear();
    }
}
