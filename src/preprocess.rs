// src/preprocess.rs
//
// Token-stream layer between a token source and the parser: push-back, peek-ahead at
// any distance, and stacking of nested token sources ("includes").
use std::collections::VecDeque;

use crate::{
    error::StreamError,
    token::{SymbolId, Token, TokenSource},
};

/// Turns an include-sentinel token into the token source to splice in at its place.
pub trait IncludeResolver<V> {
    fn resolve(&mut self, sentinel: Token<V>) -> Result<Box<dyn TokenSource<V>>, StreamError>;
}

impl<V, F> IncludeResolver<V> for F
where
    F: FnMut(Token<V>) -> Result<Box<dyn TokenSource<V>>, StreamError>,
{
    fn resolve(&mut self, sentinel: Token<V>) -> Result<Box<dyn TokenSource<V>>, StreamError> {
        self(sentinel)
    }
}

/// A stacked source, plus the tokens that were pending when it was stacked. Those are
/// delivered again once the source is exhausted.
struct Frame<V> {
    source: Box<dyn TokenSource<V>>,
    resume: VecDeque<Token<V>>,
}

pub struct Preprocessor<V> {
    primary: Option<Box<dyn TokenSource<V>>>,
    frames: Vec<Frame<V>>, // innermost last
    queue: VecDeque<Token<V>>,
    /// Primary end-of-file, kept once seen. The primary source is never asked again.
    eof: Option<Token<()>>,
    eof_symbol: SymbolId,
    include_symbol: Option<SymbolId>,
    resolver: Option<Box<dyn IncludeResolver<V>>>,
}

impl<V: 'static> Preprocessor<V> {
    pub fn new(primary: impl TokenSource<V> + 'static, eof_symbol: SymbolId) -> Self {
        Self {
            primary: Some(Box::new(primary)),
            frames: Vec::new(),
            queue: VecDeque::new(),
            eof: None,
            eof_symbol,
            include_symbol: None,
            resolver: None,
        }
    }

    /// Tokens numbered `symbol` are handed to `resolver` and replaced by the source it
    /// returns. They never reach the caller.
    pub fn set_include_resolver<F>(&mut self, symbol: SymbolId, resolver: F)
    where
        F: FnMut(Token<V>) -> Result<Box<dyn TokenSource<V>>, StreamError> + 'static,
    {
        self.include_symbol = Some(symbol);
        self.resolver = Some(Box::new(resolver));
    }

    pub fn eof_symbol(&self) -> SymbolId {
        self.eof_symbol
    }

    /// Number of stacked sources above the primary one.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn next_token(&mut self) -> Result<Token<V>, StreamError> {
        loop {
            if let Some(t) = self.queue.pop_front() {
                return Ok(t);
            }
            self.pull()?;
        }
    }

    /// Returns `token` to the front of the stream; it is the next token delivered.
    pub fn push_back(&mut self, token: Token<V>) {
        self.queue.push_front(token);
    }

    /// The token `distance` places ahead (0 = the next one), without consuming anything.
    pub fn peek_ahead(&mut self, distance: usize) -> Result<&Token<V>, StreamError> {
        while self.queue.len() <= distance {
            self.pull()?;
        }
        Ok(&self.queue[distance])
    }

    /// Stacks `source` at the current position: all of its tokens come before any token
    /// already pending here.
    pub fn include(&mut self, source: impl TokenSource<V> + 'static) {
        let resume = std::mem::take(&mut self.queue);
        log::debug!("include at depth {} ({} pending tokens)", self.frames.len(), resume.len());
        self.frames.push(Frame {
            source: Box::new(source),
            resume,
        });
    }

    /// Closes every source still open. Safe to call more than once.
    pub fn close(&mut self) {
        while let Some(mut frame) = self.frames.pop() {
            frame.source.close();
        }
        if let Some(mut primary) = self.primary.take() {
            primary.close();
        }
        self.queue.clear();
    }

    /// Appends at least one token to the queue.
    fn pull(&mut self) -> Result<(), StreamError> {
        loop {
            let token = if let Some(frame) = self.frames.last_mut() {
                let token = frame.source.next_token()?;
                if token.number == self.eof_symbol {
                    if let Some(mut frame) = self.frames.pop() {
                        frame.source.close();
                        let resumed = !frame.resume.is_empty();
                        self.queue.extend(frame.resume);
                        log::debug!("include finished, back to depth {}", self.frames.len());
                        if resumed {
                            return Ok(());
                        }
                    }
                    continue;
                }
                token
            } else if let Some(eof) = &self.eof {
                self.queue.push_back(eof.synthetic(self.eof_symbol));
                return Ok(());
            } else if let Some(primary) = self.primary.as_mut() {
                let token = primary.next_token()?;
                if token.number == self.eof_symbol {
                    self.eof = Some(token.position_only());
                }
                token
            } else {
                // Closed: behave like an exhausted stream.
                self.queue.push_back(Token::new(self.eof_symbol));
                return Ok(());
            };

            if Some(token.number) == self.include_symbol {
                if let Some(resolver) = self.resolver.as_mut() {
                    let source = resolver.resolve(token)?;
                    // Tokens already pending came before the sentinel.
                    self.frames.push(Frame {
                        source,
                        resume: VecDeque::new(),
                    });
                    continue;
                }
            }
            self.queue.push_back(token);
            return Ok(());
        }
    }
}

impl<V: 'static> TokenSource<V> for Preprocessor<V> {
    fn next_token(&mut self) -> Result<Token<V>, StreamError> {
        Preprocessor::next_token(self)
    }

    fn close(&mut self) {
        Preprocessor::close(self)
    }
}
