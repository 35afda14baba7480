// src/scanner/mod.rs
//
// Table-driven scanner. The forward DFA finds the longest prefix matching any token
// pattern (a token followed by its right context counts as one pattern); candidates
// are then tried from the longest length down. Tokens with right context run the
// reverse DFA from the end of the match to find where the token stops and the
// context starts. The context itself is left in the input.
pub mod source;
pub mod tables;

use std::{io, sync::Arc};

pub use source::{ByteSource, Fill, LineSource, Prescanner, ScanUnit, StrSource};
pub use tables::{Dfa, INVALID_STATE, NO_CONTEXT, ScannerTable};

use crate::{
    error::StreamError,
    token::{SymbolId, Token, TokenSource},
};

const MIN_BUFFER: usize = 16;

/// What a token factory decided about a candidate match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAction {
    /// Deliver the token and move past its text.
    Assemble,
    /// Move past the text silently and keep scanning.
    Discard,
    /// Not this one; try the next candidate (same or shorter length).
    Reject,
}

/// A candidate match as seen by a token factory.
pub struct TokenMatch<'a, U> {
    token: usize,
    param: i32,
    text: &'a [U],
    line: u32,
    column: u32,
    condition: &'a mut usize,
    condition_count: usize,
}

impl<U> TokenMatch<'_, U> {
    pub fn token(&self) -> usize {
        self.token
    }

    pub fn param(&self) -> i32 {
        self.param
    }

    pub fn text(&self) -> &[U] {
        self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn condition(&self) -> usize {
        *self.condition
    }

    /// Switches the start condition for the scans that follow. Out-of-range conditions
    /// are refused.
    pub fn set_condition(&mut self, condition: usize) -> bool {
        if condition >= self.condition_count {
            return false;
        }
        *self.condition = condition;
        true
    }
}

/// The token being assembled: starts numbered by the token's param (or its token number
/// when the param is negative) with no value.
#[derive(Debug)]
pub struct TokenDraft<V> {
    pub number: SymbolId,
    pub value: Option<V>,
}

pub trait TokenFactory<U, V> {
    fn make_token(&mut self, m: &mut TokenMatch<'_, U>, draft: &mut TokenDraft<V>) -> TokenAction;
}

impl<U, V, F> TokenFactory<U, V> for F
where
    F: FnMut(&mut TokenMatch<'_, U>, &mut TokenDraft<V>) -> TokenAction,
{
    fn make_token(&mut self, m: &mut TokenMatch<'_, U>, draft: &mut TokenDraft<V>) -> TokenAction {
        self(m, draft)
    }
}

/// Notifications from the scanner. Nothing here can stop the scan.
pub trait ScannerClient<U: ScanUnit> {
    fn scanner_eof(&mut self, line: u32, column: u32) {
        log::trace!("scanner reached end of input at {line}:{column}");
    }

    /// A unit no token pattern starts with; the scanner skips it.
    fn scanner_unmatched(&mut self, unit: U, line: u32, column: u32) {
        log::warn!("unmatched input {unit:?} at {line}:{column}");
    }

    fn scanner_io_error(&mut self, err: &io::Error) {
        log::error!("scanner input failed: {err}");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogScannerClient;

impl<U: ScanUnit> ScannerClient<U> for LogScannerClient {}

#[derive(Debug, Clone)]
pub struct ScannerOptions {
    pub initial_buffer: usize,
    pub tab_width: u32,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            initial_buffer: 4096,
            tab_width: 8,
        }
    }
}

enum Selection<V> {
    Token(usize, TokenDraft<V>),
    Discard(usize),
    Unmatched,
}

pub struct Scanner<U: ScanUnit, V> {
    table: Arc<ScannerTable>,
    eof_symbol: SymbolId,
    options: ScannerOptions,
    factories: Vec<Option<Box<dyn TokenFactory<U, V>>>>,
    client: Box<dyn ScannerClient<U>>,

    source: Option<Box<dyn Prescanner<U>>>,
    file: Option<Arc<str>>,
    source_done: bool,
    eof_reported: bool,

    // window [token_start, data_end) of buf holds the unconsumed input
    buf: Vec<U>,
    token_start: usize,
    data_end: usize,

    condition: usize,
    // recognition[i] = forward recognition code after i units of the current match
    recognition: Vec<usize>,
    line: u32,
    column: u32,
}

impl<U: ScanUnit, V> Scanner<U, V> {
    pub fn new(table: Arc<ScannerTable>, eof_symbol: SymbolId) -> Self {
        Self::with_options(table, eof_symbol, ScannerOptions::default())
    }

    pub fn with_options(table: Arc<ScannerTable>, eof_symbol: SymbolId, options: ScannerOptions) -> Self {
        let factories = (0..table.token_count()).map(|_| None).collect();
        Self {
            table,
            eof_symbol,
            options,
            factories,
            client: Box::new(LogScannerClient),
            source: None,
            file: None,
            source_done: true,
            eof_reported: false,
            buf: Vec::new(),
            token_start: 0,
            data_end: 0,
            condition: 0,
            recognition: Vec::new(),
            line: 1,
            column: 1,
        }
    }

    pub fn table(&self) -> &Arc<ScannerTable> {
        &self.table
    }

    /// Installs a factory for one token number. Tokens without a factory are assembled.
    pub fn set_factory<F>(&mut self, token: usize, f: F)
    where
        F: FnMut(&mut TokenMatch<'_, U>, &mut TokenDraft<V>) -> TokenAction + 'static,
    {
        self.set_token_factory(token, Box::new(f));
    }

    pub fn set_token_factory(&mut self, token: usize, f: Box<dyn TokenFactory<U, V>>) {
        if token >= self.factories.len() {
            log::warn!("ignoring factory for token {token}: table has {} tokens", self.factories.len());
            return;
        }
        self.factories[token] = Some(f);
    }

    pub fn set_client(&mut self, client: impl ScannerClient<U> + 'static) {
        self.client = Box::new(client);
    }

    /// Starts scanning a new source. A previously open source is closed first.
    pub fn open(&mut self, source: impl Prescanner<U> + 'static, file: Option<&str>) {
        self.close();
        self.source = Some(Box::new(source));
        self.file = file.map(Arc::from);
        self.source_done = false;
        self.eof_reported = false;
        let initial = self.options.initial_buffer.max(MIN_BUFFER);
        if self.buf.len() < initial {
            self.buf.resize(initial, U::default());
        }
        self.token_start = 0;
        self.data_end = 0;
        self.condition = 0;
        self.line = 1;
        self.column = 1;
    }

    /// Closes the current source, if any. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.close();
        }
        self.source_done = true;
    }

    pub fn condition(&self) -> usize {
        self.condition
    }

    pub fn set_condition(&mut self, condition: usize) -> bool {
        if condition >= self.table.condition_count {
            return false;
        }
        self.condition = condition;
        true
    }

    /// Position of the next unscanned unit.
    pub fn position(&self) -> (u32, u32) {
        (self.line, self.column)
    }

    pub fn next_token(&mut self) -> Result<Token<V>, StreamError> {
        loop {
            if self.data_end == self.token_start && !self.fill_more()? {
                return Ok(self.eof_token());
            }
            let context_len = self.run_forward()?;
            let (line, column) = (self.line, self.column);
            match self.select(context_len) {
                Selection::Token(n, draft) => {
                    self.advance(n);
                    log::trace!("token {} ({n} units) at {line}:{column}", draft.number);
                    return Ok(Token {
                        number: draft.number,
                        value: draft.value,
                        file: self.file.clone(),
                        line,
                        column,
                    });
                }
                Selection::Discard(n) => self.advance(n),
                Selection::Unmatched => {
                    let unit = self.buf[self.token_start];
                    self.client.scanner_unmatched(unit, line, column);
                    self.advance(1);
                }
            }
        }
    }

    fn eof_token(&mut self) -> Token<V> {
        if !self.eof_reported {
            self.eof_reported = true;
            self.client.scanner_eof(self.line, self.column);
        }
        Token {
            number: self.eof_symbol,
            value: None,
            file: self.file.clone(),
            line: self.line,
            column: self.column,
        }
    }

    /// Runs the forward DFA from the token start and returns the length of the longest
    /// run before an invalid transition, an uncategorized unit, or end of input.
    fn run_forward(&mut self) -> Result<usize, StreamError> {
        let table = Arc::clone(&self.table);
        let dfa = &table.forward;
        let mut state = dfa.initial(self.condition);
        self.recognition.clear();
        self.recognition.push(dfa.code(state));
        let mut len = 0;
        loop {
            if self.token_start + len == self.data_end && !self.fill_more()? {
                break;
            }
            let unit = self.buf[self.token_start + len];
            let Some(category) = table.category(unit.ordinal()) else {
                break;
            };
            let next = dfa.next(state, category);
            if next == INVALID_STATE {
                break;
            }
            state = next;
            len += 1;
            self.recognition.push(dfa.code(state));
        }
        Ok(len)
    }

    fn select(&mut self, context_len: usize) -> Selection<V> {
        let table = Arc::clone(&self.table);
        // Zero-length matches are never tokens.
        for len in (1..=context_len).rev() {
            for &token in table.forward.tokens(self.recognition[len]) {
                let token = token as usize;
                let token_len = match table.context(token) {
                    None => len,
                    Some(context) => match self.find_split(&table, len, context) {
                        Some(k) => k,
                        None => continue,
                    },
                };
                let param = table.param(token);
                let mut draft = TokenDraft {
                    number: u32::try_from(param).unwrap_or(token as SymbolId),
                    value: None,
                };
                match self.invoke(token, param, token_len, &mut draft) {
                    TokenAction::Assemble => return Selection::Token(token_len, draft),
                    TokenAction::Discard => return Selection::Discard(token_len),
                    TokenAction::Reject => {}
                }
            }
        }
        Selection::Unmatched
    }

    /// Walks the reverse DFA back from `len` and returns the longest token length at
    /// which both automata agree the right context `context` may begin.
    fn find_split(&self, table: &ScannerTable, len: usize, context: usize) -> Option<usize> {
        let (fwd, rev) = (&table.forward, &table.reverse);
        let mut state = rev.initial(self.condition);
        if fwd.splits(self.recognition[len], context) && rev.splits(rev.code(state), context) {
            return Some(len);
        }
        for k in (1..len).rev() {
            let unit = self.buf[self.token_start + k];
            state = rev.next(state, table.category(unit.ordinal())?);
            if state == INVALID_STATE {
                return None;
            }
            if fwd.splits(self.recognition[k], context) && rev.splits(rev.code(state), context) {
                return Some(k);
            }
        }
        None
    }

    fn invoke(&mut self, token: usize, param: i32, len: usize, draft: &mut TokenDraft<V>) -> TokenAction {
        let Scanner {
            table,
            factories,
            buf,
            token_start,
            condition,
            line,
            column,
            ..
        } = self;
        let Some(factory) = factories.get_mut(token).and_then(Option::as_mut) else {
            return TokenAction::Assemble;
        };
        let mut m = TokenMatch {
            token,
            param,
            text: &buf[*token_start..*token_start + len],
            line: *line,
            column: *column,
            condition,
            condition_count: table.condition_count,
        };
        factory.make_token(&mut m, draft)
    }

    /// Consumes `n` units, keeping line and column current.
    fn advance(&mut self, n: usize) {
        let tab = self.options.tab_width.max(1);
        for &u in &self.buf[self.token_start..self.token_start + n] {
            if u.is_line_break() {
                self.line += 1;
                self.column = 1;
            } else if u.is_tab() {
                self.column = ((self.column - 1) / tab + 1) * tab + 1;
            } else {
                self.column += 1;
            }
        }
        self.token_start += n;
    }

    /// Reads more input behind `data_end`. Returns false once the source is exhausted.
    fn fill_more(&mut self) -> Result<bool, StreamError> {
        loop {
            if self.source_done {
                return Ok(false);
            }
            if self.data_end == self.buf.len() {
                self.make_room(1);
            }
            let Some(source) = self.source.as_mut() else {
                self.source_done = true;
                return Ok(false);
            };
            let free = self.buf.len() - self.data_end;
            match source.fill(&mut self.buf[self.data_end..]) {
                Ok(Fill::Read(n)) if n > 0 => {
                    self.data_end += n.min(free);
                    return Ok(true);
                }
                Ok(Fill::Read(_)) | Ok(Fill::Eof) => {
                    self.source_done = true;
                    return Ok(false);
                }
                Ok(Fill::TooSmall(need)) if need > free => self.make_room(need),
                Ok(Fill::TooSmall(need)) => {
                    let err = io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("source wants {need} units but refused {free}"),
                    );
                    return Err(self.io_failure(err));
                }
                Err(err) => return Err(self.io_failure(err)),
            }
        }
    }

    /// I/O failures end the scan: the source is closed, buffered input dropped, and
    /// later calls see EOF.
    fn io_failure(&mut self, err: io::Error) -> StreamError {
        self.client.scanner_io_error(&err);
        self.close();
        self.data_end = self.token_start;
        StreamError::Io(err)
    }

    /// Ensures at least `extra` free units behind the window, first by moving the window
    /// to the front of the buffer, then by growing the buffer by at least half.
    fn make_room(&mut self, extra: usize) {
        if self.token_start > 0 {
            self.buf.copy_within(self.token_start..self.data_end, 0);
            self.data_end -= self.token_start;
            self.token_start = 0;
        }
        let len = self.buf.len();
        let free = len - self.data_end;
        // Demanding a quarter of the buffer free keeps a long match from compacting
        // the window over and over for a few units each time.
        if free >= extra && free >= len / 4 && free > 0 {
            return;
        }
        let new_len = (len + len / 2).max(self.data_end + extra).max(MIN_BUFFER);
        log::debug!("scanner buffer grows {len} -> {new_len}");
        self.buf.resize(new_len, U::default());
    }
}

impl<U: ScanUnit, V> TokenSource<V> for Scanner<U, V> {
    fn next_token(&mut self) -> Result<Token<V>, StreamError> {
        Scanner::next_token(self)
    }

    fn close(&mut self) {
        Scanner::close(self)
    }
}
