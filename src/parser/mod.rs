// src/parser/mod.rs
//
// LR(1) parser engine. Tokens come through a `Preprocessor`; reductions call the
// `NonterminalFactory` bound to the production. Syntax errors go to LM repair
// (`repair`) and only become fatal when no repair is found.
pub mod repair;
pub mod tables;

use std::{io, sync::Arc};

pub use repair::Insertion;
use repair::PLACEHOLDER_STATE;
pub use tables::{Action, INITIAL_STATE, ParserTable, Unwind};

use crate::{
    error::ParseError,
    preprocess::Preprocessor,
    token::{SymbolId, Token},
};

// -------------------- reductions --------------------

/// The right-hand side being reduced, as seen by a nonterminal factory.
///
/// Offsets count from the first RHS symbol: `0..rhs_len()` are the RHS values. Negative
/// offsets reach values of enclosing productions that are still on the stack.
pub struct Reduction<'a, V> {
    production: usize,
    param: i32,
    rhs_len: usize,
    values: &'a mut Vec<Option<V>>,
    position: &'a Token<()>,
}

impl<V> Reduction<'_, V> {
    pub fn production(&self) -> usize {
        self.production
    }

    pub fn param(&self) -> i32 {
        self.param
    }

    pub fn rhs_len(&self) -> usize {
        self.rhs_len
    }

    fn index(&self, offset: isize) -> Option<usize> {
        let base = self.values.len() - self.rhs_len;
        base.checked_add_signed(offset).filter(|&i| i < self.values.len())
    }

    pub fn get(&self, offset: isize) -> Option<&V> {
        self.index(offset).and_then(|i| self.values[i].as_ref())
    }

    /// Moves the value out; later `get`s at this offset see nothing.
    pub fn take(&mut self, offset: isize) -> Option<V> {
        self.index(offset).and_then(|i| self.values[i].take())
    }

    /// Position of the most recently shifted token.
    pub fn position(&self) -> &Token<()> {
        self.position
    }
}

pub trait NonterminalFactory<V> {
    fn make_nonterminal(&mut self, r: &mut Reduction<'_, V>) -> Option<V>;
}

impl<V, F> NonterminalFactory<V> for F
where
    F: FnMut(&mut Reduction<'_, V>) -> Option<V>,
{
    fn make_nonterminal(&mut self, r: &mut Reduction<'_, V>) -> Option<V> {
        self(r)
    }
}

/// Reduction callbacks for one parser, keyed by production. Kept apart from the
/// shared table so parsers with different semantics can use the same grammar.
pub struct Bindings<V> {
    factories: Vec<Box<dyn NonterminalFactory<V>>>,
    slots: Vec<Option<usize>>, // [production] -> factories index
}

impl<V: 'static> Bindings<V> {
    pub fn new(table: &ParserTable) -> Self {
        Self {
            factories: Vec::new(),
            slots: vec![None; table.production_count()],
        }
    }

    pub fn bind<F>(&mut self, production: usize, f: F)
    where
        F: FnMut(&mut Reduction<'_, V>) -> Option<V> + 'static,
    {
        self.bind_factory(production, Box::new(f));
    }

    pub fn bind_factory(&mut self, production: usize, f: Box<dyn NonterminalFactory<V>>) {
        if production >= self.slots.len() {
            log::warn!("ignoring binding for production {production}: table has {}", self.slots.len());
            return;
        }
        self.slots[production] = Some(self.factories.len());
        self.factories.push(f);
    }

    /// Binds one factory to every production whose link name is `link_name`. Returns
    /// how many productions were bound.
    pub fn bind_link<F>(&mut self, table: &ParserTable, link_name: &str, f: F) -> usize
    where
        F: FnMut(&mut Reduction<'_, V>) -> Option<V> + 'static,
    {
        let productions = table.productions_by_link_name(link_name);
        if productions.is_empty() {
            log::warn!("no production has link name {link_name:?}");
            return 0;
        }
        let index = self.factories.len();
        self.factories.push(Box::new(f));
        for &p in &productions {
            if let Some(slot) = self.slots.get_mut(p) {
                *slot = Some(index);
            }
        }
        productions.len()
    }

    pub fn is_bound(&self, production: usize) -> bool {
        matches!(self.slots.get(production), Some(Some(_)))
    }

    fn factory(&mut self, production: usize) -> Option<&mut Box<dyn NonterminalFactory<V>>> {
        let index = (*self.slots.get(production)?)?;
        self.factories.get_mut(index)
    }
}

// -------------------- client hooks --------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairKind {
    Deletion,
    SinglePoint,
    Continuation,
}

/// What a successful repair did to the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairReport {
    pub deleted: Vec<SymbolId>,
    pub inserted: Vec<SymbolId>,
    pub kind: RepairKind,
    pub cost: u64,
}

pub trait ParserClient<V> {
    fn parser_io_error(&mut self, err: &io::Error) {
        log::error!("parse aborted by I/O error: {err}");
    }

    fn parser_syntax_exception(&mut self, message: &str) {
        log::error!("parse aborted by token source: {message}");
    }

    /// `token` is the token that triggered the repair, before anything was deleted.
    fn parser_error_repair(&mut self, token: &Token<V>, report: &RepairReport) {
        log::warn!(
            "syntax error at {}:{} repaired ({:?}): deleted {:?}, inserted {:?}",
            token.line,
            token.column,
            report.kind,
            report.deleted,
            report.inserted
        );
    }

    fn parser_error_fail(&mut self, token: &Token<V>) {
        log::error!("unrepairable syntax error at {}:{}", token.line, token.column);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogClient;

impl<V> ParserClient<V> for LogClient {}

// -------------------- engine --------------------

#[derive(Debug, Clone)]
pub struct ParserOptions {
    pub initial_stack: usize,
    /// With repair off every syntax error is fatal.
    pub error_repair: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            initial_stack: 64,
            error_repair: true,
        }
    }
}

enum Step<V> {
    Continue,
    Accept(Option<V>),
}

pub struct Parser<V> {
    table: Arc<ParserTable>,
    bindings: Bindings<V>,
    options: ParserOptions,
    states: Vec<usize>,
    values: Vec<Option<V>>, // same length as `states` between steps
    last_shift: Token<()>,
}

impl<V: 'static> Parser<V> {
    pub fn new(table: Arc<ParserTable>, bindings: Bindings<V>) -> Self {
        Self::with_options(table, bindings, ParserOptions::default())
    }

    pub fn with_options(table: Arc<ParserTable>, bindings: Bindings<V>, options: ParserOptions) -> Self {
        Self {
            states: Vec::with_capacity(options.initial_stack),
            values: Vec::with_capacity(options.initial_stack),
            table,
            bindings,
            options,
            last_shift: Token::new(0),
        }
    }

    pub fn table(&self) -> &Arc<ParserTable> {
        &self.table
    }

    pub fn bindings_mut(&mut self) -> &mut Bindings<V> {
        &mut self.bindings
    }

    /// Parses everything `pp` delivers and returns the value of the goal production.
    ///
    /// `pp` is closed on every outcome, and the stacks are empty afterwards.
    pub fn parse(
        &mut self,
        pp: &mut Preprocessor<V>,
        client: &mut dyn ParserClient<V>,
    ) -> Result<Option<V>, ParseError> {
        self.states.clear();
        self.values.clear();
        self.states.push(INITIAL_STATE);
        self.values.push(None);
        self.last_shift = Token::new(0);

        let result = self.run(pp, client);

        self.states.clear();
        self.values.clear();
        pp.close();
        match &result {
            Err(ParseError::Io(e)) => client.parser_io_error(e),
            Err(ParseError::Syntax(m)) => client.parser_syntax_exception(m),
            _ => {}
        }
        result
    }

    fn top(&self) -> usize {
        self.states.last().copied().unwrap_or(INITIAL_STATE)
    }

    fn run(&mut self, pp: &mut Preprocessor<V>, client: &mut dyn ParserClient<V>) -> Result<Option<V>, ParseError> {
        let table = Arc::clone(&self.table);
        loop {
            let token = pp.next_token()?;
            let state = self.top();
            let symbol = if table.is_marker(token.number) {
                match table.unwind(state) {
                    Unwind::Shift(t) => t,
                    Unwind::Reduce(p) => {
                        // The marker stays; it is resolved again in the new state.
                        pp.push_back(token);
                        if let Step::Accept(v) = self.reduce(p)? {
                            return Ok(v);
                        }
                        continue;
                    }
                }
            } else {
                token.number
            };

            let action = table.action(state, symbol);
            log::trace!("state {state}, symbol {}: {action:?}", table.symbol_label(symbol));
            match action {
                Action::Shift(next) => self.shift(next, token),
                Action::ShiftReduce(p) => {
                    self.shift(PLACEHOLDER_STATE, token);
                    if let Step::Accept(v) = self.reduce(p)? {
                        return Ok(v);
                    }
                }
                Action::Reduce(p) => {
                    pp.push_back(token);
                    if let Step::Accept(v) = self.reduce(p)? {
                        return Ok(v);
                    }
                }
                Action::Error => {
                    pp.push_back(token);
                    self.recover(pp, client)?;
                }
            }
        }
    }

    fn shift(&mut self, state: usize, token: Token<V>) {
        self.last_shift = token.position_only();
        self.states.push(state);
        self.values.push(token.value);
    }

    /// Reduces by `production`, then takes the goto on its LHS, following shift-reduce
    /// entries until a plain shift lands.
    fn reduce(&mut self, mut production: usize) -> Result<Step<V>, ParseError> {
        let table = Arc::clone(&self.table);
        loop {
            let n = table.rhs_len(production);
            if n >= self.states.len() {
                return Err(ParseError::Table(format!(
                    "reducing production {production} would pop the initial state"
                )));
            }
            let value = self.invoke(production, n);
            let keep = self.states.len() - n;
            self.states.truncate(keep);
            self.values.truncate(keep);

            if production == table.goal_production {
                log::trace!("accept");
                return Ok(Step::Accept(value));
            }
            let lhs = table.lhs(production);
            match table.action(self.top(), lhs) {
                Action::Shift(next) => {
                    self.states.push(next);
                    self.values.push(value);
                    return Ok(Step::Continue);
                }
                Action::ShiftReduce(p) => {
                    self.states.push(PLACEHOLDER_STATE);
                    self.values.push(value);
                    production = p;
                }
                other => {
                    return Err(ParseError::Table(format!(
                        "no goto on {} from state {}: {other:?}",
                        table.symbol_label(lhs),
                        self.top()
                    )));
                }
            }
        }
    }

    fn invoke(&mut self, production: usize, rhs_len: usize) -> Option<V> {
        let Parser {
            table,
            bindings,
            values,
            last_shift,
            ..
        } = self;
        let mut r = Reduction {
            production,
            param: table.param(production),
            rhs_len,
            values,
            position: last_shift,
        };
        match bindings.factory(production) {
            Some(f) => f.make_nonterminal(&mut r),
            None => r.take(0),
        }
    }

    fn recover(&mut self, pp: &mut Preprocessor<V>, client: &mut dyn ParserClient<V>) -> Result<(), ParseError> {
        let table = Arc::clone(&self.table);
        let found = if self.options.error_repair {
            repair::search(&table, &self.states, pp)?
        } else {
            None
        };

        let Some(found) = found else {
            let token = pp.peek_ahead(0)?;
            client.parser_error_fail(token);
            return Err(ParseError::Unrepairable {
                symbol: token.number,
                line: token.line,
                column: token.column,
            });
        };

        let mut deleted = Vec::with_capacity(found.deletions);
        for i in 0..found.deletions {
            deleted.push(pp.peek_ahead(i)?.number);
        }
        let (kind, inserted) = match &found.insertion {
            Insertion::None => (RepairKind::Deletion, Vec::new()),
            Insertion::Single(t) => (RepairKind::SinglePoint, vec![*t]),
            Insertion::Continuation(ts) => (RepairKind::Continuation, ts.clone()),
        };
        let report = RepairReport {
            deleted,
            inserted,
            kind,
            cost: found.cost,
        };
        let position: Token<()> = {
            let token = pp.peek_ahead(0)?;
            client.parser_error_repair(token, &report);
            token.position_only()
        };

        for _ in 0..found.deletions {
            pp.next_token()?;
        }
        match found.insertion {
            Insertion::None => {}
            Insertion::Single(t) => pp.push_back(position.synthetic(t)),
            Insertion::Continuation(ts) => {
                for _ in &ts {
                    pp.push_back(position.synthetic(table.marker_symbol()));
                }
            }
        }
        Ok(())
    }
}
