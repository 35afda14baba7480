// src/parser/repair.rs
//
// LM ("locally minimal") error repair. On a syntax error, try deleting d = 0, 1, ...
// lookahead tokens and then inserting nothing, one symbol from the single-point list,
// or the continuation the grammar itself expects (read off the unwinding table). A
// candidate is valid if the next `validation_length` real tokens then parse without
// error. The cheapest valid candidate wins; among equal costs the one found first.
//
// Every trial runs on a scratch copy of the state stack. Values are never touched.
use super::tables::{Action, ParserTable, Unwind};
use crate::{error::StreamError, preprocess::Preprocessor, token::SymbolId};

/// Stack entry pushed by shift-reduce actions; the reduction pops it right away.
pub(crate) const PLACEHOLDER_STATE: usize = usize::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    None,
    Single(SymbolId),
    /// Terminals the continuation markers resolved to during the search.
    Continuation(Vec<SymbolId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Repair {
    pub deletions: usize,
    pub insertion: Insertion,
    pub cost: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Shifted,
    Accepted,
    Error,
}

#[derive(Clone)]
struct Simulator<'t> {
    table: &'t ParserTable,
    stack: Vec<usize>,
}

impl<'t> Simulator<'t> {
    fn new(table: &'t ParserTable) -> Self {
        Self {
            table,
            stack: Vec::new(),
        }
    }

    fn reset(&mut self, states: &[usize]) {
        self.stack.clear();
        self.stack.extend_from_slice(states);
    }

    fn top(&self) -> usize {
        self.stack.last().copied().unwrap_or(PLACEHOLDER_STATE)
    }

    /// Pops the RHS of `production` and follows gotos through any shift-reduce chain.
    /// `None` on error, `Some(true)` when the goal production was reduced.
    fn reduce(&mut self, mut production: usize) -> Option<bool> {
        loop {
            let n = self.table.rhs_len(production);
            if n >= self.stack.len() {
                return None;
            }
            self.stack.truncate(self.stack.len() - n);
            if production == self.table.goal_production {
                return Some(true);
            }
            match self.table.action(self.top(), self.table.lhs(production)) {
                Action::Shift(next) => {
                    self.stack.push(next);
                    return Some(false);
                }
                Action::ShiftReduce(p) => {
                    self.stack.push(PLACEHOLDER_STATE);
                    production = p;
                }
                Action::Reduce(_) | Action::Error => return None,
            }
        }
    }

    /// Feeds one symbol (continuation markers included) until it is shifted.
    fn step(&mut self, symbol: SymbolId) -> Outcome {
        loop {
            let state = self.top();
            if state >= self.table.state_count() {
                return Outcome::Error;
            }
            let symbol = if self.table.is_marker(symbol) {
                match self.table.unwind(state) {
                    Unwind::Shift(t) => t,
                    Unwind::Reduce(p) => match self.reduce(p) {
                        None => return Outcome::Error,
                        Some(true) => return Outcome::Accepted,
                        Some(false) => continue,
                    },
                }
            } else {
                symbol
            };
            match self.table.action(state, symbol) {
                Action::Shift(next) => {
                    self.stack.push(next);
                    return Outcome::Shifted;
                }
                Action::ShiftReduce(p) => {
                    self.stack.push(PLACEHOLDER_STATE);
                    return match self.reduce(p) {
                        None => Outcome::Error,
                        Some(true) => Outcome::Accepted,
                        Some(false) => Outcome::Shifted,
                    };
                }
                Action::Reduce(p) => match self.reduce(p) {
                    None => return Outcome::Error,
                    Some(true) => return Outcome::Accepted,
                    Some(false) => {}
                },
                Action::Error => return Outcome::Error,
            }
        }
    }

    /// The terminal the unwinding table expects next from the current configuration,
    /// after performing the reductions it asks for. `None` if unwinding leads nowhere.
    fn unwind_terminal(&mut self) -> Option<SymbolId> {
        // A sane table reaches a shift after at most one reduction per stacked state.
        for _ in 0..=self.stack.len() + self.table.state_count() {
            let state = self.top();
            if state >= self.table.state_count() {
                return None;
            }
            match self.table.unwind(state) {
                Unwind::Shift(t) => return Some(t),
                Unwind::Reduce(p) => match self.reduce(p) {
                    Some(false) => {}
                    None | Some(true) => return None,
                },
            }
        }
        log::warn!("unwinding table does not reach a shift");
        None
    }
}

/// Feeds the lookahead starting at `from` and reports whether `validation_length`
/// symbols (at least one) parse, or the input ends cleanly first.
fn validate<V: 'static>(
    sim: &mut Simulator<'_>,
    pp: &mut Preprocessor<V>,
    from: usize,
) -> Result<bool, StreamError> {
    let table = sim.table;
    for i in 0..table.validation_length.max(1) {
        let symbol = pp.peek_ahead(from + i)?.number;
        match sim.step(symbol) {
            Outcome::Error => return Ok(false),
            Outcome::Accepted => return Ok(true),
            Outcome::Shifted if symbol == table.eof_symbol => return Ok(true),
            Outcome::Shifted => {}
        }
    }
    Ok(true)
}

/// Searches for the cheapest repair for the error at `pp.peek_ahead(0)`, with the
/// parser in configuration `states`. Reads lookahead but consumes nothing.
pub(crate) fn search<V: 'static>(
    table: &ParserTable,
    states: &[usize],
    pp: &mut Preprocessor<V>,
) -> Result<Option<Repair>, StreamError> {
    let mut sim = Simulator::new(table);
    let mut best: Option<Repair> = None;
    let mut deletion_cost = 0u64;
    let best_cost = |best: &Option<Repair>| best.as_ref().map_or(u64::MAX, |r| r.cost);

    for d in 0..=table.max_deletion {
        if d > 0 {
            let deleted = pp.peek_ahead(d - 1)?.number;
            if deleted == table.eof_symbol || table.is_marker(deleted) {
                break;
            }
            deletion_cost += table.deletion_cost(deleted);
        }
        if deletion_cost >= best_cost(&best) {
            break;
        }

        if d > 0 {
            sim.reset(states);
            if validate(&mut sim, pp, d)? {
                // Nothing at this or any later distance can be cheaper.
                best = Some(Repair {
                    deletions: d,
                    insertion: Insertion::None,
                    cost: deletion_cost,
                });
                break;
            }
        }

        for &t in &table.single_point_insertions {
            let cost = deletion_cost + table.insertion_cost(t);
            if cost >= best_cost(&best) {
                continue;
            }
            sim.reset(states);
            if sim.step(t) == Outcome::Shifted && validate(&mut sim, pp, d)? {
                best = Some(Repair {
                    deletions: d,
                    insertion: Insertion::Single(t),
                    cost,
                });
            }
        }

        if table.max_insertion > 0 {
            sim.reset(states);
            let mut inserted = Vec::new();
            let mut cost = deletion_cost;
            for _ in 0..table.max_insertion {
                let Some(t) = sim.unwind_terminal() else { break };
                if t == table.eof_symbol {
                    break;
                }
                cost += table.insertion_cost(t);
                if cost >= best_cost(&best) || sim.step(t) != Outcome::Shifted {
                    break;
                }
                inserted.push(t);
                let mut probe = sim.clone();
                if validate(&mut probe, pp, d)? {
                    best = Some(Repair {
                        deletions: d,
                        insertion: Insertion::Continuation(inserted),
                        cost,
                    });
                    break;
                }
            }
        }

        if best_cost(&best) == 0 {
            break;
        }
    }

    if let Some(r) = &best {
        log::debug!("repair found: delete {}, insert {:?}, cost {}", r.deletions, r.insertion, r.cost);
    }
    Ok(best)
}
