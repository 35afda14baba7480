// src/parser/tables/mod.rs
pub mod io;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

pub use io::{
    load_parser_bin_bytes, load_parser_json_bytes, read_parser_table, save_parser_bin,
    save_parser_json, write_parser_table,
};

use crate::{
    error::{TableError, ensure},
    token::SymbolId,
};

/// Parsing starts here.
pub const INITIAL_STATE: usize = 0;

/// A decoded `action[state][symbol]` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Reduce by this production; the goal production means accept.
    Reduce(usize),
    /// Shift, then reduce by this production right away.
    ShiftReduce(usize),
    Shift(usize),
    Error,
}

/// A decoded `unwinding[state]` entry: what the grammar expects next in this state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unwind {
    Reduce(usize),
    Shift(SymbolId),
}

/// Immutable LR(1) tables. Reduction callbacks are kept apart (see
/// [`crate::parser::Bindings`]) so one table can serve any number of parsers.
///
/// Action values, with `PC` the production count:
/// `a < PC` reduce `a`, `PC <= a < 2PC` shift-reduce `a - PC`, `a == 2PC` error,
/// `a > 2PC` shift to state `a - 2PC`. The extra last column of `action` belongs to
/// the continuation marker, whose meaning is taken from `unwinding` instead.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParserTable {
    pub symbol_count: usize,
    pub production_lhs: Vec<u32>,
    pub production_rhs_len: Vec<u32>,
    pub production_param: Vec<i32>,

    pub max_insertion: usize,
    pub max_deletion: usize,
    pub validation_length: usize,
    /// Terminals tried as one-symbol insertions, most preferred first.
    pub single_point_insertions: Vec<u32>,
    pub insertion_cost: Vec<u32>, // [symbol]
    pub deletion_cost: Vec<u32>,  // [symbol]

    pub goal_production: usize,
    pub eof_symbol: SymbolId,

    pub action: Vec<Vec<u16>>, // [state][symbol + 1]
    /// `< PC` reduce; `>= PC` shift terminal `a - PC`. Only error repair reads it.
    pub unwinding: Vec<u16>,

    pub symbol_names: Vec<String>,
    pub production_link_names: Vec<String>,
}

impl ParserTable {
    #[inline]
    pub fn production_count(&self) -> usize {
        self.production_lhs.len()
    }

    #[inline]
    pub fn state_count(&self) -> usize {
        self.action.len()
    }

    /// Symbol number of the continuation marker.
    #[inline]
    pub fn marker_symbol(&self) -> SymbolId {
        self.symbol_count as SymbolId
    }

    #[inline]
    pub fn is_marker(&self, symbol: SymbolId) -> bool {
        symbol as usize == self.symbol_count
    }

    pub fn decode(&self, a: u16) -> Action {
        let a = a as usize;
        let pc = self.production_count();
        if a < pc {
            Action::Reduce(a)
        } else if a < 2 * pc {
            Action::ShiftReduce(a - pc)
        } else if a == 2 * pc {
            Action::Error
        } else {
            Action::Shift(a - 2 * pc)
        }
    }

    /// Symbols outside the table (markers included) are errors here; the parser
    /// resolves markers through [`ParserTable::unwind`] first.
    #[inline]
    pub fn action(&self, state: usize, symbol: SymbolId) -> Action {
        match self.action[state].get(symbol as usize) {
            Some(&a) if (symbol as usize) < self.symbol_count => self.decode(a),
            _ => Action::Error,
        }
    }

    #[inline]
    pub fn unwind(&self, state: usize) -> Unwind {
        let a = self.unwinding[state] as usize;
        let pc = self.production_count();
        if a < pc {
            Unwind::Reduce(a)
        } else {
            Unwind::Shift((a - pc) as SymbolId)
        }
    }

    #[inline]
    pub fn lhs(&self, production: usize) -> SymbolId {
        self.production_lhs[production]
    }

    #[inline]
    pub fn rhs_len(&self, production: usize) -> usize {
        self.production_rhs_len[production] as usize
    }

    #[inline]
    pub fn param(&self, production: usize) -> i32 {
        self.production_param[production]
    }

    #[inline]
    pub fn insertion_cost(&self, symbol: SymbolId) -> u64 {
        self.insertion_cost.get(symbol as usize).map_or(u64::from(u32::MAX), |&c| c.into())
    }

    #[inline]
    pub fn deletion_cost(&self, symbol: SymbolId) -> u64 {
        self.deletion_cost.get(symbol as usize).map_or(u64::from(u32::MAX), |&c| c.into())
    }

    pub fn symbol_name(&self, symbol: SymbolId) -> Option<&str> {
        self.symbol_names.get(symbol as usize).map(String::as_str)
    }

    /// Name for log lines: the symbol name if the table has one, else `#n`.
    pub fn symbol_label(&self, symbol: SymbolId) -> String {
        match self.symbol_name(symbol) {
            Some(name) => name.to_string(),
            None if self.is_marker(symbol) => "<continue>".to_string(),
            None => format!("#{symbol}"),
        }
    }

    /// Name -> symbol map. Built on demand; callers keep the result.
    pub fn symbol_lookup(&self) -> HashMap<String, SymbolId> {
        self.symbol_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i as SymbolId))
            .collect()
    }

    /// Productions sharing a link name, in production order.
    pub fn productions_by_link_name(&self, name: &str) -> Vec<usize> {
        self.production_link_names
            .iter()
            .enumerate()
            .filter(|(_, n)| n.as_str() == name)
            .map(|(p, _)| p)
            .collect()
    }

    /// Full consistency check. Loading from bytes always runs it.
    pub fn check(&self) -> Result<(), TableError> {
        let symbols = self.symbol_count;
        let pc = self.production_count();
        let states = self.state_count();

        ensure(symbols > 0, || "no symbols".into())?;
        ensure(pc > 0, || "no productions".into())?;
        ensure(states > INITIAL_STATE, || "no states".into())?;
        ensure(self.production_rhs_len.len() == pc, || {
            format!("{} RHS lengths for {pc} productions", self.production_rhs_len.len())
        })?;
        ensure(self.production_param.len() == pc, || {
            format!("{} params for {pc} productions", self.production_param.len())
        })?;
        for (p, &lhs) in self.production_lhs.iter().enumerate() {
            ensure((lhs as usize) < symbols, || {
                format!("production {p} has LHS {lhs} out of range")
            })?;
        }
        ensure(self.goal_production < pc, || {
            format!("goal production {} out of range", self.goal_production)
        })?;
        ensure((self.eof_symbol as usize) < symbols, || {
            format!("EOF symbol {} out of range", self.eof_symbol)
        })?;
        ensure(self.insertion_cost.len() == symbols, || {
            format!("{} insertion costs for {symbols} symbols", self.insertion_cost.len())
        })?;
        ensure(self.deletion_cost.len() == symbols, || {
            format!("{} deletion costs for {symbols} symbols", self.deletion_cost.len())
        })?;
        for &s in &self.single_point_insertions {
            ensure((s as usize) < symbols, || {
                format!("single-point insertion symbol {s} out of range")
            })?;
        }
        // Largest shift value is 2PC + states - 1.
        ensure(2 * pc + states <= u16::MAX as usize + 1, || {
            format!("{states} states and {pc} productions do not fit 16-bit actions")
        })?;

        for (s, row) in self.action.iter().enumerate() {
            ensure(row.len() == symbols + 1, || {
                format!("state {s} has {} actions, expected {}", row.len(), symbols + 1)
            })?;
            for (sym, &a) in row.iter().enumerate() {
                match self.decode(a) {
                    Action::Shift(next) => ensure(next < states, || {
                        format!("action [{s}][{sym}] shifts to state {next} out of range")
                    })?,
                    Action::ShiftReduce(p) => ensure(self.production_rhs_len[p] > 0, || {
                        format!("action [{s}][{sym}] shift-reduces by empty production {p}")
                    })?,
                    Action::Reduce(_) | Action::Error => {}
                }
            }
        }

        ensure(self.unwinding.len() == states, || {
            format!("{} unwinding entries for {states} states", self.unwinding.len())
        })?;
        for (s, &a) in self.unwinding.iter().enumerate() {
            ensure((a as usize) < pc + symbols, || {
                format!("unwinding entry {a} of state {s} out of range")
            })?;
        }

        ensure(self.symbol_names.is_empty() || self.symbol_names.len() == symbols, || {
            format!("{} symbol names for {symbols} symbols", self.symbol_names.len())
        })?;
        ensure(
            self.production_link_names.is_empty() || self.production_link_names.len() == pc,
            || format!("{} link names for {pc} productions", self.production_link_names.len()),
        )?;
        Ok(())
    }
}
