// src/scanner/tables/mod.rs
pub mod io;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

pub use io::{
    load_scanner_bin_bytes, load_scanner_json_bytes, read_scanner_table, save_scanner_bin,
    save_scanner_json, write_scanner_table,
};

use crate::error::{TableError, ensure};

/// Transitions into this state end a DFA run. Its row must loop onto itself.
pub const INVALID_STATE: usize = 0;

/// Context number stored for tokens without right context.
pub const NO_CONTEXT: i32 = -1;

/// One deterministic automaton of the forward/reverse pair.
///
/// `recognition[state]` is a recognition code; codes index `token_list` (tokens whose
/// whole pattern is recognized, lowest token number first) and `context_split`
/// (per context number: a token/context boundary may sit here).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dfa {
    pub initial_state: Vec<u16>,
    pub transition: Vec<Vec<u16>>, // [state][category]
    pub recognition: Vec<u16>,     // [state] -> code
    pub token_list: Vec<Vec<u16>>, // [code] -> tokens
    pub context_split: Vec<Vec<bool>>, // [code][context]
}

impl Dfa {
    #[inline]
    pub fn state_count(&self) -> usize {
        self.transition.len()
    }

    #[inline]
    pub fn recognition_count(&self) -> usize {
        self.token_list.len()
    }

    #[inline]
    pub fn initial(&self, condition: usize) -> usize {
        self.initial_state[condition] as usize
    }

    #[inline]
    pub fn next(&self, state: usize, category: usize) -> usize {
        self.transition[state][category] as usize
    }

    #[inline]
    pub fn code(&self, state: usize) -> usize {
        self.recognition[state] as usize
    }

    #[inline]
    pub fn tokens(&self, code: usize) -> &[u16] {
        &self.token_list[code]
    }

    #[inline]
    pub fn splits(&self, code: usize, context: usize) -> bool {
        self.context_split[code][context]
    }

    fn check(&self, name: &str, t: &ScannerTable) -> Result<(), TableError> {
        let states = self.state_count();
        let codes = self.recognition_count();
        ensure(states > INVALID_STATE, || format!("{name} DFA has no states"))?;
        ensure(self.initial_state.len() == t.condition_count, || {
            format!(
                "{name} DFA has {} initial states for {} conditions",
                self.initial_state.len(),
                t.condition_count
            )
        })?;
        for (c, &s) in self.initial_state.iter().enumerate() {
            ensure((s as usize) < states, || {
                format!("{name} DFA initial state {s} of condition {c} out of range")
            })?;
        }
        for (s, row) in self.transition.iter().enumerate() {
            ensure(row.len() == t.category_count, || {
                format!("{name} DFA state {s} has {} transitions, expected {}", row.len(), t.category_count)
            })?;
            for (c, &next) in row.iter().enumerate() {
                ensure((next as usize) < states, || {
                    format!("{name} DFA transition [{s}][{c}] = {next} out of range")
                })?;
            }
        }
        ensure(
            self.transition[INVALID_STATE]
                .iter()
                .all(|&n| n as usize == INVALID_STATE),
            || format!("{name} DFA invalid state {INVALID_STATE} has outgoing transitions"),
        )?;
        ensure(self.recognition.len() == states, || {
            format!("{name} DFA has {} recognition codes for {states} states", self.recognition.len())
        })?;
        for (s, &code) in self.recognition.iter().enumerate() {
            ensure((code as usize) < codes, || {
                format!("{name} DFA state {s} recognition code {code} out of range")
            })?;
        }
        ensure(self.context_split.len() == codes, || {
            format!("{name} DFA has {} context rows for {codes} codes", self.context_split.len())
        })?;
        for (code, row) in self.context_split.iter().enumerate() {
            ensure(row.len() == t.context_count, || {
                format!("{name} DFA context row {code} has {} entries, expected {}", row.len(), t.context_count)
            })?;
        }
        for (code, list) in self.token_list.iter().enumerate() {
            ensure(list.windows(2).all(|w| w[0] < w[1]), || {
                format!("{name} DFA token list {code} is not strictly ascending")
            })?;
            for &tok in list {
                ensure((tok as usize) < t.token_count(), || {
                    format!("{name} DFA token list {code} names token {tok} out of range")
                })?;
            }
        }
        Ok(())
    }
}

/// Immutable scanner tables, shared by every scanner that uses them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScannerTable {
    pub category_count: usize,
    /// Input unit (byte or char ordinal) -> category. Units past the end have no category.
    pub category_table: Vec<u16>,
    pub token_param: Vec<i32>,
    pub token_context: Vec<i32>,
    pub token_names: Vec<String>,
    pub condition_count: usize,
    pub context_count: usize,
    pub forward: Dfa,
    /// Used only for tokens with right context; reads the input backwards.
    pub reverse: Dfa,
}

impl ScannerTable {
    #[inline]
    pub fn token_count(&self) -> usize {
        self.token_param.len()
    }

    #[inline]
    pub fn category(&self, unit: usize) -> Option<usize> {
        self.category_table.get(unit).map(|&c| c as usize)
    }

    #[inline]
    pub fn param(&self, token: usize) -> i32 {
        self.token_param[token]
    }

    #[inline]
    pub fn context(&self, token: usize) -> Option<usize> {
        usize::try_from(self.token_context[token]).ok()
    }

    pub fn token_name(&self, token: usize) -> Option<&str> {
        self.token_names.get(token).map(String::as_str)
    }

    /// Name -> token number map. Built on demand; callers keep the result.
    pub fn token_lookup(&self) -> HashMap<String, usize> {
        self.token_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect()
    }

    /// Full consistency check. Loading from bytes always runs it.
    pub fn check(&self) -> Result<(), TableError> {
        let tokens = self.token_count();
        ensure(self.category_count > 0, || "no input categories".into())?;
        ensure(self.condition_count > 0, || "no start conditions".into())?;
        for (u, &c) in self.category_table.iter().enumerate() {
            ensure((c as usize) < self.category_count, || {
                format!("unit {u} maps to category {c} out of range")
            })?;
        }
        ensure(self.token_context.len() == tokens, || {
            format!("{} token contexts for {tokens} tokens", self.token_context.len())
        })?;
        ensure(self.token_names.is_empty() || self.token_names.len() == tokens, || {
            format!("{} token names for {tokens} tokens", self.token_names.len())
        })?;
        for (t, &ctx) in self.token_context.iter().enumerate() {
            ensure(
                ctx == NO_CONTEXT || (ctx >= 0 && (ctx as usize) < self.context_count),
                || format!("token {t} has context number {ctx} out of range"),
            )?;
        }
        self.forward.check("forward", self)?;
        self.reverse.check("reverse", self)?;
        Ok(())
    }
}
