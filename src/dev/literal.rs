// src/dev/literal.rs
//
// Scanner tables for a set of literal tokens, each with an optional literal right
// context. Good enough for tests and demos; real tables come from a generator.
//
// Forward DFA: a trie over `text ++ context`. Reverse DFA: a trie over the reversed
// contexts. Every state is its own recognition code.
use std::collections::BTreeMap;

use crate::scanner::tables::{Dfa, INVALID_STATE, NO_CONTEXT, ScannerTable};

/// One literal token; `context` must follow the token but is not part of it.
#[derive(Debug, Clone)]
pub struct Literal<'a> {
    pub text: &'a str,
    pub context: Option<&'a str>,
    /// Token param; negative means "number the token by its index".
    pub param: i32,
}

impl<'a> Literal<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            context: None,
            param: -1,
        }
    }

    pub fn with_context(text: &'a str, context: &'a str) -> Self {
        Self {
            text,
            context: Some(context),
            param: -1,
        }
    }

    pub fn param(mut self, param: i32) -> Self {
        self.param = param;
        self
    }
}

const ROOT: usize = 1;

struct Trie {
    // children[state]: category -> state
    children: Vec<BTreeMap<usize, usize>>,
    tokens: Vec<Vec<u16>>,
    splits: Vec<Vec<bool>>,
}

impl Trie {
    fn new(contexts: usize) -> Self {
        // State 0 is the invalid state, state 1 the root.
        Self {
            children: vec![BTreeMap::new(), BTreeMap::new()],
            tokens: vec![Vec::new(), Vec::new()],
            splits: vec![vec![false; contexts]; 2],
        }
    }

    fn walk(&mut self, path: impl IntoIterator<Item = usize>) -> usize {
        let contexts = self.splits[0].len();
        let mut s = ROOT;
        for c in path {
            s = match self.children[s].get(&c) {
                Some(&next) => next,
                None => {
                    let next = self.children.len();
                    self.children.push(BTreeMap::new());
                    self.tokens.push(Vec::new());
                    self.splits.push(vec![false; contexts]);
                    self.children[s].insert(c, next);
                    next
                }
            };
        }
        s
    }

    fn into_dfa(mut self, categories: usize) -> Dfa {
        let states = self.children.len();
        let transition = self
            .children
            .iter()
            .map(|kids| {
                let mut row = vec![INVALID_STATE as u16; categories];
                for (&c, &next) in kids {
                    row[c] = next as u16;
                }
                row
            })
            .collect();
        for list in &mut self.tokens {
            list.sort_unstable();
            list.dedup();
        }
        Dfa {
            initial_state: vec![ROOT as u16],
            transition,
            recognition: (0..states as u16).collect(),
            token_list: self.tokens,
            context_split: self.splits,
        }
    }
}

/// Builds byte scanner tables for `literals`; token `i` is `literals[i]`. Bytes that
/// appear in no literal share category 0, which leads nowhere.
pub fn literal_scanner(literals: &[Literal<'_>]) -> ScannerTable {
    let mut category_table = vec![0u16; 256];
    let mut category_count = 1;
    for lit in literals {
        for &b in lit.text.as_bytes().iter().chain(lit.context.unwrap_or("").as_bytes()) {
            if category_table[b as usize] == 0 {
                category_table[b as usize] = category_count as u16;
                category_count += 1;
            }
        }
    }
    let cat = |b: &u8| category_table[*b as usize] as usize;

    let mut token_context = Vec::with_capacity(literals.len());
    let mut context_count = 0;
    for lit in literals {
        if lit.context.is_some() {
            token_context.push(context_count as i32);
            context_count += 1;
        } else {
            token_context.push(NO_CONTEXT);
        }
    }

    let mut forward = Trie::new(context_count);
    let mut reverse = Trie::new(context_count);
    for (t, lit) in literals.iter().enumerate() {
        let text = lit.text.as_bytes();
        let context = lit.context.unwrap_or("").as_bytes();
        let end = forward.walk(text.iter().chain(context).map(cat));
        forward.tokens[end].push(t as u16);
        if let Ok(ctx) = usize::try_from(token_context[t]) {
            let split = forward.walk(text.iter().map(cat));
            forward.splits[split][ctx] = true;
            let back = reverse.walk(context.iter().rev().map(cat));
            reverse.splits[back][ctx] = true;
        }
    }

    ScannerTable {
        category_count,
        category_table,
        token_param: literals.iter().map(|l| l.param).collect(),
        token_context,
        token_names: literals
            .iter()
            .map(|l| match l.context {
                Some(c) => format!("{}/{c}", l.text),
                None => l.text.to_string(),
            })
            .collect(),
        condition_count: 1,
        context_count,
        forward: forward.into_dfa(category_count),
        reverse: reverse.into_dfa(category_count),
    }
}
