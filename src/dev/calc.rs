// src/dev/calc.rs
//
// Hand-built tables for a tiny calculator:
//
//   0: S' -> E $
//   1: E  -> E + E     (left-associative)
//   2: E  -> int
//
// used by the demo binary, the fuzz tests, and the repair tests.
use std::{io::Read, sync::Arc};

use crate::{
    error::ParseError,
    parser::{Bindings, LogClient, Parser, ParserClient, ParserTable},
    preprocess::Preprocessor,
    scanner::{ByteSource, Prescanner, Scanner, ScannerOptions, TokenAction, tables::{Dfa, ScannerTable}},
    token::SymbolId,
};

pub const INT: SymbolId = 0;
pub const PLUS: SymbolId = 1;
pub const EOF: SymbolId = 2;
pub const EXPR: SymbolId = 3;
pub const START: SymbolId = 4;

pub const PROD_START: usize = 0;
pub const PROD_ADD: usize = 1;
pub const PROD_INT: usize = 2;

/// Scanner tokens.
pub const TOK_INT: usize = 0;
pub const TOK_PLUS: usize = 1;
pub const TOK_SPACE: usize = 2;

pub fn scanner_table() -> ScannerTable {
    // categories: 0 other, 1 digit, 2 '+', 3 whitespace
    let mut category_table = vec![0u16; 128];
    for b in b'0'..=b'9' {
        category_table[b as usize] = 1;
    }
    category_table[b'+' as usize] = 2;
    for b in [b' ', b'\t', b'\r', b'\n'] {
        category_table[b as usize] = 3;
    }

    // states: 0 invalid, 1 start, 2 digits, 3 plus, 4 whitespace
    let forward = Dfa {
        initial_state: vec![1],
        transition: vec![
            vec![0, 0, 0, 0],
            vec![0, 2, 3, 4],
            vec![0, 2, 0, 0],
            vec![0, 0, 0, 0],
            vec![0, 0, 0, 4],
        ],
        recognition: vec![0, 0, 1, 2, 3],
        token_list: vec![vec![], vec![TOK_INT as u16], vec![TOK_PLUS as u16], vec![TOK_SPACE as u16]],
        context_split: vec![vec![]; 4],
    };
    let reverse = Dfa {
        initial_state: vec![1],
        transition: vec![vec![0; 4]; 2],
        recognition: vec![0, 0],
        token_list: vec![vec![]],
        context_split: vec![vec![]],
    };

    ScannerTable {
        category_count: 4,
        category_table,
        token_param: vec![INT as i32, PLUS as i32, -1],
        token_context: vec![-1; 3],
        token_names: vec!["int".into(), "plus".into(), "space".into()],
        condition_count: 1,
        context_count: 0,
        forward,
        reverse,
    }
}

pub fn parser_table() -> ParserTable {
    let pc = 3u16;
    let err = 2 * pc;
    let shift = |s: u16| 2 * pc + s;
    let shift_reduce = |p: u16| pc + p;
    let reduce = |p: u16| p;

    //            int                 +                  $                   E         S'   marker
    let action = vec![
        vec![shift_reduce(2), err, err, shift(1), err, err],
        vec![err, shift(2), shift_reduce(0), err, err, err],
        vec![shift_reduce(2), err, err, shift(3), err, err],
        vec![err, reduce(1), reduce(1), err, err, err],
    ];
    // state 0/2 expect an int, state 1 the end, state 3 reduces E + E.
    let unwinding = vec![pc + INT as u16, pc + EOF as u16, pc + INT as u16, reduce(1)];

    ParserTable {
        symbol_count: 5,
        production_lhs: vec![START, EXPR, EXPR],
        production_rhs_len: vec![2, 3, 1],
        production_param: vec![0, 1, 2],
        max_insertion: 3,
        max_deletion: 3,
        validation_length: 2,
        single_point_insertions: vec![INT, PLUS],
        insertion_cost: vec![1; 5],
        deletion_cost: vec![1; 5],
        goal_production: PROD_START,
        eof_symbol: EOF,
        action,
        unwinding,
        symbol_names: ["int", "+", "$", "E", "S'"].map(String::from).to_vec(),
        production_link_names: ["start", "add", "num"].map(String::from).to_vec(),
    }
}

/// Byte scanner producing `i64`-valued int tokens and dropping whitespace.
pub fn scanner(table: Arc<ScannerTable>) -> Scanner<u8, i64> {
    scanner_with_options(table, ScannerOptions::default())
}

pub fn scanner_with_options(table: Arc<ScannerTable>, options: ScannerOptions) -> Scanner<u8, i64> {
    let mut scanner = Scanner::with_options(table, EOF, options);
    scanner.set_factory(TOK_INT, |m, draft| {
        let v = m
            .text()
            .iter()
            .fold(0i64, |acc, d| acc.wrapping_mul(10).wrapping_add(i64::from(d - b'0')));
        draft.value = Some(v);
        TokenAction::Assemble
    });
    scanner.set_factory(TOK_SPACE, |_, _| TokenAction::Discard);
    scanner
}

/// Evaluating bindings: every `E` is its value.
pub fn bindings(table: &ParserTable) -> Bindings<i64> {
    let mut b: Bindings<i64> = Bindings::new(table);
    b.bind_link(table, "start", |r| r.take(0));
    b.bind_link(table, "add", |r| Some(r.get(0)?.wrapping_add(*r.get(2)?)));
    b.bind_link(table, "num", |r| r.take(0));
    b
}

/// Scans and parses one calculator input.
pub fn eval_with(
    input: impl Prescanner<u8> + 'static,
    client: &mut dyn ParserClient<i64>,
) -> Result<Option<i64>, ParseError> {
    let stable = Arc::new(scanner_table());
    let ptable = Arc::new(parser_table());
    let mut scanner = scanner(stable);
    scanner.open(input, None);
    let mut pp = Preprocessor::new(scanner, EOF);
    let mut parser = Parser::new(Arc::clone(&ptable), bindings(&ptable));
    parser.parse(&mut pp, client)
}

pub fn eval(input: impl Read + 'static) -> Result<Option<i64>, ParseError> {
    eval_with(ByteSource::new(input), &mut LogClient)
}
