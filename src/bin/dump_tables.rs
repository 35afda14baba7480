// src/bin/dump_tables.rs
// Load a binary table (scanner or parser, told apart by its magic), check it, and
// print a summary. With DUMP_JSON=path the table is also written as JSON.
// Usage:
//   cargo run --bin dump_tables -- tables/calc_parser.bin
use std::{env, fs, path::Path};

use anyhow::{Context, Result, bail};
use lrkit::{
    parser::tables::{ParserTable, io::PARSER_MAGIC, load_parser_bin_bytes, save_parser_json},
    scanner::tables::{ScannerTable, io::SCANNER_MAGIC, load_scanner_bin_bytes, save_scanner_json},
};

fn summarize_parser(t: &ParserTable) {
    println!(
        "parser table: {} symbols, {} productions, {} states, goal {}, eof {}",
        t.symbol_count,
        t.production_count(),
        t.state_count(),
        t.goal_production,
        t.symbol_label(t.eof_symbol)
    );
    println!(
        "repair: max insertion {}, max deletion {}, validation {}, single-point {:?}",
        t.max_insertion,
        t.max_deletion,
        t.validation_length,
        t.single_point_insertions
            .iter()
            .map(|&s| t.symbol_label(s))
            .collect::<Vec<_>>()
    );
    for p in 0..t.production_count() {
        println!(
            "  [{p}] {} ({} symbols) param {} link {:?}",
            t.symbol_label(t.lhs(p)),
            t.rhs_len(p),
            t.param(p),
            t.production_link_names.get(p).map(String::as_str).unwrap_or("")
        );
    }
}

fn summarize_scanner(t: &ScannerTable) {
    println!(
        "scanner table: {} categories, {} tokens, {} conditions, {} contexts",
        t.category_count,
        t.token_count(),
        t.condition_count,
        t.context_count
    );
    println!(
        "forward DFA: {} states, {} codes | reverse DFA: {} states, {} codes",
        t.forward.state_count(),
        t.forward.recognition_count(),
        t.reverse.state_count(),
        t.reverse.recognition_count()
    );
    for tok in 0..t.token_count() {
        println!(
            "  [{tok}] {} param {} context {:?}",
            t.token_name(tok).unwrap_or("?"),
            t.param(tok),
            t.context(tok)
        );
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let Some(path) = env::args().nth(1) else {
        bail!("usage: dump_tables <table.bin>");
    };
    let bytes = fs::read(&path).with_context(|| format!("read {path}"))?;
    let json = env::var("DUMP_JSON").ok();

    if bytes.starts_with(PARSER_MAGIC) {
        let t = load_parser_bin_bytes(&bytes).with_context(|| format!("load {path}"))?;
        summarize_parser(&t);
        if let Some(out) = json {
            save_parser_json(Path::new(&out), &t).with_context(|| format!("write {out}"))?;
            println!("wrote {out}");
        }
    } else if bytes.starts_with(SCANNER_MAGIC) {
        let t = load_scanner_bin_bytes(&bytes).with_context(|| format!("load {path}"))?;
        summarize_scanner(&t);
        if let Some(out) = json {
            save_scanner_json(Path::new(&out), &t).with_context(|| format!("write {out}"))?;
            println!("wrote {out}");
        }
    } else {
        bail!("{path}: not a scanner or parser table");
    }
    Ok(())
}
