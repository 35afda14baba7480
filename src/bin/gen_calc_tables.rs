// src/bin/gen_calc_tables.rs
// Write the calculator tables in binary form (and JSON with DUMP_JSON=1).
// Usage:
//   cargo run --bin gen_calc_tables            # writes tables/calc_{scanner,parser}.bin
//   cargo run --bin gen_calc_tables -- out_dir
use std::{env, fs, path::PathBuf};

use anyhow::{Context, Result};
use lrkit::{
    dev::calc,
    parser::tables::{save_parser_bin, save_parser_json},
    scanner::tables::{save_scanner_bin, save_scanner_json},
};

fn main() -> Result<()> {
    env_logger::init();

    let dir = PathBuf::from(env::args().nth(1).unwrap_or_else(|| "tables".to_string()));
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    let json = env::var("DUMP_JSON").is_ok_and(|v| v == "1");

    let stable = calc::scanner_table();
    stable.check().context("calculator scanner table")?;
    let ptable = calc::parser_table();
    ptable.check().context("calculator parser table")?;

    let sp = dir.join("calc_scanner.bin");
    save_scanner_bin(&sp, &stable).with_context(|| format!("write {}", sp.display()))?;
    println!("[gen_calc_tables] wrote {}", sp.display());
    let pp = dir.join("calc_parser.bin");
    save_parser_bin(&pp, &ptable).with_context(|| format!("write {}", pp.display()))?;
    println!("[gen_calc_tables] wrote {}", pp.display());

    if json {
        let sj = dir.join("calc_scanner.json");
        save_scanner_json(&sj, &stable).with_context(|| format!("write {}", sj.display()))?;
        let pj = dir.join("calc_parser.json");
        save_parser_json(&pj, &ptable).with_context(|| format!("write {}", pj.display()))?;
        println!("[gen_calc_tables] wrote {} and {}", sj.display(), pj.display());
    }
    Ok(())
}
