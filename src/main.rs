// src/main.rs
//
// Calculator demo: scan and parse a `int (+ int)*` expression with the bundled tables.
// Usage:
//   cargo run                      # generated input (CALC_DEMO_LEN, CALC_DEMO_SEED)
//   cargo run -- path/to/input.txt
use std::{env, fs, path::PathBuf, sync::Arc, time::Instant};

use anyhow::{Context, Result};
use lrkit::{
    dev::calc,
    parser::{LogClient, Parser, tables::load_parser_bin_bytes},
    preprocess::Preprocessor,
    scanner::{ByteSource, tables::load_scanner_bin_bytes},
};

const SCANNER_BIN: &str = "tables/calc_scanner.bin";
const PARSER_BIN: &str = "tables/calc_parser.bin";

fn load_or_generate() -> Result<(Vec<u8>, Option<i64>)> {
    if let Some(path) = env::args().nth(1) {
        let p = PathBuf::from(&path);
        let t0 = Instant::now();
        let src = fs::read(&p).with_context(|| format!("read {}", p.display()))?;
        let ms = t0.elapsed().as_secs_f64() * 1e3;
        println!("Input: {} ({} bytes) | load {:.3} ms", p.display(), src.len(), ms);
        return Ok((src, None));
    }

    use rand::{SeedableRng, rngs::StdRng};
    let target_len = env::var("CALC_DEMO_LEN")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5000usize);
    let seed = env::var("CALC_DEMO_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(42u64);
    let mut rng = StdRng::seed_from_u64(seed);
    let t0 = Instant::now();
    let (s, expected) = lrkit::dev::generator::gen_valid_source(&mut rng, target_len);
    let ms = t0.elapsed().as_secs_f64() * 1e3;
    println!(
        "Input: generated (len={} bytes) | gen {:.3} ms [seed={}]",
        s.len(),
        ms,
        seed
    );
    Ok((s.into_bytes(), Some(expected)))
}

fn main() -> Result<()> {
    env_logger::init();

    // Prefer tables written by `gen_calc_tables`; fall back to the built-in ones.
    let t0 = Instant::now();
    let stable = match fs::read(SCANNER_BIN) {
        Ok(bytes) => load_scanner_bin_bytes(&bytes).with_context(|| format!("load {SCANNER_BIN}"))?,
        Err(_) => calc::scanner_table(),
    };
    let ptable = match fs::read(PARSER_BIN) {
        Ok(bytes) => load_parser_bin_bytes(&bytes).with_context(|| format!("load {PARSER_BIN}"))?,
        Err(_) => calc::parser_table(),
    };
    println!("Tables: {:.3} ms", t0.elapsed().as_secs_f64() * 1e3);

    let (text, expected) = load_or_generate()?;
    let len = text.len();

    let ptable = Arc::new(ptable);
    let mut scanner = calc::scanner(Arc::new(stable));
    scanner.open(ByteSource::new(std::io::Cursor::new(text)), None);
    let mut pp = Preprocessor::new(scanner, calc::EOF);
    let mut parser = Parser::new(Arc::clone(&ptable), calc::bindings(&ptable));

    let t1 = Instant::now();
    let value = parser.parse(&mut pp, &mut LogClient).context("parse failed")?;
    let ms = t1.elapsed().as_secs_f64() * 1e3;
    let mib_s = (len as f64) / (1024.0 * 1024.0) / (ms.max(1e-6) / 1_000.0);
    println!("Parsed {len} bytes in {ms:.3} ms ({mib_s:.1} MiB/s)");

    match (value, expected) {
        (Some(v), Some(e)) if v == e => println!("Result: {v} (matches generator)"),
        (Some(v), Some(e)) => anyhow::bail!("result {v} differs from generator value {e}"),
        (Some(v), None) => println!("Result: {v}"),
        (None, _) => println!("Result: <none> (input was repaired)"),
    }
    Ok(())
}
