//! Size sweep tests for the calculator scanner + parser:
//!  - all target lengths < 32 (0..=31), read in one go and in dribbles, runs by default
//!  - powers of two from 32 up to ~10,000,000, opt-in (ignored by default)
//!
//! Inputs come from the shared generator (same as the demo binary), which also
//! reports the value the input must evaluate to.

use std::{
    fs,
    io::{self, Read, Write},
    path::Path,
    sync::Arc,
};

use lrkit::{
    dev::{calc, generator::gen_valid_source},
    parser::{LogClient, Parser},
    preprocess::Preprocessor,
    scanner::{ByteSource, ScannerOptions},
};
use rand::{SeedableRng, rngs::StdRng};

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(default)
}

/// Reader handing out at most `chunk` bytes per call.
struct Dribble {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl Read for Dribble {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.chunk).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

fn save_case(dir: &str, tag: &str, target_len: usize, seed: u64, src: &str) -> String {
    let _ = fs::create_dir_all(dir);
    let base = format!("{tag}_len{target_len}_seed{seed}_n{}.calc", src.len());
    let path = Path::new(dir).join(base);
    let json = path.with_extension("json");
    fs::write(&path, src.as_bytes()).ok();

    // minimal meta
    let meta = serde_json::json!({
        "target_len": target_len,
        "actual_bytes": src.len(),
        "seed": seed,
        "replay": format!("cargo run -- {}", path.display()),
    });
    if let Ok(mut f) = fs::File::create(&json) {
        let _ = writeln!(f, "{}", serde_json::to_string_pretty(&meta).unwrap());
    }
    path.display().to_string()
}

fn eval(src: &str, chunk: Option<usize>) -> Option<i64> {
    let stable = Arc::new(calc::scanner_table());
    let ptable = Arc::new(calc::parser_table());
    let scanner = match chunk {
        // Tiny reads and a tiny buffer force compaction and growth mid-token.
        Some(chunk) => {
            let options = ScannerOptions {
                initial_buffer: 1,
                ..ScannerOptions::default()
            };
            let mut s = calc::scanner_with_options(stable, options);
            let reader = Dribble {
                data: src.as_bytes().to_vec(),
                pos: 0,
                chunk,
            };
            s.open(ByteSource::new(reader), None);
            s
        }
        None => {
            let mut s = calc::scanner(stable);
            s.open(ByteSource::new(io::Cursor::new(src.as_bytes().to_vec())), None);
            s
        }
    };
    let mut pp = Preprocessor::new(scanner, calc::EOF);
    let mut parser = Parser::new(Arc::clone(&ptable), calc::bindings(&ptable));
    parser.parse(&mut pp, &mut LogClient).expect("parse failed")
}

fn run_one(target_len: usize, seed: u64, chunk: Option<usize>) {
    // Derive a per-length seed for reproducibility across iterations.
    let mut rng =
        StdRng::seed_from_u64(seed ^ (target_len as u64).wrapping_mul(0x9E3779B97F4A7C15));
    let (src, expected) = gen_valid_source(&mut rng, target_len);

    let got = eval(&src, chunk);
    if got != Some(expected) {
        let case_path = save_case("fuzz-cases", "size_sweep_fail", target_len, seed, &src);
        panic!(
            "[size_sweep] target_len={} actual_len={} chunk={chunk:?}: got {got:?}, expected {expected}\n  saved: {case_path}",
            target_len,
            src.len()
        );
    }
}

/// Sweep 0..=31 target lengths. (Fast; runs by default.)
#[test]
fn size_sweep_small_targets() {
    let _ = env_logger::builder().is_test(true).try_init();
    let seed = env_u64("SIZE_SWEEP_SEED", 42);
    for len in 0..=31 {
        run_one(len, seed, None);
        run_one(len, seed, Some(1));
        run_one(len, seed, Some(3));
    }
}

#[test]
fn calc_eval_helper() {
    assert_eq!(calc::eval(&b"1 + 22\n+333"[..]).unwrap(), Some(356));
}

/// Powers of two from 32 up to ~10,000,000 (capped by SIZE_SWEEP_MAX).
/// Ignored by default; opt-in when needed.
#[test]
#[ignore]
fn size_sweep_powers_of_two() {
    let seed = env_u64("SIZE_SWEEP_SEED", 42);
    let max_len = env_usize("SIZE_SWEEP_MAX", 10_000_000);

    let mut n = 32usize;
    while n <= max_len {
        run_one(n, seed, None);
        run_one(n, seed, Some(4093));
        eprintln!(
            "[size_sweep] ok: target_len={} (actual_len will be >= target)",
            n
        );
        n = n.saturating_mul(2);
        if n == 0 {
            break;
        } // overflow guard
    }
}
