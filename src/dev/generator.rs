// src/dev/generator.rs
//
// Random calculator input with a known value, for fuzzing the scanner + parser.
use rand::Rng;

/// Produces at least `target_len` bytes of valid calculator input (`int (+ int)*`
/// with random whitespace) and the sum it evaluates to.
pub fn gen_valid_source<R: Rng>(rng: &mut R, target_len: usize) -> (String, i64) {
    let mut out = String::with_capacity(target_len + target_len / 8 + 16);
    let mut total = push_int(rng, &mut out);

    while out.len() < target_len {
        if rng.random_bool(0.3) {
            push_ws(rng, &mut out);
        }
        out.push('+');
        if rng.random_bool(0.3) {
            push_ws(rng, &mut out);
        }
        total = total.wrapping_add(push_int(rng, &mut out));
    }

    if rng.random_bool(0.5) {
        out.push('\n');
    }
    (out, total)
}

fn push_int<R: Rng>(rng: &mut R, out: &mut String) -> i64 {
    let len = rng.random_range(1..=6);
    let mut v = 0i64;
    for _ in 0..len {
        let d = rng.random_range(0..10u8);
        out.push(char::from(b'0' + d));
        v = v * 10 + i64::from(d);
    }
    v
}

fn push_ws<R: Rng>(rng: &mut R, out: &mut String) {
    let opts: [char; 4] = [' ', '\t', '\r', '\n'];
    let len = rng.random_range(1..=4);
    for _ in 0..len {
        let i = rng.random_range(0..opts.len());
        out.push(opts[i]);
    }
}
