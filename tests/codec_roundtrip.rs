//! Table codec round-trips: every primitive, null and empty arrays, 2-D shapes,
//! strings, and the three run-length encodings over boundary and random data.

use lrkit::{
    codec::{FixedWidth, TableReader, TableWriter},
    error::CodecError,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn encode(f: impl FnOnce(&mut TableWriter<Vec<u8>>) -> Result<(), CodecError>) -> Vec<u8> {
    let mut w = TableWriter::new(Vec::new());
    f(&mut w).expect("encode");
    w.into_inner()
}

fn roundtrip_array<T: FixedWidth + PartialEq + std::fmt::Debug>(values: &[T]) {
    let bytes = encode(|w| w.write_array(Some(values)));
    let mut r = TableReader::new(&bytes[..]);
    let back: Vec<T> = r.read_array().expect("decode").expect("non-null");
    assert_eq!(back, values);
}

#[test]
fn integer_boundaries() {
    roundtrip_array(&[i8::MIN, -1, 0, 1, i8::MAX]);
    roundtrip_array(&[0u8, 1, 0x7F, 0x80, u8::MAX]);
    roundtrip_array(&[i16::MIN, -1, 0, 1, i16::MAX]);
    roundtrip_array(&[0u16, 0x7FFF, 0x8000, 0x8100, u16::MAX]);
    roundtrip_array(&[i32::MIN, -1, 0, 1, i32::MAX]);
    roundtrip_array(&[0u32, 1, u32::MAX]);
    roundtrip_array(&[i64::MIN, -1, 0, 1, i64::MAX]);
    roundtrip_array(&[0u64, 1, u64::MAX]);
    roundtrip_array(&[true, false, true]);
}

#[test]
fn floats_keep_their_bits() {
    let f32s = [0.0f32, -0.0, 1.5, f32::MIN, f32::MAX, f32::INFINITY, f32::from_bits(0x7FC0_1234)];
    let bytes = encode(|w| w.write_array(Some(&f32s[..])));
    let back: Vec<f32> = TableReader::new(&bytes[..]).read_array().unwrap().unwrap();
    let bits = |v: &[f32]| v.iter().map(|f| f.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&back), bits(&f32s));

    let f64s = [0.0f64, -0.0, f64::MIN_POSITIVE, f64::NEG_INFINITY, f64::from_bits(0x7FF8_0000_DEAD_BEEF)];
    let bytes = encode(|w| w.write_array(Some(&f64s[..])));
    let back: Vec<f64> = TableReader::new(&bytes[..]).read_array().unwrap().unwrap();
    assert!(back.iter().zip(&f64s).all(|(a, b)| a.to_bits() == b.to_bits()));
}

#[test]
fn big_endian_layout() {
    let bytes = encode(|w| w.write_array(Some(&[0x0102_0304i32][..])));
    assert_eq!(bytes, [0x00, 0x01, 0x01, 0x02, 0x03, 0x04]);
}

#[test]
fn null_and_empty_arrays_differ() {
    let bytes = encode(|w| {
        w.write_array::<i32>(None)?;
        w.write_array::<i32>(Some(&[]))?;
        w.write_array_2d::<u16, Vec<u16>>(None)?;
        w.write_array_2d::<u16, Vec<u16>>(Some(&[]))
    });
    assert_eq!(&bytes[..4], &[0xFF, 0xFF, 0x00, 0x00]);
    let mut r = TableReader::new(&bytes[..]);
    assert_eq!(r.read_array::<i32>().unwrap(), None);
    assert_eq!(r.read_array::<i32>().unwrap(), Some(vec![]));
    assert_eq!(r.read_array_2d::<u16>().unwrap(), None);
    assert_eq!(r.read_array_2d::<u16>().unwrap(), Some(vec![]));
}

#[test]
fn long_length_prefix() {
    let values: Vec<u8> = (0..0x9000u32).map(|i| (i % 251) as u8).collect();
    let bytes = encode(|w| w.write_array(Some(&values[..])));
    assert_eq!(&bytes[..4], &[0x80, 0x00, 0x90, 0x00]);
    assert_eq!(bytes.len(), 4 + values.len());
    let back: Vec<u8> = TableReader::new(&bytes[..]).read_array().unwrap().unwrap();
    assert_eq!(back, values);

    let edge: Vec<u8> = vec![7; 0x7FFF];
    let bytes = encode(|w| w.write_array(Some(&edge[..])));
    assert_eq!(&bytes[..2], &[0x7F, 0xFF]);
}

#[test]
fn ragged_2d_arrays() {
    let rows: Vec<Vec<i64>> = vec![vec![], vec![i64::MIN], vec![1, 2, 3]];
    let bytes = encode(|w| w.write_array_2d::<i64, _>(Some(&rows[..])));
    let back = TableReader::new(&bytes[..]).read_array_2d::<i64>().unwrap();
    assert_eq!(back, Some(rows));
}

#[test]
fn strings() {
    let names = vec!["".to_string(), "ident".to_string(), "π≠∞".to_string()];
    let bytes = encode(|w| {
        w.write_str_array(Some(&names[..]))?;
        w.write_str_bytes(Some("caf\u{e9}"))?;
        w.write_str_bytes(None)?;
        w.write_str_chars(Some("𝄞 clef"))?;
        w.write_str_chars(None)?;
        w.write_utf("plain")
    });
    let mut r = TableReader::new(&bytes[..]);
    assert_eq!(r.read_str_array().unwrap(), Some(names));
    assert_eq!(r.read_str_bytes().unwrap().as_deref(), Some("caf\u{e9}"));
    assert_eq!(r.read_str_bytes().unwrap(), None);
    assert_eq!(r.read_str_chars().unwrap().as_deref(), Some("𝄞 clef"));
    assert_eq!(r.read_str_chars().unwrap(), None);
    assert_eq!(r.read_utf().unwrap(), "plain");
}

#[test]
fn non_latin1_byte_string_is_unencodable() {
    let mut w = TableWriter::new(Vec::new());
    let err = w.write_str_bytes(Some("Ω")).unwrap_err();
    assert!(matches!(err, CodecError::Unencodable(_)), "{err:?}");
}

// -------------------- run-length encodings --------------------

/// Random data with long runs, so every encoder sees runs and singletons.
fn runny<T: Copy>(rng: &mut StdRng, len: usize, mut pick: impl FnMut(&mut StdRng) -> T) -> Vec<T> {
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        let v = pick(rng);
        let run = if rng.random_bool(0.3) { rng.random_range(2..600) } else { 1 };
        out.extend(std::iter::repeat_n(v, run.min(len - out.len())));
    }
    out
}

#[test]
fn rle_random_roundtrip() {
    let mut rng = StdRng::seed_from_u64(7);
    for len in [0usize, 1, 2, 127, 128, 129, 256, 257, 3000] {
        let bools = runny(&mut rng, len, |r| r.random_bool(0.5));
        let bytes = runny(&mut rng, len, |r| r.random::<i8>());
        // Bias shorts toward the escape high bytes.
        let shorts = runny(&mut rng, len, |r| {
            let hi = [0x81u16, 0xCC, 0x17, 0x62, 0x00, 0xFF][r.random_range(0..6)];
            (hi << 8) | r.random_range(0..4u16)
        });

        let enc = encode(|w| {
            w.write_bool_rle(Some(&bools[..]))?;
            w.write_byte_rle(Some(&bytes[..]))?;
            w.write_short_rle(Some(&shorts[..]))
        });
        let mut r = TableReader::new(&enc[..]);
        assert_eq!(r.read_bool_rle().unwrap().unwrap(), bools, "bools len {len}");
        assert_eq!(r.read_byte_rle().unwrap().unwrap(), bytes, "bytes len {len}");
        assert_eq!(r.read_short_rle().unwrap().unwrap(), shorts, "shorts len {len}");
    }
}

#[test]
fn short_rle_singletons_chase_the_escape() {
    // Each singleton collides with the escape in force when it is written.
    let values = [0x8100u16, 0xCC01, 0x1702, 0x6203, 0xAD04, 0xAD04, 0x8100, 0x0000];
    let enc = encode(|w| w.write_short_rle(Some(&values[..])));
    let back = TableReader::new(&enc[..]).read_short_rle().unwrap().unwrap();
    assert_eq!(back, values);
}

#[test]
fn short_rle_signed_and_2d() {
    let signed = [i16::MIN, -1, -1, -1, 0, i16::MAX, -0x7F00];
    let rows: Vec<Vec<u16>> = vec![vec![0x8100; 5], vec![], vec![0x8101, 3, 3]];
    let enc = encode(|w| {
        w.write_short_rle_signed(Some(&signed[..]))?;
        w.write_short_rle_2d(Some(&rows[..]))?;
        w.write_short_rle(None)
    });
    let mut r = TableReader::new(&enc[..]);
    assert_eq!(r.read_short_rle_signed().unwrap().unwrap(), signed);
    assert_eq!(r.read_short_rle_2d().unwrap().unwrap(), rows);
    assert_eq!(r.read_short_rle().unwrap(), None);
}

#[test]
fn bool_and_byte_rle_2d() {
    let bools: Vec<Vec<bool>> = vec![vec![true; 300], vec![false], vec![]];
    let bytes: Vec<Vec<i8>> = vec![vec![-128; 513], vec![1, 2, 2, 3]];
    let enc = encode(|w| {
        w.write_bool_rle_2d(Some(&bools[..]))?;
        w.write_byte_rle_2d(Some(&bytes[..]))
    });
    let mut r = TableReader::new(&enc[..]);
    assert_eq!(r.read_bool_rle_2d().unwrap().unwrap(), bools);
    assert_eq!(r.read_byte_rle_2d().unwrap().unwrap(), bytes);
}
