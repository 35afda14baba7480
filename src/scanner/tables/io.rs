// src/scanner/tables/io.rs
use std::{
    io::{BufWriter, Read, Write},
    path::Path,
    time::Instant,
};

use super::{Dfa, ScannerTable};
use crate::{
    codec::{TableReader, TableWriter, required},
    error::{CodecError, TableError},
};

pub const SCANNER_MAGIC: &[u8; 8] = b"LRSTBL01";

// -------------------- compact binary --------------------

fn write_dfa<W: Write>(w: &mut TableWriter<W>, dfa: &Dfa) -> Result<(), CodecError> {
    w.write_count(dfa.state_count())?;
    w.write_array(Some(&dfa.initial_state[..]))?;
    w.write_short_rle_2d(Some(&dfa.transition[..]))?;
    w.write_short_rle(Some(&dfa.recognition[..]))?;
    w.write_array_2d::<u16, _>(Some(&dfa.token_list[..]))?;
    w.write_bool_rle_2d(Some(&dfa.context_split[..]))
}

fn read_dfa<R: Read>(r: &mut TableReader<R>, name: &str) -> Result<Dfa, TableError> {
    let states = r.read_count("state count")?;
    let dfa = Dfa {
        initial_state: required(r.read_array()?, "initial states")?,
        transition: required(r.read_short_rle_2d()?, "transitions")?,
        recognition: required(r.read_short_rle()?, "recognition codes")?,
        token_list: required(r.read_array_2d()?, "token lists")?,
        context_split: required(r.read_bool_rle_2d()?, "context split table")?,
    };
    if dfa.state_count() != states {
        return Err(TableError::Inconsistent(format!(
            "{name} DFA header says {states} states, transition table has {}",
            dfa.state_count()
        )));
    }
    Ok(dfa)
}

pub fn write_scanner_table<W: Write>(out: W, t: &ScannerTable) -> Result<W, TableError> {
    let mut w = TableWriter::new(out);
    w.write_bytes(SCANNER_MAGIC)?;
    w.write_count(t.category_count)?;
    w.write_count(t.token_count())?;
    w.write_count(t.condition_count)?;
    w.write_count(t.context_count)?;
    w.write_short_rle(Some(&t.category_table[..]))?;
    w.write_array(Some(&t.token_param[..]))?;
    w.write_array(Some(&t.token_context[..]))?;
    w.write_str_array(Some(&t.token_names[..]))?;
    write_dfa(&mut w, &t.forward)?;
    write_dfa(&mut w, &t.reverse)?;
    w.flush()?;
    Ok(w.into_inner())
}

/// Reads and checks a scanner table.
pub fn read_scanner_table<R: Read>(input: R) -> Result<ScannerTable, TableError> {
    let mut r = TableReader::new(input);
    let mut magic = [0u8; 8];
    r.read_bytes(&mut magic)?;
    if &magic != SCANNER_MAGIC {
        return Err(TableError::BadSignature {
            expected: *SCANNER_MAGIC,
            found: magic,
        });
    }
    let category_count = r.read_count("category count")?;
    let token_count = r.read_count("token count")?;
    let condition_count = r.read_count("condition count")?;
    let context_count = r.read_count("context count")?;
    let t = ScannerTable {
        category_count,
        category_table: required(r.read_short_rle()?, "category table")?,
        token_param: required(r.read_array()?, "token params")?,
        token_context: required(r.read_array()?, "token contexts")?,
        token_names: required(r.read_str_array()?, "token names")?,
        condition_count,
        context_count,
        forward: read_dfa(&mut r, "forward")?,
        reverse: read_dfa(&mut r, "reverse")?,
    };
    if t.token_count() != token_count {
        return Err(TableError::Inconsistent(format!(
            "header says {token_count} tokens, param array has {}",
            t.token_count()
        )));
    }
    t.check()?;
    log::debug!(
        "loaded scanner table: {} categories, {} tokens, {} forward / {} reverse states",
        t.category_count,
        t.token_count(),
        t.forward.state_count(),
        t.reverse.state_count()
    );
    Ok(t)
}

pub fn save_scanner_bin(path: &Path, t: &ScannerTable) -> Result<(), TableError> {
    let instant = Instant::now();
    let f = std::fs::File::create(path)?;
    write_scanner_table(BufWriter::new(f), t)?;
    log::debug!(
        "saved scanner table to {} in {} ms",
        path.display(),
        instant.elapsed().as_millis()
    );
    Ok(())
}

pub fn load_scanner_bin_bytes(data: &[u8]) -> Result<ScannerTable, TableError> {
    read_scanner_table(data)
}

// -------------------- JSON (de)serialization --------------------

pub fn save_scanner_json(path: &Path, t: &ScannerTable) -> Result<(), TableError> {
    // Stream to disk to avoid giant intermediate strings.
    let f = std::fs::File::create(path)?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer(&mut w, t)?;
    w.flush()?;
    Ok(())
}

pub fn load_scanner_json_bytes(data: &[u8]) -> Result<ScannerTable, TableError> {
    let t: ScannerTable = serde_json::from_slice(data)?;
    t.check()?;
    Ok(t)
}
