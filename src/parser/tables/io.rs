// src/parser/tables/io.rs
use std::{
    io::{BufWriter, Read, Write},
    path::Path,
    time::Instant,
};

use super::ParserTable;
use crate::{
    codec::{TableReader, TableWriter, required},
    error::TableError,
};

pub const PARSER_MAGIC: &[u8; 8] = b"LRPTBL01";

// -------------------- compact binary --------------------

pub fn write_parser_table<W: Write>(out: W, t: &ParserTable) -> Result<W, TableError> {
    let mut w = TableWriter::new(out);
    w.write_bytes(PARSER_MAGIC)?;
    w.write_count(t.symbol_count)?;
    w.write_count(t.production_count())?;
    w.write_count(t.max_insertion)?;
    w.write_count(t.max_deletion)?;
    w.write_count(t.validation_length)?;
    w.write_count(t.single_point_insertions.len())?;
    w.write_count(t.goal_production)?;
    w.write_count(t.eof_symbol as usize)?;
    w.write_count(t.state_count())?;

    w.write_array(Some(&t.production_lhs[..]))?;
    w.write_array(Some(&t.production_rhs_len[..]))?;
    w.write_array(Some(&t.production_param[..]))?;
    w.write_array(Some(&t.single_point_insertions[..]))?;
    w.write_array(Some(&t.insertion_cost[..]))?;
    w.write_array(Some(&t.deletion_cost[..]))?;
    w.write_short_rle_2d(Some(&t.action[..]))?;
    w.write_short_rle(Some(&t.unwinding[..]))?;
    w.write_str_array(Some(&t.symbol_names[..]))?;
    w.write_str_array(Some(&t.production_link_names[..]))?;
    w.flush()?;
    Ok(w.into_inner())
}

/// Reads and checks a parser table.
pub fn read_parser_table<R: Read>(input: R) -> Result<ParserTable, TableError> {
    let mut r = TableReader::new(input);
    let mut magic = [0u8; 8];
    r.read_bytes(&mut magic)?;
    if &magic != PARSER_MAGIC {
        return Err(TableError::BadSignature {
            expected: *PARSER_MAGIC,
            found: magic,
        });
    }
    let symbol_count = r.read_count("symbol count")?;
    let production_count = r.read_count("production count")?;
    let max_insertion = r.read_count("max insertion")?;
    let max_deletion = r.read_count("max deletion")?;
    let validation_length = r.read_count("validation length")?;
    let single_points = r.read_count("single-point insertion count")?;
    let goal_production = r.read_count("goal production")?;
    let eof_symbol = r.read_count("EOF symbol")?;
    let state_count = r.read_count("state count")?;

    let t = ParserTable {
        symbol_count,
        production_lhs: required(r.read_array()?, "production LHS")?,
        production_rhs_len: required(r.read_array()?, "production RHS lengths")?,
        production_param: required(r.read_array()?, "production params")?,
        max_insertion,
        max_deletion,
        validation_length,
        single_point_insertions: required(r.read_array()?, "single-point insertions")?,
        insertion_cost: required(r.read_array()?, "insertion costs")?,
        deletion_cost: required(r.read_array()?, "deletion costs")?,
        goal_production,
        eof_symbol: u32::try_from(eof_symbol)
            .map_err(|_| TableError::Inconsistent(format!("EOF symbol {eof_symbol} too large")))?,
        action: required(r.read_short_rle_2d()?, "action table")?,
        unwinding: required(r.read_short_rle()?, "unwinding table")?,
        symbol_names: required(r.read_str_array()?, "symbol names")?,
        production_link_names: required(r.read_str_array()?, "link names")?,
    };

    for (what, header, actual) in [
        ("productions", production_count, t.production_count()),
        ("single-point insertions", single_points, t.single_point_insertions.len()),
        ("states", state_count, t.state_count()),
    ] {
        if header != actual {
            return Err(TableError::Inconsistent(format!(
                "header says {header} {what}, table has {actual}"
            )));
        }
    }
    t.check()?;
    log::debug!(
        "loaded parser table: {} symbols, {} productions, {} states",
        t.symbol_count,
        t.production_count(),
        t.state_count()
    );
    Ok(t)
}

pub fn save_parser_bin(path: &Path, t: &ParserTable) -> Result<(), TableError> {
    let instant = Instant::now();
    let f = std::fs::File::create(path)?;
    write_parser_table(BufWriter::new(f), t)?;
    log::debug!(
        "saved parser table to {} in {} ms",
        path.display(),
        instant.elapsed().as_millis()
    );
    Ok(())
}

pub fn load_parser_bin_bytes(data: &[u8]) -> Result<ParserTable, TableError> {
    read_parser_table(data)
}

// -------------------- JSON (de)serialization --------------------

pub fn save_parser_json(path: &Path, t: &ParserTable) -> Result<(), TableError> {
    // Stream to disk to avoid giant intermediate strings.
    let f = std::fs::File::create(path)?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer(&mut w, t)?;
    w.flush()?;
    Ok(())
}

pub fn load_parser_json_bytes(data: &[u8]) -> Result<ParserTable, TableError> {
    let t: ParserTable = serde_json::from_slice(data)?;
    t.check()?;
    Ok(t)
}
