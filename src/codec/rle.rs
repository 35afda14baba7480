// src/codec/rle.rs
//
// Run-length encodings used for the large, repetitive table arrays.
//
//   bool  : 1 byte per run chunk   value << 7 | (count - 1)          count <= 128
//   byte  : 2 bytes per run chunk  (count - 1): u8, value: i8         count <= 256
//   short : literal value          value: u16                        (high byte != escape)
//           escaped record         escape | (count - 1): u16, value   count <= 256
//
// The short escape is a high byte. It starts at 0x81 and moves by 0x4B every time an
// escaped record carries a value whose high byte is the escape itself, so a stream of
// values that keeps colliding does not keep paying 4 bytes each. Encoder and decoder
// derive the rotation from the emitted values only, so they stay in lockstep.
use std::io::{Read, Write};

use super::{TableReader, TableWriter};
use crate::error::CodecError;

const BOOL_RUN_MAX: usize = 128;
const BYTE_RUN_MAX: usize = 256;
const SHORT_RUN_MAX: usize = 256;

pub const ESCAPE_INITIAL: u16 = 0x8100;
pub const ESCAPE_STEP: u16 = 0x4B00;
const HIGH_BYTE: u16 = 0xFF00;

/// Splits `values` into maximal runs of equal elements, each at most `max` long.
fn runs<T: PartialEq + Copy>(values: &[T], max: usize) -> impl Iterator<Item = (T, usize)> + '_ {
    let mut i = 0;
    std::iter::from_fn(move || {
        let v = *values.get(i)?;
        let n = values[i..]
            .iter()
            .take(max)
            .take_while(|&&x| x == v)
            .count();
        i += n;
        Some((v, n))
    })
}

fn overrun(filled: usize, count: usize, len: usize) -> CodecError {
    CodecError::Corrupt(format!(
        "run of {count} at index {filled} overruns array length {len}"
    ))
}

/// Escape state shared by a short-RLE encoder or decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortEscape(u16);

impl Default for ShortEscape {
    fn default() -> Self {
        ShortEscape(ESCAPE_INITIAL)
    }
}

impl ShortEscape {
    pub fn code(self) -> u16 {
        self.0
    }

    #[inline]
    fn collides(self, value: u16) -> bool {
        value & HIGH_BYTE == self.0
    }

    #[inline]
    fn rotate(&mut self) {
        self.0 = self.0.wrapping_add(ESCAPE_STEP) & HIGH_BYTE;
    }

    /// Advances the escape after an escaped record carrying `value`.
    #[inline]
    fn after_escaped(&mut self, value: u16) {
        if self.collides(value) {
            self.rotate();
        }
    }
}

impl<W: Write> TableWriter<W> {
    pub fn write_bool_rle(&mut self, values: Option<&[bool]>) -> Result<(), CodecError> {
        self.write_len(values.map(<[bool]>::len))?;
        let Some(values) = values else {
            return Ok(());
        };
        self.write_bool_runs(values)
    }

    fn write_bool_runs(&mut self, values: &[bool]) -> Result<(), CodecError> {
        for (v, n) in runs(values, BOOL_RUN_MAX) {
            self.write(((v as u8) << 7) | (n - 1) as u8)?;
        }
        Ok(())
    }

    pub fn write_byte_rle(&mut self, values: Option<&[i8]>) -> Result<(), CodecError> {
        self.write_len(values.map(<[i8]>::len))?;
        let Some(values) = values else {
            return Ok(());
        };
        self.write_byte_runs(values)
    }

    fn write_byte_runs(&mut self, values: &[i8]) -> Result<(), CodecError> {
        for (v, n) in runs(values, BYTE_RUN_MAX) {
            self.write((n - 1) as u8)?;
            self.write(v)?;
        }
        Ok(())
    }

    pub fn write_short_rle(&mut self, values: Option<&[u16]>) -> Result<(), CodecError> {
        self.write_len(values.map(<[u16]>::len))?;
        let Some(values) = values else {
            return Ok(());
        };
        let mut escape = ShortEscape::default();
        self.write_short_runs(values, &mut escape)
    }

    fn write_short_runs(&mut self, values: &[u16], escape: &mut ShortEscape) -> Result<(), CodecError> {
        for (v, n) in runs(values, SHORT_RUN_MAX) {
            // A lone value is written bare unless its high byte reads as the escape.
            if n == 1 && !escape.collides(v) {
                self.write(v)?;
                continue;
            }
            self.write(escape.code() | (n - 1) as u16)?;
            self.write(v)?;
            escape.after_escaped(v);
        }
        Ok(())
    }

    pub fn write_short_rle_signed(&mut self, values: Option<&[i16]>) -> Result<(), CodecError> {
        let bits: Option<Vec<u16>> = values.map(|v| v.iter().map(|&x| x as u16).collect());
        self.write_short_rle(bits.as_deref())
    }

    pub fn write_bool_rle_2d<R: AsRef<[bool]>>(&mut self, rows: Option<&[R]>) -> Result<(), CodecError> {
        self.write_len(rows.map(<[R]>::len))?;
        for row in rows.into_iter().flatten() {
            let row = row.as_ref();
            self.write_len(Some(row.len()))?;
            self.write_bool_runs(row)?;
        }
        Ok(())
    }

    pub fn write_byte_rle_2d<R: AsRef<[i8]>>(&mut self, rows: Option<&[R]>) -> Result<(), CodecError> {
        self.write_len(rows.map(<[R]>::len))?;
        for row in rows.into_iter().flatten() {
            let row = row.as_ref();
            self.write_len(Some(row.len()))?;
            self.write_byte_runs(row)?;
        }
        Ok(())
    }

    /// The escape carries over from one row to the next.
    pub fn write_short_rle_2d<R: AsRef<[u16]>>(&mut self, rows: Option<&[R]>) -> Result<(), CodecError> {
        self.write_len(rows.map(<[R]>::len))?;
        let mut escape = ShortEscape::default();
        for row in rows.into_iter().flatten() {
            let row = row.as_ref();
            self.write_len(Some(row.len()))?;
            self.write_short_runs(row, &mut escape)?;
        }
        Ok(())
    }
}

impl<R: Read> TableReader<R> {
    pub fn read_bool_rle(&mut self) -> Result<Option<Vec<bool>>, CodecError> {
        let Some(len) = self.read_len()? else {
            return Ok(None);
        };
        self.read_bool_runs(len).map(Some)
    }

    fn read_bool_runs(&mut self, len: usize) -> Result<Vec<bool>, CodecError> {
        let mut out = Vec::with_capacity(len.min(1 << 16));
        while out.len() < len {
            let b: u8 = self.read()?;
            let n = (b & 0x7F) as usize + 1;
            if out.len() + n > len {
                return Err(overrun(out.len(), n, len));
            }
            out.resize(out.len() + n, b & 0x80 != 0);
        }
        Ok(out)
    }

    pub fn read_byte_rle(&mut self) -> Result<Option<Vec<i8>>, CodecError> {
        let Some(len) = self.read_len()? else {
            return Ok(None);
        };
        self.read_byte_runs(len).map(Some)
    }

    fn read_byte_runs(&mut self, len: usize) -> Result<Vec<i8>, CodecError> {
        let mut out = Vec::with_capacity(len.min(1 << 16));
        while out.len() < len {
            let n = self.read::<u8>()? as usize + 1;
            let v: i8 = self.read()?;
            if out.len() + n > len {
                return Err(overrun(out.len(), n, len));
            }
            out.resize(out.len() + n, v);
        }
        Ok(out)
    }

    pub fn read_short_rle(&mut self) -> Result<Option<Vec<u16>>, CodecError> {
        let Some(len) = self.read_len()? else {
            return Ok(None);
        };
        let mut escape = ShortEscape::default();
        self.read_short_runs(len, &mut escape).map(Some)
    }

    fn read_short_runs(&mut self, len: usize, escape: &mut ShortEscape) -> Result<Vec<u16>, CodecError> {
        let mut out = Vec::with_capacity(len.min(1 << 16));
        while out.len() < len {
            let word: u16 = self.read()?;
            if !escape.collides(word) {
                out.push(word);
                continue;
            }
            let n = (word & !HIGH_BYTE) as usize + 1;
            let v: u16 = self.read()?;
            if out.len() + n > len {
                return Err(overrun(out.len(), n, len));
            }
            out.resize(out.len() + n, v);
            escape.after_escaped(v);
        }
        Ok(out)
    }

    pub fn read_short_rle_signed(&mut self) -> Result<Option<Vec<i16>>, CodecError> {
        Ok(self
            .read_short_rle()?
            .map(|v| v.into_iter().map(|x| x as i16).collect()))
    }

    pub fn read_bool_rle_2d(&mut self) -> Result<Option<Vec<Vec<bool>>>, CodecError> {
        let Some(rows) = self.read_len()? else {
            return Ok(None);
        };
        let mut out = Vec::with_capacity(rows.min(1 << 16));
        for i in 0..rows {
            let len = self.read_required_len(&format!("row {i}"))?;
            out.push(self.read_bool_runs(len)?);
        }
        Ok(Some(out))
    }

    pub fn read_byte_rle_2d(&mut self) -> Result<Option<Vec<Vec<i8>>>, CodecError> {
        let Some(rows) = self.read_len()? else {
            return Ok(None);
        };
        let mut out = Vec::with_capacity(rows.min(1 << 16));
        for i in 0..rows {
            let len = self.read_required_len(&format!("row {i}"))?;
            out.push(self.read_byte_runs(len)?);
        }
        Ok(Some(out))
    }

    pub fn read_short_rle_2d(&mut self) -> Result<Option<Vec<Vec<u16>>>, CodecError> {
        let Some(rows) = self.read_len()? else {
            return Ok(None);
        };
        let mut escape = ShortEscape::default();
        let mut out = Vec::with_capacity(rows.min(1 << 16));
        for i in 0..rows {
            let len = self.read_required_len(&format!("row {i}"))?;
            out.push(self.read_short_runs(len, &mut escape)?);
        }
        Ok(Some(out))
    }
}
