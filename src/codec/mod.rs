// src/codec/mod.rs
//
// Binary table codec. Everything is big-endian.
//
// Length prefix (arrays, strings):
//   0xFFFF                      null
//   0x0000 ..= 0x7FFF           length, 2 bytes
//   0x8000_0000 | len           length, 4 bytes (len < 0x7FFF_0000)
pub mod rle;

use std::io::{Read, Write};

use crate::error::CodecError;

const NULL_LENGTH: u16 = 0xFFFF;
const SHORT_LENGTH_MAX: usize = 0x7FFF;
const LONG_LENGTH_FLAG: u32 = 0x8000_0000;
const LONG_LENGTH_MAX: usize = 0x7FFF_0000 - 1;

/// A primitive with a fixed big-endian encoding.
pub trait FixedWidth: Copy {
    const WIDTH: usize;
    fn put(self, out: &mut [u8]);
    fn get(bytes: &[u8]) -> Self;
}

macro_rules! fixed_width {
    ($($t:ty),* $(,)?) => {$(
        impl FixedWidth for $t {
            const WIDTH: usize = std::mem::size_of::<$t>();

            #[inline]
            fn put(self, out: &mut [u8]) {
                out.copy_from_slice(&self.to_be_bytes());
            }

            #[inline]
            fn get(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                raw.copy_from_slice(bytes);
                <$t>::from_be_bytes(raw)
            }
        }
    )*};
}

fixed_width!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

impl FixedWidth for bool {
    const WIDTH: usize = 1;

    #[inline]
    fn put(self, out: &mut [u8]) {
        out[0] = self as u8;
    }

    #[inline]
    fn get(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

// -------------------- writer --------------------

pub struct TableWriter<W> {
    out: W,
}

impl<W: Write> TableWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn flush(&mut self) -> Result<(), CodecError> {
        Ok(self.out.flush()?)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        Ok(self.out.write_all(bytes)?)
    }

    pub fn write<T: FixedWidth>(&mut self, v: T) -> Result<(), CodecError> {
        let mut buf = [0u8; 8];
        v.put(&mut buf[..T::WIDTH]);
        self.write_bytes(&buf[..T::WIDTH])
    }

    /// Header integers are plain i32 values; counts above `i32::MAX` are refused.
    pub fn write_count(&mut self, n: usize) -> Result<(), CodecError> {
        let v = i32::try_from(n).map_err(|_| CodecError::TooLong(n))?;
        self.write(v)
    }

    pub fn write_len(&mut self, len: Option<usize>) -> Result<(), CodecError> {
        match len {
            None => self.write(NULL_LENGTH),
            Some(n) if n <= SHORT_LENGTH_MAX => self.write(n as u16),
            Some(n) if n <= LONG_LENGTH_MAX => self.write(LONG_LENGTH_FLAG | n as u32),
            Some(n) => Err(CodecError::TooLong(n)),
        }
    }

    pub fn write_array<T: FixedWidth>(&mut self, values: Option<&[T]>) -> Result<(), CodecError> {
        self.write_len(values.map(<[T]>::len))?;
        let Some(values) = values else {
            return Ok(());
        };
        // Encode in one go; the slices are table-sized, not stream-sized.
        let mut bytes = vec![0u8; values.len() * T::WIDTH];
        for (v, chunk) in values.iter().zip(bytes.chunks_exact_mut(T::WIDTH)) {
            v.put(chunk);
        }
        self.write_bytes(&bytes)
    }

    pub fn write_array_2d<T: FixedWidth, R: AsRef<[T]>>(
        &mut self,
        rows: Option<&[R]>,
    ) -> Result<(), CodecError> {
        self.write_len(rows.map(<[R]>::len))?;
        for row in rows.into_iter().flatten() {
            self.write_array(Some(row.as_ref()))?;
        }
        Ok(())
    }

    /// UTF-8 string with a 16-bit byte length.
    pub fn write_utf(&mut self, s: &str) -> Result<(), CodecError> {
        let len = u16::try_from(s.len()).map_err(|_| CodecError::TooLong(s.len()))?;
        self.write(len)?;
        self.write_bytes(s.as_bytes())
    }

    /// One byte per char; only Latin-1 text can be written this way.
    pub fn write_str_bytes(&mut self, s: Option<&str>) -> Result<(), CodecError> {
        let Some(s) = s else {
            return self.write_len(None);
        };
        let bytes = s
            .chars()
            .map(|c| u8::try_from(u32::from(c)).map_err(|_| CodecError::Unencodable(format!("{c:?} as a byte"))))
            .collect::<Result<Vec<u8>, _>>()?;
        self.write_len(Some(bytes.len()))?;
        self.write_bytes(&bytes)
    }

    /// UTF-16 code units, length counted in units.
    pub fn write_str_chars(&mut self, s: Option<&str>) -> Result<(), CodecError> {
        let units: Option<Vec<u16>> = s.map(|s| s.encode_utf16().collect());
        self.write_array(units.as_deref())
    }

    pub fn write_str_array<S: AsRef<str>>(&mut self, strings: Option<&[S]>) -> Result<(), CodecError> {
        self.write_len(strings.map(<[S]>::len))?;
        for s in strings.into_iter().flatten() {
            self.write_utf(s.as_ref())?;
        }
        Ok(())
    }
}

// -------------------- reader --------------------

pub struct TableReader<R> {
    input: R,
}

impl<R: Read> TableReader<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    pub fn into_inner(self) -> R {
        self.input
    }

    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), CodecError> {
        Ok(self.input.read_exact(buf)?)
    }

    pub fn read<T: FixedWidth>(&mut self) -> Result<T, CodecError> {
        let mut buf = [0u8; 8];
        self.read_bytes(&mut buf[..T::WIDTH])?;
        Ok(T::get(&buf[..T::WIDTH]))
    }

    pub fn read_count(&mut self, what: &str) -> Result<usize, CodecError> {
        let v: i32 = self.read()?;
        usize::try_from(v).map_err(|_| CodecError::Corrupt(format!("negative {what}: {v}")))
    }

    pub fn read_len(&mut self) -> Result<Option<usize>, CodecError> {
        let head: u16 = self.read()?;
        if head == NULL_LENGTH {
            return Ok(None);
        }
        if u32::from(head) & (LONG_LENGTH_FLAG >> 16) == 0 {
            return Ok(Some(head as usize));
        }
        let low: u16 = self.read()?;
        let len = (((head & 0x7FFF) as usize) << 16) | low as usize;
        if len <= SHORT_LENGTH_MAX {
            return Err(CodecError::Corrupt(format!("length {len} stored in long form")));
        }
        Ok(Some(len))
    }

    /// Reads a length prefix and refuses null.
    pub fn read_required_len(&mut self, what: &str) -> Result<usize, CodecError> {
        self.read_len()?
            .ok_or_else(|| CodecError::Corrupt(format!("{what} is null")))
    }

    pub fn read_array<T: FixedWidth>(&mut self) -> Result<Option<Vec<T>>, CodecError> {
        let Some(len) = self.read_len()? else {
            return Ok(None);
        };
        self.read_values(len).map(Some)
    }

    fn read_values<T: FixedWidth>(&mut self, len: usize) -> Result<Vec<T>, CodecError> {
        // Read through a bounded chunk so a corrupt length can't force a huge allocation
        // before the stream runs dry.
        const CHUNK: usize = 1 << 16;
        let mut out = Vec::with_capacity(len.min(CHUNK));
        let mut bytes = vec![0u8; CHUNK.min(len.max(1)) * T::WIDTH];
        let mut left = len;
        while left > 0 {
            let n = left.min(CHUNK);
            let slice = &mut bytes[..n * T::WIDTH];
            self.read_bytes(slice)?;
            out.extend(slice.chunks_exact(T::WIDTH).map(T::get));
            left -= n;
        }
        Ok(out)
    }

    pub fn read_array_2d<T: FixedWidth>(&mut self) -> Result<Option<Vec<Vec<T>>>, CodecError> {
        let Some(rows) = self.read_len()? else {
            return Ok(None);
        };
        let mut out = Vec::with_capacity(rows.min(1 << 16));
        for i in 0..rows {
            let row = self
                .read_array()?
                .ok_or_else(|| CodecError::Corrupt(format!("row {i} of 2-D array is null")))?;
            out.push(row);
        }
        Ok(Some(out))
    }

    pub fn read_utf(&mut self) -> Result<String, CodecError> {
        let len: u16 = self.read()?;
        let mut bytes = vec![0u8; len as usize];
        self.read_bytes(&mut bytes)?;
        String::from_utf8(bytes).map_err(|e| CodecError::Corrupt(format!("bad UTF-8 string: {e}")))
    }

    pub fn read_str_bytes(&mut self) -> Result<Option<String>, CodecError> {
        let Some(len) = self.read_len()? else {
            return Ok(None);
        };
        let bytes: Vec<u8> = self.read_values(len)?;
        Ok(Some(bytes.into_iter().map(char::from).collect()))
    }

    pub fn read_str_chars(&mut self) -> Result<Option<String>, CodecError> {
        let Some(units) = self.read_array::<u16>()? else {
            return Ok(None);
        };
        String::from_utf16(&units)
            .map(Some)
            .map_err(|e| CodecError::Corrupt(format!("bad UTF-16 string: {e}")))
    }

    pub fn read_str_array(&mut self) -> Result<Option<Vec<String>>, CodecError> {
        let Some(len) = self.read_len()? else {
            return Ok(None);
        };
        let mut out = Vec::with_capacity(len.min(1 << 16));
        for _ in 0..len {
            out.push(self.read_utf()?);
        }
        Ok(Some(out))
    }
}

/// Unwraps a decoded array that tables never store as null.
pub fn required<T>(value: Option<T>, what: &str) -> Result<T, CodecError> {
    value.ok_or_else(|| CodecError::Corrupt(format!("{what} is null")))
}
