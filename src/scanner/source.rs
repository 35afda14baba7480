// src/scanner/source.rs
//
// Raw input for the scanner. A prescanner fills the tail of the scanner's buffer and
// says how much it wrote; it may refuse a buffer that is too small for its next
// indivisible chunk, in which case the scanner grows the buffer and asks again.
use std::io::{self, BufRead, Read};

/// Unit the scanner works on: bytes or chars.
pub trait ScanUnit: Copy + Default + Eq + std::fmt::Debug + 'static {
    /// Index into the category table.
    fn ordinal(self) -> usize;
    fn is_line_break(self) -> bool;
    fn is_tab(self) -> bool;
}

impl ScanUnit for u8 {
    #[inline]
    fn ordinal(self) -> usize {
        self as usize
    }

    #[inline]
    fn is_line_break(self) -> bool {
        self == b'\n'
    }

    #[inline]
    fn is_tab(self) -> bool {
        self == b'\t'
    }
}

impl ScanUnit for char {
    #[inline]
    fn ordinal(self) -> usize {
        self as usize
    }

    #[inline]
    fn is_line_break(self) -> bool {
        self == '\n'
    }

    #[inline]
    fn is_tab(self) -> bool {
        self == '\t'
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// `n > 0` units were written at the start of the buffer.
    Read(usize),
    /// No more input, ever.
    Eof,
    /// The buffer must offer at least this many units.
    TooSmall(usize),
}

pub trait Prescanner<U> {
    fn fill(&mut self, buf: &mut [U]) -> io::Result<Fill>;

    fn close(&mut self) {}
}

impl<U, P: Prescanner<U> + ?Sized> Prescanner<U> for Box<P> {
    fn fill(&mut self, buf: &mut [U]) -> io::Result<Fill> {
        (**self).fill(buf)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

// -------------------- bytes --------------------

/// Bytes straight from any reader.
pub struct ByteSource<R> {
    reader: Option<R>,
}

impl<R: Read> ByteSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
        }
    }
}

impl<R: Read> Prescanner<u8> for ByteSource<R> {
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<Fill> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(Fill::Eof);
        };
        if buf.is_empty() {
            return Ok(Fill::TooSmall(1));
        }
        loop {
            match reader.read(buf) {
                Ok(0) => return Ok(Fill::Eof),
                Ok(n) => return Ok(Fill::Read(n)),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn close(&mut self) {
        self.reader = None;
    }
}

// -------------------- chars --------------------

/// Chars of an in-memory string.
pub struct StrSource {
    chars: Vec<char>,
    pos: usize,
}

impl StrSource {
    pub fn new(text: impl AsRef<str>) -> Self {
        Self {
            chars: text.as_ref().chars().collect(),
            pos: 0,
        }
    }
}

impl Prescanner<char> for StrSource {
    fn fill(&mut self, buf: &mut [char]) -> io::Result<Fill> {
        if self.pos == self.chars.len() {
            return Ok(Fill::Eof);
        }
        if buf.is_empty() {
            return Ok(Fill::TooSmall(1));
        }
        let n = buf.len().min(self.chars.len() - self.pos);
        buf[..n].copy_from_slice(&self.chars[self.pos..self.pos + n]);
        self.pos += n;
        Ok(Fill::Read(n))
    }

    fn close(&mut self) {
        self.chars = Vec::new();
        self.pos = 0;
    }
}

/// Whole lines of chars from a UTF-8 reader. A line is never split across fills.
pub struct LineSource<R> {
    reader: Option<R>,
    line: Vec<char>,
    text: String,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            line: Vec::new(),
            text: String::new(),
        }
    }
}

impl<R: BufRead> Prescanner<char> for LineSource<R> {
    fn fill(&mut self, buf: &mut [char]) -> io::Result<Fill> {
        if self.line.is_empty() {
            let Some(reader) = self.reader.as_mut() else {
                return Ok(Fill::Eof);
            };
            self.text.clear();
            if reader.read_line(&mut self.text)? == 0 {
                return Ok(Fill::Eof);
            }
            self.line.extend(self.text.chars());
        }
        let n = self.line.len();
        if buf.len() < n {
            return Ok(Fill::TooSmall(n));
        }
        buf[..n].copy_from_slice(&self.line);
        self.line.clear();
        Ok(Fill::Read(n))
    }

    fn close(&mut self) {
        self.reader = None;
        self.line.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_source_refuses_small_buffer() {
        let mut src = LineSource::new("hello\nx\n".as_bytes());
        let mut small = ['\0'; 3];
        assert_eq!(src.fill(&mut small).unwrap(), Fill::TooSmall(6));
        let mut big = ['\0'; 8];
        assert_eq!(src.fill(&mut big).unwrap(), Fill::Read(6));
        assert_eq!(big[..6].iter().collect::<String>(), "hello\n");
        assert_eq!(src.fill(&mut big).unwrap(), Fill::Read(2));
        assert_eq!(src.fill(&mut big).unwrap(), Fill::Eof);
    }

    #[test]
    fn str_source_fills_partially() {
        let mut src = StrSource::new("abcde");
        let mut buf = ['\0'; 2];
        assert_eq!(src.fill(&mut buf).unwrap(), Fill::Read(2));
        assert_eq!(src.fill(&mut buf).unwrap(), Fill::Read(2));
        assert_eq!(src.fill(&mut buf).unwrap(), Fill::Read(1));
        assert_eq!(buf[0], 'e');
        assert_eq!(src.fill(&mut buf).unwrap(), Fill::Eof);
    }
}
