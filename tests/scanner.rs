//! Scanner behavior over small literal tables: longest match, right context, the
//! assemble/discard/reject protocol, unmatched input, positions, and buffer growth.

use std::{cell::RefCell, io, rc::Rc, sync::Arc};

use lrkit::{
    dev::literal::{Literal, literal_scanner},
    error::StreamError,
    scanner::{
        ByteSource, Fill, LineSource, Prescanner, Scanner, ScannerClient, ScannerOptions,
        StrSource, TokenAction,
    },
    token::Token,
};

const EOF: u32 = 99;

/// Collects every token up to (not including) EOF as `(number, text)` pairs.
fn scan_all(scanner: &mut Scanner<u8, String>) -> Vec<(u32, String)> {
    let mut out = Vec::new();
    loop {
        let t = scanner.next_token().expect("scan");
        if t.number == EOF {
            return out;
        }
        out.push((t.number, t.value.unwrap_or_default()));
    }
}

/// Scanner whose tokens carry their text as value.
fn text_scanner(literals: &[Literal<'_>], input: &'static str) -> Scanner<u8, String> {
    let table = Arc::new(literal_scanner(literals));
    let mut scanner = Scanner::new(Arc::clone(&table), EOF);
    for t in 0..table.token_count() {
        scanner.set_factory(t, |m, draft| {
            draft.value = Some(String::from_utf8_lossy(m.text()).into_owned());
            TokenAction::Assemble
        });
    }
    scanner.open(ByteSource::new(input.as_bytes()), Some("test.txt"));
    scanner
}

#[test]
fn longest_match_wins() {
    let lits = [Literal::new("a"), Literal::new("ab"), Literal::new("abc"), Literal::new("x")];
    let mut s = text_scanner(&lits, "abcx");
    assert_eq!(scan_all(&mut s), vec![(2, "abc".into()), (3, "x".into())]);
}

#[test]
fn falls_back_to_shorter_match() {
    let lits = [Literal::new("a"), Literal::new("abc")];
    let mut s = text_scanner(&lits, "aba");
    // "ab" is a prefix of "abc" but no token; "a", then "b" is unmatched, then "a".
    assert_eq!(scan_all(&mut s), vec![(0, "a".into()), (0, "a".into())]);
}

#[test]
fn right_context_is_not_consumed() {
    let lits = [Literal::with_context("foo", "bar"), Literal::new("bar")];
    let mut s = text_scanner(&lits, "foobarbar");
    let first = s.next_token().unwrap();
    assert_eq!(first.number, 0);
    assert_eq!(first.value.as_deref(), Some("foo"));
    assert_eq!((first.line, first.column), (1, 1));
    assert_eq!(s.position(), (1, 4));

    let second = s.next_token().unwrap();
    assert_eq!((second.number, second.value.as_deref()), (1, Some("bar")));
    assert_eq!(second.column, 4);
    let third = s.next_token().unwrap();
    assert_eq!((third.number, third.column), (1, 7));
    assert_eq!(s.next_token().unwrap().number, EOF);
}

#[test]
fn right_context_required() {
    let lits = [Literal::with_context("foo", "bar"), Literal::new("fo"), Literal::new("o")];
    let mut s = text_scanner(&lits, "foo");
    // Without its context "foo" is not a token.
    assert_eq!(scan_all(&mut s), vec![(1, "fo".into()), (2, "o".into())]);
}

#[test]
fn reject_tries_next_candidate() {
    // Two tokens with the same pattern: the factory of the first refuses.
    let table = Arc::new(literal_scanner(&[Literal::new("if"), Literal::new("if"), Literal::new("i")]));
    let mut s: Scanner<u8, String> = Scanner::new(table, EOF);
    s.set_factory(0, |_, _| TokenAction::Reject);
    s.open(ByteSource::new(&b"ifif"[..]), None);
    assert_eq!(s.next_token().unwrap().number, 1);
    assert_eq!(s.next_token().unwrap().number, 1);
    assert_eq!(s.next_token().unwrap().number, EOF);
}

#[test]
fn reject_falls_back_to_shorter_length() {
    let table = Arc::new(literal_scanner(&[Literal::new("i"), Literal::new("if"), Literal::new("f")]));
    let mut s: Scanner<u8, String> = Scanner::new(table, EOF);
    s.set_factory(1, |_, _| TokenAction::Reject);
    s.open(ByteSource::new(&b"if"[..]), None);
    assert_eq!(s.next_token().unwrap().number, 0);
    assert_eq!(s.next_token().unwrap().number, 2);
    assert_eq!(s.next_token().unwrap().number, EOF);
}

#[test]
fn discard_vanishes_but_advances() {
    let table = Arc::new(literal_scanner(&[Literal::new(" "), Literal::new("x")]));
    let mut s: Scanner<u8, String> = Scanner::new(table, EOF);
    s.set_factory(0, |_, _| TokenAction::Discard);
    s.open(ByteSource::new(&b"  x x"[..]), None);
    let a = s.next_token().unwrap();
    let b = s.next_token().unwrap();
    assert_eq!((a.number, a.column), (1, 3));
    assert_eq!((b.number, b.column), (1, 5));
    assert_eq!(s.next_token().unwrap().number, EOF);
}

#[test]
fn params_number_tokens() {
    let table = Arc::new(literal_scanner(&[Literal::new("+").param(7), Literal::new("-")]));
    let mut s: Scanner<u8, ()> = Scanner::new(table, EOF);
    s.open(ByteSource::new(&b"+-"[..]), None);
    assert_eq!(s.next_token().unwrap().number, 7);
    assert_eq!(s.next_token().unwrap().number, 1);
}

#[derive(Default)]
struct Recorder {
    unmatched: Vec<(u8, u32, u32)>,
    eofs: usize,
}

struct SharedRecorder(Rc<RefCell<Recorder>>);

impl ScannerClient<u8> for SharedRecorder {
    fn scanner_eof(&mut self, _line: u32, _column: u32) {
        self.0.borrow_mut().eofs += 1;
    }

    fn scanner_unmatched(&mut self, unit: u8, line: u32, column: u32) {
        self.0.borrow_mut().unmatched.push((unit, line, column));
    }
}

#[test]
fn unmatched_units_are_reported_and_skipped() {
    let rec = Rc::new(RefCell::new(Recorder::default()));
    let table = Arc::new(literal_scanner(&[Literal::new("ab")]));
    let mut s: Scanner<u8, ()> = Scanner::new(table, EOF);
    s.set_client(SharedRecorder(Rc::clone(&rec)));
    s.open(ByteSource::new(&b"a?ab\n\xFFab"[..]), None);

    let t = s.next_token().unwrap();
    assert_eq!((t.number, t.line, t.column), (0, 1, 3));
    let t = s.next_token().unwrap();
    assert_eq!((t.number, t.line, t.column), (0, 2, 2));
    assert_eq!(s.next_token().unwrap().number, EOF);
    assert_eq!(s.next_token().unwrap().number, EOF);

    let rec = rec.borrow();
    assert_eq!(rec.unmatched, vec![(b'a', 1, 1), (b'?', 1, 2), (b'\n', 1, 5), (0xFF, 2, 1)]);
    assert_eq!(rec.eofs, 1);
}

#[test]
fn tabs_advance_to_next_stop() {
    let table = Arc::new(literal_scanner(&[Literal::new("\t"), Literal::new("x")]));
    let options = ScannerOptions {
        tab_width: 4,
        ..ScannerOptions::default()
    };
    let mut s: Scanner<u8, ()> = Scanner::with_options(table, EOF, options);
    s.set_factory(0, |_, _| TokenAction::Discard);
    s.open(ByteSource::new(&b"x\tx\t\tx"[..]), None);
    let cols: Vec<u32> = (0..3).map(|_| s.next_token().unwrap().column).collect();
    assert_eq!(cols, vec![1, 5, 13]);
}

#[test]
fn factory_switches_condition() {
    let table = Arc::new(literal_scanner(&[Literal::new("a")]));
    let mut s: Scanner<u8, ()> = Scanner::new(table, EOF);
    s.set_factory(0, |m, _| {
        // Only one condition exists.
        assert!(!m.set_condition(1));
        assert!(m.set_condition(0));
        TokenAction::Assemble
    });
    s.open(ByteSource::new(&b"a"[..]), None);
    assert_eq!(s.next_token().unwrap().number, 0);
    assert!(!s.set_condition(3));
}

#[test]
fn tiny_buffer_grows_for_long_tokens() {
    let word = "ab".repeat(200);
    let input = format!("{word} {word}").into_bytes();

    let table = Arc::new(literal_scanner(&[Literal::new(&word), Literal::new(" "), Literal::new("a")]));
    let options = ScannerOptions {
        initial_buffer: 1,
        ..ScannerOptions::default()
    };
    let mut s: Scanner<u8, usize> = Scanner::with_options(table, EOF, options);
    s.set_factory(0, |m, draft| {
        draft.value = Some(m.len());
        TokenAction::Assemble
    });
    s.set_factory(1, |_, _| TokenAction::Discard);
    s.open(ByteSource::new(io::Cursor::new(input)), None);

    let a = s.next_token().unwrap();
    let b = s.next_token().unwrap();
    assert_eq!((a.number, a.value), (0, Some(400)));
    assert_eq!((b.number, b.value, b.column), (0, Some(400), 402));
    assert_eq!(s.next_token().unwrap().number, EOF);
}

#[test]
fn char_units_and_line_source() {
    // Line source refuses buffers shorter than a line, so the scanner must grow.
    let table = Arc::new(literal_scanner(&[Literal::new("x"), Literal::new("\n")]));
    let mut s: Scanner<char, ()> = Scanner::with_options(
        Arc::clone(&table),
        EOF,
        ScannerOptions {
            initial_buffer: 2,
            ..ScannerOptions::default()
        },
    );
    // literal_scanner categorizes bytes; ASCII chars index the same table.
    s.open(LineSource::new("xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx\nx\n".as_bytes()), None);
    let mut n = 0;
    let mut last: Token<()> = Token::new(0);
    loop {
        let t = s.next_token().unwrap();
        if t.number == EOF {
            break;
        }
        n += 1;
        last = t;
    }
    assert_eq!(n, 34 + 1 + 1 + 1);
    assert_eq!((last.line, last.column), (2, 2));

    s.open(StrSource::new("x"), None);
    assert_eq!(s.next_token().unwrap().number, 0);
    assert_eq!(s.next_token().unwrap().number, EOF);
}

struct Failing;

impl Prescanner<u8> for Failing {
    fn fill(&mut self, _buf: &mut [u8]) -> io::Result<Fill> {
        Err(io::Error::other("disk on fire"))
    }
}

#[test]
fn io_errors_surface() {
    let table = Arc::new(literal_scanner(&[Literal::new("x")]));
    let mut s: Scanner<u8, ()> = Scanner::new(table, EOF);
    s.open(Failing, None);
    assert!(matches!(s.next_token(), Err(StreamError::Io(_))));
}

/// Fails its first read, then would happily deliver `x`.
struct FailsOnce {
    failed: bool,
    closes: Rc<RefCell<usize>>,
}

impl Prescanner<u8> for FailsOnce {
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<Fill> {
        if !self.failed {
            self.failed = true;
            return Err(io::Error::other("boom"));
        }
        buf[0] = b'x';
        Ok(Fill::Read(1))
    }

    fn close(&mut self) {
        *self.closes.borrow_mut() += 1;
    }
}

#[test]
fn io_error_ends_the_scan() {
    let closes = Rc::new(RefCell::new(0));
    let table = Arc::new(literal_scanner(&[Literal::new("x")]));
    let mut s: Scanner<u8, ()> = Scanner::new(table, EOF);
    s.open(
        FailsOnce {
            failed: false,
            closes: Rc::clone(&closes),
        },
        None,
    );
    assert!(matches!(s.next_token(), Err(StreamError::Io(_))));
    assert_eq!(*closes.borrow(), 1);
    // The failed source is never read again.
    assert_eq!(s.next_token().unwrap().number, EOF);
    assert_eq!(s.next_token().unwrap().number, EOF);
    s.close();
    assert_eq!(*closes.borrow(), 1);
}

struct CountingClose(Rc<RefCell<usize>>, ByteSource<&'static [u8]>);

impl Prescanner<u8> for CountingClose {
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<Fill> {
        self.1.fill(buf)
    }

    fn close(&mut self) {
        *self.0.borrow_mut() += 1;
    }
}

#[test]
fn sources_close_once() {
    let closes = Rc::new(RefCell::new(0));
    let table = Arc::new(literal_scanner(&[Literal::new("x")]));
    let mut s: Scanner<u8, ()> = Scanner::new(table, EOF);
    s.open(CountingClose(Rc::clone(&closes), ByteSource::new(&b"x"[..])), None);
    s.close();
    s.close();
    assert_eq!(*closes.borrow(), 1);

    // Opening again closes nothing that is already closed.
    s.open(CountingClose(Rc::clone(&closes), ByteSource::new(&b"x"[..])), None);
    s.open(ByteSource::new(&b"x"[..]), None);
    assert_eq!(*closes.borrow(), 2);
    assert_eq!(s.next_token().unwrap().number, 0);
}

#[test]
fn tokens_carry_file_name() {
    let lits = [Literal::new("x")];
    let mut s = text_scanner(&lits, "x");
    assert_eq!(s.next_token().unwrap().file.as_deref(), Some("test.txt"));
}
