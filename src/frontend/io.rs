use crate::frontend::tib::Tib;
use crate::lang::code::Cell;
use crate::runtime::runtime_error::{ErrorKind, RuntimeError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A stream of source lines.
pub trait Source {
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Lines from any buffered reader (files, piped stdin).
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        ReaderSource { reader }
    }
}

impl<R: BufRead> Source for ReaderSource<R> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }
}

/// Shared in-memory sink, for embedding the VM and capturing its output.
#[derive(Clone, Default)]
pub struct Capture(Rc<RefCell<Vec<u8>>>);

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    /// Return everything written so far and empty the buffer.
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.0.borrow_mut());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Number output styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dot {
    /// `n ` in the current base
    Dot,
    /// `n ` with the sign bit masked off
    UDot,
    /// right-justified to a width
    DotR,
    UDotR,
    /// the character with code point `n`
    Emit,
}

/// Console input and output for the VM.
pub struct Io {
    name: String,
    sources: Vec<Box<dyn Source>>,
    depth: usize,
    tib: Option<Tib>,
    pad: Option<String>,
    out: Box<dyn Write>,
    err: Box<dyn Write>,
    rng: StdRng,
    trace: bool,
}

impl Io {
    pub fn new(name: &str, out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        Io {
            name: name.to_string(),
            sources: Vec::new(),
            depth: 0,
            tib: None,
            pad: None,
            out,
            err,
            rng: StdRng::from_entropy(),
            trace: false,
        }
    }

    pub fn stdio(name: &str) -> Self {
        Io::new(name, Box::new(io::stdout()), Box::new(io::stderr()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    pub fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    // Input

    /// Install the primary source. Does not count as a nested load.
    pub fn set_input(&mut self, source: Box<dyn Source>) {
        self.sources.insert(0, source);
    }

    pub fn push_source(&mut self, source: Box<dyn Source>) {
        self.sources.push(source);
        self.depth += 1;
    }

    pub fn pop_source(&mut self) {
        if self.depth > 0 {
            self.sources.pop();
            self.depth -= 1;
        }
    }

    /// How many `include`s are in progress.
    pub fn load_depth(&self) -> usize {
        self.depth
    }

    /// Advance to the next line of the topmost source.
    pub fn read_line(&mut self) -> bool {
        let line = match self.sources.last_mut() {
            Some(src) => src.read_line(),
            None => Ok(None),
        };
        match line {
            Ok(Some(line)) => {
                if self.depth > 0 {
                    self.debug(&format!("{}\n", line));
                }
                self.tib = Some(Tib::new(&line));
                true
            }
            Ok(None) => {
                self.tib = None;
                false
            }
            Err(e) => {
                self.err(&RuntimeError::from(e));
                self.tib = None;
                false
            }
        }
    }

    /// Make `line` the current input line.
    pub fn feed(&mut self, line: &str) {
        self.tib = Some(Tib::new(line));
    }

    pub fn take_tib(&mut self) -> Option<Tib> {
        self.tib.take()
    }

    pub fn restore_tib(&mut self, tib: Option<Tib>) {
        self.tib = tib;
    }

    pub fn next_token(&mut self) -> Option<String> {
        self.tib.as_mut().and_then(|t| t.next_token())
    }

    /// Scan up to `delim`; the captured text also becomes the pad.
    pub fn scan(&mut self, delim: char) -> Option<String> {
        let text = self.tib.as_mut().and_then(|t| t.scan(delim));
        if text.is_some() {
            self.pad = text.clone();
        }
        text
    }

    pub fn pad(&self) -> Option<&str> {
        self.pad.as_deref()
    }

    /// Code of the first character of the next token, 0 at end of line.
    pub fn key(&mut self) -> Cell {
        self.next_token()
            .and_then(|t| t.chars().next())
            .map_or(0, |c| c as Cell)
    }

    // Output

    pub fn pstr(&mut self, s: &str) {
        self.out.write_all(s.as_bytes()).ok();
        self.out.flush().ok();
    }

    pub fn pchr(&mut self, n: Cell) {
        if let Some(ch) = char::from_u32(n as u32) {
            let mut buf = [0u8; 4];
            self.pstr(ch.encode_utf8(&mut buf));
        }
    }

    pub fn cr(&mut self) {
        self.pstr("\n");
    }

    pub fn bl(&mut self) {
        self.pchr(0x20);
    }

    pub fn spaces(&mut self, n: Cell) {
        for _ in 0..n.max(0) {
            self.pstr(" ");
        }
    }

    pub fn dot(&mut self, kind: Dot, n: Cell, width: Cell, base: Cell) {
        match kind {
            Dot::Dot => self.pstr(&format!("{} ", itoa(n, base))),
            Dot::UDot => self.pstr(&format!("{} ", itoa(n & 0x7fff_ffff, base))),
            Dot::DotR | Dot::UDotR => {
                let v = if kind == Dot::UDotR { n & 0x7fff_ffff } else { n };
                let s = itoa(v, base);
                self.spaces(width.saturating_sub(s.chars().count() as Cell));
                self.pstr(&s);
            }
            Dot::Emit => self.pchr(n),
        }
    }

    pub fn ss_dump(&mut self, ss: &[Cell], base: Cell) {
        for &n in ss {
            self.pstr(&format!("{} ", itoa(n, base)));
        }
    }

    /// Trace line, only when tracing is on.
    pub fn debug(&mut self, s: &str) {
        if self.trace {
            self.err.write_all(s.as_bytes()).ok();
        }
    }

    pub fn err(&mut self, e: &RuntimeError) {
        writeln!(self.err, "{}", e).ok();
        self.err.flush().ok();
    }

    // Environment

    /// Uniform random value in `[0, bound)`.
    pub fn rnd(&mut self, bound: Cell) -> Result<Cell, ErrorKind> {
        if bound <= 0 {
            return Err(ErrorKind::InvalidRange(bound));
        }
        Ok(self.rng.gen_range(0..bound))
    }
}

/// Wall-clock milliseconds, truncated to a cell.
pub fn clock() -> Cell {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as Cell)
}

/// Render `n` in `base`, lower-case digits. Bases outside 2..=36 use 10.
pub fn itoa(n: Cell, base: Cell) -> String {
    let radix = if (2..=36).contains(&base) { base as u32 } else { 10 };
    if n == 0 {
        return "0".to_string();
    }
    let mut v = (n as i64).unsigned_abs();
    let mut digits = Vec::new();
    while v > 0 {
        let d = (v % radix as u64) as u32;
        digits.push(std::char::from_digit(d, radix).unwrap_or('?'));
        v /= radix as u64;
    }
    if n < 0 {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

/// Parse a signed integer literal in `base`.
pub fn atoi(s: &str, base: Cell) -> Option<Cell> {
    if !(2..=36).contains(&base) {
        return None;
    }
    Cell::from_str_radix(s, base as u32).ok()
}
