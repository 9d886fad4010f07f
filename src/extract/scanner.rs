//! Incremental tuple scanner for SQL dump text
//!
//! The relational dump is a long run of `INSERT ... VALUES (...),(...);`
//! statements. Decompressed output arrives in arbitrary chunks, so a tuple can
//! be split across two chunks. The scanner keeps a rolling buffer:
//!
//! 1. append the chunk,
//! 2. emit every complete tuple,
//! 3. drop everything up to the end of the last match, then trim what is
//!    left to at most `tail_bytes`.
//!
//! A tuple whose start falls outside the retained tail is lost. The tail must
//! therefore be at least as long as the longest tuple of interest.

use regex::Regex;
use std::sync::LazyLock;

/// `(page_id,'prop_name','prop_value',NULL|number)`
pub const TUPLE_PATTERN: &str = r"\((\d+),'([^']+)','([^']+)',(NULL|[\d\.]+)\)";

static TUPLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TUPLE_PATTERN).expect("valid tuple pattern"));

/// Default number of unmatched trailing bytes kept between chunks
pub const DEFAULT_TAIL_BYTES: usize = 4096;

/// One matched tuple, borrowed from the scanner buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TupleMatch<'a> {
    pub page_id: &'a str,
    pub name: &'a str,
    pub value: &'a str,
    pub extra: &'a str,
}

/// Rolling-buffer scanner over chunked text
pub struct TupleScanner {
    buffer: String,
    /// Bytes of an incomplete UTF-8 sequence at the end of the last chunk
    pending: Vec<u8>,
    tail_bytes: usize,
    matches: u64,
}

impl TupleScanner {
    /// Create a scanner retaining at most `tail_bytes` of unmatched text
    pub fn new(tail_bytes: usize) -> Self {
        Self {
            buffer: String::new(),
            pending: Vec::new(),
            tail_bytes,
            matches: 0,
        }
    }

    /// Feed a chunk of decompressed bytes, calling `emit` for every tuple it completes
    pub fn push<F>(&mut self, chunk: &[u8], emit: F)
    where
        F: FnMut(TupleMatch<'_>),
    {
        self.decode(chunk);
        self.scan(emit);
    }

    /// Feed already-decoded text
    pub fn push_str<F>(&mut self, text: &str, emit: F)
    where
        F: FnMut(TupleMatch<'_>),
    {
        self.buffer.push_str(text);
        self.scan(emit);
    }

    /// Final pass at end of stream. Any dangling partial UTF-8 sequence is
    /// replaced before matching.
    pub fn finish<F>(mut self, emit: F) -> u64
    where
        F: FnMut(TupleMatch<'_>),
    {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.buffer.push_str(&String::from_utf8_lossy(&rest));
        }
        self.scan(emit);
        self.matches
    }

    /// Bytes currently held back for the next chunk
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() + self.pending.len()
    }

    /// Total tuples matched so far
    pub fn matches(&self) -> u64 {
        self.matches
    }

    fn decode(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    self.buffer
                        .push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        // Truncated sequence at the end: wait for the next chunk
                        None => {
                            self.pending.drain(..valid);
                            return;
                        }
                        Some(bad) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                    }
                }
            }
        }
    }

    fn scan<F>(&mut self, mut emit: F)
    where
        F: FnMut(TupleMatch<'_>),
    {
        let mut consumed = 0;

        for caps in TUPLE_REGEX.captures_iter(&self.buffer) {
            let (Some(whole), Some(page_id), Some(name), Some(value), Some(extra)) =
                (caps.get(0), caps.get(1), caps.get(2), caps.get(3), caps.get(4))
            else {
                continue;
            };

            emit(TupleMatch {
                page_id: page_id.as_str(),
                name: name.as_str(),
                value: value.as_str(),
                extra: extra.as_str(),
            });
            self.matches += 1;
            consumed = whole.end();
        }

        let mut keep_from = consumed.max(self.buffer.len().saturating_sub(self.tail_bytes));
        while !self.buffer.is_char_boundary(keep_from) {
            keep_from += 1;
        }
        self.buffer.drain(..keep_from);
    }
}
