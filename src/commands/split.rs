//! `splitlines` and `split`: cut a byte stream into records.
//!
//! Records come out as [`Value::Bytes`]. The splitter keeps the unfinished
//! record between reads, so the records produced depend only on the bytes
//! of the stream and never on how reads happened to chunk it.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::filter::signature::bound;
use crate::filter::stream::{Chunks, DEFAULT_CHUNK_SIZE, chunks};
use crate::filter::{
    Args, Endpoint, Filter, Input, Kind, Operation, Output, Param, ParamKind, Produced, Reader,
    Signature,
};
use crate::words::Value;

use super::CHUNK_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    /// Each `\n` ends a record; a final unterminated record is kept if non-empty.
    Newline,
    /// Runs of ASCII whitespace separate records; empty records never appear.
    Whitespace,
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

struct Records {
    chunks: Chunks<Reader>,
    delimiter: Delimiter,
    fragment: Vec<u8>,
    ready: VecDeque<Vec<u8>>,
    done: bool,
}

impl Records {
    fn new(reader: Reader, delimiter: Delimiter, chunk_size: usize) -> Self {
        Self {
            chunks: chunks(reader, chunk_size),
            delimiter,
            fragment: Vec::new(),
            ready: VecDeque::new(),
            done: false,
        }
    }

    fn absorb(&mut self, chunk: &[u8]) {
        match self.delimiter {
            Delimiter::Newline => {
                let mut pieces = chunk.split(|&b| b == b'\n');
                if let Some(first) = pieces.next() {
                    self.fragment.extend_from_slice(first);
                }
                for piece in pieces {
                    self.ready.push_back(std::mem::take(&mut self.fragment));
                    self.fragment.extend_from_slice(piece);
                }
            }
            Delimiter::Whitespace => {
                for &b in chunk {
                    if !is_space(b) {
                        self.fragment.push(b);
                    } else if !self.fragment.is_empty() {
                        self.ready.push_back(std::mem::take(&mut self.fragment));
                    }
                }
            }
        }
    }
}

impl Iterator for Records {
    type Item = Result<Value, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.ready.pop_front() {
                return Some(Ok(Value::Bytes(record)));
            }
            if self.done {
                return None;
            }
            match self.chunks.next() {
                Some(Ok(chunk)) => self.absorb(&chunk),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                None => {
                    self.done = true;
                    if !self.fragment.is_empty() {
                        self.ready.push_back(std::mem::take(&mut self.fragment));
                    }
                }
            }
        }
    }
}

fn records(input: Input, delimiter: Delimiter, args: &Args) -> Produced {
    let Some(reader) = input.into_reader() else {
        return Produced::Iter(Box::new(std::iter::empty()));
    };
    let chunk_size = args.count_or("chunk_size", DEFAULT_CHUNK_SIZE);
    Produced::Iter(Box::new(Records::new(reader, delimiter, chunk_size)))
}

// ── splitlines ──

static SPLITLINES: Signature = Signature {
    input: Endpoint::required(Kind::Stream),
    output: Endpoint::required(Kind::Iter),
    positional: &[],
    keywords: &[CHUNK_SIZE],
    extra_keywords: false,
};

/// `splitlines`: a stream as a sequence of lines.
pub struct SplitLines;

impl Operation for SplitLines {
    fn name(&self) -> &'static str {
        "splitlines"
    }

    fn signature(&self) -> &'static Signature {
        &SPLITLINES
    }

    fn run(&self, input: Input, _: Output<'_>, args: &Args) -> Result<Produced, PipelineError> {
        Ok(records(input, Delimiter::Newline, args))
    }
}

/// Split a byte stream into `\n`-terminated lines.
pub fn splitlines() -> Filter {
    bound(Arc::new(SplitLines), Args::new())
}

// ── split ──

static SPLIT: Signature = Signature {
    input: Endpoint::required(Kind::Stream),
    output: Endpoint::required(Kind::Iter),
    positional: &[],
    keywords: &[Param::optional("lines", ParamKind::Bool), CHUNK_SIZE],
    extra_keywords: false,
};

/// `split`: a stream as a sequence of whitespace- or newline-separated records.
pub struct Split;

impl Operation for Split {
    fn name(&self) -> &'static str {
        "split"
    }

    fn signature(&self) -> &'static Signature {
        &SPLIT
    }

    fn run(&self, input: Input, _: Output<'_>, args: &Args) -> Result<Produced, PipelineError> {
        let delimiter = if args.bool_or("lines", false) {
            Delimiter::Newline
        } else {
            Delimiter::Whitespace
        };
        Ok(records(input, delimiter, args))
    }
}

/// Split a byte stream on whitespace, or on newlines when `lines` is set.
pub fn split(lines: bool) -> Filter {
    bound(Arc::new(Split), Args::new().named("lines", lines))
}
