//! Bounded reads and incremental UTF-8 decoding for stream stages.

use std::io::{self, Read};

use crate::error::PipelineError;

/// Read size used by stream stages unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Largest accepted read size (1 MiB). Larger requests are clamped to it.
pub const MAX_CHUNK_SIZE: usize = 1 << 20;

/// Iterator over successive reads of at most `size` bytes.
pub struct Chunks<R> {
    reader: R,
    size: usize,
    /// Allocated on the first read.
    buf: Vec<u8>,
    done: bool,
}

/// Read `reader` in increments of at most `size` bytes, clamped to
/// `1..=MAX_CHUNK_SIZE`.
pub fn chunks<R: Read>(reader: R, size: usize) -> Chunks<R> {
    Chunks {
        reader,
        size: size.clamp(1, MAX_CHUNK_SIZE),
        buf: Vec::new(),
        done: false,
    }
}

impl<R: Read> Iterator for Chunks<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.buf.is_empty() {
            self.buf.resize(self.size, 0);
        }
        loop {
            match self.reader.read(&mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(n) => return Some(Ok(self.buf[..n].to_vec())),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Decodes UTF-8 fed in arbitrary pieces, carrying split sequences over.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
    consumed: usize,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `pending + chunk` as forms complete characters.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<String, PipelineError> {
        self.pending.extend_from_slice(chunk);
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(e) if e.error_len().is_some() => {
                return Err(PipelineError::InvalidUtf8 {
                    position: self.consumed + e.valid_up_to(),
                });
            }
            Err(e) => e.valid_up_to(),
        };
        let text = String::from_utf8_lossy(&self.pending[..valid]).into_owned();
        self.pending.drain(..valid);
        self.consumed += valid;
        Ok(text)
    }

    /// Fail if input ended inside a multi-byte sequence.
    pub fn finish(self) -> Result<(), PipelineError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::InvalidUtf8 {
                position: self.consumed,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_respect_size() {
        let data = b"abcdefg";
        let pieces: Vec<Vec<u8>> = chunks(&data[..], 3).map(Result::unwrap).collect();
        assert_eq!(pieces, vec![b"abc".to_vec(), b"def".to_vec(), b"g".to_vec()]);
    }

    #[test]
    fn zero_chunk_size_still_progresses() {
        let pieces: Vec<Vec<u8>> = chunks(&b"ab"[..], 0).map(Result::unwrap).collect();
        assert_eq!(pieces.len(), 2);
    }

    #[test]
    fn oversized_chunk_size_clamped_and_lazy() {
        let mut reader = chunks(&b"abc"[..], usize::MAX);
        assert_eq!(reader.size, MAX_CHUNK_SIZE);
        assert!(reader.buf.is_empty());
        assert_eq!(reader.next().unwrap().unwrap(), b"abc");
        assert!(reader.next().is_none());
    }

    #[test]
    fn decoder_carries_split_sequences() {
        let bytes = "héllo ✓".as_bytes();
        let mut decoder = Utf8Decoder::new();
        let mut out = String::new();
        for b in bytes {
            out.push_str(&decoder.feed(std::slice::from_ref(b)).unwrap());
        }
        decoder.finish().unwrap();
        assert_eq!(out, "héllo ✓");
    }

    #[test]
    fn decoder_rejects_invalid_bytes() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.feed(b"ok").unwrap(), "ok");
        let err = decoder.feed(b"\xff").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidUtf8 { position: 2 }));
    }

    #[test]
    fn decoder_rejects_truncated_tail() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.feed(&"é".as_bytes()[..1]).unwrap(), "");
        assert!(decoder.finish().is_err());
    }
}
