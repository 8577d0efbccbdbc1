//! `decode` and `encode`: move between byte and text streams as UTF-8.
//!
//! Both read their input in bounded increments and forward each increment
//! as soon as it holds complete characters.

use std::sync::Arc;

use crate::error::PipelineError;
use crate::filter::signature::bound;
use crate::filter::stream::{DEFAULT_CHUNK_SIZE, Utf8Decoder, chunks};
use crate::filter::{Args, Endpoint, Filter, Input, Kind, Operation, Output, Produced, Signature};

use super::CHUNK_SIZE;

fn transcode(input: Input, output: Output<'_>, args: &Args) -> Result<Produced, PipelineError> {
    let (Some(reader), Some(out)) = (input.into_reader(), output.writer()) else {
        return Ok(Produced::Done);
    };
    let mut decoder = Utf8Decoder::new();
    for chunk in chunks(reader, args.count_or("chunk_size", DEFAULT_CHUNK_SIZE)) {
        let text = decoder.feed(&chunk?)?;
        out.write_all(text.as_bytes())?;
    }
    decoder.finish()?;
    Ok(Produced::Done)
}

static DECODE: Signature = Signature {
    input: Endpoint::required(Kind::Stream),
    output: Endpoint::required(Kind::Text),
    positional: &[],
    keywords: &[CHUNK_SIZE],
    extra_keywords: false,
};

/// `decode`: UTF-8 bytes to text.
pub struct Decode;

impl Operation for Decode {
    fn name(&self) -> &'static str {
        "decode"
    }

    fn signature(&self) -> &'static Signature {
        &DECODE
    }

    fn run(&self, input: Input, output: Output<'_>, args: &Args) -> Result<Produced, PipelineError> {
        transcode(input, output, args)
    }
}

/// Bytes to text; fails on invalid UTF-8.
pub fn decode() -> Filter {
    bound(Arc::new(Decode), Args::new())
}

static ENCODE: Signature = Signature {
    input: Endpoint::required(Kind::Text),
    output: Endpoint::required(Kind::Stream),
    positional: &[],
    keywords: &[CHUNK_SIZE],
    extra_keywords: false,
};

/// `encode`: text to UTF-8 bytes.
pub struct Encode;

impl Operation for Encode {
    fn name(&self) -> &'static str {
        "encode"
    }

    fn signature(&self) -> &'static Signature {
        &ENCODE
    }

    fn run(&self, input: Input, output: Output<'_>, args: &Args) -> Result<Produced, PipelineError> {
        transcode(input, output, args)
    }
}

/// Text to bytes.
pub fn encode() -> Filter {
    bound(Arc::new(Encode), Args::new())
}
