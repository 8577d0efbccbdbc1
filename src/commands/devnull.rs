//! `devnull`: drains any input, produces nothing.

use std::sync::Arc;

use crate::error::PipelineError;
use crate::filter::signature::bound;
use crate::filter::stream::{DEFAULT_CHUNK_SIZE, chunks};
use crate::filter::{Args, Endpoint, Filter, Input, Kind, Operation, Output, Produced, Signature};

use super::CHUNK_SIZE;

static SIGNATURE: Signature = Signature {
    input: Endpoint::optional(Kind::Stream),
    output: Endpoint::optional(Kind::Stream),
    positional: &[],
    keywords: &[CHUNK_SIZE],
    extra_keywords: false,
};

/// `devnull`: drains its input and writes nothing.
pub struct Devnull;

impl Operation for Devnull {
    fn name(&self) -> &'static str {
        "devnull"
    }

    fn signature(&self) -> &'static Signature {
        &SIGNATURE
    }

    fn run(&self, input: Input, output: Output<'_>, args: &Args) -> Result<Produced, PipelineError> {
        if let Some(w) = output.writer() {
            w.flush()?;
        }
        if let Some(reader) = input.into_reader() {
            let mut drained = 0usize;
            for chunk in chunks(reader, args.count_or("chunk_size", DEFAULT_CHUNK_SIZE)) {
                drained += chunk?.len();
            }
            log::debug!("devnull drained {drained} bytes");
        }
        Ok(Produced::Done)
    }
}

/// Discard input, produce no output.
pub fn devnull() -> Filter {
    bound(Arc::new(Devnull), Args::new())
}
