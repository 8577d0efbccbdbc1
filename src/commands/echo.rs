//! `echo`: emit words separated by spaces.

use std::sync::Arc;

use crate::error::PipelineError;
use crate::filter::signature::bound;
use crate::filter::{
    Args, Endpoint, Filter, Input, Kind, Operation, Output, Param, ParamKind, Produced, Signature,
};
use crate::words::Value;

static SIGNATURE: Signature = Signature {
    input: Endpoint::NONE,
    output: Endpoint::required(Kind::Stream),
    positional: &[Param::variadic("words", ParamKind::Bytes)],
    keywords: &[Param::optional("ln", ParamKind::Bool)],
    extra_keywords: false,
};

/// `echo`: its words as a stream.
pub struct Echo;

impl Operation for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn signature(&self) -> &'static Signature {
        &SIGNATURE
    }

    fn run(&self, _: Input, output: Output<'_>, args: &Args) -> Result<Produced, PipelineError> {
        let Some(out) = output.writer() else {
            return Ok(Produced::Done);
        };
        for (i, word) in args.positional.iter().enumerate() {
            if i > 0 {
                out.write_all(b" ")?;
            }
            out.write_all(&word.to_bytes())?;
        }
        if args.bool_or("ln", true) {
            out.write_all(b"\n")?;
        }
        Ok(Produced::Done)
    }
}

/// Emit `words` joined by single spaces, then a newline.
pub fn echo<I, W>(words: I) -> Filter
where
    I: IntoIterator<Item = W>,
    W: Into<Value>,
{
    echo_with(words, true)
}

/// As [`echo`]; `ln` controls the trailing newline.
pub fn echo_with<I, W>(words: I, ln: bool) -> Filter
where
    I: IntoIterator<Item = W>,
    W: Into<Value>,
{
    let args = words
        .into_iter()
        .fold(Args::new(), |args, w| args.arg(w))
        .named("ln", ln);
    bound(Arc::new(Echo), args)
}
