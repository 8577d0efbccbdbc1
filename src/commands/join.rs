//! `join`: write a value sequence as a byte stream.

use std::sync::Arc;

use crate::error::PipelineError;
use crate::filter::signature::bound;
use crate::filter::{
    Args, Endpoint, Filter, Input, Kind, Operation, Output, Param, ParamKind, Produced, Signature,
};
use crate::words::Value;

static SIGNATURE: Signature = Signature {
    input: Endpoint::required(Kind::Iter),
    output: Endpoint::required(Kind::Stream),
    positional: &[],
    keywords: &[
        Param::optional("sep", ParamKind::Bytes),
        Param::optional("ln", ParamKind::Bool),
    ],
    extra_keywords: false,
};

/// `join`: a sequence of values as one separated stream.
pub struct Join;

impl Operation for Join {
    fn name(&self) -> &'static str {
        "join"
    }

    fn signature(&self) -> &'static Signature {
        &SIGNATURE
    }

    fn run(&self, input: Input, output: Output<'_>, args: &Args) -> Result<Produced, PipelineError> {
        let (Input::Iter(values), Some(out)) = (input, output.writer()) else {
            return Ok(Produced::Done);
        };
        let sep = args.get("sep").map_or_else(|| b"\n".to_vec(), Value::to_bytes);
        let mut any = false;
        for value in values {
            let value = value?;
            if any {
                out.write_all(&sep)?;
            }
            out.write_all(&value.to_bytes())?;
            any = true;
        }
        if any && args.bool_or("ln", true) {
            out.write_all(b"\n")?;
        }
        Ok(Produced::Done)
    }
}

/// Join values with `sep`, ending with a newline.
pub fn join(sep: &str) -> Filter {
    bound(Arc::new(Join), Args::new().named("sep", sep))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{echo, split, splitlines};
    use crate::filter::{Outcome, slurp};

    #[test]
    fn lines_round_trip() {
        let pipeline = (echo(["a\nb\n\nc"]) | splitlines() | join("\n")).unwrap();
        let Outcome::Bytes(out) = pipeline.invoke().unwrap() else {
            panic!("join writes bytes");
        };
        assert_eq!(out, b"a\nb\n\nc\n");
    }

    #[test]
    fn custom_separator() {
        let pipeline = (echo(["x  y z"]) | split(false) | join(",")).unwrap();
        assert_eq!(slurp(&pipeline).unwrap(), b"x,y,z");
    }

    #[test]
    fn empty_sequence_writes_nothing() {
        let pipeline = (echo(["   "]) | split(false) | join(",")).unwrap();
        let Outcome::Bytes(out) = pipeline.invoke().unwrap() else {
            panic!("join writes bytes");
        };
        assert!(out.is_empty());
    }
}
