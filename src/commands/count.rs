//! `count`: number of values in a sequence.

use std::sync::Arc;

use crate::error::PipelineError;
use crate::filter::signature::bound;
use crate::filter::{Args, Endpoint, Filter, Input, Kind, Operation, Output, Produced, Signature};
use crate::words::Value;

static SIGNATURE: Signature = Signature {
    input: Endpoint::required(Kind::Iter),
    output: Endpoint::required(Kind::Value),
    positional: &[],
    keywords: &[],
    extra_keywords: false,
};

/// `count`: number of values in a sequence.
pub struct Count;

impl Operation for Count {
    fn name(&self) -> &'static str {
        "count"
    }

    fn signature(&self) -> &'static Signature {
        &SIGNATURE
    }

    fn run(&self, input: Input, _: Output<'_>, _: &Args) -> Result<Produced, PipelineError> {
        let mut n: i64 = 0;
        if let Input::Iter(values) = input {
            for value in values {
                value?;
                n += 1;
            }
        }
        Ok(Produced::Value(Value::Int(n)))
    }
}

/// Count the values of a sequence.
///
/// ```
/// use shpipe::commands::{count, echo, split};
/// use shpipe::filter::Outcome;
/// use shpipe::Value;
///
/// let words = (echo(["a b c"]) | split(false) | count())?;
/// assert!(matches!(words.invoke()?, Outcome::Value(Value::Int(3))));
/// # Ok::<(), shpipe::PipelineError>(())
/// ```
pub fn count() -> Filter {
    bound(Arc::new(Count), Args::new())
}
