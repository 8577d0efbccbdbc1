//! `cat`: concatenate files into a byte stream.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::filter::signature::bound;
use crate::filter::stream::{DEFAULT_CHUNK_SIZE, chunks};
use crate::filter::{
    Args, Endpoint, Filter, Input, Kind, Operation, Output, Param, ParamKind, Produced, Signature,
};
use crate::words::Value;

use super::CHUNK_SIZE;

static SIGNATURE: Signature = Signature {
    input: Endpoint::NONE,
    output: Endpoint::required(Kind::Stream),
    positional: &[Param::variadic("filenames", ParamKind::Bytes)],
    keywords: &[CHUNK_SIZE],
    extra_keywords: false,
};

/// `cat`: file contents as a stream.
pub struct Cat;

impl Operation for Cat {
    fn name(&self) -> &'static str {
        "cat"
    }

    fn signature(&self) -> &'static Signature {
        &SIGNATURE
    }

    fn run(&self, _: Input, output: Output<'_>, args: &Args) -> Result<Produced, PipelineError> {
        let Some(out) = output.writer() else {
            return Ok(Produced::Done);
        };
        let chunk_size = args.count_or("chunk_size", DEFAULT_CHUNK_SIZE);
        for name in &args.positional {
            let path = String::from_utf8_lossy(&name.to_bytes()).into_owned();
            let with_path = |e: io::Error| io::Error::new(e.kind(), format!("{path}: {e}"));
            let file = File::open(&path).map_err(with_path)?;
            for chunk in chunks(file, chunk_size) {
                out.write_all(&chunk.map_err(with_path)?)?;
            }
        }
        Ok(Produced::Done)
    }
}

/// Stream the contents of each file in turn.
pub fn cat<I, P>(paths: I) -> Filter
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let args = paths
        .into_iter()
        .fold(Args::new(), |args, p| args.arg(Value::from(p.as_ref())));
    bound(Arc::new(Cat), args)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::commands::splitlines;
    use crate::filter::slurp;

    fn scratch(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn concatenates_files() {
        let first = scratch(b"one\n");
        let second = scratch(b"two\nthree\n");
        let (a, b) = (first.path(), second.path());
        assert_eq!(slurp(&cat([&a, &b])).unwrap(), b"one\ntwo\nthree");

        let lines: Vec<Value> = (cat([&a, &b]) | splitlines())
            .unwrap()
            .iter()
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], Value::Bytes(b"three".to_vec()));
    }

    #[test]
    fn no_files_is_empty() {
        let none: [&str; 0] = [];
        assert_eq!(slurp(&cat(none)).unwrap(), b"");
    }

    #[test]
    fn missing_file_names_path() {
        let err = slurp(&cat(["/nonexistent/shpipe-missing"])).unwrap_err();
        assert!(err.to_string().contains("shpipe-missing"));
        assert_eq!(err.category(), "io");
    }
}
