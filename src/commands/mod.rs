//! Built-in operations.
//!
//! Each operation is a unit struct implementing [`Operation`] with a static
//! [`Signature`](crate::filter::Signature), plus a constructor function that
//! binds typed arguments directly. [`builtins`] lists them for the registry.

/// Concatenate files into a byte stream.
pub mod cat;
/// UTF-8 decoding and encoding between stream and text.
pub mod codec;
/// Count the values of a sequence.
pub mod count;
/// Drain input, produce nothing.
pub mod devnull;
/// Emit words.
pub mod echo;
/// Write a value sequence as bytes.
pub mod join;
/// External commands as stream stages.
pub mod run;
/// Cut a byte stream into records.
pub mod split;

pub use cat::cat;
pub use codec::{decode, encode};
pub use count::count;
pub use devnull::devnull;
pub use echo::{echo, echo_with};
pub use join::join;
pub use run::{RunOptions, Stderr, run, run_with};
pub use split::{split, splitlines};

use std::sync::Arc;

use crate::filter::{Operation, Param, ParamKind};

/// Read size accepted by every stream-consuming operation.
pub(crate) const CHUNK_SIZE: Param = Param::optional("chunk_size", ParamKind::ChunkSize);

/// Every built-in operation.
pub fn builtins() -> Vec<Arc<dyn Operation>> {
    vec![
        Arc::new(devnull::Devnull),
        Arc::new(cat::Cat),
        Arc::new(echo::Echo),
        Arc::new(codec::Decode),
        Arc::new(codec::Encode),
        Arc::new(split::SplitLines),
        Arc::new(split::Split),
        Arc::new(join::Join),
        Arc::new(count::Count),
        Arc::new(run::Run),
    ]
}
