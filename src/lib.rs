//! shpipe: injection-safe command templating and typed filter pipelines.
//!
//! Two pieces make shell-style scripting safe from Rust:
//!
//! - **Word templates** ([`words`]): expand a format template into an argument
//!   vector. Substituted values never get split, so a value containing spaces
//!   or shell metacharacters stays one argument:
//!
//!   ```
//!   let argv = shpipe::shwords!("grep -r {} {dir}", "two words"; dir = "/srv/my files").unwrap();
//!   assert_eq!(argv, ["grep", "-r", "two words", "/srv/my files"]);
//!   ```
//!
//! - **Filters** ([`filter`]): typed pipeline stages composed with `|`. Each
//!   endpoint has a [`Kind`](filter::Kind) (none, stream, text, iter, value)
//!   and composition only succeeds when the kinds line up.
//!
//!   ```no_run
//!   use shpipe::commands::{run, splitlines};
//!
//!   let pipeline = (run("git log --format={}", ["%h"]) | splitlines())?;
//!   for hash in pipeline.iter()? {
//!       println!("{}", hash?);
//!   }
//!   # Ok::<(), shpipe::PipelineError>(())
//!   ```
//!
//! # Architecture
//!
//! - **[`words`]** — Template parsing, format specs, word splitting.
//! - **[`filter`]** — Filter units, composition, execution helpers, operation registry.
//! - **[`commands`]** — Built-in operations (echo, cat, run, splitlines, ...).
//! - **[`cmd`]** — One-shot process helpers (`check_cmd`, `slurp_cmd`, ...).
//! - **[`config`]** — Configuration loading: embedded defaults + user overlay merge.
//! - **[`logging`]** — Log file setup for the binary.
//! - **[`request`]** — JSON request handling for the binary.

/// One-shot templated process helpers.
pub mod cmd;
/// Built-in operations and their typed constructors.
pub mod commands;
/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Template and pipeline error types.
pub mod error;
/// Filter units, composition, execution, and the operation registry.
pub mod filter;
/// File logging setup.
pub mod logging;
/// JSON requests and responses for the command-line front end.
pub mod request;
/// Template word-splitting.
pub mod words;

pub use error::{PipelineError, TemplateError};
pub use filter::{Filter, Kind, slurp, slurp_text, to_stdout};
pub use words::{Value, split_words};

/// Bind one built-in by name, with the built-in default configuration.
///
/// Arguments are checked against the operation's signature here, not when
/// the filter runs. A user config file is not consulted; to honour one,
/// build a [`filter::OperationRegistry::from_config`] from [`config::Config::load`].
///
/// ```
/// use shpipe::filter::Args;
///
/// let greet = shpipe::operation("echo", Args::new().arg("hi").named("ln", false))?;
/// assert_eq!(shpipe::slurp(&greet)?, b"hi");
/// assert!(shpipe::operation("echo", Args::new().named("loud", true)).is_err());
/// # Ok::<(), shpipe::PipelineError>(())
/// ```
pub fn operation(name: &str, args: filter::Args) -> Result<Filter, PipelineError> {
    let config = config::Config::default_config();
    let registry = filter::OperationRegistry::from_config(&config);
    registry.bind(name, args)
}
