//! Template word-splitting: build an argument vector from a format template.
//!
//! ```
//! use shpipe::shwords;
//!
//! let argv = shwords!("tar -C {outdir} -xzf {}", "backup.tgz"; outdir = "/srv/my data").unwrap();
//! assert_eq!(argv, ["tar", "-C", "/srv/my data", "-xzf", "backup.tgz"]);
//! ```

pub mod format;
pub mod split;
pub mod template;
pub mod value;

pub use format::format_value;
pub use split::split_words;
pub use template::{Access, ArgRef, Conversion, Field, Piece};
pub use value::Value;

/// Expand a template into words with inline values.
///
/// Positional values follow the template, separated by commas; named values
/// follow a `;`:
///
/// ```
/// # use shpipe::shwords;
/// let argv = shwords!("git log --format={} {rev}", "%aN"; rev = "HEAD~3").unwrap();
/// assert_eq!(argv, ["git", "log", "--format=%aN", "HEAD~3"]);
/// ```
#[macro_export]
macro_rules! shwords {
    ($template:expr $(, $pos:expr)* $(; $($key:ident = $val:expr),+ )?) => {{
        let positional: ::std::vec::Vec<$crate::words::Value> =
            ::std::vec![$($crate::words::Value::from($pos)),*];
        #[allow(unused_mut)]
        let mut named = ::std::collections::BTreeMap::<::std::string::String, $crate::words::Value>::new();
        $($(
            named.insert(stringify!($key).to_string(), $crate::words::Value::from($val));
        )+)?
        $crate::words::split_words($template, &positional, &named)
    }};
}
