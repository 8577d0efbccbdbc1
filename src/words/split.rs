//! Template expansion into an argument vector.

use std::collections::BTreeMap;

use super::format::format_value;
use super::template::{self, Access, ArgRef, Conversion, Field, Piece};
use super::Value;
use crate::error::{TemplateError, UsageError};

/// Positional numbering mode seen so far in one template.
#[derive(Debug, Clone, Copy)]
enum Numbering {
    Unset,
    Auto(usize),
    Manual,
}

/// Working state of a single expansion: finished words plus the word
/// currently being assembled.
#[derive(Debug, Default)]
struct Words {
    done: Vec<String>,
    /// `None` until a fragment is appended. A field expanding to `""` still
    /// starts a word, so `{}` with an empty value yields one empty argument.
    partial: Option<String>,
}

impl Words {
    fn push_fragment(&mut self, text: &str) {
        self.partial.get_or_insert_with(String::new).push_str(text);
    }

    fn push_literal(&mut self, text: &str) {
        let mut parts = split_spaces(text).into_iter();
        if let Some(first) = parts.next().filter(|w| !w.is_empty()) {
            self.push_fragment(first);
        }
        let rest: Vec<&str> = parts.collect();
        let Some((last, middle)) = rest.split_last() else {
            return;
        };
        self.flush();
        self.done.extend(middle.iter().map(|w| w.to_string()));
        if !last.is_empty() {
            self.partial = Some(last.to_string());
        }
    }

    fn flush(&mut self) {
        if let Some(word) = self.partial.take() {
            self.done.push(word);
        }
    }
}

/// Split on runs of one or more spaces, keeping a leading and a trailing
/// empty part when `text` starts or ends with a space.
fn split_spaces(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = text;
    loop {
        match rest.find(' ') {
            Some(i) => {
                parts.push(&rest[..i]);
                rest = rest[i..].trim_start_matches(' ');
            }
            None => {
                parts.push(rest);
                return parts;
            }
        }
    }
}

struct Expander<'a> {
    template: &'a str,
    /// Characters trimmed from the front, added back onto reported offsets.
    lead: usize,
    positional: &'a [Value],
    named: &'a BTreeMap<String, Value>,
    numbering: Numbering,
}

impl<'a> Expander<'a> {
    fn usage(&self, offset: usize, kind: UsageError) -> TemplateError {
        TemplateError::Usage {
            template: self.template.to_string(),
            offset: self.lead + offset,
            kind,
        }
    }

    fn format_error(&self, offset: usize, message: String) -> TemplateError {
        TemplateError::Format {
            template: self.template.to_string(),
            offset: self.lead + offset,
            message,
        }
    }

    fn resolve(&mut self, field: &Field) -> Result<&'a Value, TemplateError> {
        let mut value = match &field.arg {
            ArgRef::Auto => {
                let index = match self.numbering {
                    Numbering::Manual => {
                        return Err(self.usage(field.offset, UsageError::MixedNumbering));
                    }
                    Numbering::Unset => 0,
                    Numbering::Auto(next) => next,
                };
                self.numbering = Numbering::Auto(index + 1);
                self.positional
                    .get(index)
                    .ok_or_else(|| self.usage(field.offset, UsageError::MissingPositional(index)))?
            }
            ArgRef::Index(index) => {
                if let Numbering::Auto(_) = self.numbering {
                    return Err(self.usage(field.offset, UsageError::MixedNumbering));
                }
                self.numbering = Numbering::Manual;
                self.positional
                    .get(*index)
                    .ok_or_else(|| self.usage(field.offset, UsageError::MissingPositional(*index)))?
            }
            ArgRef::Key(key) => self
                .named
                .get(key)
                .ok_or_else(|| self.usage(field.offset, UsageError::MissingKey(key.clone())))?,
        };

        for access in &field.chain {
            let next = match access {
                Access::Attr(name) => value.attr(name),
                Access::Index(key) => value.index(key),
            };
            value = next.map_err(|msg| self.usage(field.offset, UsageError::InvalidAccess(msg)))?;
        }
        Ok(value)
    }

    fn expand(&mut self, pieces: &[Piece]) -> Result<Vec<String>, TemplateError> {
        let mut words = Words::default();

        for (i, piece) in pieces.iter().enumerate() {
            if !piece.literal.is_empty() {
                words.push_literal(&piece.literal);
            }
            let Some(field) = &piece.field else {
                continue;
            };
            let value = self.resolve(field)?;

            match field.conversion {
                Some(Conversion::Spread) => {
                    let followed_by_space = pieces
                        .get(i + 1)
                        .is_none_or(|next| next.literal.starts_with(' '));
                    if words.partial.is_some() || !followed_by_space {
                        return Err(self.usage(field.offset, UsageError::SpreadNotWholeWord));
                    }
                    let Value::List(items) = value else {
                        return Err(self.usage(
                            field.offset,
                            UsageError::SpreadNotList(value.type_name()),
                        ));
                    };
                    for item in items {
                        let word = format_value(item, &field.spec)
                            .map_err(|msg| self.format_error(field.offset, msg))?;
                        words.done.push(word);
                    }
                }
                Some(Conversion::Stringify) => {
                    let text = Value::Str(value.to_string());
                    let word = format_value(&text, &field.spec)
                        .map_err(|msg| self.format_error(field.offset, msg))?;
                    words.push_fragment(&word);
                }
                None => {
                    let word = format_value(value, &field.spec)
                        .map_err(|msg| self.format_error(field.offset, msg))?;
                    words.push_fragment(&word);
                }
            }
        }

        words.flush();
        Ok(words.done)
    }
}

/// Expand `template` into command-line words.
///
/// Literal text splits on spaces; a substituted value never does, so
/// `split_words("git grep {}", &["hello world".into()], &named)` yields
/// `["git", "grep", "hello world"]`. A `{name!@}` field expands a list into
/// one word per element and must stand alone as a word.
pub fn split_words(
    template: &str,
    positional: &[Value],
    named: &BTreeMap<String, Value>,
) -> Result<Vec<String>, TemplateError> {
    let trimmed = template.trim();
    let lead = template[..template.len() - template.trim_start().len()]
        .chars()
        .count();

    let pieces = template::parse(trimmed).map_err(|(offset, kind)| TemplateError::Syntax {
        template: template.to_string(),
        offset: lead + offset,
        kind,
    })?;

    Expander {
        template,
        lead,
        positional,
        named,
        numbering: Numbering::Unset,
    }
    .expand(&pieces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyntaxError;

    fn words(template: &str, positional: Vec<Value>) -> Result<Vec<String>, TemplateError> {
        split_words(template, &positional, &BTreeMap::new())
    }

    fn named(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn split_spaces_matches_run_semantics() {
        assert_eq!(split_spaces("a  b"), vec!["a", "b"]);
        assert_eq!(split_spaces(" a"), vec!["", "a"]);
        assert_eq!(split_spaces("a "), vec!["a", ""]);
        assert_eq!(split_spaces(""), vec![""]);
        assert_eq!(split_spaces("   "), vec!["", ""]);
    }

    #[test]
    fn value_with_space_stays_one_word() {
        assert_eq!(
            words("git grep {}", vec!["hello world".into()]).unwrap(),
            vec!["git", "grep", "hello world"]
        );
    }

    #[test]
    fn auto_numbering() {
        assert_eq!(
            words("{} {} {}", vec!["a".into(), "b c".into(), "d".into()]).unwrap(),
            vec!["a", "b c", "d"]
        );
    }

    #[test]
    fn surrounding_and_repeated_spaces() {
        assert_eq!(
            words("  a  {} c ", vec!["b".into()]).unwrap(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn named_values() {
        let kw = named(&[
            ("outdir", "/path/with/spaces in it".into()),
            ("tarball", "2019 Planning (final) (v2) (final final).tgz".into()),
        ]);
        assert_eq!(
            split_words("tar -C {outdir} -xzf {tarball}", &[], &kw).unwrap(),
            vec![
                "tar",
                "-C",
                "/path/with/spaces in it",
                "-xzf",
                "2019 Planning (final) (v2) (final final).tgz",
            ]
        );
    }

    #[test]
    fn within_word() {
        assert_eq!(
            words("git log --format={}", vec!["%aN".into()]).unwrap(),
            vec!["git", "log", "--format=%aN"]
        );
        let kw = named(&[("basedir", "/srv/app".into()), ("deploy_id", "0f1e2d3c".into())]);
        assert_eq!(
            split_words("{basedir}/deployments/{deploy_id}/bin/start", &[], &kw).unwrap(),
            vec!["/srv/app/deployments/0f1e2d3c/bin/start"]
        );
    }

    #[test]
    fn empty_value_is_an_argument() {
        assert_eq!(
            words("git commit -m {}", vec!["".into()]).unwrap(),
            vec!["git", "commit", "-m", ""]
        );
        assert_eq!(words("{}", vec!["".into()]).unwrap(), vec![""]);
    }

    #[test]
    fn empty_template() {
        assert!(words("", vec![]).unwrap().is_empty());
        assert!(words("   ", vec![]).unwrap().is_empty());
    }

    #[test]
    fn manual_numbering_and_reuse() {
        assert_eq!(
            words("{1} {0} {1}", vec!["a".into(), "b".into()]).unwrap(),
            vec!["b", "a", "b"]
        );
    }

    #[test]
    fn mixing_numbering_is_usage_error() {
        for template in ["{} {0}", "{0} {}"] {
            let err = words(template, vec!["a".into(), "b".into()]).unwrap_err();
            assert!(
                matches!(
                    err,
                    TemplateError::Usage {
                        kind: UsageError::MixedNumbering,
                        ..
                    }
                ),
                "{template}: {err}"
            );
        }
    }

    #[test]
    fn named_does_not_disturb_numbering() {
        let kw = named(&[("x", "X".into())]);
        assert_eq!(
            split_words("{} {x} {}", &["a".into(), "b".into()], &kw).unwrap(),
            vec!["a", "X", "b"]
        );
    }

    #[test]
    fn missing_values() {
        let err = words("echo {} {}", vec!["a".into()]).unwrap_err();
        assert_eq!(
            err,
            TemplateError::Usage {
                template: "echo {} {}".into(),
                offset: 8,
                kind: UsageError::MissingPositional(1),
            }
        );
        let err = words("echo {name}", vec![]).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::Usage {
                kind: UsageError::MissingKey(ref k),
                ..
            } if k == "name"
        ));
    }

    #[test]
    fn spread_list() {
        assert_eq!(
            words("touch {!@}", vec![Value::from(["a", "b"])]).unwrap(),
            vec!["touch", "a", "b"]
        );
        assert_eq!(
            words("touch {!@} c", vec![Value::from(["a", "b"])]).unwrap(),
            vec!["touch", "a", "b", "c"]
        );
        assert_eq!(
            words("ls {!@}", vec![Value::List(vec![])]).unwrap(),
            vec!["ls"]
        );
    }

    #[test]
    fn spread_items_use_spec() {
        assert_eq!(
            words("seq {!@:03}", vec![Value::from([1, 20])]).unwrap(),
            vec!["seq", "001", "020"]
        );
    }

    #[test]
    fn spread_must_be_whole_word() {
        let cases: Vec<(&str, Vec<Value>)> = vec![
            ("a b{!@}", vec![Value::from(["x"])]),
            ("a {!@}c", vec![Value::from(["x"])]),
            ("a {!@}{}", vec![Value::from(["b"]), "c".into()]),
        ];
        for (template, args) in cases {
            let err = words(template, args).unwrap_err();
            assert!(
                matches!(
                    err,
                    TemplateError::Usage {
                        kind: UsageError::SpreadNotWholeWord,
                        ..
                    }
                ),
                "{template}: {err}"
            );
        }
    }

    #[test]
    fn spread_needs_list() {
        let err = words("rm {!@}", vec!["file".into()]).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::Usage {
                kind: UsageError::SpreadNotList("str"),
                ..
            }
        ));
    }

    #[test]
    fn attribute_and_index_chains() {
        let mut cfg = BTreeMap::new();
        cfg.insert("host".to_string(), Value::from("db.internal"));
        cfg.insert("ports".to_string(), Value::from([5432, 5433]));
        let kw = named(&[("cfg", Value::from(cfg)), ("l", Value::from(["a", "b"]))]);
        assert_eq!(
            split_words("psql -h {cfg.host} -p {cfg[ports][1]} {l[1]}", &[], &kw).unwrap(),
            vec!["psql", "-h", "db.internal", "-p", "5433", "b"]
        );
        let err = split_words("echo {l.host}", &[], &kw).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::Usage {
                kind: UsageError::InvalidAccess(_),
                ..
            }
        ));
    }

    #[test]
    fn stringify_then_format() {
        assert_eq!(
            words("printf {!s:>4}", vec![7.into()]).unwrap(),
            vec!["printf", "   7"]
        );
    }

    #[test]
    fn nested_spec_is_syntax_error() {
        let err = words("{:{}}", vec![1.into(), 2.into()]).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::Syntax {
                kind: SyntaxError::NestedField,
                ..
            }
        ));
    }

    #[test]
    fn syntax_offsets_account_for_trimming() {
        let err = words("   echo {", vec![]).unwrap_err();
        assert_eq!(err.offset(), 8);
        assert_eq!(err.category(), "syntax");
    }

    #[test]
    fn format_error_is_distinct() {
        let err = words("echo {:d}", vec!["x".into()]).unwrap_err();
        assert_eq!(err.category(), "format");
    }

    #[test]
    fn escaped_braces_are_literal() {
        assert_eq!(
            words("find . -exec rm {{}} ;", vec![]).unwrap(),
            vec!["find", ".", "-exec", "rm", "{}", ";"]
        );
    }
}
