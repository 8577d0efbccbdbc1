//! Template markup parser.
//!
//! Turns a template into [`Piece`]s: a literal run (with `{{`/`}}` already
//! unescaped) followed by an optional substitution [`Field`]. The grammar of a
//! field is
//!
//! ```text
//! field     := '{' reference? ('!' conversion)? (':' spec)? '}'
//! reference := ('' | digits | identifier) ('.' identifier | '[' key ']')*
//! ```
//!
//! Offsets are character offsets into the parsed string.

use crate::error::SyntaxError;

/// How a field's value is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgRef {
    /// `{}`: next positional value.
    Auto,
    /// `{N}`: positional value `N`.
    Index(usize),
    /// `{name}`: named value.
    Key(String),
}

/// One step of a `.attr` / `[key]` chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Attr(String),
    Index(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// `!s`
    Stringify,
    /// `!@` — one word per list element.
    Spread,
}

/// A parsed `{...}` substitution field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub arg: ArgRef,
    pub chain: Vec<Access>,
    pub conversion: Option<Conversion>,
    /// Format spec after `:`, empty when absent.
    pub spec: String,
    /// Offset of the opening `{`.
    pub offset: usize,
}

/// A literal run and the field that ends it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub literal: String,
    pub field: Option<Field>,
}

/// Parse a template into pieces.
///
/// A template with no fields yields a single literal piece; an empty
/// template yields no pieces.
pub fn parse(template: &str) -> Result<Vec<Piece>, (usize, SyntaxError)> {
    let chars: Vec<char> = template.chars().collect();
    let len = chars.len();
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < len {
        let c = chars[i];

        if c == '{' {
            if i + 1 < len && chars[i + 1] == '{' {
                literal.push('{');
                i += 2;
                continue;
            }
            let (field, next) = parse_field(&chars, i)?;
            pieces.push(Piece {
                literal: std::mem::take(&mut literal),
                field: Some(field),
            });
            i = next;
            continue;
        }

        if c == '}' {
            if i + 1 < len && chars[i + 1] == '}' {
                literal.push('}');
                i += 2;
                continue;
            }
            return Err((i, SyntaxError::UnmatchedClose));
        }

        literal.push(c);
        i += 1;
    }

    if !literal.is_empty() {
        pieces.push(Piece {
            literal,
            field: None,
        });
    }
    Ok(pieces)
}

/// Parse the field opening at `start`; returns it and the offset just past its `}`.
fn parse_field(chars: &[char], start: usize) -> Result<(Field, usize), (usize, SyntaxError)> {
    let len = chars.len();
    let body_start = start + 1;

    // Find the matching '}'. Braces nest so that `{:{}}` is reported as a
    // nested field rather than as a stray '}'.
    let mut depth = 0usize;
    let mut end = None;
    let mut j = body_start;
    while j < len {
        match chars[j] {
            '{' => depth += 1,
            '}' if depth == 0 => {
                end = Some(j);
                break;
            }
            '}' => depth -= 1,
            _ => {}
        }
        j += 1;
    }
    let Some(end) = end else {
        return Err((start, SyntaxError::UnmatchedOpen));
    };

    // Reference runs up to the first '!' or ':' not inside [...].
    let mut k = body_start;
    let mut in_bracket = false;
    while k < end {
        match chars[k] {
            '[' => in_bracket = true,
            ']' => in_bracket = false,
            '!' | ':' if !in_bracket => break,
            _ => {}
        }
        k += 1;
    }
    let reference: String = chars[body_start..k].iter().collect();
    let (arg, chain) = parse_reference(&reference).map_err(|kind| (start, kind))?;

    let mut conversion = None;
    if k < end && chars[k] == '!' {
        let Some(&conv) = chars.get(k + 1).filter(|_| k + 1 < end) else {
            return Err((k, SyntaxError::EmptyConversion));
        };
        conversion = Some(match conv {
            's' => Conversion::Stringify,
            '@' => Conversion::Spread,
            ':' => return Err((k, SyntaxError::EmptyConversion)),
            other => return Err((k + 1, SyntaxError::UnknownConversion(other))),
        });
        k += 2;
        if k < end && chars[k] != ':' {
            return Err((k, SyntaxError::TrailingAfterConversion));
        }
    }

    let mut spec = String::new();
    if k < end {
        // chars[k] == ':'
        for (offset, &c) in chars.iter().enumerate().take(end).skip(k + 1) {
            if c == '{' || c == '}' {
                return Err((offset, SyntaxError::NestedField));
            }
            spec.push(c);
        }
    }

    Ok((
        Field {
            arg,
            chain,
            conversion,
            spec,
            offset: start,
        },
        end + 1,
    ))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_reference(reference: &str) -> Result<(ArgRef, Vec<Access>), SyntaxError> {
    let invalid = || SyntaxError::InvalidReference(reference.to_string());

    let head_end = reference.find(['.', '[']).unwrap_or(reference.len());
    let head = &reference[..head_end];
    let arg = if head.is_empty() {
        ArgRef::Auto
    } else if head.bytes().all(|b| b.is_ascii_digit()) {
        ArgRef::Index(head.parse().map_err(|_| invalid())?)
    } else if is_identifier(head) {
        ArgRef::Key(head.to_string())
    } else {
        return Err(invalid());
    };

    let mut chain = Vec::new();
    let mut rest = &reference[head_end..];
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            let end = after.find(['.', '[']).unwrap_or(after.len());
            let name = &after[..end];
            if !is_identifier(name) {
                return Err(invalid());
            }
            chain.push(Access::Attr(name.to_string()));
            rest = &after[end..];
        } else if let Some(after) = rest.strip_prefix('[') {
            let Some(close) = after.find(']') else {
                return Err(invalid());
            };
            let key = &after[..close];
            if key.is_empty() {
                return Err(invalid());
            }
            chain.push(Access::Index(key.to_string()));
            rest = &after[close + 1..];
        } else {
            return Err(invalid());
        }
    }

    Ok((arg, chain))
}
