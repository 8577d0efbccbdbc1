//! Format-spec rendering for template fields.
//!
//! Supports `[[fill]align][sign][#][0][width][,|_][.precision][type]`:
//! align is one of `< > ^ =`, sign one of `+ - space`, and type one of
//! `s` for strings, `d n b o x X` for integers, `f F e E g G n %` for floats.
//! An empty spec renders the value's display form. A float with a precision
//! but no type uses the general form, keeping one fractional digit in
//! fixed notation: `{:.2}` of `3.14159` is `3.1`, of `3.0` is `3.0`.
//! There is no locale, so `n` renders like `d` and `g`.

use super::Value;

#[derive(Debug, Default)]
struct Spec {
    fill: Option<char>,
    align: Option<char>,
    sign: Option<char>,
    alternate: bool,
    zero: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    ty: Option<char>,
}

fn parse_spec(spec: &str) -> Result<Spec, String> {
    let chars: Vec<char> = spec.chars().collect();
    let len = chars.len();
    let mut out = Spec::default();
    let mut i = 0;

    let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');
    if len >= 2 && is_align(chars[1]) {
        out.fill = Some(chars[0]);
        out.align = Some(chars[1]);
        i = 2;
    } else if len >= 1 && is_align(chars[0]) {
        out.align = Some(chars[0]);
        i = 1;
    }

    if i < len && matches!(chars[i], '+' | '-' | ' ') {
        out.sign = Some(chars[i]);
        i += 1;
    }
    if i < len && chars[i] == '#' {
        out.alternate = true;
        i += 1;
    }
    if i < len && chars[i] == '0' {
        out.zero = true;
        i += 1;
    }

    let digits_start = i;
    while i < len && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i > digits_start {
        let digits: String = chars[digits_start..i].iter().collect();
        out.width = digits
            .parse()
            .map_err(|_| format!("width too large in {spec:?}"))?;
    }

    if i < len && matches!(chars[i], ',' | '_') {
        out.grouping = Some(chars[i]);
        i += 1;
    }

    if i < len && chars[i] == '.' {
        i += 1;
        let start = i;
        while i < len && chars[i].is_ascii_digit() {
            i += 1;
        }
        if i == start {
            return Err("format specifier missing precision".into());
        }
        let digits: String = chars[start..i].iter().collect();
        out.precision = Some(
            digits
                .parse()
                .map_err(|_| format!("precision too large in {spec:?}"))?,
        );
    }

    if i < len {
        out.ty = Some(chars[i]);
        i += 1;
    }
    if i < len {
        return Err(format!("invalid format specifier {spec:?}"));
    }
    Ok(out)
}

/// Render `value` according to `spec`.
pub fn format_value(value: &Value, spec: &str) -> Result<String, String> {
    if spec.is_empty() {
        return Ok(value.to_string());
    }
    let parsed = parse_spec(spec)?;
    match value {
        Value::Str(s) => format_text(s, &parsed),
        Value::Bytes(b) => format_text(&String::from_utf8_lossy(b), &parsed),
        Value::Bool(b) => format_text(&b.to_string(), &parsed),
        Value::Int(i) => format_int(*i, &parsed),
        Value::Float(x) => format_float(*x, &parsed),
        Value::List(_) | Value::Map(_) => Err(format!(
            "a {} only accepts an empty format spec",
            value.type_name()
        )),
    }
}

fn format_text(s: &str, spec: &Spec) -> Result<String, String> {
    match spec.ty {
        None | Some('s') => {}
        Some(t) => return Err(format!("unknown format code '{t}' for a string")),
    }
    if spec.sign.is_some() {
        return Err("sign not allowed in string format specifier".into());
    }
    if spec.alternate {
        return Err("alternate form (#) not allowed in string format specifier".into());
    }
    if spec.grouping.is_some() {
        return Err("cannot specify ',' or '_' with a string".into());
    }
    if spec.align == Some('=') {
        return Err("'=' alignment not allowed in string format specifier".into());
    }

    let body: String = match spec.precision {
        Some(p) => s.chars().take(p).collect(),
        None => s.to_string(),
    };
    let fill = spec.fill.unwrap_or(if spec.zero { '0' } else { ' ' });
    Ok(pad("", &body, spec.width, fill, spec.align.unwrap_or('<')))
}

fn format_int(i: i64, spec: &Spec) -> Result<String, String> {
    let (radix, prefix) = match spec.ty {
        None | Some('d' | 'n') => (10, ""),
        Some('b') => (2, "0b"),
        Some('o') => (8, "0o"),
        Some('x') => (16, "0x"),
        Some('X') => (16, "0X"),
        Some('f' | 'F' | 'e' | 'E' | 'g' | 'G' | '%') => return format_float(i as f64, spec),
        Some(t) => return Err(format!("unknown format code '{t}' for an int")),
    };
    if spec.precision.is_some() {
        return Err("precision not allowed in integer format specifier".into());
    }
    if radix != 10 && spec.grouping == Some(',') {
        return Err(format!("cannot specify ',' with '{}'", spec.ty.unwrap_or('d')));
    }

    let magnitude = i.unsigned_abs();
    let mut digits = match radix {
        2 => format!("{magnitude:b}"),
        8 => format!("{magnitude:o}"),
        16 => format!("{magnitude:x}"),
        _ => magnitude.to_string(),
    };
    if spec.ty == Some('X') {
        digits = digits.to_uppercase();
    }
    if let Some(sep) = spec.grouping {
        digits = group(&digits, sep, if radix == 10 { 3 } else { 4 });
    }

    let mut lead = sign_prefix(i < 0, spec.sign).to_string();
    if spec.alternate {
        lead.push_str(prefix);
    }
    Ok(pad_number(&lead, &digits, spec))
}

fn format_float(x: f64, spec: &Spec) -> Result<String, String> {
    let upper = matches!(spec.ty, Some('F' | 'E' | 'G'));
    let body = if !x.is_finite() {
        let word = if x.is_nan() { "nan" } else { "inf" };
        if upper {
            word.to_uppercase()
        } else {
            word.to_string()
        }
    } else {
        let magnitude = x.abs();
        match spec.ty {
            None if spec.precision.is_none() => format!("{magnitude:?}"),
            None => general(magnitude, spec, true),
            Some('g' | 'G' | 'n') => {
                let body = general(magnitude, spec, false);
                if upper { body.to_uppercase() } else { body }
            }
            Some('f' | 'F') => {
                let body = format!("{:.*}", spec.precision.unwrap_or(6), magnitude);
                group_fraction(&body, spec.grouping)
            }
            Some('e' | 'E') => {
                let rendered = format!("{:.*e}", spec.precision.unwrap_or(6), magnitude);
                let body = exponent_form(&rendered);
                if upper { body.to_uppercase() } else { body }
            }
            Some('%') => {
                let body = format!("{:.*}", spec.precision.unwrap_or(6), magnitude * 100.0);
                format!("{}%", group_fraction(&body, spec.grouping))
            }
            Some(t) => return Err(format!("unknown format code '{t}' for a float")),
        }
    };
    let lead = sign_prefix(x.is_sign_negative() && !x.is_nan(), spec.sign);
    Ok(pad_number(lead, &body, spec))
}

/// General form: `precision` significant digits (default 6), scientific when
/// the decimal exponent is below -4 or reaches the precision. `keep_fraction`
/// switches to scientific one exponent earlier and keeps `.0` on fixed output.
fn general(magnitude: f64, spec: &Spec, keep_fraction: bool) -> String {
    let digits = spec.precision.unwrap_or(6).max(1);
    let rendered = format!("{:.*e}", digits - 1, magnitude);
    let (mantissa, exp) = match rendered.split_once('e') {
        Some((m, e)) => (m, e.parse::<i64>().unwrap_or(0)),
        None => (rendered.as_str(), 0),
    };
    let limit = digits as i64 - i64::from(keep_fraction);

    if (-4..limit).contains(&exp) {
        let body = format!("{:.*}", (digits as i64 - 1 - exp) as usize, magnitude);
        let body = match (spec.alternate, body.contains('.')) {
            (true, true) => body,
            (true, false) => format!("{body}."),
            (false, _) => strip_zeros(&body, keep_fraction),
        };
        group_fraction(&body, spec.grouping)
    } else {
        let mantissa = if spec.alternate {
            mantissa.to_string()
        } else {
            strip_zeros(mantissa, false)
        };
        exponent_form(&format!("{mantissa}e{exp}"))
    }
}

/// Drop trailing fractional zeros, and the point with them unless `keep_one`.
fn strip_zeros(body: &str, keep_one: bool) -> String {
    if !body.contains('.') {
        return body.to_string();
    }
    let trimmed = body.trim_end_matches('0');
    match trimmed.strip_suffix('.') {
        Some(int) if keep_one => format!("{int}.0"),
        Some(int) => int.to_string(),
        None => trimmed.to_string(),
    }
}

/// Rust renders `1.5e2`; template output uses `1.5e+02`.
fn exponent_form(rendered: &str) -> String {
    let Some((mantissa, exp)) = rendered.split_once('e') else {
        return rendered.to_string();
    };
    let (sign, digits) = match exp.strip_prefix('-') {
        Some(d) => ('-', d),
        None => ('+', exp),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

fn group_fraction(body: &str, sep: Option<char>) -> String {
    let Some(sep) = sep else {
        return body.to_string();
    };
    match body.split_once('.') {
        Some((int, frac)) => format!("{}.{frac}", group(int, sep, 3)),
        None => group(body, sep, 3),
    }
}

fn group(digits: &str, sep: char, every: usize) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut out = String::with_capacity(digits.len() + digits.len() / every);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % every == 0 {
            out.push(sep);
        }
        out.push(*c);
    }
    out
}

fn sign_prefix(negative: bool, sign: Option<char>) -> &'static str {
    match (negative, sign) {
        (true, _) => "-",
        (false, Some('+')) => "+",
        (false, Some(' ')) => " ",
        _ => "",
    }
}

fn pad_number(lead: &str, body: &str, spec: &Spec) -> String {
    let (fill, align) = match (spec.fill, spec.align) {
        (fill, Some(align)) => (fill.unwrap_or(if spec.zero { '0' } else { ' ' }), align),
        (_, None) if spec.zero => ('0', '='),
        _ => (' ', '>'),
    };
    pad(lead, body, spec.width, fill, align)
}

/// Pad `lead + body` to `width` characters. `=` puts the fill between them.
fn pad(lead: &str, body: &str, width: usize, fill: char, align: char) -> String {
    let used = lead.chars().count() + body.chars().count();
    let missing = width.saturating_sub(used);
    let fill_str = |n: usize| std::iter::repeat_n(fill, n).collect::<String>();
    match align {
        '<' => format!("{lead}{body}{}", fill_str(missing)),
        '^' => {
            let left = missing / 2;
            format!("{}{lead}{body}{}", fill_str(left), fill_str(missing - left))
        }
        '=' => format!("{lead}{}{body}", fill_str(missing)),
        _ => format!("{}{lead}{body}", fill_str(missing)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(v: impl Into<Value>, spec: &str) -> String {
        format_value(&v.into(), spec).unwrap()
    }

    #[test]
    fn empty_spec_is_display() {
        assert_eq!(fmt("hello world", ""), "hello world");
        assert_eq!(fmt(-3, ""), "-3");
    }

    #[test]
    fn string_alignment() {
        assert_eq!(fmt("ab", "<5"), "ab   ");
        assert_eq!(fmt("ab", ">5"), "   ab");
        assert_eq!(fmt("ab", "*^6"), "**ab**");
        assert_eq!(fmt("abcdef", ".3"), "abc");
        assert_eq!(fmt("ab", "5"), "ab   ");
    }

    #[test]
    fn integers() {
        assert_eq!(fmt(42, "5"), "   42");
        assert_eq!(fmt(42, "05"), "00042");
        assert_eq!(fmt(-42, "05"), "-0042");
        assert_eq!(fmt(42, "+d"), "+42");
        assert_eq!(fmt(255, "x"), "ff");
        assert_eq!(fmt(255, "#X"), "0XFF");
        assert_eq!(fmt(5, "#010b"), "0b00000101");
        assert_eq!(fmt(1234567, ","), "1,234,567");
        assert_eq!(fmt(0xdeadbeef_i64, "_x"), "dead_beef");
    }

    #[test]
    fn floats() {
        assert_eq!(fmt(3.14159, ".2f"), "3.14");
        assert_eq!(fmt(-1.5, "8.3f"), "  -1.500");
        assert_eq!(fmt(1500.0, "e"), "1.500000e+03");
        assert_eq!(fmt(0.25, ".1%"), "25.0%");
        assert_eq!(fmt(1234.5, ",.1f"), "1,234.5");
        assert_eq!(fmt(f64::INFINITY, "F"), "INF");
        assert_eq!(fmt(2, ".1f"), "2.0");
    }

    #[test]
    fn general_format() {
        assert_eq!(fmt(3.14159, ".2"), "3.1");
        assert_eq!(fmt(3.0, ".2"), "3.0");
        assert_eq!(fmt(10.0, ".2"), "1e+01");
        assert_eq!(fmt(3.0, ".2g"), "3");
        assert_eq!(fmt(0.0, "g"), "0");
        assert_eq!(fmt(1234567.0, "g"), "1.23457e+06");
        assert_eq!(fmt(0.0001, "g"), "0.0001");
        assert_eq!(fmt(0.00001, "g"), "1e-05");
        assert_eq!(fmt(100.0, "#.3g"), "100.");
        assert_eq!(fmt(1e20, "G"), "1E+20");
        assert_eq!(fmt(-2.5, "+.3n"), "-2.5");
        assert_eq!(fmt(42, "g"), "42");
        assert_eq!(fmt(1234, "n"), "1234");
    }

    #[test]
    fn mismatched_specs_fail() {
        assert!(format_value(&Value::from("x"), "d").is_err());
        assert!(format_value(&Value::from("x"), "+").is_err());
        assert!(format_value(&Value::from(3), "s").is_err());
        assert!(format_value(&Value::from(3), ".2").is_err());
        assert!(format_value(&Value::from(["a"]), ">4").is_err());
        assert!(format_value(&Value::from(3), "5q!").is_err());
        assert!(format_value(&Value::from(3.0), ".f").is_err());
    }
}
