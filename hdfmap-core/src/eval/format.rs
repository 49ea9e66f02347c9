//! `{expression:spec}` templates.
//!
//! Supports the common part of the Python format mini-language:
//! `[[fill]align][sign][#][0][width][,|_][.precision][type]` with types
//! `f F e E g G d s %` and none.

use crate::error::EvalError;
use crate::value::{exponent_suffix, format_float, Value};

use super::interp::evaluate;
use super::lexer::syntax;
use super::parser::parse;
use super::Scope;

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    Literal(String),
    Field {
        expression: String,
        conversion: Option<char>,
        spec: String,
    },
}

/// Split a template into literal text and replacement fields.
pub(crate) fn parse_template(template: &str) -> Result<Vec<Segment>, EvalError> {
    let chars: Vec<(usize, char)> = template.char_indices().collect();
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    while i < chars.len() {
        let (pos, c) = chars[i];
        match c {
            '{' if chars.get(i + 1).map(|(_, c)| *c) == Some('{') => {
                literal.push('{');
                i += 2;
            }
            '}' if chars.get(i + 1).map(|(_, c)| *c) == Some('}') => {
                literal.push('}');
                i += 2;
            }
            '}' => return Err(syntax(pos, "single '}' encountered in template")),
            '{' => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                let (field, next) = read_field(template, &chars, i + 1)?;
                segments.push(field);
                i = next;
            }
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Read a replacement field starting after its `{`. Returns the field and
/// the index just past its closing `}`.
fn read_field(
    template: &str,
    chars: &[(usize, char)],
    start: usize,
) -> Result<(Segment, usize), EvalError> {
    let open = chars.get(start).map_or(template.len(), |(p, _)| *p);
    let mut depth = 0_usize;
    let mut quote: Option<char> = None;
    let mut split: Option<usize> = None;
    let mut i = start;
    while let Some(&(pos, c)) = chars.get(i) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ':') if depth == 0 && split.is_none() => split = Some(pos),
            (None, '}') if depth == 0 => {
                let (head, spec) = match split {
                    Some(colon) => (&template[open..colon], &template[colon + 1..pos]),
                    None => (&template[open..pos], ""),
                };
                let (expression, conversion) = split_conversion(head);
                if expression.trim().is_empty() {
                    return Err(syntax(open, "empty expression in template field"));
                }
                let field = Segment::Field {
                    expression: expression.trim().to_string(),
                    conversion,
                    spec: spec.to_string(),
                };
                return Ok((field, i + 1));
            }
            _ => {}
        }
        i += 1;
    }
    Err(syntax(open.saturating_sub(1), "expected '}' before end of template"))
}

fn split_conversion(head: &str) -> (&str, Option<char>) {
    let trimmed = head.trim_end();
    for conversion in ['s', 'r'] {
        if let Some(expr) = trimmed.strip_suffix(conversion).and_then(|h| h.strip_suffix('!')) {
            return (expr, Some(conversion));
        }
    }
    (head, None)
}

/// Evaluate every field of `template` and join the results.
pub(crate) fn render(template: &str, scope: &Scope) -> Result<String, EvalError> {
    let mut out = String::new();
    for segment in parse_template(template)? {
        match segment {
            Segment::Literal(text) => out.push_str(&text),
            Segment::Field {
                expression,
                conversion,
                spec,
            } => {
                let value = evaluate(&parse(&expression)?, scope)?;
                let value = match conversion {
                    Some('r') => Value::text(repr(&value)),
                    Some(_) => Value::text(value.to_string()),
                    None => value,
                };
                out.push_str(&format_value(&value, &spec)?);
            }
        }
    }
    Ok(out)
}

fn repr(value: &Value) -> String {
    match value {
        Value::Text(a) if a.ndim() == 0 => format!("'{value}'"),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FormatSpec {
    fill: char,
    align: Option<char>,
    sign: char,
    alternate: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    kind: Option<char>,
}

impl FormatSpec {
    pub(crate) fn parse(spec: &str) -> Result<Self, EvalError> {
        let invalid = || EvalError::FormatSpec(spec.to_string());
        let chars: Vec<char> = spec.chars().collect();
        let mut parsed = Self {
            fill: ' ',
            align: None,
            sign: '-',
            alternate: false,
            width: 0,
            grouping: None,
            precision: None,
            kind: None,
        };
        let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');
        let mut i = 0;
        if chars.len() >= 2 && is_align(chars[1]) {
            parsed.fill = chars[0];
            parsed.align = Some(chars[1]);
            i = 2;
        } else if chars.first().copied().is_some_and(is_align) {
            parsed.align = Some(chars[0]);
            i = 1;
        }
        if let Some(&c @ ('+' | '-' | ' ')) = chars.get(i) {
            parsed.sign = c;
            i += 1;
        }
        if chars.get(i) == Some(&'#') {
            parsed.alternate = true;
            i += 1;
        }
        if chars.get(i) == Some(&'0') {
            if parsed.align.is_none() {
                parsed.fill = '0';
                parsed.align = Some('=');
            }
            i += 1;
        }
        let digits = |i: &mut usize| -> Option<usize> {
            let begin = *i;
            while chars.get(*i).is_some_and(char::is_ascii_digit) {
                *i += 1;
            }
            chars[begin..*i].iter().collect::<String>().parse().ok()
        };
        parsed.width = digits(&mut i).unwrap_or(0);
        if let Some(&c @ (',' | '_')) = chars.get(i) {
            parsed.grouping = Some(c);
            i += 1;
        }
        if chars.get(i) == Some(&'.') {
            i += 1;
            parsed.precision = Some(digits(&mut i).ok_or_else(invalid)?);
        }
        if let Some(&c) = chars.get(i) {
            if !matches!(c, 'f' | 'F' | 'e' | 'E' | 'g' | 'G' | 'd' | 's' | '%') {
                return Err(invalid());
            }
            parsed.kind = Some(c);
            i += 1;
        }
        if i != chars.len() {
            return Err(invalid());
        }
        Ok(parsed)
    }
}

/// Format `value` according to a format specifier. Arrays are formatted
/// element by element.
pub(crate) fn format_value(value: &Value, spec: &str) -> Result<String, EvalError> {
    if spec.is_empty() {
        return Ok(value.to_string());
    }
    let parsed = FormatSpec::parse(spec)?;
    if value.is_scalar() {
        let scalar = match value {
            Value::Float(a) => a.iter().next().map(|v| Scalar::Float(*v)),
            Value::Int(a) => a.iter().next().map(|v| Scalar::Int(*v)),
            Value::Bool(a) => a.iter().next().map(|v| Scalar::Bool(*v)),
            Value::Text(a) => a.iter().next().map(|v| Scalar::Text(v)),
        };
        return scalar.map_or_else(|| Ok(String::new()), |s| format_scalar(s, &parsed, spec));
    }
    let items: Vec<String> = match value {
        Value::Float(a) => a.iter().map(|v| format_scalar(Scalar::Float(*v), &parsed, spec)).collect::<Result<_, _>>()?,
        Value::Int(a) => a.iter().map(|v| format_scalar(Scalar::Int(*v), &parsed, spec)).collect::<Result<_, _>>()?,
        Value::Bool(a) => a.iter().map(|v| format_scalar(Scalar::Bool(*v), &parsed, spec)).collect::<Result<_, _>>()?,
        Value::Text(a) => a.iter().map(|v| format_scalar(Scalar::Text(v), &parsed, spec)).collect::<Result<_, _>>()?,
    };
    Ok(format!("[{}]", items.join(" ")))
}

#[derive(Debug, Clone, Copy)]
enum Scalar<'a> {
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(&'a str),
}

#[allow(clippy::cast_precision_loss)]
fn format_scalar(scalar: Scalar<'_>, spec: &FormatSpec, raw: &str) -> Result<String, EvalError> {
    let invalid = || EvalError::FormatSpec(raw.to_string());
    let numeric_kind = matches!(spec.kind, Some('f' | 'F' | 'e' | 'E' | 'g' | 'G' | '%' | 'd'));
    let (negative, body) = match scalar {
        Scalar::Text(text) => {
            if spec.kind.is_some_and(|k| k != 's') || spec.sign != '-' || spec.grouping.is_some() {
                return Err(invalid());
            }
            let text: String = match spec.precision {
                Some(p) => text.chars().take(p).collect(),
                None => text.to_string(),
            };
            let align = match spec.align {
                Some('=') | None => '<',
                Some(a) => a,
            };
            return Ok(pad(&text, "", spec.fill, align, spec.width));
        }
        Scalar::Bool(b) if !numeric_kind => {
            if spec.kind == Some('s') || spec.precision.is_none() {
                let text = if b { "True" } else { "False" };
                return Ok(pad(text, "", spec.fill, spec.align.unwrap_or('<'), spec.width));
            }
            float_body(f64::from(u8::from(b)), spec)
        }
        Scalar::Bool(b) => int_or_float_body(i64::from(b), spec, &invalid)?,
        Scalar::Int(v) => {
            if spec.kind == Some('s') {
                return Err(invalid());
            }
            int_or_float_body(v, spec, &invalid)?
        }
        Scalar::Float(v) => match spec.kind {
            Some('d' | 's') => return Err(invalid()),
            _ => float_body(v, spec),
        },
    };
    let body = match spec.grouping {
        Some(sep) => group_digits(&body, sep),
        None => body,
    };
    let sign = match (negative, spec.sign) {
        (true, _) => "-",
        (false, '+') => "+",
        (false, ' ') => " ",
        _ => "",
    };
    Ok(pad(&body, sign, spec.fill, spec.align.unwrap_or('>'), spec.width))
}

#[allow(clippy::cast_precision_loss)]
fn int_or_float_body(
    value: i64,
    spec: &FormatSpec,
    invalid: &dyn Fn() -> EvalError,
) -> Result<(bool, String), EvalError> {
    match spec.kind {
        None | Some('d') => {
            if spec.precision.is_some() {
                return Err(invalid());
            }
            Ok((value < 0, value.unsigned_abs().to_string()))
        }
        _ => Ok(float_body(value as f64, spec)),
    }
}

/// Sign flag and unsigned digits of a float.
fn float_body(value: f64, spec: &FormatSpec) -> (bool, String) {
    let negative = value.is_sign_negative() && !value.is_nan();
    let magnitude = value.abs();
    let upper = spec.kind.is_some_and(|k| k.is_ascii_uppercase());
    if !magnitude.is_finite() {
        let text = if magnitude.is_nan() { "nan" } else { "inf" };
        let text = if upper { text.to_uppercase() } else { text.to_string() };
        let suffix = if spec.kind == Some('%') { "%" } else { "" };
        return (negative, format!("{text}{suffix}"));
    }
    let body = match spec.kind {
        Some('f' | 'F') => fixed(magnitude, spec.precision.unwrap_or(6), spec.alternate),
        Some('e' | 'E') => scientific(magnitude, spec.precision.unwrap_or(6), spec.alternate),
        Some('g' | 'G') => general(magnitude, spec.precision.unwrap_or(6), spec.alternate, false),
        Some('%') => format!("{}%", fixed(magnitude * 100.0, spec.precision.unwrap_or(6), spec.alternate)),
        _ => match spec.precision {
            Some(p) => general(magnitude, p, spec.alternate, true),
            None => format_float(magnitude),
        },
    };
    let body = if upper { body.to_uppercase() } else { body };
    (negative, body)
}

fn fixed(value: f64, precision: usize, alternate: bool) -> String {
    let mut text = format!("{value:.precision$}");
    if alternate && precision == 0 {
        text.push('.');
    }
    text
}

/// Mantissa digits and decimal exponent of `value` rounded to `precision`
/// digits after the point in scientific notation.
fn split_scientific(value: f64, precision: usize) -> (String, i32) {
    let text = format!("{value:.precision$e}");
    match text.split_once('e') {
        Some((mantissa, exp)) => (mantissa.to_string(), exp.parse().unwrap_or(0)),
        None => (text, 0),
    }
}

fn scientific(value: f64, precision: usize, alternate: bool) -> String {
    let (mut mantissa, exp) = split_scientific(value, precision);
    if alternate && precision == 0 {
        mantissa.push('.');
    }
    format!("{mantissa}{}", exponent_suffix(exp))
}

/// `g` formatting. `keep_point` selects the behaviour of the empty type:
/// fixed notation keeps one digit past the point and the switch to
/// scientific notation happens one exponent earlier.
fn general(value: f64, precision: usize, alternate: bool, keep_point: bool) -> String {
    let p = precision.max(1);
    let p_exp = i32::try_from(p).unwrap_or(i32::MAX);
    let (_, exp) = split_scientific(value, p - 1);
    let limit = if keep_point { p_exp - 1 } else { p_exp };
    let (mut text, suffix) = if (-4..limit).contains(&exp) || (value == 0.0 && !keep_point) {
        let decimals = usize::try_from(p_exp - 1 - exp).unwrap_or(0);
        (format!("{value:.decimals$}"), String::new())
    } else if value == 0.0 {
        (format!("{value:.0}"), String::new())
    } else {
        let (mantissa, exp) = split_scientific(value, p - 1);
        (mantissa, exponent_suffix(exp))
    };
    if !alternate && text.contains('.') {
        text = text.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    if keep_point && suffix.is_empty() && !text.contains('.') {
        text.push_str(".0");
    }
    format!("{text}{suffix}")
}

fn group_digits(body: &str, sep: char) -> String {
    let end = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    let (int, rest) = body.split_at(end);
    let mut grouped = String::new();
    for (n, c) in int.chars().enumerate() {
        if n > 0 && (int.len() - n) % 3 == 0 {
            grouped.push(sep);
        }
        grouped.push(c);
    }
    grouped.push_str(rest);
    grouped
}

fn pad(body: &str, sign: &str, fill: char, align: char, width: usize) -> String {
    let len = body.chars().count() + sign.chars().count();
    let missing = width.saturating_sub(len);
    let fill_str = |n: usize| std::iter::repeat(fill).take(n).collect::<String>();
    match align {
        '<' => format!("{sign}{body}{}", fill_str(missing)),
        '^' => format!(
            "{}{sign}{body}{}",
            fill_str(missing / 2),
            fill_str(missing - missing / 2)
        ),
        '=' => format!("{sign}{}{body}", fill_str(missing)),
        _ => format!("{}{sign}{body}", fill_str(missing)),
    }
}
