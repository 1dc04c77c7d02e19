//! Dynamic values exchanged with the instrument.
//!
//! Replies arrive as comma separated ASCII tokens. Each token becomes a
//! [`Value`]; typed accessors in [`crate::instrument`] convert them into
//! domain types at the boundary.

use crate::error::{ScopeError, ScopeResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

static QUANTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^\s*([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)\s*",
        r"(?:([pnumkKMG]?)(pts|Sa/s|Hz|V|S|s|A|%)|([pnumkKMG]?)([A-Za-z/'%]*))",
        r"\s*$"
    ))
    .unwrap_or_else(|e| unreachable!("invalid quantity pattern: {e}"))
});

/// A decoded reply token, or a candidate value for a write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean, only produced through a mapping table.
    Bool(bool),
    /// Any numeric token.
    Number(f64),
    /// Any token that is not numeric.
    Text(String),
    /// Multi-field reply.
    List(Vec<Value>),
}

impl Value {
    /// Parse one reply token: numeric when it parses as a float, text otherwise.
    pub fn from_token(token: &str) -> Self {
        let token = token.trim();
        match token.parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::Text(token.to_string()),
        }
    }

    /// Split a raw reply on `,` and parse every token.
    ///
    /// A single token yields a scalar, several tokens yield [`Value::List`].
    pub fn from_reply(reply: &str) -> Self {
        let mut tokens: Vec<Value> = reply.trim().split(',').map(Value::from_token).collect();
        if tokens.len() == 1 {
            tokens.remove(0)
        } else {
            Value::List(tokens)
        }
    }

    /// Numeric view of the value.
    pub fn as_f64(&self) -> ScopeResult<f64> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(ScopeError::parse(format!("expected a number, got {other}"))),
        }
    }

    /// Boolean view of the value.
    pub fn as_bool(&self) -> ScopeResult<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(ScopeError::parse(format!("expected a boolean, got {other}"))),
        }
    }

    /// Text view of the value.
    pub fn as_text(&self) -> ScopeResult<&str> {
        match self {
            Value::Text(s) => Ok(s),
            other => Err(ScopeError::parse(format!("expected text, got {other}"))),
        }
    }

    /// Elements of a multi-field value; a scalar is a one element list.
    pub fn into_list(self) -> Vec<Value> {
        match self {
            Value::List(items) => items,
            scalar => vec![scalar],
        }
    }

    /// First element of a list, or the scalar itself.
    pub fn primary(&self) -> &Value {
        match self {
            Value::List(items) => items.first().unwrap_or(self),
            scalar => scalar,
        }
    }

    /// Compare against a device token as sent over the wire.
    pub fn matches_token(&self, token: &str) -> bool {
        match self {
            Value::Text(s) => s == token,
            Value::Number(n) => token.trim().parse::<f64>().map(|t| t == *n).unwrap_or(false),
            Value::Bool(_) | Value::List(_) => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// How a value is rendered into a write template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueFormat {
    /// Display form (`10`, `0.5`, `ON`).
    #[default]
    Text,
    /// Rounded to the nearest integer.
    Integer,
    /// C-style `%.<p>E` with a two digit exponent, e.g. `5.00E-02`.
    Scientific(usize),
}

impl ValueFormat {
    /// Render `value` for transmission.
    pub fn render(self, value: &Value) -> ScopeResult<String> {
        match (self, value) {
            (ValueFormat::Text, v) => Ok(v.to_string()),
            (ValueFormat::Integer, Value::Number(n)) => Ok(format!("{}", n.round() as i64)),
            (ValueFormat::Scientific(precision), Value::Number(n)) => {
                Ok(format_scientific(*n, precision))
            }
            (_, other) => Err(ScopeError::invalid(format!(
                "value {other} cannot be formatted as a number"
            ))),
        }
    }
}

/// Format like C's `%.<precision>E`: mantissa, `E`, sign, at least two exponent digits.
pub fn format_scientific(value: f64, precision: usize) -> String {
    let rendered = format!("{value:.precision$E}");
    match rendered.split_once('E') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}E{sign}{digits:0>2}")
        }
        None => rendered,
    }
}

/// Parse a unit-bearing numeric reply such as `5.00E-02V`, `14Mpts` or `0.125 V`.
///
/// An SI prefix directly after the number scales the result. Known unit
/// suffixes are matched first, so the `p` of a bare `pts` is not a prefix.
pub fn parse_quantity(reply: &str) -> ScopeResult<f64> {
    let caps = QUANTITY_RE
        .captures(reply)
        .ok_or_else(|| ScopeError::parse(format!("'{}' is not a numeric quantity", reply.trim())))?;
    let number: f64 = caps[1]
        .parse()
        .map_err(|_| ScopeError::parse(format!("'{}' is not a number", &caps[1])))?;
    let prefix = caps
        .get(2)
        .or_else(|| caps.get(4))
        .map_or("", |m| m.as_str());
    let scale = match prefix {
        "p" => 1e-12,
        "n" => 1e-9,
        "u" => 1e-6,
        "m" => 1e-3,
        "k" | "K" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        _ => 1.0,
    };
    Ok(number * scale)
}

/// Reply pre-processor that reduces a unit-bearing quantity to a bare number.
///
/// Replies that are not quantities are passed through unchanged so that the
/// typed layer reports the mismatch.
pub fn strip_unit(reply: &str) -> String {
    match parse_quantity(reply) {
        Ok(n) => n.to_string(),
        Err(_) => reply.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_tokens() {
        assert_eq!(Value::from_reply("5.00E-02"), Value::Number(0.05));
        assert_eq!(Value::from_reply("ON"), Value::Text("ON".into()));
        assert_eq!(
            Value::from_reply("SP,1,NP,0,FP,0"),
            Value::List(vec![
                "SP".into(),
                1.0.into(),
                "NP".into(),
                0.0.into(),
                "FP".into(),
                0.0.into(),
            ])
        );
    }

    #[test]
    fn test_math_definition_keeps_quotes() {
        let value = Value::from_reply("EQN,'C1+C2'");
        let items = value.into_list();
        assert_eq!(items[1], Value::Text("'C1+C2'".into()));
    }

    #[test]
    fn test_format_scientific_matches_printf() {
        assert_eq!(format_scientific(0.05, 2), "5.00E-02");
        assert_eq!(format_scientific(1.0, 2), "1.00E+00");
        assert_eq!(format_scientific(-1e-7, 2), "-1.00E-07");
        assert_eq!(format_scientific(2.5e6, 3), "2.500E+06");
        assert_eq!(format_scientific(1e-100, 1), "1.0E-100");
    }

    #[test]
    fn test_parse_quantity_units_and_prefixes() {
        assert_eq!(parse_quantity("5.00E-02V").unwrap(), 0.05);
        assert_eq!(parse_quantity("0.125 V").unwrap(), 0.125);
        assert_eq!(parse_quantity("14Mpts").unwrap(), 14e6);
        assert_eq!(parse_quantity("70K").unwrap(), 70e3);
        assert_eq!(parse_quantity("1.00E+09Sa/s").unwrap(), 1e9);
        assert_eq!(parse_quantity("-1.00E-08S").unwrap(), -1e-8);
        assert!(parse_quantity("Stop").is_err());
    }

    #[test]
    fn test_point_counts_without_prefix() {
        assert_eq!(parse_quantity("1.40E+07pts").unwrap(), 14e6);
        assert_eq!(parse_quantity("7000pts").unwrap(), 7000.0);
        assert_eq!(parse_quantity("14Mpts").unwrap(), 14e6);
        assert_eq!(parse_quantity("2.5kpts").unwrap(), 2500.0);
        assert_eq!(parse_quantity("50.00%").unwrap(), 50.0);
        assert_eq!(parse_quantity("5mV").unwrap(), 5e-3);
        assert_eq!(parse_quantity("1.00E+03Hz").unwrap(), 1e3);
    }

    #[test]
    fn test_non_finite_tokens_stay_text() {
        for token in ["NaN", "inf", "-inf", "infinity"] {
            assert_eq!(Value::from_token(token), Value::Text(token.to_string()));
        }
    }

    #[test]
    fn test_strip_unit_passes_text_through() {
        assert_eq!(strip_unit("1.00E-06S"), "0.000001");
        assert_eq!(strip_unit("Trig'd"), "Trig'd");
    }

    #[test]
    fn test_render_formats() {
        assert_eq!(ValueFormat::Text.render(&10.0.into()).unwrap(), "10");
        assert_eq!(ValueFormat::Integer.render(&15.6.into()).unwrap(), "16");
        assert_eq!(ValueFormat::Scientific(2).render(&0.05.into()).unwrap(), "5.00E-02");
        assert!(ValueFormat::Scientific(2).render(&"ON".into()).is_err());
    }

    #[test]
    fn test_matches_token() {
        assert!(Value::Number(7e3).matches_token("7000"));
        assert!(Value::Text("A1M".into()).matches_token("A1M"));
        assert!(!Value::Text("A1M".into()).matches_token("D1M"));
    }
}
