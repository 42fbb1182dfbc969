//! Cell values: permissive numeric parsing, text rendering and change comparison.

use serde_json::Value;

/// Parse a numeric field. Trims, parses as float, truncates toward zero.
/// Missing, empty and unparsable values become 0; never fails.
pub fn parse_number(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64)
            .unwrap_or(0),
        _ => 0,
    }
}

/// Text written to the file for a value. Integral floats render without a fraction.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
                    Some(f) => f.to_string(),
                    None => n.to_string(),
                }
            }
        }
        other => other.to_string(),
    }
}

/// Equality used for no-change detection: numeric fields compare as parsed
/// integers, everything else as trimmed text.
pub fn values_equal(numeric: bool, current: Option<&Value>, incoming: Option<&Value>) -> bool {
    if numeric {
        return parse_number(current) == parse_number(incoming);
    }
    let a = current.map(cell_text).unwrap_or_default();
    let b = incoming.map(cell_text).unwrap_or_default();
    a.trim() == b.trim()
}

/// Normalize an incoming value for storage: numeric fields become integers, text is trimmed.
pub fn coerce(numeric: bool, value: &Value) -> Value {
    if numeric {
        Value::Number(parse_number(Some(value)).into())
    } else {
        Value::String(cell_text(value).trim().to_string())
    }
}
