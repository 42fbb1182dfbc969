//! Request validation from config rules.

use crate::config::{Schema, ValidationRule};
use crate::error::StoreError;
use crate::table::Record;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a full record (create). All required fields must be present and non-blank.
    pub fn validate(body: &Record, rules: &HashMap<String, ValidationRule>) -> Result<(), StoreError> {
        for (col, rule) in rules {
            let val = body.get(col);
            if rule.required == Some(true) && is_blank(val) {
                return Err(StoreError::Validation(format!("{} is required", col)));
            }
            if let Some(v) = val {
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present in body (update). Required is enforced only for fields being set.
    pub fn validate_partial(body: &Record, rules: &HashMap<String, ValidationRule>) -> Result<(), StoreError> {
        for (col, v) in body {
            if let Some(rule) = rules.get(col) {
                if rule.required == Some(true) && is_blank(Some(v)) {
                    return Err(StoreError::Validation(format!("{} cannot be empty", col)));
                }
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }

    /// Every non-blank value of a numeric column must read as a number.
    pub fn validate_numbers(body: &Record, schema: &Schema) -> Result<(), StoreError> {
        for (field, v) in body {
            if schema.is_numeric(field) && !is_blank(Some(v)) {
                validate_format(schema.header_for(field).unwrap_or(field), v, "number")?;
            }
        }
        Ok(())
    }
}

fn is_blank(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

fn validate_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), StoreError> {
    if is_blank(Some(v)) {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(col, v, format)?;
    }
    if let Some(max) = rule.max_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() > max as usize {
                return Err(StoreError::Validation(format!(
                    "{} must be at most {} characters",
                    col, max
                )));
            }
        }
    }
    if let Some(min) = rule.min_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() < min as usize {
                return Err(StoreError::Validation(format!(
                    "{} must be at least {} characters",
                    col, min
                )));
            }
        }
    }
    if let Some(ref pattern) = rule.pattern {
        let re = Regex::new(pattern).map_err(|_| StoreError::Validation(format!("invalid pattern for {}", col)))?;
        if let Some(s) = v.as_str() {
            if !re.is_match(s) {
                return Err(StoreError::Validation(format!("{} does not match required pattern", col)));
            }
        }
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            return Err(StoreError::Validation(format!(
                "{} must be one of: {:?}",
                col,
                allowed.iter().take(5).collect::<Vec<_>>()
            )));
        }
    }
    if let Some(min) = rule.minimum {
        if let Some(n) = as_number(v) {
            if n < min {
                return Err(StoreError::Validation(format!("{} must be at least {}", col, min)));
            }
        }
    }
    if let Some(max) = rule.maximum {
        if let Some(n) = as_number(v) {
            if n > max {
                return Err(StoreError::Validation(format!("{} must be at most {}", col, max)));
            }
        }
    }
    Ok(())
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), Value::String(t)) => s.trim() == t.trim(),
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

/// Optional leading minus, digits, at most one decimal point.
fn is_numeric_text(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1
}

fn validate_format(col: &str, v: &Value, format: &str) -> Result<(), StoreError> {
    match format.to_lowercase().as_str() {
        "number" => {
            let ok = match v {
                Value::Number(_) => true,
                Value::String(s) => is_numeric_text(s.trim()),
                _ => false,
            };
            if !ok {
                return Err(StoreError::Validation(format!("{} must be a number", col)));
            }
        }
        "email" => {
            if let Some(s) = v.as_str() {
                if !s.contains('@') || s.len() < 3 {
                    return Err(StoreError::Validation(format!("{} must be a valid email", col)));
                }
            }
        }
        "uuid" => {
            if let Some(s) = v.as_str() {
                if uuid::Uuid::parse_str(s.trim()).is_err() {
                    return Err(StoreError::Validation(format!("{} must be a valid UUID", col)));
                }
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules(pairs: &[(&str, ValidationRule)]) -> HashMap<String, ValidationRule> {
        pairs.iter().map(|(k, r)| (k.to_string(), r.clone())).collect()
    }

    fn body(v: Value) -> Record {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    fn number_rule() -> ValidationRule {
        ValidationRule {
            format: Some("number".into()),
            ..Default::default()
        }
    }

    #[test]
    fn number_format_accepts_numeric_text() {
        let r = rules(&[("qty", number_rule())]);
        for ok in [json!("12"), json!("-3"), json!("4.5"), json!(" 7 "), json!(9), json!("")] {
            RequestValidator::validate(&body(json!({ "qty": ok })), &r).unwrap();
        }
    }

    #[test]
    fn number_format_rejects_text() {
        let r = rules(&[("qty", number_rule())]);
        let err = RequestValidator::validate(&body(json!({ "qty": "abc" })), &r).unwrap_err();
        assert_eq!(err.to_string(), "validation: qty must be a number");
        assert!(RequestValidator::validate(&body(json!({ "qty": "1-2" })), &r).is_err());
    }

    #[test]
    fn numeric_columns_are_checked_by_header() {
        let schema = Schema {
            primary_key: "part_number".into(),
            key_tokens: Vec::new(),
            columns: vec![crate::config::ColumnSpec {
                field: "qty".into(),
                header: "Qty".into(),
                numeric: true,
                default: None,
                aliases: Vec::new(),
                retain: false,
            }],
        };
        let err = RequestValidator::validate_numbers(&body(json!({ "qty": "lots" })), &schema).unwrap_err();
        assert_eq!(err.to_string(), "validation: Qty must be a number");
        RequestValidator::validate_numbers(&body(json!({ "qty": "4.5", "part_name": "abc" })), &schema).unwrap();
        RequestValidator::validate_numbers(&body(json!({ "qty": "" })), &schema).unwrap();
    }

    #[test]
    fn required_fields() {
        let r = rules(&[(
            "name",
            ValidationRule {
                required: Some(true),
                ..Default::default()
            },
        )]);
        assert!(RequestValidator::validate(&body(json!({})), &r).is_err());
        assert!(RequestValidator::validate(&body(json!({ "name": "  " })), &r).is_err());
        RequestValidator::validate(&body(json!({ "name": "Ana" })), &r).unwrap();
        RequestValidator::validate_partial(&body(json!({})), &r).unwrap();
        assert!(RequestValidator::validate_partial(&body(json!({ "name": "" })), &r).is_err());
    }

    #[test]
    fn email_uuid_and_bounds() {
        let r = rules(&[
            (
                "email",
                ValidationRule {
                    format: Some("email".into()),
                    ..Default::default()
                },
            ),
            (
                "token",
                ValidationRule {
                    format: Some("uuid".into()),
                    ..Default::default()
                },
            ),
            (
                "years",
                ValidationRule {
                    minimum: Some(0.0),
                    maximum: Some(60.0),
                    ..Default::default()
                },
            ),
        ]);
        assert!(RequestValidator::validate(&body(json!({ "email": "nope" })), &r).is_err());
        assert!(RequestValidator::validate(&body(json!({ "token": "x" })), &r).is_err());
        assert!(RequestValidator::validate(&body(json!({ "years": "-1" })), &r).is_err());
        RequestValidator::validate(
            &body(json!({
                "email": "ana@example.com",
                "token": "67e55044-10b1-426f-9247-bb680e5fe0c8",
                "years": 12
            })),
            &r,
        )
        .unwrap();
    }

    #[test]
    fn allowed_and_pattern() {
        let r = rules(&[
            (
                "uom",
                ValidationRule {
                    allowed: Some(vec![json!("Pcs"), json!("Set")]),
                    ..Default::default()
                },
            ),
            (
                "code",
                ValidationRule {
                    pattern: Some("^[A-Z]{3}$".into()),
                    ..Default::default()
                },
            ),
        ]);
        assert!(RequestValidator::validate(&body(json!({ "uom": "Box" })), &r).is_err());
        assert!(RequestValidator::validate(&body(json!({ "code": "ab" })), &r).is_err());
        RequestValidator::validate(&body(json!({ "uom": "Set", "code": "ABC" })), &r).unwrap();
    }
}
