use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use validator::{ValidateEmail, ValidateLength};

use crate::entities::submission::{FieldKind, KnownField};
use crate::errors::FieldError;

pub const MIN_FIELDS: usize = 1;
pub const MAX_FIELDS: usize = 20;

pub const SUSPICIOUS_CONTENT: &str = "Suspicious content detected";

static SUSPICIOUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)<script",
        r"(?i)javascript:",
        r"(?i)on\w+\s*=",
        r"(?i)eval\s*\(",
        r"(?i)document\.",
        r"(?i)window\.",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("suspicious content pattern is valid"))
    .collect()
});

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<FieldError>,
}

impl From<Vec<FieldError>> for ValidationReport {
    fn from(errors: Vec<FieldError>) -> Self {
        ValidationReport {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validates an arbitrary decoded request body.
///
/// All checks run; errors are accumulated in a fixed order: shape errors,
/// then per-field type/length/format errors, then one suspicious-content
/// error per matching pattern per field.
pub fn validate_submission(data: &Value) -> ValidationReport {
    let Some(fields) = data.as_object() else {
        return vec![FieldError::root("must be object")].into();
    };

    let mut errors = Vec::new();

    if fields.len() > MAX_FIELDS {
        errors.push(FieldError::root(format!(
            "must NOT have more than {} properties",
            MAX_FIELDS
        )));
    }
    if fields.len() < MIN_FIELDS {
        errors.push(FieldError::root(format!(
            "must NOT have fewer than {} properties",
            MIN_FIELDS
        )));
    }

    for (key, value) in fields {
        check_field(key, value, &mut errors);
    }

    for (key, value) in fields {
        if let Value::String(text) = value {
            for pattern in SUSPICIOUS_PATTERNS.iter() {
                if pattern.is_match(text) {
                    errors.push(FieldError::new(key.as_str(), SUSPICIOUS_CONTENT));
                }
            }
        }
    }

    errors.into()
}

fn check_field(key: &str, value: &Value, errors: &mut Vec<FieldError>) {
    let kind = FieldKind::of(key);

    match (kind, value) {
        (_, Value::String(text)) => {
            if let Some(max) = kind.max_length() {
                if !text.validate_length(None, Some(max), None) {
                    errors.push(FieldError::new(
                        key,
                        format!("must NOT have more than {} characters", max),
                    ));
                }
            }
            if kind == FieldKind::Known(KnownField::Email) && !text.validate_email() {
                errors.push(FieldError::new(key, "must match format \"email\""));
            }
        }
        // Well-known fields are strings; null included.
        (FieldKind::Known(_), Value::Null | Value::Bool(_) | Value::Number(_)) => {
            errors.push(FieldError::new(key, "must be string"));
        }
        (FieldKind::Extra, Value::Null | Value::Bool(_) | Value::Number(_)) => {}
        (_, Value::Array(_) | Value::Object(_)) => {
            errors.push(FieldError::new(key, "must be a scalar value"));
        }
    }
}
