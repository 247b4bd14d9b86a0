//! Reusable payload validation helpers.
//!
//! Each helper inspects one top-level field of a JSON payload and returns at
//! most one [`FieldError`]. Schema validators compose them with `extend`.
//!
//! Helpers other than [`required`], [`string`] and [`non_empty_string`] treat
//! an absent or `null` field as valid.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid hex color regex"));
static HTTP_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("valid url regex"));

/// Stable machine-readable error codes.
pub mod codes {
    pub const REQUIRED: &str = "required";
    pub const INVALID_TYPE: &str = "invalid_type";
    pub const EMPTY: &str = "empty";
    pub const OUT_OF_RANGE: &str = "out_of_range";
    pub const INVALID_ENUM: &str = "invalid_enum";
    pub const INVALID_FORMAT: &str = "invalid_format";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_SHAPE: &str = "invalid_shape";
    pub const UNKNOWN_TYPE: &str = "unknown_type";
}

/// One structured validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Payload field path, e.g. `title` or `columns[1].name`.
    pub field: String,
    pub message: String,
    pub code: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>, code: &str) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: code.to_string(),
        }
    }
}

/// Outcome of validating one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<FieldError>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<FieldError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Runs `check` against the payload when it is a JSON object.
pub fn object<F>(data: &Value, check: F) -> Vec<FieldError>
where
    F: FnOnce(&Map<String, Value>) -> Vec<FieldError>,
{
    match data {
        Value::Object(fields) => check(fields),
        _ => vec![FieldError::new(
            "data",
            "payload must be a JSON object",
            codes::INVALID_TYPE,
        )],
    }
}

fn present<'a>(fields: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    fields.get(field).filter(|value| !value.is_null())
}

/// Field must be present and non-null.
pub fn required(fields: &Map<String, Value>, field: &str) -> Option<FieldError> {
    match present(fields, field) {
        Some(_) => None,
        None => Some(FieldError::new(
            field,
            format!("{field} is required"),
            codes::REQUIRED,
        )),
    }
}

/// Field must be a present string; empty strings are allowed.
pub fn string(fields: &Map<String, Value>, field: &str) -> Option<FieldError> {
    match present(fields, field) {
        None => required(fields, field),
        Some(Value::String(_)) => None,
        Some(_) => Some(type_error(field, "a string")),
    }
}

/// Field must be a present string with non-whitespace content.
pub fn non_empty_string(fields: &Map<String, Value>, field: &str) -> Option<FieldError> {
    match present(fields, field) {
        None => required(fields, field),
        Some(Value::String(value)) if value.trim().is_empty() => Some(FieldError::new(
            field,
            format!("{field} must not be empty"),
            codes::EMPTY,
        )),
        Some(Value::String(_)) => None,
        Some(_) => Some(type_error(field, "a string")),
    }
}

/// Field, when set, must be a string.
pub fn optional_string(fields: &Map<String, Value>, field: &str) -> Option<FieldError> {
    match present(fields, field) {
        None | Some(Value::String(_)) => None,
        Some(_) => Some(type_error(field, "a string")),
    }
}

/// Field, when set, must be a boolean.
pub fn boolean(fields: &Map<String, Value>, field: &str) -> Option<FieldError> {
    match present(fields, field) {
        None | Some(Value::Bool(_)) => None,
        Some(_) => Some(type_error(field, "a boolean")),
    }
}

/// Field, when set, must be a number within `min..=max`.
pub fn number_in_range(
    fields: &Map<String, Value>,
    field: &str,
    min: f64,
    max: f64,
) -> Option<FieldError> {
    let value = present(fields, field)?;
    match value.as_f64() {
        None => Some(type_error(field, "a number")),
        Some(number) if number < min || number > max => Some(FieldError::new(
            field,
            format!("{field} must be between {min} and {max}"),
            codes::OUT_OF_RANGE,
        )),
        Some(_) => None,
    }
}

/// Field, when set, must be an integer within `min..=max`.
pub fn integer_in_range(
    fields: &Map<String, Value>,
    field: &str,
    min: i64,
    max: i64,
) -> Option<FieldError> {
    let value = present(fields, field)?;
    match value.as_i64() {
        None => Some(type_error(field, "an integer")),
        Some(number) if number < min || number > max => Some(FieldError::new(
            field,
            format!("{field} must be between {min} and {max}"),
            codes::OUT_OF_RANGE,
        )),
        Some(_) => None,
    }
}

/// Field, when set, must be one of `allowed`.
pub fn one_of(fields: &Map<String, Value>, field: &str, allowed: &[&str]) -> Option<FieldError> {
    match present(fields, field) {
        None => None,
        Some(Value::String(value)) if allowed.contains(&value.as_str()) => None,
        Some(_) => Some(FieldError::new(
            field,
            format!("{field} must be one of: {}", allowed.join(", ")),
            codes::INVALID_ENUM,
        )),
    }
}

/// Field, when set, must be an array of strings.
pub fn string_array(fields: &Map<String, Value>, field: &str) -> Option<FieldError> {
    match present(fields, field) {
        None => None,
        Some(Value::Array(items)) if items.iter().all(Value::is_string) => None,
        Some(_) => Some(type_error(field, "an array of strings")),
    }
}

/// Field, when it is a string, must be a `#rrggbb` color.
pub fn hex_color(fields: &Map<String, Value>, field: &str) -> Option<FieldError> {
    match present(fields, field) {
        Some(Value::String(value)) if !HEX_COLOR_RE.is_match(value) => Some(FieldError::new(
            field,
            format!("{field} must be a #rrggbb color"),
            codes::INVALID_FORMAT,
        )),
        _ => None,
    }
}

/// Field, when it is a non-empty string, must be an http(s) URL.
pub fn http_url(fields: &Map<String, Value>, field: &str) -> Option<FieldError> {
    match present(fields, field) {
        Some(Value::String(value)) if !value.is_empty() && !HTTP_URL_RE.is_match(value) => {
            Some(FieldError::new(
                field,
                format!("{field} must be an http(s) URL"),
                codes::INVALID_FORMAT,
            ))
        }
        _ => None,
    }
}

/// Field, when it is a string, must parse as an ISO 8601 timestamp with offset.
pub fn timestamp(fields: &Map<String, Value>, field: &str) -> Option<FieldError> {
    match present(fields, field) {
        Some(Value::String(value)) if value.parse::<DateTime<Utc>>().is_err() => {
            Some(FieldError::new(
                field,
                format!("{field} must be an ISO 8601 timestamp"),
                codes::INVALID_FORMAT,
            ))
        }
        _ => None,
    }
}

/// Field, when it is a string, must be a UUID.
pub fn uuid(fields: &Map<String, Value>, field: &str) -> Option<FieldError> {
    match present(fields, field) {
        Some(Value::String(value)) if Uuid::parse_str(value).is_err() => Some(FieldError::new(
            field,
            format!("{field} must be a UUID"),
            codes::INVALID_FORMAT,
        )),
        _ => None,
    }
}

fn type_error(field: &str, expected: &str) -> FieldError {
    FieldError::new(
        field,
        format!("{field} must be {expected}"),
        codes::INVALID_TYPE,
    )
}

#[cfg(test)]
mod tests {
    use super::{
        codes, hex_color, http_url, integer_in_range, non_empty_string, number_in_range, object,
        one_of, optional_string, string, string_array, timestamp, uuid, ValidationResult,
    };
    use serde_json::{json, Map, Value};

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn non_empty_string_distinguishes_missing_blank_and_wrong_type() {
        let data = fields(json!({ "blank": "  ", "number": 3, "ok": "x" }));
        assert_eq!(
            non_empty_string(&data, "missing").unwrap().code,
            codes::REQUIRED
        );
        assert_eq!(non_empty_string(&data, "blank").unwrap().code, codes::EMPTY);
        assert_eq!(
            non_empty_string(&data, "number").unwrap().code,
            codes::INVALID_TYPE
        );
        assert!(non_empty_string(&data, "ok").is_none());
    }

    #[test]
    fn string_allows_empty_but_not_null() {
        let data = fields(json!({ "content": "", "gone": null }));
        assert!(string(&data, "content").is_none());
        assert_eq!(string(&data, "gone").unwrap().code, codes::REQUIRED);
    }

    #[test]
    fn optional_helpers_accept_null() {
        let data = fields(json!({ "description": null, "priority": null }));
        assert!(optional_string(&data, "description").is_none());
        assert!(one_of(&data, "priority", &["low"]).is_none());
    }

    #[test]
    fn range_checks_report_out_of_range() {
        let data = fields(json!({ "level": 7, "confidence": 0.5, "width": "wide" }));
        let err = integer_in_range(&data, "level", 1, 6).unwrap();
        assert_eq!(err.code, codes::OUT_OF_RANGE);
        assert_eq!(err.field, "level");
        assert!(number_in_range(&data, "confidence", 0.0, 1.0).is_none());
        assert_eq!(
            number_in_range(&data, "width", 0.0, 1.0).unwrap().code,
            codes::INVALID_TYPE
        );
    }

    #[test]
    fn enum_and_array_checks() {
        let data = fields(json!({ "priority": "someday", "labels": ["a", 1] }));
        assert_eq!(
            one_of(&data, "priority", &["low", "high"]).unwrap().code,
            codes::INVALID_ENUM
        );
        assert_eq!(
            string_array(&data, "labels").unwrap().code,
            codes::INVALID_TYPE
        );
    }

    #[test]
    fn format_checks() {
        let data = fields(json!({
            "good": "#a0b1c2",
            "bad": "red",
            "url": "https://example.com/a.png",
            "path": "a.png"
        }));
        assert!(hex_color(&data, "good").is_none());
        assert_eq!(hex_color(&data, "bad").unwrap().code, codes::INVALID_FORMAT);
        assert!(http_url(&data, "url").is_none());
        assert_eq!(http_url(&data, "path").unwrap().code, codes::INVALID_FORMAT);
    }

    #[test]
    fn timestamp_and_uuid_checks() {
        let data = fields(json!({
            "dueAt": "2026-03-01T09:30:00Z",
            "localDueAt": "2026-03-01T09:30:00+02:00",
            "vague": "next tuesday",
            "target": "6f1c1a52-8f0e-4c1e-9a55-0d3f6f0c2b11",
            "bogus": "block-42"
        }));
        assert!(timestamp(&data, "dueAt").is_none());
        assert!(timestamp(&data, "localDueAt").is_none());
        assert!(timestamp(&data, "missing").is_none());
        let err = timestamp(&data, "vague").unwrap();
        assert_eq!(err.field, "vague");
        assert_eq!(err.code, codes::INVALID_FORMAT);
        assert!(uuid(&data, "target").is_none());
        assert_eq!(uuid(&data, "bogus").unwrap().code, codes::INVALID_FORMAT);
    }

    #[test]
    fn object_rejects_non_object_payload() {
        let errors = object(&json!("text"), |_| Vec::new());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "data");
        assert!(!ValidationResult::from_errors(errors).valid);
        assert!(ValidationResult::from_errors(Vec::new()).valid);
    }
}
