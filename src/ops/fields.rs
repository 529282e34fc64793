//! Request field specifications and coercion.
//!
//! Each POST path accepts a fixed set of named JSON fields. A [`FieldSpec`]
//! names one field, its value kind and its fallback when absent; extraction
//! coerces loosely-typed input (numeric strings, numeric booleans) into the
//! canonical JSON shape handlers expect.

use serde_json::{json, Map, Value};
use thiserror::Error;

/// Errors raised while turning a request body into command arguments.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    /// The body is not a JSON object.
    #[error("Invalid request body: {0}")]
    Body(String),

    /// A required field is absent or null.
    #[error("Missing required field '{0}'")]
    Missing(&'static str),

    /// A field has a value that cannot be coerced to its kind.
    #[error("Invalid value for field '{field}': {message}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// What was wrong.
        message: String,
    },
}

/// Canonical value kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Floating-point number.
    Number,
    /// Integer; fractional input is truncated.
    Integer,
    /// Boolean.
    Boolean,
    /// String; numbers are accepted and rendered as text.
    Text,
    /// A point `[x, y]` or `[x, y, z]`, stored as three numbers.
    Point,
    /// A list of points.
    PointList,
}

impl FieldKind {
    /// JSON Schema type name.
    #[must_use]
    pub const fn schema_type(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Text => "string",
            Self::Point | Self::PointList => "array",
        }
    }
}

/// Value used when a field is absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fallback {
    /// The field must be supplied.
    Required,
    /// The field defaults to `null`.
    Null,
    Number(f64),
    Integer(i64),
    Boolean(bool),
    Text(&'static str),
    Point([f64; 2]),
    Points(&'static [[f64; 2]]),
}

impl Fallback {
    /// The default as JSON, or `None` for required fields.
    #[must_use]
    pub fn to_value(self) -> Option<Value> {
        match self {
            Self::Required => None,
            Self::Null => Some(Value::Null),
            Self::Number(n) => Some(json!(n)),
            Self::Integer(n) => Some(json!(n)),
            Self::Boolean(b) => Some(json!(b)),
            Self::Text(s) => Some(json!(s)),
            Self::Point(p) => Some(json!([p[0], p[1], 0.0])),
            Self::Points(list) => Some(Value::Array(
                list.iter().map(|p| json!([p[0], p[1], 0.0])).collect(),
            )),
        }
    }
}

/// One named request field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub default: Fallback,
    pub description: &'static str,
}

impl FieldSpec {
    /// Returns `true` if the request must carry this field.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        matches!(self.default, Fallback::Required)
    }

    /// Extracts and coerces this field from a request body.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Missing`] for an absent required field and
    /// [`FieldError::Invalid`] for a value of the wrong kind.
    pub fn extract(&self, body: &Map<String, Value>) -> Result<Value, FieldError> {
        let raw = body.get(self.name).filter(|v| !v.is_null());
        let Some(raw) = raw else {
            return self.default.to_value().ok_or(FieldError::Missing(self.name));
        };
        self.coerce(raw)
    }

    fn coerce(&self, raw: &Value) -> Result<Value, FieldError> {
        match self.kind {
            FieldKind::Number => number(raw).map(|n| json!(n)).ok_or_else(|| self.invalid(raw)),
            FieldKind::Integer => number(raw)
                .filter(|n| n.is_finite())
                .map(|n| {
                    #[allow(clippy::cast_possible_truncation)]
                    let truncated = n.trunc() as i64;
                    json!(truncated)
                })
                .ok_or_else(|| self.invalid(raw)),
            FieldKind::Boolean => boolean(raw).map(Value::Bool).ok_or_else(|| self.invalid(raw)),
            FieldKind::Text => match raw {
                Value::String(s) => Ok(json!(s)),
                Value::Number(n) => Ok(json!(n.to_string())),
                Value::Bool(b) => Ok(json!(b.to_string())),
                _ => Err(self.invalid(raw)),
            },
            FieldKind::Point => point(raw).map(|p| json!(p)).ok_or_else(|| self.invalid(raw)),
            FieldKind::PointList => {
                let items = raw.as_array().ok_or_else(|| self.invalid(raw))?;
                let points: Option<Vec<[f64; 3]>> = items.iter().map(point).collect();
                points.map(|p| json!(p)).ok_or_else(|| self.invalid(raw))
            }
        }
    }

    fn invalid(&self, raw: &Value) -> FieldError {
        FieldError::Invalid {
            field: self.name,
            message: format!("expected {}, got {raw}", self.kind.schema_type()),
        }
    }
}

fn number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn boolean(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn point(raw: &Value) -> Option<[f64; 3]> {
    let items = raw.as_array()?;
    if !(2..=3).contains(&items.len()) {
        return None;
    }
    let mut p = [0.0; 3];
    for (slot, item) in p.iter_mut().zip(items) {
        *slot = number(item)?;
    }
    Some(p)
}

/// Builds the positional argument list for `fields` from a request body.
///
/// # Errors
///
/// Returns the first field that fails to extract.
pub fn extract_all(fields: &[FieldSpec], body: &Map<String, Value>) -> Result<Vec<Value>, FieldError> {
    fields.iter().map(|f| f.extract(body)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RADIUS: FieldSpec = FieldSpec {
        name: "radius",
        kind: FieldKind::Number,
        default: Fallback::Required,
        description: "",
    };

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn required_field_missing_or_null() {
        assert_eq!(
            RADIUS.extract(&body(json!({}))),
            Err(FieldError::Missing("radius"))
        );
        assert_eq!(
            RADIUS.extract(&body(json!({"radius": null}))),
            Err(FieldError::Missing("radius"))
        );
    }

    #[test]
    fn numbers_accept_numeric_strings() {
        assert_eq!(RADIUS.extract(&body(json!({"radius": "2.5"}))), Ok(json!(2.5)));
        assert_eq!(RADIUS.extract(&body(json!({"radius": 2}))), Ok(json!(2.0)));
        assert!(matches!(
            RADIUS.extract(&body(json!({"radius": "wide"}))),
            Err(FieldError::Invalid { field: "radius", .. })
        ));
    }

    #[test]
    fn integers_truncate() {
        let spec = FieldSpec {
            name: "sides",
            kind: FieldKind::Integer,
            default: Fallback::Integer(6),
            description: "",
        };
        assert_eq!(spec.extract(&body(json!({"sides": 7.9}))), Ok(json!(7)));
        assert_eq!(spec.extract(&body(json!({}))), Ok(json!(6)));
    }

    #[test]
    fn booleans_accept_numbers_and_words() {
        let spec = FieldSpec {
            name: "through",
            kind: FieldKind::Boolean,
            default: Fallback::Boolean(false),
            description: "",
        };
        assert_eq!(spec.extract(&body(json!({"through": 1}))), Ok(json!(true)));
        assert_eq!(spec.extract(&body(json!({"through": "FALSE"}))), Ok(json!(false)));
        assert!(spec.extract(&body(json!({"through": "maybe"}))).is_err());
    }

    #[test]
    fn point_lists_are_padded_to_three_coordinates() {
        let spec = FieldSpec {
            name: "points",
            kind: FieldKind::PointList,
            default: Fallback::Points(&[[0.0, 0.0]]),
            description: "",
        };
        assert_eq!(
            spec.extract(&body(json!({"points": [[1, 2], [3, 4, 5]]}))),
            Ok(json!([[1.0, 2.0, 0.0], [3.0, 4.0, 5.0]]))
        );
        assert_eq!(spec.extract(&body(json!({}))), Ok(json!([[0.0, 0.0, 0.0]])));
        assert!(spec.extract(&body(json!({"points": [[1]]}))).is_err());
    }

    #[test]
    fn text_renders_numbers() {
        let spec = FieldSpec {
            name: "value",
            kind: FieldKind::Text,
            default: Fallback::Required,
            description: "",
        };
        assert_eq!(spec.extract(&body(json!({"value": 30}))), Ok(json!("30")));
    }
}
