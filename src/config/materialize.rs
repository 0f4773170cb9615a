//! Schema validation and typed instantiation of a resolved configuration

use configen_merge::{KeyPath, Value};
use serde::de::DeserializeOwned;
use std::fmt;

use super::error::ConfigError;
use super::schema::{FieldKind, RecordSchema};

const MISSING_PROBLEM: &str = "mandatory value is missing (???)";

/// One reason a resolved value does not satisfy its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: KeyPath,
    pub problem: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.problem)
    }
}

/// Every violation found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} problem(s): {}", .violations.len(), render_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

fn render_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check a resolved value against `schema`.
pub fn validate(schema: &RecordSchema, value: &Value) -> Result<(), ValidationError> {
    let mut violations = Vec::new();
    check_record(schema, value, &KeyPath::root(), &mut violations);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { violations })
    }
}

/// Validate, then deserialize into the caller's type.
pub fn materialize<T: DeserializeOwned>(schema: &RecordSchema, value: &Value) -> Result<T, ConfigError> {
    validate(schema, value)?;
    deserialize(value)
}

/// Deserialize a value that has no schema. Any `???` left in it fails.
pub fn materialize_schemaless<T: DeserializeOwned>(value: &Value) -> Result<T, ConfigError> {
    let violations: Vec<Violation> = value
        .missing_paths()
        .into_iter()
        .map(|path| Violation {
            path,
            problem: MISSING_PROBLEM.to_string(),
        })
        .collect();
    if !violations.is_empty() {
        return Err(ValidationError { violations }.into());
    }
    deserialize(value)
}

fn deserialize<T: DeserializeOwned>(value: &Value) -> Result<T, ConfigError> {
    serde_json::from_value(value.to_json()).map_err(|e| ConfigError::Deserialize(e.to_string()))
}

fn violation(out: &mut Vec<Violation>, path: &KeyPath, problem: impl Into<String>) {
    out.push(Violation {
        path: path.clone(),
        problem: problem.into(),
    });
}

fn check_record(schema: &RecordSchema, value: &Value, at: &KeyPath, out: &mut Vec<Violation>) {
    let keys: Vec<&str> = match value {
        Value::Record(record) => {
            if record.name() != schema.name() {
                violation(
                    out,
                    at,
                    format!("expected record {}, found record {}", schema.name(), record.name()),
                );
                return;
            }
            record.field_names().collect()
        }
        Value::Map(map) => map.keys().map(String::as_str).collect(),
        other => {
            violation(
                out,
                at,
                format!("expected record {}, found {} {}", schema.name(), other.shape(), other),
            );
            return;
        }
    };

    for decl in schema.fields() {
        let path = at.key(&decl.name);
        match value.get(&decl.name) {
            Some(field) => check_value(&decl.kind, decl.optional, field, &path, out),
            None if decl.optional => {}
            None => violation(out, &path, "required field is absent"),
        }
    }

    for key in keys {
        if schema.field_decl(key).is_none() {
            violation(out, &at.key(key), format!("unknown field for record {}", schema.name()));
        }
    }
}

fn check_value(kind: &FieldKind, optional: bool, value: &Value, at: &KeyPath, out: &mut Vec<Violation>) {
    match value {
        Value::Missing => {
            violation(out, at, MISSING_PROBLEM);
            return;
        }
        Value::Reference(expr) => {
            violation(out, at, format!("unresolved reference {}", expr));
            return;
        }
        Value::Null => {
            if !optional && !matches!(kind, FieldKind::Any) {
                violation(out, at, format!("null is not allowed for {}", kind));
            }
            return;
        }
        _ => {}
    }

    match (kind, value) {
        (FieldKind::Any, _) => {
            for path in value.missing_paths() {
                let mut full = at.clone();
                for segment in path.segments() {
                    full.push(segment.clone());
                }
                violation(out, &full, MISSING_PROBLEM);
            }
        }
        (FieldKind::Bool, Value::Bool(_))
        | (FieldKind::Int, Value::Int(_))
        | (FieldKind::Float, Value::Float(_) | Value::Int(_))
        | (FieldKind::Str, Value::Str(_)) => {}
        (FieldKind::Tuple(kinds), Value::Tuple(items) | Value::List(items)) => {
            if kinds.len() != items.len() {
                violation(
                    out,
                    at,
                    format!("expected {} elements, found {}", kinds.len(), items.len()),
                );
                return;
            }
            for (i, (kind, item)) in kinds.iter().zip(items).enumerate() {
                check_value(kind, false, item, &at.index(i), out);
            }
        }
        (FieldKind::List(inner), Value::List(items) | Value::Tuple(items)) => {
            for (i, item) in items.iter().enumerate() {
                check_value(inner, false, item, &at.index(i), out);
            }
        }
        (FieldKind::Map(inner), Value::Map(map)) => {
            for (key, item) in map {
                check_value(inner, false, item, &at.key(key), out);
            }
        }
        (FieldKind::Record(schema), Value::Record(_) | Value::Map(_)) => {
            check_record(schema, value, at, out);
        }
        _ => violation(
            out,
            at,
            format!("expected {}, found {} {}", kind, value.shape(), value),
        ),
    }
}
