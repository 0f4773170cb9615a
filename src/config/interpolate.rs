//! Resolution of `${...}` references after merging
//!
//! Path syntax inside `${...}`:
//! - `a.b.c` is absolute from the root; numeric parts index sequences
//! - a leading `.` addresses the container of the referencing node, and each
//!   further leading dot moves one level up (`${..x}` at `conf3.y` reads `x`)
//!
//! A string that is exactly one expression takes the target's value and type.
//! Otherwise every expression must resolve to a scalar and is spliced in as text.

use configen_merge::{KeyPath, Mapping, Record, Segment, Shape, Value};
use regex_lite::Regex;
use std::sync::OnceLock;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpolationError {
    #[error("`{expr}` at {at} refers to undefined path {target}")]
    Undefined {
        at: KeyPath,
        expr: String,
        target: KeyPath,
    },

    #[error("`{expr}` at {at} refers to missing value {target}")]
    MissingValue {
        at: KeyPath,
        expr: String,
        target: KeyPath,
    },

    #[error("reference cycle: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    #[error("`{expr}` at {at} resolves to a {shape}, which cannot be embedded in a string")]
    NotEmbeddable {
        at: KeyPath,
        expr: String,
        shape: Shape,
    },

    #[error("relative reference `{expr}` at {at} escapes the root")]
    EscapesRoot { at: KeyPath, expr: String },

    #[error("empty reference at {at}")]
    Empty { at: KeyPath },
}

fn expression_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^\$\{\}]*)\}").expect("interpolation pattern is valid"))
}

/// Resolve every reference in `root`, returning a new tree.
pub fn resolve(root: &Value) -> Result<Value, InterpolationError> {
    Resolver {
        root,
        active: Vec::new(),
    }
    .resolve_node(root, &KeyPath::root())
}

struct Resolver<'a> {
    root: &'a Value,
    /// Targets currently being resolved, outermost first.
    active: Vec<KeyPath>,
}

impl<'a> Resolver<'a> {
    fn resolve_node(&mut self, node: &Value, at: &KeyPath) -> Result<Value, InterpolationError> {
        match node {
            Value::Reference(text) => self.interpolate(text, at),
            Value::Str(text) if text.contains("${") => self.interpolate(text, at),
            Value::Tuple(items) => Ok(Value::Tuple(self.resolve_items(items, at)?)),
            Value::List(items) => Ok(Value::List(self.resolve_items(items, at)?)),
            Value::Map(map) => {
                let mut resolved = Mapping::with_capacity(map.len());
                for (key, value) in map {
                    resolved.insert(key.clone(), self.resolve_node(value, &at.key(key))?);
                }
                Ok(Value::Map(resolved))
            }
            Value::Record(record) => {
                let mut fields = Vec::with_capacity(record.len());
                for (name, value) in record.fields() {
                    fields.push((name, self.resolve_node(value, &at.key(name))?));
                }
                Ok(Value::Record(Record::new(record.name(), fields)))
            }
            _ => Ok(node.clone()),
        }
    }

    fn resolve_items(&mut self, items: &[Value], at: &KeyPath) -> Result<Vec<Value>, InterpolationError> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.resolve_node(item, &at.index(i)))
            .collect()
    }

    fn interpolate(&mut self, text: &str, at: &KeyPath) -> Result<Value, InterpolationError> {
        let pattern = expression_pattern();

        if let Some(whole) = pattern.captures(text) {
            let span = whole.get(0).map(|m| (m.start(), m.end()));
            if span == Some((0, text.len())) {
                return self.lookup(&whole[1], at);
            }
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in pattern.captures_iter(text) {
            let Some(m) = caps.get(0) else { continue };
            out.push_str(&text[last..m.start()]);
            let expr = &caps[1];
            let value = self.lookup(expr, at)?;
            out.push_str(&render_scalar(&value).ok_or_else(|| InterpolationError::NotEmbeddable {
                at: at.clone(),
                expr: expr.to_string(),
                shape: value.shape(),
            })?);
            last = m.end();
        }
        out.push_str(&text[last..]);
        Ok(Value::Str(out))
    }

    fn lookup(&mut self, expr: &str, at: &KeyPath) -> Result<Value, InterpolationError> {
        let target = target_path(expr, at)?;

        if let Some(pos) = self.active.iter().position(|p| *p == target) {
            let mut chain: Vec<String> = self.active[pos..].iter().map(ToString::to_string).collect();
            chain.push(target.to_string());
            return Err(InterpolationError::Cycle { chain });
        }

        debug!(at = %at, target = %target, "resolving reference");
        let request = Request { at, expr, target: &target };
        self.active.push(target.clone());
        let root = self.root;
        let resolved = self.descend(root, KeyPath::root(), target.segments(), &request);
        self.active.pop();
        resolved
    }

    /// Walk `rest` down from `node`, resolving references met on the way so
    /// a path may pass through a node that is itself a reference.
    fn descend(
        &mut self,
        node: &Value,
        walked: KeyPath,
        rest: &[Segment],
        request: &Request<'_>,
    ) -> Result<Value, InterpolationError> {
        let Some((segment, tail)) = rest.split_first() else {
            if node.is_missing() {
                return Err(request.error(|at, expr, target| InterpolationError::MissingValue { at, expr, target }));
            }
            return self.resolve_node(node, &walked);
        };

        if node.is_reference() {
            let resolved = self.resolve_node(node, &walked)?;
            return self.descend(&resolved, walked, rest, request);
        }

        let step: KeyPath = std::iter::once(segment.clone()).collect();
        let child = node
            .get_path(&step)
            .ok_or_else(|| request.error(|at, expr, target| InterpolationError::Undefined { at, expr, target }))?;
        let mut next = walked;
        next.push(segment.clone());
        self.descend(child, next, tail, request)
    }
}

/// The reference being looked up, for error reporting.
struct Request<'r> {
    at: &'r KeyPath,
    expr: &'r str,
    target: &'r KeyPath,
}

impl Request<'_> {
    fn error(&self, build: impl FnOnce(KeyPath, String, KeyPath) -> InterpolationError) -> InterpolationError {
        build(self.at.clone(), self.expr.to_string(), self.target.clone())
    }
}

fn target_path(expr: &str, at: &KeyPath) -> Result<KeyPath, InterpolationError> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err(InterpolationError::Empty { at: at.clone() });
    }

    let dots = expr.chars().take_while(|c| *c == '.').count();
    let mut target = if dots == 0 {
        KeyPath::root()
    } else {
        if dots > at.len() {
            return Err(InterpolationError::EscapesRoot {
                at: at.clone(),
                expr: expr.to_string(),
            });
        }
        at.truncated(at.len() - dots)
    };

    for part in expr[dots..].split('.').filter(|part| !part.is_empty()) {
        target.push(Segment::Key(part.to_string()));
    }
    Ok(target)
}

fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Str(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn test_absolute_reference_keeps_type() {
        let resolved = resolve(&v(json!({"a": {"b": 3}, "c": "${a.b}"}))).unwrap();
        assert_eq!(resolved.get("c"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_reference_to_container_copies_it() {
        let resolved = resolve(&v(json!({"a": {"b": [1, 2]}, "c": "${a}"}))).unwrap();
        assert_eq!(resolved.get("c"), Some(&v(json!({"b": [1, 2]}))));
    }

    #[test]
    fn test_embedded_references() {
        let resolved = resolve(&v(json!({
            "host": "localhost",
            "port": 8080,
            "url": "http://${host}:${port}/api"
        })))
        .unwrap();
        assert_eq!(resolved.get("url"), Some(&Value::Str("http://localhost:8080/api".to_string())));
    }

    #[test]
    fn test_relative_references() {
        let resolved = resolve(&v(json!({
            "conf2": 3,
            "conf3": {"confc1": "child", "sibling": "${.confc1}", "up": "${..conf2}"}
        })))
        .unwrap();
        let conf3 = resolved.get("conf3").unwrap();
        assert_eq!(conf3.get("sibling"), Some(&Value::Str("child".to_string())));
        assert_eq!(conf3.get("up"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_chained_references() {
        let resolved = resolve(&v(json!({"a": "${b}", "b": "${c}", "c": true}))).unwrap();
        assert_eq!(resolved.get("a"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_sequence_index() {
        let resolved = resolve(&v(json!({"xs": [10, 20], "second": "${xs.1}"}))).unwrap();
        assert_eq!(resolved.get("second"), Some(&Value::Int(20)));
    }

    #[test]
    fn test_path_through_reference() {
        let resolved = resolve(&v(json!({"a": "${b}", "b": {"x": 1}, "c": "${a.x}"}))).unwrap();
        assert_eq!(resolved.get("c"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_path_through_self_reference_is_cycle() {
        let err = resolve(&v(json!({"a": "${a.x}"}))).unwrap_err();
        assert!(matches!(err, InterpolationError::Cycle { .. }));
    }

    #[test]
    fn test_undefined_reference() {
        let err = resolve(&v(json!({"a": "${nope.x}"}))).unwrap_err();
        assert!(matches!(err, InterpolationError::Undefined { .. }));
        assert!(err.to_string().contains("nope.x"));
    }

    #[test]
    fn test_cycle_detected() {
        let err = resolve(&v(json!({"a": "${b}", "b": "${a}"}))).unwrap_err();
        let InterpolationError::Cycle { chain } = err else {
            panic!("expected a cycle, got {}", err);
        };
        assert_eq!(chain, vec!["b", "a", "b"]);
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let err = resolve(&v(json!({"a": "${a}"}))).unwrap_err();
        assert!(matches!(err, InterpolationError::Cycle { .. }));
    }

    #[test]
    fn test_reference_to_missing() {
        let err = resolve(&v(json!({"a": "???", "b": "${a}"}))).unwrap_err();
        assert!(matches!(err, InterpolationError::MissingValue { .. }));
    }

    #[test]
    fn test_container_not_embeddable() {
        let err = resolve(&v(json!({"a": [1], "b": "x-${a}"}))).unwrap_err();
        assert!(matches!(
            err,
            InterpolationError::NotEmbeddable { shape: Shape::VariableSequence, .. }
        ));
    }

    #[test]
    fn test_relative_escaping_root() {
        let err = resolve(&v(json!({"a": "${...x}"}))).unwrap_err();
        assert!(matches!(err, InterpolationError::EscapesRoot { .. }));
    }

    #[test]
    fn test_empty_expression() {
        let err = resolve(&v(json!({"a": "${}"}))).unwrap_err();
        assert!(matches!(err, InterpolationError::Empty { .. }));
    }

    #[test]
    fn test_plain_strings_untouched() {
        let value = v(json!({"a": "no refs", "b": "dangling ${", "c": 1.5}));
        assert_eq!(resolve(&value).unwrap(), value);
    }

    #[test]
    fn test_resolves_inside_records() {
        let record = Value::Record(Record::new(
            "Conf",
            [("x", Value::Int(4)), ("y", Value::Reference("${.x}".to_string()))],
        ));
        let resolved = resolve(&record).unwrap();
        assert_eq!(resolved.get("y"), Some(&Value::Int(4)));
        assert_eq!(resolved.shape(), Shape::Record);
    }
}
