//! Record shape declarations

use configen_merge::{Record, Value};
use std::fmt;
use std::sync::Arc;

use super::defaults::DefaultFactory;

/// Declared type of a record field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Accepts any value.
    Any,
    Bool,
    Int,
    /// Accepts integers as well.
    Float,
    Str,
    /// Fixed-arity sequence with one kind per position.
    Tuple(Vec<FieldKind>),
    List(Box<FieldKind>),
    /// Free-form mapping with values of one kind.
    Map(Box<FieldKind>),
    Record(Arc<RecordSchema>),
}

impl FieldKind {
    pub fn list(inner: FieldKind) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn map(inner: FieldKind) -> Self {
        Self::Map(Box::new(inner))
    }

    pub fn record(schema: RecordSchema) -> Self {
        Self::Record(Arc::new(schema))
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Str => write!(f, "str"),
            Self::Tuple(kinds) => {
                write!(f, "tuple(")?;
                for (i, kind) in kinds.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", kind)?;
                }
                write!(f, ")")
            }
            Self::List(inner) => write!(f, "list[{}]", inner),
            Self::Map(inner) => write!(f, "map[{}]", inner),
            Self::Record(schema) => write!(f, "record {}", schema.name()),
        }
    }
}

/// One declared field.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub kind: FieldKind,
    /// Whether `null` is an acceptable final value.
    pub optional: bool,
    pub default: Option<DefaultFactory>,
}

impl FieldDecl {
    /// Value a fresh record starts with.
    ///
    /// Without a default: optional fields start as null, nested records are
    /// instantiated from their own schema, everything else is `???`.
    pub fn initial_value(&self) -> Value {
        if let Some(factory) = &self.default {
            return factory.produce();
        }
        if self.optional {
            return Value::Null;
        }
        match &self.kind {
            FieldKind::Record(schema) => schema.instantiate(),
            _ => Value::Missing,
        }
    }
}

/// A named, closed set of field declarations.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    name: String,
    fields: Vec<FieldDecl>,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Required field with no default.
    pub fn field(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.declare(FieldDecl {
            name: name.into(),
            kind,
            optional: false,
            default: None,
        })
    }

    pub fn field_with_default(self, name: impl Into<String>, kind: FieldKind, default: DefaultFactory) -> Self {
        self.declare(FieldDecl {
            name: name.into(),
            kind,
            optional: false,
            default: Some(default),
        })
    }

    /// Field that may stay null.
    pub fn optional_field(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.declare(FieldDecl {
            name: name.into(),
            kind,
            optional: true,
            default: None,
        })
    }

    /// Add a declaration, replacing an earlier one of the same name in place.
    pub fn declare(mut self, decl: FieldDecl) -> Self {
        match self.fields.iter_mut().find(|existing| existing.name == decl.name) {
            Some(existing) => *existing = decl,
            None => self.fields.push(decl),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn field_decl(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|decl| decl.name == name)
    }

    /// Build a fresh record, calling every default factory anew.
    pub fn instantiate(&self) -> Value {
        Value::Record(Record::new(
            self.name.clone(),
            self.fields.iter().map(|decl| (decl.name.clone(), decl.initial_value())),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::default_of;

    fn child_schema() -> RecordSchema {
        RecordSchema::new("ChildConf")
            .field("confc1", FieldKind::Str)
            .field_with_default("confc2", FieldKind::Int, default_of("${..conf2}"))
    }

    #[test]
    fn test_instantiate_fills_defaults_and_missing() {
        let schema = RecordSchema::new("GlobalConf")
            .field("conf1", FieldKind::Str)
            .field_with_default("conf2", FieldKind::Int, default_of(3))
            .optional_field("note", FieldKind::Str)
            .field("conf3", FieldKind::record(child_schema()));

        let value = schema.instantiate();

        assert_eq!(value.get("conf1"), Some(&Value::Missing));
        assert_eq!(value.get("conf2"), Some(&Value::Int(3)));
        assert_eq!(value.get("note"), Some(&Value::Null));
        let conf3 = value.get("conf3").unwrap();
        assert_eq!(conf3.get("confc1"), Some(&Value::Missing));
        assert_eq!(conf3.get("confc2"), Some(&Value::Reference("${..conf2}".to_string())));
    }

    #[test]
    fn test_field_order_is_declaration_order() {
        let schema = RecordSchema::new("Ordered")
            .field("z", FieldKind::Int)
            .field("a", FieldKind::Int)
            .field("m", FieldKind::Int);
        let Value::Record(record) = schema.instantiate() else {
            panic!("expected a record");
        };
        let names: Vec<&str> = record.field_names().collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_redeclare_replaces_in_place() {
        let schema = RecordSchema::new("S")
            .field("a", FieldKind::Int)
            .field("b", FieldKind::Int)
            .field_with_default("a", FieldKind::Int, default_of(7));
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(schema.fields()[0].name, "a");
        assert_eq!(schema.instantiate().get("a"), Some(&Value::Int(7)));
    }

    #[test]
    fn test_kind_display() {
        let kind = FieldKind::Tuple(vec![FieldKind::Int, FieldKind::list(FieldKind::Str)]);
        assert_eq!(kind.to_string(), "tuple(int, list[str])");
        assert_eq!(FieldKind::record(child_schema()).to_string(), "record ChildConf");
    }
}
