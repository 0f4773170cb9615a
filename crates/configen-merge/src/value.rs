//! The closed value algebra the merge engine operates on.

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;

use crate::path::{KeyPath, Segment};

/// Literal text of the "not yet provided" sentinel.
pub const MISSING: &str = "???";

/// Insertion-ordered mapping with unique string keys.
pub type Mapping = IndexMap<String, Value>;

/// Tag of a [`Value`], which selects the merge rule that applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Null,
    Missing,
    Reference,
    Scalar,
    FixedSequence,
    VariableSequence,
    Mapping,
    Record,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Missing => write!(f, "missing"),
            Self::Reference => write!(f, "reference"),
            Self::Scalar => write!(f, "scalar"),
            Self::FixedSequence => write!(f, "fixed sequence"),
            Self::VariableSequence => write!(f, "variable sequence"),
            Self::Mapping => write!(f, "mapping"),
            Self::Record => write!(f, "record"),
        }
    }
}

/// A named value with a closed set of fields.
///
/// Unlike a [`Mapping`], the field set is fixed when the record is built;
/// merging never adds or removes fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    name: String,
    fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new<N, I, K>(name: N, fields: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Declared shape name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Same declared name and the same field names in the same order.
    pub fn has_same_shape(&self, other: &Record) -> bool {
        self.name == other.name && self.fields.keys().eq(other.fields.keys())
    }

    /// Mutable slot of a declared field. Records never gain fields.
    pub(crate) fn field_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.fields.get_mut(field)
    }
}

/// A configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    /// The `???` sentinel: no value supplied yet.
    Missing,
    /// A deferred `${...}` expression, resolved after merging.
    Reference(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Fixed-arity sequence; both merge operands must have the same length.
    Tuple(Vec<Value>),
    /// Variable-length sequence.
    List(Vec<Value>),
    Map(Mapping),
    Record(Record),
}

impl Value {
    /// Classify text: `???` is [`Value::Missing`], `${...}` is a
    /// [`Value::Reference`], anything else a plain string.
    pub fn string(text: impl Into<String>) -> Self {
        let text = text.into();
        if text == MISSING {
            Value::Missing
        } else if Self::is_reference_text(&text) {
            Value::Reference(text)
        } else {
            Value::Str(text)
        }
    }

    /// Whether `text` is bounded by `${` and `}`.
    pub fn is_reference_text(text: &str) -> bool {
        text.starts_with("${") && text.ends_with('}') && text.len() >= 3
    }

    pub fn shape(&self) -> Shape {
        match self {
            Value::Null => Shape::Null,
            Value::Missing => Shape::Missing,
            Value::Reference(_) => Shape::Reference,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_) => Shape::Scalar,
            Value::Tuple(_) => Shape::FixedSequence,
            Value::List(_) => Shape::VariableSequence,
            Value::Map(_) => Shape::Mapping,
            Value::Record(_) => Shape::Record,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Value::Reference(_))
    }

    pub fn is_scalar(&self) -> bool {
        self.shape() == Shape::Scalar
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, with integers widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Child of a mapping key or record field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            Value::Record(record) => record.get(key),
            _ => None,
        }
    }

    /// Walk `path` from this node. Numeric keys index into sequences.
    pub fn get_path(&self, path: &KeyPath) -> Option<&Value> {
        let mut current = self;
        for segment in path.segments() {
            current = match (segment, current) {
                (Segment::Key(key), Value::Map(_) | Value::Record(_)) => current.get(key)?,
                (Segment::Key(key), Value::Tuple(items) | Value::List(items)) => {
                    items.get(key.parse::<usize>().ok()?)?
                }
                (Segment::Index(index), Value::Tuple(items) | Value::List(items)) => {
                    items.get(*index)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Paths of every `???` sentinel below this node, in tree order.
    pub fn missing_paths(&self) -> Vec<KeyPath> {
        let mut found = Vec::new();
        collect_missing(self, KeyPath::root(), &mut found);
        found
    }

    /// Convert into a JSON value for typed deserialization.
    ///
    /// Tuples become arrays and records become objects. Non-finite floats
    /// have no JSON form and become null.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Missing => Json::String(MISSING.to_string()),
            Value::Reference(s) | Value::Str(s) => Json::String(s.clone()),
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Tuple(items) | Value::List(items) => {
                Json::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => Json::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Record(record) => Json::Object(
                record.fields().map(|(k, v)| (k.to_string(), v.to_json())).collect(),
            ),
        }
    }
}

fn collect_missing(value: &Value, at: KeyPath, found: &mut Vec<KeyPath>) {
    match value {
        Value::Missing => found.push(at),
        Value::Tuple(items) | Value::List(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_missing(item, at.index(i), found);
            }
        }
        Value::Map(map) => {
            for (key, item) in map {
                collect_missing(item, at.key(key), found);
            }
        }
        Value::Record(record) => {
            for (key, item) in record.fields() {
                collect_missing(item, at.key(key), found);
            }
        }
        _ => {}
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Value::Map(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            Json::String(s) => Value::string(s),
            Json::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Missing => write!(f, "{}", MISSING),
            Value::Reference(expr) => write!(f, "{}", expr),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Tuple(items) => {
                write!(f, "(")?;
                write_items(f, items)?;
                write!(f, ")")
            }
            Value::List(items) => {
                write!(f, "[")?;
                write_items(f, items)?;
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Record(record) => {
                write!(f, "{}(", record.name())?;
                for (i, (k, v)) in record.fields().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                write!(f, ")")
            }
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Missing => serializer.serialize_str(MISSING),
            Value::Reference(s) | Value::Str(s) => serializer.serialize_str(s),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Tuple(items) | Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Value::Record(record) => {
                let mut out = serializer.serialize_map(Some(record.len()))?;
                for (k, v) in record.fields() {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a configuration value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(i64::try_from(v)
            .map(Value::Int)
            .unwrap_or(Value::Float(v as f64)))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<Value, E> {
        Ok(i64::try_from(v)
            .map(Value::Int)
            .unwrap_or(Value::Float(v as f64)))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Value, E> {
        Ok(i64::try_from(v)
            .map(Value::Int)
            .unwrap_or(Value::Float(v as f64)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::string(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::string(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = Mapping::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}
