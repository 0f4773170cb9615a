//! Type-directed structural merge.
//!
//! Rules, checked in order (first match wins):
//! - reference base: error, a reference may never be overridden
//! - reference overlay: the overlay wins
//! - missing base: the overlay wins
//! - same shape: scalars reassign, fixed sequences merge element-wise,
//!   variable sequences expand a single-element template, merge element-wise
//!   or are replaced wholesale, mappings take the key union and merge
//!   conflicts, records of one declared shape merge field-wise
//! - one side null: the other side wins
//! - record base with mapping overlay: named fields merge, others carry through
//! - anything else: error

use tracing::warn;

use crate::error::{MergeError, MergeWarning};
use crate::path::KeyPath;
use crate::value::{Mapping, Record, Value};

/// Maximum nesting depth before a merge is aborted.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Result of a merge together with its non-fatal diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub value: Value,
    pub warnings: Vec<MergeWarning>,
}

/// Stateless apart from the warnings it has collected.
#[derive(Debug, Clone)]
pub struct Merger {
    max_depth: usize,
    warnings: Vec<MergeWarning>,
}

impl Default for Merger {
    fn default() -> Self {
        Self::new()
    }
}

impl Merger {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            warnings: Vec::new(),
        }
    }

    /// Warnings collected so far, across every merge made by this merger.
    pub fn warnings(&self) -> &[MergeWarning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<MergeWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Merge `another` (higher priority) onto `base`.
    ///
    /// Neither input is modified; the result owns fresh copies of everything
    /// it carries over.
    pub fn merge(&mut self, base: &Value, another: &Value) -> Result<Value, MergeError> {
        self.merge_at(base, another, &KeyPath::root())
    }

    fn merge_at(&mut self, base: &Value, another: &Value, path: &KeyPath) -> Result<Value, MergeError> {
        if path.len() > self.max_depth {
            return Err(MergeError::DepthExceeded {
                path: path.clone(),
                limit: self.max_depth,
            });
        }

        match (base, another) {
            (Value::Reference(reference), _) => Err(MergeError::ReferenceOverride {
                path: path.clone(),
                reference: reference.clone(),
                another: another.to_string(),
            }),
            (_, Value::Reference(_)) => Ok(another.clone()),
            (Value::Missing, _) => Ok(another.clone()),

            // Homogeneous
            (Value::Null, Value::Null) => Ok(Value::Null),
            (
                Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_),
                Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_),
            ) => Ok(another.clone()),
            (Value::Tuple(b), Value::Tuple(a)) => self.merge_tuple(b, a, path).map(Value::Tuple),
            (Value::List(b), Value::List(a)) => self.merge_list(b, a, path).map(Value::List),
            (Value::Map(b), Value::Map(a)) => self.merge_map(b, a, path).map(Value::Map),
            (Value::Record(b), Value::Record(a)) if b.has_same_shape(a) => {
                self.merge_record(b, a, path).map(Value::Record)
            }

            // Heterogeneous
            (Value::Null, other) | (other, Value::Null) => Ok(other.clone()),
            (Value::Record(b), Value::Map(a)) => self.merge_record_map(b, a, path).map(Value::Record),
            _ => Err(MergeError::HeterogeneousShape {
                path: path.clone(),
                base_shape: base.shape(),
                another_shape: another.shape(),
                base: base.to_string(),
                another: another.to_string(),
            }),
        }
    }

    fn merge_tuple(&mut self, base: &[Value], another: &[Value], path: &KeyPath) -> Result<Vec<Value>, MergeError> {
        if base.len() != another.len() {
            return Err(MergeError::TupleLengthMismatch {
                path: path.clone(),
                base_len: base.len(),
                another_len: another.len(),
            });
        }
        self.merge_pairwise(base, another, path)
    }

    fn merge_list(&mut self, base: &[Value], another: &[Value], path: &KeyPath) -> Result<Vec<Value>, MergeError> {
        // Template expansion
        if let [template] = base {
            return another
                .iter()
                .enumerate()
                .map(|(i, item)| self.merge_at(template, item, &path.index(i)))
                .collect();
        }

        if base.len() == another.len() {
            return self.merge_pairwise(base, another, path);
        }

        warn!(
            path = %path,
            base_len = base.len(),
            another_len = another.len(),
            "non-matched list lengths, whole list replaced"
        );
        self.warnings.push(MergeWarning::ListReplaced {
            path: path.clone(),
            base_len: base.len(),
            another_len: another.len(),
        });
        Ok(another.to_vec())
    }

    fn merge_pairwise(&mut self, base: &[Value], another: &[Value], path: &KeyPath) -> Result<Vec<Value>, MergeError> {
        base.iter()
            .zip(another)
            .enumerate()
            .map(|(i, (b, a))| self.merge_at(b, a, &path.index(i)))
            .collect()
    }

    fn merge_map(&mut self, base: &Mapping, another: &Mapping, path: &KeyPath) -> Result<Mapping, MergeError> {
        let mut merged = base.clone();
        for (key, value) in another {
            let entry = match base.get(key) {
                Some(existing) => self.merge_at(existing, value, &path.key(key))?,
                None => value.clone(),
            };
            merged.insert(key.clone(), entry);
        }
        Ok(merged)
    }

    fn merge_record(&mut self, base: &Record, another: &Record, path: &KeyPath) -> Result<Record, MergeError> {
        let mut fields = Vec::with_capacity(base.len());
        for ((name, b), (_, a)) in base.fields().zip(another.fields()) {
            fields.push((name, self.merge_at(b, a, &path.key(name))?));
        }
        Ok(Record::new(base.name(), fields))
    }

    fn merge_record_map(&mut self, base: &Record, another: &Mapping, path: &KeyPath) -> Result<Record, MergeError> {
        let mut merged = base.clone();
        for (key, value) in another {
            let slot = merged.field_mut(key).ok_or_else(|| MergeError::UnknownField {
                path: path.clone(),
                record: base.name().to_string(),
                field: key.clone(),
            })?;
            *slot = self.merge_at(slot, value, &path.key(key))?;
        }
        Ok(merged)
    }
}

/// Merge `another` onto `base`. Warnings are logged and discarded.
pub fn merge(base: &Value, another: &Value) -> Result<Value, MergeError> {
    Merger::new().merge(base, another)
}

/// Merge `another` onto `base`, returning the warnings alongside the value.
pub fn merge_with_warnings(base: &Value, another: &Value) -> Result<Merged, MergeError> {
    let mut merger = Merger::new();
    let value = merger.merge(base, another)?;
    Ok(Merged {
        value,
        warnings: merger.take_warnings(),
    })
}

/// Left fold of [`merge`] over layers ordered lowest to highest priority.
/// No layers yields [`Value::Null`].
pub fn merge_layers<'a, I>(layers: I) -> Result<Value, MergeError>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut merger = Merger::new();
    layers
        .into_iter()
        .try_fold(Value::Null, |acc, layer| merger.merge(&acc, layer))
}
