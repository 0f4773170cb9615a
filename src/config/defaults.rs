//! Default-value factories for record field declarations
//!
//! A field default is a factory rather than a shared instance: every record
//! instantiation calls it again and receives its own copy, so no two records
//! ever share a default list, mapping or nested record.

use configen_merge::Value;
use std::fmt;
use std::sync::Arc;

use super::schema::RecordSchema;

/// Produces a fresh default value on every call.
#[derive(Clone)]
pub struct DefaultFactory(Arc<dyn Fn() -> Value + Send + Sync>);

impl DefaultFactory {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn produce(&self) -> Value {
        (self.0)()
    }
}

impl fmt::Debug for DefaultFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultFactory(..)")
    }
}

/// Default that hands out a copy of `template` each time.
pub fn default_of(template: impl Into<Value>) -> DefaultFactory {
    let template = template.into();
    DefaultFactory::from_fn(move || template.clone())
}

/// Default that instantiates `schema` anew each time.
pub fn default_record(schema: Arc<RecordSchema>) -> DefaultFactory {
    DefaultFactory::from_fn(move || schema.instantiate())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::FieldKind;
    use configen_merge::{merge, Record};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn child_schema() -> Arc<RecordSchema> {
        Arc::new(RecordSchema::new("Child").field_with_default("attr", FieldKind::Int, default_of(0)))
    }

    #[test]
    fn test_factory_runs_per_instantiation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let schema = RecordSchema::new("Counted").field_with_default(
            "n",
            FieldKind::Int,
            DefaultFactory::from_fn(move || {
                Value::Int(counter.fetch_add(1, Ordering::SeqCst) as i64)
            }),
        );

        let first = schema.instantiate();
        let second = schema.instantiate();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(first.get("n"), Some(&Value::Int(0)));
        assert_eq!(second.get("n"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_default_instance_not_shared() {
        let child = child_schema();
        let good = RecordSchema::new("Good").field_with_default(
            "child",
            FieldKind::Record(Arc::clone(&child)),
            default_of(Record::new("Child", [("attr", Value::Int(1))])),
        );

        let good_attr_1 = good.instantiate();
        let good_attr_2 = merge(&good.instantiate(), &Value::from(json!({"child": {"attr": 2}}))).unwrap();

        assert_eq!(good_attr_1.get("child").and_then(|c| c.get("attr")), Some(&Value::Int(1)));
        assert_eq!(good_attr_2.get("child").and_then(|c| c.get("attr")), Some(&Value::Int(2)));
    }

    #[test]
    fn test_default_list() {
        let child = child_schema();
        let good = RecordSchema::new("Good").field_with_default(
            "child",
            FieldKind::list(FieldKind::Record(Arc::clone(&child))),
            default_of(vec![
                child.instantiate(),
                Value::Record(Record::new("Child", [("attr", Value::Int(1))])),
            ]),
        );

        let good_attr_1 = good.instantiate();
        let good_attr_2 = merge(&good.instantiate(), &Value::from(json!({"child": [{}, {"attr": 2}]}))).unwrap();

        let attrs = |value: &Value| -> Vec<i64> {
            match value.get("child") {
                Some(Value::List(items)) => items
                    .iter()
                    .filter_map(|item| item.get("attr").and_then(Value::as_i64))
                    .collect(),
                _ => Vec::new(),
            }
        };
        assert_eq!(attrs(&good_attr_1), vec![0, 1]);
        assert_eq!(attrs(&good_attr_2), vec![0, 2]);
    }

    #[test]
    fn test_default_record_factory() {
        let factory = default_record(child_schema());
        assert_eq!(
            factory.produce(),
            Value::Record(Record::new("Child", [("attr", Value::Int(0))]))
        );
    }
}
