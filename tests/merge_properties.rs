//! Merge engine properties checked through the public API over a set of
//! representative values.

use configen::{merge, merge_layers, merge_with_warnings, ErrorKind, Mapping, Record, Value};
use serde_json::json;

fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

fn record(attr1: i64, attr2: &str) -> Value {
    Value::Record(Record::new(
        "Attrs",
        [("attr1", Value::Int(attr1)), ("attr2", Value::from(attr2))],
    ))
}

/// Non-null values without references, covering every shape.
fn samples() -> Vec<Value> {
    vec![
        Value::Bool(true),
        Value::Int(7),
        Value::Float(2.5),
        Value::from("text"),
        Value::Tuple(vec![Value::Int(1), Value::from("a")]),
        Value::List(vec![]),
        Value::List(vec![Value::Int(1), Value::Int(2)]),
        v(json!({"a": 1, "b": {"c": [1, 2], "d": null}})),
        Value::Map(Mapping::new()),
        record(1, "one"),
    ]
}

#[test]
fn test_self_merge_is_identity() {
    for sample in samples() {
        assert_eq!(merge(&sample, &sample).unwrap(), sample, "{}", sample);
    }
}

#[test]
fn test_null_absorbs_on_both_sides() {
    for sample in samples() {
        assert_eq!(merge(&Value::Null, &sample).unwrap(), sample, "{}", sample);
        assert_eq!(merge(&sample, &Value::Null).unwrap(), sample, "{}", sample);
    }
}

#[test]
fn test_missing_base_takes_any_overlay() {
    let reference = Value::from("${a.b}");
    assert!(reference.is_reference());
    for sample in samples().into_iter().chain([reference, Value::Null, Value::Missing]) {
        assert_eq!(merge(&Value::Missing, &sample).unwrap(), sample, "{}", sample);
    }
}

#[test]
fn test_reference_precedence_is_asymmetric() {
    let reference = Value::from("${x}");
    for sample in samples() {
        assert_eq!(merge(&sample, &reference).unwrap(), reference, "{}", sample);
        let err = merge(&reference, &sample).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReferenceOverride, "{}", sample);
    }
    assert!(merge(&reference, &reference).is_err());
}

#[test]
fn test_scalars_are_right_biased() {
    let scalars = [Value::Bool(false), Value::Int(1), Value::Float(0.5), Value::from("s")];
    for a in &scalars {
        for b in &scalars {
            assert_eq!(merge(a, b).unwrap(), *b, "{} <- {}", a, b);
        }
    }
}

#[test]
fn test_sequences() {
    let tuple = |items: &[i64]| Value::Tuple(items.iter().copied().map(Value::Int).collect());
    assert_eq!(merge(&tuple(&[1, 2, 3]), &tuple(&[4, 5, 6])).unwrap(), tuple(&[4, 5, 6]));
    assert_eq!(
        merge(&tuple(&[1, 2]), &tuple(&[1, 2, 3])).unwrap_err().kind(),
        ErrorKind::ArityMismatch
    );

    assert_eq!(merge(&v(json!([1])), &v(json!([4, 5, 6]))).unwrap(), v(json!([4, 5, 6])));

    let merged = merge_with_warnings(&v(json!([1, 2, 3])), &v(json!([4, 5]))).unwrap();
    assert_eq!(merged.value, v(json!([4, 5])));
    assert_eq!(merged.warnings.len(), 1);
}

#[test]
fn test_mapping_union() {
    let merged = merge(&v(json!({"a": 1, "b": {"x": 1}})), &v(json!({"b": {"x": 2}, "c": 3}))).unwrap();
    assert_eq!(merged, v(json!({"a": 1, "b": {"x": 2}, "c": 3})));
}

#[test]
fn test_record_takes_mapping_fields() {
    assert_eq!(merge(&record(1, "one"), &v(json!({"attr1": 2}))).unwrap(), record(2, "one"));
    assert_eq!(merge(&record(1, "one"), &record(3, "three")).unwrap(), record(3, "three"));
}

#[test]
fn test_illegal_pairings() {
    let tuple = Value::Tuple(vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(
        merge(&v(json!({"a": 1})), &tuple).unwrap_err().kind(),
        ErrorKind::HeterogeneousShape
    );
    assert_eq!(
        merge(&v(json!({"attr1": 1})), &record(1, "one")).unwrap_err().kind(),
        ErrorKind::HeterogeneousShape
    );
}

#[test]
fn test_layers_fold_in_priority_order() {
    let layers = [
        v(json!({"db": {"host": "localhost", "port": 5432}, "debug": false})),
        v(json!({"db": {"host": "db.internal"}})),
        v(json!({"debug": true})),
    ];
    let merged = merge_layers(layers.iter()).unwrap();
    assert_eq!(
        merged,
        v(json!({"db": {"host": "db.internal", "port": 5432}, "debug": true}))
    );
    // Earlier layers are left as they were.
    assert_eq!(layers[0].get("debug"), Some(&Value::Bool(false)));
}
