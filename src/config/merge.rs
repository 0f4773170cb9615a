//! Layer folding with provenance
//!
//! Layers are merged lowest priority first with the structural merge engine.
//! A failure names the layer that could not be merged.

use configen_merge::{MergeWarning, Merger, Value};
use tracing::debug;

use super::effective::{ConfigOrigin, ConfigSource};
use super::error::ConfigError;

/// One configuration source and its parsed value
#[derive(Debug, Clone)]
pub struct Layer {
    pub value: Value,
    pub source: ConfigSource,
}

impl Layer {
    pub fn new(value: Value, source: ConfigSource) -> Self {
        Self { value, source }
    }

    pub fn inline(origin: ConfigOrigin, value: Value) -> Self {
        Self::new(value, ConfigSource::inline(origin))
    }

    pub fn origin(&self) -> ConfigOrigin {
        self.source.origin
    }
}

/// Result of folding layers
#[derive(Debug, Clone)]
pub struct Folded {
    pub value: Value,
    pub warnings: Vec<MergeWarning>,
}

/// Merge layers in order (first is base, last has highest precedence)
pub fn fold_layers(layers: &[Layer]) -> Result<Folded, ConfigError> {
    let mut merger = Merger::new();
    let mut merged = Value::Null;
    for layer in layers {
        debug!(origin = %layer.origin(), path = ?layer.source.path, "merging configuration layer");
        merged = merger
            .merge(&merged, &layer.value)
            .map_err(|source| ConfigError::merge(layer.origin(), source))?;
    }
    Ok(Folded {
        value: merged,
        warnings: merger.take_warnings(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use configen_merge::ErrorKind;
    use serde_json::json;

    fn layer(origin: ConfigOrigin, json: serde_json::Value) -> Layer {
        Layer::inline(origin, Value::from(json))
    }

    #[test]
    fn test_scalar_override() {
        let folded = fold_layers(&[
            layer(ConfigOrigin::Default, json!({"timeout": 100})),
            layer(ConfigOrigin::Cli, json!({"timeout": 200})),
        ])
        .unwrap();
        assert_eq!(folded.value.get("timeout"), Some(&Value::Int(200)));
    }

    #[test]
    fn test_object_deep_merge() {
        let folded = fold_layers(&[
            layer(ConfigOrigin::Default, json!({"telemetry": {"logs": "off", "metrics": "off"}})),
            layer(ConfigOrigin::Cli, json!({"telemetry": {"logs": "on"}})),
        ])
        .unwrap();

        assert_eq!(
            folded.value,
            Value::from(json!({"telemetry": {"logs": "on", "metrics": "off"}}))
        );
    }

    #[test]
    fn test_list_replacement_warns() {
        let folded = fold_layers(&[
            layer(ConfigOrigin::Default, json!({"hosts": ["a1", "a2", "a3"]})),
            layer(ConfigOrigin::Cli, json!({"hosts": ["b1", "b2"]})),
        ])
        .unwrap();

        assert_eq!(folded.value, Value::from(json!({"hosts": ["b1", "b2"]})));
        assert_eq!(folded.warnings.len(), 1);
        assert_eq!(folded.warnings[0].path().to_string(), "hosts");
    }

    #[test]
    fn test_precedence_across_layers() {
        let folded = fold_layers(&[
            layer(ConfigOrigin::Default, json!({"timeout": 100, "telemetry": {"mode": "off"}})),
            layer(ConfigOrigin::Extension, json!({"timeout": 200, "telemetry": {"mode": "on"}})),
            layer(ConfigOrigin::Cli, json!({"timeout": 50})),
        ])
        .unwrap();

        assert_eq!(folded.value.get("timeout"), Some(&Value::Int(50)));
        assert_eq!(
            folded.value.get("telemetry").and_then(|c| c.get("mode")),
            Some(&Value::Str("on".to_string()))
        );
    }

    #[test]
    fn test_failure_names_layer() {
        let err = fold_layers(&[
            layer(ConfigOrigin::Default, json!({"level": {"a": 1}})),
            layer(ConfigOrigin::Extension, json!({"level": 5})),
        ])
        .unwrap_err();

        let ConfigError::Merge { origin, source } = &err else {
            panic!("expected a merge error, got {}", err);
        };
        assert_eq!(*origin, ConfigOrigin::Extension);
        assert_eq!(source.kind(), ErrorKind::HeterogeneousShape);
        assert!(err.to_string().starts_with("Merge error in extension layer"));
    }

    #[test]
    fn test_no_layers() {
        let folded = fold_layers(&[]).unwrap();
        assert_eq!(folded.value, Value::Null);
        assert!(folded.warnings.is_empty());
    }
}
