//! Configen - layered, type-checked configuration
//!
//! Configuration is assembled from record schema defaults, default YAML text,
//! an optional extension file and command-line `key.path=value` overrides.
//! Layers are combined by the structural merge engine in `configen-merge`,
//! `${...}` references are resolved, and the result is validated and
//! deserialized into the caller's type.

pub mod config;

pub use config::{
    default_of, default_record, ConfigError, ConfigLoader, ConfigOrigin, DefaultFactory, EffectiveConfig,
    FieldKind, RecordSchema,
};
pub use configen_merge::{
    merge, merge_layers, merge_with_warnings, ErrorKind, KeyPath, Mapping, MergeError, MergeWarning, Merger,
    Record, Shape, Value, MISSING,
};
