//! Layered configuration loading
//!
//! Builds one resolved configuration from, lowest priority first:
//! 1. Record schema defaults (declared in code)
//! 2. Default text (YAML)
//! 3. Extension file (named by `path_extend_conf=<file>` on the command line)
//! 4. Command-line `key.path=value` overrides
//!
//! Layers are combined with the structural merge engine, then `${...}`
//! references are resolved and the result is validated against the schema.

mod defaults;
mod effective;
mod error;
mod interpolate;
mod loader;
mod materialize;
mod merge;
mod schema;

pub use defaults::{default_of, default_record, DefaultFactory};
pub use effective::{ConfigOrigin, ConfigSource, EffectiveConfig, SCHEMA_ID, SCHEMA_VERSION};
pub use error::ConfigError;
pub use interpolate::{resolve, InterpolationError};
pub use loader::{parse_file, parse_overrides, parse_yaml, ConfigLoader, EXTENSION_KEY};
pub use materialize::{materialize, materialize_schemaless, validate, ValidationError, Violation};
pub use merge::{fold_layers, Folded, Layer};
pub use schema::{FieldDecl, FieldKind, RecordSchema};
