//! Layer loading: default text, extension file and command-line overrides

use configen_merge::{Mapping, Merger, Value};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::effective::{ConfigOrigin, ConfigSource, EffectiveConfig};
use super::error::ConfigError;
use super::interpolate::resolve;
use super::materialize::{materialize, materialize_schemaless};
use super::merge::{fold_layers, Layer};
use super::schema::RecordSchema;

/// Override key naming the extension file, e.g. `path_extend_conf=site.yaml`.
pub const EXTENSION_KEY: &str = "path_extend_conf";

#[derive(Debug, Clone)]
enum DefaultSource {
    Text(String),
    File(PathBuf),
}

/// Loads a configuration from its layers.
///
/// Precedence, highest last: schema defaults, default text, extension file,
/// command-line overrides.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    defaults: DefaultSource,
    schema: Option<Arc<RecordSchema>>,
    extension_key: String,
    extension_file: Option<PathBuf>,
}

impl ConfigLoader {
    /// Loader whose default layer is YAML `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_defaults(DefaultSource::Text(text.into()))
    }

    /// Loader whose default layer is read from `path` at load time.
    pub fn from_default_file(path: impl Into<PathBuf>) -> Self {
        Self::with_defaults(DefaultSource::File(path.into()))
    }

    fn with_defaults(defaults: DefaultSource) -> Self {
        Self {
            defaults,
            schema: None,
            extension_key: EXTENSION_KEY.to_string(),
            extension_file: None,
        }
    }

    /// Merge layers onto a fresh instance of `schema` and validate against it.
    pub fn with_schema(mut self, schema: RecordSchema) -> Self {
        self.schema = Some(Arc::new(schema));
        self
    }

    pub fn with_extension_key(mut self, key: impl Into<String>) -> Self {
        self.extension_key = key.into();
        self
    }

    /// Extension file used when the overrides do not name one.
    pub fn with_extension_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.extension_file = Some(path.into());
        self
    }

    pub fn schema(&self) -> Option<&RecordSchema> {
        self.schema.as_deref()
    }

    /// Parse every layer, lowest priority first.
    pub fn layers<I, S>(&self, args: I) -> Result<Vec<Layer>, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let default_layer = match &self.defaults {
            DefaultSource::Text(text) => Layer::inline(ConfigOrigin::Default, parse_yaml(text, "default config")?),
            DefaultSource::File(path) => parse_file(path, ConfigOrigin::Default)?,
        };

        let mut cli = parse_overrides(args)?;
        let named_extension = take_extension_path(&mut cli, &self.extension_key)?;

        let mut layers = vec![default_layer];
        if let Some(path) = named_extension.or_else(|| self.extension_file.clone()) {
            layers.push(parse_file(&path, ConfigOrigin::Extension)?);
        }
        layers.push(Layer::inline(ConfigOrigin::Cli, cli));
        Ok(layers)
    }

    /// Merge and resolve all layers.
    pub fn load<I, S>(&self, args: I) -> Result<EffectiveConfig, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let layers = self.layers(args)?;
        let folded = fold_layers(&layers)?;
        let mut warnings: Vec<String> = folded.warnings.iter().map(ToString::to_string).collect();
        let mut sources: Vec<ConfigSource> = layers.into_iter().map(|layer| layer.source).collect();

        let merged = match &self.schema {
            Some(schema) => {
                let mut merger = Merger::new();
                let merged = merger
                    .merge(&schema.instantiate(), &folded.value)
                    .map_err(|source| ConfigError::merge(ConfigOrigin::Schema, source))?;
                warnings.extend(merger.take_warnings().iter().map(ToString::to_string));
                sources.insert(0, ConfigSource::inline(ConfigOrigin::Schema));
                merged
            }
            None => folded.value,
        };

        let resolved = resolve(&merged)?;
        Ok(EffectiveConfig::new(resolved, sources, warnings))
    }

    /// Merge, resolve, validate and deserialize into `T`.
    pub fn load_typed<T, I, S>(&self, args: I) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let effective = self.load(args)?;
        match &self.schema {
            Some(schema) => materialize(schema, &effective.config),
            None => materialize_schemaless(&effective.config),
        }
    }

    /// [`load_typed`](Self::load_typed) with this process's arguments.
    pub fn load_from_env<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        self.load_typed(std::env::args().skip(1))
    }
}

/// Parse YAML text. Empty documents are an empty mapping.
pub fn parse_yaml(text: &str, what: &str) -> Result<Value, ConfigError> {
    if text.trim().is_empty() {
        return Ok(Value::Map(Mapping::new()));
    }
    let value: Value = serde_yaml::from_str(text)
        .map_err(|e| ConfigError::ParseError(format!("YAML parse error in {}: {}", what, e)))?;
    Ok(match value {
        Value::Null => Value::Map(Mapping::new()),
        other => other,
    })
}

/// Read and parse a layer file, recording its SHA-256 digest.
///
/// The format follows the extension: `.yaml`/`.yml`, `.toml` or `.json`.
pub fn parse_file(path: &Path, origin: ConfigOrigin) -> Result<Layer, ConfigError> {
    let bytes = fs::read(path)
        .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = String::from_utf8(bytes)
        .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8 in {}: {}", path.display(), e)))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let value = match ext.as_str() {
        "yaml" | "yml" => parse_yaml(&contents, &path.display().to_string())?,
        "toml" => {
            let toml_value: toml::Value = toml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(format!("TOML parse error in {}: {}", path.display(), e)))?;
            toml_to_value(toml_value)
        }
        "json" => serde_json::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("JSON parse error in {}: {}", path.display(), e)))?,
        other => {
            return Err(ConfigError::ParseError(format!(
                "Unsupported config extension '.{}' for file {}",
                other,
                path.display()
            )))
        }
    };

    debug!(path = %path.display(), origin = %origin, digest = %digest, "loaded configuration file");
    Ok(Layer::new(value, ConfigSource::file(origin, path, digest)))
}

/// Convert TOML Value to a configuration value
fn toml_to_value(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::string(s),
        toml::Value::Integer(i) => Value::Int(i),
        toml::Value::Float(f) => Value::Float(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::Str(dt.to_string()),
        toml::Value::Array(arr) => Value::List(arr.into_iter().map(toml_to_value).collect()),
        toml::Value::Table(table) => {
            Value::Map(table.into_iter().map(|(k, v)| (k, toml_to_value(v))).collect())
        }
    }
}

/// Parse `a.b.c=value` overrides into one nested mapping.
///
/// Values are read as YAML, so `3` is an integer, `[1, 2]` a list, `???`
/// missing and `${x}` a reference; text that is not valid YAML stays a
/// string. Later overrides win: a repeated path is replaced outright, and a
/// deeper path replaces any non-mapping value on its way.
pub fn parse_overrides<I, S>(args: I) -> Result<Value, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut overrides = Value::Map(Mapping::new());

    for arg in args {
        let arg = arg.as_ref();
        let (key, raw) = arg.split_once('=').ok_or_else(|| {
            ConfigError::ParseError(format!("override `{}` is not of the form key=value", arg))
        })?;
        let key = key.trim();
        if key.is_empty() || key.split('.').any(str::is_empty) {
            return Err(ConfigError::ParseError(format!("override `{}` has an empty key", arg)));
        }

        let parts: Vec<&str> = key.split('.').collect();
        set_path(&mut overrides, &parts, parse_override_value(raw));
    }

    Ok(overrides)
}

fn set_path(target: &mut Value, path: &[&str], leaf: Value) {
    let Some((head, rest)) = path.split_first() else {
        *target = leaf;
        return;
    };
    if !matches!(target, Value::Map(_)) {
        *target = Value::Map(Mapping::new());
    }
    if let Value::Map(map) = target {
        let slot = map.entry(head.to_string()).or_insert(Value::Null);
        set_path(slot, rest, leaf);
    }
}

fn parse_override_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Str(String::new());
    }
    serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::string(raw))
}

/// Remove the extension key from the cli layer, returning the path it names.
fn take_extension_path(cli: &mut Value, key: &str) -> Result<Option<PathBuf>, ConfigError> {
    let Value::Map(map) = cli else {
        return Ok(None);
    };
    match map.shift_remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Str(path)) => Ok(Some(PathBuf::from(path))),
        Some(other) => Err(ConfigError::ParseError(format!(
            "`{}` must name a file, got {}",
            key, other
        ))),
    }
}
