//! Structural merge engine for layered configuration.
//!
//! Combines two [`Value`] trees of matching or compatible shape into one.
//! Callers fold it over configuration layers ordered from lowest to highest
//! priority (defaults, extension file, command-line overrides). The engine
//! performs no I/O, parses no text and resolves no `${...}` expressions; it
//! only recognizes reference-shaped strings and refuses to override them.

mod error;
mod merge;
mod path;
mod value;

pub use error::{ErrorKind, MergeError, MergeWarning};
pub use merge::{merge, merge_layers, merge_with_warnings, Merged, Merger, DEFAULT_MAX_DEPTH};
pub use path::{KeyPath, Segment};
pub use value::{Mapping, Record, Shape, Value, MISSING};
