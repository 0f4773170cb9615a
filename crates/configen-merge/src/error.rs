//! Merge failures and diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::path::KeyPath;
use crate::value::Shape;

/// Stable classification of a [`MergeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The base value is a reference, which may never be overridden.
    ReferenceOverride,
    /// Fixed sequences of unequal length, or a mapping naming a field the
    /// record does not declare.
    ArityMismatch,
    /// A shape pair with no merge rule.
    HeterogeneousShape,
    /// The value tree is nested deeper than the merger allows.
    DepthExceeded,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReferenceOverride => write!(f, "REFERENCE_OVERRIDE"),
            Self::ArityMismatch => write!(f, "ARITY_MISMATCH"),
            Self::HeterogeneousShape => write!(f, "HETEROGENEOUS_SHAPE"),
            Self::DepthExceeded => write!(f, "DEPTH_EXCEEDED"),
        }
    }
}

/// A fatal merge failure. The whole merge is aborted; no partial result exists.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MergeError {
    #[error("overriding a reference is prohibited at {path}: {reference} cannot be replaced by {another}")]
    ReferenceOverride {
        path: KeyPath,
        reference: String,
        another: String,
    },

    #[error("fixed sequence merge at {path} is element-wise only, but base length {base_len} != another length {another_len}")]
    TupleLengthMismatch {
        path: KeyPath,
        base_len: usize,
        another_len: usize,
    },

    #[error("record {record} has no field `{field}` (merging mapping at {path})")]
    UnknownField {
        path: KeyPath,
        record: String,
        field: String,
    },

    #[error("heterogeneous merge at {path} is permitted only for null pairs and record-mapping, but got {base_shape}-{another_shape}; {base} - {another}")]
    HeterogeneousShape {
        path: KeyPath,
        base_shape: Shape,
        another_shape: Shape,
        base: String,
        another: String,
    },

    #[error("merge depth limit {limit} exceeded at {path}")]
    DepthExceeded { path: KeyPath, limit: usize },
}

impl MergeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ReferenceOverride { .. } => ErrorKind::ReferenceOverride,
            Self::TupleLengthMismatch { .. } | Self::UnknownField { .. } => ErrorKind::ArityMismatch,
            Self::HeterogeneousShape { .. } => ErrorKind::HeterogeneousShape,
            Self::DepthExceeded { .. } => ErrorKind::DepthExceeded,
        }
    }

    /// Where in the value tree the merge failed.
    pub fn path(&self) -> &KeyPath {
        match self {
            Self::ReferenceOverride { path, .. }
            | Self::TupleLengthMismatch { path, .. }
            | Self::UnknownField { path, .. }
            | Self::HeterogeneousShape { path, .. }
            | Self::DepthExceeded { path, .. } => path,
        }
    }
}

/// A non-fatal merge diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeWarning {
    /// Variable sequences of unequal length where the base is not a
    /// single-element template; the overlay replaced the base wholesale.
    ListReplaced {
        path: KeyPath,
        base_len: usize,
        another_len: usize,
    },
}

impl MergeWarning {
    pub fn path(&self) -> &KeyPath {
        match self {
            Self::ListReplaced { path, .. } => path,
        }
    }
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListReplaced {
                path,
                base_len,
                another_len,
            } => write!(
                f,
                "non-matched list lengths {} & {} at {}; whole list replaced",
                base_len, another_len, path
            ),
        }
    }
}
