//! Locations inside a value tree.

use std::fmt;

/// One step from a container to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Mapping key or record field name.
    Key(String),
    /// Position in a fixed or variable sequence.
    Index(usize),
}

/// Location of a node relative to the root of a value tree.
///
/// Displays as `a.b[2].c`; the root itself displays as `<root>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<Segment>,
}

impl KeyPath {
    /// The empty path addressing the root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Child path through a mapping key or record field.
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.segments.push(Segment::Key(key.into()));
        child
    }

    /// Child path through a sequence position.
    pub fn index(&self, index: usize) -> Self {
        let mut child = self.clone();
        child.segments.push(Segment::Index(index));
        child
    }

    /// The first `len` segments of this path.
    pub fn truncated(&self, len: usize) -> Self {
        Self {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl FromIterator<Segment> for KeyPath {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "<root>");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{}", key)?,
                Segment::Key(key) => write!(f, ".{}", key)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}
