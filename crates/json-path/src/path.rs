use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One step of a structural JSON path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object member, addressed by key.
    Key(String),
    /// Array element, addressed by index.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// A structural address inside a JSON document.
///
/// The dotted display form is the canonical notation used throughout the
/// index: `layers.0.builtin.1` addresses the second element of the `builtin`
/// array inside the first element of `layers`. A purely numeric segment is
/// always an array index; corpus ids never consist of digits only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JsonPath {
    segments: Vec<PathSegment>,
}

impl JsonPath {
    /// The empty path, addressing the document root.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parse the dotted notation. The empty string is the root path.
    #[must_use]
    pub fn parse(dotted: &str) -> Self {
        if dotted.is_empty() {
            return Self::root();
        }
        let segments = dotted
            .split('.')
            .map(|part| match part.parse::<usize>() {
                Ok(index) => PathSegment::Index(index),
                Err(_) => PathSegment::Key(part.to_string()),
            })
            .collect();
        Self { segments }
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    /// Extend with an object key, returning the new path.
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.segments.push(PathSegment::Key(key.into()));
        child
    }

    /// Extend with an array index, returning the new path.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut child = self.clone();
        child.segments.push(PathSegment::Index(index));
        child
    }

    /// Concatenate `suffix` onto this path.
    #[must_use]
    pub fn join(&self, suffix: &Self) -> Self {
        let mut joined = self.clone();
        joined.segments.extend(suffix.segments.iter().cloned());
        joined
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl From<&str> for JsonPath {
    fn from(dotted: &str) -> Self {
        Self::parse(dotted)
    }
}

// Persisted snapshots store paths in the dotted notation.
impl Serialize for JsonPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JsonPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let dotted = String::deserialize(deserializer)?;
        if dotted.contains("..") || dotted.ends_with('.') {
            return Err(D::Error::custom(format!("malformed json path: {dotted}")));
        }
        Ok(Self::parse(&dotted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_and_display_round_trip() {
        for dotted in ["", "layers", "layers.0.builtin.1", "tagRenderings.12.id"] {
            assert_eq!(JsonPath::parse(dotted).to_string(), dotted);
        }
    }

    #[test]
    fn numeric_segments_become_indices() {
        let path = JsonPath::parse("layers.3");
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("layers".to_string()),
                PathSegment::Index(3)
            ]
        );
    }

    #[test]
    fn builders_extend_without_mutating() {
        let base = JsonPath::parse("layers");
        let child = base.index(0).key("builtin");
        assert_eq!(base.to_string(), "layers");
        assert_eq!(child.to_string(), "layers.0.builtin");
    }

    #[test]
    fn join_concatenates() {
        let prefix = JsonPath::parse("layers.2");
        let suffix = JsonPath::parse("tagRenderings.0");
        assert_eq!(prefix.join(&suffix).to_string(), "layers.2.tagRenderings.0");
    }

    #[test]
    fn serde_uses_dotted_form() {
        let path = JsonPath::parse("layers.0.builtin");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"layers.0.builtin\"");
        let back: JsonPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
