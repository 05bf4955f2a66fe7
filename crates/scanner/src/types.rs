use atlas_json_path::{JsonPath, Range};
use serde::{Deserialize, Serialize};

/// Kind of a definition or reference record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordKind {
    Layer,
    TagRendering,
    Filter,
}

impl RecordKind {
    /// Human-readable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Layer => "layer",
            Self::TagRendering => "tagRendering",
            Self::Filter => "filter",
        }
    }

    /// Name of the layer-document array that holds members of this kind.
    /// Layers themselves are whole documents, not members.
    #[must_use]
    pub const fn member_field(self) -> Option<&'static str> {
        match self {
            Self::Layer => None,
            Self::TagRendering => Some("tagRenderings"),
            Self::Filter => Some("filter"),
        }
    }
}

/// Canonical qualified-id builders.
///
/// A qualified id is a dotted address of a logical corpus location. Ids are
/// not globally unique: two layers may both define a `name` tagRendering, so
/// lookups by qualified id always return sets.
pub mod qualify {
    use super::RecordKind;

    #[must_use]
    pub fn theme(id: &str) -> String {
        format!("themes.{id}")
    }

    #[must_use]
    pub fn layer(id: &str) -> String {
        format!("layers.{id}")
    }

    /// Address of a tagRendering or filter member inside a layer document.
    /// For the layer kind the member id is the layer itself.
    #[must_use]
    pub fn member(layer_id: &str, kind: RecordKind, member_id: &str) -> String {
        match kind.member_field() {
            Some(field) => format!("layers.{layer_id}.{field}.{member_id}"),
            None => layer(member_id),
        }
    }

    /// Address of a layer defined inline in a theme's `layers` array.
    #[must_use]
    pub fn inline_layer(theme_id: &str, index: usize) -> String {
        format!("themes.{theme_id}.layers.{index}")
    }
}

/// A (document, path, range) triple locating a reference endpoint in source
/// text. `doc` is the corpus-relative path with forward slashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub doc: String,
    pub path: JsonPath,
    pub range: Range,
}

impl Anchor {
    #[must_use]
    pub const fn new(doc: String, path: JsonPath, range: Range) -> Self {
        Self { doc, path, range }
    }
}

/// A concrete, reusable definition extracted from a document.
///
/// Entities exist only for non-inline, non-reference occurrences: an inline
/// layer embedded in a theme contributes references but never entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub qualified_id: String,
    pub doc: String,
    pub path: JsonPath,
    pub kind: RecordKind,
}

/// The use-site side of a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSite {
    /// Qualified id of the containing document or inline layer.
    pub qualified_id: String,
    pub anchor: Anchor,
}

/// The definition-site side of a reference.
///
/// `anchor` is `None` for unresolved references. Unresolved is a valid,
/// permanent state kept for diagnostics until the referencing file itself is
/// rescanned or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceTarget {
    pub qualified_id: String,
    pub anchor: Option<Anchor>,
}

/// A directed edge from a use site to a definition site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub kind: RecordKind,
    pub from: ReferenceSite,
    pub to: ReferenceTarget,
    /// Whether the token sat under a `builtin` key (carried for provenance).
    #[serde(default)]
    pub via_builtin: bool,
}

impl Reference {
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.to.anchor.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn qualified_id_forms() {
        assert_eq!(qualify::theme("cyclofix"), "themes.cyclofix");
        assert_eq!(qualify::layer("bicycle_rental"), "layers.bicycle_rental");
        assert_eq!(
            qualify::member("questions", RecordKind::TagRendering, "name"),
            "layers.questions.tagRenderings.name"
        );
        assert_eq!(
            qualify::member("filters", RecordKind::Filter, "open_now"),
            "layers.filters.filter.open_now"
        );
        assert_eq!(qualify::inline_layer("cyclofix", 2), "themes.cyclofix.layers.2");
    }

    #[test]
    fn member_fields() {
        assert_eq!(RecordKind::Layer.member_field(), None);
        assert_eq!(RecordKind::TagRendering.member_field(), Some("tagRenderings"));
        assert_eq!(RecordKind::Filter.member_field(), Some("filter"));
    }
}
