use serde_json::Value;

/// Shape of one entry of a `layers`, `tagRenderings`, or `filter` array.
///
/// The corpus schema is duck-typed: every entry can be a plain id string, a
/// `builtin` reuse wrapper, or an inline definition. The shape is decided
/// here, once per entry, so the scanner itself stays free of nested
/// type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryShape<'a> {
    /// `"bicycle_rental"`: a reference by id.
    Name(&'a str),
    /// `{ "builtin": "name", ... }`: a single reuse, possibly with an
    /// `override` patch.
    BuiltinOne(&'a str),
    /// `{ "builtin": ["a", "b"], ... }`: one reuse per element.
    BuiltinMany(&'a [Value]),
    /// A plain object: an inline definition.
    Inline(&'a serde_json::Map<String, Value>),
    /// Anything else; skipped with a diagnostic.
    Malformed,
}

impl<'a> EntryShape<'a> {
    #[must_use]
    pub fn classify(entry: &'a Value) -> Self {
        match entry {
            Value::String(name) => Self::Name(name),
            Value::Object(map) => match map.get("builtin") {
                Some(Value::String(name)) => Self::BuiltinOne(name),
                Some(Value::Array(names)) => Self::BuiltinMany(names),
                Some(_) => Self::Malformed,
                None => Self::Inline(map),
            },
            _ => Self::Malformed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_every_entry_shape() {
        let name = json!("bicycle_rental");
        assert_eq!(EntryShape::classify(&name), EntryShape::Name("bicycle_rental"));

        let one = json!({ "builtin": "name", "override": {} });
        assert_eq!(EntryShape::classify(&one), EntryShape::BuiltinOne("name"));

        let many = json!({ "builtin": ["a", "b"] });
        assert!(matches!(
            EntryShape::classify(&many),
            EntryShape::BuiltinMany(names) if names.len() == 2
        ));

        let inline = json!({ "id": "name", "question": "What name?" });
        assert!(matches!(EntryShape::classify(&inline), EntryShape::Inline(_)));

        for bad in [json!(7), json!(null), json!({ "builtin": 3 })] {
            assert_eq!(EntryShape::classify(&bad), EntryShape::Malformed);
        }
    }
}
