use crate::layout::CorpusLayout;
use crate::types::RecordKind;
use atlas_json_path::{locate, JsonPath, Range};
use regex::Regex;
use serde_json::Value;

/// A raw reference token as it appears in document text.
///
/// Three spellings exist: a bare id (`"name"`), a dotted id
/// (`"bicycle_rental.name"`, a layer prefix plus local id), and a wildcard
/// whose final segment contains `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceToken {
    pub raw: String,
    /// Explicit layer prefix of a dotted token.
    pub layer: Option<String>,
    /// Final segment: a local id or a wildcard pattern.
    pub local: String,
    pub wildcard: bool,
}

impl ReferenceToken {
    /// Split a token on its first dot. Local ids themselves never contain a
    /// layer prefix, so everything after the first dot is the local part.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let (layer, local) = match raw.split_once('.') {
            Some((prefix, rest)) => (Some(prefix.to_string()), rest.to_string()),
            None => (None, raw.to_string()),
        };
        Self {
            raw: raw.to_string(),
            wildcard: local.contains('*'),
            layer,
            local,
        }
    }

    /// Layer document to look the local id up in: the explicit prefix when
    /// present, the kind's shared pool otherwise.
    #[must_use]
    pub fn candidate_layer(&self, kind: RecordKind, layout: &CorpusLayout) -> Option<String> {
        if let Some(layer) = &self.layer {
            return Some(layer.clone());
        }
        layout.shared_pool(kind).map(ToString::to_string)
    }
}

/// A member of a candidate document matched by a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberMatch {
    pub member_id: String,
    pub path: JsonPath,
    pub range: Range,
}

/// Find every tagRendering/filter definition in `text` matched by `token`.
///
/// A plain token matches the member with the equal id (at most one per
/// position in the array). A wildcard token matches by id or, for
/// tagRenderings, by any entry of the member's `labels` list; each matched
/// member yields exactly one result even when both its id and a label match.
/// An unparsable candidate document yields no matches.
#[must_use]
pub fn find_members(text: &str, token: &ReferenceToken, kind: RecordKind) -> Vec<MemberMatch> {
    let Some(field) = kind.member_field() else {
        return Vec::new();
    };
    let Ok(doc) = serde_json::from_str::<Value>(text) else {
        return Vec::new();
    };
    let Some(members) = doc.get(field).and_then(Value::as_array) else {
        return Vec::new();
    };

    let pattern = token.wildcard.then(|| wildcard_regex(&token.local)).flatten();
    if token.wildcard && pattern.is_none() {
        log::debug!("unusable wildcard pattern: {}", token.raw);
        return Vec::new();
    }

    let mut matches = Vec::new();
    for (index, member) in members.iter().enumerate() {
        // Strings and builtin wrappers are the candidate's own references,
        // not definitions.
        let Some(object) = member.as_object() else {
            continue;
        };
        if object.contains_key("builtin") {
            continue;
        }
        let Some(id) = object.get("id").and_then(Value::as_str) else {
            continue;
        };

        let matched = match &pattern {
            Some(regex) => {
                regex.is_match(id) || (kind == RecordKind::TagRendering && label_match(object, regex))
            }
            None => id == token.local,
        };
        if !matched {
            continue;
        }

        let entry_path = JsonPath::root().key(field).index(index);
        let id_path = entry_path.key("id");
        let Some(range) = locate(text, &id_path).or_else(|| locate(text, &entry_path)) else {
            continue;
        };
        matches.push(MemberMatch {
            member_id: id.to_string(),
            path: entry_path,
            range,
        });
    }
    matches
}

fn wildcard_regex(pattern: &str) -> Option<Regex> {
    let escaped = regex::escape(pattern).replace("\\*", ".*");
    Regex::new(&format!("^{escaped}$")).ok()
}

fn label_match(member: &serde_json::Map<String, Value>, regex: &Regex) -> bool {
    member
        .get("labels")
        .and_then(Value::as_array)
        .is_some_and(|labels| {
            labels
                .iter()
                .filter_map(Value::as_str)
                .any(|label| regex.is_match(label))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::CorpusLayout;
    use pretty_assertions::assert_eq;

    const QUESTIONS: &str = r#"{
  "id": "questions",
  "tagRenderings": [
    { "id": "name", "question": "Name?" },
    { "id": "name_signed", "labels": ["signage"] },
    { "id": "operator", "labels": ["contact", "signage"] },
    "stray_reference",
    { "builtin": "elsewhere" }
  ]
}"#;

    #[test]
    fn token_spellings() {
        let bare = ReferenceToken::parse("name");
        assert_eq!(bare.layer, None);
        assert_eq!(bare.local, "name");
        assert!(!bare.wildcard);

        let dotted = ReferenceToken::parse("bicycle_rental.name");
        assert_eq!(dotted.layer.as_deref(), Some("bicycle_rental"));
        assert_eq!(dotted.local, "name");

        let wild = ReferenceToken::parse("questions.name_*");
        assert!(wild.wildcard);
        assert_eq!(wild.local, "name_*");
    }

    #[test]
    fn bare_tokens_fall_back_to_the_shared_pool() {
        let layout = CorpusLayout::new("/corpus");
        let token = ReferenceToken::parse("name");
        assert_eq!(
            token.candidate_layer(RecordKind::TagRendering, &layout),
            Some("questions".to_string())
        );
        assert_eq!(
            token.candidate_layer(RecordKind::Filter, &layout),
            Some("filters".to_string())
        );

        let dotted = ReferenceToken::parse("shop.name");
        assert_eq!(
            dotted.candidate_layer(RecordKind::TagRendering, &layout),
            Some("shop".to_string())
        );
    }

    #[test]
    fn plain_tokens_match_by_id_equality() {
        let token = ReferenceToken::parse("name");
        let matches = find_members(QUESTIONS, &token, RecordKind::TagRendering);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].member_id, "name");
        assert_eq!(matches[0].path.to_string(), "tagRenderings.0");
    }

    #[test]
    fn wildcards_fan_out_over_ids_and_labels() {
        let token = ReferenceToken::parse("name*");
        let matches = find_members(QUESTIONS, &token, RecordKind::TagRendering);
        let ids: Vec<_> = matches.iter().map(|m| m.member_id.as_str()).collect();
        assert_eq!(ids, ["name", "name_signed"]);

        let token = ReferenceToken::parse("*signage*");
        let matches = find_members(QUESTIONS, &token, RecordKind::TagRendering);
        let ids: Vec<_> = matches.iter().map(|m| m.member_id.as_str()).collect();
        assert_eq!(ids, ["name_signed", "operator"]);
    }

    #[test]
    fn id_and_label_match_yields_one_record() {
        // "name_signed" matches "*sign*" by id and by its "signage" label;
        // the member must still appear exactly once.
        let token = ReferenceToken::parse("*sign*");
        let matches = find_members(QUESTIONS, &token, RecordKind::TagRendering);
        let ids: Vec<_> = matches.iter().map(|m| m.member_id.as_str()).collect();
        assert_eq!(ids, ["name_signed", "operator"]);
    }

    #[test]
    fn misses_and_broken_candidates_yield_nothing() {
        let token = ReferenceToken::parse("nonexistent");
        assert!(find_members(QUESTIONS, &token, RecordKind::TagRendering).is_empty());
        assert!(find_members("not json {", &token, RecordKind::TagRendering).is_empty());
        assert!(find_members(QUESTIONS, &token, RecordKind::Filter).is_empty());
    }

    #[test]
    fn ranges_anchor_the_member_id_token() {
        let token = ReferenceToken::parse("name");
        let matches = find_members(QUESTIONS, &token, RecordKind::TagRendering);
        let range = matches[0].range;
        // Line 3: `    { "id": "name", "question": "Name?" },`
        assert_eq!(range.start.line, 3);
        assert_eq!(range.end.character - range.start.character, "name".len());
    }
}
