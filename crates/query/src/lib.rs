//! # Atlas Query
//!
//! Read-only queries over an [`IndexStore`]: completion candidates,
//! go-to-definition, and find-usages primitives for editor-integration
//! collaborators. The engine only ever reads the in-memory store, never the
//! persisted snapshot, so queries cannot race an in-progress rebuild.

use atlas_json_path::JsonPath;
use atlas_scanner::{Anchor, CorpusLayout, Entity, RecordKind, Reference};
use atlas_store::IndexStore;

/// An entity annotated with whether it belongs to its kind's shared pool.
/// Shared-pool entries are conventionally ranked first by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityHit<'a> {
    pub entity: &'a Entity,
    pub shared_pool: bool,
}

/// Read-only layer over an index store.
///
/// Borrowing both the store and the layout keeps the engine free of state of
/// its own; construct one per query batch.
pub struct QueryEngine<'a> {
    store: &'a IndexStore,
    layout: &'a CorpusLayout,
}

impl<'a> QueryEngine<'a> {
    #[must_use]
    pub const fn new(store: &'a IndexStore, layout: &'a CorpusLayout) -> Self {
        Self { store, layout }
    }

    /// All concrete entities of a kind. Ids are not globally unique, so the
    /// same qualified id may appear more than once.
    #[must_use]
    pub fn entities_of(&self, kind: RecordKind) -> Vec<EntityHit<'a>> {
        self.store
            .entities()
            .iter()
            .filter(|entity| entity.kind == kind)
            .map(|entity| EntityHit {
                shared_pool: self.is_shared_pool(entity),
                entity,
            })
            .collect()
    }

    /// Resolved target locations of the reference(s) recorded at a use site.
    /// Empty when nothing is recorded there or the reference is unresolved.
    #[must_use]
    pub fn resolve_at(&self, doc: &str, path: &JsonPath) -> Vec<&'a Anchor> {
        self.store
            .references()
            .iter()
            .filter(|reference| {
                reference.from.anchor.doc == doc && &reference.from.anchor.path == path
            })
            .filter_map(|reference| reference.to.anchor.as_ref())
            .collect()
    }

    /// Every reference whose target is `qualified_id`: the usage query.
    /// Includes references originating from inline layers.
    #[must_use]
    pub fn references_to(&self, qualified_id: &str) -> Vec<&'a Reference> {
        self.store
            .references()
            .iter()
            .filter(|reference| reference.to.qualified_id == qualified_id)
            .collect()
    }

    fn is_shared_pool(&self, entity: &Entity) -> bool {
        let Some(pool) = self.layout.shared_pool(entity.kind) else {
            return false;
        };
        entity.doc == self.layout.rel(&self.layout.layer_doc(pool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_scanner::{qualify, ReferenceSite, ReferenceTarget};
    use pretty_assertions::assert_eq;

    fn entity(layer: &str, kind: RecordKind, id: &str) -> Entity {
        Entity {
            qualified_id: qualify::member(layer, kind, id),
            doc: format!("assets/layers/{layer}/{layer}.json"),
            path: JsonPath::parse("tagRenderings.0"),
            kind,
        }
    }

    fn reference(from_qid: &str, from_doc: &str, from_path: &str, to_qid: &str, resolved: bool) -> Reference {
        Reference {
            kind: RecordKind::TagRendering,
            from: ReferenceSite {
                qualified_id: from_qid.to_string(),
                anchor: Anchor::new(
                    from_doc.to_string(),
                    JsonPath::parse(from_path),
                    Default::default(),
                ),
            },
            to: ReferenceTarget {
                qualified_id: to_qid.to_string(),
                anchor: resolved.then(|| {
                    Anchor::new(
                        "assets/layers/questions/questions.json".to_string(),
                        JsonPath::parse("tagRenderings.0"),
                        Default::default(),
                    )
                }),
            },
            via_builtin: false,
        }
    }

    fn sample() -> (IndexStore, CorpusLayout) {
        let mut store = IndexStore::new();
        store.replace_file(
            "assets/layers/questions/questions.json",
            vec![entity("questions", RecordKind::TagRendering, "name")],
            Vec::new(),
            1,
        );
        store.replace_file(
            "assets/layers/shop/shop.json",
            vec![
                entity("shop", RecordKind::TagRendering, "name"),
                entity("shop", RecordKind::Filter, "open_now"),
            ],
            vec![reference(
                "layers.shop",
                "assets/layers/shop/shop.json",
                "tagRenderings.1",
                "layers.questions.tagRenderings.name",
                true,
            )],
            1,
        );
        store.replace_file(
            "assets/themes/cyclofix/cyclofix.json",
            Vec::new(),
            vec![
                reference(
                    "themes.cyclofix.layers.0",
                    "assets/themes/cyclofix/cyclofix.json",
                    "layers.0.tagRenderings.0",
                    "layers.questions.tagRenderings.name",
                    true,
                ),
                reference(
                    "themes.cyclofix",
                    "assets/themes/cyclofix/cyclofix.json",
                    "layers.1",
                    "layers.missing",
                    false,
                ),
            ],
            1,
        );
        (store, CorpusLayout::new("/corpus"))
    }

    #[test]
    fn entities_of_annotates_shared_pool_membership() {
        let (store, layout) = sample();
        let engine = QueryEngine::new(&store, &layout);

        let hits = engine.entities_of(RecordKind::TagRendering);
        assert_eq!(hits.len(), 2);
        let pooled: Vec<_> = hits
            .iter()
            .filter(|hit| hit.shared_pool)
            .map(|hit| hit.entity.doc.as_str())
            .collect();
        assert_eq!(pooled, ["assets/layers/questions/questions.json"]);

        let filters = engine.entities_of(RecordKind::Filter);
        assert_eq!(filters.len(), 1);
        assert!(!filters[0].shared_pool);
    }

    #[test]
    fn resolve_at_returns_target_anchors() {
        let (store, layout) = sample();
        let engine = QueryEngine::new(&store, &layout);

        let anchors = engine.resolve_at(
            "assets/layers/shop/shop.json",
            &JsonPath::parse("tagRenderings.1"),
        );
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].doc, "assets/layers/questions/questions.json");

        // Unresolved and unknown use sites come back empty, not as errors.
        assert!(engine
            .resolve_at(
                "assets/themes/cyclofix/cyclofix.json",
                &JsonPath::parse("layers.1")
            )
            .is_empty());
        assert!(engine
            .resolve_at("nope.json", &JsonPath::parse("layers.0"))
            .is_empty());
    }

    #[test]
    fn references_to_finds_usages_including_inline_layers() {
        let (store, layout) = sample();
        let engine = QueryEngine::new(&store, &layout);

        let usages = engine.references_to("layers.questions.tagRenderings.name");
        assert_eq!(usages.len(), 2);
        assert!(usages
            .iter()
            .any(|reference| reference.from.qualified_id == "themes.cyclofix.layers.0"));

        // Unresolved references stay queryable by their would-be target.
        assert_eq!(engine.references_to("layers.missing").len(), 1);
    }

    #[test]
    fn every_resolved_reference_is_reciprocal() {
        let (store, layout) = sample();
        let engine = QueryEngine::new(&store, &layout);

        for reference in store.references().iter().filter(|r| r.is_resolved()) {
            let usages = engine.references_to(&reference.to.qualified_id);
            assert!(usages.iter().any(|r| *r == reference));
        }
    }
}
