use crate::classify::EntryShape;
use crate::error::{Result, ScanError};
use crate::layout::{CorpusLayout, DocRole};
use crate::provider::DocumentProvider;
use crate::resolver::{find_members, ReferenceToken};
use crate::types::{
    qualify, Anchor, Entity, RecordKind, Reference, ReferenceSite, ReferenceTarget,
};
use atlas_json_path::{locate, JsonPath, Range};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Records extracted from one document scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    pub entities: Vec<Entity>,
    pub references: Vec<Reference>,
}

/// Walks one document's JSON tree and emits entity and reference records.
///
/// Scanning is scoped to a single file: candidate documents are opened
/// read-only to resolve targets, never scanned themselves. Malformed entries
/// are skipped with a diagnostic; only a document that fails to parse as a
/// whole aborts the scan.
pub struct DocumentScanner<P> {
    layout: CorpusLayout,
    provider: P,
}

/// Where the current walk is writing its records: which document, which
/// coordinate space, and whether definitions may be emitted. An inline layer
/// is scanned with the theme's text and a `layers.<n>` prefix so its ranges
/// stay meaningful in the document actually open in an editor.
struct ScanContext<'a> {
    doc: &'a str,
    text: &'a str,
    owner_qualified_id: String,
    /// Layer id to qualify member entities with; absent for inline layers,
    /// which never produce entities.
    owner_layer_id: Option<&'a str>,
    prefix: JsonPath,
    references_only: bool,
}

impl<P: DocumentProvider> DocumentScanner<P> {
    pub fn new(layout: CorpusLayout, provider: P) -> Self {
        Self { layout, provider }
    }

    #[must_use]
    pub fn layout(&self) -> &CorpusLayout {
        &self.layout
    }

    /// Scan a corpus document. `path` decides the role (theme or layer);
    /// `text` is the document's current source.
    pub async fn scan(&self, path: &Path, text: &str) -> Result<ScanOutcome> {
        let rel = self.layout.rel(path);
        let (Some(role), Some(doc_id)) = (self.layout.role_for(path), self.layout.doc_id(path))
        else {
            return Err(ScanError::NotACorpusDocument(rel));
        };
        let value: Value =
            serde_json::from_str(text).map_err(|source| ScanError::parse(&rel, source))?;

        let mut out = ScanOutcome::default();
        let mut cache = HashMap::new();
        match role {
            DocRole::Theme => {
                self.scan_theme(&rel, &doc_id, text, &value, &mut out, &mut cache)
                    .await;
            }
            DocRole::Layer => {
                let Some(layer) = value.as_object() else {
                    log::debug!("{rel}: layer document is not an object");
                    return Ok(out);
                };
                // The document itself is a reusable layer definition.
                out.entities.push(Entity {
                    qualified_id: qualify::layer(&doc_id),
                    doc: rel.clone(),
                    path: JsonPath::root(),
                    kind: RecordKind::Layer,
                });
                let ctx = ScanContext {
                    doc: &rel,
                    text,
                    owner_qualified_id: qualify::layer(&doc_id),
                    owner_layer_id: Some(&doc_id),
                    prefix: JsonPath::root(),
                    references_only: false,
                };
                self.scan_layer_members(&ctx, layer, &mut out, &mut cache)
                    .await;
            }
        }
        Ok(out)
    }

    async fn scan_theme(
        &self,
        doc: &str,
        theme_id: &str,
        text: &str,
        value: &Value,
        out: &mut ScanOutcome,
        cache: &mut HashMap<PathBuf, Option<String>>,
    ) {
        let Some(layers) = value.get("layers").and_then(Value::as_array) else {
            log::debug!("{doc}: theme has no layers array");
            return;
        };
        let theme_qid = qualify::theme(theme_id);

        for (index, entry) in layers.iter().enumerate() {
            let entry_path = JsonPath::root().key("layers").index(index);
            match EntryShape::classify(entry) {
                EntryShape::Name(name) => {
                    let reference = self
                        .layer_reference(doc, text, &theme_qid, entry_path, name, false, cache)
                        .await;
                    out.references.push(reference);
                }
                EntryShape::BuiltinOne(name) => {
                    let use_path = entry_path.key("builtin");
                    let reference = self
                        .layer_reference(doc, text, &theme_qid, use_path, name, true, cache)
                        .await;
                    out.references.push(reference);
                }
                EntryShape::BuiltinMany(names) => {
                    for (position, name) in names.iter().enumerate() {
                        let use_path = entry_path.key("builtin").index(position);
                        let Some(name) = name.as_str() else {
                            log::warn!("{doc}: skipping malformed builtin entry at {use_path}");
                            continue;
                        };
                        let reference = self
                            .layer_reference(doc, text, &theme_qid, use_path, name, true, cache)
                            .await;
                        out.references.push(reference);
                    }
                }
                EntryShape::Inline(layer) => {
                    // Inline layers cannot be reused; they contribute
                    // references but never entities.
                    let ctx = ScanContext {
                        doc,
                        text,
                        owner_qualified_id: qualify::inline_layer(theme_id, index),
                        owner_layer_id: None,
                        prefix: entry_path,
                        references_only: true,
                    };
                    self.scan_layer_members(&ctx, layer, out, cache).await;
                }
                EntryShape::Malformed => {
                    log::warn!("{doc}: skipping malformed layer entry at {entry_path}");
                }
            }
        }
    }

    async fn scan_layer_members(
        &self,
        ctx: &ScanContext<'_>,
        layer: &Map<String, Value>,
        out: &mut ScanOutcome,
        cache: &mut HashMap<PathBuf, Option<String>>,
    ) {
        // Special and computed sources cannot supply reusable definitions:
        // their entries are not independently addressable.
        let references_only = ctx.references_only || !supplies_definitions(layer);

        for kind in [RecordKind::TagRendering, RecordKind::Filter] {
            let Some(field) = kind.member_field() else {
                continue;
            };
            let Some(entries) = layer.get(field).and_then(Value::as_array) else {
                continue;
            };

            for (index, entry) in entries.iter().enumerate() {
                let entry_path = ctx.prefix.key(field).index(index);
                match EntryShape::classify(entry) {
                    EntryShape::Name(token) => {
                        let references = self
                            .member_references(ctx, kind, token, entry_path, false, cache)
                            .await;
                        out.references.extend(references);
                    }
                    EntryShape::BuiltinOne(token) => {
                        let use_path = entry_path.key("builtin");
                        let references = self
                            .member_references(ctx, kind, token, use_path, true, cache)
                            .await;
                        out.references.extend(references);
                    }
                    EntryShape::BuiltinMany(tokens) => {
                        for (position, token) in tokens.iter().enumerate() {
                            let use_path = entry_path.key("builtin").index(position);
                            let Some(token) = token.as_str() else {
                                log::warn!(
                                    "{}: skipping malformed builtin entry at {use_path}",
                                    ctx.doc
                                );
                                continue;
                            };
                            let references = self
                                .member_references(ctx, kind, token, use_path, true, cache)
                                .await;
                            out.references.extend(references);
                        }
                    }
                    EntryShape::Inline(member) => {
                        if references_only {
                            continue;
                        }
                        let Some(layer_id) = ctx.owner_layer_id else {
                            continue;
                        };
                        let Some(id) = member.get("id").and_then(Value::as_str) else {
                            log::warn!(
                                "{}: skipping {} without id at {entry_path}",
                                ctx.doc,
                                kind.as_str()
                            );
                            continue;
                        };
                        out.entities.push(Entity {
                            qualified_id: qualify::member(layer_id, kind, id),
                            doc: ctx.doc.to_string(),
                            path: entry_path,
                            kind,
                        });
                    }
                    EntryShape::Malformed => {
                        log::warn!(
                            "{}: skipping malformed {} entry at {entry_path}",
                            ctx.doc,
                            kind.as_str()
                        );
                    }
                }
            }
        }
    }

    /// One reference from a theme to a whole layer document.
    #[allow(clippy::too_many_arguments)]
    async fn layer_reference(
        &self,
        doc: &str,
        text: &str,
        from_qualified_id: &str,
        use_path: JsonPath,
        name: &str,
        via_builtin: bool,
        cache: &mut HashMap<PathBuf, Option<String>>,
    ) -> Reference {
        let from_range = locate(text, &use_path).unwrap_or_default();
        let from = ReferenceSite {
            qualified_id: from_qualified_id.to_string(),
            anchor: Anchor::new(doc.to_string(), use_path, from_range),
        };

        let candidate = self.layout.layer_doc(name);
        let anchor = match self.cached_read(&candidate, cache).await {
            Some(candidate_text) => {
                let id_path = JsonPath::parse("id");
                let (path, range) = match locate(&candidate_text, &id_path) {
                    Some(range) => (id_path, range),
                    None => (JsonPath::root(), Range::default()),
                };
                Some(Anchor::new(self.layout.rel(&candidate), path, range))
            }
            None => None,
        };

        Reference {
            kind: RecordKind::Layer,
            from,
            to: ReferenceTarget {
                qualified_id: qualify::layer(name),
                anchor,
            },
            via_builtin,
        }
    }

    /// References from one tagRendering/filter use site. A plain token yields
    /// exactly one record (resolved or unresolved); a wildcard fans out into
    /// one record per matched member, or a single unresolved record when
    /// nothing matches so the use site stays visible to diagnostics.
    async fn member_references(
        &self,
        ctx: &ScanContext<'_>,
        kind: RecordKind,
        raw: &str,
        use_path: JsonPath,
        via_builtin: bool,
        cache: &mut HashMap<PathBuf, Option<String>>,
    ) -> Vec<Reference> {
        let token = ReferenceToken::parse(raw);
        let from_range = locate(ctx.text, &use_path).unwrap_or_default();
        let from = ReferenceSite {
            qualified_id: ctx.owner_qualified_id.clone(),
            anchor: Anchor::new(ctx.doc.to_string(), use_path, from_range),
        };

        let Some(candidate_layer) = token.candidate_layer(kind, &self.layout) else {
            return Vec::new();
        };
        let fallback = ReferenceTarget {
            qualified_id: qualify::member(&candidate_layer, kind, &token.local),
            anchor: None,
        };

        let candidate = self.layout.layer_doc(&candidate_layer);
        let Some(candidate_text) = self.cached_read(&candidate, cache).await else {
            return vec![Reference {
                kind,
                from,
                to: fallback,
                via_builtin,
            }];
        };

        let matches = find_members(&candidate_text, &token, kind);
        if matches.is_empty() {
            return vec![Reference {
                kind,
                from,
                to: fallback,
                via_builtin,
            }];
        }

        let candidate_rel = self.layout.rel(&candidate);
        matches
            .into_iter()
            .map(|member| Reference {
                kind,
                from: from.clone(),
                to: ReferenceTarget {
                    qualified_id: qualify::member(&candidate_layer, kind, &member.member_id),
                    anchor: Some(Anchor::new(
                        candidate_rel.clone(),
                        member.path,
                        member.range,
                    )),
                },
                via_builtin,
            })
            .collect()
    }

    async fn cached_read(
        &self,
        path: &Path,
        cache: &mut HashMap<PathBuf, Option<String>>,
    ) -> Option<String> {
        if let Some(hit) = cache.get(path) {
            return hit.clone();
        }
        let text = self.provider.read(path).await;
        cache.insert(path.to_path_buf(), text.clone());
        text
    }
}

/// Whether a layer's entries are independently addressable. Special
/// (geometry-less) and computed geoJson sources are not.
fn supplies_definitions(layer: &Map<String, Value>) -> bool {
    match layer.get("source") {
        Some(Value::String(source)) => !source.starts_with("special"),
        Some(Value::Object(source)) => !source.contains_key("geoJson"),
        _ => true,
    }
}
