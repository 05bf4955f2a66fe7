use crate::types::RecordKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const THEMES_DIR: &str = "themes";
const LAYERS_DIR: &str = "layers";
const ASSETS_DIR: &str = "assets";
const METADATA_FILE: &str = "license_info.json";

/// Default shared-pool layer holding reusable tagRenderings.
pub const DEFAULT_SHARED_TAG_RENDERINGS: &str = "questions";
/// Default shared-pool layer holding reusable filters.
pub const DEFAULT_SHARED_FILTERS: &str = "filters";

/// Degenerate single-purpose layers that carry no reusable content and are
/// excluded from scanning.
const DEFAULT_EXCLUDED_LAYERS: &[&str] = &["favourite", "last_click", "summary"];

/// Corpus role of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocRole {
    Theme,
    Layer,
}

/// Description of the corpus filesystem layout.
///
/// Themes live at `assets/themes/<name>/<name>.json`, layers at
/// `assets/layers/<name>/<name>.json`. One designated layer per kind holds
/// the shared pool addressable by bare id from any document. The layout is an
/// owned, injectable value so tests can point it at temporary corpora.
#[derive(Debug, Clone)]
pub struct CorpusLayout {
    root: PathBuf,
    shared_tag_renderings: String,
    shared_filters: String,
    excluded_layers: Vec<String>,
}

impl CorpusLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            shared_tag_renderings: DEFAULT_SHARED_TAG_RENDERINGS.to_string(),
            shared_filters: DEFAULT_SHARED_FILTERS.to_string(),
            excluded_layers: DEFAULT_EXCLUDED_LAYERS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Override the shared-pool layer ids.
    #[must_use]
    pub fn with_shared_pools(
        mut self,
        tag_renderings: impl Into<String>,
        filters: impl Into<String>,
    ) -> Self {
        self.shared_tag_renderings = tag_renderings.into();
        self.shared_filters = filters.into();
        self
    }

    /// Override the excluded degenerate layer ids.
    #[must_use]
    pub fn with_excluded_layers(mut self, excluded: Vec<String>) -> Self {
        self.excluded_layers = excluded;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Id of the shared-pool layer for a member kind.
    #[must_use]
    pub fn shared_pool(&self, kind: RecordKind) -> Option<&str> {
        match kind {
            RecordKind::Layer => None,
            RecordKind::TagRendering => Some(&self.shared_tag_renderings),
            RecordKind::Filter => Some(&self.shared_filters),
        }
    }

    /// Absolute path of the theme document with the given id.
    #[must_use]
    pub fn theme_doc(&self, id: &str) -> PathBuf {
        self.root
            .join(ASSETS_DIR)
            .join(THEMES_DIR)
            .join(id)
            .join(format!("{id}.json"))
    }

    /// Absolute path of the layer document with the given id.
    #[must_use]
    pub fn layer_doc(&self, id: &str) -> PathBuf {
        self.root
            .join(ASSETS_DIR)
            .join(LAYERS_DIR)
            .join(id)
            .join(format!("{id}.json"))
    }

    /// Corpus-relative path with forward slashes.
    #[must_use]
    pub fn rel(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let mut normalized = relative.to_string_lossy().to_string();
        if normalized.contains('\\') {
            normalized = normalized.replace('\\', "/");
        }
        normalized
    }

    /// Corpus role of a path, or `None` for anything outside the
    /// `assets/{themes,layers}/<name>/<name>.json` convention.
    #[must_use]
    pub fn role_for(&self, path: &Path) -> Option<DocRole> {
        let rel = self.rel(path);
        let mut parts = rel.split('/');
        if parts.next() != Some(ASSETS_DIR) {
            return None;
        }
        let role = match parts.next() {
            Some(THEMES_DIR) => DocRole::Theme,
            Some(LAYERS_DIR) => DocRole::Layer,
            _ => return None,
        };
        let dir = parts.next()?;
        let file = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        if file != format!("{dir}.json") {
            return None;
        }
        Some(role)
    }

    /// Document id (the `<name>` of `<name>/<name>.json`).
    #[must_use]
    pub fn doc_id(&self, path: &Path) -> Option<String> {
        self.role_for(path)?;
        path.file_stem().map(|stem| stem.to_string_lossy().to_string())
    }

    /// Whether a path should be scanned. Excludes metadata files and the
    /// configured degenerate layers.
    #[must_use]
    pub fn is_eligible(&self, path: &Path) -> bool {
        if path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().eq_ignore_ascii_case(METADATA_FILE))
        {
            return false;
        }
        let Some(role) = self.role_for(path) else {
            return false;
        };
        if role == DocRole::Layer {
            if let Some(id) = self.doc_id(path) {
                if self.excluded_layers.iter().any(|excluded| excluded == &id) {
                    return false;
                }
            }
        }
        true
    }

    /// Enumerate every eligible corpus document on disk.
    #[must_use]
    pub fn enumerate(&self) -> Vec<(PathBuf, DocRole)> {
        let mut docs = Vec::new();
        for dir in [THEMES_DIR, LAYERS_DIR] {
            let base = self.root.join(ASSETS_DIR).join(dir);
            for entry in WalkDir::new(&base).into_iter().filter_map(|e| e.ok()) {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                if !self.is_eligible(path) {
                    continue;
                }
                if let Some(role) = self.role_for(path) {
                    docs.push((path.to_path_buf(), role));
                }
            }
        }
        docs.sort();
        docs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn doc_paths_follow_the_corpus_convention() {
        let layout = CorpusLayout::new("/corpus");
        assert_eq!(
            layout.theme_doc("cyclofix"),
            PathBuf::from("/corpus/assets/themes/cyclofix/cyclofix.json")
        );
        assert_eq!(
            layout.layer_doc("questions"),
            PathBuf::from("/corpus/assets/layers/questions/questions.json")
        );
    }

    #[test]
    fn role_requires_matching_file_and_directory_name() {
        let layout = CorpusLayout::new("/corpus");
        assert_eq!(
            layout.role_for(Path::new("/corpus/assets/themes/cyclofix/cyclofix.json")),
            Some(DocRole::Theme)
        );
        assert_eq!(
            layout.role_for(Path::new("/corpus/assets/layers/questions/questions.json")),
            Some(DocRole::Layer)
        );
        assert_eq!(
            layout.role_for(Path::new("/corpus/assets/layers/questions/license_info.json")),
            None
        );
        assert_eq!(
            layout.role_for(Path::new("/corpus/assets/other/x/x.json")),
            None
        );
    }

    #[test]
    fn eligibility_excludes_metadata_and_degenerate_layers() {
        let layout = CorpusLayout::new("/corpus");
        assert!(layout.is_eligible(Path::new(
            "/corpus/assets/layers/bicycle_rental/bicycle_rental.json"
        )));
        assert!(!layout.is_eligible(Path::new(
            "/corpus/assets/layers/bicycle_rental/license_info.json"
        )));
        assert!(!layout.is_eligible(Path::new(
            "/corpus/assets/layers/favourite/favourite.json"
        )));
    }

    #[test]
    fn enumerate_walks_both_corpus_trees() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        for (dir, name) in [("themes", "cyclofix"), ("layers", "bicycle_rental")] {
            let doc_dir = root.join("assets").join(dir).join(name);
            fs::create_dir_all(&doc_dir).unwrap();
            fs::write(doc_dir.join(format!("{name}.json")), "{}").unwrap();
            fs::write(doc_dir.join("license_info.json"), "{}").unwrap();
        }

        let layout = CorpusLayout::new(root);
        let docs = layout.enumerate();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().any(|(_, role)| *role == DocRole::Theme));
        assert!(docs.iter().any(|(_, role)| *role == DocRole::Layer));
    }
}
