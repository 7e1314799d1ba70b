//! Child blueprints referenced from `include`

use crate::cache::ChildBlueprintCache;
use blueprint_model::{Blueprint, BlueprintLoader, DocumentFormat, Include};
use lsp_types::Url;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Resolve the on-disk path of a local include, relative to the including document.
///
/// Remote includes, paths containing substitutions and parents that are not files never
/// resolve.
pub fn resolve_include_path(parent: &Url, include: &Include) -> Option<PathBuf> {
    if include.is_remote() || include.path.is_empty() || include.path.contains("${") {
        return None;
    }
    let parent_path = parent.to_file_path().ok()?;
    let directory = parent_path.parent()?;
    Some(normalize(&directory.join(&include.path)))
}

/// Lexically remove `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Loads child blueprints from wherever they live.
pub trait ChildBlueprintSource: Send + Sync {
    fn load(&self, path: &Path) -> Option<Blueprint>;
}

/// Reads child blueprints from disk with a [`BlueprintLoader`].
pub struct FileChildSource<L> {
    loader: L,
}

impl<L: BlueprintLoader> FileChildSource<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }
}

impl<L: BlueprintLoader> ChildBlueprintSource for FileChildSource<L> {
    fn load(&self, path: &Path) -> Option<Blueprint> {
        let format = DocumentFormat::from_path(path).ok()?;
        let content = std::fs::read_to_string(path).ok()?;
        self.loader.load(&content, format).blueprint
    }
}

/// Child blueprints loaded on demand and cached by resolved path.
pub struct ChildBlueprints {
    cache: ChildBlueprintCache,
    source: Arc<dyn ChildBlueprintSource>,
}

impl ChildBlueprints {
    pub fn new(source: Arc<dyn ChildBlueprintSource>) -> Self {
        Self {
            cache: ChildBlueprintCache::new(),
            source,
        }
    }

    pub fn resolve(&self, parent: &Url, include: &Include) -> Option<Arc<Blueprint>> {
        let path = resolve_include_path(parent, include)?;
        let key = path.to_string_lossy().into_owned();
        self.cache
            .get_or_try_insert_with(&key, || self.source.load(&path).ok_or(()))
            .ok()
    }

    /// Drop the cached child blueprint stored for `uri`, if any.
    pub fn invalidate_uri(&self, uri: &Url) {
        let Ok(path) = uri.to_file_path() else {
            return;
        };
        let key = normalize(&path).to_string_lossy().into_owned();
        if self.cache.invalidate(&key) {
            debug!(%uri, "invalidated cached child blueprint");
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
