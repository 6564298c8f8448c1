//! Discovery of the tag files applicable to a lookup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Ordered, de-duplicated list of tag files to search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSources {
    paths: Vec<PathBuf>,
}

impl TagSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `path` unless it is already present. Returns whether it was added.
    pub fn push(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.paths.contains(&path) {
            return false;
        }
        self.paths.push(path);
        true
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }
}

impl FromIterator<PathBuf> for TagSources {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        let mut sources = TagSources::new();
        for path in iter {
            sources.push(path);
        }
        sources
    }
}

/// Tag files configured for a project root.
pub type ProjectSources = HashMap<PathBuf, Vec<PathBuf>>;

/// Builds [`TagSources`] from the active file, project root, and configuration.
#[derive(Debug, Clone)]
pub struct TagSourceResolver {
    file_name: String,
}

impl Default for TagSourceResolver {
    fn default() -> Self {
        Self::new("tags")
    }
}

impl TagSourceResolver {
    /// Create a resolver looking for tag files named `file_name`.
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    /// Resolve sources in priority order: next to the active file, the project root, the
    /// project's configured files, then the global list. Only existing files are kept.
    pub fn resolve(
        &self,
        active_file: Option<&Path>,
        project_root: Option<&Path>,
        per_project: &ProjectSources,
        global: &[PathBuf],
    ) -> TagSources {
        let mut sources = TagSources::new();

        if let Some(dir) = active_file.and_then(Path::parent) {
            self.add_existing(&mut sources, dir.join(&self.file_name));
        }

        if let Some(root) = project_root {
            self.add_existing(&mut sources, root.join(&self.file_name));

            if let Some(configured) = per_project.get(root) {
                for path in configured {
                    self.add_existing(&mut sources, root.join(path));
                }
            }
        }

        for path in global {
            self.add_existing(&mut sources, path.clone());
        }

        tracing::debug!(count = sources.len(), "resolved tag sources");
        sources
    }

    fn add_existing(&self, sources: &mut TagSources, path: PathBuf) {
        if path.is_file() {
            sources.push(path);
        } else {
            tracing::trace!(path = %path.display(), "tag source not found");
        }
    }
}
