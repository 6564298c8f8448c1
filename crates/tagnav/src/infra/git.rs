//! Project root detection through git.

use std::path::{Path, PathBuf};

/// Lightweight wrapper around [`gix::Repository`] discovery.
#[derive(Default)]
pub struct GitClient {
    repo: Option<gix::Repository>,
}

impl GitClient {
    /// Attempt to locate a git repository starting from `path`.
    pub fn discover(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let repo = match gix::discover(path) {
            Ok(repo) => Some(repo),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "no git repository");
                None
            }
        };
        Self { repo }
    }

    /// Work tree root of the discovered repository.
    pub fn work_tree(&self) -> Option<PathBuf> {
        let repo = self.repo.as_ref()?;
        repo.work_dir()
            .map(Path::to_path_buf)
            .or_else(|| repo.path().parent().map(Path::to_path_buf))
    }
}

/// Project root for `path`: the enclosing git work tree, if any.
pub fn project_root_for(path: &Path) -> Option<PathBuf> {
    let start = if path.is_file() { path.parent()? } else { path };
    GitClient::discover(start).work_tree()
}

