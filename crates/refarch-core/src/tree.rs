//! Directory tree abstraction for the batch walker.
//!
//! Provides:
//! - [`DirectoryTree`] -- the listing port implemented by the real filesystem
//! - [`MemoryTree`] -- a virtual tree for exercising walks without touching disk

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use refarch_types::error::WalkError;
use refarch_types::walk::DirectoryEntry;

/// Lists the immediate children of a directory.
///
/// Order of the returned entries is unspecified; the walker sorts them.
/// Implementations must not follow symlinks when deciding `is_dir`.
pub trait DirectoryTree: Send + Sync {
    fn list(
        &self,
        dir: &Path,
    ) -> impl std::future::Future<Output = Result<Vec<DirectoryEntry>, WalkError>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryTree
// ---------------------------------------------------------------------------

/// In-memory directory tree.
///
/// Paths passed to the builder methods are relative to the root; parent
/// directories are created implicitly.
#[derive(Debug, Clone)]
pub struct MemoryTree {
    root: PathBuf,
    dirs: BTreeMap<PathBuf, Vec<DirectoryEntry>>,
    unreadable: BTreeSet<PathBuf>,
}

impl MemoryTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut dirs = BTreeMap::new();
        dirs.insert(root.clone(), Vec::new());
        Self {
            root,
            dirs,
            unreadable: BTreeSet::new(),
        }
    }

    /// Add a regular file.
    pub fn file(mut self, relative: impl AsRef<Path>) -> Self {
        let path = self.root.join(relative);
        self.insert(path, false);
        self
    }

    /// Add an (empty) directory.
    pub fn dir(mut self, relative: impl AsRef<Path>) -> Self {
        let path = self.root.join(relative);
        self.ensure_dir(&path);
        self
    }

    /// Add a directory whose listing fails.
    pub fn unreadable(mut self, relative: impl AsRef<Path>) -> Self {
        let path = self.root.join(relative);
        self.ensure_dir(&path);
        self.unreadable.insert(path);
        self
    }

    fn insert(&mut self, path: PathBuf, is_dir: bool) {
        let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
        self.ensure_dir(&parent);
        if let Some(children) = self.dirs.get_mut(&parent) {
            if !children.iter().any(|c| c.path == path) {
                children.push(DirectoryEntry::new(path.clone(), is_dir));
            }
        }
        if is_dir {
            self.dirs.entry(path).or_default();
        }
    }

    fn ensure_dir(&mut self, path: &Path) {
        if self.dirs.contains_key(path) {
            return;
        }
        self.insert(path.to_path_buf(), true);
    }
}

impl DirectoryTree for MemoryTree {
    async fn list(&self, dir: &Path) -> Result<Vec<DirectoryEntry>, WalkError> {
        if self.unreadable.contains(dir) {
            return Err(WalkError::Read {
                path: dir.to_path_buf(),
                reason: "permission denied".to_string(),
            });
        }
        self.dirs.get(dir).cloned().ok_or_else(|| WalkError::Read {
            path: dir.to_path_buf(),
            reason: "no such directory".to_string(),
        })
    }
}
