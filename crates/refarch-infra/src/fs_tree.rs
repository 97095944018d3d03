//! Local filesystem implementation of [`DirectoryTree`].

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use refarch_core::tree::DirectoryTree;
use refarch_types::error::WalkError;
use refarch_types::walk::DirectoryEntry;

/// Lists directories through `tokio::fs`.
///
/// Entry types come from `symlink_metadata`, so a symlink to a directory is
/// reported as a plain entry and never descended into. Children of `.` are
/// reported without the `./` prefix (`a/workflow.yaml`).
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTree;

impl LocalTree {
    pub fn new() -> Self {
        Self
    }
}

fn read_error(path: &Path, err: std::io::Error) -> WalkError {
    WalkError::Read {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

fn child_path(dir: &Path, name: &OsStr) -> PathBuf {
    if dir == Path::new(".") {
        PathBuf::from(name)
    } else {
        dir.join(name)
    }
}

impl DirectoryTree for LocalTree {
    async fn list(&self, dir: &Path) -> Result<Vec<DirectoryEntry>, WalkError> {
        let mut read_dir = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| read_error(dir, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(|e| read_error(dir, e))? {
            let path = child_path(dir, &entry.file_name());
            let metadata = tokio::fs::symlink_metadata(&path)
                .await
                .map_err(|e| read_error(&path, e))?;
            entries.push(DirectoryEntry::new(path, metadata.is_dir()));
        }
        Ok(entries)
    }
}
