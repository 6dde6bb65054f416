//! Directory snapshots and one-way tree synchronisation
//!
//! A snapshot maps every regular file below a root (by relative path) to its
//! checksum. Two trees are in sync when their snapshots are equal.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::checksum::compute_file_checksum;
use crate::{Error, Result, io};

/// Relative file path to checksum, for every regular file under a root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirSnapshot {
    files: BTreeMap<PathBuf, String>,
}

impl DirSnapshot {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn checksum(&self, relative: &Path) -> Option<&str> {
        self.files.get(relative).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }
}

/// Outcome of [`sync_tree`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSync {
    /// Files written into the target (new or changed).
    pub copied: Vec<PathBuf>,
    /// Files deleted from the target because the source no longer has them.
    pub removed: Vec<PathBuf>,
}

impl TreeSync {
    /// Whether the target was modified at all.
    pub fn changed(&self) -> bool {
        !self.copied.is_empty() || !self.removed.is_empty()
    }
}

/// Snapshot every regular file below `root`.
///
/// Symlinks are skipped.
pub fn snapshot_dir(root: &Path) -> Result<DirSnapshot> {
    if !root.is_dir() {
        return Err(Error::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut files = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| Error::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| Error::io(&path, e))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                let relative = path
                    .strip_prefix(root)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| path.clone());
                files.insert(relative, compute_file_checksum(&path)?);
            } else {
                tracing::debug!(path = %path.display(), "skipping non-regular file");
            }
        }
    }

    Ok(DirSnapshot { files })
}

/// Make `target` mirror the regular files of `source`.
///
/// Only files whose checksum differs are rewritten and files absent from
/// `source` are deleted, so a second call with an unchanged source reports no
/// changes.
pub fn sync_tree(source: &Path, target: &Path) -> Result<TreeSync> {
    let wanted = snapshot_dir(source)?;
    let existing = if target.exists() {
        snapshot_dir(target)?
    } else {
        fs::create_dir_all(target).map_err(|e| Error::io(target, e))?;
        DirSnapshot::default()
    };

    let mut outcome = TreeSync::default();
    for (relative, checksum) in &wanted.files {
        if existing.checksum(relative) == Some(checksum.as_str()) {
            continue;
        }
        io::copy_file(&source.join(relative), &target.join(relative))?;
        outcome.copied.push(relative.clone());
    }

    for relative in existing.files.keys() {
        if wanted.files.contains_key(relative) {
            continue;
        }
        let stale = target.join(relative);
        fs::remove_file(&stale).map_err(|e| Error::io(&stale, e))?;
        outcome.removed.push(relative.clone());
    }

    tracing::debug!(
        source = %source.display(),
        target = %target.display(),
        copied = outcome.copied.len(),
        removed = outcome.removed.len(),
        "tree synchronised"
    );
    Ok(outcome)
}
