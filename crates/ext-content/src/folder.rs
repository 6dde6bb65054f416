//! Folder-backed content.

use std::path::{Path, PathBuf};

use crate::descriptor::ContentDescriptor;
use crate::provider::ContentProvider;
use crate::{Error, Result};

/// Mirrors a local source folder into the target directory.
///
/// Up-to-date checks compare checksum snapshots of both trees.
#[derive(Debug, Clone)]
pub struct FolderContentProvider {
    descriptor: ContentDescriptor,
}

impl FolderContentProvider {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            descriptor: ContentDescriptor::folder(source),
        }
    }

    pub fn source(&self) -> &Path {
        self.descriptor
            .source_path()
            .unwrap_or_else(|| Path::new(""))
    }
}

impl ContentProvider for FolderContentProvider {
    fn descriptor(&self) -> &ContentDescriptor {
        &self.descriptor
    }

    fn is_valid(&self) -> bool {
        self.source().is_dir()
    }

    fn is_up_to_date(&self, target: &Path) -> bool {
        if !self.is_valid() || !target.is_dir() {
            return false;
        }
        match (
            ext_fs::snapshot_dir(self.source()),
            ext_fs::snapshot_dir(target),
        ) {
            (Ok(source), Ok(current)) => source == current,
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "could not compare content snapshots");
                false
            }
        }
    }

    fn update(&self, target: &Path) -> Result<bool> {
        if !self.is_valid() {
            return Err(Error::InvalidSource {
                source_path: self.source().to_path_buf(),
            });
        }
        let outcome = ext_fs::sync_tree(self.source(), target)?;
        if outcome.changed() {
            tracing::info!(
                source = %self.source().display(),
                target = %target.display(),
                copied = outcome.copied.len(),
                removed = outcome.removed.len(),
                "extension content updated"
            );
        }
        Ok(outcome.changed())
    }
}
