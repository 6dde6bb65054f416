//! Persistable description of where extension content comes from.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How to fetch and verify the payload backing an extension.
///
/// Serialized with a `kind` tag, e.g. `{ "kind": "folder", "path": "..." }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentDescriptor {
    /// Content is built into the host; nothing to synchronise.
    #[default]
    Builtin,
    /// Content lives in a local folder copied into the target directory.
    Folder { path: PathBuf },
    /// Content is an artifact resolved by an external provider.
    Artifact {
        group: String,
        name: String,
        version: String,
    },
}

impl ContentDescriptor {
    pub fn folder(path: impl Into<PathBuf>) -> Self {
        Self::Folder { path: path.into() }
    }

    /// Stable kind tag used in serialized records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Folder { .. } => "folder",
            Self::Artifact { .. } => "artifact",
        }
    }

    /// Local source folder, when the content is folder-backed.
    pub fn source_path(&self) -> Option<&Path> {
        match self {
            Self::Folder { path } => Some(path),
            Self::Builtin | Self::Artifact { .. } => None,
        }
    }

    /// Point a folder descriptor at a new source; other kinds are unchanged.
    ///
    /// Returns whether the descriptor was updated.
    pub fn relocate(&mut self, new_path: impl Into<PathBuf>) -> bool {
        match self {
            Self::Folder { path } => {
                *path = new_path.into();
                true
            }
            Self::Builtin | Self::Artifact { .. } => false,
        }
    }
}
