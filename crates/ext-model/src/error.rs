use std::path::PathBuf;

use crate::id::ExtensionId;
use crate::validator::ValidationReport;

/// Errors reading or writing extension declaration manifests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to parse manifest TOML.
    #[error("failed to parse extension manifest: {0}")]
    ManifestParse(#[from] toml::de::Error),

    /// Manifest file not found at the expected path.
    #[error("extension manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    /// Failed to serialize a manifest.
    #[error("failed to serialize extension manifest: {0}")]
    ManifestSerialize(String),

    /// I/O error reading manifest files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// One or more descriptors broke structural invariants.
///
/// Carries a report per offending descriptor, each listing every violation
/// found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} extension descriptor(s) failed validation", reports.len())]
pub struct ValidationError {
    pub reports: Vec<ValidationReport>,
}

/// Errors building the extension dependency tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("no root extension declared")]
    NoRoot,

    #[error("multiple root extensions declared: {ids:?}")]
    MultipleRoots { ids: Vec<ExtensionId> },

    #[error("duplicate extension ids: {ids:?}")]
    DuplicateIds { ids: Vec<ExtensionId> },

    /// `(child, missing parent)` pairs.
    #[error("unresolved parent ids: {missing:?}")]
    UnresolvedParents {
        missing: Vec<(ExtensionId, ExtensionId)>,
    },

    /// A parent cannot accept children (sealed extension).
    #[error("extension {parent} is sealed and cannot be extended by {children:?}")]
    SealedParent {
        parent: ExtensionId,
        children: Vec<ExtensionId>,
    },

    #[error("dependency cycle detected among extensions: {participants:?}")]
    Cycle { participants: Vec<ExtensionId> },
}
