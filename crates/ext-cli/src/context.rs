//! Registry context shared by every command
//!
//! Loads the registry file and the runtime configuration, and reads each
//! installed extension's declaration from its content.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use ext_content::ContentDescriptor;
use ext_model::{ExtensionDescriptor, ExtensionId, ExtensionKind, MANIFEST_FILENAME};
use ext_registry::{Application, ExtensionEntry, RegistryStore};
use ext_runtime::RuntimeConfig;

use crate::error::{CliError, Result};

/// A loaded registry plus the configuration it is used with.
#[derive(Debug)]
pub struct RegistryContext {
    /// Directory relative content paths are resolved against.
    pub base: PathBuf,
    pub application: Application,
    pub config: RuntimeConfig,
}

/// An installed extension's declaration, or why it could not be read.
pub struct Declaration<'a> {
    pub entry: &'a ExtensionEntry,
    pub parent: Option<ExtensionId>,
    pub descriptor: Result<ExtensionDescriptor>,
}

impl RegistryContext {
    pub fn load(registry: &Path, config: Option<&Path>) -> Result<Self> {
        let config = match config {
            Some(path) => RuntimeConfig::load(path)?,
            None => RuntimeConfig::default(),
        };
        let application = RegistryStore::new(registry)?.load()?;
        let base = registry
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        tracing::debug!(
            registry = %registry.display(),
            extensions = application.len(),
            "registry context loaded"
        );
        Ok(Self {
            base,
            application,
            config,
        })
    }

    /// `content` with a relative folder path resolved against the registry.
    pub fn resolve_content(&self, content: &ContentDescriptor) -> ContentDescriptor {
        let mut resolved = content.clone();
        if let Some(path) = content.source_path().filter(|p| p.is_relative()) {
            resolved.relocate(self.base.join(path));
        }
        resolved
    }

    /// Declarations of every installed extension, in registry pre-order.
    pub fn declarations(&self) -> Vec<Declaration<'_>> {
        self.application
            .entries()
            .into_iter()
            .map(|(parent, entry)| Declaration {
                entry,
                parent,
                descriptor: self.declaration(parent, entry),
            })
            .collect()
    }

    /// Descriptors of every installed extension; the first unreadable one
    /// is an error.
    pub fn descriptors(&self) -> Result<Vec<ExtensionDescriptor>> {
        self.declarations()
            .into_iter()
            .map(|d| d.descriptor)
            .collect()
    }

    fn declaration(
        &self,
        parent: Option<ExtensionId>,
        entry: &ExtensionEntry,
    ) -> Result<ExtensionDescriptor> {
        match self.resolve_content(&entry.content) {
            ContentDescriptor::Folder { path } => {
                Ok(ExtensionDescriptor::from_path(&path.join(MANIFEST_FILENAME))?)
            }
            ContentDescriptor::Builtin => Ok(builtin_descriptor(parent, entry)),
            ContentDescriptor::Artifact { group, name, version } => Err(CliError::user(format!(
                "extension {}: artifact {group}:{name}:{version} has no local manifest",
                entry.id
            ))),
        }
    }
}

/// Builtin content carries no manifest: describe it from the registry, with
/// no contributed classes.
fn builtin_descriptor(parent: Option<ExtensionId>, entry: &ExtensionEntry) -> ExtensionDescriptor {
    let parent_id = match entry.kind {
        ExtensionKind::Root => Some(entry.id),
        ExtensionKind::Sealed | ExtensionKind::Open => parent,
    };
    ExtensionDescriptor {
        id: Some(entry.id),
        parent_id,
        kind: entry.kind,
        local_classes: Some(BTreeSet::new()),
        exported_classes: (entry.kind == ExtensionKind::Open).then(BTreeSet::new),
        required: entry.kind == ExtensionKind::Root,
    }
}
