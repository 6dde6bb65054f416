//! The content provider contract and the standard provider set.

use std::path::Path;
use std::sync::Arc;

use crate::descriptor::ContentDescriptor;
use crate::folder::FolderContentProvider;
use crate::{Error, Result};

/// Supplies the physical payload of one extension.
///
/// Providers are black boxes to the runtime. `update` may block on file or
/// network I/O and should be issued off the UI thread (see
/// [`spawn_update`](crate::spawn_update)).
pub trait ContentProvider: Send + Sync {
    fn descriptor(&self) -> &ContentDescriptor;

    /// Whether the source still exists and is usable.
    fn is_valid(&self) -> bool;

    /// Whether `target` already holds the current payload.
    fn is_up_to_date(&self, target: &Path) -> bool;

    /// Synchronise the payload into `target`.
    ///
    /// Returns whether anything was written. Running it again without source
    /// changes returns `false` and leaves `is_up_to_date` true.
    fn update(&self, target: &Path) -> Result<bool>;
}

/// Creates providers for content descriptors.
pub trait ProviderFactory: Send + Sync {
    fn create(&self, descriptor: &ContentDescriptor) -> Result<Arc<dyn ContentProvider>>;
}

/// Content compiled into the host: always valid and up to date.
#[derive(Debug, Default)]
struct BuiltinContentProvider {
    descriptor: ContentDescriptor,
}

impl ContentProvider for BuiltinContentProvider {
    fn descriptor(&self) -> &ContentDescriptor {
        &self.descriptor
    }

    fn is_valid(&self) -> bool {
        true
    }

    fn is_up_to_date(&self, _target: &Path) -> bool {
        true
    }

    fn update(&self, _target: &Path) -> Result<bool> {
        Ok(false)
    }
}

/// Handles builtin and folder content; artifact content is delegated to an
/// optional external factory since artifact resolution lives outside the host.
#[derive(Default)]
pub struct StandardProviders {
    artifacts: Option<Box<dyn ProviderFactory>>,
}

impl StandardProviders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delegate artifact descriptors to `factory`.
    pub fn with_artifact_factory(mut self, factory: Box<dyn ProviderFactory>) -> Self {
        self.artifacts = Some(factory);
        self
    }
}

impl ProviderFactory for StandardProviders {
    fn create(&self, descriptor: &ContentDescriptor) -> Result<Arc<dyn ContentProvider>> {
        match descriptor {
            ContentDescriptor::Builtin => Ok(Arc::new(BuiltinContentProvider::default())),
            ContentDescriptor::Folder { path } => Ok(Arc::new(FolderContentProvider::new(path))),
            ContentDescriptor::Artifact { .. } => match &self.artifacts {
                Some(factory) => factory.create(descriptor),
                None => Err(Error::UnsupportedKind {
                    kind: descriptor.kind().to_string(),
                }),
            },
        }
    }
}
