//! Extension declarations.
//!
//! [`ExtensionDescriptor`] is the raw declaration as read from a manifest or
//! supplied by a module; any field may be absent so that the validator can
//! report every problem at once. [`Extension`] is the validated form the rest
//! of the runtime works with.
//!
//! # Example TOML
//!
//! ```toml
//! id = "6f1d3c1e-8f7a-4b7e-9d8e-2a1b3c4d5e6f"
//! parent_id = "00000000-0000-0000-0000-000000000000"
//! kind = "open"
//! local_classes = ["org.example.ServiceA"]
//! exported_classes = ["org.example.Facade"]
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::{ClassName, ExtensionId};
use crate::validator::{self, ValidationReport};

/// The three extension variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionKind {
    /// Tree root: its parent is itself, it exports nothing.
    Root,
    /// Has a parent, contributes local classes only, cannot be extended.
    Sealed,
    /// Has a parent, contributes local and exported classes, may be extended.
    Open,
}

impl ExtensionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Sealed => "sealed",
            Self::Open => "open",
        }
    }

    /// Whether descendants may attach to an extension of this kind.
    pub fn is_extensible(&self) -> bool {
        matches!(self, Self::Root | Self::Open)
    }
}

impl std::fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw, possibly incomplete, extension declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ExtensionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ExtensionId>,
    pub kind: ExtensionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_classes: Option<BTreeSet<ClassName>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_classes: Option<BTreeSet<ClassName>>,
    /// Whether boot must abort if this extension cannot be loaded.
    #[serde(default)]
    pub required: bool,
}

fn class_set<I, C>(classes: I) -> BTreeSet<ClassName>
where
    I: IntoIterator<Item = C>,
    C: Into<ClassName>,
{
    classes.into_iter().map(Into::into).collect()
}

impl ExtensionDescriptor {
    /// Declare the root extension.
    pub fn root<I, C>(id: ExtensionId, local: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ClassName>,
    {
        Self {
            id: Some(id),
            parent_id: Some(id),
            kind: ExtensionKind::Root,
            local_classes: Some(class_set(local)),
            exported_classes: None,
            required: true,
        }
    }

    /// Declare a sealed extension.
    pub fn sealed<I, C>(id: ExtensionId, parent: ExtensionId, local: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ClassName>,
    {
        Self {
            id: Some(id),
            parent_id: Some(parent),
            kind: ExtensionKind::Sealed,
            local_classes: Some(class_set(local)),
            exported_classes: None,
            required: false,
        }
    }

    /// Declare an open extension.
    pub fn open<I, C, E, D>(id: ExtensionId, parent: ExtensionId, local: I, exported: E) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ClassName>,
        E: IntoIterator<Item = D>,
        D: Into<ClassName>,
    {
        Self {
            id: Some(id),
            parent_id: Some(parent),
            kind: ExtensionKind::Open,
            local_classes: Some(class_set(local)),
            exported_classes: Some(class_set(exported)),
            required: false,
        }
    }

    /// Mark this extension as required for boot.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Parse a descriptor from a TOML manifest.
    ///
    /// Parsing does not validate; run [`validator::validate`] or convert with
    /// [`Extension::try_from`] to check invariants.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a descriptor from a manifest file.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ManifestNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Serialize the descriptor back to a TOML manifest.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::ManifestSerialize(e.to_string()))
    }
}

/// A validated extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    id: ExtensionId,
    parent_id: ExtensionId,
    kind: ExtensionKind,
    local_classes: BTreeSet<ClassName>,
    exported_classes: BTreeSet<ClassName>,
    required: bool,
}

impl Extension {
    pub fn id(&self) -> ExtensionId {
        self.id
    }

    /// Declared parent id; for the root this is its own id.
    pub fn parent_id(&self) -> ExtensionId {
        self.parent_id
    }

    /// The parent in the tree, `None` for the root.
    pub fn parent(&self) -> Option<ExtensionId> {
        (!self.is_root()).then_some(self.parent_id)
    }

    pub fn kind(&self) -> ExtensionKind {
        self.kind
    }

    pub fn is_root(&self) -> bool {
        self.kind == ExtensionKind::Root
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn local_classes(&self) -> &BTreeSet<ClassName> {
        &self.local_classes
    }

    /// Exported classes; always empty unless the extension is open.
    pub fn exported_classes(&self) -> &BTreeSet<ClassName> {
        &self.exported_classes
    }

    /// Every class this extension contributes to its own container.
    pub fn contributed_classes(&self) -> impl Iterator<Item = &ClassName> {
        self.local_classes.iter().chain(self.exported_classes.iter())
    }
}

impl TryFrom<ExtensionDescriptor> for Extension {
    type Error = ValidationReport;

    fn try_from(descriptor: ExtensionDescriptor) -> std::result::Result<Self, Self::Error> {
        let violations = validator::validate(&descriptor);
        if !violations.is_empty() {
            return Err(ValidationReport {
                extension: descriptor.id,
                violations,
            });
        }

        let report = |violation| ValidationReport {
            extension: descriptor.id,
            violations: vec![violation],
        };
        let id = descriptor
            .id
            .ok_or_else(|| report(validator::Violation::MissingId))?;
        let local_classes = descriptor
            .local_classes
            .ok_or_else(|| report(validator::Violation::MissingLocalClasses))?;
        let exported_classes = match descriptor.kind {
            ExtensionKind::Open => descriptor.exported_classes.unwrap_or_default(),
            ExtensionKind::Root | ExtensionKind::Sealed => BTreeSet::new(),
        };

        Ok(Self {
            id,
            parent_id: descriptor.parent_id.unwrap_or(id),
            kind: descriptor.kind,
            local_classes,
            exported_classes,
            required: descriptor.required,
        })
    }
}

impl From<&Extension> for ExtensionDescriptor {
    fn from(extension: &Extension) -> Self {
        Self {
            id: Some(extension.id),
            parent_id: Some(extension.parent_id),
            kind: extension.kind,
            local_classes: Some(extension.local_classes.clone()),
            exported_classes: (extension.kind == ExtensionKind::Open)
                .then(|| extension.exported_classes.clone()),
            required: extension.required,
        }
    }
}
