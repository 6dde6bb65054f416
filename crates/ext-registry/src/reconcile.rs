//! Consistency between the installed record and extension declarations.

use std::collections::HashMap;

use ext_model::{ExtensionDescriptor, ExtensionId, ExtensionKind};

use crate::Application;

/// A disagreement between the registry and what extensions declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// Installed, but no descriptor declares this id.
    NotDeclared(ExtensionId),
    KindDiffers {
        id: ExtensionId,
        registered: ExtensionKind,
        declared: ExtensionKind,
    },
    /// Registry nesting disagrees with the declared parent.
    ParentDiffers {
        id: ExtensionId,
        registered: Option<ExtensionId>,
        declared: Option<ExtensionId>,
    },
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotDeclared(id) => write!(f, "extension {id} is installed but not declared"),
            Self::KindDiffers {
                id,
                registered,
                declared,
            } => write!(
                f,
                "extension {id} is registered as {registered} but declared {declared}"
            ),
            Self::ParentDiffers {
                id,
                registered,
                declared,
            } => write!(
                f,
                "extension {id} is installed under {} but declares parent {}",
                display_parent(*registered),
                display_parent(*declared)
            ),
        }
    }
}

fn display_parent(parent: Option<ExtensionId>) -> String {
    parent.map_or_else(|| "<top level>".to_string(), |id| id.to_string())
}

/// Compare every installed entry against the descriptor with the same id.
///
/// Descriptors without an id, or not installed, are ignored here; the
/// validator and graph builder report those.
pub fn reconcile(application: &Application, descriptors: &[ExtensionDescriptor]) -> Vec<Mismatch> {
    let declared: HashMap<ExtensionId, &ExtensionDescriptor> = descriptors
        .iter()
        .filter_map(|d| d.id.map(|id| (id, d)))
        .collect();

    let mut mismatches = Vec::new();
    for (registered_parent, entry) in application.entries() {
        let Some(descriptor) = declared.get(&entry.id) else {
            mismatches.push(Mismatch::NotDeclared(entry.id));
            continue;
        };
        if descriptor.kind != entry.kind {
            mismatches.push(Mismatch::KindDiffers {
                id: entry.id,
                registered: entry.kind,
                declared: descriptor.kind,
            });
        }
        let declared_parent = match descriptor.kind {
            ExtensionKind::Root => None,
            ExtensionKind::Sealed | ExtensionKind::Open => descriptor.parent_id,
        };
        if declared_parent != registered_parent {
            mismatches.push(Mismatch::ParentDiffers {
                id: entry.id,
                registered: registered_parent,
                declared: declared_parent,
            });
        }
    }
    mismatches
}
