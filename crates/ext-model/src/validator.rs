//! Structural validation of extension descriptors.
//!
//! Every rule is checked independently so a single pass reports every
//! violation of a descriptor. Validation is pure; callers decide whether to
//! log and abort.

use std::collections::BTreeSet;

use crate::descriptor::{ExtensionDescriptor, ExtensionKind};
use crate::error::ValidationError;
use crate::id::{ClassName, ExtensionId};

/// A single broken descriptor invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("id is missing")]
    MissingId,

    #[error("parentId is missing")]
    MissingParentId,

    #[error("localClasses is missing")]
    MissingLocalClasses,

    #[error("exportedClasses is missing for an open extension")]
    MissingExportedClasses,

    #[error("classes are both local and exported: {0:?}")]
    ClassesBothLocalAndExported(Vec<ClassName>),

    #[error("root extension declares foreign parent {0}")]
    RootWithForeignParent(ExtensionId),

    #[error("root extension must not export classes")]
    RootExportsClasses,

    #[error("sealed extension must not export classes")]
    SealedExportsClasses,

    #[error("only the root extension may be its own parent")]
    SelfParent,
}

impl Violation {
    /// Name of the descriptor field the violation is about.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingId => "id",
            Self::MissingParentId | Self::RootWithForeignParent(_) | Self::SelfParent => {
                "parentId"
            }
            Self::MissingLocalClasses => "localClasses",
            Self::MissingExportedClasses
            | Self::ClassesBothLocalAndExported(_)
            | Self::RootExportsClasses
            | Self::SealedExportsClasses => "exportedClasses",
        }
    }
}

/// Every violation found for one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Id of the offending descriptor, when it declared one.
    pub extension: Option<ExtensionId>,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Whether any violation concerns `field`.
    pub fn names_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field() == field)
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.extension {
            Some(id) => write!(f, "extension {id}: ")?,
            None => write!(f, "extension <no id>: ")?,
        }
        let messages: Vec<String> = self.violations.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join("; "))
    }
}

/// Check one descriptor and return every violation found.
pub fn validate(descriptor: &ExtensionDescriptor) -> Vec<Violation> {
    let mut violations = Vec::new();
    let is_root = descriptor.kind == ExtensionKind::Root;

    if descriptor.id.is_none() {
        violations.push(Violation::MissingId);
    }

    match (descriptor.parent_id, descriptor.id) {
        (None, _) if !is_root => violations.push(Violation::MissingParentId),
        (Some(parent), Some(id)) if is_root && parent != id => {
            violations.push(Violation::RootWithForeignParent(parent));
        }
        (Some(parent), Some(id)) if !is_root && parent == id => {
            violations.push(Violation::SelfParent);
        }
        _ => {}
    }

    if descriptor.local_classes.is_none() {
        violations.push(Violation::MissingLocalClasses);
    }

    let exports_something = descriptor
        .exported_classes
        .as_ref()
        .is_some_and(|exported| !exported.is_empty());
    match descriptor.kind {
        ExtensionKind::Open => match (&descriptor.local_classes, &descriptor.exported_classes) {
            (_, None) => violations.push(Violation::MissingExportedClasses),
            (Some(local), Some(exported)) => {
                let shared: BTreeSet<&ClassName> = local.intersection(exported).collect();
                if !shared.is_empty() {
                    violations.push(Violation::ClassesBothLocalAndExported(
                        shared.into_iter().cloned().collect(),
                    ));
                }
            }
            (None, Some(_)) => {}
        },
        ExtensionKind::Root if exports_something => {
            violations.push(Violation::RootExportsClasses);
        }
        ExtensionKind::Sealed if exports_something => {
            violations.push(Violation::SealedExportsClasses);
        }
        ExtensionKind::Root | ExtensionKind::Sealed => {}
    }

    violations
}

/// Validate a whole descriptor set, logging and aggregating every report.
pub fn validate_all(descriptors: &[ExtensionDescriptor]) -> Result<(), ValidationError> {
    let reports: Vec<ValidationReport> = descriptors
        .iter()
        .filter_map(|descriptor| {
            let violations = validate(descriptor);
            (!violations.is_empty()).then(|| ValidationReport {
                extension: descriptor.id,
                violations,
            })
        })
        .collect();

    if reports.is_empty() {
        return Ok(());
    }

    for report in &reports {
        tracing::warn!(%report, "invalid extension descriptor");
    }
    Err(ValidationError { reports })
}
