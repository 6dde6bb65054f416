//! Extension model for the extension host.
//!
//! This crate describes extensions declaratively, validates descriptor sets
//! and orders them into a parent-before-child load plan.

pub mod descriptor;
pub mod error;
pub mod graph;
pub mod id;
pub mod validator;

/// The canonical filename for an extension declaration manifest.
///
/// An extension's content folder carries a file with this name declaring its
/// identity, parent and contributed classes.
pub const MANIFEST_FILENAME: &str = "extension.toml";

pub use descriptor::{Extension, ExtensionDescriptor, ExtensionKind};
pub use error::{Error, GraphError, Result, ValidationError};
pub use graph::{ExtensionGraph, ExtensionNode, LoadStatus};
pub use id::{ClassName, ExtensionId};
pub use validator::{ValidationReport, Violation, validate, validate_all};
