//! Content providers for the extension host.
//!
//! A [`ContentDescriptor`] records where an extension's physical payload comes
//! from; a [`ContentProvider`] checks and synchronises it into a target
//! directory. Synchronisation may block on I/O, so [`spawn_update`] runs it on
//! a tokio blocking pool and hands the outcome back through a [`SyncTicket`].

pub mod background;
pub mod descriptor;
pub mod error;
pub mod folder;
pub mod provider;

pub use background::{SyncTicket, spawn_update};
pub use descriptor::ContentDescriptor;
pub use error::{Error, Result};
pub use folder::FolderContentProvider;
pub use provider::{ContentProvider, ProviderFactory, StandardProviders};
