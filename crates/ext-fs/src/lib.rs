//! Filesystem primitives for the extension host
//!
//! Provides atomic writes, content checksums and directory snapshots used by
//! content providers and the registry store.

pub mod checksum;
pub mod error;
pub mod io;
pub mod tree;

pub use checksum::{compute_bytes_checksum, compute_file_checksum};
pub use error::{Error, Result};
pub use tree::{DirSnapshot, TreeSync, snapshot_dir, sync_tree};
