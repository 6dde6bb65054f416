//! File-backed registry persistence.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::mapper::{Format, Mapper};
use crate::{Application, Error, Result};

/// Loads and saves an [`Application`] record at a fixed path.
///
/// The format is taken from the file extension unless given explicitly.
pub struct RegistryStore {
    path: PathBuf,
    mapper: Box<dyn Mapper>,
}

impl RegistryStore {
    /// Open a store whose format follows `path`'s extension.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = Format::from_path(&path)?;
        Ok(Self::with_mapper(path, format.mapper()))
    }

    pub fn with_mapper(path: impl Into<PathBuf>, mapper: Box<dyn Mapper>) -> Self {
        Self {
            path: path.into(),
            mapper,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Format {
        self.mapper.format()
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn load(&self) -> Result<Application> {
        let file = File::open(&self.path).map_err(|e| ext_fs::Error::io(&self.path, e))?;
        let application = self.mapper.read(&mut BufReader::new(file))?;
        tracing::debug!(
            path = %self.path.display(),
            extensions = application.len(),
            "registry loaded"
        );
        Ok(application)
    }

    /// Load the record, or build a fresh one when the file does not exist.
    ///
    /// A file that exists but cannot be parsed is still an error.
    pub fn load_or_else(&self, default: impl FnOnce() -> Application) -> Result<Application> {
        if self.exists() {
            return self.load();
        }
        tracing::info!(path = %self.path.display(), "no registry found, starting empty");
        Ok(default())
    }

    /// Write the record atomically.
    pub fn save(&self, application: &Application) -> Result<()> {
        application.check_unique()?;
        let mut buffer = Vec::new();
        self.mapper.write(application, &mut buffer)?;
        ext_fs::io::write_atomic(&self.path, &buffer).map_err(Error::from)?;
        tracing::debug!(path = %self.path.display(), "registry saved");
        Ok(())
    }
}

impl std::fmt::Debug for RegistryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryStore")
            .field("path", &self.path)
            .field("format", &self.mapper.format())
            .finish()
    }
}
