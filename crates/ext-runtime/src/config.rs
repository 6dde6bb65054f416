//! Runtime configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What to do when an extension's container cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort for the root, required extensions and any extension with a
    /// required descendant; disable the subtree otherwise.
    #[default]
    CriticalPath,
    /// Any failure aborts the boot.
    Abort,
    /// Disable the failing subtree and keep going. A failing root still
    /// aborts.
    DisableSubtree,
}

/// Settings for booting and serving extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub failure_policy: FailurePolicy,
    /// Re-synchronise extension content even when it reports up to date.
    pub dev_mode: bool,
    /// Instantiate singletons while containers are built.
    pub eager_singletons: bool,
    /// Where synchronised extension content is placed.
    pub content_dir: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            dev_mode: false,
            eager_singletons: true,
            content_dir: None,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a file.
    ///
    /// Format is detected from file extension:
    /// - `.toml` -> TOML
    /// - `.json` -> JSON
    /// - `.yaml`, `.yml` -> YAML
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = ext_fs::io::read_text(path)?;
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let parse_error = |format: &'static str, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        };

        match extension.as_str() {
            "toml" => toml::from_str(&content).map_err(|e| parse_error("TOML", e.to_string())),
            "json" => {
                serde_json::from_str(&content).map_err(|e| parse_error("JSON", e.to_string()))
            }
            "yaml" | "yml" => {
                serde_yaml::from_str(&content).map_err(|e| parse_error("YAML", e.to_string()))
            }
            _ => Err(ConfigError::UnsupportedFormat { extension }),
        }
    }

    /// Load from `path` when it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no runtime config, using defaults");
            Ok(Self::default())
        }
    }
}
