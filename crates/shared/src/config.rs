//! Configuration types for ADSM

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Prefix that forces an identifier to be looked up in ADDB
pub const DEFAULT_REFERENCE_PREFIX: &str = "addb:";

/// Extension of declaration files
pub const DEFAULT_EXTENSION: &str = "smspec";

/// How the ADDB component store is scanned and addressed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Prefix marking an identifier as living in the store
    pub reference_prefix: String,

    /// Only files with this extension are parsed
    pub extension: String,

    /// Per-directory file listing names to skip
    pub ignore_file: String,

    /// Directory names that are never entered
    pub skip_dirs: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            reference_prefix: DEFAULT_REFERENCE_PREFIX.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            ignore_file: ".gitignore".to_string(),
            skip_dirs: vec![".git".to_string()],
        }
    }
}

impl StoreConfig {
    /// Strip the store prefix, if present
    pub fn strip_prefix<'a>(&self, id: &'a str) -> &'a str {
        id.strip_prefix(self.reference_prefix.as_str()).unwrap_or(id)
    }

    /// Whether an identifier is explicitly addressed to the store
    pub fn is_store_reference(&self, id: &str) -> bool {
        id.starts_with(self.reference_prefix.as_str())
    }
}

/// Loader configuration (`adsm.json`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoaderConfig {
    pub store: StoreConfig,

    /// ADDB location used when a document does not name one
    pub default_store: Option<String>,
}

impl LoaderConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Builder: set the fallback store location
    pub fn with_default_store(mut self, location: impl Into<String>) -> Self {
        self.default_store = Some(location.into());
        self
    }
}
