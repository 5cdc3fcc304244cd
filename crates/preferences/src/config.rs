//! Preference manager configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use storage::StoreConfig;

use crate::error::Result;

/// Configuration for [`PrefManager`](crate::PrefManager)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrefsConfig {
    /// Native store settings
    pub store: StoreConfig,
    /// Flat JSON file holding preferences in the legacy layout
    pub legacy_file: Option<PathBuf>,
    /// Run the legacy import during initialization
    pub import_legacy: bool,
}

impl Default for PrefsConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            legacy_file: None,
            import_legacy: true,
        }
    }
}

impl PrefsConfig {
    /// Create a configuration storing preferences at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { store: StoreConfig::new(path), ..Default::default() }
    }

    /// Configuration backed by a throwaway store (for testing)
    pub fn temporary() -> Self {
        Self { store: StoreConfig::temporary(), ..Default::default() }
    }

    /// Replace the native store settings
    pub fn store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Import legacy preferences from this file on startup
    pub fn legacy_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.legacy_file = Some(path.into());
        self
    }

    /// Enable or disable the legacy import
    pub fn import_legacy(mut self, enabled: bool) -> Self {
        self.import_legacy = enabled;
        self
    }

    /// Load a configuration from a JSON file
    ///
    /// Missing fields take their default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
