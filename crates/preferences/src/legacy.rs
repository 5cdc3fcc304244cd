//! One-time migration of preferences from the legacy layout
//!
//! The importer runs on every startup, so it must be idempotent: a key that
//! already exists in the native store always wins over the legacy value.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::descriptor::{PrefKind, PrefName};
use crate::error::Result;
use crate::manager::PrefManager;
use crate::partition::Partition;
use crate::transfer::native_from_json;

/// Source of preferences written by an older version of the application
pub trait LegacyImporter: Send + Sync {
    /// Copy legacy preferences into `prefs`, returning how many were written
    fn import(&self, prefs: &PrefManager) -> Result<usize>;
}

/// Imports a flat JSON object of `key: value` pairs
///
/// Keys matching a known preference go to that preference's partition,
/// everything else to [`Partition::Irrelevant`].
#[derive(Debug, Clone)]
pub struct JsonLegacyImporter {
    path: PathBuf,
}

impl JsonLegacyImporter {
    /// Create an importer reading from `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File being imported
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<Map<String, Value>>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }
}

/// Partition a legacy key is imported into
fn target_partition(key: &str) -> Partition {
    match PrefName::from_key(key).map(PrefName::data) {
        Some(data) if data.kind == PrefKind::Complex => Partition::Irrelevant,
        Some(data) => data.partition,
        None => Partition::Irrelevant,
    }
}

impl LegacyImporter for JsonLegacyImporter {
    fn import(&self, prefs: &PrefManager) -> Result<usize> {
        let Some(entries) = self.read()? else {
            tracing::debug!("No legacy preferences at {}", self.path.display());
            return Ok(0);
        };

        let mut imported = 0;
        for (key, value) in &entries {
            let store = prefs.resolve(target_partition(key));
            if store.contains(key)? {
                continue;
            }

            match native_from_json(value) {
                Some(native) => {
                    store.put(key, &native)?;
                    imported += 1;
                }
                None => tracing::warn!("Skipping legacy preference {}: unsupported value", key),
            }
        }

        prefs.flush()?;
        Ok(imported)
    }
}
