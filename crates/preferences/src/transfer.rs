//! Bulk export and import of partitions
//!
//! Exported entries carry their native kind so a backup restores exactly.
//! Imports also accept plain JSON values and infer the kind from the JSON
//! shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use storage::{NativeValue, StringSet};

use crate::error::Result;
use crate::manager::PrefManager;
use crate::partition::Partition;

/// Outcome of an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    /// Entries written
    pub imported: usize,
    /// Entries skipped because their JSON shape is not supported
    pub skipped: usize,
}

/// Every physical partition's contents in one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    /// Entries keyed by partition store name, then preference key
    pub partitions: BTreeMap<String, BTreeMap<String, NativeValue>>,
}

impl Backup {
    /// Total number of entries
    pub fn len(&self) -> usize {
        self.partitions.values().map(BTreeMap::len).sum()
    }

    /// Whether the backup holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Convert a JSON value to the native value it would be stored as
///
/// Numbers that fit 32 bits become `Int`, other integers `Long`, anything
/// fractional `Float`. Arrays become string sets of their stringified
/// elements. Objects are accepted only in the exported `{"type", "value"}`
/// shape.
pub fn native_from_json(value: &Value) -> Option<NativeValue> {
    match value {
        Value::Bool(b) => Some(NativeValue::Boolean(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(match i32::try_from(i) {
                    Ok(small) => NativeValue::Int(small),
                    Err(_) => NativeValue::Long(i),
                })
            } else {
                n.as_f64().map(|f| NativeValue::Float(f as f32))
            }
        }
        Value::String(s) => Some(NativeValue::String(s.clone())),
        Value::Array(items) => Some(NativeValue::StringSet(
            items.iter().map(stringify).collect::<StringSet>(),
        )),
        Value::Object(_) => serde_json::from_value(value.clone()).ok(),
        Value::Null => None,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl PrefManager {
    /// All entries of a partition
    pub fn export_all(&self, partition: Partition) -> Result<BTreeMap<String, NativeValue>> {
        Ok(self.resolve(partition).entries()?)
    }

    /// Write every entry of `entries` into a partition
    ///
    /// Unsupported values are reported and skipped; the remaining entries are
    /// still imported.
    pub fn import_all(&self, entries: &Map<String, Value>, partition: Partition) -> ImportReport {
        let store = self.resolve(partition);
        let mut report = ImportReport::default();

        for (key, value) in entries {
            let Some(native) = native_from_json(value) else {
                tracing::warn!("Skipping {} in {}: unsupported value {}", key, store.name(), value);
                self.report("Error importing preference: Type not supported");
                report.skipped += 1;
                continue;
            };

            match store.put(key, &native) {
                Ok(()) => report.imported += 1,
                Err(e) => {
                    tracing::error!("Failed to import {}/{}: {}", store.name(), key, e);
                    self.report(&format!("Error saving preference: {}", e));
                    report.skipped += 1;
                }
            }
        }

        tracing::info!(
            "Imported {} preferences into {} ({} skipped)",
            report.imported,
            store.name(),
            report.skipped
        );
        report
    }

    /// Snapshot every physical partition
    pub fn export_backup(&self) -> Result<Backup> {
        let mut backup = Backup::default();
        for partition in Partition::PHYSICAL {
            backup
                .partitions
                .insert(partition.store_name().to_string(), self.export_all(partition)?);
        }
        Ok(backup)
    }

    /// Restore a backup over the current contents
    ///
    /// Keys absent from the backup are left untouched. Partitions the backup
    /// names but this build does not know are skipped.
    pub fn import_backup(&self, backup: &Backup) -> Result<usize> {
        let mut restored = 0;
        for (name, entries) in &backup.partitions {
            let known = Partition::PHYSICAL.into_iter().find(|p| p.store_name() == name.as_str());
            let Some(partition) = known else {
                tracing::warn!("Backup names unknown partition {}", name);
                continue;
            };

            let store = self.resolve(partition);
            for (key, value) in entries {
                store.put(key, value)?;
                restored += 1;
            }
        }
        self.flush()?;
        Ok(restored)
    }
}
