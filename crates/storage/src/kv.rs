//! Partitioned key-value store for preferences
//!
//! This module provides a durable key-value store backed by sled. A single
//! database holds any number of named partitions (sled trees); each partition
//! is an independent namespace of string keys to [`NativeValue`]s and supports
//! per-key change notifications.

use serde::{Deserialize, Serialize};
use sled::Db;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::value::{NativeKind, NativeValue, StringSet};

/// Key-value store error types
#[derive(Debug, Error)]
pub enum StoreError {
    /// Sled database error
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored value has a different kind than requested
    #[error("Kind mismatch for key {key}: expected {expected}, found {found}")]
    KindMismatch {
        /// Key that was read
        key: String,
        /// Kind the caller asked for
        expected: NativeKind,
        /// Kind actually stored
        found: NativeKind,
    },

    /// Invalid key
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for key-value operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Key-value store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Database directory
    pub path: PathBuf,
    /// Cache capacity in bytes
    pub cache_capacity: u64,
    /// Enable compression
    pub use_compression: bool,
    /// Flush interval in milliseconds (None for flushing only on demand)
    pub flush_every_ms: Option<u64>,
    /// Remove the database when the store is dropped
    pub temporary: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("prefs.db"),
            cache_capacity: 16 * 1024 * 1024, // 16MB
            use_compression: true,
            flush_every_ms: Some(500),
            temporary: false,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with a custom path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), ..Default::default() }
    }

    /// Configuration for a throwaway store (for testing)
    pub fn temporary() -> Self {
        Self { temporary: true, ..Default::default() }
    }

    /// Set cache capacity in bytes
    pub fn cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    /// Enable or disable compression
    pub fn use_compression(mut self, enabled: bool) -> Self {
        self.use_compression = enabled;
        self
    }

    /// Set flush interval in milliseconds
    pub fn flush_every_ms(mut self, ms: Option<u64>) -> Self {
        self.flush_every_ms = ms;
        self
    }
}

/// Database holding the partitions
pub struct NativeStore {
    db: Arc<Db>,
}

impl NativeStore {
    /// Open the store described by the configuration
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let db_config = if config.temporary {
            sled::Config::new().temporary(true)
        } else {
            sled::Config::new().path(&config.path)
        };

        let db = db_config
            .cache_capacity(config.cache_capacity)
            .use_compression(config.use_compression)
            .flush_every_ms(config.flush_every_ms)
            .open()?;

        tracing::debug!(
            "Opened preference store at {} (temporary: {})",
            config.path.display(),
            config.temporary
        );

        Ok(Self { db: Arc::new(db) })
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        Self::open(&StoreConfig::temporary())
    }

    /// Open (creating if needed) a named partition
    pub fn open_partition(&self, name: &str) -> Result<PartitionStore> {
        if name.is_empty() {
            return Err(StoreError::InvalidKey("partition name is empty".to_string()));
        }

        let tree = self.db.open_tree(name.as_bytes())?;
        Ok(PartitionStore { name: name.to_string(), tree })
    }

    /// Flush pending writes of every partition to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

/// One named partition: an independent namespace of keys to native values
#[derive(Clone)]
pub struct PartitionStore {
    name: String,
    tree: sled::Tree,
}

impl std::fmt::Debug for PartitionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionStore")
            .field("name", &self.name)
            .field("len", &self.tree.len())
            .finish()
    }
}

impl PartitionStore {
    /// Partition name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the value stored under a key
    pub fn get(&self, key: &str) -> Result<Option<NativeValue>> {
        match self.tree.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(NativeValue::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Get a value that must be of the given kind
    ///
    /// Returns [`StoreError::KindMismatch`] when the key holds another kind.
    pub fn get_kind(&self, key: &str, kind: NativeKind) -> Result<Option<NativeValue>> {
        match self.get(key)? {
            Some(value) if value.kind() == kind => Ok(Some(value)),
            Some(value) => Err(StoreError::KindMismatch {
                key: key.to_string(),
                expected: kind,
                found: value.kind(),
            }),
            None => Ok(None),
        }
    }

    /// Get a boolean, or `default` when absent
    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        Ok(self
            .get_kind(key, NativeKind::Boolean)?
            .and_then(|v| v.as_bool())
            .unwrap_or(default))
    }

    /// Get an integer, or `default` when absent
    pub fn get_int(&self, key: &str, default: i32) -> Result<i32> {
        Ok(self
            .get_kind(key, NativeKind::Int)?
            .and_then(|v| v.as_int())
            .unwrap_or(default))
    }

    /// Get a float, or `default` when absent
    pub fn get_float(&self, key: &str, default: f32) -> Result<f32> {
        Ok(self
            .get_kind(key, NativeKind::Float)?
            .and_then(|v| v.as_float())
            .unwrap_or(default))
    }

    /// Get a long integer, or `default` when absent
    pub fn get_long(&self, key: &str, default: i64) -> Result<i64> {
        Ok(self
            .get_kind(key, NativeKind::Long)?
            .and_then(|v| v.as_long())
            .unwrap_or(default))
    }

    /// Get a string if present
    pub fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.get_kind(key, NativeKind::String)? {
            Some(NativeValue::String(s)) => Ok(Some(s)),
            _ => Ok(None),
        }
    }

    /// Get a string set if present
    pub fn get_string_set(&self, key: &str) -> Result<Option<StringSet>> {
        match self.get_kind(key, NativeKind::StringSet)? {
            Some(NativeValue::StringSet(s)) => Ok(Some(s)),
            _ => Ok(None),
        }
    }

    /// Store a value, replacing whatever the key held
    pub fn put(&self, key: &str, value: &NativeValue) -> Result<()> {
        let bytes = value.to_bytes()?;
        self.tree.insert(key.as_bytes(), bytes)?;
        Ok(())
    }

    /// Remove a value by key
    pub fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.tree.remove(key.as_bytes())?.is_some())
    }

    /// Check if a key exists
    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.tree.contains_key(key.as_bytes())?)
    }

    /// All keys in the partition
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();

        for item in self.tree.iter() {
            let (key, _) = item?;
            if let Ok(key_str) = String::from_utf8(key.to_vec()) {
                keys.push(key_str);
            }
        }

        Ok(keys)
    }

    /// Every decodable entry in the partition
    ///
    /// Entries whose key is not UTF-8 or whose value cannot be decoded are
    /// skipped with a warning.
    pub fn entries(&self) -> Result<BTreeMap<String, NativeValue>> {
        let mut data = BTreeMap::new();

        for item in self.tree.iter() {
            let (key, value) = item?;
            let Ok(key_str) = String::from_utf8(key.to_vec()) else {
                tracing::warn!("Skipping non UTF-8 key in partition {}", self.name);
                continue;
            };
            match NativeValue::from_bytes(&value) {
                Ok(native) => {
                    data.insert(key_str, native);
                }
                Err(e) => {
                    tracing::warn!("Skipping undecodable entry {}/{}: {}", self.name, key_str, e);
                }
            }
        }

        Ok(data)
    }

    /// Clear all data in this partition
    pub fn clear(&self) -> Result<()> {
        self.tree.clear()?;
        Ok(())
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.tree.flush()?;
        Ok(())
    }

    /// Get the number of keys in the partition
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Check if the partition is empty
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Subscribe to changes of exactly one key
    pub fn watch(&self, key: &str) -> KeyWatcher {
        KeyWatcher {
            key: key.to_string(),
            partition: self.name.clone(),
            subscriber: self.tree.watch_prefix(key.as_bytes()),
        }
    }
}

/// A change observed on a watched key
#[derive(Debug, Clone, PartialEq)]
pub enum KeyChange {
    /// The key now holds this value
    Set(NativeValue),
    /// The key was removed, or holds something that cannot be decoded
    Removed,
}

/// Blocking iterator over changes to a single key
///
/// sled subscribes by prefix, so events for longer keys sharing the prefix are
/// filtered out here. Iteration ends when the partition is dropped.
pub struct KeyWatcher {
    key: String,
    partition: String,
    subscriber: sled::Subscriber,
}

impl KeyWatcher {
    /// Key being watched
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Wait up to `timeout` for the next change to the key
    ///
    /// Returns [`RecvTimeoutError::Disconnected`] once the partition is gone.
    pub fn next_timeout(
        &mut self,
        timeout: Duration,
    ) -> std::result::Result<KeyChange, RecvTimeoutError> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = self.subscriber.next_timeout(remaining)?;
            if let Some(change) = KeyWatcher::filter(self, event) {
                return Ok(change);
            }
        }
    }

    fn filter(&self, event: sled::Event) -> Option<KeyChange> {
        match event {
            sled::Event::Insert { key, value } => {
                if &*key != self.key.as_bytes() {
                    return None;
                }
                match NativeValue::from_bytes(&value) {
                    Ok(native) => Some(KeyChange::Set(native)),
                    Err(e) => {
                        tracing::warn!(
                            "Undecodable change on {}/{}: {}",
                            self.partition,
                            self.key,
                            e
                        );
                        Some(KeyChange::Removed)
                    }
                }
            }
            sled::Event::Remove { key } => {
                (&*key == self.key.as_bytes()).then_some(KeyChange::Removed)
            }
        }
    }
}

impl Iterator for KeyWatcher {
    type Item = KeyChange;

    fn next(&mut self) -> Option<KeyChange> {
        loop {
            let event = self.subscriber.next()?;
            if let Some(change) = KeyWatcher::filter(self, event) {
                return Some(change);
            }
        }
    }
}
