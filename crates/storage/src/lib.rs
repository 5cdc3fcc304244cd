//! Native preference storage
//!
//! This crate provides the durable, partitioned key-value store that the
//! preference layer sits on: a fixed set of native value kinds, one sled tree
//! per partition, and per-key change notifications.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod kv;
pub mod value;

pub use kv::{KeyChange, KeyWatcher, NativeStore, PartitionStore, StoreConfig, StoreError};
pub use value::{NativeKind, NativeValue, StringSet};
