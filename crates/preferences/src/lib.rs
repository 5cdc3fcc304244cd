//! Typed preferences over partitioned native storage
//!
//! This crate maps a table of statically declared preferences onto the
//! partitioned key-value store from the `storage` crate. It provides:
//! - Typed reads with default fallback and typed writes
//! - Homogeneous sets encoded as tagged string sets
//! - Complex values stored as checksummed Base64 blobs
//! - Custom keys outside the descriptor table
//! - Live values that follow a key's changes
//! - Partition export/import, whole-store backups and legacy migration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blob;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod legacy;
pub mod live;
pub mod manager;
pub mod notify;
pub mod partition;
pub mod set_codec;
pub mod transfer;
pub mod value;

pub use blob::BlobError;
pub use config::PrefsConfig;
pub use descriptor::{PrefData, PrefKind, PrefName};
pub use error::{PrefError, Result};
pub use legacy::{JsonLegacyImporter, LegacyImporter};
pub use live::{AnyLiveValue, LiveKind, LiveValue};
pub use manager::PrefManager;
pub use notify::{BroadcastNotifier, Notifier, TracingNotifier};
pub use partition::Partition;
pub use transfer::{Backup, ImportReport};
pub use value::{Complex, PrefType, PrefValue, TypedSet};
