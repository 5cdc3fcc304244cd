//! Preference router and typed accessor
//!
//! [`PrefManager`] opens every partition once and routes each read or write
//! to the partition named by the preference's descriptor. Reads never fail:
//! an absent key, a stored value of the wrong kind or an undecodable blob all
//! resolve to a default. Writes report failures on the notification channel
//! instead of returning them.

use std::sync::Arc;
use storage::{NativeKind, NativeStore, NativeValue, PartitionStore};

use crate::blob;
use crate::config::PrefsConfig;
use crate::descriptor::{PrefKind, PrefName};
use crate::error::Result;
use crate::legacy::{JsonLegacyImporter, LegacyImporter};
use crate::notify::Notifier;
use crate::partition::Partition;
use crate::set_codec;
use crate::value::{PrefType, PrefValue};

/// Handles for the eight physical partitions
pub(crate) struct Partitions {
    general: PartitionStore,
    anime: PartitionStore,
    manga: PartitionStore,
    player: PartitionStore,
    reader: PartitionStore,
    irrelevant: PartitionStore,
    anime_downloads: PartitionStore,
    protected: PartitionStore,
}

impl Partitions {
    fn open(store: &NativeStore) -> Result<Self> {
        let open = |p: Partition| store.open_partition(p.store_name());

        Ok(Self {
            general: open(Partition::General)?,
            anime: open(Partition::Anime)?,
            manga: open(Partition::Manga)?,
            player: open(Partition::Player)?,
            reader: open(Partition::Reader)?,
            irrelevant: open(Partition::Irrelevant)?,
            anime_downloads: open(Partition::AnimeDownloads)?,
            protected: open(Partition::Protected)?,
        })
    }
}

/// Typed access to every preference partition
///
/// # Example
///
/// ```no_run
/// use preferences::{PrefManager, PrefName, PrefsConfig, TracingNotifier};
/// use std::sync::Arc;
///
/// let prefs = PrefManager::init(&PrefsConfig::new("prefs.db"), Arc::new(TracingNotifier))?;
///
/// prefs.set(PrefName::ShowNSFW, true);
/// let show: bool = prefs.get(PrefName::ShowNSFW);
/// assert!(show);
/// # Ok::<(), preferences::PrefError>(())
/// ```
pub struct PrefManager {
    store: NativeStore,
    partitions: Partitions,
    notifier: Arc<dyn Notifier>,
}

impl PrefManager {
    /// Open every partition and run the configured legacy import
    pub fn init(config: &PrefsConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let importer = match (&config.legacy_file, config.import_legacy) {
            (Some(path), true) => Some(JsonLegacyImporter::new(path)),
            _ => None,
        };

        Self::init_with_importer(
            config,
            notifier,
            importer.as_ref().map(|i| i as &dyn LegacyImporter),
        )
    }

    /// Open every partition, then run `importer` once before returning
    ///
    /// A failing import is logged and does not fail initialization.
    pub fn init_with_importer(
        config: &PrefsConfig,
        notifier: Arc<dyn Notifier>,
        importer: Option<&dyn LegacyImporter>,
    ) -> Result<Self> {
        let store = NativeStore::open(&config.store)?;
        let partitions = Partitions::open(&store)?;
        let manager = Self { store, partitions, notifier };

        if let Some(importer) = importer {
            match importer.import(&manager) {
                Ok(count) => tracing::info!("Imported {} legacy preferences", count),
                Err(e) => tracing::warn!("Legacy preference import failed: {}", e),
            }
        }

        tracing::info!("Preferences initialized with {} partitions", Partition::PHYSICAL.len());
        Ok(manager)
    }

    /// The storage handle for a partition
    pub fn resolve(&self, partition: Partition) -> &PartitionStore {
        match partition.physical() {
            Partition::General | Partition::Ui => &self.partitions.general,
            Partition::Anime => &self.partitions.anime,
            Partition::Manga => &self.partitions.manga,
            Partition::Player => &self.partitions.player,
            Partition::Reader | Partition::NovelReader => &self.partitions.reader,
            Partition::Irrelevant => &self.partitions.irrelevant,
            Partition::AnimeDownloads => &self.partitions.anime_downloads,
            Partition::Protected => &self.partitions.protected,
        }
    }

    /// The anime downloads partition, for download bookkeeping done outside
    /// the descriptor table
    pub fn anime_downloads(&self) -> &PartitionStore {
        &self.partitions.anime_downloads
    }

    /// Flush pending writes of every partition to disk
    pub fn flush(&self) -> Result<()> {
        self.store.flush()?;
        Ok(())
    }

    pub(crate) fn report(&self, message: &str) {
        self.notifier.notify(message);
    }

    /// Current value of a preference, or its descriptor default
    pub fn get_value(&self, name: PrefName) -> PrefValue {
        let data = name.data();
        self.read_logged(name.key(), data.kind, data.partition)
            .unwrap_or(data.default)
    }

    /// Typed read falling back to the descriptor default
    ///
    /// When `T` does not match the declared kind the descriptor default cannot
    /// be expressed as `T` either, and `T::default()` is returned.
    pub fn get<T: PrefType + Default>(&self, name: PrefName) -> T {
        let data = name.data();
        if let Some(value) = self
            .read_logged(name.key(), data.kind, data.partition)
            .and_then(T::from_pref_value)
        {
            return value;
        }

        T::from_pref_value(data.default).unwrap_or_else(|| {
            tracing::warn!(
                "{} is declared {:?}; requested type does not match",
                name.key(),
                data.kind
            );
            T::default()
        })
    }

    /// Typed read falling back to `default`
    pub fn get_or<T: PrefType>(&self, name: PrefName, default: T) -> T {
        let data = name.data();
        self.read_logged(name.key(), data.kind, data.partition)
            .and_then(T::from_pref_value)
            .unwrap_or(default)
    }

    /// Typed read that may produce no value
    ///
    /// Absent scalar and set preferences yield the descriptor default; an
    /// absent complex preference, or any failure, yields `default`.
    pub fn get_nullable<T: PrefType>(&self, name: PrefName, default: Option<T>) -> Option<T> {
        let data = name.data();
        match self.read_stored(name.key(), data.kind, data.partition) {
            Ok(Some(value)) => T::from_pref_value(value).or(default),
            Ok(None) if data.kind == PrefKind::Complex => default,
            Ok(None) => T::from_pref_value(data.default).or(default),
            Err(e) => {
                tracing::debug!("Falling back for {}: {}", name.key(), e);
                default
            }
        }
    }

    /// Store a preference
    ///
    /// Empty sets are ignored. Complex values go to the Irrelevant partition.
    pub fn set<T: PrefType>(&self, name: PrefName, value: T) {
        match value.into_pref_value() {
            Ok(value) => self.set_value(name, Some(value)),
            Err(e) => self.report(&format!("Error serializing preference: {}", e)),
        }
    }

    /// Store a dynamic value; `None` removes the preference
    pub fn set_value(&self, name: PrefName, value: Option<PrefValue>) {
        let data = name.data();
        let partition = match value {
            None if data.kind == PrefKind::Complex => Partition::Irrelevant,
            _ => data.partition,
        };
        self.write(partition, name.key(), value);
    }

    /// Remove a preference so reads return its default again
    pub fn remove(&self, name: PrefName) {
        self.set_value(name, None);
    }

    /// Read a key without a descriptor from the Irrelevant partition
    ///
    /// The kind is taken from `default`.
    pub fn get_custom<T: PrefType>(&self, key: &str, default: T) -> T {
        let kind = default.pref_kind();
        self.read_logged(key, kind, Partition::Irrelevant)
            .and_then(T::from_pref_value)
            .unwrap_or(default)
    }

    /// Like [`get_custom`](Self::get_custom), but a `None` default reads the
    /// key as a complex value
    pub fn get_nullable_custom<T: PrefType>(&self, key: &str, default: Option<T>) -> Option<T> {
        let kind = default.as_ref().map_or(PrefKind::Complex, PrefType::pref_kind);
        self.read_logged(key, kind, Partition::Irrelevant)
            .and_then(T::from_pref_value)
            .or(default)
    }

    /// Store a key without a descriptor in the Irrelevant partition
    pub fn set_custom<T: PrefType>(&self, key: &str, value: T) {
        match value.into_pref_value() {
            Ok(value) => self.write(Partition::Irrelevant, key, Some(value)),
            Err(e) => self.report(&format!("Error serializing preference: {}", e)),
        }
    }

    /// Store a dynamic value under a custom key; `None` removes it
    pub fn set_custom_value(&self, key: &str, value: Option<PrefValue>) {
        self.write(Partition::Irrelevant, key, value);
    }

    /// Remove a custom key
    pub fn remove_custom(&self, key: &str) {
        self.write(Partition::Irrelevant, key, None);
    }

    fn read_logged(&self, key: &str, kind: PrefKind, partition: Partition) -> Option<PrefValue> {
        match self.read_stored(key, kind, partition) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("Falling back to default for {}: {}", key, e);
                None
            }
        }
    }

    fn read_stored(
        &self,
        key: &str,
        kind: PrefKind,
        partition: Partition,
    ) -> Result<Option<PrefValue>> {
        let store = self.resolve(partition);
        let value = match kind {
            PrefKind::Boolean => store
                .get_kind(key, NativeKind::Boolean)?
                .and_then(|v| v.as_bool())
                .map(PrefValue::Boolean),
            PrefKind::Int => store
                .get_kind(key, NativeKind::Int)?
                .and_then(|v| v.as_int())
                .map(PrefValue::Int),
            PrefKind::Float => store
                .get_kind(key, NativeKind::Float)?
                .and_then(|v| v.as_float())
                .map(PrefValue::Float),
            PrefKind::Long => store
                .get_kind(key, NativeKind::Long)?
                .and_then(|v| v.as_long())
                .map(PrefValue::Long),
            PrefKind::String => store.get_string(key)?.map(PrefValue::String),
            PrefKind::Set => store
                .get_string_set(key)?
                .and_then(set_codec::decode)
                .map(PrefValue::Set),
            PrefKind::Complex => return self.read_blob(key),
        };
        Ok(value)
    }

    fn read_blob(&self, key: &str) -> Result<Option<PrefValue>> {
        let Some(text) = self.partitions.irrelevant.get_string(key)? else {
            return Ok(None);
        };

        match blob::decode(&text) {
            Ok(value) => Ok(Some(PrefValue::Complex(value))),
            Err(e) => {
                self.report(&format!("Error deserializing preference: {}", e));
                Err(e.into())
            }
        }
    }

    fn write(&self, partition: Partition, key: &str, value: Option<PrefValue>) {
        let store = self.resolve(partition);
        let result = match value {
            None => store.remove(key).map(|_| ()),
            Some(PrefValue::Set(set)) => match set_codec::encode(&set) {
                Some(encoded) => store.put(key, &NativeValue::StringSet(encoded)),
                None => {
                    tracing::debug!("Ignoring empty set written to {}", key);
                    return;
                }
            },
            Some(PrefValue::Complex(value)) => match blob::encode(&value) {
                Ok(text) => self.partitions.irrelevant.put(key, &NativeValue::String(text)),
                Err(e) => {
                    self.report(&format!("Error serializing preference: {}", e));
                    return;
                }
            },
            Some(PrefValue::Boolean(b)) => store.put(key, &NativeValue::Boolean(b)),
            Some(PrefValue::Int(i)) => store.put(key, &NativeValue::Int(i)),
            Some(PrefValue::Float(f)) => store.put(key, &NativeValue::Float(f)),
            Some(PrefValue::Long(l)) => store.put(key, &NativeValue::Long(l)),
            Some(PrefValue::String(s)) => store.put(key, &NativeValue::String(s)),
        };

        if let Err(e) = result {
            tracing::error!("Failed to write preference {}/{}: {}", store.name(), key, e);
            self.report(&format!("Error saving preference: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MockNotifier;
    use crate::value::{Complex, TypedSet};
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeSet;
    use storage::StringSet;

    fn manager() -> PrefManager {
        PrefManager::init(&PrefsConfig::temporary(), Arc::new(MockNotifier::new())).unwrap()
    }

    fn manager_with(notifier: MockNotifier) -> PrefManager {
        PrefManager::init(&PrefsConfig::temporary(), Arc::new(notifier)).unwrap()
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct SourceOrder {
        names: Vec<String>,
    }

    #[test]
    fn test_defaults_when_never_written() {
        let prefs = manager();
        assert!(!prefs.get::<bool>(PrefName::ShowNSFW));
        assert_eq!(prefs.get::<i32>(PrefName::SkipTime), 85);
        assert_eq!(prefs.get::<f32>(PrefName::PlayerSpeed), 1.0);
        assert_eq!(prefs.get::<i64>(PrefName::LastUpdateCheck), 0);
        assert_eq!(prefs.get::<String>(PrefName::Theme), "PURPLE");
        assert!(prefs.get::<BTreeSet<i32>>(PrefName::ShownNotificationIds).is_empty());
        assert_eq!(
            prefs.get::<Complex<Vec<bool>>>(PrefName::HomeLayout).0,
            vec![true; 6]
        );
    }

    #[test]
    fn test_native_round_trips() {
        let prefs = manager();

        prefs.set(PrefName::OfflineMode, true);
        prefs.set(PrefName::DefaultStartUpTab, 2);
        prefs.set(PrefName::PlayerSpeed, 1.75f32);
        prefs.set(PrefName::LastUpdateCheck, 1_700_000_000_123i64);
        prefs.set(PrefName::Theme, "OCEAN".to_string());

        assert!(prefs.get::<bool>(PrefName::OfflineMode));
        assert_eq!(prefs.get::<i32>(PrefName::DefaultStartUpTab), 2);
        assert_eq!(prefs.get::<f32>(PrefName::PlayerSpeed), 1.75);
        assert_eq!(prefs.get::<i64>(PrefName::LastUpdateCheck), 1_700_000_000_123);
        assert_eq!(prefs.get::<String>(PrefName::Theme), "OCEAN");
    }

    #[test]
    fn test_non_finite_float_round_trip() {
        let prefs = manager();

        prefs.set(PrefName::PlayerSpeed, f32::INFINITY);
        assert_eq!(prefs.get::<f32>(PrefName::PlayerSpeed), f32::INFINITY);
        assert_eq!(
            prefs.export_all(Partition::Player).unwrap()["PlayerSpeed"],
            NativeValue::Float(f32::INFINITY)
        );

        prefs.set(PrefName::PlayerSpeed, f32::NAN);
        assert!(prefs.get::<f32>(PrefName::PlayerSpeed).is_nan());
    }

    #[test]
    fn test_values_land_in_declared_partition() {
        let prefs = manager();

        prefs.set(PrefName::SkipTime, 90);
        prefs.set(PrefName::ImmersiveMode, true);
        prefs.set(PrefName::NovelLineHeight, 1.6f32);

        assert!(prefs.resolve(Partition::Player).contains("SkipTime").unwrap());
        assert!(!prefs.resolve(Partition::General).contains("SkipTime").unwrap());
        assert!(prefs.resolve(Partition::General).contains("ImmersiveMode").unwrap());
        assert!(prefs.resolve(Partition::Reader).contains("NovelLineHeight").unwrap());
    }

    #[test]
    fn test_show_nsfw_scenario() {
        let prefs = manager();

        prefs.set(PrefName::ShowNSFW, true);
        assert!(prefs.get::<bool>(PrefName::ShowNSFW));

        prefs.remove(PrefName::ShowNSFW);
        assert!(!prefs.get::<bool>(PrefName::ShowNSFW));
    }

    #[test]
    fn test_set_round_trip() {
        let prefs = manager();
        let ids: BTreeSet<i32> = [4, 8, 15].into_iter().collect();

        prefs.set(PrefName::ShownNotificationIds, ids.clone());

        assert_eq!(prefs.get::<BTreeSet<i32>>(PrefName::ShownNotificationIds), ids);
        let stored = prefs
            .resolve(Partition::Irrelevant)
            .get_string_set("ShownNotificationIds")
            .unwrap()
            .unwrap();
        assert_eq!(stored.get(0), Some("Int"));
    }

    #[test]
    fn test_empty_set_is_ignored() {
        let prefs = manager();
        let history: BTreeSet<String> = ["naruto".to_string()].into_iter().collect();

        prefs.set(PrefName::SearchHistory, history.clone());
        prefs.set(PrefName::SearchHistory, BTreeSet::<String>::new());

        assert_eq!(prefs.get::<BTreeSet<String>>(PrefName::SearchHistory), history);
    }

    #[test]
    fn test_unknown_set_tag_returns_raw() {
        let prefs = manager();
        let raw = StringSet::from_ordered(vec!["Char".into(), "a".into(), "b".into()]);
        prefs
            .resolve(Partition::Anime)
            .put("PinnedAnimeSources", &NativeValue::StringSet(raw.clone()))
            .unwrap();

        assert_eq!(
            prefs.get::<TypedSet>(PrefName::PinnedAnimeSources),
            TypedSet::Raw(raw)
        );
    }

    #[test]
    fn test_typed_set_reads_declared_default() {
        let prefs = manager();
        assert_eq!(
            prefs.get::<TypedSet>(PrefName::PinnedAnimeSources),
            TypedSet::String(BTreeSet::new())
        );
        assert_eq!(prefs.get::<TypedSet>(PrefName::SkipTime), TypedSet::default());
    }

    #[test]
    fn test_corrupt_value_reads_default() {
        let prefs = manager();
        prefs
            .resolve(Partition::Player)
            .put("SkipTime", &NativeValue::from("eighty"))
            .unwrap();

        assert_eq!(prefs.get::<i32>(PrefName::SkipTime), 85);
        assert_eq!(prefs.get_or(PrefName::SkipTime, 10), 10);
        assert_eq!(prefs.get_value(PrefName::SkipTime), PrefValue::Int(85));
    }

    #[test]
    fn test_requested_type_mismatch_reads_default() {
        let prefs = manager();
        prefs.set(PrefName::SkipTime, 90);

        assert_eq!(prefs.get_or(PrefName::SkipTime, "x".to_string()), "x");
        assert_eq!(prefs.get::<String>(PrefName::SkipTime), String::new());
    }

    #[test]
    fn test_complex_lives_in_irrelevant() {
        let prefs = manager();
        let order = SourceOrder { names: vec!["a".into(), "b".into()] };

        prefs.set(PrefName::AnimeSourcesOrder, Complex(order.clone()));

        assert!(!prefs.resolve(Partition::Anime).contains("AnimeSourcesOrder").unwrap());
        assert!(prefs.resolve(Partition::Irrelevant).contains("AnimeSourcesOrder").unwrap());
        assert_eq!(
            prefs.get::<Complex<SourceOrder>>(PrefName::AnimeSourcesOrder).0,
            order
        );

        prefs.remove(PrefName::AnimeSourcesOrder);
        assert!(!prefs.resolve(Partition::Irrelevant).contains("AnimeSourcesOrder").unwrap());
    }

    #[test]
    fn test_corrupt_blob_reports_and_defaults() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|msg: &str| msg.starts_with("Error deserializing preference"))
            .times(1)
            .return_const(());
        let prefs = manager_with(notifier);

        prefs
            .resolve(Partition::Irrelevant)
            .put("HomeLayout", &NativeValue::from("not a blob"))
            .unwrap();

        assert_eq!(
            prefs.get::<Complex<Vec<bool>>>(PrefName::HomeLayout).0,
            vec![true; 6]
        );
    }

    #[derive(Debug, Clone, Default, PartialEq, Deserialize)]
    struct Unwritable;

    impl Serialize for Unwritable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> std::result::Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("cannot be written"))
        }
    }

    fn expect_serialize_failure() -> MockNotifier {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|msg: &str| msg.starts_with("Error serializing preference: "))
            .times(1)
            .return_const(());
        notifier
    }

    #[test]
    fn test_unserializable_value_reports_and_writes_nothing() {
        let prefs = manager_with(expect_serialize_failure());

        prefs.set(PrefName::AnimeSourcesOrder, Complex(Unwritable));

        let irrelevant = prefs.resolve(Partition::Irrelevant);
        assert!(!irrelevant.contains("AnimeSourcesOrder").unwrap());
        assert!(!prefs.resolve(Partition::Anime).contains("AnimeSourcesOrder").unwrap());
    }

    #[test]
    fn test_unserializable_custom_value_reports_and_writes_nothing() {
        let prefs = manager_with(expect_serialize_failure());

        prefs.set_custom("pendingLayout", Complex(Unwritable));

        assert!(!prefs.resolve(Partition::Irrelevant).contains("pendingLayout").unwrap());
        assert_eq!(prefs.get_nullable_custom::<Complex<Unwritable>>("pendingLayout", None), None);
    }

    #[test]
    fn test_get_nullable() {
        let prefs = manager();

        let order = prefs.get_nullable::<Complex<SourceOrder>>(PrefName::AnimeSourcesOrder, None);
        assert_eq!(order, None);
        assert_eq!(prefs.get_nullable(PrefName::SkipTime, None::<i32>), Some(85));

        prefs.set(PrefName::SkipTime, 5);
        assert_eq!(prefs.get_nullable(PrefName::SkipTime, None::<i32>), Some(5));
    }

    #[test]
    fn test_custom_values() {
        let prefs = manager();
        let ids: BTreeSet<i32> = [1, 2, 3].into_iter().collect();

        prefs.set_custom("lastSyncIds", ids.clone());
        assert_eq!(prefs.get_custom("lastSyncIds", BTreeSet::<i32>::new()), ids);

        prefs.set_custom("counter", 3i64);
        assert_eq!(prefs.get_custom("counter", 0i64), 3);
        assert_eq!(prefs.get_custom("counter", 0i32), 0);

        prefs.remove_custom("counter");
        assert_eq!(prefs.get_custom("counter", 7i64), 7);
    }

    #[test]
    fn test_nullable_custom_complex() {
        let prefs = manager();
        let order = SourceOrder { names: vec!["x".into()] };

        assert_eq!(prefs.get_nullable_custom::<Complex<SourceOrder>>("order", None), None);

        prefs.set_custom("order", Complex(order.clone()));
        assert_eq!(
            prefs.get_nullable_custom::<Complex<SourceOrder>>("order", None),
            Some(Complex(order))
        );
    }

    #[test]
    fn test_set_custom_value_none_removes() {
        let prefs = manager();
        prefs.set_custom("flag", true);
        prefs.set_custom_value("flag", None);
        assert!(!prefs.resolve(Partition::Irrelevant).contains("flag").unwrap());
    }

    #[test]
    fn test_anime_downloads_handle() {
        let prefs = manager();
        prefs.set(PrefName::DownloadsPaused, true);
        assert!(prefs.anime_downloads().get_bool("DownloadsPaused", false).unwrap());
    }
}
