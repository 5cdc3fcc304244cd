//! Observable preference values
//!
//! A live value is bound to one key, one partition and one native kind. It
//! holds the current value and re-emits whenever the partition reports a
//! change to that key; a removal re-emits the default.

use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;
use storage::{KeyChange, KeyWatcher, NativeKind, NativeValue, PartitionStore, StringSet};
use tokio::sync::watch;

use crate::descriptor::{PrefKind, PrefName};
use crate::error::{PrefError, Result};
use crate::manager::PrefManager;
use crate::set_codec;
use crate::value::PrefValue;

/// Native kinds a live value can carry
pub trait LiveKind: Clone + Send + Sync + 'static {
    /// The native kind observed
    const KIND: NativeKind;

    /// Extract from a stored value; `None` when the kind differs
    fn from_native(value: NativeValue) -> Option<Self>;

    /// Narrow an untyped live value
    fn view(live: AnyLiveValue) -> Result<LiveValue<Self>>;
}

macro_rules! live_kind {
    ($ty:ty, $kind:ident) => {
        impl LiveKind for $ty {
            const KIND: NativeKind = NativeKind::$kind;

            fn from_native(value: NativeValue) -> Option<Self> {
                match value {
                    NativeValue::$kind(v) => Some(v),
                    _ => None,
                }
            }

            fn view(live: AnyLiveValue) -> Result<LiveValue<Self>> {
                match live {
                    AnyLiveValue::$kind(v) => Ok(v),
                    other => Err(PrefError::LiveKindMismatch {
                        expected: Self::KIND,
                        found: other.kind(),
                    }),
                }
            }
        }
    };
}

live_kind!(bool, Boolean);
live_kind!(i32, Int);
live_kind!(f32, Float);
live_kind!(i64, Long);
live_kind!(String, String);
live_kind!(StringSet, StringSet);

/// How often an idle watcher checks whether anyone is still listening
const CLOSE_POLL: Duration = Duration::from_millis(100);

/// Publish changes from `watcher` until every receiver is gone or the
/// partition is dropped
fn follow<T: LiveKind>(mut watcher: KeyWatcher, tx: watch::Sender<T>, default: T) {
    while !tx.is_closed() {
        let next = match watcher.next_timeout(CLOSE_POLL) {
            Ok(KeyChange::Set(value)) => T::from_native(value).unwrap_or_else(|| default.clone()),
            Ok(KeyChange::Removed) => default.clone(),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        if tx.send(next).is_err() {
            break;
        }
    }
    tracing::debug!("Stopped watching {}", watcher.key());
}

/// Observable value of one preference key
#[derive(Debug, Clone)]
pub struct LiveValue<T> {
    key: String,
    rx: watch::Receiver<T>,
}

impl<T: LiveKind> LiveValue<T> {
    /// Start observing `key` in `store`
    ///
    /// The watcher thread exits within [`CLOSE_POLL`] of the last receiver
    /// being dropped.
    pub(crate) fn spawn(store: &PartitionStore, key: &str, default: T) -> Result<Self> {
        // subscribe before the initial read so no change falls in between
        let watcher = store.watch(key);
        let current = match store.get(key) {
            Ok(value) => value.and_then(T::from_native).unwrap_or_else(|| default.clone()),
            Err(e) => {
                tracing::debug!("Live value for {} starts at default: {}", key, e);
                default.clone()
            }
        };
        let (tx, rx) = watch::channel(current);

        thread::Builder::new()
            .name(format!("live-pref-{}", key))
            .spawn(move || follow(watcher, tx, default))?;

        Ok(Self { key: key.to_string(), rx })
    }

    /// Key being observed
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current value
    pub fn get(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait for the next change and return the new value
    pub async fn changed(&mut self) -> Result<T> {
        self.rx
            .changed()
            .await
            .map_err(|_| PrefError::LiveClosed(self.key.clone()))?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// An independent receiver of the same value
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.rx.clone()
    }
}

/// A live value of whichever native kind the preference declares
#[derive(Debug, Clone)]
pub enum AnyLiveValue {
    /// Boolean preference
    Boolean(LiveValue<bool>),
    /// Integer preference
    Int(LiveValue<i32>),
    /// Float preference
    Float(LiveValue<f32>),
    /// Long integer preference
    Long(LiveValue<i64>),
    /// String preference
    String(LiveValue<String>),
    /// Set preference, observed in its stored form
    StringSet(LiveValue<StringSet>),
}

impl AnyLiveValue {
    /// Native kind carried
    pub fn kind(&self) -> NativeKind {
        match self {
            AnyLiveValue::Boolean(_) => NativeKind::Boolean,
            AnyLiveValue::Int(_) => NativeKind::Int,
            AnyLiveValue::Float(_) => NativeKind::Float,
            AnyLiveValue::Long(_) => NativeKind::Long,
            AnyLiveValue::String(_) => NativeKind::String,
            AnyLiveValue::StringSet(_) => NativeKind::StringSet,
        }
    }

    /// View as a boolean live value
    pub fn as_live_bool(self) -> Result<LiveValue<bool>> {
        bool::view(self)
    }

    /// View as an integer live value
    pub fn as_live_int(self) -> Result<LiveValue<i32>> {
        i32::view(self)
    }

    /// View as a float live value
    pub fn as_live_float(self) -> Result<LiveValue<f32>> {
        f32::view(self)
    }

    /// View as a long integer live value
    pub fn as_live_long(self) -> Result<LiveValue<i64>> {
        i64::view(self)
    }

    /// View as a string live value
    pub fn as_live_string(self) -> Result<LiveValue<String>> {
        String::view(self)
    }

    /// View as a string set live value
    pub fn as_live_string_set(self) -> Result<LiveValue<StringSet>> {
        StringSet::view(self)
    }
}

impl PrefManager {
    /// Observe a preference
    ///
    /// `default` must have the preference's declared kind; it is emitted
    /// whenever the key is absent. Complex preferences cannot be observed.
    pub fn get_live(&self, name: PrefName, default: impl Into<PrefValue>) -> Result<AnyLiveValue> {
        let data = name.data();
        let default = default.into();
        let store = self.resolve(data.partition);
        let key = name.key();

        let mismatch = |found: PrefKind| PrefError::DefaultKindMismatch {
            name: key,
            expected: data.kind,
            found,
        };

        let live = match (data.kind, default) {
            (PrefKind::Complex, _) => {
                return Err(PrefError::UnsupportedLiveKind(PrefKind::Complex));
            }
            (PrefKind::Boolean, PrefValue::Boolean(d)) => {
                AnyLiveValue::Boolean(LiveValue::spawn(store, key, d)?)
            }
            (PrefKind::Int, PrefValue::Int(d)) => {
                AnyLiveValue::Int(LiveValue::spawn(store, key, d)?)
            }
            (PrefKind::Float, PrefValue::Float(d)) => {
                AnyLiveValue::Float(LiveValue::spawn(store, key, d)?)
            }
            (PrefKind::Long, PrefValue::Long(d)) => {
                AnyLiveValue::Long(LiveValue::spawn(store, key, d)?)
            }
            (PrefKind::String, PrefValue::String(d)) => {
                AnyLiveValue::String(LiveValue::spawn(store, key, d)?)
            }
            (PrefKind::Set, PrefValue::Set(d)) => {
                let d = set_codec::encode(&d).unwrap_or_default();
                AnyLiveValue::StringSet(LiveValue::spawn(store, key, d)?)
            }
            (_, other) => return Err(mismatch(other.kind())),
        };

        tracing::debug!("Observing {} in {}", key, store.name());
        Ok(live)
    }

    /// Observe a preference with a statically known kind
    pub fn get_live_typed<T>(&self, name: PrefName, default: T) -> Result<LiveValue<T>>
    where
        T: LiveKind + Into<PrefValue>,
    {
        T::view(self.get_live(name, default)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrefsConfig;
    use crate::notify::TracingNotifier;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    fn manager() -> PrefManager {
        PrefManager::init(&PrefsConfig::temporary(), Arc::new(TracingNotifier)).unwrap()
    }

    #[tokio::test]
    async fn test_live_value_emits_current_then_changes() {
        let prefs = manager();
        prefs.set(PrefName::SkipTime, 90);

        let mut live = prefs.get_live(PrefName::SkipTime, 85).unwrap().as_live_int().unwrap();
        assert_eq!(live.get(), 90);
        assert_eq!(live.key(), "SkipTime");

        prefs.set(PrefName::SkipTime, 100);
        let next = timeout(Duration::from_secs(5), live.changed()).await.unwrap().unwrap();
        assert_eq!(next, 100);

        prefs.remove(PrefName::SkipTime);
        let next = timeout(Duration::from_secs(5), live.changed()).await.unwrap().unwrap();
        assert_eq!(next, 85);
    }

    #[test]
    fn test_watcher_stops_after_receivers_drop() {
        let store = storage::NativeStore::in_memory().unwrap();
        let general = store.open_partition("general").unwrap();
        let (tx, rx) = watch::channel(false);
        let (done_tx, done_rx) = std::sync::mpsc::channel();

        let watcher = general.watch("ShowNSFW");
        thread::spawn(move || {
            follow(watcher, tx, false);
            let _ = done_tx.send(());
        });

        drop(rx);
        assert!(done_rx.recv_timeout(CLOSE_POLL * 20).is_ok());
    }

    #[test]
    fn test_watcher_publishes_until_closed() {
        let store = storage::NativeStore::in_memory().unwrap();
        let player = store.open_partition("player").unwrap();
        let (tx, mut rx) = watch::channel(85);
        let watcher = player.watch("SkipTime");
        let handle = thread::spawn(move || follow(watcher, tx, 85));

        player.put("SkipTime", &NativeValue::Int(90)).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while *rx.borrow_and_update() != 90 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(*rx.borrow(), 90);

        drop(rx);
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_live_value_ignores_other_keys() {
        let prefs = manager();
        let mut live = prefs.get_live_typed(PrefName::ShowNSFW, false).unwrap();

        prefs.set_custom("ShowNSFWBanner", true);
        prefs
            .resolve(PrefName::ShowNSFW.data().partition)
            .put("ShowNSFWHint", &NativeValue::Boolean(true))
            .unwrap();
        prefs.set(PrefName::ShowNSFW, true);

        let next = timeout(Duration::from_secs(5), live.changed()).await.unwrap().unwrap();
        assert!(next);
    }

    #[tokio::test]
    async fn test_live_set_is_observed_encoded() {
        let prefs = manager();
        let live = prefs
            .get_live(PrefName::ShownNotificationIds, crate::value::TypedSet::Int(BTreeSet::new()))
            .unwrap();
        let mut live = live.as_live_string_set().unwrap();
        assert!(live.get().is_empty());

        prefs.set(PrefName::ShownNotificationIds, [7].into_iter().collect::<BTreeSet<i32>>());
        let next = timeout(Duration::from_secs(5), live.changed()).await.unwrap().unwrap();
        assert_eq!(next.as_slice(), ["Int".to_string(), "7".to_string()]);
    }

    #[test]
    fn test_complex_is_rejected_immediately() {
        let prefs = manager();
        let err = prefs
            .get_live(PrefName::HomeLayout, PrefValue::complex(&vec![true]).unwrap())
            .unwrap_err();
        assert!(matches!(err, PrefError::UnsupportedLiveKind(PrefKind::Complex)));
    }

    #[test]
    fn test_wrong_view_is_rejected() {
        let prefs = manager();
        let live = prefs.get_live(PrefName::PlayerSpeed, 1.0f32).unwrap();
        assert_eq!(live.kind(), NativeKind::Float);

        let err = live.as_live_long().unwrap_err();
        assert!(matches!(
            err,
            PrefError::LiveKindMismatch { expected: NativeKind::Long, found: NativeKind::Float }
        ));
    }

    #[test]
    fn test_default_of_wrong_kind_is_rejected() {
        let prefs = manager();
        let err = prefs.get_live(PrefName::PlayerSpeed, 1i32).unwrap_err();
        assert!(matches!(err, PrefError::DefaultKindMismatch { name: "PlayerSpeed", .. }));
    }

    #[test]
    fn test_subscribers_share_value() {
        let prefs = manager();
        prefs.set(PrefName::Theme, "OCEAN".to_string());

        let live = prefs.get_live_typed(PrefName::Theme, "PURPLE".to_string()).unwrap();
        let rx = live.subscribe();
        assert_eq!(*rx.borrow(), "OCEAN");
    }
}
