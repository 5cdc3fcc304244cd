//! Static setting descriptors
//!
//! Each [`PrefName`] carries a declared kind, a default and the partition it
//! lives in. Reads dispatch on the declared kind, never on what happens to be
//! stored.

use ciborium::Value;
use std::collections::BTreeSet;

use crate::partition::Partition;
use crate::value::{PrefValue, TypedSet};

/// Declared kind of a preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefKind {
    /// `bool`
    Boolean,
    /// `i32`
    Int,
    /// `f32`
    Float,
    /// `i64`
    Long,
    /// `String`
    String,
    /// Homogeneous set, stored as an encoded string set
    Set,
    /// Anything else, stored as a serialized blob
    Complex,
}

/// Everything known about a preference besides its name
#[derive(Debug, Clone, PartialEq)]
pub struct PrefData {
    /// Partition the preference is routed to
    pub partition: Partition,
    /// Declared kind
    pub kind: PrefKind,
    /// Value returned when nothing usable is stored
    pub default: PrefValue,
}

impl PrefData {
    fn new(partition: Partition, default: impl Into<PrefValue>) -> Self {
        let default = default.into();
        Self { partition, kind: default.kind(), default }
    }

    fn complex(partition: Partition, default: Value) -> Self {
        Self::new(partition, PrefValue::Complex(default))
    }
}

macro_rules! pref_names {
    ($($(#[$meta:meta])* $variant:ident),+ $(,)?) => {
        /// Every statically known preference
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum PrefName {
            $($(#[$meta])* $variant,)+
        }

        impl PrefName {
            /// All descriptors, in declaration order
            pub const ALL: &'static [PrefName] = &[$(PrefName::$variant,)+];

            /// Storage key
            pub fn key(self) -> &'static str {
                match self {
                    $(PrefName::$variant => stringify!($variant),)+
                }
            }
        }
    };
}

pref_names! {
    /// Show adult entries in search and lists
    ShowNSFW,
    /// Skip network access and serve cached data only
    OfflineMode,
    /// Tab opened on launch
    DefaultStartUpTab,
    /// Colour theme name
    Theme,
    /// Hide system bars
    ImmersiveMode,
    /// Which home sections are visible
    HomeLayout,
    /// Grid or list view for anime lists
    AnimeDefaultView,
    /// Extension sources in priority order
    AnimeSourcesOrder,
    /// Sources pinned to the top of the picker
    PinnedAnimeSources,
    /// Sort key for manga lists
    MangaListSortOrder,
    /// Grid or list view for manga lists
    MangaDefaultView,
    /// Playback speed multiplier
    PlayerSpeed,
    /// Seconds skipped by the skip button
    SkipTime,
    /// Page turn direction
    ReaderDirection,
    /// Line height for the novel reader
    NovelLineHeight,
    /// Epoch millis of the last update check
    LastUpdateCheck,
    /// Recent search queries
    SearchHistory,
    /// Notification ids already shown
    ShownNotificationIds,
    /// Pause queued downloads
    DownloadsPaused,
    /// Token for the tracking service
    SyncToken,
}

impl PrefName {
    /// Look a descriptor up by its storage key
    pub fn from_key(key: &str) -> Option<PrefName> {
        Self::ALL.iter().copied().find(|name| name.key() == key)
    }

    /// Declared partition, kind and default
    pub fn data(self) -> PrefData {
        match self {
            PrefName::ShowNSFW => PrefData::new(Partition::General, false),
            PrefName::OfflineMode => PrefData::new(Partition::General, false),
            PrefName::DefaultStartUpTab => PrefData::new(Partition::General, 1),
            PrefName::Theme => PrefData::new(Partition::General, "PURPLE"),
            PrefName::ImmersiveMode => PrefData::new(Partition::Ui, false),
            PrefName::HomeLayout => {
                PrefData::complex(Partition::Ui, Value::Array(vec![Value::Bool(true); 6]))
            }
            PrefName::AnimeDefaultView => PrefData::new(Partition::Anime, 0),
            PrefName::AnimeSourcesOrder => {
                PrefData::complex(Partition::Anime, Value::Array(Vec::new()))
            }
            PrefName::PinnedAnimeSources => {
                PrefData::new(Partition::Anime, TypedSet::String(BTreeSet::new()))
            }
            PrefName::MangaListSortOrder => PrefData::new(Partition::Manga, "score"),
            PrefName::MangaDefaultView => PrefData::new(Partition::Manga, 0),
            PrefName::PlayerSpeed => PrefData::new(Partition::Player, 1.0f32),
            PrefName::SkipTime => PrefData::new(Partition::Player, 85),
            PrefName::ReaderDirection => PrefData::new(Partition::Reader, 0),
            PrefName::NovelLineHeight => PrefData::new(Partition::NovelReader, 1.4f32),
            PrefName::LastUpdateCheck => PrefData::new(Partition::Irrelevant, 0i64),
            PrefName::SearchHistory => {
                PrefData::new(Partition::Irrelevant, TypedSet::String(BTreeSet::new()))
            }
            PrefName::ShownNotificationIds => {
                PrefData::new(Partition::Irrelevant, TypedSet::Int(BTreeSet::new()))
            }
            PrefName::DownloadsPaused => PrefData::new(Partition::AnimeDownloads, false),
            PrefName::SyncToken => PrefData::new(Partition::Protected, ""),
        }
    }
}
