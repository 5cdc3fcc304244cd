//! Named storage partitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical partition a preference belongs to
///
/// `Ui` shares storage with `General`, and `NovelReader` with `Reader`; the
/// remaining eight variants each map to their own physical partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Partition {
    /// General application settings
    General,
    /// Interface settings, stored with `General`
    Ui,
    /// Anime settings
    Anime,
    /// Manga settings
    Manga,
    /// Video player settings
    Player,
    /// Manga reader settings
    Reader,
    /// Novel reader settings, stored with `Reader`
    NovelReader,
    /// Miscellaneous state, custom keys and serialized blobs
    Irrelevant,
    /// Anime download bookkeeping
    AnimeDownloads,
    /// Credentials and other sensitive values
    Protected,
}

impl Partition {
    /// Every partition that has its own storage, in a fixed order
    pub const PHYSICAL: [Partition; 8] = [
        Partition::General,
        Partition::Anime,
        Partition::Manga,
        Partition::Player,
        Partition::Reader,
        Partition::Irrelevant,
        Partition::AnimeDownloads,
        Partition::Protected,
    ];

    /// The partition whose storage this one uses
    pub fn physical(self) -> Partition {
        match self {
            Partition::Ui => Partition::General,
            Partition::NovelReader => Partition::Reader,
            other => other,
        }
    }

    /// Name of the backing store tree
    pub fn store_name(self) -> &'static str {
        match self.physical() {
            Partition::General | Partition::Ui => "general",
            Partition::Anime => "anime",
            Partition::Manga => "manga",
            Partition::Player => "player",
            Partition::Reader | Partition::NovelReader => "reader",
            Partition::Irrelevant => "irrelevant",
            Partition::AnimeDownloads => "anime_downloads",
            Partition::Protected => "protected",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
