use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::time::Duration;

use crate::entry::{CatalogEntry, VideoType};

/// Result of [`Catalog::upsert_duration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUpdate {
    /// The entry moved from unset to the given duration.
    Applied,
    /// The entry already had a duration; nothing changed.
    AlreadySet,
    /// The offered duration was zero, so the entry stays pending.
    StillUnset,
    /// No entry under that key.
    Missing,
}

/// Every known upload keyed by its remote id.
///
/// Entries are never removed. Iteration follows key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "PascalCase")
)]
pub struct Catalog {
    #[cfg_attr(feature = "serde", serde(default))]
    videos: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.videos.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.videos.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CatalogEntry)> {
        self.videos.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys whose duration is still unset, in iteration order.
    pub fn pending_keys(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, entry)| entry.is_pending())
            .map(|(key, _)| key)
    }

    pub fn pending_duration_count(&self) -> usize {
        self.pending_keys().count()
    }

    /// Pending keys with the fewest recorded lookup attempts first, key
    /// order within a tie.
    pub fn pending_keys_by_attempts(&self) -> Vec<&str> {
        let mut pending: Vec<(u32, &str)> = self
            .iter()
            .filter(|(_, entry)| entry.is_pending())
            .map(|(key, entry)| (entry.lookup_attempts(), key))
            .collect();
        pending.sort_by_key(|(attempts, _)| *attempts);
        pending.into_iter().map(|(_, key)| key).collect()
    }

    /// Count a lookup that left `key` pending. Returns `false` when the key
    /// is absent or already has a duration.
    pub fn record_lookup_attempt(&mut self, key: &str) -> bool {
        match self.videos.get_mut(key) {
            Some(entry) if entry.is_pending() => {
                entry.bump_lookup_attempts();
                true
            }
            _ => false,
        }
    }

    /// Insert `candidate` under `key` only when `key` is absent.
    ///
    /// Returns `true` when the entry was inserted. An existing entry is
    /// left exactly as it was, including any enriched duration.
    pub fn merge(&mut self, key: impl Into<String>, candidate: CatalogEntry) -> bool {
        match self.videos.entry(key.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(candidate);
                true
            }
        }
    }

    /// Fill in the duration of `key` if it is still unset.
    pub fn upsert_duration(&mut self, key: &str, duration: Duration) -> DurationUpdate {
        let Some(entry) = self.videos.get_mut(key) else {
            return DurationUpdate::Missing;
        };
        if !entry.is_pending() {
            return DurationUpdate::AlreadySet;
        }
        if duration.is_zero() {
            return DurationUpdate::StillUnset;
        }
        entry.set_duration(duration);
        DurationUpdate::Applied
    }

    /// Set the category of `key` only while it is [`VideoType::Unknown`].
    pub fn backfill_video_type(&mut self, key: &str, video_type: VideoType) -> bool {
        match self.videos.get_mut(key) {
            Some(entry)
                if entry.video_type() == VideoType::Unknown
                    && video_type != VideoType::Unknown =>
            {
                entry.set_video_type(video_type);
                true
            }
            _ => false,
        }
    }
}
