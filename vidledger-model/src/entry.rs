use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use chrono::{DateTime, FixedOffset};

/// Category tag assigned to a catalog entry from its title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "u8", into = "u8")
)]
pub enum VideoType {
    /// Never classified. Only appears on entries written before
    /// classification existed.
    #[default]
    Unknown = 0,
    /// Title carries the livestream marker
    Livestream = 1,
    /// Everything else
    Snippet = 2,
}

impl Display for VideoType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            VideoType::Unknown => write!(f, "unknown"),
            VideoType::Livestream => write!(f, "livestream"),
            VideoType::Snippet => write!(f, "snippet"),
        }
    }
}

impl From<u8> for VideoType {
    fn from(value: u8) -> Self {
        match value {
            1 => VideoType::Livestream,
            2 => VideoType::Snippet,
            _ => VideoType::Unknown,
        }
    }
}

impl From<VideoType> for u8 {
    fn from(value: VideoType) -> Self {
        value as u8
    }
}

/// A single known upload.
///
/// `video_id`, `title` and `published` are fixed at construction. The
/// duration starts unset (zero) and is only ever filled in through
/// [`Catalog::upsert_duration`](crate::Catalog::upsert_duration).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "PascalCase")
)]
pub struct CatalogEntry {
    video_id: String,
    title: String,
    #[cfg_attr(feature = "serde", serde(with = "crate::wire::published"))]
    published: DateTime<FixedOffset>,
    #[cfg_attr(
        feature = "serde",
        serde(default, with = "crate::wire::duration_nanos")
    )]
    duration: Duration,
    #[cfg_attr(feature = "serde", serde(default))]
    video_type: VideoType,
    /// Duration lookups that left this entry pending.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "crate::wire::is_zero")
    )]
    lookup_attempts: u32,
}

impl CatalogEntry {
    /// Fresh entry with an unset duration.
    pub fn new(
        video_id: impl Into<String>,
        title: impl Into<String>,
        published: DateTime<FixedOffset>,
        video_type: VideoType,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            title: title.into(),
            published,
            duration: Duration::ZERO,
            video_type,
            lookup_attempts: 0,
        }
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn published(&self) -> DateTime<FixedOffset> {
        self.published
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn video_type(&self) -> VideoType {
        self.video_type
    }

    pub fn lookup_attempts(&self) -> u32 {
        self.lookup_attempts
    }

    /// True while the duration has not been enriched yet.
    pub fn is_pending(&self) -> bool {
        self.duration.is_zero()
    }

    pub(crate) fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
    }

    pub(crate) fn bump_lookup_attempts(&mut self) {
        self.lookup_attempts = self.lookup_attempts.saturating_add(1);
    }

    pub(crate) fn set_video_type(&mut self, video_type: VideoType) {
        self.video_type = video_type;
    }
}
