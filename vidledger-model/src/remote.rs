use std::fmt::{self, Display, Formatter};

/// Opaque continuation token for the remote listing.
///
/// An empty cursor means both "first page" when sent and "no more pages"
/// when received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PageCursor(Option<String>);

impl PageCursor {
    pub fn start() -> Self {
        Self(None)
    }

    /// Wrap the next-page token returned by the remote. Blank tokens are
    /// treated as absent.
    pub fn from_next(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.trim().is_empty()))
    }

    pub fn token(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl Display for PageCursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(token) => write!(f, "{token}"),
            None => write!(f, "<start>"),
        }
    }
}

/// One upload as the listing endpoint reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    pub video_id: String,
    pub title: String,
    /// Raw publish timestamp, parsed by the walker.
    pub published_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub items: Vec<RemoteItem>,
    pub next_cursor: PageCursor,
}

/// A duration as returned by the batch lookup, e.g. `PT1H45M41S`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationRecord {
    pub video_id: String,
    pub wire_duration: String,
}
