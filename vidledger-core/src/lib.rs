//! Keeps a local TOML catalog of a channel's uploads in sync with YouTube.
//!
//! A run walks the uploads listing page by page, merges new entries, tags
//! livestreams by title and fills in missing durations in bounded batches.
//! See [`orchestrator::SyncRunner`] for the entry point.
#![allow(missing_docs)]

pub mod classify;
pub mod enrich;
pub mod error;
pub mod orchestrator;
pub mod providers;
pub mod store;
pub mod walker;

pub use classify::{LIVESTREAM_MARKER, backfill_video_types, classify};
pub use enrich::{
    DurationEnricher, EnrichReport, MAX_BATCH_SIZE, MalformedDuration,
    parse_duration,
};
pub use error::{
    DurationParseError, PersistenceError, RemoteFetchError, Result, SyncError,
};
pub use orchestrator::{RunOptions, RunSummary, SyncRunner};
pub use providers::{
    DurationLookup, PlaylistSource, ProviderError, YoutubeCredentials,
    YoutubeProvider,
};
pub use store::{CatalogStore, MissingCatalogPolicy};
pub use walker::{
    DEFAULT_PAGE_SIZE, PaginationWalker, StopPolicy, WalkOptions, WalkReport,
};

pub use vidledger_model as model;
