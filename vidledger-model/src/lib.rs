//! Core data model definitions shared across vidledger crates.
#![allow(missing_docs)]

pub use ::chrono;

pub mod catalog;
pub mod entry;
pub mod remote;
#[cfg(feature = "serde")]
pub mod wire;

// Intentionally curated re-exports for downstream consumers.
pub use catalog::{Catalog, DurationUpdate};
pub use entry::{CatalogEntry, VideoType};
pub use remote::{DurationRecord, ListingPage, PageCursor, RemoteItem};
