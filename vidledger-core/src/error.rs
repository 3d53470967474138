use std::path::PathBuf;

use thiserror::Error;
use vidledger_model::PageCursor;

use crate::providers::ProviderError;

/// Failures reading or writing the catalog file.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("catalog file {path} does not exist")]
    NotFound { path: PathBuf },

    #[error("failed to access catalog file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog file {path} is malformed")]
    Malformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to encode catalog")]
    Encode(#[source] toml::ser::Error),

    #[error("failed to replace catalog file {path}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

/// A remote call failed badly enough to abort the current phase.
#[derive(Debug, Error)]
pub enum RemoteFetchError {
    #[error("failed to fetch listing page at cursor {cursor}")]
    Page {
        cursor: PageCursor,
        #[source]
        source: ProviderError,
    },

    #[error("listing handed back the cursor it was asked for ({cursor})")]
    CursorLoop { cursor: PageCursor },

    #[error("duration lookup for {size} ids failed")]
    Batch {
        size: usize,
        #[source]
        source: ProviderError,
    },

    #[error("batch of {size} ids exceeds the upstream limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    #[error("failed to resolve the uploads playlist")]
    Resolve(#[source] ProviderError),

    #[error("the authenticated account has no uploads playlist")]
    NoUploadsPlaylist,
}

/// A wire duration that could not be turned into a time span.
#[derive(Debug, Error)]
pub enum DurationParseError {
    #[error("duration {wire:?} does not start with the PT designator")]
    MissingDesignator { wire: String },

    #[error("duration {wire:?} is not a valid h/m/s expression")]
    Invalid {
        wire: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("duration {wire:?} is too long to record in the catalog")]
    OutOfRange { wire: String },
}

/// Run-level failure surfaced to the operator.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    RemoteFetch(#[from] RemoteFetchError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
