use async_trait::async_trait;
use vidledger_model::{DurationRecord, ListingPage, PageCursor};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Not found")]
    NotFound,

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Paginated listing of a channel's uploads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Fetch the page that starts at `cursor`. The returned page carries an
    /// empty cursor once there is nothing left.
    async fn list_page(
        &self,
        collection_id: &str,
        cursor: &PageCursor,
        page_size: u32,
    ) -> Result<ListingPage, ProviderError>;

    /// Uploads collection of the authenticated account, if it has one.
    async fn default_collection(&self) -> Result<Option<String>, ProviderError>;
}

/// Batched lookup of the details the listing does not carry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DurationLookup: Send + Sync {
    /// Resolve durations for `ids` in a single request. Ids the remote does
    /// not know are left out of the result.
    async fn lookup_many(
        &self,
        ids: &[String],
    ) -> Result<Vec<DurationRecord>, ProviderError>;
}
