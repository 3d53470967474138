use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use vidledger_model::{DurationRecord, ListingPage, PageCursor, RemoteItem};

use super::traits::{DurationLookup, PlaylistSource, ProviderError};

const YOUTUBE_V3_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Upstream cap on `maxResults` for playlist listings.
pub const MAX_PAGE_SIZE: u32 = 50;

/// How requests are authorized. Channel discovery (`mine=true`) needs a
/// bearer token; listing a known playlist works with either.
#[derive(Clone, PartialEq, Eq)]
pub enum YoutubeCredentials {
    ApiKey(String),
    Bearer(String),
}

impl fmt::Debug for YoutubeCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YoutubeCredentials::ApiKey(_) => f.write_str("ApiKey(***)"),
            YoutubeCredentials::Bearer(_) => f.write_str("Bearer(***)"),
        }
    }
}

pub struct YoutubeProvider {
    http: reqwest::Client,
    base_url: String,
    credentials: YoutubeCredentials,
}

impl fmt::Debug for YoutubeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YoutubeProvider")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemsQuery<'a> {
    part: &'a str,
    playlist_id: &'a str,
    max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct VideosQuery<'a> {
    part: &'a str,
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct ChannelsQuery<'a> {
    part: &'a str,
    mine: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemListResponse {
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    #[serde(default)]
    snippet: Option<PlaylistItemSnippet>,
    #[serde(default)]
    content_details: Option<PlaylistItemContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    resource_id: Option<ResourceId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemContentDetails {
    #[serde(default)]
    video_id: Option<String>,
    #[serde(default)]
    video_published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<Video>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Video {
    id: String,
    #[serde(default)]
    content_details: Option<VideoContentDetails>,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    #[serde(default)]
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Channel {
    #[serde(default)]
    content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    #[serde(default)]
    related_playlists: Option<RelatedPlaylists>,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    #[serde(default)]
    uploads: Option<String>,
}

impl PlaylistItem {
    /// Items without a snippet, a video id or a video publish time are
    /// dropped. Private and deleted videos stay in the listing with a
    /// placeholder title and no `videoPublishedAt`.
    fn into_remote_item(self) -> Option<RemoteItem> {
        let snippet = self.snippet?;
        let details = self.content_details?;

        let video_id = snippet
            .resource_id
            .and_then(|r| r.video_id)
            .or(details.video_id)?;

        // The playlist-level publishedAt is when the item was added to the
        // playlist, not when the video went public.
        let published_at = details.video_published_at?;

        Some(RemoteItem {
            video_id,
            title: snippet.title,
            published_at,
        })
    }
}

impl YoutubeProvider {
    pub fn new(credentials: YoutubeCredentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: YOUTUBE_V3_BASE.to_string(),
            credentials,
        }
    }

    /// Point the provider at a different API root (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, resource: &str) -> Result<url::Url, ProviderError> {
        url::Url::parse(&format!("{}/{resource}", self.base_url)).map_err(|e| {
            ProviderError::ApiError(format!("invalid API base URL: {e}"))
        })
    }

    async fn get_youtube_json<Q, T>(
        &self,
        resource: &str,
        query: &Q,
    ) -> Result<T, ProviderError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(resource)?;
        let mut request = self.http.get(url).query(query);
        request = match &self.credentials {
            YoutubeCredentials::ApiKey(key) => request.query(&[("key", key)]),
            YoutubeCredentials::Bearer(token) => request.bearer_auth(token),
        };

        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ProviderError::ParseError(e.to_string()));
        }

        #[derive(Debug, Deserialize)]
        struct ErrorEnvelope {
            error: ErrorBody,
        }

        #[derive(Debug, Deserialize)]
        struct ErrorBody {
            #[serde(default)]
            message: Option<String>,
            #[serde(default)]
            errors: Vec<ErrorReason>,
        }

        #[derive(Debug, Deserialize)]
        struct ErrorReason {
            #[serde(default)]
            reason: Option<String>,
        }

        let body = response.json::<ErrorEnvelope>().await.ok().map(|e| e.error);
        let quota_exhausted = body.as_ref().is_some_and(|b| {
            b.errors.iter().any(|e| {
                matches!(
                    e.reason.as_deref(),
                    Some("quotaExceeded" | "rateLimitExceeded")
                )
            })
        });
        let message = body.and_then(|b| b.message).unwrap_or_else(|| {
            format!("YouTube request failed with status {status}")
        });

        error!(%status, resource, "YouTube request failed: {message}");

        match status.as_u16() {
            403 | 429 if quota_exhausted => Err(ProviderError::RateLimited),
            429 => Err(ProviderError::RateLimited),
            401 | 403 => Err(ProviderError::InvalidCredentials),
            404 => Err(ProviderError::NotFound),
            _ => Err(ProviderError::ApiError(message)),
        }
    }
}

#[async_trait]
impl PlaylistSource for YoutubeProvider {
    async fn list_page(
        &self,
        collection_id: &str,
        cursor: &PageCursor,
        page_size: u32,
    ) -> Result<ListingPage, ProviderError> {
        let query = PlaylistItemsQuery {
            part: "snippet,contentDetails",
            playlist_id: collection_id,
            max_results: page_size.clamp(1, MAX_PAGE_SIZE),
            page_token: cursor.token(),
        };

        let response: PlaylistItemListResponse =
            self.get_youtube_json("playlistItems", &query).await?;

        let total = response.items.len();
        let items: Vec<RemoteItem> = response
            .items
            .into_iter()
            .filter_map(PlaylistItem::into_remote_item)
            .collect();
        if items.len() != total {
            debug!(
                dropped = total - items.len(),
                "playlist items without video id or publish time"
            );
        }

        Ok(ListingPage {
            items,
            next_cursor: PageCursor::from_next(response.next_page_token),
        })
    }

    async fn default_collection(&self) -> Result<Option<String>, ProviderError> {
        let query = ChannelsQuery {
            part: "contentDetails",
            mine: true,
        };
        let response: ChannelListResponse =
            self.get_youtube_json("channels", &query).await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|c| c.content_details?.related_playlists?.uploads)
            .find(|uploads| !uploads.is_empty()))
    }
}

#[async_trait]
impl DurationLookup for YoutubeProvider {
    async fn lookup_many(
        &self,
        ids: &[String],
    ) -> Result<Vec<DurationRecord>, ProviderError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let joined = ids.join(",");
        let query = VideosQuery {
            part: "contentDetails",
            id: &joined,
        };
        let response: VideoListResponse =
            self.get_youtube_json("videos", &query).await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|video| {
                let wire_duration = video.content_details?.duration?;
                Some(DurationRecord {
                    video_id: video.id,
                    wire_duration,
                })
            })
            .collect())
    }
}
