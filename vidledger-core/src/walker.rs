//! Cursor-driven listing walk that merges new uploads into the catalog.
//!
//! The listing is close to newest-first but not strictly sorted, so seeing a
//! known id (or a whole page of them) says nothing certain about later
//! pages. [`StopPolicy::FullScan`] therefore walks every page on every run.
//! [`StopPolicy::StopOnKnownPage`] trades that guarantee for fewer requests
//! and can silently miss uploads that the listing returns out of order.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vidledger_model::{Catalog, CatalogEntry, PageCursor, RemoteItem};

use crate::classify::classify;
use crate::error::RemoteFetchError;
use crate::providers::PlaylistSource;

/// Publish timestamps without the RFC3339 colon in the offset, e.g.
/// `2006-01-02T15:04:05+0700`.
pub const PUBLISHED_FALLBACK_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

pub const DEFAULT_PAGE_SIZE: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopPolicy {
    /// Request every page until the cursor runs out.
    #[default]
    FullScan,
    /// Additionally stop after the first page that adds nothing new.
    /// Lossy: out-of-order uploads on later pages are skipped.
    StopOnKnownPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    pub page_size: u32,
    pub stop_policy: StopPolicy,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            stop_policy: StopPolicy::FullScan,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkReport {
    pub pages: usize,
    pub seen: usize,
    pub inserted: usize,
    /// Items dropped because their publish timestamp did not parse.
    pub skipped: usize,
    pub stopped_early: bool,
}

/// Parse a listing publish timestamp.
pub fn parse_published(raw: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, PUBLISHED_FALLBACK_FORMAT))
}

/// Build a fresh, unenriched entry from a listing item.
pub fn entry_from_remote(item: RemoteItem) -> Result<CatalogEntry, chrono::ParseError> {
    let published = parse_published(&item.published_at)?;
    let video_type = classify(&item.title);
    Ok(CatalogEntry::new(item.video_id, item.title, published, video_type))
}

#[derive(Debug)]
pub struct PaginationWalker<'a, S: ?Sized> {
    source: &'a S,
    options: WalkOptions,
}

impl<'a, S> PaginationWalker<'a, S>
where
    S: PlaylistSource + ?Sized,
{
    pub fn new(source: &'a S, options: WalkOptions) -> Self {
        Self { source, options }
    }

    /// Merge every listed upload of `collection_id` into `catalog`.
    ///
    /// On a failed page request the walk stops with an error; whatever was
    /// merged from earlier pages stays in `catalog`.
    pub async fn walk(
        &self,
        catalog: &mut Catalog,
        collection_id: &str,
    ) -> Result<WalkReport, RemoteFetchError> {
        let mut report = WalkReport::default();
        let mut cursor = PageCursor::start();

        loop {
            let page = self
                .source
                .list_page(collection_id, &cursor, self.options.page_size)
                .await
                .map_err(|source| RemoteFetchError::Page {
                    cursor: cursor.clone(),
                    source,
                })?;
            report.pages += 1;

            let mut inserted_here = 0;
            for item in page.items {
                report.seen += 1;
                let video_id = item.video_id.clone();
                match entry_from_remote(item) {
                    Ok(entry) => {
                        if catalog.merge(video_id, entry) {
                            inserted_here += 1;
                        }
                    }
                    Err(err) => {
                        report.skipped += 1;
                        warn!(%video_id, "skipping item with bad publish time: {err}");
                    }
                }
            }
            report.inserted += inserted_here;

            debug!(
                page = report.pages,
                cursor = %cursor,
                inserted = inserted_here,
                next = %page.next_cursor,
                "merged listing page"
            );

            if page.next_cursor.is_empty() {
                break;
            }
            if page.next_cursor == cursor {
                return Err(RemoteFetchError::CursorLoop { cursor });
            }
            if self.options.stop_policy == StopPolicy::StopOnKnownPage
                && inserted_here == 0
            {
                report.stopped_early = true;
                break;
            }
            cursor = page.next_cursor;
        }

        info!(
            collection_id,
            pages = report.pages,
            seen = report.seen,
            inserted = report.inserted,
            skipped = report.skipped,
            stopped_early = report.stopped_early,
            "listing walk finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use crate::providers::traits::MockPlaylistSource;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use vidledger_model::{ListingPage, VideoType};

    fn item(id: &str, title: &str, published: &str) -> RemoteItem {
        RemoteItem {
            video_id: id.into(),
            title: title.into(),
            published_at: published.into(),
        }
    }

    fn page(items: Vec<RemoteItem>, next: Option<&str>) -> ListingPage {
        ListingPage {
            items,
            next_cursor: PageCursor::from_next(next.map(str::to_owned)),
        }
    }

    /// Serves canned pages keyed by the requested token.
    struct ScriptedSource {
        pages: HashMap<Option<String>, ListingPage>,
        requested: Mutex<Vec<PageCursor>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<(Option<&str>, ListingPage)>) -> Self {
            Self {
                pages: pages
                    .into_iter()
                    .map(|(token, page)| (token.map(str::to_owned), page))
                    .collect(),
                requested: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requested.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PlaylistSource for ScriptedSource {
        async fn list_page(
            &self,
            _collection_id: &str,
            cursor: &PageCursor,
            _page_size: u32,
        ) -> Result<ListingPage, ProviderError> {
            self.requested.lock().unwrap().push(cursor.clone());
            self.pages
                .get(&cursor.token().map(str::to_owned))
                .cloned()
                .ok_or(ProviderError::NotFound)
        }

        async fn default_collection(
            &self,
        ) -> Result<Option<String>, ProviderError> {
            Ok(None)
        }
    }

    /// Page 2 is entirely known, page 3 carries an upload that the listing
    /// returned out of order.
    fn out_of_order_listing() -> ScriptedSource {
        ScriptedSource::new(vec![
            (
                None,
                page(
                    vec![item("new1", "Live Stream: new", "2021-05-03T10:00:00Z")],
                    Some("tok1"),
                ),
            ),
            (
                Some("tok1"),
                page(
                    vec![item("old1", "old", "2021-05-01T10:00:00Z")],
                    Some("tok2"),
                ),
            ),
            (
                Some("tok2"),
                page(vec![item("late", "late", "2021-05-02T10:00:00Z")], None),
            ),
        ])
    }

    fn catalog_with(ids: &[&str]) -> Catalog {
        let mut catalog = Catalog::new();
        for id in ids {
            let entry = entry_from_remote(item(id, id, "2021-05-01T10:00:00Z")).unwrap();
            catalog.merge(*id, entry);
        }
        catalog
    }

    #[tokio::test]
    async fn full_scan_finds_out_of_order_uploads() {
        let source = out_of_order_listing();
        let mut catalog = catalog_with(&["old1"]);

        let report = PaginationWalker::new(&source, WalkOptions::default())
            .walk(&mut catalog, "UUx")
            .await
            .expect("walk");

        assert_eq!(source.request_count(), 3);
        assert_eq!(report.pages, 3);
        assert_eq!(report.seen, 3);
        assert_eq!(report.inserted, 2);
        assert!(!report.stopped_early);
        assert!(catalog.contains("late"));
        assert_eq!(
            catalog.get("new1").unwrap().video_type(),
            VideoType::Livestream
        );
        assert!(catalog.get("new1").unwrap().is_pending());
    }

    #[tokio::test]
    async fn early_stop_misses_out_of_order_uploads() {
        let source = out_of_order_listing();
        let mut catalog = catalog_with(&["old1"]);
        let options = WalkOptions {
            stop_policy: StopPolicy::StopOnKnownPage,
            ..WalkOptions::default()
        };

        let report = PaginationWalker::new(&source, options)
            .walk(&mut catalog, "UUx")
            .await
            .expect("walk");

        assert!(report.stopped_early);
        assert_eq!(source.request_count(), 2);
        assert!(!catalog.contains("late"));
    }

    #[tokio::test]
    async fn known_entries_keep_their_enrichment() {
        let source = ScriptedSource::new(vec![(
            None,
            page(
                vec![item("old1", "retitled upstream", "2030-01-01T00:00:00Z")],
                None,
            ),
        )]);
        let mut catalog = catalog_with(&["old1"]);
        catalog.upsert_duration("old1", Duration::from_secs(300));
        let before = catalog.clone();

        let report = PaginationWalker::new(&source, WalkOptions::default())
            .walk(&mut catalog, "UUx")
            .await
            .expect("walk");

        assert_eq!(report.inserted, 0);
        assert_eq!(catalog, before);
    }

    #[tokio::test]
    async fn failed_page_keeps_earlier_merges() {
        let mut source = MockPlaylistSource::new();
        source
            .expect_list_page()
            .withf(|_, cursor, _| cursor.is_empty())
            .times(1)
            .returning(|_, _, _| {
                Ok(page(
                    vec![item("a", "a", "2021-01-01T00:00:00Z")],
                    Some("tok1"),
                ))
            });
        source
            .expect_list_page()
            .withf(|_, cursor, _| cursor.token() == Some("tok1"))
            .times(1)
            .returning(|_, _, _| Err(ProviderError::RateLimited));

        let mut catalog = Catalog::new();
        let err = PaginationWalker::new(&source, WalkOptions::default())
            .walk(&mut catalog, "UUx")
            .await
            .expect_err("second page fails");

        match err {
            RemoteFetchError::Page { cursor, source } => {
                assert_eq!(cursor.token(), Some("tok1"));
                assert!(matches!(source, ProviderError::RateLimited));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(catalog.contains("a"));
    }

    #[tokio::test]
    async fn page_size_is_passed_through() {
        let mut source = MockPlaylistSource::new();
        source
            .expect_list_page()
            .withf(|collection, _, size| collection == "UUx" && *size == 7)
            .times(1)
            .returning(|_, _, _| Ok(page(Vec::new(), None)));

        let options = WalkOptions {
            page_size: 7,
            ..WalkOptions::default()
        };
        let report = PaginationWalker::new(&source, options)
            .walk(&mut Catalog::new(), "UUx")
            .await
            .expect("walk");
        assert_eq!(report.pages, 1);
    }

    #[tokio::test]
    async fn bad_timestamp_skips_only_that_item() {
        let source = ScriptedSource::new(vec![(
            None,
            page(
                vec![
                    item("bad", "bad", "yesterday"),
                    item("good", "good", "2021-01-01T09:00:00+0900"),
                ],
                None,
            ),
        )]);
        let mut catalog = Catalog::new();

        let report = PaginationWalker::new(&source, WalkOptions::default())
            .walk(&mut catalog, "UUx")
            .await
            .expect("walk");

        assert_eq!(report.skipped, 1);
        assert_eq!(report.inserted, 1);
        assert!(!catalog.contains("bad"));
        assert_eq!(
            catalog.get("good").unwrap().published(),
            DateTime::parse_from_rfc3339("2021-01-01T00:00:00Z").unwrap()
        );
    }

    #[tokio::test]
    async fn repeated_cursor_is_an_error() {
        let source = ScriptedSource::new(vec![
            (None, page(Vec::new(), Some("tok1"))),
            (Some("tok1"), page(Vec::new(), Some("tok1"))),
        ]);

        let err = PaginationWalker::new(&source, WalkOptions::default())
            .walk(&mut Catalog::new(), "UUx")
            .await
            .expect_err("loop");
        assert!(matches!(err, RemoteFetchError::CursorLoop { .. }));
    }

    #[test]
    fn parses_wire_timestamp_variants() {
        let expected = DateTime::parse_from_rfc3339("2006-01-02T08:04:05Z").unwrap();
        for raw in [
            "2006-01-02T08:04:05Z",
            "2006-01-02T15:04:05+07:00",
            "2006-01-02T15:04:05+0700",
            "2006-01-02T08:04:05.000Z",
        ] {
            assert_eq!(parse_published(raw).unwrap(), expected, "{raw}");
        }
        assert!(parse_published("2006-01-02").is_err());
        assert!(parse_published("").is_err());
    }
}
