//! One synchronization run: load, walk, classify, enrich, save.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use vidledger_model::Catalog;

use crate::classify::backfill_video_types;
use crate::enrich::{DurationEnricher, EnrichReport};
use crate::error::{RemoteFetchError, SyncError};
use crate::providers::{DurationLookup, PlaylistSource};
use crate::store::{CatalogStore, MissingCatalogPolicy};
use crate::walker::{PaginationWalker, WalkOptions, WalkReport};

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Playlist to walk. When `None` the uploads playlist of the
    /// authenticated account is looked up.
    pub collection_id: Option<String>,
    pub walk: WalkOptions,
    /// Upper bound on sequential duration batches per run.
    pub max_batches: usize,
    pub missing_catalog: MissingCatalogPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            collection_id: None,
            walk: WalkOptions::default(),
            max_batches: 1,
            missing_catalog: MissingCatalogPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub collection_id: String,
    pub walk: WalkReport,
    pub backfilled: usize,
    pub enrich: EnrichReport,
    pub total_entries: usize,
    pub pending_after: usize,
}

pub struct SyncRunner {
    store: CatalogStore,
    source: Arc<dyn PlaylistSource>,
    lookup: Arc<dyn DurationLookup>,
    options: RunOptions,
}

impl std::fmt::Debug for SyncRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncRunner")
            .field("store", &self.store)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SyncRunner {
    pub fn new(
        store: CatalogStore,
        source: Arc<dyn PlaylistSource>,
        lookup: Arc<dyn DurationLookup>,
        options: RunOptions,
    ) -> Self {
        Self {
            store,
            source,
            lookup,
            options,
        }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    /// Execute one run.
    ///
    /// If a remote phase fails after the catalog was loaded, whatever the
    /// run already merged or enriched is written back before the error is
    /// returned. Load failures never write.
    pub async fn run(&self) -> Result<RunSummary, SyncError> {
        let mut catalog =
            self.store.load_or_bootstrap(self.options.missing_catalog)?;
        let snapshot = catalog.clone();

        match self.sync_in_memory(&mut catalog).await {
            Ok(mut summary) => {
                self.store.save(&catalog)?;
                summary.total_entries = catalog.len();
                summary.pending_after = catalog.pending_duration_count();
                info!(
                    path = %self.store.path().display(),
                    entries = summary.total_entries,
                    pending = summary.pending_after,
                    "sync run complete"
                );
                Ok(summary)
            }
            Err(err) => {
                self.salvage(&catalog, &snapshot);
                Err(err.into())
            }
        }
    }

    async fn sync_in_memory(
        &self,
        catalog: &mut Catalog,
    ) -> Result<RunSummary, RemoteFetchError> {
        let collection_id = self.resolve_collection().await?;

        let walk = PaginationWalker::new(self.source.as_ref(), self.options.walk)
            .walk(catalog, &collection_id)
            .await?;

        let backfilled = backfill_video_types(catalog);
        if backfilled > 0 {
            info!(backfilled, "classified entries stored without a type");
        }

        let enrich = DurationEnricher::new(
            self.lookup.as_ref(),
            self.options.max_batches,
        )
        .enrich(catalog)
        .await?;

        Ok(RunSummary {
            collection_id,
            walk,
            backfilled,
            enrich,
            total_entries: 0,
            pending_after: 0,
        })
    }

    async fn resolve_collection(&self) -> Result<String, RemoteFetchError> {
        if let Some(id) = self
            .options
            .collection_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
        {
            return Ok(id.to_owned());
        }

        let uploads = self
            .source
            .default_collection()
            .await
            .map_err(RemoteFetchError::Resolve)?
            .ok_or(RemoteFetchError::NoUploadsPlaylist)?;
        info!(collection_id = %uploads, "resolved uploads playlist");
        Ok(uploads)
    }

    fn salvage(&self, catalog: &Catalog, snapshot: &Catalog) {
        if catalog == snapshot {
            return;
        }
        warn!(
            path = %self.store.path().display(),
            entries = catalog.len(),
            "run failed; saving partial progress"
        );
        if let Err(err) = self.store.save(catalog) {
            error!(
                path = %self.store.path().display(),
                "failed to save partial progress: {err}"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistenceError;
    use crate::providers::ProviderError;
    use crate::providers::traits::{MockDurationLookup, MockPlaylistSource};
    use vidledger_model::{ListingPage, PageCursor, RemoteItem};

    fn item(id: &str, title: &str) -> RemoteItem {
        RemoteItem {
            video_id: id.into(),
            title: title.into(),
            published_at: "2021-06-01T12:00:00Z".into(),
        }
    }

    fn runner(
        dir: &tempfile::TempDir,
        source: MockPlaylistSource,
        lookup: MockDurationLookup,
        options: RunOptions,
    ) -> SyncRunner {
        SyncRunner::new(
            CatalogStore::new(dir.path().join("knownvideos.toml")),
            Arc::new(source),
            Arc::new(lookup),
            options,
        )
    }

    #[tokio::test]
    async fn discovers_uploads_playlist_when_none_configured() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let mut source = MockPlaylistSource::new();
        source
            .expect_default_collection()
            .times(1)
            .returning(|| Ok(Some("UUchannel".into())));
        source
            .expect_list_page()
            .withf(|collection, _, _| collection == "UUchannel")
            .times(1)
            .returning(|_, _, _| {
                Ok(ListingPage {
                    items: vec![item("a", "Live Stream: a")],
                    next_cursor: PageCursor::start(),
                })
            });
        let mut lookup = MockDurationLookup::new();
        lookup.expect_lookup_many().times(1).returning(|_| {
            Ok(vec![vidledger_model::DurationRecord {
                video_id: "a".into(),
                wire_duration: "PT10M".into(),
            }])
        });

        let summary = runner(&dir, source, lookup, RunOptions::default())
            .run()
            .await
            .expect("run");
        assert_eq!(summary.collection_id, "UUchannel");
        assert_eq!(summary.total_entries, 1);
        assert_eq!(summary.pending_after, 0);
    }

    #[tokio::test]
    async fn configured_playlist_skips_discovery() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let mut source = MockPlaylistSource::new();
        source.expect_default_collection().times(0);
        source.expect_list_page().times(1).returning(|_, _, _| {
            Ok(ListingPage {
                items: Vec::new(),
                next_cursor: PageCursor::start(),
            })
        });
        let mut lookup = MockDurationLookup::new();
        lookup.expect_lookup_many().times(0);

        let options = RunOptions {
            collection_id: Some("PLfixed".into()),
            ..RunOptions::default()
        };
        let summary = runner(&dir, source, lookup, options)
            .run()
            .await
            .expect("run");
        assert_eq!(summary.collection_id, "PLfixed");
        assert_eq!(summary.enrich.batches, 0);
        // An empty run still writes a catalog file.
        assert!(dir.path().join("knownvideos.toml").exists());
    }

    #[tokio::test]
    async fn account_without_uploads_is_an_error() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let mut source = MockPlaylistSource::new();
        source
            .expect_default_collection()
            .returning(|| Ok(None));

        let err = runner(&dir, source, MockDurationLookup::new(), RunOptions::default())
            .run()
            .await
            .expect_err("no uploads");
        assert!(matches!(
            err,
            SyncError::RemoteFetch(RemoteFetchError::NoUploadsPlaylist)
        ));
        assert!(!dir.path().join("knownvideos.toml").exists());
    }

    #[tokio::test]
    async fn enrichment_failure_keeps_walk_results() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let mut source = MockPlaylistSource::new();
        source.expect_list_page().returning(|_, _, _| {
            Ok(ListingPage {
                items: vec![item("a", "a"), item("b", "b")],
                next_cursor: PageCursor::start(),
            })
        });
        let mut lookup = MockDurationLookup::new();
        lookup
            .expect_lookup_many()
            .returning(|_| Err(ProviderError::RateLimited));

        let options = RunOptions {
            collection_id: Some("PL".into()),
            ..RunOptions::default()
        };
        let runner = runner(&dir, source, lookup, options);
        let err = runner.run().await.expect_err("lookup fails");
        assert!(matches!(
            err,
            SyncError::RemoteFetch(RemoteFetchError::Batch { size: 2, .. })
        ));

        let saved = runner.store().load().expect("salvaged catalog");
        assert_eq!(saved.len(), 2);
        assert_eq!(saved.pending_duration_count(), 2);
    }

    #[tokio::test]
    async fn fail_policy_refuses_missing_catalog() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let mut source = MockPlaylistSource::new();
        source.expect_list_page().times(0);
        source.expect_default_collection().times(0);

        let options = RunOptions {
            collection_id: Some("PL".into()),
            missing_catalog: MissingCatalogPolicy::Fail,
            ..RunOptions::default()
        };
        let err = runner(&dir, source, MockDurationLookup::new(), options)
            .run()
            .await
            .expect_err("missing catalog");
        assert!(matches!(
            err,
            SyncError::Persistence(PersistenceError::NotFound { .. })
        ));
    }
}
