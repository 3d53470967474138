//! Second phase: fill in durations through the batched lookup.
//!
//! A run enriches at most `max_batches` batches of [`MAX_BATCH_SIZE`]
//! entries. Catalogs with more pending entries converge over several runs.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};
use vidledger_model::{Catalog, DurationUpdate};

use crate::error::{DurationParseError, RemoteFetchError};
use crate::providers::DurationLookup;

/// Upstream limit on ids per lookup request.
pub const MAX_BATCH_SIZE: usize = 50;

const PERIOD_DESIGNATOR: &str = "PT";

/// At most [`MAX_BATCH_SIZE`] pending keys, least-attempted first.
///
/// Keys the lookup never resolves collect attempts and fall behind fresh
/// ones, so a backlog of dead ids cannot starve the rest across runs.
pub fn select_pending(catalog: &Catalog) -> Vec<String> {
    select_pending_excluding(catalog, &HashSet::new())
}

/// Like [`select_pending`], skipping keys already attempted this run.
pub fn select_pending_excluding(
    catalog: &Catalog,
    attempted: &HashSet<String>,
) -> Vec<String> {
    catalog
        .pending_keys_by_attempts()
        .into_iter()
        .filter(|key| !attempted.contains(*key))
        .take(MAX_BATCH_SIZE)
        .map(str::to_owned)
        .collect()
}

/// One lookup for exactly `keys`. Ids the remote omits are simply absent
/// from the returned map.
pub async fn fetch_batch<L>(
    lookup: &L,
    keys: &[String],
) -> Result<HashMap<String, String>, RemoteFetchError>
where
    L: DurationLookup + ?Sized,
{
    if keys.len() > MAX_BATCH_SIZE {
        return Err(RemoteFetchError::BatchTooLarge {
            size: keys.len(),
            limit: MAX_BATCH_SIZE,
        });
    }
    if keys.is_empty() {
        return Ok(HashMap::new());
    }

    let records = lookup
        .lookup_many(keys)
        .await
        .map_err(|source| RemoteFetchError::Batch {
            size: keys.len(),
            source,
        })?;

    let requested: HashSet<&str> = keys.iter().map(String::as_str).collect();
    Ok(records
        .into_iter()
        .filter(|record| requested.contains(record.video_id.as_str()))
        .map(|record| (record.video_id, record.wire_duration))
        .collect())
}

/// Parse a wire duration such as `PT1H45M41S`.
///
/// The `PT` designator is stripped and the rest is read as a compact
/// `1h45m41s` expression. Day or week components are not supported, and
/// spans the catalog cannot store (over `i64::MAX` nanoseconds) are
/// rejected.
pub fn parse_duration(wire: &str) -> Result<Duration, DurationParseError> {
    let trimmed = wire.trim();
    let Some(rest) = trimmed.strip_prefix(PERIOD_DESIGNATOR) else {
        return Err(DurationParseError::MissingDesignator {
            wire: wire.to_owned(),
        });
    };

    let duration = humantime::parse_duration(&rest.to_ascii_lowercase())
        .map_err(|source| DurationParseError::Invalid {
            wire: wire.to_owned(),
            source,
        })?;
    if i64::try_from(duration.as_nanos()).is_err() {
        return Err(DurationParseError::OutOfRange {
            wire: wire.to_owned(),
        });
    }
    Ok(duration)
}

/// Parse `wire` and record it as the duration of `key`. The catalog is not
/// touched when parsing fails.
pub fn apply(
    catalog: &mut Catalog,
    key: &str,
    wire: &str,
) -> Result<DurationUpdate, DurationParseError> {
    let duration = parse_duration(wire)?;
    Ok(catalog.upsert_duration(key, duration))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedDuration {
    pub video_id: String,
    pub wire: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichReport {
    pub batches: usize,
    pub requested: usize,
    pub applied: usize,
    /// Requested ids the lookup did not return. They stay pending.
    pub missing: Vec<String>,
    /// Ids the lookup answered with a zero duration (not yet processed
    /// upstream, scheduled streams). They stay pending.
    pub still_unset: Vec<String>,
    pub malformed: Vec<MalformedDuration>,
    pub pending_after: usize,
}

#[derive(Debug)]
pub struct DurationEnricher<'a, L: ?Sized> {
    lookup: &'a L,
    max_batches: usize,
}

impl<'a, L> DurationEnricher<'a, L>
where
    L: DurationLookup + ?Sized,
{
    /// `max_batches` below one is treated as one.
    pub fn new(lookup: &'a L, max_batches: usize) -> Self {
        Self {
            lookup,
            max_batches: max_batches.max(1),
        }
    }

    /// Enrich up to `max_batches` batches, one request at a time.
    ///
    /// A failed request aborts with an error; durations applied by earlier
    /// batches stay in `catalog`.
    pub async fn enrich(
        &self,
        catalog: &mut Catalog,
    ) -> Result<EnrichReport, RemoteFetchError> {
        let mut report = EnrichReport::default();
        let mut attempted = HashSet::new();

        for _ in 0..self.max_batches {
            let keys = select_pending_excluding(catalog, &attempted);
            if keys.is_empty() {
                break;
            }
            attempted.extend(keys.iter().cloned());
            report.batches += 1;
            report.requested += keys.len();

            let resolved = fetch_batch(self.lookup, &keys).await?;
            debug!(
                batch = report.batches,
                requested = keys.len(),
                resolved = resolved.len(),
                "duration batch fetched"
            );

            for key in &keys {
                let Some(wire) = resolved.get(key) else {
                    report.missing.push(key.clone());
                    continue;
                };
                match apply(catalog, key, wire) {
                    Ok(DurationUpdate::Applied) => report.applied += 1,
                    Ok(DurationUpdate::StillUnset) => {
                        report.still_unset.push(key.clone())
                    }
                    Ok(DurationUpdate::AlreadySet | DurationUpdate::Missing) => {}
                    Err(err) => {
                        warn!(video_id = %key, "ignoring duration: {err}");
                        report.malformed.push(MalformedDuration {
                            video_id: key.clone(),
                            wire: wire.clone(),
                        });
                    }
                }
            }
            for key in &keys {
                catalog.record_lookup_attempt(key);
            }
        }

        report.pending_after = catalog.pending_duration_count();
        info!(
            batches = report.batches,
            applied = report.applied,
            missing = report.missing.len(),
            malformed = report.malformed.len(),
            pending = report.pending_after,
            "duration enrichment finished"
        );
        Ok(report)
    }
}
