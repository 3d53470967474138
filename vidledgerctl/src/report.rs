//! Plain-text and JSON renderings of the catalog and run results.

use std::time::Duration;

use serde::Serialize;
use vidledger_core::model::{Catalog, CatalogEntry, VideoType};
use vidledger_core::{MAX_BATCH_SIZE, RunSummary, classify};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    pub video_id: String,
    pub title: String,
    pub published: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
    pub video_type: String,
}

impl ReportLine {
    fn from_entry(entry: &CatalogEntry) -> Self {
        Self {
            video_id: entry.video_id().to_string(),
            title: entry.title().to_string(),
            published: entry.published().to_rfc3339(),
            duration_secs: (!entry.is_pending())
                .then(|| entry.duration().as_secs()),
            video_type: entry.video_type().to_string(),
        }
    }

    /// `<id>  "<title>"  <duration>` for livestreams; other entries are
    /// marked as skipped.
    pub fn render(&self, entry_type: VideoType) -> String {
        let tail = match (entry_type, self.duration_secs) {
            (VideoType::Livestream, Some(secs)) => {
                humantime::format_duration(Duration::from_secs(secs)).to_string()
            }
            (VideoType::Livestream, None) => "pending".to_string(),
            _ => "skipped".to_string(),
        };
        format!("{}  {:?}  {tail}", self.video_id, self.title)
    }
}

/// Stored type, or the title classification for entries saved untyped.
fn effective_type(entry: &CatalogEntry) -> VideoType {
    match entry.video_type() {
        VideoType::Unknown => classify(entry.title()),
        known => known,
    }
}

/// Livestream entries newest first. With `include_all`, every other entry
/// is listed too in the same order.
pub fn report_entries(
    catalog: &Catalog,
    include_all: bool,
) -> Vec<(VideoType, ReportLine)> {
    let mut entries: Vec<(VideoType, &CatalogEntry)> = catalog
        .iter()
        .map(|(_, entry)| (effective_type(entry), entry))
        .filter(|(video_type, _)| {
            include_all || *video_type == VideoType::Livestream
        })
        .collect();
    entries.sort_by(|(_, a), (_, b)| {
        b.published()
            .cmp(&a.published())
            .then_with(|| a.video_id().cmp(b.video_id()))
    });
    entries
        .into_iter()
        .map(|(video_type, entry)| {
            let mut line = ReportLine::from_entry(entry);
            line.video_type = video_type.to_string();
            (video_type, line)
        })
        .collect()
}

pub fn render_report(catalog: &Catalog, include_all: bool) -> String {
    report_entries(catalog, include_all)
        .iter()
        .map(|(video_type, line)| line.render(*video_type))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingSummary {
    pub total: usize,
    pub pending: usize,
    /// Runs needed to clear the backlog at `max_batches` per run.
    pub runs_needed: usize,
}

pub fn pending_summary(catalog: &Catalog, max_batches: usize) -> PendingSummary {
    let pending = catalog.pending_duration_count();
    let per_run = MAX_BATCH_SIZE * max_batches.max(1);
    PendingSummary {
        total: catalog.len(),
        pending,
        runs_needed: pending.div_ceil(per_run),
    }
}

pub fn render_pending(summary: &PendingSummary) -> String {
    format!(
        "{} of {} entries lack a duration ({} more run(s) at the current batch limit)",
        summary.pending, summary.total, summary.runs_needed
    )
}

pub fn render_summary(summary: &RunSummary) -> String {
    let mut lines = vec![
        format!("playlist:  {}", summary.collection_id),
        format!(
            "listing:   {} page(s), {} item(s) seen, {} new, {} skipped{}",
            summary.walk.pages,
            summary.walk.seen,
            summary.walk.inserted,
            summary.walk.skipped,
            if summary.walk.stopped_early {
                " (stopped early)"
            } else {
                ""
            }
        ),
        format!(
            "durations: {} applied in {} batch(es), {} missing, {} not yet available, {} malformed",
            summary.enrich.applied,
            summary.enrich.batches,
            summary.enrich.missing.len(),
            summary.enrich.still_unset.len(),
            summary.enrich.malformed.len()
        ),
        format!(
            "catalog:   {} entries, {} pending",
            summary.total_entries, summary.pending_after
        ),
    ];
    if summary.backfilled > 0 {
        lines.insert(
            2,
            format!("types:     {} entries classified", summary.backfilled),
        );
    }
    lines.join("\n")
}
