use vidledger_model::{Catalog, VideoType};

/// Literal that marks a title as a livestream. Matched case-sensitively
/// anywhere in the title.
pub const LIVESTREAM_MARKER: &str = "Live Stream:";

/// Category for a title. Never returns [`VideoType::Unknown`].
pub fn classify(title: &str) -> VideoType {
    if title.contains(LIVESTREAM_MARKER) {
        VideoType::Livestream
    } else {
        VideoType::Snippet
    }
}

/// Classify entries still tagged [`VideoType::Unknown`]. Returns how many
/// were updated.
pub fn backfill_video_types(catalog: &mut Catalog) -> usize {
    let unclassified: Vec<(String, VideoType)> = catalog
        .iter()
        .filter(|(_, entry)| entry.video_type() == VideoType::Unknown)
        .map(|(key, entry)| (key.to_owned(), classify(entry.title())))
        .collect();

    unclassified
        .into_iter()
        .filter(|(key, video_type)| catalog.backfill_video_type(key, *video_type))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidledger_model::CatalogEntry;
    use vidledger_model::chrono::DateTime;

    #[test]
    fn marker_anywhere_means_livestream() {
        assert_eq!(classify("Live Stream: morning walk"), VideoType::Livestream);
        assert_eq!(
            classify("Day 4 Live Stream: morning walk"),
            VideoType::Livestream
        );
    }

    #[test]
    fn marker_is_case_sensitive_and_exact() {
        assert_eq!(classify("live stream: morning walk"), VideoType::Snippet);
        assert_eq!(classify("Live Stream morning walk"), VideoType::Snippet);
        assert_eq!(classify("LiveStream: morning walk"), VideoType::Snippet);
    }

    #[test]
    fn never_unknown() {
        for title in ["", " ", "Live Stream:", "x", "ライブ Live Stream: 配信"] {
            assert_ne!(classify(title), VideoType::Unknown, "{title:?}");
        }
    }

    #[test]
    fn backfill_classifies_only_unknown_entries() {
        let published =
            DateTime::parse_from_rfc3339("2019-01-01T00:00:00Z").unwrap();
        let mut catalog = Catalog::new();
        catalog.merge(
            "a",
            CatalogEntry::new("a", "Live Stream: a", published, VideoType::Unknown),
        );
        catalog.merge(
            "b",
            CatalogEntry::new("b", "b", published, VideoType::Unknown),
        );
        catalog.merge(
            "c",
            CatalogEntry::new("c", "Live Stream: c", published, VideoType::Snippet),
        );

        assert_eq!(backfill_video_types(&mut catalog), 2);
        assert_eq!(catalog.get("a").unwrap().video_type(), VideoType::Livestream);
        assert_eq!(catalog.get("b").unwrap().video_type(), VideoType::Snippet);
        // Already classified entries are left alone.
        assert_eq!(catalog.get("c").unwrap().video_type(), VideoType::Snippet);
        assert_eq!(backfill_video_types(&mut catalog), 0);
    }
}
