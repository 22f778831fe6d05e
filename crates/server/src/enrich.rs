//! Best-effort RPDB poster replacement for list responses.

use futures::stream::{self, StreamExt};
use tmdb_addon_core::models::ListItem;
use tmdb_addon_metadata::provider::PosterProbe;
use tmdb_addon_metadata::rpdb::rpdb_poster_url;
use tracing::debug;

/// Swap each item's poster for its RPDB candidate when the probe confirms it
/// exists. Probes run concurrently, at most `concurrency` at a time. Order and
/// length of `items` are preserved.
pub async fn enrich_posters(
    items: Vec<ListItem>,
    probe: &dyn PosterProbe,
    language: &str,
    rpdb_key: &str,
    concurrency: usize,
) -> Vec<ListItem> {
    let mut indexed: Vec<(usize, ListItem)> = stream::iter(items.into_iter().enumerate())
        .map(|(idx, mut item)| async move {
            let Some(tmdb_id) = item.tmdb_id() else {
                return (idx, item);
            };
            let candidate = rpdb_poster_url(item.content_type, tmdb_id, language, rpdb_key);
            if probe.exists(&candidate).await {
                item.poster = Some(candidate);
            } else {
                debug!(item = %item.id, "no RPDB poster, keeping original");
            }
            (idx, item)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    indexed.sort_by_key(|(idx, _)| *idx);
    indexed.into_iter().map(|(_, item)| item).collect()
}
