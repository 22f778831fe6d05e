use std::sync::Arc;
use std::time::Duration;

use tmdb_addon_core::ContentType;
use tmdb_addon_core::models::DetailObject;
use tmdb_addon_metadata::GenreTable;
use tmdb_addon_metadata::provider::{MetadataProvider, PosterProbe, RatingSource};

use crate::cache::TtlCache;
use crate::meta::DetailKey;

pub const DETAIL_TTL: Duration = Duration::from_secs(60 * 60);
pub const RATING_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const GENRE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Runtime knobs read once at start-up.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Public host of this addon, used in genre discovery links.
    pub host_name: String,
    /// Upper bound on concurrent poster probes and season fetches per request.
    pub probe_concurrency: usize,
    pub cache_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host_name: "localhost:1337".to_string(),
            probe_concurrency: 16,
            cache_capacity: 10_000,
        }
    }
}

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn MetadataProvider>,
    pub probe: Arc<dyn PosterProbe>,
    pub ratings: Option<Arc<dyn RatingSource>>,
    pub detail_cache: TtlCache<DetailKey, DetailObject>,
    /// IMDb id → rating; `None` values record "no rating available".
    pub rating_cache: TtlCache<String, Option<String>>,
    pub genre_cache: TtlCache<(ContentType, String), GenreTable>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        probe: Arc<dyn PosterProbe>,
        ratings: Option<Arc<dyn RatingSource>>,
        settings: Settings,
    ) -> Self {
        let capacity = settings.cache_capacity;
        Self {
            provider,
            probe,
            ratings,
            detail_cache: TtlCache::new(DETAIL_TTL, capacity),
            rating_cache: TtlCache::new(RATING_TTL, capacity),
            genre_cache: TtlCache::new(GENRE_TTL, 64),
            settings: Arc::new(settings),
        }
    }

    /// Genre table for one type and language. A failed fetch degrades to an
    /// empty table and is not cached.
    pub async fn genres(&self, content_type: ContentType, language: &str) -> GenreTable {
        let key = (content_type, language.to_string());
        let provider = &self.provider;
        match self
            .genre_cache
            .cache_wrap(key, || provider.genres(content_type, language))
            .await
        {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(%content_type, language, error = %e, "genre list unavailable");
                GenreTable::default()
            }
        }
    }
}
