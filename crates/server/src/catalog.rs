//! Catalog routing: picks a resolver for a catalog request and turns the
//! upstream page into `{metas}`.

use chrono::Datelike;
use serde_json::Value;
use tmdb_addon_core::models::MetaList;
use tmdb_addon_core::{Config, ContentType};
use tmdb_addon_metadata::normalize::parse_media_batch;
use tmdb_addon_metadata::provider::{AccountList, DiscoverFilter, DiscoverQuery, TimeWindow};
use tmdb_addon_metadata::{GenreTable, MetadataError};
use tracing::{debug, info};

use crate::enrich::enrich_posters;
use crate::state::AppState;

/// Items per upstream page. Used for every catalog.
pub const PAGE_SIZE: u64 = 100;

pub const TOP: &str = "tmdb.top";
pub const TRENDING: &str = "tmdb.trending";
pub const FAVORITES: &str = "tmdb.favorites";
pub const WATCHLIST: &str = "tmdb.watchlist";
pub const SEARCH: &str = "tmdb.search";
pub const PEOPLE: &str = "tmdb.people";
pub const YEAR: &str = "tmdb.year";
pub const LANGUAGE: &str = "tmdb.language";

/// Decoded `{extra}` path fragment (`genre=Action&skip=100`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogExtra {
    pub genre: Option<String>,
    pub skip: Option<String>,
    pub search: Option<String>,
}

impl CatalogExtra {
    pub fn parse(fragment: Option<&str>) -> Self {
        let mut extra = Self::default();
        let Some(fragment) = fragment else {
            return extra;
        };
        for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "genre" => extra.genre = Some(value.to_string()),
                "skip" => extra.skip = Some(value.to_string()),
                "search" => extra.search = Some(value.to_string()),
                other => debug!(key = other, "ignoring unknown catalog extra"),
            }
        }
        extra
    }
}

/// 1-based upstream page for a client `skip` offset.
pub fn page_from_skip(skip: Option<&str>) -> u32 {
    skip.and_then(|s| s.parse::<u64>().ok())
        .map(|skip| skip.div_ceil(PAGE_SIZE) + 1)
        .and_then(|page| u32::try_from(page).ok())
        .unwrap_or(1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRequest {
    pub catalog_id: String,
    pub content_type: ContentType,
    pub language: String,
    pub page: u32,
    pub genre: Option<String>,
    pub search: Option<String>,
}

impl CatalogRequest {
    pub fn new(
        catalog_id: &str,
        content_type: ContentType,
        config: &Config,
        extra: CatalogExtra,
    ) -> Self {
        Self {
            catalog_id: catalog_id.to_string(),
            content_type,
            language: config.language().to_string(),
            page: page_from_skip(extra.skip.as_deref()),
            genre: extra.genre,
            search: extra.search,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    Titles,
    People,
}

/// Which resolver serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolver {
    Search(SearchScope),
    Trending,
    Personal(AccountList),
    Discover,
}

impl Resolver {
    /// A search term wins over the catalog id; the id then only picks the
    /// search scope.
    pub fn select(catalog_id: &str, search: Option<&str>) -> Self {
        if search.is_some() {
            return match catalog_id {
                PEOPLE => Self::Search(SearchScope::People),
                _ => Self::Search(SearchScope::Titles),
            };
        }
        match catalog_id {
            TRENDING => Self::Trending,
            FAVORITES => Self::Personal(AccountList::Favorites),
            WATCHLIST => Self::Personal(AccountList::Watchlist),
            _ => Self::Discover,
        }
    }
}

/// Resolve one catalog request into list items, RPDB posters included when
/// the config carries a key.
pub async fn resolve(
    state: &AppState,
    request: &CatalogRequest,
    config: &Config,
) -> Result<MetaList, MetadataError> {
    let provider = &state.provider;
    let ct = request.content_type;
    let lang = request.language.as_str();
    let resolver = Resolver::select(&request.catalog_id, request.search.as_deref());
    info!(
        provider = provider.name(),
        catalog = %request.catalog_id,
        content_type = %ct,
        page = request.page,
        ?resolver,
        "resolving catalog"
    );

    let genres = state.genres(ct, lang).await;
    let raws = match resolver {
        Resolver::Search(scope) => {
            let query = request.search.as_deref().unwrap_or_default();
            match scope {
                SearchScope::Titles => provider.search(ct, query, lang, request.page).await?,
                // Person credits come back in one piece.
                SearchScope::People if request.page > 1 => Vec::new(),
                SearchScope::People => provider.search_person_credits(ct, query, lang).await?,
            }
        }
        Resolver::Trending => {
            let raws = provider
                .trending(ct, TimeWindow::Day, lang, request.page)
                .await?;
            filter_by_genre(raws, request.genre.as_deref(), &genres)
        }
        Resolver::Personal(list) => match config.session_id() {
            None => {
                debug!(catalog = %request.catalog_id, "no session id, personal list is empty");
                Vec::new()
            }
            Some(session_id) => {
                let raws = provider
                    .account_list(list, ct, session_id, lang, request.page)
                    .await?;
                filter_by_genre(raws, request.genre.as_deref(), &genres)
            }
        },
        Resolver::Discover => match discover_filter(request, &genres) {
            Some(filter) => {
                let query = DiscoverQuery {
                    language: request.language.clone(),
                    page: request.page,
                    filter,
                };
                provider.discover(ct, &query).await?
            }
            None => Vec::new(),
        },
    };

    let items = parse_media_batch(&raws, ct, &genres);
    let items = match config.rpdb_key() {
        Some(key) => {
            enrich_posters(
                items,
                state.probe.as_ref(),
                lang,
                key,
                state.settings.probe_concurrency,
            )
            .await
        }
        None => items,
    };
    Ok(MetaList::from(items))
}

/// Upstream filter for a discover catalog. `None` when the genre extra names
/// a genre this language does not have, which means an empty page.
pub fn discover_filter(request: &CatalogRequest, genres: &GenreTable) -> Option<DiscoverFilter> {
    let genre = request.genre.as_deref();
    match request.catalog_id.as_str() {
        YEAR => {
            let year = genre
                .and_then(|g| g.parse::<i32>().ok())
                .unwrap_or_else(|| chrono::Utc::now().year());
            Some(DiscoverFilter::Year(year))
        }
        LANGUAGE => Some(match genre {
            Some(code) => DiscoverFilter::OriginalLanguage(code.to_lowercase()),
            None => DiscoverFilter::Popular { genre_id: None },
        }),
        _ => match genre {
            None => Some(DiscoverFilter::Popular { genre_id: None }),
            Some(name) => match genres.ids_named(name).first() {
                Some(id) => Some(DiscoverFilter::Popular { genre_id: Some(*id) }),
                None => {
                    debug!(genre = name, "genre not in table, empty page");
                    None
                }
            },
        },
    }
}

/// Keep records whose `genre_ids` include a genre named `genre`.
pub fn filter_by_genre(raws: Vec<Value>, genre: Option<&str>, genres: &GenreTable) -> Vec<Value> {
    let Some(genre) = genre else {
        return raws;
    };
    let wanted = genres.ids_named(genre);
    raws.into_iter()
        .filter(|raw| {
            raw["genre_ids"]
                .as_array()
                .is_some_and(|ids| ids.iter().filter_map(Value::as_u64).any(|id| wanted.contains(&id)))
        })
        .collect()
}
