//! Addon manifest derived from the request config.

use chrono::Datelike;
use serde::Serialize;
use tmdb_addon_core::{CatalogConfig, Config, ContentType};
use tmdb_addon_metadata::GenreTable;
use tracing::warn;

use crate::catalog::{FAVORITES, LANGUAGE, PEOPLE, SEARCH, TOP, TRENDING, WATCHLIST, YEAR};

pub const ADDON_ID: &str = "tmdb-addon";
pub const ADDON_NAME: &str = "The Movie Database";
const YEAR_OPTIONS: i32 = 20;
const LANGUAGE_OPTIONS: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "ja", "ko", "zh", "ru", "hi", "tr", "ar", "nl", "pl", "sv",
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: String,
    pub version: String,
    pub name: String,
    pub description: String,
    pub resources: Vec<String>,
    pub types: Vec<String>,
    pub id_prefixes: Vec<String>,
    pub catalogs: Vec<ManifestCatalog>,
    pub behavior_hints: ManifestHints,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestHints {
    pub configurable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestCatalog {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub name: String,
    pub extra: Vec<ManifestExtra>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestExtra {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub is_required: bool,
}

impl ManifestExtra {
    fn new(name: &str, options: Vec<String>, is_required: bool) -> Self {
        Self {
            name: name.to_string(),
            options,
            is_required,
        }
    }
}

/// Genre tables used to fill catalog genre options.
pub struct ManifestGenres<'a> {
    pub movie: &'a GenreTable,
    pub series: &'a GenreTable,
}

impl ManifestGenres<'_> {
    fn for_type(&self, content_type: ContentType) -> &GenreTable {
        match content_type {
            ContentType::Movie => self.movie,
            ContentType::Series => self.series,
        }
    }
}

pub fn build_manifest(config: &Config, genres: &ManifestGenres<'_>) -> Manifest {
    let mut entries: Vec<(CatalogConfig, ContentType)> = if config.catalogs.is_empty() {
        default_catalogs()
    } else {
        config
            .catalogs
            .iter()
            .filter(|c| c.enabled)
            .filter_map(|c| match c.content_type() {
                Ok(ct) => Some((c.clone(), ct)),
                Err(e) => {
                    warn!(catalog = %c.id, error = %e, "skipping catalog with unknown type");
                    None
                }
            })
            .collect()
    };

    let has_session = config.session_id().is_some();
    entries.retain(|(c, _)| has_session || (c.id != FAVORITES && c.id != WATCHLIST));

    for ct in [ContentType::Movie, ContentType::Series] {
        if !entries.iter().any(|(c, t)| c.id == SEARCH && *t == ct) {
            entries.push((catalog_entry(SEARCH, ct), ct));
        }
    }

    let catalogs = entries
        .iter()
        .map(|(c, ct)| ManifestCatalog {
            id: c.id.clone(),
            content_type: *ct,
            name: catalog_name(&c.id).to_string(),
            extra: catalog_extras(c, genres.for_type(*ct)),
        })
        .collect();

    Manifest {
        id: ADDON_ID.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        name: ADDON_NAME.to_string(),
        description: "Movie and series catalogs and metadata from TMDB".to_string(),
        resources: vec!["catalog".to_string(), "meta".to_string()],
        types: vec![
            ContentType::Movie.as_str().to_string(),
            ContentType::Series.as_str().to_string(),
        ],
        id_prefixes: vec!["tmdb:".to_string(), "tt".to_string()],
        catalogs,
        behavior_hints: ManifestHints { configurable: true },
    }
}

fn catalog_entry(id: &str, content_type: ContentType) -> CatalogConfig {
    CatalogConfig {
        id: id.to_string(),
        content_type: content_type.as_str().to_string(),
        enabled: true,
        show_in_home: true,
    }
}

fn default_catalogs() -> Vec<(CatalogConfig, ContentType)> {
    [TOP, TRENDING]
        .into_iter()
        .flat_map(|id| {
            [ContentType::Movie, ContentType::Series]
                .into_iter()
                .map(move |ct| (catalog_entry(id, ct), ct))
        })
        .collect()
}

fn catalog_name(id: &str) -> &str {
    match id {
        TOP => "Popular",
        TRENDING => "Trending",
        FAVORITES => "Favorites",
        WATCHLIST => "Watchlist",
        YEAR => "By Year",
        LANGUAGE => "By Language",
        SEARCH => "Search",
        PEOPLE => "Cast & Crew Search",
        other => other,
    }
}

fn catalog_extras(catalog: &CatalogConfig, genres: &GenreTable) -> Vec<ManifestExtra> {
    if catalog.id == SEARCH || catalog.id == PEOPLE {
        return vec![ManifestExtra::new("search", Vec::new(), true)];
    }
    let options = match catalog.id.as_str() {
        YEAR => {
            let current = chrono::Utc::now().year();
            (0..YEAR_OPTIONS).map(|back| (current - back).to_string()).collect()
        }
        LANGUAGE => LANGUAGE_OPTIONS.iter().map(|l| l.to_string()).collect(),
        _ => genres.names().map(str::to_string).collect(),
    };
    vec![
        ManifestExtra::new("genre", options, !catalog.show_in_home),
        ManifestExtra::new("skip", Vec::new(), false),
    ]
}
