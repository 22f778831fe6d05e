//! Single-title detail resolution behind the detail cache.

use std::sync::LazyLock;

use futures::stream::{self, StreamExt};
use regex::Regex;
use serde_json::Value;
use tmdb_addon_core::models::{DetailObject, TMDB_ID_PREFIX, Video};
use tmdb_addon_core::{Config, ContentType};
use tmdb_addon_metadata::MetadataError;
use tmdb_addon_metadata::detail::{
    DetailContext, DetailFlags, Enrichments, build_detail, imdb_id_of, parse_episode,
    season_numbers,
};
use tmdb_addon_metadata::rpdb::rpdb_poster_url;
use tracing::{debug, info, warn};

use crate::state::AppState;

static TMDB_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^tmdb:(\d+)$").unwrap());
static IMDB_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^tt\d+$").unwrap());

/// Identity of a cached detail object. Every input that changes the rendered
/// object is a field, so two different requests can never share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DetailKey {
    pub language: String,
    pub content_type: ContentType,
    pub tmdb_id: u64,
    pub flags: DetailFlags,
}

/// Route id of a meta request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaId {
    Tmdb(u64),
    Imdb(String),
}

impl MetaId {
    pub fn parse(raw: &str) -> Option<Self> {
        if let Some(caps) = TMDB_ID_RE.captures(raw) {
            return caps[1].parse().ok().map(Self::Tmdb);
        }
        IMDB_ID_RE
            .is_match(raw)
            .then(|| Self::Imdb(raw.to_string()))
    }
}

#[derive(Debug)]
pub enum MetaOutcome {
    Found(Box<DetailObject>),
    /// The upstream provider has no record for this id.
    NotFound,
    /// The id could not be mapped to an upstream id.
    Unresolved,
}

pub async fn resolve(
    state: &AppState,
    content_type: ContentType,
    raw_id: &str,
    config: &Config,
) -> Result<MetaOutcome, MetadataError> {
    let tmdb_id = match MetaId::parse(raw_id) {
        Some(MetaId::Tmdb(id)) => id,
        Some(MetaId::Imdb(imdb)) => match state.provider.find_by_imdb_id(content_type, &imdb).await? {
            Some(id) => id,
            None => {
                info!(imdb_id = %imdb, "no upstream id for IMDb id");
                return Ok(MetaOutcome::Unresolved);
            }
        },
        None => {
            debug!(id = raw_id, "unrecognized meta id");
            return Ok(MetaOutcome::Unresolved);
        }
    };

    match cached_detail(state, content_type, tmdb_id, config).await {
        Ok(detail) => Ok(MetaOutcome::Found(Box::new(detail))),
        Err(MetadataError::NotFound) => Ok(MetaOutcome::NotFound),
        Err(e) => Err(e),
    }
}

pub async fn cached_detail(
    state: &AppState,
    content_type: ContentType,
    tmdb_id: u64,
    config: &Config,
) -> Result<DetailObject, MetadataError> {
    let key = DetailKey {
        language: config.language().to_string(),
        content_type,
        tmdb_id,
        flags: DetailFlags::from_config(config),
    };
    let producer_key = key.clone();
    state
        .detail_cache
        .cache_wrap(key, || build(state, producer_key))
        .await
}

async fn build(state: &AppState, key: DetailKey) -> Result<DetailObject, MetadataError> {
    let DetailKey {
        language,
        content_type,
        tmdb_id,
        flags,
    } = key;
    info!(%content_type, tmdb_id, language = %language, "building detail");

    let raw = state
        .provider
        .details(content_type, tmdb_id, &language)
        .await?;
    let imdb_id = imdb_id_of(&raw);

    let (poster, logo, imdb_rating, videos) = tokio::join!(
        rpdb_poster(state, content_type, tmdb_id, &language, flags.rpdb_key.as_deref()),
        logo(state, content_type, tmdb_id, &language, &raw),
        imdb_rating(state, content_type, imdb_id.as_deref()),
        episodes(state, content_type, tmdb_id, &language, &raw, imdb_id.as_deref(), &flags),
    );

    let ctx = DetailContext {
        content_type,
        tmdb_id,
        language: &language,
        host_name: &state.settings.host_name,
        flags: &flags,
    };
    Ok(build_detail(
        &raw,
        &ctx,
        Enrichments {
            poster,
            logo,
            imdb_rating,
            videos,
        },
    ))
}

async fn rpdb_poster(
    state: &AppState,
    content_type: ContentType,
    tmdb_id: u64,
    language: &str,
    rpdb_key: Option<&str>,
) -> Option<String> {
    let key = rpdb_key?;
    let candidate = rpdb_poster_url(content_type, &tmdb_id.to_string(), language, key);
    state.probe.exists(&candidate).await.then_some(candidate)
}

async fn logo(
    state: &AppState,
    content_type: ContentType,
    tmdb_id: u64,
    language: &str,
    raw: &Value,
) -> Option<String> {
    let original_language = raw["original_language"].as_str();
    match state
        .provider
        .logo(content_type, tmdb_id, language, original_language)
        .await
    {
        Ok(logo) => logo,
        Err(e) => {
            warn!(tmdb_id, error = %e, "logo lookup failed");
            None
        }
    }
}

async fn imdb_rating(
    state: &AppState,
    content_type: ContentType,
    imdb_id: Option<&str>,
) -> Option<String> {
    let (imdb_id, source) = (imdb_id?, state.ratings.as_ref()?);
    match state
        .rating_cache
        .cache_wrap(imdb_id.to_string(), || source.imdb_rating(imdb_id, content_type))
        .await
    {
        Ok(rating) => rating,
        Err(e) => {
            warn!(imdb_id, error = %e, "rating lookup failed");
            None
        }
    }
}

async fn episodes(
    state: &AppState,
    content_type: ContentType,
    tmdb_id: u64,
    language: &str,
    raw: &Value,
    imdb_id: Option<&str>,
    flags: &DetailFlags,
) -> Vec<Video> {
    if content_type != ContentType::Series {
        return Vec::new();
    }
    let id_prefix = imdb_id
        .map(str::to_string)
        .unwrap_or_else(|| format!("{TMDB_ID_PREFIX}{tmdb_id}"));
    let provider = &state.provider;

    let mut seasons: Vec<(u32, Vec<Value>)> = stream::iter(season_numbers(raw))
        .map(|season| async move {
            match provider.season_episodes(tmdb_id, season, language).await {
                Ok(eps) => (season, eps),
                Err(e) => {
                    warn!(tmdb_id, season, error = %e, "season fetch failed");
                    (season, Vec::new())
                }
            }
        })
        .buffer_unordered(state.settings.probe_concurrency.max(1))
        .collect()
        .await;
    seasons.sort_by_key(|(season, _)| *season);

    seasons
        .iter()
        .flat_map(|(_, eps)| eps.iter())
        .filter_map(|ep| parse_episode(ep, &id_prefix, flags.hide_episode_thumbnails))
        .collect()
}
