//! Raw upstream list records → [`ListItem`].
//!
//! A batch of N records always yields N items. A record that cannot be read
//! becomes a minimal placeholder instead of aborting the batch.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tmdb_addon_core::models::{ListItem, POSTER_SHAPE_REGULAR, TMDB_ID_PREFIX};
use tmdb_addon_core::{ContentType, canonicalize};
use tracing::warn;

use crate::GenreTable;
use crate::tmdb::IMAGE_BASE;

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{4}$").unwrap());

const UNKNOWN_TITLE: &str = "Unknown Title";
const FALLBACK_TITLE: &str = "Error parsing item";
const FALLBACK_DESCRIPTION: &str = "Error occurred while parsing this item";

#[derive(Debug, Error)]
enum NormalizeError {
    #[error("record is not an object")]
    NotAnObject,
    #[error("record has no id")]
    MissingId,
}

/// Normalize one record. Never fails.
pub fn parse_media(raw: &Value, type_hint: ContentType, genres: &GenreTable) -> ListItem {
    match try_parse_media(raw, type_hint, genres) {
        Ok(item) => item,
        Err(err) => {
            warn!(error = %err, record = %raw, "failed to parse media item");
            fallback_item(raw, type_hint)
        }
    }
}

pub fn parse_media_batch(
    raws: &[Value],
    type_hint: ContentType,
    genres: &GenreTable,
) -> Vec<ListItem> {
    raws.iter()
        .map(|raw| parse_media(raw, type_hint, genres))
        .collect()
}

fn try_parse_media(
    raw: &Value,
    type_hint: ContentType,
    genres: &GenreTable,
) -> Result<ListItem, NormalizeError> {
    if !raw.is_object() {
        return Err(NormalizeError::NotAnObject);
    }
    let id = record_id(raw).ok_or(NormalizeError::MissingId)?;

    // Mixed listings tag each record; `tv` is reconciled here.
    let content_type = raw["media_type"]
        .as_str()
        .and_then(|t| canonicalize(t).ok())
        .unwrap_or(type_hint);

    Ok(ListItem {
        id: format!("{TMDB_ID_PREFIX}{id}"),
        name: title_of(raw).unwrap_or(UNKNOWN_TITLE).to_string(),
        content_type,
        year: parse_list_year(raw, content_type, &id),
        genre: resolve_genres(raw, genres, &id),
        poster: image_url(&raw["poster_path"], "w500"),
        background: image_url(&raw["backdrop_path"], "original"),
        poster_shape: POSTER_SHAPE_REGULAR.to_string(),
        imdb_rating: raw["vote_average"]
            .as_f64()
            .filter(|v| *v > 0.0)
            .map(|v| format!("{v:.1}"))
            .unwrap_or_else(|| "N/A".to_string()),
        description: raw["overview"].as_str().unwrap_or_default().to_string(),
    })
}

fn fallback_item(raw: &Value, type_hint: ContentType) -> ListItem {
    ListItem {
        id: format!(
            "{TMDB_ID_PREFIX}{}",
            record_id(raw).unwrap_or_else(|| "unknown".to_string())
        ),
        name: title_of(raw).unwrap_or(FALLBACK_TITLE).to_string(),
        content_type: type_hint,
        year: String::new(),
        genre: Vec::new(),
        poster: None,
        background: None,
        poster_shape: POSTER_SHAPE_REGULAR.to_string(),
        imdb_rating: "N/A".to_string(),
        description: FALLBACK_DESCRIPTION.to_string(),
    }
}

fn record_id(raw: &Value) -> Option<String> {
    match &raw["id"] {
        Value::Number(n) => n.as_u64().map(|n| n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn title_of(raw: &Value) -> Option<&str> {
    ["title", "name"]
        .iter()
        .filter_map(|k| raw[*k].as_str())
        .find(|t| !t.trim().is_empty())
}

fn image_url(path: &Value, size: &str) -> Option<String> {
    path.as_str()
        .filter(|p| !p.is_empty())
        .map(|p| format!("{IMAGE_BASE}/{size}{p}"))
}

fn parse_list_year(raw: &Value, content_type: ContentType, id: &str) -> String {
    let date_field = match content_type {
        ContentType::Movie => "release_date",
        ContentType::Series => "first_air_date",
    };
    let Some(year) = raw[date_field].as_str().and_then(|d| d.get(..4)) else {
        return String::new();
    };
    if YEAR_RE.is_match(year) {
        year.to_string()
    } else {
        warn!(item = id, year, "discarding malformed year");
        String::new()
    }
}

fn resolve_genres(raw: &Value, genres: &GenreTable, id: &str) -> Vec<String> {
    let Some(ids) = raw["genre_ids"].as_array() else {
        return Vec::new();
    };
    let names: Vec<String> = ids
        .iter()
        .filter_map(Value::as_u64)
        .filter_map(|gid| genres.name_of(gid))
        .map(str::to_string)
        .collect();
    if names.is_empty() && !ids.is_empty() {
        warn!(item = id, genre_ids = ?ids, "no genre names resolved");
    }
    names
}
