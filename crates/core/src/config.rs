//! Per-request addon configuration carried in the route token.
//!
//! The token is produced by the configuration UI. Three encodings are in the
//! wild, tried in order:
//! 1. lz-string `compressToEncodedURIComponent` of a JSON object,
//! 2. the raw JSON object,
//! 3. a bare language code (the oldest links).
//!
//! Decoding never fails. Any JSON object is kept; unreadable fields fall back
//! to their defaults.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::types::{ContentType, UnknownType, canonicalize};

pub const DEFAULT_LANGUAGE: &str = "en-US";
pub const DEFAULT_CAST_COUNT: usize = 10;

/// Built field by field from the token's JSON object, so one mistyped or
/// `null` field falls back to its default without discarding the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub catalogs: Vec<CatalogConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpdbkey: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub hide_episode_thumbnails: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub hide_in_cinema_tag: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub show_age_rating: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cast_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogConfig {
    pub id: String,
    /// Canonical label after [`decode`]; unrecognized labels are kept verbatim.
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default = "default_true", deserialize_with = "lenient_bool_or_true")]
    pub enabled: bool,
    #[serde(default = "default_true", deserialize_with = "lenient_bool_or_true")]
    pub show_in_home: bool,
}

impl CatalogConfig {
    pub fn content_type(&self) -> Result<ContentType, UnknownType> {
        canonicalize(&self.content_type)
    }
}

impl Config {
    /// Language tag for upstream requests.
    pub fn language(&self) -> &str {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    pub fn rpdb_key(&self) -> Option<&str> {
        self.rpdbkey.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn cast_count(&self) -> usize {
        self.cast_count.unwrap_or(DEFAULT_CAST_COUNT)
    }

    /// Compact token form, as produced by the configuration UI.
    pub fn encode(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        lz_str::compress_to_encoded_uri_component(json.as_str())
    }

    fn from_fields(fields: &Map<String, Value>) -> Self {
        let catalogs = match fields.get("catalogs") {
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(|entry| match CatalogConfig::deserialize(entry) {
                    Ok(catalog) => Some(catalog),
                    Err(err) => {
                        warn!(error = %err, "skipping unreadable catalog entry");
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        };
        Self {
            language: text_value(fields.get("language")),
            catalogs,
            rpdbkey: text_value(fields.get("rpdbkey").or_else(|| fields.get("rpdbKey"))),
            session_id: text_value(fields.get("sessionId")),
            hide_episode_thumbnails: flag_value(fields.get("hideEpisodeThumbnails"), false),
            hide_in_cinema_tag: flag_value(fields.get("hideInCinemaTag"), false),
            show_age_rating: flag_value(fields.get("showAgeRating"), false),
            cast_count: count_value(fields.get("castCount")),
        }
    }

    fn normalize_catalog_types(&mut self) {
        for catalog in &mut self.catalogs {
            match catalog.content_type() {
                Ok(ty) => catalog.content_type = ty.as_str().to_string(),
                Err(err) => warn!(catalog = %catalog.id, error = %err, "catalog type not recognized"),
            }
        }
    }
}

/// Decode a route token into a [`Config`].
pub fn decode(token: Option<&str>) -> Config {
    let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
        return Config::default();
    };

    let mut config = match decode_compressed(token).or_else(|| decode_json(token)) {
        Some(Value::Object(fields)) => Config::from_fields(&fields),
        Some(other) => {
            debug!(kind = json_kind(&other), "config token is not an object");
            Config::default()
        }
        None => {
            debug!(token, "config token treated as a language code");
            Config {
                language: Some(token.to_string()),
                ..Config::default()
            }
        }
    };

    config.normalize_catalog_types();
    config
}

fn decode_compressed(token: &str) -> Option<Value> {
    let wide = lz_str::decompress_from_encoded_uri_component(token)?;
    let json = String::from_utf16(&wide).ok()?;
    if json.is_empty() {
        return None;
    }
    serde_json::from_str(&json).ok()
}

fn decode_json(token: &str) -> Option<Value> {
    serde_json::from_str(token).ok()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn default_true() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Strings are taken as-is; numbers (seen for session ids) are stringified.
fn text_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Older payloads stored flags as `"true"` / `"false"` strings.
fn flag_value(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => match s.trim() {
            s if s.eq_ignore_ascii_case("true") => true,
            s if s.eq_ignore_ascii_case("false") => false,
            _ => default,
        },
        _ => default,
    }
}

fn count_value(value: Option<&Value>) -> Option<usize> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_bool_or_true<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(flag_value(Option::<Value>::deserialize(deserializer)?.as_ref(), true))
}
