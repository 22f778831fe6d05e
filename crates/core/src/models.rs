//! Response shapes served to the media-center client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ContentType;

pub const TMDB_ID_PREFIX: &str = "tmdb:";
pub const POSTER_SHAPE_REGULAR: &str = "regular";

/// Lightweight record shown in catalog, search and trending grids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub year: String,
    pub genre: Vec<String>,
    pub poster: Option<String>,
    pub background: Option<String>,
    pub poster_shape: String,
    pub imdb_rating: String,
    pub description: String,
}

impl ListItem {
    /// Upstream id without the `tmdb:` prefix.
    pub fn tmdb_id(&self) -> Option<&str> {
        self.id
            .strip_prefix(TMDB_ID_PREFIX)
            .filter(|id| !id.is_empty() && *id != "unknown")
    }
}

/// `{ "metas": [...] }` body of a catalog response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaList {
    pub metas: Vec<ListItem>,
}

impl MetaList {
    pub fn empty() -> Self {
        Self::default()
    }
}

impl From<Vec<ListItem>> for MetaList {
    fn from(metas: Vec<ListItem>) -> Self {
        Self { metas }
    }
}

/// Full single-title record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailObject {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub genre: Vec<String>,
    pub genres: Vec<String>,
    pub director: Vec<String>,
    pub writer: Vec<String>,
    pub imdb_rating: String,
    pub year: String,
    pub release_info: String,
    pub released: Option<DateTime<Utc>>,
    pub runtime: String,
    pub country: String,
    pub poster: Option<String>,
    pub background: Option<String>,
    pub logo: Option<String>,
    pub trailers: Vec<Trailer>,
    pub trailer_streams: Vec<TrailerStream>,
    pub links: Vec<Link>,
    pub videos: Vec<Video>,
    pub behavior_hints: BehaviorHints,
    #[serde(rename = "imdb_id", skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_rating: Option<String>,
    #[serde(rename = "app_extras")]
    pub app_extras: AppExtras,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trailer {
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailerStream {
    pub title: String,
    pub yt_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub name: String,
    pub category: String,
    pub url: String,
}

/// One episode of a series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub season: u32,
    pub episode: u32,
    pub released: Option<DateTime<Utc>>,
    pub overview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorHints {
    pub default_video_id: Option<String>,
    pub has_scheduled_videos: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppExtras {
    pub cast: Vec<CastMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CastMember {
    pub name: String,
    pub character: String,
    pub photo: Option<String>,
}
