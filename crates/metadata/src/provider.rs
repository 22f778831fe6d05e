use serde_json::Value;
use tmdb_addon_core::ContentType;

use crate::{GenreTable, MetadataError};

/// Read-only view of the upstream metadata provider.
///
/// List operations return raw upstream records; turning them into client
/// shapes is the normalizer's job.
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// One page of a discover listing.
    async fn discover(
        &self,
        content_type: ContentType,
        query: &DiscoverQuery,
    ) -> Result<Vec<Value>, MetadataError>;

    async fn trending(
        &self,
        content_type: ContentType,
        window: TimeWindow,
        language: &str,
        page: u32,
    ) -> Result<Vec<Value>, MetadataError>;

    /// Title search.
    async fn search(
        &self,
        content_type: ContentType,
        query: &str,
        language: &str,
        page: u32,
    ) -> Result<Vec<Value>, MetadataError>;

    /// Titles credited to the best person match for `query`.
    async fn search_person_credits(
        &self,
        content_type: ContentType,
        query: &str,
        language: &str,
    ) -> Result<Vec<Value>, MetadataError>;

    /// Full detail record. `MetadataError::NotFound` when the id does not exist.
    async fn details(
        &self,
        content_type: ContentType,
        tmdb_id: u64,
        language: &str,
    ) -> Result<Value, MetadataError>;

    /// Translate an IMDb id into the provider id.
    async fn find_by_imdb_id(
        &self,
        content_type: ContentType,
        imdb_id: &str,
    ) -> Result<Option<u64>, MetadataError>;

    async fn genres(
        &self,
        content_type: ContentType,
        language: &str,
    ) -> Result<GenreTable, MetadataError>;

    async fn logo(
        &self,
        content_type: ContentType,
        tmdb_id: u64,
        language: &str,
        original_language: Option<&str>,
    ) -> Result<Option<String>, MetadataError>;

    /// Raw episode records of one season.
    async fn season_episodes(
        &self,
        tmdb_id: u64,
        season_number: u32,
        language: &str,
    ) -> Result<Vec<Value>, MetadataError>;

    /// Favorites or watchlist of the account behind `session_id`.
    async fn account_list(
        &self,
        list: AccountList,
        content_type: ContentType,
        session_id: &str,
        language: &str,
        page: u32,
    ) -> Result<Vec<Value>, MetadataError>;
}

/// Existence check for a candidate image URL.
#[async_trait::async_trait]
pub trait PosterProbe: Send + Sync {
    async fn exists(&self, url: &str) -> bool;
}

/// External IMDb rating lookup.
#[async_trait::async_trait]
pub trait RatingSource: Send + Sync {
    async fn imdb_rating(
        &self,
        imdb_id: &str,
        content_type: ContentType,
    ) -> Result<Option<String>, MetadataError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverQuery {
    pub language: String,
    pub page: u32,
    pub filter: DiscoverFilter,
}

/// How a catalog's genre extra narrows a discover listing.
///
/// Each variant maps to exactly one upstream parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoverFilter {
    /// Popularity order, optionally restricted to one genre id.
    Popular { genre_id: Option<u64> },
    /// Release year (movies) or first-air year (series).
    Year(i32),
    /// ISO-639-1 original language.
    OriginalLanguage(String),
}

/// Trending window. Catalogs only ever ask for the daily list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    Day,
}

impl TimeWindow {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountList {
    Favorites,
    Watchlist,
}

impl AccountList {
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Favorites => "favorite",
            Self::Watchlist => "watchlist",
        }
    }
}
