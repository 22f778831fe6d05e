//! TMDB (The Movie Database) provider client.
//!
//! Uses TMDB API v3: https://developer.themoviedb.org/docs

use std::time::Duration;

use serde_json::Value;
use tmdb_addon_core::ContentType;
use tracing::debug;

use crate::provider::{AccountList, DiscoverFilter, DiscoverQuery, MetadataProvider, TimeWindow};
use crate::{Genre, GenreTable, MetadataError};

const BASE_URL: &str = "https://api.themoviedb.org/3";
pub const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TmdbClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl TmdbClient {
    pub fn new(api_key: String) -> Result<Self, MetadataError> {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Point the client at another API root (used against mock servers).
    pub fn with_base_url(
        api_key: String,
        base_url: impl Into<String>,
    ) -> Result<Self, MetadataError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MetadataError::Network(e.to_string()))?;
        Ok(Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get_json(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, MetadataError> {
        let mut all_params = vec![("api_key", self.api_key.as_str())];
        all_params.extend_from_slice(params);

        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "TMDB request");

        let resp = self
            .client
            .get(&url)
            .query(&all_params)
            .send()
            .await
            .map_err(|e| MetadataError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MetadataError::NotFound);
        }

        if !resp.status().is_success() {
            return Err(MetadataError::Provider(format!(
                "TMDB returned {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| MetadataError::Provider(format!("parse JSON: {e}")))
    }

    async fn get_results(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<Value>, MetadataError> {
        let data = self.get_json(path, params).await?;
        Ok(data["results"].as_array().cloned().unwrap_or_default())
    }

    async fn account_id(&self, session_id: &str) -> Result<u64, MetadataError> {
        let data = self
            .get_json("/account", &[("session_id", session_id)])
            .await?;
        data["id"]
            .as_u64()
            .ok_or_else(|| MetadataError::Provider("account response without id".into()))
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbClient {
    fn name(&self) -> &str {
        "tmdb"
    }

    async fn discover(
        &self,
        content_type: ContentType,
        query: &DiscoverQuery,
    ) -> Result<Vec<Value>, MetadataError> {
        let page = query.page.to_string();
        let genre_id;
        let year;
        let mut params = vec![
            ("language", query.language.as_str()),
            ("page", page.as_str()),
            ("sort_by", "popularity.desc"),
        ];

        match &query.filter {
            DiscoverFilter::Popular { genre_id: None } => {}
            DiscoverFilter::Popular { genre_id: Some(id) } => {
                genre_id = id.to_string();
                params.push(("with_genres", genre_id.as_str()));
            }
            DiscoverFilter::Year(y) => {
                year = y.to_string();
                let key = match content_type {
                    ContentType::Movie => "primary_release_year",
                    ContentType::Series => "first_air_date_year",
                };
                params.push((key, year.as_str()));
            }
            DiscoverFilter::OriginalLanguage(lang) => {
                params.push(("with_original_language", lang.as_str()));
            }
        }

        let path = format!("/discover/{}", content_type.tmdb_media_type());
        self.get_results(&path, &params).await
    }

    async fn trending(
        &self,
        content_type: ContentType,
        window: TimeWindow,
        language: &str,
        page: u32,
    ) -> Result<Vec<Value>, MetadataError> {
        let page = page.to_string();
        let path = format!(
            "/trending/{}/{}",
            content_type.tmdb_media_type(),
            window.as_str()
        );
        self.get_results(&path, &[("language", language), ("page", page.as_str())])
            .await
    }

    async fn search(
        &self,
        content_type: ContentType,
        query: &str,
        language: &str,
        page: u32,
    ) -> Result<Vec<Value>, MetadataError> {
        let page = page.to_string();
        let path = format!("/search/{}", content_type.tmdb_media_type());
        self.get_results(
            &path,
            &[
                ("query", query),
                ("language", language),
                ("page", page.as_str()),
                ("include_adult", "false"),
            ],
        )
        .await
    }

    async fn search_person_credits(
        &self,
        content_type: ContentType,
        query: &str,
        language: &str,
    ) -> Result<Vec<Value>, MetadataError> {
        let people = self
            .get_results(
                "/search/person",
                &[("query", query), ("language", language)],
            )
            .await?;

        let Some(person_id) = people.first().and_then(|p| p["id"].as_u64()) else {
            return Ok(Vec::new());
        };

        let path = format!(
            "/person/{person_id}/{}_credits",
            content_type.tmdb_media_type()
        );
        let credits = self.get_json(&path, &[("language", language)]).await?;
        Ok(merge_credits(&credits))
    }

    async fn details(
        &self,
        content_type: ContentType,
        tmdb_id: u64,
        language: &str,
    ) -> Result<Value, MetadataError> {
        let append = match content_type {
            ContentType::Movie => "videos,credits,external_ids,release_dates",
            ContentType::Series => "videos,credits,external_ids,content_ratings",
        };
        let path = format!("/{}/{tmdb_id}", content_type.tmdb_media_type());
        self.get_json(
            &path,
            &[("language", language), ("append_to_response", append)],
        )
        .await
    }

    async fn find_by_imdb_id(
        &self,
        content_type: ContentType,
        imdb_id: &str,
    ) -> Result<Option<u64>, MetadataError> {
        let data = self
            .get_json(
                &format!("/find/{imdb_id}"),
                &[("external_source", "imdb_id")],
            )
            .await?;

        let key = match content_type {
            ContentType::Movie => "movie_results",
            ContentType::Series => "tv_results",
        };
        Ok(data[key]
            .as_array()
            .and_then(|r| r.first())
            .and_then(|r| r["id"].as_u64()))
    }

    async fn genres(
        &self,
        content_type: ContentType,
        language: &str,
    ) -> Result<GenreTable, MetadataError> {
        let path = format!("/genre/{}/list", content_type.tmdb_media_type());
        let data = self.get_json(&path, &[("language", language)]).await?;
        let genres = data["genres"]
            .as_array()
            .map(|gs| {
                gs.iter()
                    .filter_map(|g| {
                        Some(Genre {
                            id: g["id"].as_u64()?,
                            name: g["name"].as_str()?.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(GenreTable::new(genres))
    }

    async fn logo(
        &self,
        content_type: ContentType,
        tmdb_id: u64,
        language: &str,
        original_language: Option<&str>,
    ) -> Result<Option<String>, MetadataError> {
        let lang = primary_subtag(language);
        let mut accepted = vec![lang];
        if let Some(orig) = original_language {
            accepted.push(orig);
        }
        accepted.extend(["en", "null"]);
        let include = accepted.join(",");

        let path = format!("/{}/{tmdb_id}/images", content_type.tmdb_media_type());
        let data = self
            .get_json(&path, &[("include_image_language", include.as_str())])
            .await?;
        Ok(pick_logo(&data, lang, original_language))
    }

    async fn season_episodes(
        &self,
        tmdb_id: u64,
        season_number: u32,
        language: &str,
    ) -> Result<Vec<Value>, MetadataError> {
        let data = self
            .get_json(
                &format!("/tv/{tmdb_id}/season/{season_number}"),
                &[("language", language)],
            )
            .await?;
        Ok(data["episodes"].as_array().cloned().unwrap_or_default())
    }

    async fn account_list(
        &self,
        list: AccountList,
        content_type: ContentType,
        session_id: &str,
        language: &str,
        page: u32,
    ) -> Result<Vec<Value>, MetadataError> {
        let account_id = self.account_id(session_id).await?;
        let kind = match content_type {
            ContentType::Movie => "movies",
            ContentType::Series => "tv",
        };
        let page = page.to_string();
        let path = format!("/account/{account_id}/{}/{kind}", list.path_segment());
        self.get_results(
            &path,
            &[
                ("session_id", session_id),
                ("language", language),
                ("page", page.as_str()),
                ("sort_by", "created_at.desc"),
            ],
        )
        .await
    }
}

/// `pt-BR` → `pt`.
fn primary_subtag(language: &str) -> &str {
    language.split('-').next().unwrap_or(language)
}

/// Cast and crew credits, deduplicated by id, most popular first.
fn merge_credits(credits: &Value) -> Vec<Value> {
    let mut seen = std::collections::HashSet::new();
    let mut merged: Vec<Value> = ["cast", "crew"]
        .iter()
        .filter_map(|k| credits[*k].as_array())
        .flatten()
        .filter(|c| c["id"].as_u64().is_some_and(|id| seen.insert(id)))
        .cloned()
        .collect();
    merged.sort_by(|a, b| {
        let pa = a["popularity"].as_f64().unwrap_or(0.0);
        let pb = b["popularity"].as_f64().unwrap_or(0.0);
        pb.total_cmp(&pa)
    });
    merged
}

/// Best logo: request language, then the title's original language, then
/// English, then any.
fn pick_logo(images: &Value, language: &str, original_language: Option<&str>) -> Option<String> {
    let logos = images["logos"].as_array()?;
    let with_lang = |lang: &str| {
        logos
            .iter()
            .find(|l| l["iso_639_1"].as_str() == Some(lang))
    };

    let chosen = with_lang(language)
        .or_else(|| original_language.and_then(with_lang))
        .or_else(|| with_lang("en"))
        .or_else(|| logos.first())?;

    chosen["file_path"]
        .as_str()
        .map(|p| format!("{IMAGE_BASE}/original{p}"))
}
