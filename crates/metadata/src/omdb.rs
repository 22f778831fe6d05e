//! OMDb client used as the IMDb rating source.

use std::time::Duration;

use tmdb_addon_core::ContentType;
use tracing::debug;

use crate::MetadataError;
use crate::provider::RatingSource;

const BASE_URL: &str = "https://www.omdbapi.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct OmdbClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OmdbClient {
    pub fn new(api_key: String) -> Result<Self, MetadataError> {
        Self::with_base_url(api_key, BASE_URL)
    }

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
}

#[async_trait::async_trait]
impl RatingSource for OmdbClient {
    async fn imdb_rating(
        &self,
        imdb_id: &str,
        content_type: ContentType,
    ) -> Result<Option<String>, MetadataError> {
        let kind = match content_type {
            ContentType::Movie => "movie",
            ContentType::Series => "series",
        };
        debug!(imdb_id, "OMDb request");

        let resp = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[("i", imdb_id), ("type", kind), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| MetadataError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(MetadataError::Provider(format!(
                "OMDb returned {}",
                resp.status()
            )));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| MetadataError::Provider(format!("parse JSON: {e}")))?;

        Ok(parse_rating(&data))
    }
}

fn parse_rating(data: &serde_json::Value) -> Option<String> {
    if data["Response"].as_str() == Some("False") {
        return None;
    }
    data["imdbRating"]
        .as_str()
        .filter(|r| *r != "N/A" && r.parse::<f64>().is_ok())
        .map(str::to_string)
}
