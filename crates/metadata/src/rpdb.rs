//! RPDB (Rating Poster Database) alternate posters.

use std::time::Duration;

use tmdb_addon_core::ContentType;
use tracing::debug;

use crate::MetadataError;
use crate::provider::PosterProbe;

const RPDB_BASE: &str = "https://api.ratingposterdb.com";

/// Candidate RPDB poster for one title.
///
/// Free tiers (`t0`, `t1`) and English requests get the default poster;
/// paid tiers get a localized one via `lang`.
pub fn rpdb_poster_url(
    content_type: ContentType,
    tmdb_id: &str,
    language: &str,
    rpdb_key: &str,
) -> String {
    let tier = rpdb_key.split('-').next().unwrap_or_default();
    let lang = language.split('-').next().unwrap_or_default();
    let base = format!(
        "{RPDB_BASE}/{rpdb_key}/tmdb/poster-default/{}-{tmdb_id}.jpg?fallback=true",
        content_type.as_str()
    );
    if tier == "t0" || tier == "t1" || lang == "en" {
        base
    } else {
        format!("{base}&lang={lang}")
    }
}

/// HEAD-request existence probe.
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, MetadataError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MetadataError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl PosterProbe for HttpProbe {
    async fn exists(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(url, error = %e, "poster probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn free_tier_gets_default_poster() {
        assert_eq!(
            rpdb_poster_url(ContentType::Movie, "949", "pt-BR", "t1-abc"),
            "https://api.ratingposterdb.com/t1-abc/tmdb/poster-default/movie-949.jpg?fallback=true"
        );
    }

    #[test]
    fn english_gets_default_poster() {
        assert_eq!(
            rpdb_poster_url(ContentType::Series, "1396", "en-US", "t3-xyz"),
            "https://api.ratingposterdb.com/t3-xyz/tmdb/poster-default/series-1396.jpg?fallback=true"
        );
    }

    #[test]
    fn paid_tier_gets_localized_poster() {
        assert_eq!(
            rpdb_poster_url(ContentType::Series, "1396", "pt-BR", "t3-xyz"),
            "https://api.ratingposterdb.com/t3-xyz/tmdb/poster-default/series-1396.jpg?fallback=true&lang=pt"
        );
    }

    #[tokio::test]
    async fn probe_reports_success_and_failure() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/ok.jpg"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/missing.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let probe = HttpProbe::new(Duration::from_secs(2)).unwrap();
        assert!(probe.exists(&format!("{}/ok.jpg", server.uri())).await);
        assert!(!probe.exists(&format!("{}/missing.jpg", server.uri())).await);
        assert!(!probe.exists("http://127.0.0.1:9/unreachable.jpg").await);
    }
}
