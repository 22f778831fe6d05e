use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};
use tmdb_addon_core::Config;
use tmdb_addon_core::ContentType;
use tmdb_addon_core::config::CatalogConfig;
use tmdb_addon_metadata::provider::{
    AccountList, DiscoverFilter, DiscoverQuery, MetadataProvider, PosterProbe, RatingSource,
    TimeWindow,
};
use tmdb_addon_metadata::{Genre, GenreTable, MetadataError};
use tmdb_addon_server::routes::build_router;
use tmdb_addon_server::state::{AppState, Settings};

/// Upstream calls seen by the fake provider.
#[derive(Default)]
struct Calls {
    discover: Mutex<Vec<(ContentType, DiscoverQuery)>>,
    trending: Mutex<Vec<(ContentType, TimeWindow, u32)>>,
    search: Mutex<Vec<(String, u32)>>,
    person: AtomicUsize,
    account: AtomicUsize,
    details: AtomicUsize,
    seasons: AtomicUsize,
}

struct FakeProvider {
    calls: Arc<Calls>,
    fail_details: bool,
}

fn listing() -> Vec<Value> {
    vec![
        json!({ "id": 1, "title": "Heat", "genre_ids": [28, 80], "release_date": "1995-12-15", "vote_average": 7.9 }),
        json!({ "id": 2, "title": "Airplane!", "genre_ids": [35] }),
        json!({ "id": 3, "name": "Dark", "media_type": "tv", "genre_ids": [18, 10759] }),
    ]
}

#[async_trait::async_trait]
impl MetadataProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn discover(
        &self,
        content_type: ContentType,
        query: &DiscoverQuery,
    ) -> Result<Vec<Value>, MetadataError> {
        self.calls
            .discover
            .lock()
            .unwrap()
            .push((content_type, query.clone()));
        Ok(listing())
    }

    async fn trending(
        &self,
        content_type: ContentType,
        window: TimeWindow,
        _language: &str,
        page: u32,
    ) -> Result<Vec<Value>, MetadataError> {
        self.calls
            .trending
            .lock()
            .unwrap()
            .push((content_type, window, page));
        Ok(listing())
    }

    async fn search(
        &self,
        _content_type: ContentType,
        query: &str,
        _language: &str,
        page: u32,
    ) -> Result<Vec<Value>, MetadataError> {
        if query == "boom" {
            return Err(MetadataError::Network("connection reset".into()));
        }
        self.calls.search.lock().unwrap().push((query.to_string(), page));
        Ok(vec![json!({ "id": 949, "title": "Heat" })])
    }

    async fn search_person_credits(
        &self,
        _content_type: ContentType,
        _query: &str,
        _language: &str,
    ) -> Result<Vec<Value>, MetadataError> {
        self.calls.person.fetch_add(1, Ordering::SeqCst);
        Ok(vec![json!({ "id": 5, "title": "Collateral" })])
    }

    async fn details(
        &self,
        content_type: ContentType,
        tmdb_id: u64,
        _language: &str,
    ) -> Result<Value, MetadataError> {
        self.calls.details.fetch_add(1, Ordering::SeqCst);
        if self.fail_details {
            return Err(MetadataError::Network("timeout".into()));
        }
        match (content_type, tmdb_id) {
            (ContentType::Movie, 949) => Ok(json!({
                "id": 949,
                "imdb_id": "tt0113277",
                "title": "Heat",
                "release_date": "1995-12-15",
                "runtime": 170,
                "vote_average": 7.9,
                "poster_path": "/heat.jpg",
                "genres": [{ "id": 80, "name": "Crime" }],
                "release_dates": { "results": [
                    { "iso_3166_1": "US", "release_dates": [{ "certification": "R" }] }
                ] }
            })),
            (ContentType::Series, 1396) => Ok(json!({
                "id": 1396,
                "name": "Breaking Bad",
                "status": "Ended",
                "first_air_date": "2008-01-20",
                "last_air_date": "2013-09-29",
                "external_ids": { "imdb_id": "tt0903747" },
                "seasons": [{ "season_number": 1 }, { "season_number": 2 }]
            })),
            (ContentType::Series, 100) => Ok(json!({
                "id": 100,
                "name": "Still Running",
                "status": "Returning Series",
                "first_air_date": "2019-07-25",
                "seasons": []
            })),
            _ => Err(MetadataError::NotFound),
        }
    }

    async fn find_by_imdb_id(
        &self,
        _content_type: ContentType,
        imdb_id: &str,
    ) -> Result<Option<u64>, MetadataError> {
        Ok((imdb_id == "tt0113277").then_some(949))
    }

    async fn genres(
        &self,
        content_type: ContentType,
        _language: &str,
    ) -> Result<GenreTable, MetadataError> {
        let mut genres = vec![
            Genre { id: 28, name: "Action".into() },
            Genre { id: 35, name: "Comedy".into() },
            Genre { id: 80, name: "Crime".into() },
        ];
        if content_type == ContentType::Series {
            genres.push(Genre { id: 18, name: "Drama".into() });
            genres.push(Genre { id: 10759, name: "Action & Adventure".into() });
        }
        Ok(GenreTable::new(genres))
    }

    async fn logo(
        &self,
        _content_type: ContentType,
        _tmdb_id: u64,
        _language: &str,
        _original_language: Option<&str>,
    ) -> Result<Option<String>, MetadataError> {
        Err(MetadataError::Network("images down".into()))
    }

    async fn season_episodes(
        &self,
        _tmdb_id: u64,
        season_number: u32,
        _language: &str,
    ) -> Result<Vec<Value>, MetadataError> {
        self.calls.seasons.fetch_add(1, Ordering::SeqCst);
        Ok((1..=2)
            .map(|ep| {
                json!({
                    "season_number": season_number,
                    "episode_number": ep,
                    "name": format!("S{season_number}E{ep}"),
                    "still_path": "/still.jpg"
                })
            })
            .collect())
    }

    async fn account_list(
        &self,
        _list: AccountList,
        _content_type: ContentType,
        _session_id: &str,
        _language: &str,
        _page: u32,
    ) -> Result<Vec<Value>, MetadataError> {
        self.calls.account.fetch_add(1, Ordering::SeqCst);
        Ok(listing())
    }
}

/// Posters exist only for the movie with id 1.
struct FakeProbe;

#[async_trait::async_trait]
impl PosterProbe for FakeProbe {
    async fn exists(&self, url: &str) -> bool {
        url.contains("/movie-1.jpg")
    }
}

struct FakeRatings {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl RatingSource for FakeRatings {
    async fn imdb_rating(
        &self,
        _imdb_id: &str,
        _content_type: ContentType,
    ) -> Result<Option<String>, MetadataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some("8.3".into()))
    }
}

struct TestApp {
    server: TestServer,
    calls: Arc<Calls>,
    ratings: Arc<FakeRatings>,
}

fn test_app_with(fail_details: bool) -> TestApp {
    let calls = Arc::new(Calls::default());
    let ratings = Arc::new(FakeRatings {
        calls: AtomicUsize::new(0),
    });
    let state = AppState::new(
        Arc::new(FakeProvider {
            calls: calls.clone(),
            fail_details,
        }),
        Arc::new(FakeProbe),
        Some(ratings.clone() as Arc<dyn RatingSource>),
        Settings {
            host_name: "addon.test".into(),
            ..Settings::default()
        },
    );
    TestApp {
        server: TestServer::new(build_router(state)).unwrap(),
        calls,
        ratings,
    }
}

fn test_app() -> TestApp {
    test_app_with(false)
}

fn token(config: &Config) -> String {
    config.encode()
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let app = test_app();
    let resp = app.server.get("/health").await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["status"], "ok");
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

#[tokio::test]
async fn manifest_lists_default_catalogs() {
    let app = test_app();
    let resp = app.server.get("/manifest.json").await;
    resp.assert_status_ok();
    assert_eq!(
        resp.header("cache-control"),
        "max-age=43200, stale-while-revalidate=1209600, stale-if-error=2592000, public"
    );
    let body: Value = resp.json();
    assert_eq!(body["resources"], json!(["catalog", "meta"]));
    assert_eq!(body["idPrefixes"], json!(["tmdb:", "tt"]));
    let ids: Vec<&str> = body["catalogs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        [
            "tmdb.top",
            "tmdb.top",
            "tmdb.trending",
            "tmdb.trending",
            "tmdb.search",
            "tmdb.search"
        ]
    );
    assert_eq!(body["catalogs"][1]["extra"][0]["options"], json!(["Action", "Comedy", "Crime", "Drama", "Action & Adventure"]));
}

#[tokio::test]
async fn manifest_honours_config_token_and_legacy_labels() {
    let app = test_app();
    let config = Config {
        catalogs: vec![
            CatalogConfig {
                id: "tmdb.top".into(),
                content_type: "Detaylı Filtre (Dizi) 🔎".into(),
                enabled: true,
                show_in_home: true,
            },
            CatalogConfig {
                id: "tmdb.watchlist".into(),
                content_type: "movie".into(),
                enabled: true,
                show_in_home: true,
            },
        ],
        ..Config::default()
    };
    let resp = app
        .server
        .get(&format!("/{}/manifest.json", token(&config)))
        .await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    let catalogs = body["catalogs"].as_array().unwrap();
    assert_eq!(catalogs[0]["id"], "tmdb.top");
    assert_eq!(catalogs[0]["type"], "series");
    assert!(catalogs.iter().all(|c| c["id"] != "tmdb.watchlist"));
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[tokio::test]
async fn skip_query_selects_second_page() {
    let app = test_app();
    let resp = app.server.get("/catalog/movie/tmdb.top.json?skip=100").await;
    resp.assert_status_ok();
    assert_eq!(
        resp.header("cache-control"),
        "max-age=86400, stale-while-revalidate=604800, stale-if-error=1209600, public"
    );
    assert_eq!(resp.header("access-control-allow-origin"), "*");

    let discover = app.calls.discover.lock().unwrap();
    assert_eq!(discover.len(), 1);
    assert_eq!(discover[0].1.page, 2);
    assert_eq!(discover[0].1.filter, DiscoverFilter::Popular { genre_id: None });
}

#[tokio::test]
async fn extra_segment_carries_genre_and_skip() {
    let app = test_app();
    let resp = app
        .server
        .get("/catalog/movie/tmdb.top/genre=Action&skip=200.json")
        .await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["metas"].as_array().unwrap().len(), 3);

    let discover = app.calls.discover.lock().unwrap();
    assert_eq!(discover[0].1.page, 3);
    assert_eq!(
        discover[0].1.filter,
        DiscoverFilter::Popular { genre_id: Some(28) }
    );
}

#[tokio::test]
async fn unknown_genre_yields_empty_page_without_upstream_call() {
    let app = test_app();
    let resp = app
        .server
        .get("/catalog/movie/tmdb.top/genre=Western.json")
        .await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["metas"], json!([]));
    assert!(app.calls.discover.lock().unwrap().is_empty());
}

#[tokio::test]
async fn trending_genre_is_filtered_after_fetch() {
    let app = test_app();
    let resp = app
        .server
        .get("/catalog/movie/tmdb.trending/genre=Action.json")
        .await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    let metas = body["metas"].as_array().unwrap();
    assert_eq!(metas.len(), 1);
    assert_eq!(metas[0]["id"], "tmdb:1");
    assert!(
        metas[0]["genre"]
            .as_array()
            .unwrap()
            .contains(&json!("Action"))
    );

    let trending = app.calls.trending.lock().unwrap();
    assert_eq!(trending.len(), 1);
    assert_eq!(trending[0].1, TimeWindow::Day);
}

#[tokio::test]
async fn tv_route_type_and_records_become_series() {
    let app = test_app();
    let resp = app.server.get("/catalog/tv/tmdb.trending.json").await;
    resp.assert_status_ok();
    assert_eq!(app.calls.trending.lock().unwrap()[0].0, ContentType::Series);
    let body: Value = resp.json();
    assert_eq!(body["metas"][2]["type"], "series");
    assert_eq!(body["metas"][2]["genre"], json!(["Drama", "Action & Adventure"]));
}

#[tokio::test]
async fn genre_with_ampersand_survives_the_extra_segment() {
    let app = test_app();
    let resp = app
        .server
        .get("/catalog/series/tmdb.trending/genre=Action%20%26%20Adventure.json")
        .await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    let metas = body["metas"].as_array().unwrap();
    assert_eq!(metas.len(), 1);
    assert_eq!(metas[0]["id"], "tmdb:3");

    let resp = app
        .server
        .get("/catalog/series/tmdb.top/genre=Action%20%26%20Adventure&skip=100.json")
        .await;
    resp.assert_status_ok();
    let discover = app.calls.discover.lock().unwrap();
    assert_eq!(discover[0].1.page, 2);
    assert_eq!(
        discover[0].1.filter,
        DiscoverFilter::Popular { genre_id: Some(10759) }
    );
}

#[tokio::test]
async fn unknown_route_type_is_rejected() {
    let app = test_app();
    let resp = app.server.get("/catalog/anime/tmdb.top.json").await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn search_wins_over_catalog_id() {
    let app = test_app();
    let resp = app
        .server
        .get("/catalog/movie/tmdb.trending/search=heat.json")
        .await;
    resp.assert_status_ok();
    assert_eq!(
        *app.calls.search.lock().unwrap(),
        vec![("heat".to_string(), 1)]
    );
    assert!(app.calls.trending.lock().unwrap().is_empty());

    app.server
        .get("/catalog/movie/tmdb.people/search=michael%20mann.json")
        .await
        .assert_status_ok();
    assert_eq!(app.calls.person.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn upstream_failure_surfaces_as_not_found() {
    let app = test_app();
    let resp = app.server.get("/catalog/movie/tmdb.search/search=boom.json").await;
    resp.assert_status(StatusCode::NOT_FOUND);
    assert!(resp.maybe_header("cache-control").is_none());
}

#[tokio::test]
async fn personal_lists_need_a_session() {
    let app = test_app();
    let resp = app.server.get("/catalog/movie/tmdb.favorites.json").await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["metas"], json!([]));
    assert_eq!(app.calls.account.load(Ordering::SeqCst), 0);

    let config = Config {
        session_id: Some("sess".into()),
        ..Config::default()
    };
    let resp = app
        .server
        .get(&format!("/{}/catalog/movie/tmdb.watchlist/genre=Comedy.json", token(&config)))
        .await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["metas"].as_array().unwrap().len(), 1);
    assert_eq!(body["metas"][0]["name"], "Airplane!");
    assert_eq!(app.calls.account.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rpdb_posters_replace_only_confirmed_items() {
    let app = test_app();
    let config = Config {
        rpdbkey: Some("t0-free".into()),
        ..Config::default()
    };
    let resp = app
        .server
        .get(&format!("/{}/catalog/movie/tmdb.top.json", token(&config)))
        .await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(
        body["metas"][0]["poster"],
        "https://api.ratingposterdb.com/t0-free/tmdb/poster-default/movie-1.jpg?fallback=true"
    );
    assert_eq!(body["metas"][1]["poster"], Value::Null);
}

// ---------------------------------------------------------------------------
// Meta
// ---------------------------------------------------------------------------

#[tokio::test]
async fn movie_meta_is_cached_per_key() {
    let app = test_app();
    let first = app.server.get("/meta/movie/tmdb:949.json").await;
    first.assert_status_ok();
    assert_eq!(
        first.header("cache-control"),
        "max-age=1209600, stale-while-revalidate=1728000, stale-if-error=2592000, public"
    );
    let body: Value = first.json();
    assert_eq!(body["meta"]["id"], "tmdb:949");
    assert_eq!(body["meta"]["imdbRating"], "8.3");
    assert_eq!(body["meta"]["imdb_id"], "tt0113277");
    assert_eq!(body["meta"]["logo"], Value::Null);

    app.server.get("/meta/movie/tmdb:949.json").await.assert_status_ok();
    assert_eq!(app.calls.details.load(Ordering::SeqCst), 1);
    assert_eq!(app.ratings.calls.load(Ordering::SeqCst), 1);

    // A different flag set is a different entry.
    let config = Config {
        show_age_rating: true,
        ..Config::default()
    };
    let resp = app
        .server
        .get(&format!("/{}/meta/movie/tmdb:949.json", token(&config)))
        .await;
    let body: Value = resp.json();
    assert_eq!(body["meta"]["ageRating"], "R");
    assert_eq!(app.calls.details.load(Ordering::SeqCst), 2);
    // Ratings have their own cache.
    assert_eq!(app.ratings.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn imdb_ids_are_translated() {
    let app = test_app();
    let resp = app.server.get("/meta/movie/tt0113277.json").await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["meta"]["id"], "tmdb:949");

    let resp = app.server.get("/meta/movie/tt9999999.json").await;
    resp.assert_status_ok();
    assert!(resp.maybe_header("cache-control").is_none());
    let body: Value = resp.json();
    assert_eq!(body["meta"], json!({}));
}

#[tokio::test]
async fn missing_title_is_null_meta_and_not_cached() {
    let app = test_app();
    for _ in 0..2 {
        let resp = app.server.get("/meta/movie/tmdb:404.json").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["meta"], Value::Null);
    }
    assert_eq!(app.calls.details.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn upstream_detail_failure_is_server_error() {
    let app = test_app_with(true);
    let resp = app.server.get("/meta/movie/tmdb:949.json").await;
    resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json();
    assert_eq!(body["error"]["code"], "upstream_error");
}

#[tokio::test]
async fn series_meta_carries_episodes_and_lifecycle_headers() {
    let app = test_app();
    let config = Config {
        hide_episode_thumbnails: true,
        ..Config::default()
    };
    let resp = app
        .server
        .get(&format!("/{}/meta/series/tmdb:1396.json", token(&config)))
        .await;
    resp.assert_status_ok();
    assert!(resp.header("cache-control").to_str().unwrap().starts_with("max-age=1209600"));
    let body: Value = resp.json();
    let videos = body["meta"]["videos"].as_array().unwrap();
    assert_eq!(videos.len(), 4);
    assert_eq!(videos[0]["id"], "tt0903747:1:1");
    assert_eq!(videos[3]["id"], "tt0903747:2:2");
    assert!(videos.iter().all(|v| v.get("thumbnail").is_none()));
    assert_eq!(body["meta"]["releaseInfo"], "2008-2013");
    assert_eq!(app.calls.seasons.load(Ordering::SeqCst), 2);

    let airing = app.server.get("/meta/tv/tmdb:100.json").await;
    airing.assert_status_ok();
    assert!(airing.header("cache-control").to_str().unwrap().starts_with("max-age=86400,"));
}
