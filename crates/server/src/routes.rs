use std::collections::HashMap;

use axum::extract::{OriginalUri, Path, RawQuery, State};
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tmdb_addon_core::config::{self, Config};
use tmdb_addon_core::error::ApiError;
use tmdb_addon_core::{ContentType, canonicalize};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::cache_control::{CacheOpts, with_cache_control};
use crate::catalog::{self, CatalogExtra, CatalogRequest};
use crate::error::AppError;
use crate::manifest::{ManifestGenres, build_manifest};
use crate::meta::{self, MetaOutcome};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/manifest.json", get(manifest_default))
        .route("/{config}/manifest.json", get(manifest_configured))
        .route("/catalog/{type}/{id}", get(catalog))
        .route("/catalog/{type}/{id}/{extra}", get(catalog))
        .route("/{config}/catalog/{type}/{id}", get(catalog))
        .route("/{config}/catalog/{type}/{id}/{extra}", get(catalog))
        .route("/meta/{type}/{id}", get(meta))
        .route("/{config}/meta/{type}/{id}", get(meta))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Last path segments carry a `.json` suffix (`tmdb.top.json`,
/// `genre=Action.json`).
fn strip_json(segment: &str) -> &str {
    segment.strip_suffix(".json").unwrap_or(segment)
}

fn request_config(params: &HashMap<String, String>) -> Config {
    config::decode(params.get("config").map(String::as_str))
}

fn content_type_param(params: &HashMap<String, String>) -> Result<ContentType, AppError> {
    let raw = params
        .get("type")
        .ok_or_else(|| ApiError::BadRequest("missing type".into()))?;
    Ok(canonicalize(raw)?)
}

/// Undecoded `{extra}` segment. It must be form-decoded exactly once, or an
/// escaped `&` inside a genre name splits the fragment.
fn raw_extra<'a>(params: &HashMap<String, String>, uri: &'a Uri) -> Option<&'a str> {
    params.get("extra")?;
    uri.path().rsplit('/').next().map(strip_json)
}

fn id_param(params: &HashMap<String, String>) -> Result<&str, AppError> {
    params
        .get("id")
        .map(|id| strip_json(id))
        .ok_or_else(|| ApiError::BadRequest("missing id".into()).into())
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

async fn manifest_default(State(state): State<AppState>) -> Response {
    manifest_response(&state, &Config::default()).await
}

async fn manifest_configured(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Response {
    manifest_response(&state, &config::decode(Some(&token))).await
}

async fn manifest_response(state: &AppState, config: &Config) -> Response {
    let language = config.language();
    let (movie, series) = tokio::join!(
        state.genres(ContentType::Movie, language),
        state.genres(ContentType::Series, language),
    );
    let manifest = build_manifest(
        config,
        &ManifestGenres {
            movie: &movie,
            series: &series,
        },
    );
    with_cache_control(&CacheOpts::MANIFEST, Json(manifest))
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

async fn catalog(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    OriginalUri(uri): OriginalUri,
    RawQuery(query): RawQuery,
) -> Result<Response, AppError> {
    let config = request_config(&params);
    let content_type = content_type_param(&params)?;
    let catalog_id = id_param(&params)?;

    // Path extras override query-string ones.
    let fragment = [query.as_deref(), raw_extra(&params, &uri)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("&");
    let extra = CatalogExtra::parse(Some(&fragment));

    let request = CatalogRequest::new(catalog_id, content_type, &config, extra);
    let metas = catalog::resolve(&state, &request, &config)
        .await
        .map_err(|e| {
            warn!(catalog = %request.catalog_id, error = %e, "catalog failed");
            AppError(ApiError::NotFound(format!("catalog {} unavailable", request.catalog_id)))
        })?;

    Ok(with_cache_control(&CacheOpts::CATALOG, Json(metas)))
}

// ---------------------------------------------------------------------------
// Meta
// ---------------------------------------------------------------------------

async fn meta(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let config = request_config(&params);
    let content_type = content_type_param(&params)?;
    let id = id_param(&params)?;

    let outcome = meta::resolve(&state, content_type, id, &config)
        .await
        .map_err(|e| {
            warn!(id, error = %e, "meta failed");
            AppError::from(e)
        })?;

    Ok(match outcome {
        MetaOutcome::Found(detail) => {
            let opts = CacheOpts::for_detail(&detail);
            with_cache_control(&opts, Json(json!({ "meta": detail })))
        }
        MetaOutcome::NotFound => Json(json!({ "meta": null })).into_response(),
        MetaOutcome::Unresolved => Json(json!({ "meta": {} })).into_response(),
    })
}
