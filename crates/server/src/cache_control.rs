//! `Cache-Control` header policy for addon responses.

use axum::http::HeaderValue;
use axum::http::header::CACHE_CONTROL;
use axum::response::{IntoResponse, Response};
use tmdb_addon_core::ContentType;
use tmdb_addon_core::models::DetailObject;

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;

/// Freshness windows in seconds. Zero means "omit".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheOpts {
    pub max_age: u64,
    pub stale_while_revalidate: u64,
    pub stale_if_error: u64,
}

impl CacheOpts {
    pub const MANIFEST: Self = Self {
        max_age: 12 * HOUR,
        stale_while_revalidate: 14 * DAY,
        stale_if_error: 30 * DAY,
    };

    pub const CATALOG: Self = Self {
        max_age: DAY,
        stale_while_revalidate: 7 * DAY,
        stale_if_error: 14 * DAY,
    };

    pub const DETAIL_STABLE: Self = Self {
        max_age: 14 * DAY,
        stale_while_revalidate: 20 * DAY,
        stale_if_error: 30 * DAY,
    };

    pub const DETAIL_AIRING: Self = Self {
        max_age: DAY,
        stale_while_revalidate: 20 * DAY,
        stale_if_error: 30 * DAY,
    };

    /// Movies and ended series are stable; airing series refresh daily.
    pub fn for_detail(detail: &DetailObject) -> Self {
        let ended = detail.status.as_deref() == Some("Ended") && detail.release_info.len() > 5;
        match detail.content_type {
            ContentType::Series if !ended => Self::DETAIL_AIRING,
            _ => Self::DETAIL_STABLE,
        }
    }
}

pub fn compute_header(opts: &CacheOpts) -> Option<String> {
    let tokens: Vec<String> = [
        ("max-age", opts.max_age),
        ("stale-while-revalidate", opts.stale_while_revalidate),
        ("stale-if-error", opts.stale_if_error),
    ]
    .into_iter()
    .filter(|(_, secs)| *secs > 0)
    .map(|(name, secs)| format!("{name}={secs}"))
    .collect();

    if tokens.is_empty() {
        None
    } else {
        Some(format!("{}, public", tokens.join(", ")))
    }
}

/// Attach the computed header, if any, to a response.
pub fn with_cache_control(opts: &CacheOpts, body: impl IntoResponse) -> Response {
    let mut response = body.into_response();
    if let Some(value) = compute_header(opts).and_then(|v| HeaderValue::from_str(&v).ok()) {
        response.headers_mut().insert(CACHE_CONTROL, value);
    }
    response
}
