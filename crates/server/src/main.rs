use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tmdb_addon_metadata::omdb::OmdbClient;
use tmdb_addon_metadata::provider::RatingSource;
use tmdb_addon_metadata::rpdb::HttpProbe;
use tmdb_addon_metadata::tmdb::TmdbClient;
use tmdb_addon_server::state::{AppState, Settings};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, "invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let tmdb_key = std::env::var("TMDB_ADDON_TMDB_KEY")
        .or_else(|_| std::env::var("TMDB_API"))
        .context("TMDB_ADDON_TMDB_KEY (or TMDB_API) must be set")?;

    let defaults = Settings::default();
    let settings = Settings {
        host_name: env_or("TMDB_ADDON_HOST_NAME", defaults.host_name),
        probe_concurrency: env_or("TMDB_ADDON_PROBE_CONCURRENCY", defaults.probe_concurrency),
        cache_capacity: env_or("TMDB_ADDON_CACHE_CAPACITY", defaults.cache_capacity),
    };

    let provider = TmdbClient::new(tmdb_key).context("failed to build TMDB client")?;
    let probe = HttpProbe::new(PROBE_TIMEOUT).context("failed to build poster probe")?;
    let ratings: Option<Arc<dyn RatingSource>> = match std::env::var("TMDB_ADDON_OMDB_KEY") {
        Ok(key) if !key.trim().is_empty() => {
            let client = OmdbClient::new(key).context("failed to build OMDb client")?;
            Some(Arc::new(client) as Arc<dyn RatingSource>)
        }
        _ => {
            info!("no OMDb key, IMDb ratings fall back to TMDB votes");
            None
        }
    };

    info!(
        host_name = %settings.host_name,
        probe_concurrency = settings.probe_concurrency,
        cache_capacity = settings.cache_capacity,
        "starting addon"
    );
    let state = AppState::new(Arc::new(provider), Arc::new(probe), ratings, settings);
    let app = tmdb_addon_server::routes::build_router(state);

    let bind_addr = std::env::var("TMDB_ADDON_BIND").unwrap_or_else(|_| "0.0.0.0:1337".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .context("failed to bind")?;
    info!(addr = %bind_addr, "server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
