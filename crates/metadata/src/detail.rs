//! Upstream detail records → [`DetailObject`].
//!
//! Everything here is pure. Sub-fetches (poster probe, logo, rating,
//! episodes) happen elsewhere and arrive as [`Enrichments`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use tmdb_addon_core::models::{
    AppExtras, BehaviorHints, CastMember, DetailObject, Link, TMDB_ID_PREFIX, Trailer,
    TrailerStream, Video,
};
use tmdb_addon_core::{Config, ContentType};

use crate::tmdb::IMAGE_BASE;

const CREDIT_LINK_CAST: usize = 10;

/// Config switches that change how a detail object renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct DetailFlags {
    pub rpdb_key: Option<String>,
    pub hide_episode_thumbnails: bool,
    pub hide_in_cinema_tag: bool,
    pub show_age_rating: bool,
    pub cast_count: usize,
}

impl DetailFlags {
    pub fn from_config(config: &Config) -> Self {
        Self {
            rpdb_key: config.rpdb_key().map(str::to_string),
            hide_episode_thumbnails: config.hide_episode_thumbnails,
            hide_in_cinema_tag: config.hide_in_cinema_tag,
            show_age_rating: config.show_age_rating,
            cast_count: config.cast_count(),
        }
    }
}

/// Request-scoped inputs for rendering.
#[derive(Debug, Clone, Copy)]
pub struct DetailContext<'a> {
    pub content_type: ContentType,
    pub tmdb_id: u64,
    pub language: &'a str,
    /// Public host of this addon, used in genre discovery links.
    pub host_name: &'a str,
    pub flags: &'a DetailFlags,
}

/// Results of the concurrent sub-fetches.
#[derive(Debug, Clone, Default)]
pub struct Enrichments {
    /// Verified alternate poster; the TMDB poster is used when `None`.
    pub poster: Option<String>,
    pub logo: Option<String>,
    pub imdb_rating: Option<String>,
    pub videos: Vec<Video>,
}

pub fn imdb_id_of(raw: &Value) -> Option<String> {
    raw["imdb_id"]
        .as_str()
        .or_else(|| raw["external_ids"]["imdb_id"].as_str())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

pub fn tmdb_poster_url(raw: &Value) -> Option<String> {
    raw["poster_path"]
        .as_str()
        .filter(|p| !p.is_empty())
        .map(|p| format!("{IMAGE_BASE}/w500{p}"))
}

pub fn build_detail(raw: &Value, ctx: &DetailContext<'_>, extras: Enrichments) -> DetailObject {
    match ctx.content_type {
        ContentType::Movie => build_movie(raw, ctx, extras),
        ContentType::Series => build_series(raw, ctx, extras),
    }
}

fn build_movie(raw: &Value, ctx: &DetailContext<'_>, extras: Enrichments) -> DetailObject {
    let imdb_id = imdb_id_of(raw);
    let name = str_field(raw, &["title", "original_title"]).unwrap_or("Unknown Title");
    let release_date = raw["release_date"].as_str().unwrap_or_default();
    let year = release_date.get(..4).unwrap_or_default().to_string();
    let imdb_rating = rating_of(raw, extras.imdb_rating);
    let credits = &raw["credits"];
    let genres = parse_genres(&raw["genres"]);

    DetailObject {
        id: format!("{TMDB_ID_PREFIX}{}", ctx.tmdb_id),
        content_type: ctx.content_type,
        name: name.to_string(),
        slug: parse_slug(ctx.content_type, name, imdb_id.as_deref()),
        description: raw["overview"].as_str().unwrap_or_default().to_string(),
        director: parse_crew(credits, "Director"),
        writer: parse_crew(credits, "Writer"),
        links: build_links(ctx, &imdb_rating, imdb_id.as_deref(), name, &genres, credits),
        genre: genres.clone(),
        genres,
        imdb_rating,
        release_info: year.clone(),
        year,
        released: parse_released(release_date),
        runtime: parse_runtime(raw["runtime"].as_u64()),
        country: parse_country(&raw["production_countries"]),
        poster: extras.poster.or_else(|| tmdb_poster_url(raw)),
        background: backdrop_url(raw),
        logo: extras.logo.map(|l| l.replacen("http://", "https://", 1)),
        trailers: parse_trailers(&raw["videos"]),
        trailer_streams: parse_trailer_streams(&raw["videos"]),
        videos: Vec::new(),
        behavior_hints: BehaviorHints {
            default_video_id: Some(
                imdb_id
                    .clone()
                    .unwrap_or_else(|| format!("{TMDB_ID_PREFIX}{}", ctx.tmdb_id)),
            ),
            has_scheduled_videos: false,
        },
        age_rating: ctx
            .flags
            .show_age_rating
            .then(|| parse_certification(raw, ctx.content_type, ctx.language))
            .flatten(),
        imdb_id: imdb_id.filter(|_| !ctx.flags.hide_in_cinema_tag),
        status: None,
        app_extras: AppExtras {
            cast: parse_cast(credits, Some(ctx.flags.cast_count)),
        },
    }
}

fn build_series(raw: &Value, ctx: &DetailContext<'_>, extras: Enrichments) -> DetailObject {
    let imdb_id = imdb_id_of(raw);
    let name = str_field(raw, &["name", "original_name"]).unwrap_or("Unknown Title");
    let status = raw["status"].as_str().map(str::to_string);
    let first_air_date = raw["first_air_date"].as_str();
    let release_info = series_release_info(
        status.as_deref(),
        first_air_date,
        raw["last_air_date"].as_str(),
    );
    let runtime = raw["episode_run_time"]
        .as_array()
        .and_then(|r| r.first())
        .and_then(Value::as_u64)
        .or_else(|| raw["last_episode_to_air"]["runtime"].as_u64())
        .or_else(|| raw["next_episode_to_air"]["runtime"].as_u64());
    let imdb_rating = rating_of(raw, extras.imdb_rating);
    let credits = &raw["credits"];
    let genres = parse_genres(&raw["genres"]);

    DetailObject {
        id: format!("{TMDB_ID_PREFIX}{}", ctx.tmdb_id),
        content_type: ctx.content_type,
        name: name.to_string(),
        slug: parse_slug(ctx.content_type, name, imdb_id.as_deref()),
        description: raw["overview"].as_str().unwrap_or_default().to_string(),
        director: parse_crew(credits, "Director"),
        writer: parse_names(&raw["created_by"]),
        links: build_links(ctx, &imdb_rating, imdb_id.as_deref(), name, &genres, credits),
        genre: genres.clone(),
        genres,
        imdb_rating,
        year: release_info.clone(),
        release_info,
        released: first_air_date.and_then(parse_released),
        runtime: parse_runtime(runtime),
        country: parse_country(&raw["production_countries"]),
        poster: extras.poster.or_else(|| tmdb_poster_url(raw)),
        background: backdrop_url(raw),
        logo: extras.logo.map(|l| l.replacen("http://", "https://", 1)),
        trailers: parse_trailers(&raw["videos"]),
        trailer_streams: parse_trailer_streams(&raw["videos"]),
        videos: extras.videos,
        behavior_hints: BehaviorHints {
            default_video_id: None,
            has_scheduled_videos: true,
        },
        age_rating: ctx
            .flags
            .show_age_rating
            .then(|| parse_certification(raw, ctx.content_type, ctx.language))
            .flatten(),
        imdb_id: imdb_id.filter(|_| !ctx.flags.hide_in_cinema_tag),
        status,
        app_extras: AppExtras {
            cast: parse_cast(credits, Some(ctx.flags.cast_count)),
        },
    }
}

/// Season numbers listed on a series record.
pub fn season_numbers(raw: &Value) -> Vec<u32> {
    raw["seasons"]
        .as_array()
        .map(|seasons| {
            seasons
                .iter()
                .filter_map(|s| s["season_number"].as_u64())
                .filter_map(|n| u32::try_from(n).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// One upstream episode record → [`Video`]. `id_prefix` is the IMDb id when
/// known, else `tmdb:<id>`.
pub fn parse_episode(ep: &Value, id_prefix: &str, hide_thumbnail: bool) -> Option<Video> {
    let season = u32::try_from(ep["season_number"].as_u64()?).ok()?;
    let episode = u32::try_from(ep["episode_number"].as_u64()?).ok()?;
    Some(Video {
        id: format!("{id_prefix}:{season}:{episode}"),
        title: ep["name"]
            .as_str()
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Episode {episode}")),
        season,
        episode,
        released: ep["air_date"].as_str().and_then(parse_released),
        overview: ep["overview"].as_str().unwrap_or_default().to_string(),
        thumbnail: if hide_thumbnail {
            None
        } else {
            ep["still_path"]
                .as_str()
                .filter(|p| !p.is_empty())
                .map(|p| format!("{IMAGE_BASE}/w500{p}"))
        },
    })
}

fn str_field<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| raw[*k].as_str())
        .find(|s| !s.trim().is_empty())
}

fn rating_of(raw: &Value, external: Option<String>) -> String {
    external
        .or_else(|| raw["vote_average"].as_f64().map(|v| format!("{v:.1}")))
        .unwrap_or_else(|| "N/A".to_string())
}

fn backdrop_url(raw: &Value) -> Option<String> {
    raw["backdrop_path"]
        .as_str()
        .filter(|p| !p.is_empty())
        .map(|p| format!("{IMAGE_BASE}/original{p}"))
}

fn parse_released(date: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

fn parse_names(list: &Value) -> Vec<String> {
    list.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub fn parse_genres(genres: &Value) -> Vec<String> {
    parse_names(genres)
}

pub fn parse_country(countries: &Value) -> String {
    parse_names(countries).join(", ")
}

pub fn parse_crew(credits: &Value, job: &str) -> Vec<String> {
    credits["crew"]
        .as_array()
        .map(|crew| {
            crew.iter()
                .filter(|c| c["job"].as_str() == Some(job))
                .filter_map(|c| c["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// First `count` cast members, or all of them when `count` is `None`.
pub fn parse_cast(credits: &Value, count: Option<usize>) -> Vec<CastMember> {
    let Some(cast) = credits["cast"].as_array() else {
        return Vec::new();
    };
    cast.iter()
        .take(count.unwrap_or(cast.len()))
        .filter_map(|c| {
            Some(CastMember {
                name: c["name"].as_str()?.to_string(),
                character: c["character"].as_str().unwrap_or_default().to_string(),
                photo: c["profile_path"]
                    .as_str()
                    .map(|p| format!("{IMAGE_BASE}/w276_and_h350_face{p}")),
            })
        })
        .collect()
}

pub fn parse_slug(content_type: ContentType, title: &str, imdb_id: Option<&str>) -> String {
    let title = title.to_lowercase().replace(' ', "-");
    let imdb = imdb_id.map(|id| id.replacen("tt", "", 1)).unwrap_or_default();
    format!("{}/{title}-{imdb}", content_type.as_str())
}

fn youtube_trailers(videos: &Value) -> impl Iterator<Item = &Value> {
    videos["results"]
        .as_array()
        .into_iter()
        .flatten()
        .filter(|v| v["site"].as_str() == Some("YouTube") && v["type"].as_str() == Some("Trailer"))
}

pub fn parse_trailers(videos: &Value) -> Vec<Trailer> {
    youtube_trailers(videos)
        .filter_map(|v| {
            Some(Trailer {
                source: v["key"].as_str()?.to_string(),
                kind: "Trailer".to_string(),
            })
        })
        .collect()
}

pub fn parse_trailer_streams(videos: &Value) -> Vec<TrailerStream> {
    youtube_trailers(videos)
        .filter_map(|v| {
            Some(TrailerStream {
                title: v["name"].as_str().unwrap_or_default().to_string(),
                yt_id: v["key"].as_str()?.to_string(),
            })
        })
        .collect()
}

/// `"2008-2013"` for ended series, `"2008-"` while airing.
pub fn series_release_info(
    status: Option<&str>,
    first_air_date: Option<&str>,
    last_air_date: Option<&str>,
) -> String {
    let first = first_air_date.and_then(|d| d.get(..5));
    if status == Some("Ended") {
        match (first, last_air_date.and_then(|d| d.get(..4))) {
            (Some(first), Some(last)) => format!("{first}{last}"),
            _ => String::new(),
        }
    } else {
        first.unwrap_or_default().to_string()
    }
}

pub fn parse_runtime(minutes: Option<u64>) -> String {
    match minutes {
        None | Some(0) => String::new(),
        Some(m) if m > 60 => format!("{}h{}min", m / 60, m % 60),
        Some(m) => format!("{m}min"),
    }
}

/// Age certification for the region of `language` (`en-US` → `US`).
pub fn parse_certification(
    raw: &Value,
    content_type: ContentType,
    language: &str,
) -> Option<String> {
    let region = language.split('-').nth(1)?;
    let (container, value_key) = match content_type {
        ContentType::Movie => ("release_dates", None),
        ContentType::Series => ("content_ratings", Some("rating")),
    };
    let entry = raw[container]["results"]
        .as_array()?
        .iter()
        .find(|r| r["iso_3166_1"].as_str() == Some(region))?;

    let rating = match value_key {
        Some(key) => entry[key].as_str(),
        None => entry["release_dates"]
            .as_array()?
            .iter()
            .filter_map(|d| d["certification"].as_str())
            .find(|c| !c.is_empty()),
    };
    rating.filter(|r| !r.is_empty()).map(str::to_string)
}

fn build_links(
    ctx: &DetailContext<'_>,
    imdb_rating: &str,
    imdb_id: Option<&str>,
    title: &str,
    genres: &[String],
    credits: &Value,
) -> Vec<Link> {
    let mut links = Vec::new();
    if let Some(imdb_id) = imdb_id {
        links.push(Link {
            name: imdb_rating.to_string(),
            category: "imdb".to_string(),
            url: format!("https://imdb.com/title/{imdb_id}"),
        });
    }

    let share_id = imdb_id
        .map(str::to_string)
        .unwrap_or_else(|| format!("{TMDB_ID_PREFIX}{}", ctx.tmdb_id));
    links.push(Link {
        name: title.to_string(),
        category: "share".to_string(),
        url: format!(
            "https://web.stremio.com/#/detail/{}/{share_id}",
            ctx.content_type.as_str()
        ),
    });

    let host = urlencoding::encode(ctx.host_name);
    links.extend(genres.iter().map(|genre| Link {
        name: genre.clone(),
        category: "Genres".to_string(),
        url: format!(
            "stremio:///discover/{host}%2F{}%2Fmanifest.json/{}/tmdb.top?genre={}",
            ctx.language,
            ctx.content_type.as_str(),
            urlencoding::encode(genre)
        ),
    }));

    let search_link = |name: String, category: &str| Link {
        url: format!("stremio:///search?search={}", urlencoding::encode(&name)),
        name,
        category: category.to_string(),
    };
    links.extend(
        parse_cast(credits, Some(CREDIT_LINK_CAST))
            .into_iter()
            .map(|c| search_link(c.name, "Cast")),
    );
    links.extend(
        parse_crew(credits, "Director")
            .into_iter()
            .map(|d| search_link(d, "Directors")),
    );
    links.extend(
        parse_crew(credits, "Writer")
            .into_iter()
            .map(|w| search_link(w, "Writers")),
    );
    links
}
