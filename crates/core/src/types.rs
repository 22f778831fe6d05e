use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Legacy display labels written by older versions of the configuration UI.
/// Stored configurations may still carry them as catalog types.
pub const LEGACY_MOVIE_LABEL: &str = "Detaylı Filtre (Film) 🔎";
pub const LEGACY_SERIES_LABEL: &str = "Detaylı Filtre (Dizi) 🔎";

/// Content type every internal code path works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Movie,
    Series,
}

/// A type label that did not map to a [`ContentType`].
///
/// Carries the original input so the caller can report it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported content type: {0:?}")]
pub struct UnknownType(pub String);

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
        }
    }

    /// Path segment / `media_type` value used by TMDB. Series are `tv` upstream.
    pub fn tmdb_media_type(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "tv",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = UnknownType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        canonicalize(s)
    }
}

/// Map any type label (route parameter, upstream `media_type`, stored config
/// value) to a [`ContentType`].
///
/// Canonical outputs map to themselves, so applying this twice never changes
/// an already canonical value.
pub fn canonicalize(input: &str) -> Result<ContentType, UnknownType> {
    match input {
        "movie" | LEGACY_MOVIE_LABEL => Ok(ContentType::Movie),
        "series" | "tv" | LEGACY_SERIES_LABEL => Ok(ContentType::Series),
        other => Err(UnknownType(other.to_string())),
    }
}
