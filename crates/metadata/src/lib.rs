pub mod detail;
pub mod normalize;
pub mod omdb;
pub mod provider;
pub mod rpdb;
pub mod tmdb;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("provider error: {0}")]
    Provider(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("not found")]
    NotFound,
}

/// One entry of an upstream genre list.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

/// Language-specific genre id → name table for one content type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenreTable {
    genres: Vec<Genre>,
}

impl GenreTable {
    pub fn new(genres: Vec<Genre>) -> Self {
        Self { genres }
    }

    pub fn name_of(&self, id: u64) -> Option<&str> {
        self.genres
            .iter()
            .find(|g| g.id == id)
            .map(|g| g.name.as_str())
    }

    /// Ids whose display name matches `name` (case-insensitive).
    pub fn ids_named(&self, name: &str) -> Vec<u64> {
        let name = name.trim().to_lowercase();
        self.genres
            .iter()
            .filter(|g| g.name.to_lowercase() == name)
            .map(|g| g.id)
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.genres.iter().map(|g| g.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
    }
}
