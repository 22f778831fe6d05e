pub mod config;
pub mod error;
pub mod models;
pub mod types;

pub use config::{CatalogConfig, Config};
pub use types::{ContentType, UnknownType, canonicalize};
