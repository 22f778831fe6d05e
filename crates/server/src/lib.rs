pub mod cache;
pub mod cache_control;
pub mod catalog;
pub mod enrich;
pub mod error;
pub mod manifest;
pub mod meta;
pub mod routes;
pub mod state;
