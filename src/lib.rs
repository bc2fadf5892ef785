//! # maplet-models
//!
//! Streams georeferenced 3D models onto a tiled map.
//!
//! Per-tile vector descriptors and per-model mesh/texture assets are fetched
//! asynchronously, cached in two independent LRU stores, composed into
//! per-tile render collections exactly once per instance, and picked with
//! rays built from each tile's own projection matrix.

pub mod core;
pub mod layers;
pub mod models;
pub mod picking;
pub mod prelude;
pub mod runtime;
pub mod scene;
pub mod tiles;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    config::{ModelLayerConfig, ModelPolicy},
    geo::{LatLng, Point, TileCoord},
    state::{DownloadState, LoadState},
};

pub use layers::models::ModelLayer;

pub use models::{cache::ModelCache, mesh::MeshTemplate};

pub use picking::{PickEngine, PickHit, PickOutcome, ProjectionProvider};

pub use scene::{collection::RenderCollection, composer::SceneComposer};

pub use tiles::{cache::TileCache, loader::AssetFetcher, parse::TileParser};

/// Installs an `env_logger` reading `RUST_LOG`; later calls are ignored.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::builder().format_timestamp_millis().try_init();
}

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tile parse error: {0}")]
    TileParse(String),

    #[error("Mesh parse error: {0}")]
    MeshParse(String),

    #[error("Texture error: {0}")]
    Texture(#[from] image::ImageError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Error type alias for convenience
pub type Error = MapError;
