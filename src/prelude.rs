//! Prelude module for common maplet-models types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use maplet_models::prelude::*;`

pub use crate::core::{
    config::{CacheConfig, ModelKeyStrategy, ModelLayerConfig, ModelLayerProfile, ModelPolicy, SourceConfig},
    geo::{lat_lng_to_tile_local, meters_per_local_unit, tile_local_to_lat_lng, LatLng, Point, TileCoord},
    state::{CacheStats, DownloadFlag, DownloadState, LoadState},
};

pub use crate::tiles::{
    cache::{TileCache, TileRecord},
    loader::{AssetFetcher, HttpFetcher},
    mvt::MvtParser,
    parse::{Feature, GeometryType, LayerView, ObjectDescriptor, ParsedTile, PropertyValue, TileParser},
    source::{TileSource, UrlTemplateSource},
};

pub use crate::models::{
    cache::{ModelCache, ModelRecord, TextureState},
    mesh::{Aabb, Geometry, Material, MeshTemplate, NodeKind, SceneNode, Texture},
};

pub use crate::scene::{
    collection::{InstanceTag, RenderCollection, SceneInstance},
    composer::SceneComposer,
};

pub use crate::picking::{
    FrameState, PickEngine, PickHit, PickOutcome, ProjectionProvider, Ray, ScreenRect,
};

pub use crate::layers::models::{ModelLayer, RenderSink};

pub use crate::runtime::{AsyncSpawner, FrameExecutor};

#[cfg(feature = "tokio-runtime")]
pub use crate::runtime::TokioSpawner;

pub use crate::{Error as MapError, Result};

pub use std::sync::{Arc, Mutex};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};
