//! Configuration for the model layer
//!
//! Everything the layer needs is supplied at construction: cache capacities,
//! the zoom window, where tiles and models come from, and the policy knobs
//! that used to be spread over several near-identical layer variants.
//! Presets cover the common cases; any config can also be loaded from JSON.

use serde::{Deserialize, Serialize};

use crate::core::constants::{
    DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, DEFAULT_MODEL_CACHE_SIZE, DEFAULT_MODEL_TYPE, DEFAULT_SOURCE_LAYER,
    DEFAULT_TILE_CACHE_SIZE, DEFAULT_TILE_SIZE, DEFAULT_TRANSITION_STEP,
};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum ModelLayerProfile {
    Balanced,
    LowResource,
    HighCapacity,
    Custom(ModelLayerConfig),
}

impl ModelLayerProfile {
    pub fn resolve(&self) -> ModelLayerConfig {
        match self {
            Self::Balanced => ModelLayerConfig {
                cache: CacheConfig {
                    tile_capacity: DEFAULT_TILE_CACHE_SIZE,
                    model_capacity: DEFAULT_MODEL_CACHE_SIZE,
                },
                source: SourceConfig::default(),
                policy: ModelPolicy::default(),
            },
            Self::LowResource => ModelLayerConfig {
                cache: CacheConfig {
                    tile_capacity: 128,
                    model_capacity: 256,
                },
                source: SourceConfig::default(),
                policy: ModelPolicy {
                    transition_step: None,
                    ..ModelPolicy::default()
                },
            },
            Self::HighCapacity => ModelLayerConfig {
                cache: CacheConfig {
                    tile_capacity: 4096,
                    model_capacity: 4096,
                },
                source: SourceConfig::default(),
                policy: ModelPolicy::default(),
            },
            Self::Custom(config) => config.clone(),
        }
    }
}

impl Default for ModelLayerProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelLayerConfig {
    pub cache: CacheConfig,
    pub source: SourceConfig,
    pub policy: ModelPolicy,
}

impl ModelLayerConfig {
    pub fn low_resource() -> Self {
        ModelLayerProfile::LowResource.resolve()
    }

    pub fn high_capacity() -> Self {
        ModelLayerProfile::HighCapacity.resolve()
    }

    /// Small caches and no transition so tests can observe eviction and
    /// final instance positions directly.
    pub fn for_testing() -> Self {
        Self {
            cache: CacheConfig {
                tile_capacity: 4,
                model_capacity: 4,
            },
            source: SourceConfig {
                tile_templates: vec!["https://tiles.test/{z}/{x}/{y}.pbf".to_string()],
                root_url: "https://models.test/".to_string(),
                ..SourceConfig::default()
            },
            policy: ModelPolicy {
                transition_step: None,
                ..ModelPolicy::default()
            },
        }
    }

    /// Parses and validates a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.tile_capacity == 0 || self.cache.model_capacity == 0 {
            return Err(Error::Config("cache capacities must be non-zero".into()));
        }
        if self.source.min_zoom > self.source.max_zoom {
            return Err(Error::Config(format!(
                "min_zoom {} is above max_zoom {}",
                self.source.min_zoom, self.source.max_zoom
            )));
        }
        let has_tilejson = self.source.tilejson_url.as_deref().map_or(false, |u| !u.is_empty());
        if self.source.tile_templates.is_empty() && !has_tilejson {
            return Err(Error::Config("no tile URL template or TileJSON URL configured".into()));
        }
        if self.source.source_layer.is_empty() {
            return Err(Error::Config("source layer name is empty".into()));
        }
        if let Some(step) = self.policy.transition_step {
            if !(step > 0.0) {
                return Err(Error::Config(format!("transition step {step} must be positive")));
            }
        }
        Ok(())
    }
}

impl Default for ModelLayerConfig {
    fn default() -> Self {
        ModelLayerProfile::default().resolve()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub tile_capacity: usize,
    pub model_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            tile_capacity: DEFAULT_TILE_CACHE_SIZE,
            model_capacity: DEFAULT_MODEL_CACHE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Tile URL templates with `{z}`, `{x}`, `{y}` and optionally `{key}`
    pub tile_templates: Vec<String>,
    /// TileJSON document listing the templates, used when `tile_templates`
    /// is empty
    pub tilejson_url: Option<String>,
    /// Access key substituted for `{key}`
    pub key: Option<String>,
    /// Prefix joined to the relative model and texture URLs of each feature
    pub root_url: String,
    /// Vector tile layer holding the model placements
    pub source_layer: String,
    /// Tile size the host should use when covering the viewport
    pub tile_size: u32,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Ask the projection provider for globe-aware tile matrices
    pub apply_globe_matrix: bool,
}

impl SourceConfig {
    /// Rounds the view zoom and clamps it into the streaming window.
    pub fn clamp_zoom(&self, zoom: f64) -> u8 {
        let rounded = zoom.round().clamp(0.0, u8::MAX as f64) as u8;
        rounded.clamp(self.min_zoom, self.max_zoom)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            tile_templates: vec!["https://tile.map4d.vn/tile/vector/{z}/{x}/{y}?key={key}".into()],
            tilejson_url: None,
            key: None,
            root_url: String::new(),
            source_layer: DEFAULT_SOURCE_LAYER.to_string(),
            tile_size: DEFAULT_TILE_SIZE,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            apply_globe_matrix: true,
        }
    }
}

/// Which descriptor field identifies a shared model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKeyStrategy {
    ModelName,
    ModelUrl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPolicy {
    /// Outline meshes whose texture failed to load instead of leaving them plain
    pub texture_fallback: bool,
    pub key_strategy: ModelKeyStrategy,
    /// Sink each model by a fraction of its height so it sits on the ground
    pub seat_on_ground: bool,
    /// Per-frame rise of new instances towards Z = 0; `None` places them directly
    pub transition_step: Option<f64>,
    /// Source meshes are authored Y-up and get rotated to Z-up once on load
    pub y_up_source: bool,
    /// Flip triangle winding on load
    pub reverse_winding: bool,
    /// Only keep features whose `modelType` property equals this value;
    /// `None` keeps every point feature
    pub model_type_filter: Option<String>,
}

impl Default for ModelPolicy {
    fn default() -> Self {
        Self {
            texture_fallback: true,
            key_strategy: ModelKeyStrategy::ModelName,
            seat_on_ground: true,
            transition_step: Some(DEFAULT_TRANSITION_STEP),
            y_up_source: true,
            reverse_winding: false,
            model_type_filter: Some(DEFAULT_MODEL_TYPE.to_string()),
        }
    }
}
