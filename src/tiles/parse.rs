//! Decoded tile payloads and extraction of model placements from them.

use serde::{Deserialize, Serialize};

use crate::core::constants::LOCAL_EXTENT;
use crate::prelude::HashMap;
use crate::Result;

/// Turns a raw tile payload into named layers.
pub trait TileParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedTile>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTile {
    pub layers: HashMap<String, LayerView>,
}

impl ParsedTile {
    pub fn layer(&self, name: &str) -> Option<&LayerView> {
        self.layers.get(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerView {
    /// Size of the layer's own coordinate space
    pub extent: u32,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryType {
    Unknown,
    Point,
    LineString,
    Polygon,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Number(f64),
    Bool(bool),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    /// String form of ids, which tiles may encode as numbers.
    pub fn to_key(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<u64>,
    pub geometry_type: GeometryType,
    pub properties: HashMap<String, PropertyValue>,
    /// Rings (or parts) of points in layer extent units
    pub geometry: Vec<Vec<(i32, i32)>>,
}

impl Feature {
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    fn string(&self, key: &str) -> Option<String> {
        self.property(key).map(PropertyValue::to_key).filter(|s| !s.is_empty())
    }

    fn number(&self, key: &str) -> Option<f64> {
        self.property(key).and_then(PropertyValue::as_f64)
    }

    /// First point of the first ring
    pub fn anchor(&self) -> Option<(i32, i32)> {
        self.geometry.first()?.first().copied()
    }
}

/// One model placement inside a tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    /// Unique within its tile; names the placed instance
    pub id: String,
    pub model_name: String,
    /// Position in the 0..8192 tile-local space
    pub local_x: f64,
    pub local_y: f64,
    pub scale: f64,
    /// Compass bearing in degrees
    pub bearing: f64,
    pub model_url: String,
    pub texture_url: String,
    pub model_type: Option<String>,
    pub texture_name: Option<String>,
}

impl ObjectDescriptor {
    pub fn new(id: impl Into<String>, model_name: impl Into<String>, local_x: f64, local_y: f64) -> Self {
        let model_name = model_name.into();
        Self {
            id: id.into(),
            model_url: format!("{model_name}.obj"),
            texture_url: format!("{model_name}.jpg"),
            model_name,
            local_x,
            local_y,
            scale: 1.0,
            bearing: 0.0,
            model_type: None,
            texture_name: None,
        }
    }
}

/// Reads the model placements out of `layer_name`.
///
/// Returns `None` when the layer is missing, which marks the tile as not
/// supported. Only point features with an id and a model name are kept;
/// anchors are rescaled from the layer's extent to [`LOCAL_EXTENT`].
pub fn extract_objects(
    tile: &ParsedTile,
    layer_name: &str,
    model_type_filter: Option<&str>,
) -> Option<Vec<ObjectDescriptor>> {
    let layer = tile.layer(layer_name)?;
    let rescale = LOCAL_EXTENT / layer.extent.max(1) as f64;

    let objects = layer
        .features
        .iter()
        .filter(|f| f.geometry_type == GeometryType::Point)
        .filter_map(|feature| {
            let model_type = feature.string("modelType");
            if let Some(required) = model_type_filter {
                if model_type.as_deref() != Some(required) {
                    return None;
                }
            }

            let (x, y) = feature.anchor()?;
            let id = feature
                .string("id")
                .or_else(|| feature.id.map(|id| id.to_string()))?;
            let model_name = feature.string("modelName")?;

            Some(ObjectDescriptor {
                id,
                model_name,
                local_x: x as f64 * rescale,
                local_y: y as f64 * rescale,
                scale: feature.number("scale").unwrap_or(1.0),
                bearing: feature.number("bearing").unwrap_or(0.0),
                model_url: feature.string("modelUrl").unwrap_or_default(),
                texture_url: feature.string("textureUrl").unwrap_or_default(),
                model_type,
                texture_name: feature.string("textureName"),
            })
        })
        .collect();

    Some(objects)
}
