//! Mapbox Vector Tile decoding through `geozero`'s protobuf bindings.

use flate2::read::GzDecoder;
use geozero::mvt::{tile, Message, Tile};
use std::io::Read;

use crate::prelude::HashMap;
use crate::tiles::parse::{Feature, GeometryType, LayerView, ParsedTile, PropertyValue, TileParser};
use crate::{Error, Result};

const CMD_MOVE_TO: u32 = 1;
const CMD_LINE_TO: u32 = 2;
const CMD_CLOSE_PATH: u32 = 7;

/// [`TileParser`] for MVT payloads, gzipped or not.
#[derive(Debug, Clone, Copy, Default)]
pub struct MvtParser;

impl MvtParser {
    pub fn new() -> Self {
        Self
    }
}

impl TileParser for MvtParser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedTile> {
        let data = decompress_gzip(bytes)?;
        let tile = Tile::decode(&*data).map_err(|e| Error::TileParse(e.to_string()))?;

        let mut parsed = ParsedTile::default();
        for layer in &tile.layers {
            parsed.layers.insert(layer.name.clone(), convert_layer(layer));
        }
        log::trace!("decoded {} layers", parsed.layers.len());
        Ok(parsed)
    }
}

fn is_gzipped(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1F && data[1] == 0x8B
}

fn decompress_gzip(data: &[u8]) -> Result<Vec<u8>> {
    if !is_gzipped(data) {
        return Ok(data.to_vec());
    }
    let mut out = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| Error::TileParse(format!("gzip: {e}")))?;
    Ok(out)
}

fn convert_layer(layer: &tile::Layer) -> LayerView {
    let features = layer
        .features
        .iter()
        .map(|feature| Feature {
            id: feature.id,
            geometry_type: match feature.r#type() {
                tile::GeomType::Point => GeometryType::Point,
                tile::GeomType::Linestring => GeometryType::LineString,
                tile::GeomType::Polygon => GeometryType::Polygon,
                tile::GeomType::Unknown => GeometryType::Unknown,
            },
            properties: decode_tags(&feature.tags, layer),
            geometry: decode_geometry(&feature.geometry),
        })
        .collect();

    LayerView {
        extent: layer.extent(),
        features,
    }
}

/// Tags are `[key_index, value_index]` pairs into the layer's tables.
/// Pairs pointing outside the tables are skipped.
fn decode_tags(tags: &[u32], layer: &tile::Layer) -> HashMap<String, PropertyValue> {
    tags.chunks_exact(2)
        .filter_map(|pair| {
            let key = layer.keys.get(pair[0] as usize)?;
            let value = convert_value(layer.values.get(pair[1] as usize)?)?;
            Some((key.clone(), value))
        })
        .collect()
}

fn convert_value(value: &tile::Value) -> Option<PropertyValue> {
    if let Some(s) = &value.string_value {
        return Some(PropertyValue::String(s.clone()));
    }
    if let Some(b) = value.bool_value {
        return Some(PropertyValue::Bool(b));
    }
    value
        .double_value
        .or(value.float_value.map(f64::from))
        .or(value.int_value.map(|i| i as f64))
        .or(value.uint_value.map(|u| u as f64))
        .or(value.sint_value.map(|s| s as f64))
        .map(PropertyValue::Number)
}

fn zigzag(param: u32) -> i32 {
    ((param >> 1) as i32) ^ -((param & 1) as i32)
}

/// Expands the command stream into parts; every MoveTo starts a new one.
fn decode_geometry(commands: &[u32]) -> Vec<Vec<(i32, i32)>> {
    let mut parts: Vec<Vec<(i32, i32)>> = Vec::new();
    let (mut cx, mut cy) = (0i32, 0i32);
    let mut i = 0;

    while i < commands.len() {
        let id = commands[i] & 0x7;
        let count = (commands[i] >> 3) as usize;
        i += 1;

        match id {
            CMD_MOVE_TO | CMD_LINE_TO => {
                for _ in 0..count {
                    let (Some(&px), Some(&py)) = (commands.get(i), commands.get(i + 1)) else {
                        return parts;
                    };
                    i += 2;
                    cx = cx.wrapping_add(zigzag(px));
                    cy = cy.wrapping_add(zigzag(py));

                    // Multi-point features pack every point into one MoveTo
                    if id == CMD_MOVE_TO || parts.is_empty() {
                        parts.push(Vec::new());
                    }
                    if let Some(part) = parts.last_mut() {
                        part.push((cx, cy));
                    }
                }
            }
            CMD_CLOSE_PATH => {
                if let Some(part) = parts.last_mut() {
                    if let Some(&first) = part.first() {
                        part.push(first);
                    }
                }
            }
            _ => {
                log::warn!("unknown geometry command {}", id);
                return parts;
            }
        }
    }
    parts
}
