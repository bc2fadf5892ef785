use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

use crate::core::constants::{EARTH_RADIUS, LOCAL_EXTENT, MAX_LATITUDE, MAX_TILE_ZOOM};

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Clamps latitude to the Web Mercator range
    pub fn clamp_lat(lat: f64) -> f64 {
        lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Represents a point in screen or projected coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Represents a tile coordinate in the slippy map tile system.
///
/// This is the canonical tile address: hosts that track overscaled or
/// world-wrapped tile ids must fold them down with [`TileCoord::from_wrapped`]
/// before using them as a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Builds the canonical address for a tile whose x index may have wrapped
    /// around the antimeridian (any integer, including negatives).
    ///
    /// Zooms above [`MAX_TILE_ZOOM`] are clamped to it.
    pub fn from_wrapped(z: u8, x: i64, y: u32) -> Self {
        let z = z.min(MAX_TILE_ZOOM);
        let n = 1_i64 << z;
        Self::new(x.rem_euclid(n) as u32, y, z)
    }

    /// Creates a tile coordinate from a LatLng and zoom level
    pub fn from_lat_lng(lat_lng: &LatLng, zoom: u8) -> Self {
        let (fx, fy) = world_fraction(lat_lng);
        let n = 2_f64.powi(zoom as i32);
        let max = (n as u32).saturating_sub(1);

        let x = ((fx * n).floor() as u32).min(max);
        let y = ((fy * n).floor() as u32).min(max);

        Self::new(x, y, zoom)
    }

    /// Converts tile coordinate to LatLng (northwest corner)
    pub fn to_lat_lng(&self) -> LatLng {
        tile_local_to_lat_lng(self, 0.0, 0.0)
    }

    /// Whether `x` and `y` lie inside the grid at `z` and `z` is within
    /// the Web Mercator range.
    pub fn is_valid(&self) -> bool {
        if self.z > MAX_TILE_ZOOM {
            return false;
        }
        let n = 1_u64 << self.z;
        u64::from(self.x) < n && u64::from(self.y) < n
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Fraction of the Web Mercator world (0..1 on both axes, y growing south).
fn world_fraction(lat_lng: &LatLng) -> (f64, f64) {
    let lat_rad = LatLng::clamp_lat(lat_lng.lat).to_radians();
    let fx = (lat_lng.lng + 180.0) / 360.0;
    let fy = (1.0 - lat_rad.tan().asinh() / PI) / 2.0;
    (fx, fy)
}

/// Converts a tile-local coordinate (0..[`LOCAL_EXTENT`] on both axes, y
/// growing south) inside `tile` to latitude/longitude.
pub fn tile_local_to_lat_lng(tile: &TileCoord, local_x: f64, local_y: f64) -> LatLng {
    let n = 2_f64.powi(tile.z as i32);
    let fx = (tile.x as f64 + local_x / LOCAL_EXTENT) / n;
    let fy = (tile.y as f64 + local_y / LOCAL_EXTENT) / n;

    let lng = fx * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * fy)).sinh().atan().to_degrees();
    LatLng::new(lat, lng)
}

/// Inverse of [`tile_local_to_lat_lng`]: returns the tile containing
/// `lat_lng` at `zoom` together with the local coordinate inside it.
pub fn lat_lng_to_tile_local(lat_lng: &LatLng, zoom: u8) -> (TileCoord, f64, f64) {
    let tile = TileCoord::from_lat_lng(lat_lng, zoom);
    let (fx, fy) = world_fraction(lat_lng);
    let n = 2_f64.powi(zoom as i32);

    let local_x = (fx * n - tile.x as f64) * LOCAL_EXTENT;
    let local_y = (fy * n - tile.y as f64) * LOCAL_EXTENT;
    (tile, local_x, local_y)
}

/// Real-world meters covered by one tile-local unit at `lat` and `zoom`.
///
/// Mercator stretches distances by `1 / cos(lat)`, so this shrinks towards
/// the poles and must be evaluated at the object's own latitude.
pub fn meters_per_local_unit(lat: f64, zoom: u8) -> f64 {
    let circumference = 2.0 * PI * EARTH_RADIUS;
    let tile_meters = circumference * LatLng::clamp_lat(lat).to_radians().cos()
        / 2_f64.powi(zoom as i32);
    tile_meters / LOCAL_EXTENT
}
