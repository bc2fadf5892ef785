//! Core constants shared by the tile/model pipeline.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// WGS84 semi-major axis used by Web Mercator, in meters.
pub const EARTH_RADIUS: f64 = 6378137.0;

/// Latitude limit of the Web Mercator projection.
pub const MAX_LATITUDE: f64 = 85.0511287798;

/// Deepest zoom a tile address may carry; x and y stay within `u32`
pub const MAX_TILE_ZOOM: u8 = 30;

/// Size of the fixed tile-local coordinate space objects are placed in.
pub const LOCAL_EXTENT: f64 = 8192.0;

/// Extent assumed for vector tile layers that don't declare one.
pub const DEFAULT_LAYER_EXTENT: u32 = 4096;

/// Square tile size (in CSS pixels) handed to the host's tile covering.
pub const DEFAULT_TILE_SIZE: u32 = 512;

/// Models are only streamed in this zoom window; the view zoom is clamped into it.
pub const DEFAULT_MIN_ZOOM: u8 = 16;
pub const DEFAULT_MAX_ZOOM: u8 = 19;

/// Default capacities of the tile and model LRU stores.
pub const DEFAULT_TILE_CACHE_SIZE: usize = 1024;
pub const DEFAULT_MODEL_CACHE_SIZE: usize = 1024;

/// Vector tile layer holding the model placements.
pub const DEFAULT_SOURCE_LAYER: &str = "objects";

/// `modelType` of the features placed as 3D models
pub const DEFAULT_MODEL_TYPE: &str = "Object";

/// Fraction of a model's vertical extent sunk below the ground plane.
pub const BASELINE_SINK_RATIO: f64 = 0.3;

/// Per-frame rise (local Z units) of freshly placed instances.
pub const DEFAULT_TRANSITION_STEP: f64 = 10.0;

/// Two faces sharing an edge further apart than this get an outline segment.
pub const OUTLINE_THRESHOLD_DEGREES: f64 = 1.0;

/// Flat color of untextured model materials.
pub const DEFAULT_MODEL_COLOR: [u8; 3] = [0xC0, 0xC0, 0xC0];

/// Color of fallback outline segments.
pub const OUTLINE_COLOR: [u8; 3] = [0x00, 0x00, 0x00];
