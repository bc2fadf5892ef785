//! The map layer that streams, places, renders and picks 3D models.

use nalgebra::Matrix4;

use crate::core::config::ModelLayerConfig;
use crate::core::geo::{Point, TileCoord};
use crate::models::cache::ModelCache;
use crate::picking::{FrameState, PickEngine, PickOutcome, ProjectionProvider};
use crate::prelude::Arc;
use crate::runtime::AsyncSpawner;
use crate::scene::collection::RenderCollection;
use crate::scene::composer::SceneComposer;
use crate::tiles::cache::TileCache;
use crate::tiles::loader::AssetFetcher;
use crate::tiles::parse::TileParser;
use crate::tiles::source::{TileSource, UrlTemplateSource};
use crate::Result;

/// Receives each ready tile's collection together with its projection.
pub trait RenderSink {
    fn submit(&mut self, tile: TileCoord, projection: &Matrix4<f64>, collection: &RenderCollection);
}

/// Owns both caches and drives the per-frame flow:
/// visible tiles -> tile cache -> model cache -> composer -> render sink.
///
/// Everything here runs on the frame loop; downloads only report back
/// through the caches' completion channels.
pub struct ModelLayer {
    id: String,
    config: ModelLayerConfig,
    visible: bool,
    tiles: TileCache,
    models: ModelCache,
    composer: SceneComposer,
    picker: PickEngine,
    /// Tiles with placed instances as of the last `prepare_frame`
    ready: Vec<TileCoord>,
}

impl ModelLayer {
    pub fn new(
        id: impl Into<String>,
        config: ModelLayerConfig,
        fetcher: Arc<dyn AssetFetcher>,
        parser: Arc<dyn TileParser>,
        spawner: Arc<dyn AsyncSpawner>,
    ) -> Result<Self> {
        let source = UrlTemplateSource::from_config(&config.source)?;
        Self::with_source(id, config, Arc::new(source), fetcher, parser, spawner)
    }

    /// Like [`ModelLayer::new`], but fetches the TileJSON document named by
    /// `config.source.tilejson_url` first when no inline templates are set.
    pub async fn connect(
        id: impl Into<String>,
        config: ModelLayerConfig,
        fetcher: Arc<dyn AssetFetcher>,
        parser: Arc<dyn TileParser>,
        spawner: Arc<dyn AsyncSpawner>,
    ) -> Result<Self> {
        config.validate()?;
        let source = UrlTemplateSource::resolve(&config.source).await?;
        Self::with_source(id, config, Arc::new(source), fetcher, parser, spawner)
    }

    /// Like [`ModelLayer::new`] with a custom tile URL source.
    pub fn with_source(
        id: impl Into<String>,
        config: ModelLayerConfig,
        source: Arc<dyn TileSource>,
        fetcher: Arc<dyn AssetFetcher>,
        parser: Arc<dyn TileParser>,
        spawner: Arc<dyn AsyncSpawner>,
    ) -> Result<Self> {
        config.validate()?;

        let tiles = TileCache::new(
            config.cache.tile_capacity,
            Arc::clone(&fetcher),
            parser,
            source,
            Arc::clone(&spawner),
        )
        .with_source_layer(config.source.source_layer.clone())
        .with_model_type_filter(config.policy.model_type_filter.clone());

        let models = ModelCache::new(config.cache.model_capacity, fetcher, spawner)
            .with_policy(config.policy.clone())
            .with_root_url(config.source.root_url.clone());

        let id = id.into();
        log::info!(
            "model layer {} created (tiles {}, models {})",
            id,
            config.cache.tile_capacity,
            config.cache.model_capacity
        );

        Ok(Self {
            id,
            composer: SceneComposer::new(config.policy.clone()),
            config,
            visible: true,
            tiles,
            models,
            picker: PickEngine::new(),
            ready: Vec::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &ModelLayerConfig {
        &self.config
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Zoom the host should cover the viewport at for a fractional view zoom.
    pub fn tile_zoom(&self, view_zoom: f64) -> u8 {
        self.config.source.clamp_zoom(view_zoom)
    }

    pub fn tile_cache(&self) -> &TileCache {
        &self.tiles
    }

    pub fn model_cache(&self) -> &ModelCache {
        &self.models
    }

    /// Tiles with at least one placed instance after the last frame
    pub fn ready_tiles(&self) -> &[TileCoord] {
        &self.ready
    }

    /// Runs the data flow for the tiles the host sees this frame and returns
    /// the ones that have instances to draw. Never blocks.
    pub fn prepare_frame(&mut self, visible: &[TileCoord]) -> &[TileCoord] {
        self.ready.clear();
        if !self.visible {
            return &self.ready;
        }

        self.models.process_completions();
        let loaded: Vec<TileCoord> = self.tiles.ensure(visible).iter().map(|r| r.address()).collect();

        for address in loaded {
            if let Some(record) = self.tiles.peek(&address) {
                for object in record.objects() {
                    self.models.ensure_model(object);
                }
            }

            let Some(record) = self.tiles.get_mut(&address) else {
                continue;
            };
            self.composer.populate(record, &self.models);
            self.composer.advance_transitions(record);

            if record.render_collection().map_or(false, |c| !c.is_empty()) {
                self.ready.push(address);
            }
        }

        &self.ready
    }

    /// Hands every ready tile with a projection this frame to `sink`.
    /// Returns how many tiles were submitted.
    pub fn render(&self, frame: &FrameState, provider: &dyn ProjectionProvider, sink: &mut dyn RenderSink) -> usize {
        if !self.visible {
            return 0;
        }

        let mut submitted = 0;
        for address in &self.ready {
            let Some(collection) = self.tiles.peek(address).and_then(|r| r.render_collection()) else {
                continue;
            };
            let Some(projection) = provider.tile_projection(address, frame) else {
                continue;
            };
            sink.submit(*address, &projection, collection);
            submitted += 1;
        }
        submitted
    }

    /// Nearest object under `screen` among the tiles prepared this frame.
    pub fn pick(&self, screen: Point, frame: &FrameState, provider: &dyn ProjectionProvider) -> PickOutcome {
        if !self.visible {
            return PickOutcome::NotReady;
        }
        self.picker.pick(screen, &self.ready, &self.tiles, frame, provider)
    }

    /// Drops both caches, e.g. when the layer is removed from the map.
    pub fn clear(&mut self) {
        self.tiles.clear();
        self.models.clear();
        self.ready.clear();
        log::debug!("model layer {} cleared", self.id);
    }
}

impl Drop for ModelLayer {
    fn drop(&mut self) {
        // Disposes in-flight downloads so their results are dropped unread
        self.clear();
    }
}
