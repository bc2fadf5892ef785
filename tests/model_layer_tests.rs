//! End-to-end behaviour of the model layer with scripted downloads.
//!
//! Every fetch parks until the test resolves it, and the frame executor only
//! makes progress when the test runs it, so interleavings of downloads,
//! evictions and frames are exact.

use async_trait::async_trait;
use futures::channel::oneshot;
use maplet_models::prelude::*;
use nalgebra::{Matrix4, Point3};
use serde_json::{json, Value};

enum Reply {
    Tile(Vec<u8>),
    Model(MeshTemplate),
    Texture(Texture),
    Fail(u16),
}

#[derive(Default)]
struct ScriptedFetcher {
    pending: Mutex<Vec<(String, oneshot::Sender<Reply>)>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    async fn wait(&self, url: &str) -> Reply {
        let (tx, rx) = oneshot::channel();
        self.calls.lock().unwrap().push(url.to_string());
        self.pending.lock().unwrap().push((url.to_string(), tx));
        rx.await.unwrap_or(Reply::Fail(499))
    }

    fn resolve(&self, url: &str, reply: Reply) -> bool {
        let mut pending = self.pending.lock().unwrap();
        let Some(index) = pending.iter().position(|(u, _)| u == url) else {
            return false;
        };
        let (_, tx) = pending.remove(index);
        tx.send(reply).is_ok()
    }

    fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

fn unexpected(url: &str) -> MapError {
    MapError::Http { status: 500, url: url.to_string() }
}

#[async_trait]
impl AssetFetcher for ScriptedFetcher {
    async fn fetch_tile(&self, _coord: TileCoord, url: &str) -> maplet_models::Result<Vec<u8>> {
        match self.wait(url).await {
            Reply::Tile(bytes) => Ok(bytes),
            Reply::Fail(status) => Err(MapError::Http { status, url: url.to_string() }),
            _ => Err(unexpected(url)),
        }
    }

    async fn fetch_model(&self, url: &str) -> maplet_models::Result<MeshTemplate> {
        match self.wait(url).await {
            Reply::Model(template) => Ok(template),
            Reply::Fail(status) => Err(MapError::Http { status, url: url.to_string() }),
            _ => Err(unexpected(url)),
        }
    }

    async fn fetch_texture(&self, url: &str) -> maplet_models::Result<Texture> {
        match self.wait(url).await {
            Reply::Texture(texture) => Ok(texture),
            Reply::Fail(status) => Err(MapError::Http { status, url: url.to_string() }),
            _ => Err(unexpected(url)),
        }
    }
}

/// Reads `{ layer: [ { x, y, ...properties } ] }` JSON as a tile payload.
struct JsonTileParser;

impl TileParser for JsonTileParser {
    fn parse(&self, bytes: &[u8]) -> maplet_models::Result<ParsedTile> {
        let layers: HashMap<String, Vec<serde_json::Map<String, Value>>> = serde_json::from_slice(bytes)?;
        let mut parsed = ParsedTile::default();

        for (name, features) in layers {
            let features = features
                .into_iter()
                .map(|props| {
                    let x = props.get("x").and_then(Value::as_i64).unwrap_or(0) as i32;
                    let y = props.get("y").and_then(Value::as_i64).unwrap_or(0) as i32;
                    let properties = props
                        .into_iter()
                        .filter_map(|(k, v)| {
                            let value = match v {
                                Value::String(s) => PropertyValue::String(s),
                                Value::Number(n) => PropertyValue::Number(n.as_f64()?),
                                Value::Bool(b) => PropertyValue::Bool(b),
                                _ => return None,
                            };
                            Some((k, value))
                        })
                        .collect();
                    Feature {
                        id: None,
                        geometry_type: GeometryType::Point,
                        properties,
                        geometry: vec![vec![(x, y)]],
                    }
                })
                .collect();
            parsed.layers.insert(name, LayerView { extent: 8192, features });
        }
        Ok(parsed)
    }
}

/// Looks straight down on every tile: canvas pixel (px, py) is tile-local
/// (px, py), and the near plane sits at z = 1000.
struct TopDown {
    tiles: Option<Vec<TileCoord>>,
}

impl TopDown {
    fn all() -> Self {
        Self { tiles: None }
    }

    fn only(tiles: &[TileCoord]) -> Self {
        Self {
            tiles: Some(tiles.to_vec()),
        }
    }
}

impl ProjectionProvider for TopDown {
    fn tile_projection(&self, tile: &TileCoord, _frame: &FrameState) -> Option<Matrix4<f64>> {
        if let Some(tiles) = &self.tiles {
            if !tiles.contains(tile) {
                return None;
            }
        }
        Some(Matrix4::new(
            1.0 / 4096.0, 0.0, 0.0, -1.0, //
            0.0, -1.0 / 4096.0, 0.0, 1.0, //
            0.0, 0.0, -0.001, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ))
    }
}

#[derive(Default)]
struct RecordingSink {
    submitted: Vec<(TileCoord, usize)>,
}

impl RenderSink for RecordingSink {
    fn submit(&mut self, tile: TileCoord, _projection: &Matrix4<f64>, collection: &RenderCollection) {
        self.submitted.push((tile, collection.len()));
    }
}

struct World {
    layer: ModelLayer,
    fetcher: Arc<ScriptedFetcher>,
    executor: Arc<FrameExecutor>,
}

impl World {
    fn new(config: ModelLayerConfig) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let fetcher = Arc::new(ScriptedFetcher::default());
        let executor = Arc::new(FrameExecutor::new());
        let layer = ModelLayer::new(
            "models",
            config,
            fetcher.clone(),
            Arc::new(JsonTileParser),
            executor.clone(),
        )
        .unwrap();
        Self {
            layer,
            fetcher,
            executor,
        }
    }

    fn frame(&mut self, tiles: &[TileCoord]) -> Vec<TileCoord> {
        self.executor.run_until_stalled();
        let ready = self.layer.prepare_frame(tiles).to_vec();
        self.executor.run_until_stalled();
        ready
    }

    fn resolve(&self, url: &str, reply: Reply) {
        assert!(self.fetcher.resolve(url, reply), "nothing pending for {url}");
        self.executor.run_until_stalled();
    }

    /// Delivers mesh and texture for `name`.
    fn load_model(&mut self, name: &str) {
        self.resolve(&model_url(name), Reply::Model(cube_template(name)));
        self.resolve(&texture_url(name), Reply::Texture(white_texture()));
    }
}

fn tile_url(tile: TileCoord) -> String {
    format!("https://tiles.test/{}/{}/{}.pbf", tile.z, tile.x, tile.y)
}

fn model_url(name: &str) -> String {
    format!("https://models.test/{name}.obj")
}

fn texture_url(name: &str) -> String {
    format!("https://models.test/{name}.jpg")
}

fn object(id: &str, name: &str, x: i64, y: i64) -> Value {
    json!({
        "id": id,
        "modelName": name,
        "modelType": "Object",
        "modelUrl": format!("{name}.obj"),
        "textureUrl": format!("{name}.jpg"),
        "x": x,
        "y": y,
    })
}

fn tile_payload(objects: Vec<Value>) -> Reply {
    Reply::Tile(serde_json::to_vec(&json!({ "objects": objects })).unwrap())
}

/// Unit cube as authored Y-up, one mesh part under a group.
fn cube_template(name: &str) -> MeshTemplate {
    let positions = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(1.0, 0.0, 1.0),
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(0.0, 1.0, 1.0),
    ];
    let triangles = vec![
        [0, 2, 1], [0, 3, 2],
        [4, 5, 6], [4, 6, 7],
        [0, 1, 5], [0, 5, 4],
        [2, 3, 7], [2, 7, 6],
        [1, 2, 6], [1, 6, 5],
        [3, 0, 4], [3, 4, 7],
    ];
    MeshTemplate::new(SceneNode::group(name).with_child(SceneNode::mesh("body", Geometry::new(positions, triangles))))
}

fn white_texture() -> Texture {
    Texture {
        width: 1,
        height: 1,
        pixels: vec![255; 4],
    }
}

fn frame_state() -> FrameState {
    FrameState {
        zoom: 16.2,
        canvas: ScreenRect::new(8192.0, 8192.0),
        apply_globe_matrix: true,
    }
}

const A: TileCoord = TileCoord { x: 52196, y: 30791, z: 16 };
const B: TileCoord = TileCoord { x: 52197, y: 30791, z: 16 };
const C: TileCoord = TileCoord { x: 52198, y: 30791, z: 16 };

#[test]
fn ensure_twice_in_a_frame_fetches_once() {
    let mut world = World::new(ModelLayerConfig::for_testing());

    world.frame(&[A, A]);
    world.frame(&[A]);
    assert_eq!(world.fetcher.calls(&tile_url(A)), 1);

    world.resolve(&tile_url(A), tile_payload(vec![object("o1", "lamp", 100, 200)]));
    world.frame(&[A]);
    world.frame(&[A]);
    assert_eq!(world.fetcher.calls(&tile_url(A)), 1);
}

#[test]
fn shared_model_is_fetched_once_across_tiles() {
    let mut world = World::new(ModelLayerConfig::for_testing());
    world.frame(&[A, B]);
    world.resolve(&tile_url(A), tile_payload(vec![object("o1", "lamp", 100, 200)]));
    world.resolve(&tile_url(B), tile_payload(vec![object("o9", "lamp", 10, 20)]));

    world.frame(&[A, B]);
    world.frame(&[A, B]);
    assert_eq!(world.fetcher.calls(&model_url("lamp")), 1);

    world.load_model("lamp");
    let ready = world.frame(&[A, B]);
    assert_eq!(ready, vec![A, B]);
}

#[test]
fn evicted_tile_download_changes_nothing() {
    let mut config = ModelLayerConfig::for_testing();
    config.cache.tile_capacity = 2;
    let mut world = World::new(config);

    world.frame(&[A]);
    world.frame(&[B]);
    world.frame(&[C]);
    assert!(!world.layer.tile_cache().contains(&A));

    world.resolve(&tile_url(A), tile_payload(vec![object("o1", "lamp", 100, 200)]));
    world.frame(&[B, C]);

    assert!(!world.layer.tile_cache().contains(&A));
    assert_eq!(world.layer.tile_cache().stats().applied, 0);
    assert_eq!(world.fetcher.calls(&model_url("lamp")), 0);
}

#[test]
fn evicted_model_download_changes_nothing() {
    let mut config = ModelLayerConfig::for_testing();
    config.cache.model_capacity = 1;
    let mut world = World::new(config);

    world.frame(&[A]);
    world.resolve(
        &tile_url(A),
        tile_payload(vec![object("o1", "lamp", 100, 200), object("o2", "bench", 300, 400)]),
    );
    // lamp is requested, then evicted by bench in the same frame
    world.frame(&[A]);
    assert!(!world.layer.model_cache().contains("lamp"));

    world.resolve(&model_url("lamp"), Reply::Model(cube_template("lamp")));
    assert_eq!(world.fetcher.calls(&texture_url("lamp")), 0);
    assert!(!world.layer.model_cache().contains("lamp"));
    assert_eq!(
        world.layer.model_cache().get("bench").unwrap().download_state(),
        DownloadState::Downloading
    );
}

#[test]
fn model_evicted_while_texture_downloads_changes_nothing() {
    let mut config = ModelLayerConfig::for_testing();
    config.cache.model_capacity = 1;
    let mut world = World::new(config);

    world.frame(&[A]);
    world.resolve(&tile_url(A), tile_payload(vec![object("o1", "lamp", 100, 200)]));
    world.frame(&[A]);
    world.resolve(&model_url("lamp"), Reply::Model(cube_template("lamp")));
    assert_eq!(world.fetcher.calls(&texture_url("lamp")), 1);

    // A second tile brings a model that pushes lamp out mid-texture
    world.frame(&[B]);
    world.resolve(&tile_url(B), tile_payload(vec![object("o2", "bench", 10, 20)]));
    world.frame(&[B]);
    assert!(!world.layer.model_cache().contains("lamp"));

    world.resolve(&texture_url("lamp"), Reply::Texture(white_texture()));
    world.frame(&[B]);
    assert!(!world.layer.model_cache().contains("lamp"));
    assert_eq!(world.layer.model_cache().stats().applied, 0);
    assert!(world.layer.tile_cache().peek(&A).unwrap().render_collection().unwrap().is_empty());
}

#[test]
fn features_of_other_model_types_are_skipped() {
    let mut world = World::new(ModelLayerConfig::for_testing());
    world.frame(&[A]);

    let mut tree = object("t1", "tree", 300, 400);
    tree["modelType"] = json!("Vegetation");
    let mut untyped = object("u1", "kiosk", 500, 600);
    untyped.as_object_mut().unwrap().remove("modelType");
    world.resolve(
        &tile_url(A),
        tile_payload(vec![object("o1", "lamp", 100, 200), tree, untyped]),
    );
    world.frame(&[A]);

    let record = world.layer.tile_cache().peek(&A).unwrap();
    let ids: Vec<&str> = record.objects().iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["o1"]);
    assert_eq!(world.fetcher.calls(&model_url("tree")), 0);
    assert_eq!(world.fetcher.calls(&model_url("kiosk")), 0);
}

#[test]
fn connect_uses_inline_templates_without_tilejson() {
    let layer = futures::executor::block_on(ModelLayer::connect(
        "models",
        ModelLayerConfig::for_testing(),
        Arc::new(ScriptedFetcher::default()),
        Arc::new(JsonTileParser),
        Arc::new(FrameExecutor::new()),
    ))
    .unwrap();
    assert_eq!(layer.id(), "models");

    let mut config = ModelLayerConfig::for_testing();
    config.source.tile_templates.clear();
    let result = futures::executor::block_on(ModelLayer::connect(
        "models",
        config,
        Arc::new(ScriptedFetcher::default()),
        Arc::new(JsonTileParser),
        Arc::new(FrameExecutor::new()),
    ));
    assert!(matches!(result, Err(MapError::Config(_))));
}

#[test]
fn repeated_population_never_duplicates_instances() {
    let mut world = World::new(ModelLayerConfig::for_testing());
    world.frame(&[A]);
    world.resolve(
        &tile_url(A),
        tile_payload(vec![
            object("o1", "lamp", 100, 200),
            object("o2", "bench", 300, 400),
            object("o3", "lamp", 500, 600),
        ]),
    );
    world.frame(&[A]);

    world.load_model("lamp");
    for _ in 0..5 {
        world.frame(&[A]);
    }
    let record = world.layer.tile_cache().peek(&A).unwrap();
    assert_eq!(record.render_collection().unwrap().len(), 2);

    world.load_model("bench");
    for _ in 0..5 {
        world.frame(&[A]);
    }
    let collection = world.layer.tile_cache().peek(&A).unwrap().render_collection().unwrap();
    assert_eq!(collection.len(), 3);
    let mut ids: Vec<&str> = collection.iter().map(|i| i.id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["o1", "o2", "o3"]);
}

#[test]
fn lamp_round_trip_placement() {
    let mut world = World::new(ModelLayerConfig::for_testing());
    world.frame(&[A]);

    let mut lamp = object("o1", "lamp", 100, 200);
    lamp["bearing"] = json!(90);
    lamp["scale"] = json!(2);
    world.resolve(&tile_url(A), tile_payload(vec![lamp]));
    world.frame(&[A]);
    world.load_model("lamp");
    world.frame(&[A]);

    let collection = world.layer.tile_cache().peek(&A).unwrap().render_collection().unwrap();
    let instance = collection.get_by_name("o1").unwrap();
    let u = meters_per_local_unit(tile_local_to_lat_lng(&A, 100.0, 200.0).lat, 16);

    assert!((instance.rotation_z - (-90f64).to_radians()).abs() < 1e-12);
    assert!((instance.scale.x - 2.0 * u).abs() < 1e-12);
    assert!((instance.scale.y + 2.0 * u).abs() < 1e-12);
    assert_eq!(instance.scale.z, 2.0);
    assert_eq!((instance.position.x, instance.position.y), (100.0, 200.0));

    let tag = instance.root.tag.as_ref().unwrap();
    assert_eq!(tag.model_id, "o1");
    assert_eq!(tag.model_name, "lamp");
    assert_eq!(tag.tile, A);
    assert!((tag.scale_unit - u).abs() < 1e-15);
}

#[test]
fn tile_without_model_layer_is_not_supported() {
    let mut world = World::new(ModelLayerConfig::for_testing());
    world.frame(&[A]);
    world.resolve(
        &tile_url(A),
        Reply::Tile(serde_json::to_vec(&json!({ "roads": [] })).unwrap()),
    );

    for _ in 0..3 {
        assert!(world.frame(&[A]).is_empty());
    }
    let record = world.layer.tile_cache().peek(&A).unwrap();
    assert_eq!(record.load_state(), LoadState::NotSupported);
    assert!(record.render_collection().is_none());
    assert_eq!(world.fetcher.calls(&tile_url(A)), 1);
}

#[test]
fn failed_tile_is_not_retried() {
    let mut world = World::new(ModelLayerConfig::for_testing());
    world.frame(&[A]);
    world.resolve(&tile_url(A), Reply::Fail(503));
    world.frame(&[A]);
    world.frame(&[A]);

    assert_eq!(world.layer.tile_cache().peek(&A).unwrap().load_state(), LoadState::Error);
    assert_eq!(world.fetcher.calls(&tile_url(A)), 1);
}

#[test]
fn texture_failure_still_places_outlined_model() {
    let mut world = World::new(ModelLayerConfig::for_testing());
    world.frame(&[A]);
    world.resolve(&tile_url(A), tile_payload(vec![object("o1", "lamp", 100, 200)]));
    world.frame(&[A]);
    world.resolve(&model_url("lamp"), Reply::Model(cube_template("lamp")));
    world.resolve(&texture_url("lamp"), Reply::Fail(404));

    assert_eq!(world.frame(&[A]), vec![A]);
    let record = world.layer.model_cache().get("lamp").unwrap();
    assert_eq!(record.download_state(), DownloadState::Loaded);
    assert_eq!(record.texture_state(), TextureState::Fallback);

    let collection = world.layer.tile_cache().peek(&A).unwrap().render_collection().unwrap();
    let body = &collection.get_by_name("o1").unwrap().root.children[0];
    assert!(matches!(body.kind, NodeKind::Mesh { .. }));
    assert!(body.children.iter().any(|c| matches!(c.kind, NodeKind::Outline { .. })));
}

#[test]
fn failed_mesh_is_never_placed() {
    let mut world = World::new(ModelLayerConfig::for_testing());
    world.frame(&[A]);
    world.resolve(&tile_url(A), tile_payload(vec![object("o1", "lamp", 100, 200)]));
    world.frame(&[A]);
    world.resolve(&model_url("lamp"), Reply::Fail(500));

    for _ in 0..3 {
        assert!(world.frame(&[A]).is_empty());
    }
    assert!(world.layer.model_cache().get("lamp").unwrap().error().is_some());
    assert_eq!(world.fetcher.calls(&model_url("lamp")), 1);
}

/// Two overlapping tiles with one object each under the same pixel;
/// `tall_scale` sets how high the object in B reaches.
fn overlapping_world(tall_scale: i64) -> World {
    let mut world = World::new(ModelLayerConfig::for_testing());
    world.frame(&[A, B]);

    let mut short = object("short", "lamp", 100, 200);
    short["scale"] = json!(50);
    let mut tall = object("tall", "lamp", 100, 200);
    tall["scale"] = json!(tall_scale);
    world.resolve(&tile_url(A), tile_payload(vec![short]));
    world.resolve(&tile_url(B), tile_payload(vec![tall]));

    world.frame(&[A, B]);
    world.load_model("lamp");
    assert_eq!(world.frame(&[A, B]), vec![A, B]);
    world
}

#[test]
fn pick_returns_globally_nearest_hit() {
    let world = overlapping_world(100);
    let outcome = world
        .layer
        .pick(Point::new(101.0, 201.0), &frame_state(), &TopDown::all());

    let hit = outcome.hit().expect("expected a hit");
    assert_eq!(hit.tile, B);
    assert_eq!(hit.tag.model_id, "tall");
    // Near plane at z = 1000, cube top at 100 minus the 0.3 seat
    assert!((hit.distance - 900.3).abs() < 1e-6);

    // Geographic position of the hit, for tooltips
    let expected = tile_local_to_lat_lng(&B, 101.0, 201.0);
    let lat_lng = hit.lat_lng();
    assert!((lat_lng.lat - expected.lat).abs() < 1e-9);
    assert!((lat_lng.lng - expected.lng).abs() < 1e-9);

    // Tile A alone still yields its own object
    let outcome = world
        .layer
        .pick(Point::new(101.0, 201.0), &frame_state(), &TopDown::only(&[A]));
    assert_eq!(outcome.hit().unwrap().tag.model_id, "short");
}

#[test]
fn pick_distinguishes_miss_from_not_ready() {
    let mut world = World::new(ModelLayerConfig::for_testing());
    world.frame(&[A]);
    let outcome = world
        .layer
        .pick(Point::new(101.0, 201.0), &frame_state(), &TopDown::all());
    assert!(outcome.is_not_ready());

    let world = overlapping_world(100);
    let outcome = world
        .layer
        .pick(Point::new(4000.0, 4000.0), &frame_state(), &TopDown::all());
    assert!(outcome.is_miss());

    // No projections at all this frame
    let outcome = world
        .layer
        .pick(Point::new(101.0, 201.0), &frame_state(), &TopDown::only(&[]));
    assert!(outcome.is_not_ready());
}

#[test]
fn render_submits_ready_tiles_with_projection() {
    let world = overlapping_world(100);

    let mut sink = RecordingSink::default();
    assert_eq!(world.layer.render(&frame_state(), &TopDown::all(), &mut sink), 2);
    assert_eq!(sink.submitted, vec![(A, 1), (B, 1)]);

    let mut sink = RecordingSink::default();
    assert_eq!(world.layer.render(&frame_state(), &TopDown::only(&[B]), &mut sink), 1);
    assert_eq!(sink.submitted, vec![(B, 1)]);
}

#[test]
fn hidden_layer_does_nothing() {
    let mut world = overlapping_world(100);
    world.layer.set_visible(false);

    assert!(world.frame(&[C]).is_empty());
    assert!(!world.layer.tile_cache().contains(&C));

    let mut sink = RecordingSink::default();
    assert_eq!(world.layer.render(&frame_state(), &TopDown::all(), &mut sink), 0);
}

#[test]
fn clear_disposes_in_flight_downloads() {
    let mut world = World::new(ModelLayerConfig::for_testing());
    world.frame(&[A]);
    world.layer.clear();
    assert!(world.layer.tile_cache().is_empty());

    world.resolve(&tile_url(A), tile_payload(vec![object("o1", "lamp", 100, 200)]));
    world.layer.prepare_frame(&[]);
    assert!(world.layer.tile_cache().is_empty());
    assert_eq!(world.layer.tile_cache().stats().applied, 0);
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = ModelLayerConfig::for_testing();
    config.source.tile_templates.clear();
    let result = ModelLayer::new(
        "models",
        config,
        Arc::new(ScriptedFetcher::default()),
        Arc::new(JsonTileParser),
        Arc::new(FrameExecutor::new()),
    );
    assert!(matches!(result, Err(MapError::Config(_))));
}

#[test]
fn tile_zoom_is_clamped() {
    let world = World::new(ModelLayerConfig::for_testing());
    assert_eq!(world.layer.tile_zoom(12.0), 16);
    assert_eq!(world.layer.tile_zoom(17.4), 17);
    assert_eq!(world.layer.tile_zoom(21.0), 19);
}

/// Fetcher that answers immediately, for running on a real runtime.
struct InstantFetcher;

#[async_trait]
impl AssetFetcher for InstantFetcher {
    async fn fetch_tile(&self, _coord: TileCoord, _url: &str) -> maplet_models::Result<Vec<u8>> {
        Ok(serde_json::to_vec(&json!({ "objects": [object("o1", "lamp", 100, 200)] }))?)
    }

    async fn fetch_model(&self, _url: &str) -> maplet_models::Result<MeshTemplate> {
        Ok(cube_template("lamp"))
    }

    async fn fetch_texture(&self, _url: &str) -> maplet_models::Result<Texture> {
        Ok(white_texture())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tokio_spawner_delivers_through_frame_loop() {
    let mut layer = ModelLayer::new(
        "models",
        ModelLayerConfig::for_testing(),
        Arc::new(InstantFetcher),
        Arc::new(JsonTileParser),
        Arc::new(TokioSpawner::current()),
    )
    .unwrap();

    let mut ready = Vec::new();
    for _ in 0..200 {
        ready = layer.prepare_frame(&[A]).to_vec();
        if !ready.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    assert_eq!(ready, vec![A]);
    assert_eq!(layer.model_cache().stats().requests, 1);
    assert_eq!(layer.tile_cache().stats().requests, 1);
}
