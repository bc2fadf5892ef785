use nalgebra::{Matrix4, Point3};

use crate::core::geo::{tile_local_to_lat_lng, LatLng, Point, TileCoord};
use crate::models::mesh::{NodeKind, SceneNode};
use crate::picking::ray::{Ray, ScreenRect};
use crate::prelude::Arc;
use crate::scene::collection::{InstanceTag, RenderCollection};
use crate::tiles::cache::TileCache;

/// Per-frame view parameters handed to the projection provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameState {
    /// Fractional view zoom
    pub zoom: f64,
    pub canvas: ScreenRect,
    pub apply_globe_matrix: bool,
}

/// Host map's per-tile projection, queried again every frame.
pub trait ProjectionProvider {
    /// Matrix taking the tile's local space (0..8192, Z up) to clip space,
    /// or `None` if the tile is not part of the current frame.
    fn tile_projection(&self, tile: &TileCoord, frame: &FrameState) -> Option<Matrix4<f64>>;
}

#[derive(Debug, Clone)]
pub struct PickHit {
    pub tag: Arc<InstanceTag>,
    pub tile: TileCoord,
    /// Distance along the ray, in tile-local units
    pub distance: f64,
    /// Hit point in the tile's local space
    pub point: Point3<f64>,
}

impl PickHit {
    /// Geographic position of the hit point.
    pub fn lat_lng(&self) -> LatLng {
        tile_local_to_lat_lng(&self.tile, self.point.x, self.point.y)
    }
}

#[derive(Debug, Clone)]
pub enum PickOutcome {
    Hit(PickHit),
    /// At least one tile could be tested and nothing was hit
    Miss,
    /// No visible tile had instances and a projection yet
    NotReady,
}

impl PickOutcome {
    pub fn hit(&self) -> Option<&PickHit> {
        match self {
            Self::Hit(hit) => Some(hit),
            _ => None,
        }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss)
    }

    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady)
    }
}

/// Finds the nearest placed object under a screen point.
#[derive(Debug, Clone, Copy, Default)]
pub struct PickEngine;

impl PickEngine {
    pub fn new() -> Self {
        Self
    }

    /// Casts a ray per visible tile through that tile's own projection and
    /// returns the globally nearest hit.
    pub fn pick(
        &self,
        screen: Point,
        visible: &[TileCoord],
        tiles: &TileCache,
        frame: &FrameState,
        provider: &dyn ProjectionProvider,
    ) -> PickOutcome {
        let mut tested = false;
        let mut best: Option<PickHit> = None;

        for address in visible {
            let Some(collection) = tiles
                .peek(address)
                .and_then(|record| record.render_collection())
                .filter(|c| !c.is_empty())
            else {
                continue;
            };
            let Some(projection) = provider.tile_projection(address, frame) else {
                log::trace!("no projection for tile {}, skipped", address);
                continue;
            };
            let Some(ray) = Ray::from_screen(screen, frame.canvas, &projection) else {
                continue;
            };

            tested = true;
            if let Some(hit) = self.pick_collection(&ray, *address, collection) {
                if best.as_ref().map_or(true, |b| hit.distance < b.distance) {
                    best = Some(hit);
                }
            }
        }

        match best {
            Some(hit) => PickOutcome::Hit(hit),
            None if tested => PickOutcome::Miss,
            None => PickOutcome::NotReady,
        }
    }

    /// Nearest hit among one tile's instances, with `ray` in that tile's space.
    pub fn pick_collection(&self, ray: &Ray, tile: TileCoord, collection: &RenderCollection) -> Option<PickHit> {
        let mut best: Option<(f64, Arc<InstanceTag>)> = None;
        for instance in collection.iter() {
            intersect_node(ray, &instance.root, &instance.matrix(), None, &mut best);
        }

        best.map(|(distance, tag)| PickHit {
            tag,
            tile,
            distance,
            point: ray.at(distance),
        })
    }
}

/// Tests `node` and its descendants; `owner` is the nearest tagged ancestor.
fn intersect_node(
    ray: &Ray,
    node: &SceneNode,
    parent: &Matrix4<f64>,
    owner: Option<&Arc<InstanceTag>>,
    best: &mut Option<(f64, Arc<InstanceTag>)>,
) {
    let world = parent * node.transform;
    let owner = node.tag.as_ref().or(owner);

    if let (NodeKind::Mesh { geometry, .. }, Some(tag)) = (&node.kind, owner) {
        let bounds = geometry.bounds().transformed(&world);
        let closer_than_best = |t: f64| best.as_ref().map_or(true, |(d, _)| t < *d);

        if ray.intersect_aabb(&bounds).map_or(false, |t| closer_than_best(t)) {
            let nearest = (0..geometry.triangles().len())
                .filter_map(|i| {
                    let [a, b, c] = geometry.triangle(i);
                    let tri = [
                        world.transform_point(&a),
                        world.transform_point(&b),
                        world.transform_point(&c),
                    ];
                    ray.intersect_triangle(&tri)
                })
                .min_by(|x, y| x.total_cmp(y));

            if let Some(t) = nearest.filter(|&t| closer_than_best(t)) {
                *best = Some((t, Arc::clone(tag)));
            }
        }
    }

    for child in &node.children {
        intersect_node(ray, child, &world, owner, best);
    }
}
