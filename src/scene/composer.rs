use nalgebra::Vector3;

use crate::core::config::ModelPolicy;
use crate::core::geo::{meters_per_local_unit, tile_local_to_lat_lng};
use crate::models::cache::ModelCache;
use crate::prelude::Arc;
use crate::scene::collection::{InstanceTag, SceneInstance};
use crate::tiles::cache::TileRecord;

/// Places cached models into a tile's render collection, once per object.
#[derive(Debug, Clone, Default)]
pub struct SceneComposer {
    policy: ModelPolicy,
}

impl SceneComposer {
    pub fn new(policy: ModelPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ModelPolicy {
        &self.policy
    }

    /// Instantiates every object of `tile` whose model is ready and which
    /// is not placed yet. Returns the number of instances added.
    ///
    /// Objects whose model is still loading (or failed) are skipped and
    /// picked up by a later call.
    pub fn populate(&self, tile: &mut TileRecord, models: &ModelCache) -> usize {
        let address = tile.address();
        let Some((objects, collection)) = tile.split_mut() else {
            return 0;
        };
        if collection.len() == objects.len() {
            return 0;
        }

        let mut added = 0;
        for object in objects {
            if collection.contains(&object.id) {
                continue;
            }
            let Some(template) = models.ready_template(object) else {
                continue;
            };

            let lat_lng = tile_local_to_lat_lng(&address, object.local_x, object.local_y);
            let unit = meters_per_local_unit(lat_lng.lat, address.z);
            let s = object.scale;

            let mut root = template.instantiate();
            root.name = object.id.clone();
            root.tag = Some(Arc::new(InstanceTag {
                tile: address,
                model_id: object.id.clone(),
                model_name: object.model_name.clone(),
                scale_unit: unit,
                object: object.clone(),
            }));

            // Tile-local y grows south, hence the mirrored y scale
            let instance = SceneInstance {
                id: object.id.clone(),
                position: Vector3::new(object.local_x, object.local_y, template.baseline_z()),
                rotation_z: -object.bearing.to_radians(),
                scale: Vector3::new(unit * s, -unit * s, s),
                root,
            };
            if collection.insert(instance) {
                added += 1;
            }
        }

        if added > 0 {
            log::debug!("placed {} models in tile {}", added, address);
        }
        added
    }

    /// Raises sunken instances one step towards Z = 0. Returns how many moved.
    pub fn advance_transitions(&self, tile: &mut TileRecord) -> usize {
        let Some(step) = self.policy.transition_step else {
            return 0;
        };
        let Some(collection) = tile.render_collection_mut() else {
            return 0;
        };

        let mut moved = 0;
        for instance in collection.iter_mut().filter(|i| i.position.z < 0.0) {
            instance.position.z = (instance.position.z + step).min(0.0);
            moved += 1;
        }
        moved
    }
}
