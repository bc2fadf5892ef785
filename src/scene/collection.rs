use nalgebra::{Matrix4, Rotation3, Vector3};

use crate::core::geo::TileCoord;
use crate::models::mesh::SceneNode;
use crate::prelude::HashMap;
use crate::tiles::parse::ObjectDescriptor;

/// Pick metadata attached to an instance's root node
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceTag {
    pub tile: TileCoord,
    pub model_id: String,
    pub model_name: String,
    /// Meters per tile-local unit the instance was scaled with
    pub scale_unit: f64,
    pub object: ObjectDescriptor,
}

/// One placed model inside a tile's collection
#[derive(Debug, Clone)]
pub struct SceneInstance {
    /// Object id, unique within the collection
    pub id: String,
    pub position: Vector3<f64>,
    /// Radians about the tile's Z axis
    pub rotation_z: f64,
    pub scale: Vector3<f64>,
    pub root: SceneNode,
}

impl SceneInstance {
    /// Tile-local transform: translate, then rotate about Z, then scale.
    pub fn matrix(&self) -> Matrix4<f64> {
        Matrix4::new_translation(&self.position)
            * Rotation3::from_axis_angle(&Vector3::z_axis(), self.rotation_z).to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }
}

/// Instances placed in one tile, addressable by object id.
#[derive(Debug, Clone, Default)]
pub struct RenderCollection {
    instances: Vec<SceneInstance>,
    by_name: HashMap<String, usize>,
}

impl RenderCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `instance` unless one with the same id is already present.
    pub fn insert(&mut self, instance: SceneInstance) -> bool {
        if self.by_name.contains_key(&instance.id) {
            return false;
        }
        self.by_name.insert(instance.id.clone(), self.instances.len());
        self.instances.push(instance);
        true
    }

    pub fn get_by_name(&self, id: &str) -> Option<&SceneInstance> {
        self.by_name.get(id).map(|&i| &self.instances[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_name.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneInstance> {
        self.instances.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SceneInstance> {
        self.instances.iter_mut()
    }
}
