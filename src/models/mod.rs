pub mod cache;
pub mod mesh;
pub mod obj;

pub use cache::{ModelCache, ModelRecord, TextureState};
pub use mesh::{MeshTemplate, SceneNode};
