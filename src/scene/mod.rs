//! Per-tile scene collections and the composer that fills them.

pub mod collection;
pub mod composer;

pub use collection::{InstanceTag, RenderCollection, SceneInstance};
pub use composer::SceneComposer;
