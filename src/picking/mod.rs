//! Screen-space picking of placed models.
//!
//! Every tile has its own projection matrix, so a pick builds one ray per
//! visible tile in that tile's local space and keeps the nearest hit overall.

pub mod engine;
pub mod ray;

pub use engine::{FrameState, PickEngine, PickHit, PickOutcome, ProjectionProvider};
pub use ray::{Ray, ScreenRect};
