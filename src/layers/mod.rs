pub mod models;

pub use models::{ModelLayer, RenderSink};
