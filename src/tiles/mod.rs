pub mod cache;
pub mod loader;
pub mod mvt;
pub mod parse;
pub mod source;

// Re-exports for convenience
pub use cache::{TileCache, TileRecord};
pub use loader::{AssetFetcher, HttpFetcher};
pub use mvt::MvtParser;
pub use parse::{ObjectDescriptor, TileParser};
pub use source::{TileSource, UrlTemplateSource};
