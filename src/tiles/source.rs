use serde::Deserialize;

use crate::core::config::SourceConfig;
use crate::core::geo::TileCoord;
use crate::tiles::loader::HTTP_CLIENT;
use crate::{Error, Result};

/// Trait representing anything that can produce tile URLs for a given coordinate.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> String;
}

/// Builds tile URLs from `{z}/{x}/{y}` templates, as found in a vector
/// source's `tiles` array or a TileJSON document.
#[derive(Debug, Clone)]
pub struct UrlTemplateSource {
    templates: Vec<String>,
    key: Option<String>,
}

impl UrlTemplateSource {
    pub fn new(templates: Vec<String>, key: Option<String>) -> Result<Self> {
        if templates.is_empty() {
            return Err(Error::Config("no tile template available".into()));
        }
        Ok(Self { templates, key })
    }

    /// Inline templates of `source`. Fails when the source only names a
    /// TileJSON document; use [`UrlTemplateSource::resolve`] for those.
    pub fn from_config(source: &SourceConfig) -> Result<Self> {
        Self::new(source.tile_templates.clone(), source.key.clone())
    }

    /// Templates from a TileJSON body.
    pub fn from_tilejson(body: &[u8], key: Option<String>) -> Result<Self> {
        let tilejson: TileJson = serde_json::from_slice(body)?;
        if tilejson.tiles.is_empty() {
            return Err(Error::Config("TileJSON has no tiles".into()));
        }
        Self::new(tilejson.tiles, key)
    }

    /// Inline templates when `source` has any, otherwise the `tiles` of the
    /// TileJSON document at `source.tilejson_url`, fetched once.
    pub async fn resolve(source: &SourceConfig) -> Result<Self> {
        if !source.tile_templates.is_empty() {
            return Self::from_config(source);
        }
        let Some(url) = source.tilejson_url.as_deref().filter(|u| !u.is_empty()) else {
            return Err(Error::Config("no tile templates and no TileJSON URL".into()));
        };
        let url = url.replace("{key}", source.key.as_deref().unwrap_or(""));

        log::debug!("fetching TileJSON from {}", url);
        let response = HTTP_CLIENT.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Http {
                status: response.status().as_u16(),
                url,
            });
        }
        let body = response.bytes().await?;
        let resolved = Self::from_tilejson(&body, source.key.clone())?;
        log::info!("TileJSON {} lists {} tile templates", url, resolved.templates.len());
        Ok(resolved)
    }

    pub fn templates(&self) -> &[String] {
        &self.templates
    }
}

impl TileSource for UrlTemplateSource {
    fn url(&self, coord: TileCoord) -> String {
        // Only the first template is used; the rest are mirrors.
        let template = &self.templates[0];
        template
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
            .replace("{key}", self.key.as_deref().unwrap_or(""))
            .replace("{ratio}", "1")
            .replace("{r}", "")
    }
}

/// The part of a TileJSON document needed to build tile URLs
#[derive(Debug, Deserialize)]
struct TileJson {
    #[serde(default)]
    tiles: Vec<String>,
}
