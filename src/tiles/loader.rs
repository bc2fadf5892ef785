use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::time::Duration;

use crate::core::geo::TileCoord;
use crate::models::mesh::{MeshTemplate, Texture};
use crate::models::obj::parse_obj;
use crate::{Error, Result};

/// Shared async HTTP client for tile, mesh and texture downloads. Building
/// the client once avoids TLS and connection pool setup per request.
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent("maplet-models/0.1.0")
        .timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(30))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(16)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

/// Source of raw tile payloads and decoded model assets.
///
/// Fetches can't be cancelled: callers that lose interest simply ignore the
/// result when it arrives.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Raw tile payload for `coord`, downloaded from `url`.
    async fn fetch_tile(&self, coord: TileCoord, url: &str) -> Result<Vec<u8>>;

    /// Mesh as authored; axis conversion is the model cache's job.
    async fn fetch_model(&self, url: &str) -> Result<MeshTemplate>;

    async fn fetch_texture(&self, url: &str) -> Result<Texture>;
}

/// [`AssetFetcher`] over HTTP. Meshes are read as Wavefront OBJ and
/// textures decoded with `image`.
///
/// `reqwest` needs a Tokio reactor, so pair this with
/// [`TokioSpawner`](crate::runtime::TokioSpawner).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    request_timeout: Duration,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = HTTP_CLIENT
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Http {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch_tile(&self, coord: TileCoord, url: &str) -> Result<Vec<u8>> {
        log::debug!("fetch tile {} from {}", coord, url);
        let data = self.get_bytes(url).await?;
        log::info!("downloaded tile {} ({} bytes)", coord, data.len());
        Ok(data)
    }

    async fn fetch_model(&self, url: &str) -> Result<MeshTemplate> {
        let data = self.get_bytes(url).await?;
        let text = String::from_utf8(data)
            .map_err(|e| Error::MeshParse(format!("{url}: {e}")))?;
        parse_obj(&text, model_file_name(url))
    }

    async fn fetch_texture(&self, url: &str) -> Result<Texture> {
        let data = self.get_bytes(url).await?;
        let image = image::load_from_memory(&data)?.to_rgba8();
        Ok(Texture {
            width: image.width(),
            height: image.height(),
            pixels: image.into_raw(),
        })
    }
}

/// Last path segment without query string, used to name the template root.
fn model_file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(path)
}
