use crossbeam_channel::{unbounded, Receiver, Sender};
use lru::LruCache;
use std::num::NonZeroUsize;

use crate::core::config::{ModelKeyStrategy, ModelPolicy};
use crate::core::constants::DEFAULT_MODEL_CACHE_SIZE;
use crate::core::state::{CacheStats, DownloadFlag, DownloadState};
use crate::models::mesh::{MeshTemplate, Texture};
use crate::prelude::Arc;
use crate::runtime::AsyncSpawner;
use crate::tiles::loader::AssetFetcher;
use crate::tiles::parse::ObjectDescriptor;
use crate::Result;

/// How a model's texture step resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureState {
    /// Still downloading
    Pending,
    Bound,
    /// Texture failed; meshes carry an edge outline instead
    Fallback,
    /// Texture failed and the fallback is disabled
    Plain,
}

#[derive(Debug)]
pub struct ModelRecord {
    download: DownloadFlag,
    ticket: u64,
    template: Option<Arc<MeshTemplate>>,
    error: Option<String>,
    texture: TextureState,
}

impl ModelRecord {
    fn new(ticket: u64) -> Self {
        Self {
            download: DownloadFlag::new(),
            ticket,
            template: None,
            error: None,
            texture: TextureState::Pending,
        }
    }

    pub fn download_state(&self) -> DownloadState {
        self.download.get()
    }

    pub fn template(&self) -> Option<&Arc<MeshTemplate>> {
        self.template.as_ref()
    }

    /// Why the mesh failed, if it did
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn texture_state(&self) -> TextureState {
        self.texture
    }

    /// Loaded with a usable template
    pub fn is_ready(&self) -> bool {
        self.download_state() == DownloadState::Loaded && self.template.is_some()
    }
}

#[derive(Debug)]
enum ModelOutcome {
    Ready {
        template: Arc<MeshTemplate>,
        texture: TextureState,
    },
    Failed(String),
}

#[derive(Debug)]
struct ModelCompletion {
    key: String,
    ticket: u64,
    outcome: ModelOutcome,
}

/// Bounded LRU store of mesh templates shared by every tile that places them.
///
/// A model is only reported ready once its texture step has resolved, so
/// instances are never composed untextured and then left that way.
pub struct ModelCache {
    records: LruCache<String, ModelRecord>,
    fetcher: Arc<dyn AssetFetcher>,
    spawner: Arc<dyn AsyncSpawner>,
    policy: ModelPolicy,
    root_url: String,
    completion_tx: Sender<ModelCompletion>,
    completion_rx: Receiver<ModelCompletion>,
    next_ticket: u64,
    stats: CacheStats,
}

impl ModelCache {
    pub fn new(capacity: usize, fetcher: Arc<dyn AssetFetcher>, spawner: Arc<dyn AsyncSpawner>) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_MODEL_CACHE_SIZE))
            .unwrap_or(NonZeroUsize::MIN);
        let (completion_tx, completion_rx) = unbounded();
        Self {
            records: LruCache::new(capacity),
            fetcher,
            spawner,
            policy: ModelPolicy::default(),
            root_url: String::new(),
            completion_tx,
            completion_rx,
            next_ticket: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn with_policy(mut self, policy: ModelPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Prefix for relative model and texture URLs
    pub fn with_root_url(mut self, root_url: impl Into<String>) -> Self {
        self.root_url = root_url.into();
        self
    }

    pub fn policy(&self) -> &ModelPolicy {
        &self.policy
    }

    /// Cache key of the model `descriptor` refers to.
    pub fn key_for(&self, descriptor: &ObjectDescriptor) -> String {
        match self.policy.key_strategy {
            ModelKeyStrategy::ModelUrl if !descriptor.model_url.is_empty() => descriptor.model_url.clone(),
            _ => descriptor.model_name.clone(),
        }
    }

    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}{}", self.root_url, url)
        }
    }

    /// Starts loading the model `descriptor` refers to unless its key is
    /// already cached in any state. Readiness shows up later through
    /// [`ModelCache::is_ready`].
    pub fn ensure_model(&mut self, descriptor: &ObjectDescriptor) {
        let key = self.key_for(descriptor);
        if self.records.get(&key).is_some() {
            return;
        }

        self.next_ticket += 1;
        let record = ModelRecord::new(self.next_ticket);
        let flag = record.download.clone();
        let ticket = record.ticket;

        if let Some((evicted_key, evicted)) = self.records.push(key.clone(), record) {
            self.stats.evictions += 1;
            if evicted.download.dispose() {
                log::debug!("evicted model {} while downloading", evicted_key);
            }
        }

        let model_url = self.resolve_url(&descriptor.model_url);
        let texture_url = (!descriptor.texture_url.is_empty()).then(|| self.resolve_url(&descriptor.texture_url));
        let fetcher = Arc::clone(&self.fetcher);
        let policy = self.policy.clone();
        let tx = self.completion_tx.clone();

        self.stats.requests += 1;
        log::debug!("requesting model {} from {}", key, model_url);

        self.spawner.spawn_boxed(Box::pin(async move {
            let outcome = match fetcher.fetch_model(&model_url).await {
                Ok(mut template) => {
                    if flag.is_disposed() {
                        log::debug!("model {} disposed during mesh download", key);
                        return;
                    }
                    if policy.y_up_source {
                        template.convert_y_up_to_z_up();
                    }
                    if policy.reverse_winding {
                        template.reverse_winding();
                    }

                    let texture = match &texture_url {
                        Some(url) => Some(fetcher.fetch_texture(url).await),
                        None => None,
                    };
                    if flag.is_disposed() {
                        log::debug!("model {} disposed during texture download", key);
                        return;
                    }

                    let texture = resolve_texture(&mut template, texture, &policy, &key);
                    if policy.seat_on_ground {
                        template.seat_on_ground();
                    }
                    ModelOutcome::Ready {
                        template: Arc::new(template),
                        texture,
                    }
                }
                Err(e) => ModelOutcome::Failed(e.to_string()),
            };

            if flag.is_disposed() {
                return;
            }
            let _ = tx.send(ModelCompletion { key, ticket, outcome });
        }));
    }

    /// Applies every completion received so far. Returns how many were written.
    pub fn process_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completion_rx.try_recv() {
            if self.apply(completion) {
                applied += 1;
            }
        }
        applied
    }

    fn apply(&mut self, completion: ModelCompletion) -> bool {
        let record = match self.records.peek_mut(&completion.key) {
            Some(record) if record.ticket == completion.ticket && record.download.finish() => record,
            _ => {
                log::debug!("dropping stale completion for model {}", completion.key);
                self.stats.discarded += 1;
                return false;
            }
        };

        match completion.outcome {
            ModelOutcome::Ready { template, texture } => {
                log::debug!("model {} ready ({:?})", completion.key, texture);
                record.template = Some(template);
                record.texture = texture;
            }
            ModelOutcome::Failed(reason) => {
                log::warn!("model {} failed: {}", completion.key, reason);
                record.error = Some(reason);
                record.texture = TextureState::Plain;
            }
        }
        self.stats.applied += 1;
        true
    }

    #[cfg(test)]
    pub(crate) fn insert_ready(&mut self, key: &str, template: MeshTemplate) {
        let mut record = ModelRecord::new(0);
        record.download.finish();
        record.template = Some(Arc::new(template));
        record.texture = TextureState::Bound;
        self.records.put(key.to_string(), record);
    }

    /// Record for `key` without touching the LRU order
    pub fn get(&self, key: &str) -> Option<&ModelRecord> {
        self.records.peek(key)
    }

    /// Template for `descriptor` if its model is ready to be placed.
    pub fn ready_template(&self, descriptor: &ObjectDescriptor) -> Option<Arc<MeshTemplate>> {
        self.get(&self.key_for(descriptor))
            .filter(|r| r.is_ready())
            .and_then(|r| r.template.clone())
    }

    pub fn is_ready(&self, key: &str) -> bool {
        self.get(key).map_or(false, ModelRecord::is_ready)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.records.cap().get()
    }

    /// Drops every record; in-flight downloads are disposed. Instances
    /// already placed keep their own copies.
    pub fn clear(&mut self) {
        for (_, record) in self.records.iter() {
            record.download.dispose();
        }
        self.records.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

/// Binds the fetched texture, or applies the fallback when it failed or the
/// model has no texture URL (`None`).
fn resolve_texture(
    template: &mut MeshTemplate,
    texture: Option<Result<Texture>>,
    policy: &ModelPolicy,
    key: &str,
) -> TextureState {
    match texture {
        Some(Ok(texture)) => {
            template.bind_texture(Arc::new(texture));
            TextureState::Bound
        }
        failed => {
            match failed {
                Some(Err(e)) => log::warn!("texture for model {} unavailable: {}", key, e),
                _ => log::debug!("model {} has no texture URL", key),
            }
            if policy.texture_fallback {
                template.add_outline_fallback();
                TextureState::Fallback
            } else {
                TextureState::Plain
            }
        }
    }
}
