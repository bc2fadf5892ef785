use crossbeam_channel::{unbounded, Receiver, Sender};
use lru::LruCache;
use std::num::NonZeroUsize;

use crate::core::constants::{DEFAULT_SOURCE_LAYER, DEFAULT_TILE_CACHE_SIZE};
use crate::core::geo::TileCoord;
use crate::core::state::{CacheStats, DownloadFlag, DownloadState, LoadState};
use crate::prelude::{Arc, HashSet};
use crate::runtime::AsyncSpawner;
use crate::scene::collection::RenderCollection;
use crate::tiles::loader::AssetFetcher;
use crate::tiles::parse::{extract_objects, ObjectDescriptor, TileParser};
use crate::tiles::source::TileSource;

/// Cached state of one tile address
#[derive(Debug)]
pub struct TileRecord {
    address: TileCoord,
    load_state: LoadState,
    download: DownloadFlag,
    ticket: u64,
    objects: Vec<ObjectDescriptor>,
    render_collection: Option<RenderCollection>,
}

impl TileRecord {
    fn new(address: TileCoord, ticket: u64) -> Self {
        Self {
            address,
            load_state: LoadState::Preparing,
            download: DownloadFlag::new(),
            ticket,
            objects: Vec::new(),
            render_collection: None,
        }
    }

    pub fn address(&self) -> TileCoord {
        self.address
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn download_state(&self) -> DownloadState {
        self.download.get()
    }

    pub fn objects(&self) -> &[ObjectDescriptor] {
        &self.objects
    }

    /// Present exactly when the tile is `Loaded`
    pub fn render_collection(&self) -> Option<&RenderCollection> {
        self.render_collection.as_ref()
    }

    pub fn render_collection_mut(&mut self) -> Option<&mut RenderCollection> {
        self.render_collection.as_mut()
    }

    #[cfg(test)]
    pub(crate) fn loaded(address: TileCoord, objects: Vec<ObjectDescriptor>) -> Self {
        let record = Self {
            load_state: LoadState::Loaded,
            objects,
            render_collection: Some(RenderCollection::new()),
            ..Self::new(address, 0)
        };
        record.download.finish();
        record
    }

    /// Objects alongside the collection they are placed into.
    pub fn split_mut(&mut self) -> Option<(&[ObjectDescriptor], &mut RenderCollection)> {
        let collection = self.render_collection.as_mut()?;
        Some((&self.objects, collection))
    }
}

#[derive(Debug)]
enum TileOutcome {
    Objects(Vec<ObjectDescriptor>),
    NotSupported,
    Failed(String),
}

#[derive(Debug)]
struct TileCompletion {
    address: TileCoord,
    ticket: u64,
    outcome: TileOutcome,
}

/// Bounded LRU store of tile records that owns fetch deduplication.
///
/// Downloads run on the spawner and report back over a channel; only
/// [`TileCache::process_completions`] (also run at the start of
/// [`TileCache::ensure`]) writes their results into records.
pub struct TileCache {
    records: LruCache<TileCoord, TileRecord>,
    fetcher: Arc<dyn AssetFetcher>,
    parser: Arc<dyn TileParser>,
    source: Arc<dyn TileSource>,
    spawner: Arc<dyn AsyncSpawner>,
    completion_tx: Sender<TileCompletion>,
    completion_rx: Receiver<TileCompletion>,
    next_ticket: u64,
    source_layer: String,
    model_type_filter: Option<String>,
    stats: CacheStats,
}

impl TileCache {
    pub fn new(
        capacity: usize,
        fetcher: Arc<dyn AssetFetcher>,
        parser: Arc<dyn TileParser>,
        source: Arc<dyn TileSource>,
        spawner: Arc<dyn AsyncSpawner>,
    ) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_TILE_CACHE_SIZE))
            .unwrap_or(NonZeroUsize::MIN);
        let (completion_tx, completion_rx) = unbounded();
        Self {
            records: LruCache::new(capacity),
            fetcher,
            parser,
            source,
            spawner,
            completion_tx,
            completion_rx,
            next_ticket: 0,
            source_layer: DEFAULT_SOURCE_LAYER.to_string(),
            model_type_filter: None,
            stats: CacheStats::default(),
        }
    }

    /// Vector tile layer the objects are read from
    pub fn with_source_layer(mut self, layer: impl Into<String>) -> Self {
        self.source_layer = layer.into();
        self
    }

    pub fn with_model_type_filter(mut self, model_type: Option<String>) -> Self {
        self.model_type_filter = model_type;
        self
    }

    /// Requests every address not yet cached and returns the records of
    /// those that are fully loaded, in request order.
    ///
    /// Addresses already present in any state are only promoted in the LRU
    /// order; failed and unsupported tiles are not retried. Addresses outside
    /// the tile grid are ignored.
    pub fn ensure(&mut self, addresses: &[TileCoord]) -> Vec<&TileRecord> {
        self.process_completions();

        for &address in addresses {
            if !address.is_valid() {
                log::warn!("ignoring out-of-range tile address {}", address);
                continue;
            }
            if self.records.get(&address).is_none() {
                self.request(address);
            }
        }

        let mut seen = HashSet::default();
        addresses
            .iter()
            .filter(|a| seen.insert(**a))
            .filter_map(|a| self.records.peek(a))
            .filter(|r| r.load_state == LoadState::Loaded)
            .collect()
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

    fn request(&mut self, address: TileCoord) {
        self.next_ticket += 1;
        let record = TileRecord::new(address, self.next_ticket);
        let flag = record.download.clone();
        let ticket = record.ticket;

        if let Some((evicted_address, evicted)) = self.records.push(address, record) {
            self.stats.evictions += 1;
            if evicted.download.dispose() {
                log::debug!("evicted tile {} while downloading", evicted_address);
            }
        }

        let url = self.source.url(address);
        let fetcher = Arc::clone(&self.fetcher);
        let parser = Arc::clone(&self.parser);
        let tx = self.completion_tx.clone();
        let layer = self.source_layer.clone();
        let filter = self.model_type_filter.clone();

        self.stats.requests += 1;
        log::debug!("requesting tile {} from {}", address, url);

        self.spawner.spawn_boxed(Box::pin(async move {
            let outcome = match fetcher.fetch_tile(address, &url).await {
                Ok(bytes) => {
                    if flag.is_disposed() {
                        log::debug!("tile {} disposed during download", address);
                        return;
                    }
                    match parser.parse(&bytes) {
                        Ok(parsed) => match extract_objects(&parsed, &layer, filter.as_deref()) {
                            Some(objects) => TileOutcome::Objects(objects),
                            None => TileOutcome::NotSupported,
                        },
                        Err(e) => TileOutcome::Failed(e.to_string()),
                    }
                }
                Err(e) => TileOutcome::Failed(e.to_string()),
            };

            if flag.is_disposed() {
                return;
            }
            // The cache may be gone already; nothing to deliver to then.
            let _ = tx.send(TileCompletion {
                address,
                ticket,
                outcome,
            });
        }));
    }

    fn apply(&mut self, completion: TileCompletion) -> bool {
        let record = match self.records.peek_mut(&completion.address) {
            Some(record) if record.ticket == completion.ticket => record,
            _ => {
                log::debug!("dropping stale completion for tile {}", completion.address);
                self.stats.discarded += 1;
                return false;
            }
        };
        if !record.download.finish() {
            log::debug!("dropping completion for disposed tile {}", completion.address);
            self.stats.discarded += 1;
            return false;
        }

        match completion.outcome {
            TileOutcome::Objects(objects) => {
                log::debug!("tile {} loaded with {} objects", record.address, objects.len());
                record.objects = objects;
                record.render_collection = Some(RenderCollection::new());
                record.load_state = LoadState::Loaded;
            }
            TileOutcome::NotSupported => {
                log::debug!("tile {} has no model layer", record.address);
                record.load_state = LoadState::NotSupported;
            }
            TileOutcome::Failed(reason) => {
                log::warn!("tile {} failed: {}", record.address, reason);
                record.load_state = LoadState::Error;
            }
        }
        self.stats.applied += 1;
        true
    }

    /// Looks up a record and marks it recently used.
    pub fn get(&mut self, address: &TileCoord) -> Option<&TileRecord> {
        self.records.get(address)
    }

    /// Mutable access without touching the LRU order.
    pub fn get_mut(&mut self, address: &TileCoord) -> Option<&mut TileRecord> {
        self.records.peek_mut(address)
    }

    pub fn peek(&self, address: &TileCoord) -> Option<&TileRecord> {
        self.records.peek(address)
    }

    pub fn contains(&self, address: &TileCoord) -> bool {
        self.records.contains(address)
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

    /// Drops every record; in-flight downloads are disposed.
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
