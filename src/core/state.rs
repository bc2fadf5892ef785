//! Lifecycle state shared between cache records and their in-flight fetches.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// What a tile record currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadState {
    /// Requested, payload not yet parsed
    Preparing,
    /// Objects extracted and a render collection allocated
    Loaded,
    /// The payload has no model layer; nothing will ever be placed here
    NotSupported,
    /// Fetch or parse failed; terminal until the record is evicted
    Error,
}

/// Where a record's single download stands.
///
/// Transitions are `Downloading -> Loaded` or `Downloading -> Disposed`, once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DownloadState {
    Downloading,
    Loaded,
    Disposed,
}

impl DownloadState {
    fn to_u8(self) -> u8 {
        match self {
            Self::Downloading => 0,
            Self::Loaded => 1,
            Self::Disposed => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Downloading,
            1 => Self::Loaded,
            _ => Self::Disposed,
        }
    }
}

/// Download state shared by a cache record and the task fetching it.
///
/// Eviction flips it to `Disposed` from the frame loop while the task may be
/// suspended on I/O; the task and the completion drain both read it before
/// doing anything with their result. Terminal states are sticky.
#[derive(Debug, Clone)]
pub struct DownloadFlag(Arc<AtomicU8>);

impl DownloadFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(DownloadState::Downloading.to_u8())))
    }

    pub fn get(&self) -> DownloadState {
        DownloadState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn is_disposed(&self) -> bool {
        self.get() == DownloadState::Disposed
    }

    /// Moves `Downloading -> Loaded`. Returns false if the flag was already terminal.
    pub fn finish(&self) -> bool {
        self.transition(DownloadState::Loaded)
    }

    /// Moves `Downloading -> Disposed`. Returns false if the flag was already terminal.
    pub fn dispose(&self) -> bool {
        self.transition(DownloadState::Disposed)
    }

    fn transition(&self, to: DownloadState) -> bool {
        self.0
            .compare_exchange(
                DownloadState::Downloading.to_u8(),
                to.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

impl Default for DownloadFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters kept by both caches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Fetches spawned
    pub requests: u64,
    /// Completions written into a live record
    pub applied: u64,
    /// Completions dropped because their record was disposed or replaced
    pub discarded: u64,
    pub evictions: u64,
}
