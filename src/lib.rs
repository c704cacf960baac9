//! Offline-first content cache for scripture and daily devotional reading.
//!
//! The crate backs two reading experiences: a scripture text reader whose
//! content is canonical and cached forever, and a daily-devotional reader
//! whose entries are revalidated against the network with a time-boxed
//! staleness policy and a stale-cache fallback when the network
//! misbehaves. Both sit on a thin key-value [`storage`] contract so the
//! embedding app (or a test) chooses where bytes land.
//!
//! Main pieces:
//!
//! - [`cache::ScriptureCache`]: book/chapter hierarchy, opportunistic
//!   write-back on read, no expiry
//! - [`cache::DevotionalCache`]: day-indexed entries, 1-hour staleness,
//!   7-day whole-cache expiry, optimistic like/bookmark/response patches
//! - [`download::BookDownloader`]: sequential whole-book download with
//!   per-chapter failure tolerance and reactive progress
//! - [`prefs::PreferenceStore`]: instant-apply settings with
//!   revert-on-persist-failure and a bounded viewing history
//! - [`api`]: the remote provider seam and its reqwest implementation

pub mod api;
pub mod cache;
pub mod config;
pub mod download;
pub mod error;
pub mod models;
pub mod prefs;
pub mod storage;

use std::sync::Arc;

use anyhow::Context;

pub use api::{ApiError, ContentProvider, HttpContentProvider};
pub use cache::{DevotionalCache, EntryLookup, ScriptureCache};
pub use config::Config;
pub use download::{BookDownloader, DownloadProgress, ProgressStore};
pub use error::CacheError;
pub use prefs::PreferenceStore;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};

/// Fully wired caches over the on-device file store and the HTTP content
/// provider. Convenience for embedding apps; tests construct the pieces
/// directly with in-memory fakes instead.
pub struct Services {
    pub scripture: ScriptureCache,
    pub devotional: DevotionalCache,
    pub prefs: PreferenceStore,
    pub downloader: BookDownloader,
}

impl Services {
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(
            FileStore::new(config.cache_dir()?).context("Failed to open cache directory")?,
        );
        let provider: Arc<dyn ContentProvider> = Arc::new(
            HttpContentProvider::new(config.api_base_url())
                .context("Failed to build HTTP client")?,
        );

        let prefs = PreferenceStore::new(store.clone())
            .await
            .context("Failed to open preference store")?;
        let scripture = ScriptureCache::new(store.clone(), provider.clone());
        let devotional = DevotionalCache::new(store.clone(), provider.clone(), prefs.clone());
        let downloader =
            BookDownloader::new(provider, scripture.clone(), ProgressStore::new());

        Ok(Self {
            scripture,
            devotional,
            prefs,
            downloader,
        })
    }
}
