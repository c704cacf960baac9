//! Hierarchical scripture content cache.
//!
//! Cache-first reads over the book/chapter hierarchy, with a single
//! persisted record behind the key-value store. Chapter text is treated
//! as canon: once cached it never expires, only an explicit [`reset`]
//! removes it.
//!
//! The "read now, own the text forever" behavior comes from
//! [`get_chapter`]: a cache miss fetches one chapter and opportunistically
//! writes it back together with the unit's metadata, so no explicit
//! download is required to accumulate offline content.
//!
//! Concurrency: operations are read-merge-write sequences with no locking;
//! two concurrent writers to the record are last-writer-wins. Callers gate
//! concurrent downloads at the UI layer.
//!
//! [`get_chapter`]: ScriptureCache::get_chapter
//! [`reset`]: ScriptureCache::reset

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use crate::api::ContentProvider;
use crate::error::CacheError;
use crate::models::{BookUnit, Collection, ScriptureRecord};
use crate::storage::{load_record, save_record, KeyValueStore};

/// Storage key for the scripture record.
pub const SCRIPTURE_CACHE_KEY: &str = "scripture_content";

/// Offline-first cache over the scripture hierarchy.
#[derive(Clone)]
pub struct ScriptureCache {
    store: Arc<dyn KeyValueStore>,
    provider: Arc<dyn ContentProvider>,
}

impl ScriptureCache {
    pub fn new(store: Arc<dyn KeyValueStore>, provider: Arc<dyn ContentProvider>) -> Self {
        Self { store, provider }
    }

    async fn load(&self) -> Result<ScriptureRecord, CacheError> {
        Ok(load_record(&*self.store, SCRIPTURE_CACHE_KEY)
            .await?
            .unwrap_or_else(ScriptureRecord::empty))
    }

    async fn save(&self, record: &mut ScriptureRecord) -> Result<(), CacheError> {
        record.recount();
        record.metadata.touch();
        save_record(&*self.store, SCRIPTURE_CACHE_KEY, record).await?;
        Ok(())
    }

    /// Cached collections, fetched and written through on first access.
    /// No expiry check - collection lists are canonical and stable.
    pub async fn get_collections(&self) -> Result<Vec<Collection>, CacheError> {
        let mut record = self.load().await?;
        if !record.collections.is_empty() {
            return Ok(record.collections);
        }

        let collections = self.provider.list_collections().await?;
        record.collections = collections.clone();
        self.save(&mut record).await?;
        Ok(collections)
    }

    /// Books in one collection, cache-first. A remote fetch persists the
    /// unit metadata (not the full hierarchy) so a later
    /// [`BookDownloader::download_unit`] can resolve the unit offline.
    ///
    /// [`BookDownloader::download_unit`]: crate::download::BookDownloader::download_unit
    pub async fn get_units_for_collection(
        &self,
        collection_id: i64,
    ) -> Result<Vec<BookUnit>, CacheError> {
        let mut record = self.load().await?;
        let cached = record.units_in_collection(collection_id);
        if !cached.is_empty() {
            return Ok(cached);
        }

        let units = self.provider.list_units(collection_id).await?;
        for unit in &units {
            record.register_unit(unit);
        }
        self.save(&mut record).await?;
        Ok(units)
    }

    /// Chapter text, cache-first. A miss fetches from the remote provider
    /// and opportunistically writes the single chapter back, merging into
    /// any existing partial unit.
    pub async fn get_chapter(&self, unit_id: i64, chapter: u32) -> Result<String, CacheError> {
        let mut record = self.load().await?;
        if let Some(text) = record.chapter_text(unit_id, chapter) {
            return Ok(text.to_string());
        }

        let payload = self.provider.get_chapter(unit_id, chapter).await?;
        debug!(unit_id, chapter, "caching chapter after read-through");
        record.insert_chapter(&payload.unit, payload.number, payload.text.clone());
        self.save(&mut record).await?;
        Ok(payload.text)
    }

    /// Whether every chapter of the unit is available offline.
    pub async fn is_unit_fully_downloaded(&self, unit_id: i64) -> Result<bool, CacheError> {
        Ok(self.load().await?.is_unit_fully_downloaded(unit_id))
    }

    /// Chapter numbers available offline for one unit, for partial-download
    /// badging.
    pub async fn downloaded_chapters(&self, unit_id: i64) -> Result<BTreeSet<u32>, CacheError> {
        Ok(self.load().await?.downloaded_chapters(unit_id))
    }

    /// Resolve cached unit metadata, `None` when the unit was never seen.
    pub(crate) async fn unit(&self, unit_id: i64) -> Result<Option<BookUnit>, CacheError> {
        Ok(self.load().await?.unit(unit_id).cloned())
    }

    /// Merge a batch of downloaded chapters into the record in one write,
    /// registering the unit if absent and unioning the chapter map into any
    /// opportunistically cached content.
    pub(crate) async fn merge_unit(
        &self,
        unit: &BookUnit,
        chapters: BTreeMap<u32, String>,
    ) -> Result<(), CacheError> {
        let mut record = self.load().await?;
        record.register_unit(unit);
        for (number, text) in chapters {
            record.insert_chapter(unit, number, text);
        }
        self.save(&mut record).await?;
        Ok(())
    }

    /// Wipe all cached scripture content. The only path by which chapter
    /// text disappears.
    pub async fn reset(&self) -> Result<(), CacheError> {
        self.store.remove(SCRIPTURE_CACHE_KEY).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
