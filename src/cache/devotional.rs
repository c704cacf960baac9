//! Devotional entry cache and revalidation policy.
//!
//! Entries are addressed by `(series, day number)` through a secondary
//! index and revalidated against the remote provider when their cached
//! copy is older than [`ENTRY_STALE_MINUTES`]. The decision procedure per
//! read:
//!
//! - not cached: fetch; on success cache and return, on failure propagate
//! - cached and fresh (no force): return from cache, zero network calls
//! - cached and stale, or forced: fetch; on success overwrite; on a
//!   transient failure serve the stale copy, flagged for the UI; on
//!   "not found" invalidate the entry and propagate - deleted content
//!   must not linger
//!
//! A future-dated entry is withheld (`NotYetAvailable`) whichever path
//! resolved it, so a date correction on the server cannot leak through the
//! offline path. The whole record is discarded after [`CACHE_EXPIRY_DAYS`]
//! to bound growth of entries nobody revisits.

use std::sync::Arc;

use chrono::{Local, Utc};
use tracing::{debug, warn};

use crate::api::ContentProvider;
use crate::error::CacheError;
use crate::models::{
    DevotionalRecord, EntryPatch, EntryRecord, EntrySeries, LastViewed,
};
use crate::prefs::PreferenceStore;
use crate::storage::{load_record, save_record, KeyValueStore};

/// Storage key for the devotional record.
pub const DEVOTIONAL_CACHE_KEY: &str = "devotional_entries";

/// Consider a cached entry stale after 1 hour.
/// Balances freshness of like counts and corrections against unnecessary
/// network round-trips for slowly-changing content.
pub const ENTRY_STALE_MINUTES: i64 = 60;

/// Discard the whole record after 7 days untouched.
/// Coarser than the per-read staleness check; bounds unbounded growth of
/// entries nobody has revisited recently.
pub const CACHE_EXPIRY_DAYS: i64 = 7;

/// A resolved entry plus where it came from.
///
/// `from_cache` is distinct from freshness: a fresh cache hit and a stale
/// fallback both come from cache, but only the latter sets `stale`, which
/// is what the UI keys its "showing cached content" indicator off.
#[derive(Debug, Clone)]
pub struct EntryLookup {
    pub entry: EntryRecord,
    pub from_cache: bool,
    pub stale: bool,
}

/// Offline-first cache over devotional entries.
#[derive(Clone)]
pub struct DevotionalCache {
    store: Arc<dyn KeyValueStore>,
    provider: Arc<dyn ContentProvider>,
    prefs: PreferenceStore,
}

impl DevotionalCache {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        provider: Arc<dyn ContentProvider>,
        prefs: PreferenceStore,
    ) -> Self {
        Self {
            store,
            provider,
            prefs,
        }
    }

    /// Load the record, discarding and recreating it empty when the
    /// whole-record expiry window has passed. The emptied record is
    /// persisted immediately so expiry survives a crash before the next
    /// write.
    async fn load(&self) -> Result<DevotionalRecord, CacheError> {
        match load_record::<DevotionalRecord>(&*self.store, DEVOTIONAL_CACHE_KEY).await? {
            Some(record) if record.metadata.age_days() <= CACHE_EXPIRY_DAYS => Ok(record),
            Some(record) => {
                debug!(
                    age_days = record.metadata.age_days(),
                    "devotional cache expired, discarding"
                );
                let mut empty = DevotionalRecord::empty();
                self.save(&mut empty).await?;
                Ok(empty)
            }
            None => Ok(DevotionalRecord::empty()),
        }
    }

    async fn save(&self, record: &mut DevotionalRecord) -> Result<(), CacheError> {
        record.recount();
        record.metadata.touch();
        save_record(&*self.store, DEVOTIONAL_CACHE_KEY, record).await?;
        Ok(())
    }

    /// Withhold entries scheduled after today's local calendar date.
    /// A pure date comparison, not a timestamp one: the entry becomes
    /// readable at local midnight.
    fn guard_future_date(entry: &EntryRecord) -> Result<(), CacheError> {
        if let Some(date) = entry.scheduled_date() {
            let today = Local::now().date_naive();
            if date > today {
                return Err(CacheError::NotYetAvailable { date });
            }
        }
        Ok(())
    }

    /// Best-effort side effect; a history write failure never fails a read.
    async fn record_view(&self, entry: &EntryRecord) {
        let view = LastViewed {
            series_id: entry.series_id,
            day_number: entry.day_number,
            entry_id: entry.id,
            viewed_at: Utc::now(),
        };
        if let Err(err) = self.prefs.save_last_viewed(view).await {
            warn!(entry_id = entry.id, error = %err, "failed to record viewing history");
        }
    }

    /// Resolve one entry by `(series, day number)` under the revalidation
    /// policy. On success the preference store's last-viewed pointer and
    /// history are updated as a side effect.
    pub async fn get_entry(
        &self,
        series_id: i64,
        day_number: u32,
        force_refresh: bool,
    ) -> Result<EntryLookup, CacheError> {
        let mut record = self.load().await?;
        let cached = record.entry_for_day(series_id, day_number).cloned();

        let lookup = match cached {
            None => {
                let entry = self
                    .provider
                    .get_entry_by_day(series_id, day_number)
                    .await
                    .map_err(CacheError::from)?;
                record.insert_entry(entry.clone(), Utc::now());
                self.save(&mut record).await?;
                EntryLookup {
                    entry,
                    from_cache: false,
                    stale: false,
                }
            }
            Some(entry) => {
                let age = record.entry_age_minutes(entry.id, Utc::now());
                if !force_refresh && age <= ENTRY_STALE_MINUTES {
                    EntryLookup {
                        entry,
                        from_cache: true,
                        stale: false,
                    }
                } else {
                    let fetched = self.provider.get_entry_by_day(series_id, day_number).await;
                    self.revalidate(&mut record, entry, fetched).await?
                }
            }
        };

        Self::guard_future_date(&lookup.entry)?;
        self.record_view(&lookup.entry).await;
        Ok(lookup)
    }

    /// Settle a revalidation attempt for an already-cached entry: a fresh
    /// payload overwrites the cache, "not found" invalidates it, and any
    /// other failure serves the stale copy. Shared by the day-number and
    /// deep-link lookup paths so the policy lives in one place.
    async fn revalidate(
        &self,
        record: &mut DevotionalRecord,
        cached: EntryRecord,
        fetched: Result<EntryRecord, crate::api::ApiError>,
    ) -> Result<EntryLookup, CacheError> {
        match fetched {
            Ok(fresh) => {
                record.insert_entry(fresh.clone(), Utc::now());
                self.save(record).await?;
                Ok(EntryLookup {
                    entry: fresh,
                    from_cache: false,
                    stale: false,
                })
            }
            Err(err) if err.is_not_found() => {
                // Deleted server-side; the stale copy must not linger.
                debug!(entry_id = cached.id, "entry gone upstream, invalidating");
                record.remove_entry(cached.id);
                self.save(record).await?;
                Err(CacheError::NotFound)
            }
            Err(err) => {
                debug!(entry_id = cached.id, error = %err, "revalidation failed, serving stale cache");
                Ok(EntryLookup {
                    entry: cached,
                    from_cache: true,
                    stale: true,
                })
            }
        }
    }

    /// Resolve one entry by id - the notification deep-link path. Applies
    /// the same staleness, fallback, and future-date policy as
    /// [`get_entry`]; a fetched entry also gains its day-index slot.
    ///
    /// [`get_entry`]: DevotionalCache::get_entry
    pub async fn get_entry_by_id(
        &self,
        entry_id: i64,
        force_refresh: bool,
    ) -> Result<EntryLookup, CacheError> {
        let mut record = self.load().await?;
        let cached = record.entries_by_id.get(&entry_id).cloned();

        let lookup = match cached {
            None => {
                let entry = self
                    .provider
                    .get_entry_by_id(entry_id)
                    .await
                    .map_err(CacheError::from)?;
                record.insert_entry(entry.clone(), Utc::now());
                self.save(&mut record).await?;
                EntryLookup {
                    entry,
                    from_cache: false,
                    stale: false,
                }
            }
            Some(entry) => {
                let age = record.entry_age_minutes(entry.id, Utc::now());
                if !force_refresh && age <= ENTRY_STALE_MINUTES {
                    EntryLookup {
                        entry,
                        from_cache: true,
                        stale: false,
                    }
                } else {
                    let fetched = self.provider.get_entry_by_id(entry_id).await;
                    self.revalidate(&mut record, entry, fetched).await?
                }
            }
        };

        Self::guard_future_date(&lookup.entry)?;
        self.record_view(&lookup.entry).await;
        Ok(lookup)
    }

    /// Devotional series, cache-first with write-through, no expiry check.
    pub async fn list_series(&self) -> Result<Vec<EntrySeries>, CacheError> {
        let mut record = self.load().await?;
        if !record.series_by_id.is_empty() {
            return Ok(record.series_by_id.values().cloned().collect());
        }

        let series = self.provider.list_series().await?;
        for s in &series {
            record.series_by_id.insert(s.id, s.clone());
        }
        self.save(&mut record).await?;
        Ok(series)
    }

    /// Apply a confirmed field patch to a cached entry and persist.
    async fn patch_entry(
        &self,
        record: &mut DevotionalRecord,
        entry_id: i64,
        patch: EntryPatch,
    ) -> Result<EntryRecord, CacheError> {
        let entry = record
            .entries_by_id
            .get_mut(&entry_id)
            .ok_or(CacheError::NotFound)?;
        entry.apply(&patch);
        let updated = entry.clone();
        self.save(record).await?;
        Ok(updated)
    }

    /// Flip the like state remote-first; the confirmed state patches only
    /// the like fields of the cached entry, so a narrow mutation payload
    /// never clobbers the rest of the record.
    pub async fn toggle_like(&self, entry_id: i64) -> Result<EntryRecord, CacheError> {
        let mut record = self.load().await?;
        let entry = record
            .entries_by_id
            .get(&entry_id)
            .cloned()
            .ok_or(CacheError::NotFound)?;

        let state = self.provider.set_liked(entry_id, !entry.liked).await?;
        self.patch_entry(
            &mut record,
            entry_id,
            EntryPatch {
                liked: Some(state.liked),
                like_count: Some(state.like_count),
                ..EntryPatch::default()
            },
        )
        .await
    }

    /// Flip the bookmark state remote-first, patching only that field.
    pub async fn toggle_bookmark(&self, entry_id: i64) -> Result<EntryRecord, CacheError> {
        let mut record = self.load().await?;
        let entry = record
            .entries_by_id
            .get(&entry_id)
            .cloned()
            .ok_or(CacheError::NotFound)?;

        let bookmarked = self
            .provider
            .set_bookmarked(entry_id, !entry.bookmarked)
            .await?;
        self.patch_entry(
            &mut record,
            entry_id,
            EntryPatch {
                bookmarked: Some(bookmarked),
                ..EntryPatch::default()
            },
        )
        .await
    }

    /// Submit the user's written response remote-first, then mark the
    /// cached entry as responded.
    pub async fn submit_response(
        &self,
        entry_id: i64,
        text: &str,
    ) -> Result<EntryRecord, CacheError> {
        let mut record = self.load().await?;
        if !record.entries_by_id.contains_key(&entry_id) {
            return Err(CacheError::NotFound);
        }

        self.provider.submit_response(entry_id, text).await?;
        self.patch_entry(
            &mut record,
            entry_id,
            EntryPatch {
                has_submitted_response: Some(true),
                ..EntryPatch::default()
            },
        )
        .await
    }

    /// Mark an entry as read. Local-only; no network call.
    pub async fn mark_viewed(&self, entry_id: i64) -> Result<EntryRecord, CacheError> {
        let mut record = self.load().await?;
        self.patch_entry(
            &mut record,
            entry_id,
            EntryPatch {
                viewed: Some(true),
                ..EntryPatch::default()
            },
        )
        .await
    }

    /// Wipe all cached devotional content.
    pub async fn reset(&self) -> Result<(), CacheError> {
        self.store.remove(DEVOTIONAL_CACHE_KEY).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
