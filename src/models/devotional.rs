//! Domain models for daily devotional content.
//!
//! Devotional entries are flat records addressed by `(series, day number)`
//! through a secondary index. Unlike scripture, entries change server-side
//! (like counts, corrections), so the cache tracks per-entry freshness and
//! the whole record carries an expiry window.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::CacheMetadata;

/// A devotional series (one top-level grouping of daily entries).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySeries {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One daily devotional reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub id: i64,
    pub series_id: i64,
    pub day_number: u32,
    /// Calendar date this entry is scheduled for, `YYYY-MM-DD`.
    /// Entries dated after today are withheld from readers.
    #[serde(default)]
    pub date: Option<String>,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub liked: bool,
    #[serde(default)]
    pub bookmarked: bool,
    #[serde(default)]
    pub viewed: bool,
    #[serde(default)]
    pub has_submitted_response: bool,
}

impl EntryRecord {
    /// Parse the scheduled date, if present and well-formed.
    pub fn scheduled_date(&self) -> Option<NaiveDate> {
        self.date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }
}

/// Explicit field-level patch for a cached entry.
///
/// Mutation endpoints return payloads narrower than the full entry; patches
/// list exactly the fields a response may update so an unexpectedly shaped
/// payload can never clobber or widen the persisted record.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub like_count: Option<i64>,
    pub liked: Option<bool>,
    pub bookmarked: Option<bool>,
    pub viewed: Option<bool>,
    pub has_submitted_response: Option<bool>,
}

impl EntryRecord {
    pub fn apply(&mut self, patch: &EntryPatch) {
        if let Some(like_count) = patch.like_count {
            self.like_count = like_count;
        }
        if let Some(liked) = patch.liked {
            self.liked = liked;
        }
        if let Some(bookmarked) = patch.bookmarked {
            self.bookmarked = bookmarked;
        }
        if let Some(viewed) = patch.viewed {
            self.viewed = viewed;
        }
        if let Some(submitted) = patch.has_submitted_response {
            self.has_submitted_response = submitted;
        }
    }
}

/// Confirmed like state returned by the like mutation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeState {
    pub liked: bool,
    pub like_count: i64,
}

/// The persisted devotional cache record.
///
/// Invariant: every value in `day_index` has a matching key in
/// `entries_by_id`. The inverse is not required - an entry may be cached by
/// id only (e.g. a notification deep-link) before its day slot is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevotionalRecord {
    pub metadata: CacheMetadata,
    pub series_by_id: BTreeMap<i64, EntrySeries>,
    pub entries_by_id: BTreeMap<i64, EntryRecord>,
    /// `"<series id>:<day number>"` -> entry id.
    pub day_index: BTreeMap<String, i64>,
    /// Per-entry fetch timestamps driving the staleness check, independent
    /// of the whole-record `metadata.last_updated`.
    #[serde(default)]
    pub fetched_at: BTreeMap<i64, DateTime<Utc>>,
}

impl DevotionalRecord {
    pub fn empty() -> Self {
        Self {
            metadata: CacheMetadata::new(),
            series_by_id: BTreeMap::new(),
            entries_by_id: BTreeMap::new(),
            day_index: BTreeMap::new(),
            fetched_at: BTreeMap::new(),
        }
    }

    pub fn day_key(series_id: i64, day_number: u32) -> String {
        format!("{}:{}", series_id, day_number)
    }

    pub fn entry_for_day(&self, series_id: i64, day_number: u32) -> Option<&EntryRecord> {
        self.day_index
            .get(&Self::day_key(series_id, day_number))
            .and_then(|id| self.entries_by_id.get(id))
    }

    /// Insert or overwrite an entry, indexing its day slot and stamping its
    /// fetch time.
    pub fn insert_entry(&mut self, entry: EntryRecord, fetched_at: DateTime<Utc>) {
        self.day_index
            .insert(Self::day_key(entry.series_id, entry.day_number), entry.id);
        self.fetched_at.insert(entry.id, fetched_at);
        self.entries_by_id.insert(entry.id, entry);
    }

    /// Drop an entry from every map it appears in.
    pub fn remove_entry(&mut self, entry_id: i64) {
        self.entries_by_id.remove(&entry_id);
        self.fetched_at.remove(&entry_id);
        self.day_index.retain(|_, id| *id != entry_id);
    }

    /// Minutes since this entry was last fetched from the remote provider.
    /// Entries with no recorded fetch time count as infinitely old.
    pub fn entry_age_minutes(&self, entry_id: i64, now: DateTime<Utc>) -> i64 {
        match self.fetched_at.get(&entry_id) {
            Some(fetched) => (now - *fetched).num_minutes(),
            None => i64::MAX,
        }
    }

    pub fn recount(&mut self) {
        self.metadata.counts.insert("series".into(), self.series_by_id.len());
        self.metadata.counts.insert("entries".into(), self.entries_by_id.len());
    }
}

// ============================================================================
// Tests
// ============================================================================
