//! Data models for cached content and user state.
//!
//! This module contains the record types persisted through the key-value
//! store, including:
//!
//! - `ScriptureRecord`, `BookUnit`, `Collection`: the book/chapter hierarchy
//! - `DevotionalRecord`, `EntryRecord`, `EntrySeries`: daily entries and
//!   their day-number index
//! - `Preferences`, `LastViewed`: user settings and reading history
//! - `CacheMetadata`: bookkeeping shared by every top-level record

pub mod devotional;
pub mod metadata;
pub mod prefs;
pub mod scripture;

pub use devotional::{DevotionalRecord, EntryPatch, EntryRecord, EntrySeries, LikeState};
pub use metadata::{CacheMetadata, CACHE_FORMAT_VERSION};
pub use prefs::{LastViewed, Preferences, PreferencesUpdate, VIEWING_HISTORY_LIMIT};
pub use scripture::{BookUnit, ChapterContent, Collection, ScriptureRecord};
