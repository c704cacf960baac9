//! The remote content provider seam.
//!
//! The caches depend on this trait rather than on the HTTP client directly,
//! so tests substitute scripted in-memory fakes without touching global
//! state. [`super::HttpContentProvider`] is the production implementation.

use async_trait::async_trait;

use crate::models::{
    BookUnit, ChapterContent, Collection, EntryRecord, EntrySeries, LikeState,
};

use super::ApiError;

/// Remote source of scripture and devotional content.
///
/// Implementations must signal "not found" distinguishably from other
/// failures (`ApiError::NotFound`); the revalidation policy depends on it.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    // ===== Scripture =====

    async fn list_collections(&self) -> Result<Vec<Collection>, ApiError>;

    async fn list_units(&self, collection_id: i64) -> Result<Vec<BookUnit>, ApiError>;

    async fn get_chapter(&self, unit_id: i64, chapter: u32) -> Result<ChapterContent, ApiError>;

    // ===== Devotional =====

    async fn list_series(&self) -> Result<Vec<EntrySeries>, ApiError>;

    async fn get_entry_by_day(
        &self,
        series_id: i64,
        day_number: u32,
    ) -> Result<EntryRecord, ApiError>;

    async fn get_entry_by_id(&self, entry_id: i64) -> Result<EntryRecord, ApiError>;

    async fn set_liked(&self, entry_id: i64, liked: bool) -> Result<LikeState, ApiError>;

    async fn set_bookmarked(&self, entry_id: i64, bookmarked: bool) -> Result<bool, ApiError>;

    async fn submit_response(&self, entry_id: i64, text: &str) -> Result<(), ApiError>;
}
