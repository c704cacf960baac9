//! HTTP client for the remote content API.
//!
//! This module provides [`HttpContentProvider`], the reqwest-backed
//! implementation of [`ContentProvider`] used in production. Wire payloads
//! are camelCase and slightly wider than the domain models; each endpoint
//! deserializes into a private wire struct and converts.

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::{
    BookUnit, ChapterContent, Collection, EntryRecord, EntrySeries, LikeState,
};

use super::{ApiError, ContentProvider};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow responses on mobile networks while failing fast
/// enough for good UX. The caches impose no timeout of their own.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCollection {
    id: i64,
    name: String,
}

impl From<WireCollection> for Collection {
    fn from(w: WireCollection) -> Self {
        Collection {
            id: w.id,
            name: w.name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBook {
    id: i64,
    name: String,
    testament_id: i64,
    chapter_count: u32,
}

impl From<WireBook> for BookUnit {
    fn from(w: WireBook) -> Self {
        BookUnit {
            id: w.id,
            name: w.name,
            collection_id: w.testament_id,
            chapter_count: w.chapter_count,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireChapter {
    book: WireBook,
    chapter_number: u32,
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSeries {
    id: i64,
    name: String,
    description: Option<String>,
}

impl From<WireSeries> for EntrySeries {
    fn from(w: WireSeries) -> Self {
        EntrySeries {
            id: w.id,
            name: w.name,
            description: w.description,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEntry {
    id: i64,
    series_id: i64,
    day_number: u32,
    date: Option<String>,
    title: String,
    body: String,
    #[serde(default)]
    like_count: i64,
    #[serde(default)]
    liked: bool,
    #[serde(default)]
    bookmarked: bool,
    #[serde(default)]
    viewed: bool,
    #[serde(default)]
    has_submitted_response: bool,
}

impl From<WireEntry> for EntryRecord {
    fn from(w: WireEntry) -> Self {
        EntryRecord {
            id: w.id,
            series_id: w.series_id,
            day_number: w.day_number,
            date: w.date,
            title: w.title,
            body: w.body,
            like_count: w.like_count,
            liked: w.liked,
            bookmarked: w.bookmarked,
            viewed: w.viewed,
            has_submitted_response: w.has_submitted_response,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLikeState {
    liked: bool,
    like_count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBookmarkState {
    bookmarked: bool,
}

#[derive(Debug, Serialize)]
struct LikeBody {
    liked: bool,
}

#[derive(Debug, Serialize)]
struct BookmarkBody {
    bookmarked: bool,
}

#[derive(Debug, Serialize)]
struct ResponseBody<'a> {
    text: &'a str,
}

// ============================================================================
// Client
// ============================================================================

/// HTTP content provider.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpContentProvider {
    client: Client,
    base_url: String,
}

impl HttpContentProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Check if a response is successful, returning an error with body if not.
    /// `Ok(Some(response))` for success, `Ok(None)` for rate limit (retry).
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self.client.get(&url).send().await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    return response
                        .json()
                        .await
                        .map_err(|e| ApiError::InvalidResponse(e.to_string()));
                }
                None => {
                    if retries >= MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    debug!(url = %url, retries, backoff_ms, "rate limited, backing off");
                    tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)).await;
                    retries += 1;
                    backoff_ms *= 2;
                }
            }
        }
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self.client.post(&url).json(body).send().await?;

        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| ApiError::InvalidResponse(e.to_string()))
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn post_no_body<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let url = self.url(path);
        let response = self.client.post(&url).json(body).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}

#[async_trait]
impl ContentProvider for HttpContentProvider {
    async fn list_collections(&self) -> Result<Vec<Collection>, ApiError> {
        let wire: Vec<WireCollection> = self.get("/bible/testaments").await?;
        Ok(wire.into_iter().map(Collection::from).collect())
    }

    async fn list_units(&self, collection_id: i64) -> Result<Vec<BookUnit>, ApiError> {
        let wire: Vec<WireBook> = self
            .get(&format!("/bible/testaments/{}/books", collection_id))
            .await?;
        Ok(wire.into_iter().map(BookUnit::from).collect())
    }

    async fn get_chapter(&self, unit_id: i64, chapter: u32) -> Result<ChapterContent, ApiError> {
        let wire: WireChapter = self
            .get(&format!("/bible/books/{}/chapters/{}", unit_id, chapter))
            .await?;
        Ok(ChapterContent {
            unit: wire.book.into(),
            number: wire.chapter_number,
            text: wire.text,
        })
    }

    async fn list_series(&self) -> Result<Vec<EntrySeries>, ApiError> {
        let wire: Vec<WireSeries> = self.get("/devotionals/series").await?;
        Ok(wire.into_iter().map(EntrySeries::from).collect())
    }

    async fn get_entry_by_day(
        &self,
        series_id: i64,
        day_number: u32,
    ) -> Result<EntryRecord, ApiError> {
        let wire: WireEntry = self
            .get(&format!(
                "/devotionals/series/{}/days/{}",
                series_id, day_number
            ))
            .await?;
        Ok(wire.into())
    }

    async fn get_entry_by_id(&self, entry_id: i64) -> Result<EntryRecord, ApiError> {
        let wire: WireEntry = self
            .get(&format!("/devotionals/entries/{}", entry_id))
            .await?;
        Ok(wire.into())
    }

    async fn set_liked(&self, entry_id: i64, liked: bool) -> Result<LikeState, ApiError> {
        let wire: WireLikeState = self
            .post(
                &format!("/devotionals/entries/{}/like", entry_id),
                &LikeBody { liked },
            )
            .await?;
        Ok(LikeState {
            liked: wire.liked,
            like_count: wire.like_count,
        })
    }

    async fn set_bookmarked(&self, entry_id: i64, bookmarked: bool) -> Result<bool, ApiError> {
        let wire: WireBookmarkState = self
            .post(
                &format!("/devotionals/entries/{}/bookmark", entry_id),
                &BookmarkBody { bookmarked },
            )
            .await?;
        Ok(wire.bookmarked)
    }

    async fn submit_response(&self, entry_id: i64, text: &str) -> Result<(), ApiError> {
        self.post_no_body(
            &format!("/devotionals/entries/{}/responses", entry_id),
            &ResponseBody { text },
        )
        .await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let provider = HttpContentProvider::new("https://api.example.com/").unwrap();
        assert_eq!(
            provider.url("/bible/testaments"),
            "https://api.example.com/bible/testaments"
        );
    }

    #[test]
    fn test_wire_entry_converts_with_defaults() {
        let wire: WireEntry = serde_json::from_str(
            r#"{"id":7,"seriesId":2,"dayNumber":14,"date":"2026-02-14",
                "title":"Day 14","body":"..."}"#,
        )
        .unwrap();
        let entry: EntryRecord = wire.into();

        assert_eq!(entry.series_id, 2);
        assert_eq!(entry.day_number, 14);
        assert_eq!(entry.like_count, 0);
        assert!(!entry.liked);
    }

    #[test]
    fn test_wire_book_maps_testament_to_collection() {
        let wire: WireBook = serde_json::from_str(
            r#"{"id":1,"name":"Genesis","testamentId":1,"chapterCount":50}"#,
        )
        .unwrap();
        let unit: BookUnit = wire.into();
        assert_eq!(unit.collection_id, 1);
        assert_eq!(unit.chapter_count, 50);
    }
}
