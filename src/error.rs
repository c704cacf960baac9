//! Crate-wide error taxonomy for cache operations.

use chrono::NaiveDate;
use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Failure classes surfaced by the caches.
///
/// The distinction matters to callers: `NotFound` means the server confirmed
/// the resource is gone (local copies are invalidated), `Transient` may
/// succeed on retry (stale-cache fallback applies where a copy exists),
/// `Storage` is a local persistence fault, and `NotYetAvailable` is a
/// domain condition - the same entry becomes valid at a predictable future
/// date and must never be recorded as an absence.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("content not found")]
    NotFound,

    #[error("fetch failed: {0}")]
    Transient(#[source] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("entry dated {date} is not yet available")]
    NotYetAvailable { date: NaiveDate },
}

impl From<ApiError> for CacheError {
    fn from(err: ApiError) -> Self {
        if err.is_not_found() {
            CacheError::NotFound
        } else {
            CacheError::Transient(err)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_not_found() {
        let err: CacheError = ApiError::NotFound("gone".to_string()).into();
        assert!(matches!(err, CacheError::NotFound));
    }

    #[test]
    fn test_other_api_errors_map_to_transient() {
        let err: CacheError = ApiError::ServerError("boom".to_string()).into();
        assert!(matches!(err, CacheError::Transient(_)));

        let err: CacheError = ApiError::RateLimited.into();
        assert!(matches!(err, CacheError::Transient(_)));
    }
}
