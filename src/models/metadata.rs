//! Shared cache record bookkeeping.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version stamp written into every persisted cache record.
/// Bumped when the record layout changes incompatibly.
pub const CACHE_FORMAT_VERSION: &str = "1";

/// Bookkeeping carried by every top-level cache record.
///
/// `last_updated` means "record last touched"; the devotional cache compares
/// it against a whole-record expiry window, the scripture cache keeps it for
/// diagnostics only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub format_version: String,
    pub last_updated: DateTime<Utc>,
    /// Aggregate counters (entries, units, chapters, ...) for quick
    /// cache-status display without deserializing the whole record.
    #[serde(default)]
    pub counts: BTreeMap<String, usize>,
}

impl CacheMetadata {
    pub fn new() -> Self {
        Self {
            format_version: CACHE_FORMAT_VERSION.to_string(),
            last_updated: Utc::now(),
            counts: BTreeMap::new(),
        }
    }

    /// Refresh the touched timestamp.
    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.last_updated).num_minutes()
    }

    pub fn age_days(&self) -> i64 {
        (Utc::now() - self.last_updated).num_days()
    }
}

impl Default for CacheMetadata {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_metadata_is_fresh() {
        let meta = CacheMetadata::new();
        assert_eq!(meta.format_version, CACHE_FORMAT_VERSION);
        assert!(meta.age_minutes() <= 1);
    }

    #[test]
    fn test_age_days() {
        let mut meta = CacheMetadata::new();
        meta.last_updated = Utc::now() - Duration::days(8);
        assert_eq!(meta.age_days(), 8);
    }

    #[test]
    fn test_touch_resets_age() {
        let mut meta = CacheMetadata::new();
        meta.last_updated = Utc::now() - Duration::days(3);
        meta.touch();
        assert_eq!(meta.age_days(), 0);
    }
}
