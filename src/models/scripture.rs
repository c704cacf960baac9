//! Domain models for scripture content.
//!
//! Scripture is a two-level hierarchy: collections ("testaments") group
//! units ("books"), and each unit holds numbered chapters of text. The
//! whole hierarchy is persisted as one record; chapter text accumulates
//! additively and is never invalidated by time.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::CacheMetadata;

/// A top-level content grouping (a testament).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    pub name: String,
}

/// Immutable metadata for one book.
///
/// `chapter_count` is authoritative: it drives the downloader's loop bound
/// and the fully-downloaded check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookUnit {
    pub id: i64,
    pub name: String,
    pub collection_id: i64,
    pub chapter_count: u32,
}

/// One chapter of text together with the unit metadata it belongs to.
/// The remote provider returns unit metadata alongside the text so a
/// single-chapter read can seed the cache even when the book list was
/// never fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterContent {
    pub unit: BookUnit,
    pub number: u32,
    pub text: String,
}

/// The persisted scripture cache record.
///
/// Invariants:
/// - every key in `content` corresponds to a `BookUnit` present in `units`;
/// - a unit may be present in `units` with zero cached chapters (metadata
///   known, text not yet downloaded) - that is a valid state distinct from
///   the unit being absent entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptureRecord {
    pub metadata: CacheMetadata,
    pub collections: Vec<Collection>,
    pub units: Vec<BookUnit>,
    /// `"unit_<id>"` -> `"<chapter number>"` -> chapter text.
    pub content: BTreeMap<String, BTreeMap<String, String>>,
}

impl ScriptureRecord {
    pub fn empty() -> Self {
        Self {
            metadata: CacheMetadata::new(),
            collections: Vec::new(),
            units: Vec::new(),
            content: BTreeMap::new(),
        }
    }

    pub fn unit_key(unit_id: i64) -> String {
        format!("unit_{}", unit_id)
    }

    pub fn unit(&self, unit_id: i64) -> Option<&BookUnit> {
        self.units.iter().find(|u| u.id == unit_id)
    }

    pub fn units_in_collection(&self, collection_id: i64) -> Vec<BookUnit> {
        self.units
            .iter()
            .filter(|u| u.collection_id == collection_id)
            .cloned()
            .collect()
    }

    pub fn chapter_text(&self, unit_id: i64, chapter: u32) -> Option<&str> {
        self.content
            .get(&Self::unit_key(unit_id))
            .and_then(|chapters| chapters.get(&chapter.to_string()))
            .map(String::as_str)
    }

    /// Register unit metadata without touching its chapter map.
    /// Known units keep their existing metadata.
    pub fn register_unit(&mut self, unit: &BookUnit) {
        if self.unit(unit.id).is_none() {
            self.units.push(unit.clone());
        }
    }

    /// Insert one chapter, registering the unit's metadata if it was
    /// previously unknown so the content/units invariant holds.
    pub fn insert_chapter(&mut self, unit: &BookUnit, chapter: u32, text: String) {
        self.register_unit(unit);
        self.content
            .entry(Self::unit_key(unit.id))
            .or_default()
            .insert(chapter.to_string(), text);
    }

    /// Chapter numbers with locally cached text for one unit.
    pub fn downloaded_chapters(&self, unit_id: i64) -> BTreeSet<u32> {
        self.content
            .get(&Self::unit_key(unit_id))
            .map(|chapters| {
                chapters
                    .keys()
                    .filter_map(|k| k.parse::<u32>().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether every chapter of a known unit is cached locally.
    /// Unknown units are never "fully downloaded".
    pub fn is_unit_fully_downloaded(&self, unit_id: i64) -> bool {
        match self.unit(unit_id) {
            Some(unit) => self.downloaded_chapters(unit_id).len() as u32 >= unit.chapter_count,
            None => false,
        }
    }

    /// Recompute aggregate counters after a mutation.
    pub fn recount(&mut self) {
        let chapters: usize = self.content.values().map(|c| c.len()).sum();
        self.metadata.counts.insert("collections".into(), self.collections.len());
        self.metadata.counts.insert("units".into(), self.units.len());
        self.metadata.counts.insert("chapters".into(), chapters);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn genesis() -> BookUnit {
        BookUnit {
            id: 1,
            name: "Genesis".to_string(),
            collection_id: 1,
            chapter_count: 3,
        }
    }

    #[test]
    fn test_insert_chapter_registers_unit() {
        let mut record = ScriptureRecord::empty();
        record.insert_chapter(&genesis(), 2, "In the beginning...".to_string());

        assert!(record.unit(1).is_some());
        assert_eq!(record.chapter_text(1, 2), Some("In the beginning..."));
        assert_eq!(record.chapter_text(1, 1), None);
    }

    #[test]
    fn test_registered_unit_with_no_chapters_is_distinct_from_absent() {
        let mut record = ScriptureRecord::empty();
        record.register_unit(&genesis());

        assert!(record.unit(1).is_some());
        assert!(record.downloaded_chapters(1).is_empty());
        assert!(!record.is_unit_fully_downloaded(1));
        // A unit nobody registered is simply absent.
        assert!(record.unit(99).is_none());
    }

    #[test]
    fn test_fully_downloaded_requires_all_chapters() {
        let mut record = ScriptureRecord::empty();
        let unit = genesis();
        record.insert_chapter(&unit, 1, "a".into());
        record.insert_chapter(&unit, 2, "b".into());
        assert!(!record.is_unit_fully_downloaded(1));

        record.insert_chapter(&unit, 3, "c".into());
        assert!(record.is_unit_fully_downloaded(1));
        assert_eq!(record.downloaded_chapters(1), BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn test_register_unit_keeps_existing_metadata() {
        let mut record = ScriptureRecord::empty();
        record.register_unit(&genesis());

        let mut renamed = genesis();
        renamed.name = "Renamed".to_string();
        record.register_unit(&renamed);

        assert_eq!(record.units.len(), 1);
        assert_eq!(record.unit(1).unwrap().name, "Genesis");
    }

    #[test]
    fn test_recount() {
        let mut record = ScriptureRecord::empty();
        record.collections.push(Collection {
            id: 1,
            name: "Old Testament".to_string(),
        });
        record.insert_chapter(&genesis(), 1, "a".into());
        record.insert_chapter(&genesis(), 2, "b".into());
        record.recount();

        assert_eq!(record.metadata.counts.get("collections"), Some(&1));
        assert_eq!(record.metadata.counts.get("units"), Some(&1));
        assert_eq!(record.metadata.counts.get("chapters"), Some(&2));
    }
}
