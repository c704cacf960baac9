//! User preference models.
//!
//! Persisted as one record; every field carries a serde default so records
//! written by older builds keep decoding as fields are added.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum retained viewing-history items.
/// 50 covers several weeks of daily reading without unbounded growth.
pub const VIEWING_HISTORY_LIMIT: usize = 50;

fn default_theme() -> String {
    "daylight".to_string()
}

fn default_font_size() -> u16 {
    16
}

/// Pointer to the most recently read devotional entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastViewed {
    pub series_id: i64,
    pub day_number: u32,
    pub entry_id: i64,
    pub viewed_at: DateTime<Utc>,
}

/// User settings record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_theme")]
    pub theme_id: String,
    #[serde(default = "default_font_size")]
    pub font_size: u16,
    #[serde(default)]
    pub last_viewed: Option<LastViewed>,
    /// Most-recent-first, de-duplicated by `(series_id, day_number)`,
    /// bounded to [`VIEWING_HISTORY_LIMIT`].
    #[serde(default)]
    pub viewing_history: Vec<LastViewed>,
    /// Boolean feature toggles keyed by setting name.
    #[serde(default)]
    pub app_settings: BTreeMap<String, bool>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme_id: default_theme(),
            font_size: default_font_size(),
            last_viewed: None,
            viewing_history: Vec::new(),
            app_settings: BTreeMap::new(),
        }
    }
}

impl Preferences {
    /// Record a view: update the last-viewed pointer and prepend to history,
    /// dropping any prior item for the same `(series, day)` pair first, then
    /// truncating to the bound.
    pub fn record_view(&mut self, view: LastViewed) {
        self.viewing_history.retain(|item| {
            !(item.series_id == view.series_id && item.day_number == view.day_number)
        });
        self.viewing_history.insert(0, view.clone());
        self.viewing_history.truncate(VIEWING_HISTORY_LIMIT);
        self.last_viewed = Some(view);
    }
}

/// Partial preference update for read-merge-write saves.
/// Absent fields leave the persisted value untouched.
#[derive(Debug, Clone, Default)]
pub struct PreferencesUpdate {
    pub theme_id: Option<String>,
    pub font_size: Option<u16>,
    pub last_viewed: Option<LastViewed>,
    pub app_settings: Option<BTreeMap<String, bool>>,
}

impl Preferences {
    pub fn merge(&mut self, update: PreferencesUpdate) {
        if let Some(theme_id) = update.theme_id {
            self.theme_id = theme_id;
        }
        if let Some(font_size) = update.font_size {
            self.font_size = font_size;
        }
        if let Some(last_viewed) = update.last_viewed {
            self.last_viewed = Some(last_viewed);
        }
        if let Some(app_settings) = update.app_settings {
            self.app_settings.extend(app_settings);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
