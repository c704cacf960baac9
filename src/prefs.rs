//! User preference store.
//!
//! Settings live in one persisted record and in a `watch` channel that
//! screens subscribe to. The narrow setters (`save_theme`,
//! `save_font_size`) exist because the consuming UI needs sub-100ms
//! perceived latency: they publish the new value to the channel before
//! persisting, then roll the channel back to the last-known-good persisted
//! value if the write fails.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use crate::models::{LastViewed, Preferences, PreferencesUpdate};
use crate::storage::{load_record, save_record, KeyValueStore, StorageError};

/// Storage key for the preference record.
pub const PREFERENCES_KEY: &str = "preferences";

/// Versioned user settings with instant-apply and revert-on-failure.
#[derive(Clone)]
pub struct PreferenceStore {
    store: Arc<dyn KeyValueStore>,
    state: Arc<watch::Sender<Preferences>>,
}

impl PreferenceStore {
    /// Open the store, seeding the reactive state from any persisted record.
    pub async fn new(store: Arc<dyn KeyValueStore>) -> Result<Self, StorageError> {
        let initial = load_record::<Preferences>(&*store, PREFERENCES_KEY)
            .await?
            .unwrap_or_default();
        let (tx, _rx) = watch::channel(initial);
        Ok(Self {
            store,
            state: Arc::new(tx),
        })
    }

    /// Subscribe to preference changes. The receiver always holds the most
    /// recently applied value, including optimistic not-yet-persisted ones.
    pub fn subscribe(&self) -> watch::Receiver<Preferences> {
        self.state.subscribe()
    }

    /// Snapshot of the current in-memory preferences.
    pub fn current(&self) -> Preferences {
        self.state.borrow().clone()
    }

    /// Load persisted preferences, defaults filling any missing fields.
    pub async fn get(&self) -> Result<Preferences, StorageError> {
        Ok(load_record(&*self.store, PREFERENCES_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn persist(&self, prefs: &Preferences) -> Result<(), StorageError> {
        save_record(&*self.store, PREFERENCES_KEY, prefs).await
    }

    /// Read-merge-write a partial update, then publish.
    pub async fn save(&self, update: PreferencesUpdate) -> Result<(), StorageError> {
        let mut prefs = self.get().await?;
        prefs.merge(update);
        self.persist(&prefs).await?;
        self.state.send_replace(prefs);
        Ok(())
    }

    /// Apply a theme change immediately, reverting if the persist fails.
    pub async fn save_theme(&self, theme_id: &str) -> Result<(), StorageError> {
        self.apply_then_persist(PreferencesUpdate {
            theme_id: Some(theme_id.to_string()),
            ..PreferencesUpdate::default()
        })
        .await
    }

    /// Apply a font-size change immediately, reverting if the persist fails.
    pub async fn save_font_size(&self, font_size: u16) -> Result<(), StorageError> {
        self.apply_then_persist(PreferencesUpdate {
            font_size: Some(font_size),
            ..PreferencesUpdate::default()
        })
        .await
    }

    /// Optimistically publish the update, then persist through a
    /// read-merge-write. On failure, republish the last-known-good persisted
    /// value (falling back to the pre-update snapshot if storage is
    /// unreadable too) and surface the error.
    async fn apply_then_persist(&self, update: PreferencesUpdate) -> Result<(), StorageError> {
        let snapshot = self.current();
        self.state.send_modify(|prefs| prefs.merge(update.clone()));

        let persisted = async {
            let mut prefs = self.get().await?;
            prefs.merge(update);
            self.persist(&prefs).await?;
            Ok::<Preferences, StorageError>(prefs)
        }
        .await;

        match persisted {
            Ok(prefs) => {
                self.state.send_replace(prefs);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "preference persist failed, reverting");
                let last_good = self.get().await.unwrap_or(snapshot);
                self.state.send_replace(last_good);
                Err(err)
            }
        }
    }

    /// Record a view: updates the last-viewed pointer and the bounded,
    /// de-duplicated history list in one write.
    pub async fn save_last_viewed(&self, view: LastViewed) -> Result<(), StorageError> {
        let mut prefs = self.get().await?;
        prefs.record_view(view);
        self.persist(&prefs).await?;
        self.state.send_replace(prefs);
        Ok(())
    }

    /// Flip one boolean feature toggle.
    pub async fn set_app_setting(&self, name: &str, enabled: bool) -> Result<(), StorageError> {
        let mut prefs = self.get().await?;
        prefs.app_settings.insert(name.to_string(), enabled);
        self.persist(&prefs).await?;
        self.state.send_replace(prefs);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
