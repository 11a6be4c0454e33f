//! Config store - the console's authoritative copy of device configuration.
//!
//! Mutations are applied locally first and persisted later:
//! edit -> `schedule_save` -> debounce -> `save` -> `POST /config`.
//!
//! Invalid configurations are never persisted. Both `schedule_save` and `save`
//! validate, since the configuration can change between scheduling and firing.
//!
//! Saves are single-flight: a save that fires while another is still awaiting
//! the backend is queued, and one follow-up write carrying the latest state is
//! sent once the first completes. Writes therefore never overlap or land out
//! of order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::backend::Backend;
use super::model::{Configuration, DeviceConfig, SaveStatus};
use super::scheduler::SaveScheduler;
use super::validate::{is_configuration_valid, validate_configuration, ValidationReport};

#[derive(Default)]
struct StoreState {
    config: Configuration,
    status: SaveStatus,
}

/// In-flight bookkeeping for `save`.
#[derive(Default)]
struct SaveFlight {
    busy: bool,
    queued: bool,
}

#[derive(Clone)]
pub struct ConfigStore {
    backend: Arc<dyn Backend>,
    state: Arc<RwLock<StoreState>>,
    scheduler: Arc<SaveScheduler>,
    flight: Arc<Mutex<SaveFlight>>,
}

impl ConfigStore {
    pub fn new(backend: Arc<dyn Backend>, scheduler: SaveScheduler) -> Self {
        Self {
            backend,
            state: Arc::new(RwLock::new(StoreState::default())),
            scheduler: Arc::new(scheduler),
            flight: Arc::new(Mutex::new(SaveFlight::default())),
        }
    }

    /// Fetch and normalize `/config`.
    ///
    /// On failure the store falls back to an empty configuration and reports
    /// `LoadFailed`. Not retried.
    pub async fn load(&self) -> SaveStatus {
        {
            let mut state = self.state.write().await;
            state.status = SaveStatus::Loading;
        }

        let (config, status) = match self.backend.fetch_config().await {
            Ok(raw) => {
                let config = Configuration::normalize(&raw);
                info!("Loaded configuration with {} device(s)", config.device_count());
                (config, SaveStatus::Loaded)
            }
            Err(e) => {
                warn!("Config load failed: {}", e);
                (Configuration::default(), SaveStatus::LoadFailed)
            }
        };

        let mut state = self.state.write().await;
        state.config = config;
        state.status = status;
        status
    }

    pub async fn snapshot(&self) -> Configuration {
        self.state.read().await.config.clone()
    }

    pub async fn status(&self) -> SaveStatus {
        self.state.read().await.status
    }

    pub async fn device_count(&self) -> usize {
        self.state.read().await.config.device_count()
    }

    /// Field-level validation of the current configuration.
    pub async fn report(&self) -> ValidationReport {
        validate_configuration(&self.state.read().await.config)
    }

    /// Whether a debounced save is waiting to fire.
    pub fn save_pending(&self) -> bool {
        self.scheduler.is_armed()
    }

    // =========================================================================
    // Structural mutations. Callers validate the device beforehand.
    // =========================================================================

    pub async fn commit_add(&self, device: DeviceConfig) {
        let mut state = self.state.write().await;
        debug!("Adding device {} at address {}", device.name, device.address);
        state.config.devices.push(device);
    }

    /// Replace the device at `index`. Returns false if the index is stale.
    pub async fn commit_edit(&self, index: usize, device: DeviceConfig) -> bool {
        let mut state = self.state.write().await;
        match state.config.devices.get_mut(index) {
            Some(slot) => {
                debug!("Updating device {} at index {}", device.name, index);
                *slot = device;
                true
            }
            None => {
                warn!("Edit ignored: no device at index {}", index);
                false
            }
        }
    }

    /// Remove the device at `index`. Confirmation happens at the call site.
    pub async fn commit_delete(&self, index: usize) -> Option<DeviceConfig> {
        let mut state = self.state.write().await;
        if index < state.config.devices.len() {
            let removed = state.config.devices.remove(index);
            debug!("Deleted device {} (address {})", removed.name, removed.address);
            Some(removed)
        } else {
            warn!("Delete ignored: no device at index {}", index);
            None
        }
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Arm the debounced save, unless the configuration is invalid.
    ///
    /// Returns whether the timer was armed.
    pub async fn schedule_save(&self) -> bool {
        let valid = {
            let mut state = self.state.write().await;
            let valid = is_configuration_valid(&state.config);
            state.status = if valid {
                SaveStatus::Unsaved
            } else {
                SaveStatus::Invalid
            };
            valid
        };

        if !valid {
            warn!("Configuration invalid, save not scheduled");
            return false;
        }

        let store = self.clone();
        self.scheduler.arm(move || async move {
            store.save().await;
        });
        true
    }

    /// Persist the current configuration now.
    ///
    /// Returns the resulting status; `None` when the write was queued behind
    /// one already in flight.
    pub async fn save(&self) -> Option<SaveStatus> {
        if !self.begin_flight() {
            debug!("Save already in flight, queueing latest state");
            return None;
        }

        let mut status = self.save_once().await;
        while self.take_queued() {
            status = self.save_once().await;
        }
        Some(status)
    }

    async fn save_once(&self) -> SaveStatus {
        let config = {
            let mut state = self.state.write().await;
            if !is_configuration_valid(&state.config) {
                state.status = SaveStatus::Invalid;
                None
            } else {
                state.status = SaveStatus::Saving;
                Some(state.config.clone())
            }
        };

        let Some(config) = config else {
            warn!("Configuration invalid at save time, write aborted");
            return SaveStatus::Invalid;
        };

        let status = match self.backend.store_config(&config).await {
            Ok(()) => {
                info!("Configuration saved ({} device(s))", config.device_count());
                SaveStatus::Saved
            }
            Err(e) => {
                error!("Save failed: {}", e);
                SaveStatus::SaveFailed
            }
        };

        self.state.write().await.status = status;
        status
    }

    fn flight(&self) -> MutexGuard<'_, SaveFlight> {
        self.flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the save slot, or mark a follow-up if it is taken.
    fn begin_flight(&self) -> bool {
        let mut flight = self.flight();
        if flight.busy {
            flight.queued = true;
            false
        } else {
            flight.busy = true;
            true
        }
    }

    /// Consume a queued follow-up, releasing the slot when there is none.
    fn take_queued(&self) -> bool {
        let mut flight = self.flight();
        if flight.queued {
            flight.queued = false;
            true
        } else {
            flight.busy = false;
            false
        }
    }

    /// Stop any pending save timer.
    pub fn cancel_pending_save(&self) {
        self.scheduler.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::testing::FakeBackend;
    use serde_json::json;
    use std::time::Duration;

    fn device(address: i64, name: &str) -> DeviceConfig {
        DeviceConfig {
            enabled: true,
            address: address.into(),
            name: name.to_string(),
            calibration: 1.0,
            reversed: false,
        }
    }

    fn store_with(backend: &Arc<FakeBackend>) -> ConfigStore {
        ConfigStore::new(backend.clone(), SaveScheduler::new(Duration::from_millis(600)))
    }

    #[tokio::test]
    async fn load_normalizes_response() {
        let backend = Arc::new(FakeBackend::with_config(json!({
            "devices": [{ "address": 2, "name": "Pump" }, { "address": 1, "name": "Oven" }]
        })));
        let store = store_with(&backend);

        assert_eq!(store.load().await, SaveStatus::Loaded);
        let config = store.snapshot().await;
        assert_eq!(config.devices[0].name, "Oven");
        assert_eq!(config.devices[1].name, "Pump");
    }

    #[tokio::test]
    async fn load_failure_falls_back_to_empty() {
        let backend = Arc::new(FakeBackend::default());
        backend.fail_config_reads(true);
        let store = store_with(&backend);

        assert_eq!(store.load().await, SaveStatus::LoadFailed);
        assert_eq!(store.snapshot().await, Configuration::default());
        assert_eq!(store.status().await, SaveStatus::LoadFailed);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_configuration_never_arms_timer() {
        let backend = Arc::new(FakeBackend::default());
        let store = store_with(&backend);
        store.commit_add(device(1, "Oven")).await;
        store.commit_add(device(1, "Pump")).await;

        assert!(!store.schedule_save().await);
        assert!(!store.save_pending());
        assert_eq!(store.status().await, SaveStatus::Invalid);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(backend.saved().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_collapse_into_one_write() {
        let backend = Arc::new(FakeBackend::default());
        let store = store_with(&backend);

        store.commit_add(device(1, "Oven")).await;
        assert!(store.schedule_save().await);
        tokio::time::sleep(Duration::from_millis(300)).await;

        store.commit_edit(0, device(1, "Kitchen oven")).await;
        assert!(store.schedule_save().await);
        assert_eq!(store.status().await, SaveStatus::Unsaved);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let saved = backend.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].devices[0].name, "Kitchen oven");
        assert_eq!(store.status().await, SaveStatus::Saved);
    }

    #[tokio::test]
    async fn save_revalidates_before_writing() {
        let backend = Arc::new(FakeBackend::default());
        let store = store_with(&backend);
        store.commit_add(device(0, "Oven")).await;

        assert_eq!(store.save().await, Some(SaveStatus::Invalid));
        assert!(backend.saved().is_empty());
    }

    #[tokio::test]
    async fn failed_save_is_not_retried() {
        let backend = Arc::new(FakeBackend::default());
        backend.fail_config_writes(true);
        let store = store_with(&backend);
        store.commit_add(device(1, "Oven")).await;

        assert_eq!(store.save().await, Some(SaveStatus::SaveFailed));
        assert!(!store.save_pending());
        assert_eq!(store.status().await, SaveStatus::SaveFailed);
    }

    #[tokio::test]
    async fn delete_and_stale_indexes() {
        let backend = Arc::new(FakeBackend::default());
        let store = store_with(&backend);
        store.commit_add(device(1, "Oven")).await;

        assert!(!store.commit_edit(3, device(2, "Pump")).await);
        assert!(store.commit_delete(5).await.is_none());
        assert_eq!(store.commit_delete(0).await.map(|d| d.name), Some("Oven".into()));
        assert_eq!(store.device_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_saves_are_serialized() {
        let backend = Arc::new(FakeBackend::default());
        backend.set_write_delay(Duration::from_millis(500));
        let store = store_with(&backend);
        store.commit_add(device(1, "Oven")).await;

        let first = tokio::spawn({
            let store = store.clone();
            async move { store.save().await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        store.commit_edit(0, device(1, "Oven (new)")).await;
        // Second save while the first is awaiting the backend
        assert_eq!(store.save().await, None);

        assert_eq!(first.await.unwrap(), Some(SaveStatus::Saved));
        let saved = backend.saved();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[1].devices[0].name, "Oven (new)");
    }
}
