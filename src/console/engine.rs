//! Console composition root.
//!
//! Owns every piece of console state as named fields: the config store, the
//! status poller, the action dispatcher, the drawer session, the upload
//! drawer and the post-commit hooks. The operator host holds one `Console`
//! and calls into it from its handlers.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::actions::ActionDispatcher;
use super::backend::{Backend, UploadFile, UploadTarget};
use super::format::{format_power, format_voltage, MISSING};
use super::model::{Address, SaveStatus, MAX_DEVICES};
use super::poller::{StatusPoller, POLL_INTERVAL};
use super::scheduler::{SaveScheduler, SAVE_DEBOUNCE};
use super::session::{
    BroadcastAddressHook, CommitHook, CommitTarget, CommittedDevice, DeviceDraft, DraftErrors,
    EditingSession, SessionState,
};
use super::store::ConfigStore;
use super::upload::{UploadDrawer, UploadError, UploadState};
use super::validate::FieldErrors;

/// Timer periods. Production uses the defaults; tests shorten them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleTiming {
    pub poll_interval: Duration,
    pub save_debounce: Duration,
}

impl Default for ConsoleTiming {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            save_debounce: SAVE_DEBOUNCE,
        }
    }
}

/// One table row: configuration joined with live metrics by name.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRow {
    pub index: usize,
    pub address: Address,
    pub name: String,
    pub voltage: String,
    pub power: String,
    pub enabled: bool,
    pub reversed: bool,
    pub locating: bool,
    pub errors: FieldErrors,
}

/// Drawer as rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawerView {
    Closed,
    Open {
        adding: bool,
        index: Option<usize>,
        draft: DeviceDraft,
    },
}

/// Everything the operator page renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleView {
    pub rows: Vec<DeviceRow>,
    pub device_count: usize,
    pub max_devices: usize,
    pub version: String,
    pub live: bool,
    pub save_status: SaveStatus,
    pub can_add: bool,
    pub drawer: DrawerView,
    pub uploads: UploadState,
}

impl ConsoleView {
    pub fn device_count_label(&self) -> String {
        format!("{}/{}", self.device_count, self.max_devices)
    }
}

#[derive(Clone)]
pub struct Console {
    store: ConfigStore,
    poller: StatusPoller,
    actions: ActionDispatcher,
    session: Arc<RwLock<EditingSession>>,
    uploads: UploadDrawer,
    hooks: Vec<Arc<dyn CommitHook>>,
    timing: ConsoleTiming,
    shutdown: CancellationToken,
}

impl Console {
    pub fn new(backend: Arc<dyn Backend>, timing: ConsoleTiming) -> Self {
        let actions = ActionDispatcher::new(backend.clone());
        let hooks: Vec<Arc<dyn CommitHook>> =
            vec![Arc::new(BroadcastAddressHook::new(actions.clone()))];

        Self {
            store: ConfigStore::new(backend.clone(), SaveScheduler::new(timing.save_debounce)),
            poller: StatusPoller::new(backend.clone()),
            actions,
            session: Arc::new(RwLock::new(EditingSession::new())),
            uploads: UploadDrawer::new(backend),
            hooks,
            timing,
            shutdown: CancellationToken::new(),
        }
    }

    /// Register an extra post-commit side effect.
    pub fn with_hook(mut self, hook: Arc<dyn CommitHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn poller(&self) -> &StatusPoller {
        &self.poller
    }

    /// Load configuration, then start the status timer (first poll fires
    /// immediately).
    pub async fn start(&self) -> SaveStatus {
        let status = self.store.load().await;
        self.poller
            .start(self.timing.poll_interval, self.shutdown.child_token());
        info!(
            "Console started (poll every {:?}, save debounce {:?})",
            self.timing.poll_interval, self.timing.save_debounce
        );
        status
    }

    /// Stop polling and write out any save still waiting on its timer.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        if self.store.save_pending() {
            info!("Flushing pending configuration save");
            self.store.cancel_pending_save();
            self.store.save().await;
        }
    }

    // =========================================================================
    // Drawer
    // =========================================================================

    pub async fn open_add(&self) -> bool {
        let config = self.store.snapshot().await;
        let mut session = self.session.write().await;
        session.open_add(&config)
    }

    pub async fn open_edit(&self, index: usize) -> bool {
        let config = self.store.snapshot().await;
        let mut session = self.session.write().await;
        session.open_edit(&config, index)
    }

    /// Apply form edits to the open draft. False when no drawer is open.
    pub async fn update_draft<F>(&self, edit: F) -> bool
    where
        F: FnOnce(&mut DeviceDraft) + Send,
    {
        let mut session = self.session.write().await;
        match session.draft_mut() {
            Some(draft) => {
                edit(draft);
                true
            }
            None => false,
        }
    }

    /// Commit the open draft into the configuration and schedule a save.
    ///
    /// Post-commit hooks run in the background; their failures are logged
    /// and never undo the commit.
    pub async fn commit(&self) -> Result<CommittedDevice, DraftErrors> {
        let committed = {
            let mut session = self.session.write().await;
            session.commit()?
        };

        match committed.target {
            CommitTarget::Append => self.store.commit_add(committed.device.clone()).await,
            CommitTarget::Replace(index) => {
                self.store
                    .commit_edit(index, committed.device.clone())
                    .await;
            }
        }
        self.store.schedule_save().await;

        if !self.hooks.is_empty() {
            let hooks = self.hooks.clone();
            let event = committed.clone();
            tokio::spawn(async move {
                join_all(hooks.iter().map(|hook| hook.after_commit(&event))).await;
            });
        }

        Ok(committed)
    }

    /// Delete the device being edited. Needs operator confirmation and is
    /// a no-op while adding.
    pub async fn delete(&self, confirmed: bool) -> bool {
        let index = {
            let mut session = self.session.write().await;
            session.delete(confirmed)
        };
        let Some(index) = index else {
            debug!("Delete ignored (adding, unconfirmed or no drawer open)");
            return false;
        };

        self.store.commit_delete(index).await;
        self.store.schedule_save().await;
        true
    }

    pub async fn cancel(&self) {
        self.session.write().await.cancel();
    }

    pub async fn session_state(&self) -> SessionState {
        self.session.read().await.state().clone()
    }

    // =========================================================================
    // Actions and uploads
    // =========================================================================

    pub async fn locate(&self, address: i64) -> bool {
        self.actions.locate(address).await
    }

    /// Mark `address` busy and send the locate in the background.
    pub async fn start_locate(&self, address: i64) {
        self.actions.start_locate(address).await;
    }

    pub async fn open_uploads(&self) {
        self.uploads.open().await;
    }

    pub async fn close_uploads(&self) {
        self.uploads.close().await;
    }

    pub async fn upload(
        &self,
        target: UploadTarget,
        file: Option<UploadFile>,
    ) -> Result<(), UploadError> {
        self.uploads.submit(target, file).await
    }

    // =========================================================================
    // View
    // =========================================================================

    /// Join configuration and the latest status into render rows.
    pub async fn view(&self) -> ConsoleView {
        let config = self.store.snapshot().await;
        let report = self.store.report().await;
        let save_status = self.store.status().await;
        let metrics = self.poller.metrics_by_name().await;
        let version = self.poller.version().await;
        let live = self.poller.is_live().await;
        let locating = self.actions.locating().await;
        let uploads = self.uploads.state().await;
        let session = self.session_state().await;

        let rows = config
            .devices
            .iter()
            .enumerate()
            .map(|(index, device)| {
                let key = device.status_key();
                let device_metrics = if key.is_empty() {
                    None
                } else {
                    metrics.get(key)
                };
                DeviceRow {
                    index,
                    address: device.address,
                    name: if device.name.is_empty() {
                        MISSING.to_string()
                    } else {
                        device.name.clone()
                    },
                    voltage: format_voltage(device_metrics),
                    power: format_power(device_metrics),
                    enabled: device.enabled,
                    reversed: device.reversed,
                    locating: device
                        .address
                        .as_integer()
                        .is_some_and(|address| locating.contains(&address)),
                    errors: report.errors_for(index),
                }
            })
            .collect();

        let drawer = match session {
            SessionState::Closed => DrawerView::Closed,
            SessionState::Adding(draft) => DrawerView::Open {
                adding: true,
                index: None,
                draft,
            },
            SessionState::Editing { index, draft } => DrawerView::Open {
                adding: false,
                index: Some(index),
                draft,
            },
        };

        ConsoleView {
            rows,
            device_count: config.device_count(),
            max_devices: MAX_DEVICES,
            version: version
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| MISSING.to_string()),
            live,
            save_status,
            can_add: !config.is_full(),
            drawer,
            uploads,
        }
    }
}
