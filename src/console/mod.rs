//! Configuration sync engine for the Aura Mon console.
//!
//! Reconciles three data sources into one view:
//! - the persisted device configuration (`store`)
//! - the polled live status feed (`poller`)
//! - in-progress drawer edits (`session`)
//!
//! `Console` (in `engine`) wires them together and is what the operator host
//! talks to.

pub mod actions;
pub mod backend;
pub mod engine;
pub mod format;
pub mod model;
pub mod poller;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod upload;
pub mod validate;

#[cfg(test)]
mod testing;

pub use actions::ActionDispatcher;
pub use backend::{
    ActionRequest, Backend, BackendError, DeviceAction, HttpBackend, UploadFile, UploadTarget,
};
pub use engine::{Console, ConsoleTiming, ConsoleView, DeviceRow, DrawerView};
pub use format::{format_metric, format_power, format_voltage};
pub use model::{
    Address, Configuration, DeviceConfig, DeviceMetrics, SaveStatus, StatusSnapshot, StatusVariant,
    MAX_DEVICES,
};
pub use poller::{PollOutcome, StatusPoller, POLL_INTERVAL};
pub use scheduler::{SaveScheduler, SAVE_DEBOUNCE};
pub use session::{
    find_available_address, BroadcastAddressHook, CommitHook, CommitTarget, CommittedDevice,
    DeviceDraft, DraftErrors, EditingSession, SessionState,
};
pub use store::ConfigStore;
pub use upload::{UploadDrawer, UploadError, UploadOutcome, UploadState};
pub use validate::{
    is_configuration_valid, is_device_valid, validate_configuration, FieldErrors, ValidationReport,
};
