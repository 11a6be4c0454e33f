//! Editing session - the device drawer state machine.
//!
//! ```text
//! Closed --open_add--> Adding  --commit/cancel--------> Closed
//! Closed --open_edit-> Editing --commit/cancel/delete-> Closed
//! ```
//!
//! The session only stages a working copy. Applying a commit to the
//! configuration, scheduling the save and running post-commit hooks is the
//! owner's job (see `Console`).

use async_trait::async_trait;
use tracing::{debug, warn};

use super::actions::ActionDispatcher;
use super::backend::DeviceAction;
use super::model::{Address, Configuration, DeviceConfig, MAX_DEVICES};
use super::validate::{is_device_valid, is_name_valid};

/// Calibration pre-filled for new devices.
const DEFAULT_CALIBRATION_TEXT: &str = "1.0";

/// Next free address: one past the highest in use.
///
/// Gaps left by deleted devices are not reused. `None` once the next address
/// would exceed `MAX_DEVICES`.
pub fn find_available_address(devices: &[DeviceConfig]) -> Option<Address> {
    let Some(highest) = devices
        .iter()
        .map(|d| d.address.value().max(0.0))
        .max_by(f64::total_cmp)
    else {
        return Some(Address::new(1));
    };
    // First integer above the highest address, fractional or not
    let next = highest.floor() + 1.0;
    (next <= MAX_DEVICES as f64).then(|| Address::new(next as i64))
}

/// Field error flags shown on the drawer form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DraftErrors {
    pub name: bool,
    pub calibration: bool,
}

impl DraftErrors {
    pub fn any(&self) -> bool {
        self.name || self.calibration
    }
}

/// Working copy of one device, as edited in the drawer.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDraft {
    pub enabled: bool,
    /// Read-only in the form
    pub address: Address,
    pub name: String,
    /// Raw input text, parsed on commit
    pub calibration: String,
    pub reversed: bool,
    /// Broadcast the address to the bus after a successful commit
    pub broadcast: bool,
    pub errors: DraftErrors,
}

impl DeviceDraft {
    fn for_new(address: Address) -> Self {
        Self {
            enabled: true,
            address,
            name: String::new(),
            calibration: DEFAULT_CALIBRATION_TEXT.to_string(),
            reversed: false,
            broadcast: true,
            errors: DraftErrors::default(),
        }
    }

    fn from_device(device: &DeviceConfig) -> Self {
        let calibration = if device.calibration.is_finite() {
            device.calibration.to_string()
        } else {
            String::new()
        };
        Self {
            enabled: device.enabled,
            address: device.address,
            name: device.name.clone(),
            calibration,
            reversed: device.reversed,
            broadcast: false,
            errors: DraftErrors::default(),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.errors.name = false;
    }

    pub fn set_calibration(&mut self, calibration: impl Into<String>) {
        self.calibration = calibration.into();
        self.errors.calibration = false;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_reversed(&mut self, reversed: bool) {
        self.reversed = reversed;
    }

    pub fn set_broadcast(&mut self, broadcast: bool) {
        self.broadcast = broadcast;
    }

    /// Candidate record built from the form fields.
    fn candidate(&self) -> DeviceConfig {
        DeviceConfig {
            enabled: self.enabled,
            address: self.address,
            name: self.name.trim().to_string(),
            calibration: parse_float_prefix(&self.calibration),
            reversed: self.reversed,
        }
    }
}

/// Where a committed device lands in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitTarget {
    Append,
    Replace(usize),
}

/// A validated device handed back by [`EditingSession::commit`].
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedDevice {
    pub target: CommitTarget,
    pub device: DeviceConfig,
    pub broadcast: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Closed,
    Adding(DeviceDraft),
    Editing {
        index: usize,
        draft: DeviceDraft,
    },
}

#[derive(Debug, Clone, Default)]
pub struct EditingSession {
    state: SessionState,
}

impl EditingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, SessionState::Closed)
    }

    pub fn is_adding(&self) -> bool {
        matches!(self.state, SessionState::Adding(_))
    }

    pub fn editing_index(&self) -> Option<usize> {
        match self.state {
            SessionState::Editing { index, .. } => Some(index),
            _ => None,
        }
    }

    pub fn draft(&self) -> Option<&DeviceDraft> {
        match &self.state {
            SessionState::Closed => None,
            SessionState::Adding(draft) | SessionState::Editing { draft, .. } => Some(draft),
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut DeviceDraft> {
        match &mut self.state {
            SessionState::Closed => None,
            SessionState::Adding(draft) | SessionState::Editing { draft, .. } => Some(draft),
        }
    }

    /// Open an add session with the next free address.
    ///
    /// Refused (returning false) when a session is already open, the
    /// configuration is full, or no address is left.
    pub fn open_add(&mut self, config: &Configuration) -> bool {
        if self.is_open() || config.is_full() {
            return false;
        }
        let Some(address) = find_available_address(&config.devices) else {
            debug!("No free address, add refused");
            return false;
        };
        self.state = SessionState::Adding(DeviceDraft::for_new(address));
        true
    }

    /// Open an edit session on the device at `index`.
    pub fn open_edit(&mut self, config: &Configuration, index: usize) -> bool {
        if self.is_open() {
            return false;
        }
        let Some(device) = config.devices.get(index) else {
            return false;
        };
        self.state = SessionState::Editing {
            index,
            draft: DeviceDraft::from_device(device),
        };
        true
    }

    /// Validate the working copy and close on success.
    ///
    /// Name and calibration errors are flagged independently; on failure
    /// the session stays open with the flags set. The calibration field is
    /// only flagged when it does not parse as a number. A parsed value that
    /// is zero or negative still refuses the commit.
    pub fn commit(&mut self) -> Result<CommittedDevice, DraftErrors> {
        let target = match &self.state {
            SessionState::Closed => return Err(DraftErrors::default()),
            SessionState::Adding(_) => CommitTarget::Append,
            SessionState::Editing { index, .. } => CommitTarget::Replace(*index),
        };
        let Some(draft) = self.draft_mut() else {
            return Err(DraftErrors::default());
        };

        let device = draft.candidate();
        draft.errors = DraftErrors {
            name: !is_name_valid(&device.name),
            calibration: !device.calibration.is_finite(),
        };
        if !is_device_valid(&device) {
            return Err(draft.errors);
        }

        let broadcast = draft.broadcast;
        self.state = SessionState::Closed;
        Ok(CommittedDevice {
            target,
            device,
            broadcast,
        })
    }

    /// Close an edit session for deletion, returning the index to remove.
    ///
    /// No-op while adding, or without operator confirmation.
    pub fn delete(&mut self, confirmed: bool) -> Option<usize> {
        let index = self.editing_index()?;
        if !confirmed {
            return None;
        }
        self.state = SessionState::Closed;
        Some(index)
    }

    pub fn cancel(&mut self) {
        self.state = SessionState::Closed;
    }
}

/// Longest leading decimal number in `text`, or NaN when there is none.
///
/// Leading whitespace is skipped and trailing garbage ignored, so `"1.5x"`
/// parses as 1.5 and `"abc"` as NaN.
pub fn parse_float_prefix(text: &str) -> f64 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    if text[end..].starts_with("Infinity") {
        return text[..end + "Infinity".len()]
            .replace("Infinity", "inf")
            .parse()
            .unwrap_or(f64::NAN);
    }

    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return f64::NAN;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    text[..end].parse().unwrap_or(f64::NAN)
}

// =============================================================================
// Post-commit hooks
// =============================================================================

/// Side effect run after a device commit has been applied.
///
/// Hooks are fire-and-forget: a failing hook never rolls back the commit.
#[async_trait]
pub trait CommitHook: Send + Sync {
    async fn after_commit(&self, committed: &CommittedDevice);
}

/// Asks the device listening on the bus to take the committed address.
pub struct BroadcastAddressHook {
    dispatcher: ActionDispatcher,
}

impl BroadcastAddressHook {
    pub fn new(dispatcher: ActionDispatcher) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl CommitHook for BroadcastAddressHook {
    async fn after_commit(&self, committed: &CommittedDevice) {
        if !committed.broadcast {
            return;
        }
        let Some(address) = committed.device.address.as_integer() else {
            warn!(
                "Address broadcast skipped: {} is not a bus address",
                committed.device.address
            );
            return;
        };
        self.dispatcher.dispatch(DeviceAction::Assign, address).await;
    }
}
