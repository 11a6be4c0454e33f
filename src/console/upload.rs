//! Upload drawer: firmware image and public file uploads.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::backend::{Backend, BackendError, UploadFile, UploadTarget};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no file selected")]
    MissingFile,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Complete,
    Failed,
}

impl UploadOutcome {
    pub fn text(&self) -> &'static str {
        match self {
            UploadOutcome::Complete => "Upload complete",
            UploadOutcome::Failed => "Upload failed",
        }
    }
}

/// Drawer state as rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadState {
    pub open: bool,
    /// Firmware form submitted without a file
    pub firmware_missing: bool,
    /// Public file form submitted without a file
    pub public_missing: bool,
    pub outcome: Option<UploadOutcome>,
}

impl UploadState {
    fn flag(&mut self, target: UploadTarget, missing: bool) {
        match target {
            UploadTarget::Firmware => self.firmware_missing = missing,
            UploadTarget::PublicFile => self.public_missing = missing,
        }
    }
}

#[derive(Clone)]
pub struct UploadDrawer {
    backend: Arc<dyn Backend>,
    state: Arc<RwLock<UploadState>>,
}

impl UploadDrawer {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            state: Arc::new(RwLock::new(UploadState::default())),
        }
    }

    pub async fn state(&self) -> UploadState {
        *self.state.read().await
    }

    /// Opening resets both file flags and any previous outcome.
    pub async fn open(&self) {
        *self.state.write().await = UploadState {
            open: true,
            ..Default::default()
        };
    }

    pub async fn close(&self) {
        *self.state.write().await = UploadState::default();
    }

    /// Forward `file` to the backend. Without a file nothing is sent and the
    /// form's input is flagged.
    pub async fn submit(
        &self,
        target: UploadTarget,
        file: Option<UploadFile>,
    ) -> Result<(), UploadError> {
        let Some(file) = file.filter(|f| !f.file_name.is_empty()) else {
            let mut state = self.state.write().await;
            state.flag(target, true);
            warn!("Upload to {} blocked: no file selected", target.path());
            return Err(UploadError::MissingFile);
        };

        {
            let mut state = self.state.write().await;
            state.flag(target, false);
            state.outcome = None;
        }

        let file_name = file.file_name.clone();
        let result = self.backend.upload(target, file).await;

        let mut state = self.state.write().await;
        match result {
            Ok(()) => {
                info!("Uploaded {} to {}", file_name, target.path());
                state.outcome = Some(UploadOutcome::Complete);
                Ok(())
            }
            Err(e) => {
                warn!("Upload of {} to {} failed: {}", file_name, target.path(), e);
                state.outcome = Some(UploadOutcome::Failed);
                Err(e.into())
            }
        }
    }
}
