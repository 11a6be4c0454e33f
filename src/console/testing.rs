//! In-memory backend for unit tests.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use super::backend::{ActionRequest, Backend, BackendError, UploadFile, UploadTarget};
use super::model::{Configuration, StatusSnapshot};

#[derive(Default)]
struct FakeState {
    config: Value,
    status: StatusSnapshot,
    fail_config_reads: bool,
    fail_config_writes: bool,
    fail_status: bool,
    fail_actions: bool,
    fail_uploads: bool,
    write_delay: Option<Duration>,
    action_delay: Option<Duration>,
    saved: Vec<Configuration>,
    actions: Vec<ActionRequest>,
    uploads: Vec<(UploadTarget, UploadFile)>,
    status_requests: usize,
}

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn with_config(config: Value) -> Self {
        let backend = Self::default();
        backend.inner().config = config;
        backend
    }

    fn inner(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn fail_config_reads(&self, fail: bool) {
        self.inner().fail_config_reads = fail;
    }

    pub fn fail_config_writes(&self, fail: bool) {
        self.inner().fail_config_writes = fail;
    }

    pub fn fail_status(&self, fail: bool) {
        self.inner().fail_status = fail;
    }

    pub fn fail_actions(&self, fail: bool) {
        self.inner().fail_actions = fail;
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.inner().fail_uploads = fail;
    }

    pub fn set_write_delay(&self, delay: Duration) {
        self.inner().write_delay = Some(delay);
    }

    pub fn set_action_delay(&self, delay: Duration) {
        self.inner().action_delay = Some(delay);
    }

    pub fn set_status(&self, status: StatusSnapshot) {
        self.inner().status = status;
    }

    pub fn saved(&self) -> Vec<Configuration> {
        self.inner().saved.clone()
    }

    pub fn actions(&self) -> Vec<ActionRequest> {
        self.inner().actions.clone()
    }

    pub fn uploads(&self) -> Vec<(UploadTarget, UploadFile)> {
        self.inner().uploads.clone()
    }

    pub fn status_requests(&self) -> usize {
        self.inner().status_requests
    }
}

fn unavailable() -> BackendError {
    BackendError::Status(StatusCode::SERVICE_UNAVAILABLE)
}

#[async_trait]
impl Backend for FakeBackend {
    async fn fetch_config(&self) -> Result<Value, BackendError> {
        let inner = self.inner();
        if inner.fail_config_reads {
            return Err(unavailable());
        }
        if inner.config.is_null() {
            Ok(json!({}))
        } else {
            Ok(inner.config.clone())
        }
    }

    async fn store_config(&self, config: &Configuration) -> Result<(), BackendError> {
        let delay = self.inner().write_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner();
        if inner.fail_config_writes {
            return Err(unavailable());
        }
        inner.saved.push(config.clone());
        Ok(())
    }

    async fn fetch_status(&self) -> Result<StatusSnapshot, BackendError> {
        let mut inner = self.inner();
        inner.status_requests += 1;
        if inner.fail_status {
            return Err(unavailable());
        }
        Ok(inner.status.clone())
    }

    async fn device_action(&self, request: &ActionRequest) -> Result<(), BackendError> {
        let delay = self.inner().action_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner();
        inner.actions.push(request.clone());
        if inner.fail_actions {
            return Err(unavailable());
        }
        Ok(())
    }

    async fn upload(&self, target: UploadTarget, file: UploadFile) -> Result<(), BackendError> {
        let mut inner = self.inner();
        inner.uploads.push((target, file));
        if inner.fail_uploads {
            return Err(unavailable());
        }
        Ok(())
    }
}
