//! Firmware backend transport.
//!
//! The console talks to the metering firmware over plain HTTP:
//! - `GET /config`, `POST /config` - persisted device configuration
//! - `GET /status` - live metrics
//! - `POST /device/action` - locate / assign requests
//! - `POST /ota`, `POST /ota/public` - multipart uploads
//!
//! Components hold an `Arc<dyn Backend>` so tests can swap in fakes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use super::model::{Configuration, StatusSnapshot};

/// Transport failure. Every variant is treated the same way by callers.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request failed: {0}")]
    Status(StatusCode),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Ad hoc request sent to a device on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceAction {
    /// Blink/alert an already addressed device
    Locate,
    /// Ask the device listening for an address to take this one
    Assign,
}

impl DeviceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceAction::Locate => "locate",
            DeviceAction::Assign => "assign",
        }
    }
}

/// Body of `POST /device/action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: DeviceAction,
    pub address: i64,
}

/// Multipart upload destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadTarget {
    Firmware,
    PublicFile,
}

impl UploadTarget {
    pub fn path(&self) -> &'static str {
        match self {
            UploadTarget::Firmware => "/ota",
            UploadTarget::PublicFile => "/ota/public",
        }
    }

    /// Multipart field name the firmware expects
    pub fn field(&self) -> &'static str {
        match self {
            UploadTarget::Firmware => "firmware",
            UploadTarget::PublicFile => "file",
        }
    }
}

/// File chosen for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Raw `/config` document, normalized by the caller.
    async fn fetch_config(&self) -> Result<Value, BackendError>;

    async fn store_config(&self, config: &Configuration) -> Result<(), BackendError>;

    async fn fetch_status(&self) -> Result<StatusSnapshot, BackendError>;

    async fn device_action(&self, request: &ActionRequest) -> Result<(), BackendError>;

    async fn upload(&self, target: UploadTarget, file: UploadFile) -> Result<(), BackendError>;
}

// =============================================================================
// HTTP implementation
// =============================================================================

/// reqwest-backed transport with HTTP caching disabled on every request.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base = Url::parse(base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .user_agent(concat!("auramon-console/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.base.join(path)?)
    }

    fn check(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(BackendError::Status(status))
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn fetch_config(&self) -> Result<Value, BackendError> {
        let response = self.client.get(self.url("/config")?).send().await?;
        let bytes = Self::check(response)?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn store_config(&self, config: &Configuration) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.url("/config")?)
            .json(config)
            .send()
            .await?;
        Self::check(response)?;
        Ok(())
    }

    async fn fetch_status(&self) -> Result<StatusSnapshot, BackendError> {
        let response = self.client.get(self.url("/status")?).send().await?;
        let bytes = Self::check(response)?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn device_action(&self, request: &ActionRequest) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.url("/device/action")?)
            .json(request)
            .send()
            .await?;
        Self::check(response)?;
        Ok(())
    }

    async fn upload(&self, target: UploadTarget, file: UploadFile) -> Result<(), BackendError> {
        let part = reqwest::multipart::Part::bytes(file.bytes).file_name(file.file_name);
        let form = reqwest::multipart::Form::new().part(target.field(), part);

        let response = self
            .client
            .post(self.url(target.path())?)
            .multipart(form)
            .send()
            .await?;
        Self::check(response)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_request_wire_format() {
        let body = serde_json::to_value(ActionRequest {
            action: DeviceAction::Locate,
            address: 4,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "action": "locate", "address": 4 }));
        assert_eq!(DeviceAction::Assign.as_str(), "assign");
    }

    #[test]
    fn upload_targets() {
        assert_eq!(UploadTarget::Firmware.path(), "/ota");
        assert_eq!(UploadTarget::Firmware.field(), "firmware");
        assert_eq!(UploadTarget::PublicFile.path(), "/ota/public");
        assert_eq!(UploadTarget::PublicFile.field(), "file");
    }

    #[test]
    fn backend_joins_paths_onto_base() {
        let backend = HttpBackend::new("http://10.0.0.7:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            backend.url("/device/action").unwrap().as_str(),
            "http://10.0.0.7:8080/device/action"
        );
    }

    #[test]
    fn error_messages_name_the_failure() {
        let status = BackendError::Status(StatusCode::BAD_GATEWAY);
        assert_eq!(status.to_string(), "request failed: 502 Bad Gateway");

        let decode: BackendError = serde_json::from_str::<Value>("{").unwrap_err().into();
        assert!(decode.to_string().starts_with("invalid response body"));

        // Transport errors only come from reqwest, serde_json and url
        match decode {
            BackendError::Http(_)
            | BackendError::Status(_)
            | BackendError::Decode(_)
            | BackendError::InvalidUrl(_) => {}
        }
    }

    #[test]
    fn rejects_unparseable_base_url() {
        assert!(matches!(
            HttpBackend::new("not a url", Duration::from_secs(1)),
            Err(BackendError::InvalidUrl(_))
        ));
    }
}
