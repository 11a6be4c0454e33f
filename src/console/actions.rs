//! Device action dispatcher (locate / assign).

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::backend::{ActionRequest, Backend, DeviceAction};

#[derive(Clone)]
pub struct ActionDispatcher {
    backend: Arc<dyn Backend>,
    /// Addresses with a locate request outstanding
    locating: Arc<RwLock<HashSet<i64>>>,
}

impl ActionDispatcher {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            locating: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Send `action` to the device at `address`.
    ///
    /// Non-positive addresses are ignored without contacting the backend.
    pub async fn dispatch(&self, action: DeviceAction, address: i64) -> bool {
        if address <= 0 {
            warn!("Device action ignored: invalid address {}", address);
            return false;
        }

        let request = ActionRequest { action, address };
        match self.backend.device_action(&request).await {
            Ok(()) => {
                debug!("Device action {} sent to address {}", action.as_str(), address);
                true
            }
            Err(e) => {
                warn!(
                    "Device action {} failed for address {}: {}",
                    action.as_str(),
                    address,
                    e
                );
                false
            }
        }
    }

    /// Locate, with the address marked busy until the request settles.
    pub async fn locate(&self, address: i64) -> bool {
        self.locating.write().await.insert(address);
        let ok = self.dispatch(DeviceAction::Locate, address).await;
        self.locating.write().await.remove(&address);
        ok
    }

    /// Start a locate without waiting for the device to answer.
    ///
    /// The address is already marked busy when this returns.
    pub async fn start_locate(&self, address: i64) {
        self.locating.write().await.insert(address);
        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.dispatch(DeviceAction::Locate, address).await;
            dispatcher.locating.write().await.remove(&address);
        });
    }

    pub async fn is_locating(&self, address: i64) -> bool {
        self.locating.read().await.contains(&address)
    }

    pub async fn locating(&self) -> HashSet<i64> {
        self.locating.read().await.clone()
    }
}
