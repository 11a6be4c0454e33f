//! Status poller - live metrics overlay.
//!
//! Polls `GET /status` on a fixed interval. A tick that lands while the
//! previous request is still outstanding is skipped, so a slow backend sees
//! at most one status request at a time.
//!
//! A failed poll flips liveness to offline but keeps the last good snapshot
//! on display.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backend::Backend;
use super::model::{DeviceMetrics, StatusSnapshot};

/// Default status refresh period.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Previous poll still in flight
    Skipped,
    Updated,
    Failed,
}

#[derive(Default)]
struct PollerState {
    snapshot: StatusSnapshot,
    live: bool,
    last_update: Option<DateTime<Utc>>,
}

/// Clears the in-flight flag however the poll ends.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct StatusPoller {
    backend: Arc<dyn Backend>,
    state: Arc<RwLock<PollerState>>,
    in_flight: Arc<AtomicBool>,
}

impl StatusPoller {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            state: Arc::new(RwLock::new(PollerState::default())),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Fetch `/status` once, unless a fetch is already running.
    pub async fn poll(&self) -> PollOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Status poll still in flight, skipping tick");
            return PollOutcome::Skipped;
        }
        let _guard = InFlightGuard(self.in_flight.clone());

        match self.backend.fetch_status().await {
            Ok(snapshot) => {
                let mut state = self.state.write().await;
                if !state.live {
                    info!(
                        "Status feed online (version {})",
                        snapshot.version.as_deref().unwrap_or("unknown")
                    );
                }
                state.snapshot = snapshot;
                state.live = true;
                state.last_update = Some(Utc::now());
                PollOutcome::Updated
            }
            Err(e) => {
                let mut state = self.state.write().await;
                if state.live {
                    warn!("Status poll failed, marking offline: {}", e);
                } else {
                    debug!("Status poll failed: {}", e);
                }
                state.live = false;
                PollOutcome::Failed
            }
        }
    }

    pub fn is_polling(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn is_live(&self) -> bool {
        self.state.read().await.live
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        self.state.read().await.snapshot.clone()
    }

    /// Metrics keyed by trimmed device name.
    pub async fn metrics_by_name(&self) -> HashMap<String, DeviceMetrics> {
        self.state.read().await.snapshot.by_name()
    }

    pub async fn version(&self) -> Option<String> {
        self.state.read().await.snapshot.version.clone()
    }

    pub async fn last_update(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.last_update
    }

    /// Spawn the repeating poll timer. The first tick fires immediately.
    ///
    /// Each tick spawns its own poll so a slow request never delays the
    /// timer; overlapping ticks collapse through the in-flight flag.
    pub fn start(&self, period: Duration, shutdown: CancellationToken) {
        if period.is_zero() {
            warn!("Status polling disabled: zero poll interval");
            return;
        }
        let poller = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Status polling shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let poller = poller.clone();
                        tokio::spawn(async move {
                            poller.poll().await;
                        });
                    }
                }
            }
        });
    }
}
