//! Connectivity Monitor
//!
//! Keeps an eventually-consistent view of whether the AutoAnalyst backend is
//! reachable. The state lives in a `tokio::sync::watch` channel owned by the
//! monitor, so any number of consumers (views, the offline banner, the proxy
//! status route) can read or await it without touching the network.
//!
//! ```rust,ignore
//! let monitor = Arc::new(ConnectivityMonitor::new(probe, poll_interval, timeout));
//! let _polling = monitor.spawn();
//!
//! let mut rx = monitor.subscribe();
//! while rx.changed().await.is_ok() {
//!     println!("backend is {}", rx.borrow().status);
//! }
//! ```

pub mod banner;

pub use banner::{spawn_banner, OfflineBanner};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::models::HealthResponse;
use crate::types::ApiResult;

/// Backend reachability as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// No check has completed yet
    Unknown,
    Online,
    Offline,
}

impl std::fmt::Display for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connectivity::Unknown => write!(f, "unknown"),
            Connectivity::Online => write!(f, "online"),
            Connectivity::Offline => write!(f, "offline"),
        }
    }
}

/// Snapshot published after every health check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityState {
    pub status: Connectivity,
    pub last_checked: Option<DateTime<Utc>>,
    /// Checks in a row that produced `status`
    pub consecutive_checks: u64,
    pub total_checks: u64,
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self {
            status: Connectivity::Unknown,
            last_checked: None,
            consecutive_checks: 0,
            total_checks: 0,
        }
    }
}

impl ConnectivityState {
    pub fn is_online(&self) -> bool {
        self.status == Connectivity::Online
    }

    pub fn is_offline(&self) -> bool {
        self.status == Connectivity::Offline
    }

    /// State after a check that observed `status` at `checked_at`.
    fn after_check(&self, status: Connectivity, checked_at: DateTime<Utc>) -> Self {
        let consecutive_checks = if status == self.status {
            self.consecutive_checks + 1
        } else {
            1
        };

        Self {
            status,
            last_checked: Some(checked_at),
            consecutive_checks,
            total_checks: self.total_checks + 1,
        }
    }
}

/// Something that can ask the backend whether it is alive.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self) -> ApiResult<HealthResponse>;
}

/// Owns the connectivity state and the routine that updates it.
pub struct ConnectivityMonitor {
    probe: Arc<dyn HealthProbe>,
    state: watch::Sender<ConnectivityState>,
    poll_interval: Duration,
    check_timeout: Duration,
    // serializes checks so each one fully overwrites the previous
    check_lock: Mutex<()>,
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("state", &*self.state.borrow())
            .field("poll_interval", &self.poll_interval)
            .field("check_timeout", &self.check_timeout)
            .finish()
    }
}

impl ConnectivityMonitor {
    pub fn new(probe: Arc<dyn HealthProbe>, poll_interval: Duration, check_timeout: Duration) -> Self {
        let (state, _) = watch::channel(ConnectivityState::default());
        Self {
            probe,
            state,
            poll_interval,
            check_timeout,
            check_lock: Mutex::new(()),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Current state (clone).
    pub fn current(&self) -> ConnectivityState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> Connectivity {
        self.state.borrow().status
    }

    /// Receive every state published from now on.
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state.subscribe()
    }

    /// Probe the backend once and publish the outcome.
    ///
    /// Any failure (network error, non-2xx, undecodable body, timeout) means
    /// offline.
    pub async fn check_health(&self) -> Connectivity {
        let _guard = self.check_lock.lock().await;

        let status = match tokio::time::timeout(self.check_timeout, self.probe.probe()).await {
            Ok(Ok(health)) => {
                if !health.is_healthy() {
                    warn!(status = %health.status, error = ?health.error, "Backend reachable but reports degraded health");
                }
                Connectivity::Online
            }
            Ok(Err(e)) => {
                debug!(error = %e, "Health check failed");
                Connectivity::Offline
            }
            Err(_) => {
                debug!(timeout_ms = self.check_timeout.as_millis() as u64, "Health check timed out");
                Connectivity::Offline
            }
        };

        let previous = self.state.borrow().status;
        let checked_at = Utc::now();
        self.state
            .send_modify(|state| *state = state.after_check(status, checked_at));

        if previous != status {
            info!(from = %previous, to = %status, "Backend connectivity changed");
        }

        status
    }

    /// Start polling: one check immediately, then one per poll interval.
    ///
    /// Polling stops when the returned handle is dropped.
    pub fn spawn(self: &Arc<Self>) -> MonitorHandle {
        let monitor = Arc::clone(self);
        info!(interval_secs = monitor.poll_interval.as_secs(), "Starting connectivity monitor");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(monitor.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                monitor.check_health().await;
            }
        });

        MonitorHandle { task }
    }
}

/// Aborts the polling task on drop.
#[derive(Debug)]
pub struct MonitorHandle {
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
