//! Offline Banner
//!
//! Decides when the "backend offline" banner is shown. It appears as soon as
//! connectivity turns offline and disappears a fixed delay after it comes
//! back online.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use super::{Connectivity, ConnectivityState};

#[derive(Debug, Clone)]
pub struct OfflineBanner {
    hide_delay: Duration,
    last_status: Connectivity,
    visible: bool,
    hide_at: Option<Instant>,
}

impl OfflineBanner {
    pub fn new(hide_delay: Duration) -> Self {
        Self {
            hide_delay,
            last_status: Connectivity::Unknown,
            visible: false,
            hide_at: None,
        }
    }

    /// Feed the latest status. Only transitions matter.
    pub fn observe(&mut self, status: Connectivity, now: Instant) {
        self.settle(now);
        if status == self.last_status {
            return;
        }
        self.last_status = status;

        match status {
            Connectivity::Offline => {
                self.visible = true;
                self.hide_at = None;
            }
            Connectivity::Online if self.visible => {
                self.hide_at = Some(now + self.hide_delay);
            }
            Connectivity::Online | Connectivity::Unknown => {}
        }
    }

    pub fn is_visible(&self, now: Instant) -> bool {
        self.visible && self.hide_at.map_or(true, |at| now < at)
    }

    /// When a pending hide takes effect, if one is scheduled.
    pub fn hide_deadline(&self) -> Option<Instant> {
        self.hide_at
    }

    fn settle(&mut self, now: Instant) {
        if let Some(at) = self.hide_at {
            if now >= at {
                self.visible = false;
                self.hide_at = None;
            }
        }
    }
}

/// Drive an [`OfflineBanner`] from a connectivity subscription.
///
/// The returned receiver holds the banner visibility and only changes when
/// visibility does. The task ends when the connectivity sender goes away.
pub fn spawn_banner(
    mut connectivity: watch::Receiver<ConnectivityState>,
    hide_delay: Duration,
) -> (watch::Receiver<bool>, JoinHandle<()>) {
    let mut banner = OfflineBanner::new(hide_delay);
    let initial = connectivity.borrow_and_update().status;
    banner.observe(initial, Instant::now());

    let (tx, rx) = watch::channel(banner.is_visible(Instant::now()));

    let task = tokio::spawn(async move {
        loop {
            let deadline = banner.hide_deadline();

            tokio::select! {
                changed = connectivity.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let status = connectivity.borrow_and_update().status;
                    banner.observe(status, Instant::now());
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    banner.settle(Instant::now());
                }
            }

            let visible = banner.is_visible(Instant::now());
            tx.send_if_modified(|current| {
                if *current != visible {
                    debug!(visible, "Offline banner visibility changed");
                    *current = visible;
                    true
                } else {
                    false
                }
            });
        }
    });

    (rx, task)
}
