//! Debounced Request Gateway
//!
//! Wraps outbound backend calls so the same [`Operation`] is not dispatched
//! again inside its cooldown window. Inside the window callers get the last
//! outcome again, failures included, so a server error is never masked by
//! placeholder data. Only when no outcome was recorded (the call was dropped
//! mid-flight) does the operation's fallback record from [`crate::fallback`]
//! stand in.
//!
//! Each operation has its own async lock, held across the cooldown check and
//! the call, so at most one call per operation is in flight.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::fallback;
use crate::types::{ApiError, ApiResult, Operation};

/// Bookkeeping for one operation.
#[derive(Debug, Default)]
struct PendingRequest {
    last_invoked: Option<Instant>,
    last_outcome: Option<Result<serde_json::Value, ApiError>>,
}

#[derive(Debug, Default)]
pub struct Gateway {
    entries: Mutex<HashMap<Operation, Arc<tokio::sync::Mutex<PendingRequest>>>>,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` unless `operation` was invoked less than `cooldown` ago.
    ///
    /// [`Operation::HealthCheck`] is never debounced or cached.
    pub async fn invoke<T, F, Fut>(&self, operation: Operation, f: F, cooldown: Duration) -> ApiResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
        T: Serialize + DeserializeOwned,
    {
        if operation == Operation::HealthCheck {
            return f().await;
        }

        let entry = self.entry(operation);
        let mut pending = entry.lock().await;

        let now = Instant::now();
        if let Some(last) = pending.last_invoked {
            let elapsed = now.duration_since(last);
            if elapsed < cooldown {
                debug!(
                    operation = %operation,
                    elapsed_ms = elapsed.as_millis() as u64,
                    cooldown_ms = cooldown.as_millis() as u64,
                    "Within cooldown, skipping backend call"
                );
                return Self::replay(operation, &pending);
            }
        }

        pending.last_invoked = Some(now);
        pending.last_outcome = None;
        let result = f().await;

        pending.last_outcome = match &result {
            Ok(value) => match serde_json::to_value(value) {
                Ok(json) => Some(Ok(json)),
                Err(e) => {
                    warn!(operation = %operation, error = %e, "Could not cache result");
                    None
                }
            },
            Err(e) => Some(Err(e.clone())),
        };

        result
    }

    /// Forget the cooldown and last outcome of `operation`.
    ///
    /// Waits for an in-flight call to finish first, so the entry is never
    /// replaced under it.
    pub async fn reset(&self, operation: Operation) {
        let entry = self.entry(operation);
        let mut pending = entry.lock().await;
        *pending = PendingRequest::default();
    }

    fn entry(&self, operation: Operation) -> Arc<tokio::sync::Mutex<PendingRequest>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.entry(operation).or_default().clone()
    }

    fn replay<T: DeserializeOwned>(operation: Operation, pending: &PendingRequest) -> ApiResult<T> {
        match &pending.last_outcome {
            Some(Ok(cached)) => Ok(serde_json::from_value(cached.clone())?),
            Some(Err(e)) => Err(e.clone()),
            None => match fallback::for_operation(operation) {
                Some(mock) => {
                    debug!(operation = %operation, "No recorded outcome, serving fallback record");
                    Ok(serde_json::from_value(mock)?)
                }
                None => Err(ApiError::Cooldown { operation }),
            },
        }
    }
}
