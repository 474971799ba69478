use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::api::RemoteStore;

/// How long a probe result is trusted before probing again.
pub const DEFAULT_AVAILABILITY_TTL_SECS: u64 = 30;

/// Result of the last availability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AvailabilityState {
    checked_at: Instant,
    available: bool,
}

/// Cached answer to "can the remote service be used right now?".
///
/// Owned by the gateway; the cached state lives exactly as long as it does.
pub struct AvailabilityProbe {
    state: Mutex<Option<AvailabilityState>>,
    ttl: Duration,
    timeout: Duration,
    offline_mode: bool,
}

impl AvailabilityProbe {
    pub fn new(ttl: Duration, timeout: Duration, offline_mode: bool) -> Self {
        Self {
            state: Mutex::new(None),
            ttl,
            timeout,
            offline_mode,
        }
    }

    /// Whether remote calls should be attempted.
    ///
    /// Never fails: every probe error, rejection or timeout reads as `false`.
    pub async fn is_available(&self, remote: &dyn RemoteStore) -> bool {
        if self.offline_mode {
            return false;
        }
        if let Some(cached) = self.fresh_state() {
            return cached.available;
        }
        if !remote.has_credential() {
            self.record(false);
            return false;
        }

        let available = match tokio::time::timeout(self.timeout, remote.probe()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!(error = %e, "Availability probe failed");
                false
            }
            Err(_) => {
                debug!(timeout_secs = self.timeout.as_secs(), "Availability probe timed out");
                false
            }
        };
        self.record(available);
        available
    }

    /// Forget the cached result so the next check probes again.
    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    pub fn offline_mode(&self) -> bool {
        self.offline_mode
    }

    fn fresh_state(&self) -> Option<AvailabilityState> {
        let state = *self.lock();
        state.filter(|state| state.checked_at.elapsed() < self.ttl)
    }

    fn record(&self, available: bool) {
        *self.lock() = Some(AvailabilityState {
            checked_at: Instant::now(),
            available,
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<AvailabilityState>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
