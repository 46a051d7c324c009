use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::scheduler::SettleOutcome;

/// Hooks the host application observes on session boundaries. `on_settled`
/// feeds conversion analytics; `on_auth_error` must force re-authentication
/// upstream — the engine never retries a rejected credential on its own.
pub trait SessionEvents: Send + Sync {
    fn on_settled(&self, outcome: SettleOutcome);
    fn on_auth_error(&self);
}

/// Default sink for hosts that do not care about session analytics.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopEvents;

impl SessionEvents for NoopEvents {
    fn on_settled(&self, _outcome: SettleOutcome) {}

    fn on_auth_error(&self) {}
}

/// Test double that records every emitted event.
#[derive(Debug, Default)]
pub struct RecordingEvents {
    settled: Mutex<Vec<SettleOutcome>>,
    auth_errors: AtomicUsize,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settled(&self) -> Vec<SettleOutcome> {
        self.settled.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    pub fn auth_error_count(&self) -> usize {
        self.auth_errors.load(Ordering::SeqCst)
    }
}

impl SessionEvents for RecordingEvents {
    fn on_settled(&self, outcome: SettleOutcome) {
        self.settled.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(outcome);
    }

    fn on_auth_error(&self) {
        self.auth_errors.fetch_add(1, Ordering::SeqCst);
    }
}
