//! Clock abstraction for testable time-dependent code.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current Unix timestamp.
///
/// Every server-assigned timestamp in the crate (message ordering, listing
/// `updated_at`, claim submission times) goes through this seam so tests
/// can pin or advance the clock deterministically.
pub trait TimeProvider: Send + Sync {
    /// Current Unix timestamp in seconds.
    fn now_unix(&self) -> u64;
}

/// Production implementation backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

impl SystemTimeProvider {
    pub const fn new() -> Self {
        Self
    }
}
