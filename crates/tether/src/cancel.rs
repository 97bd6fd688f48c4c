//! Cooperative cancellation signal
//!
//! A single token is shared between the producer thread and whatever decides
//! to shut down (Ctrl+C handler, test harness). Cancellation is cooperative
//! and idempotent: it never aborts an in-flight device call, it only stops
//! new iterations and wakes backoff sleeps early.

use std::sync::Arc;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Cloneable cancellation flag with a wakeable sleep.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Safe to call from any thread, any number of times.
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock().unwrap_or_else(|e| e.into_inner());
        *cancelled = true;
        self.inner.condvar.notify_all();
    }

    /// Non-blocking check, used at the top of each loop iteration.
    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sleep for `timeout` unless cancelled first.
    ///
    /// Returns `true` if cancellation was observed (before or during the
    /// sleep). Used for backoff pacing so a shutdown does not wait out a
    /// 10 second retry delay.
    pub fn sleep(&self, timeout: Duration) -> bool {
        let mut cancelled = self.inner.cancelled.lock().unwrap_or_else(|e| e.into_inner());
        let deadline = std::time::Instant::now() + timeout;
        while !*cancelled {
            let now = std::time::Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .inner
                .condvar
                .wait_timeout(cancelled, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            cancelled = guard;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_token_starts_uncancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_is_idempotent_and_visible_to_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();

        token.cancel();
        token.cancel();

        assert!(token.is_cancelled());
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_sleep_runs_to_timeout_when_not_cancelled() {
        let token = CancellationToken::new();
        let start = Instant::now();

        assert!(!token.sleep(Duration::from_millis(50)));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_sleep_wakes_early_on_cancel() {
        let token = CancellationToken::new();
        let waker = token.clone();

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            waker.cancel();
        });

        let start = Instant::now();
        assert!(token.sleep(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));

        handle.join().unwrap();
    }

    #[test]
    fn test_sleep_returns_immediately_when_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();

        let start = Instant::now();
        assert!(token.sleep(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
