//! Capture engine: supervising loop and event pump
//!
//! The engine runs on a dedicated blocking thread (camera APIs block) and
//! republishes captures to async consumers through a bounded channel. It
//! maintains the invariant "exactly one open session at a time, forever,
//! until cancelled": every failure is classified, recovered with a backoff
//! sized to it, and a fresh session is opened. No failure terminates the
//! stream; only cancellation does.

use crate::cancel::CancellationToken;
use crate::capture::Capture;
use crate::diagnostics::{DiagLevel, Diagnostics, TracingDiagnostics};
use crate::driver::{CameraDriver, CameraSession, PollEvent};
use async_channel::{Receiver, Sender, bounded};
use std::sync::Arc;
use std::time::Duration;

/// Engine tuning knobs.
///
/// The defaults are what the tool ships with; tests shrink the timings to
/// keep runs fast. None of these values affect correctness, only pacing.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound for one blocking event poll.
    pub poll_timeout: Duration,
    /// Consecutive poll misses tolerated before the session is abandoned.
    pub miss_threshold: u32,
    /// Delay before retrying after an open failure or a mid-stream loss.
    pub retry_backoff: Duration,
    /// Delay before retrying after an initialization failure. Deliberately
    /// long: a device that refused the handshake usually needs settle time,
    /// and hammering it tends to reproduce the same failure.
    pub init_backoff: Duration,
    /// Outbound stream buffer size. A full buffer blocks the producer, which
    /// is the engine's only backpressure mechanism.
    pub channel_capacity: usize,
    /// Delete each file from the camera's storage after a successful fetch.
    pub delete_after_fetch: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(500),
            miss_threshold: 10,
            retry_backoff: Duration::from_secs(1),
            init_backoff: Duration::from_secs(10),
            channel_capacity: 16,
            delete_after_fetch: true,
        }
    }
}

/// Why one supervising-loop iteration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionOutcome {
    /// No device reachable or claimable.
    OpenFailed,
    /// Device claimed but the handshake failed.
    InitFailed,
    /// Session degraded mid-stream: sustained poll misses past the
    /// threshold, or a post-notification fetch failure.
    TetherFailed,
    /// Cooperative shutdown, not an error.
    Cancelled,
}

/// Why the event pump returned control to the supervising loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpExit {
    TetherFailed,
    Cancelled,
}

/// Recovery delay for a classified failure.
fn backoff_for(outcome: SessionOutcome, config: &EngineConfig) -> Duration {
    match outcome {
        SessionOutcome::OpenFailed | SessionOutcome::TetherFailed => config.retry_backoff,
        SessionOutcome::InitFailed => config.init_backoff,
        SessionOutcome::Cancelled => Duration::ZERO,
    }
}

/// Tethered capture engine.
///
/// Construct with a driver, optionally adjust config and diagnostics, then
/// [`start`](Tether::start) it. The engine consumes itself on start; the
/// returned handle is the only way to interact with it afterwards.
pub struct Tether<D: CameraDriver> {
    driver: D,
    config: EngineConfig,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<D: CameraDriver> Tether<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            config: EngineConfig::default(),
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Spawn the producer thread and return the capture stream.
    ///
    /// The stream closes exactly once, after `cancel` fires (or the consumer
    /// drops its end); it never closes because of a device failure.
    pub fn start(self, cancel: CancellationToken) -> TetherHandle {
        let (tx, rx) = bounded(self.config.channel_capacity);

        let supervisor = Supervisor {
            driver: self.driver,
            config: self.config,
            diagnostics: self.diagnostics,
            cancel,
            out: tx,
        };

        let thread = std::thread::Builder::new()
            .name("tether-capture".to_string())
            .spawn(move || supervisor.run())
            .expect("Failed to spawn capture thread");

        TetherHandle {
            captures: rx,
            thread,
        }
    }
}

/// Handle to a running engine: the outbound stream plus the producer thread.
pub struct TetherHandle {
    captures: Receiver<Capture>,
    thread: std::thread::JoinHandle<()>,
}

impl TetherHandle {
    /// The ordered, bounded stream of captures.
    ///
    /// The receiver is cheap to clone; captures are distributed, not
    /// duplicated, across clones.
    pub fn captures(&self) -> Receiver<Capture> {
        self.captures.clone()
    }

    /// Wait for the producer thread to exit.
    ///
    /// Only returns promptly after cancellation has been signalled.
    pub fn join(self) -> std::thread::Result<()> {
        self.thread.join()
    }

    /// Split the handle into the stream and the thread handle.
    ///
    /// Useful when the consumer wants sole ownership of the receiver, e.g.
    /// to end the engine by dropping it.
    pub fn into_parts(self) -> (Receiver<Capture>, std::thread::JoinHandle<()>) {
        (self.captures, self.thread)
    }
}

/// The supervising loop's state, owned by the producer thread.
struct Supervisor<D: CameraDriver> {
    driver: D,
    config: EngineConfig,
    diagnostics: Arc<dyn Diagnostics>,
    cancel: CancellationToken,
    out: Sender<Capture>,
}

impl<D: CameraDriver> Supervisor<D> {
    /// Outer loop: (re)open sessions forever, until cancelled.
    fn run(mut self) {
        self.diag(DiagLevel::Debug, "capture engine started", &[]);

        loop {
            if self.cancel.is_cancelled() {
                self.diag(
                    DiagLevel::Debug,
                    "capture engine will stop because cancellation was requested",
                    &[],
                );
                break;
            }

            let outcome = self.run_session();
            if outcome == SessionOutcome::Cancelled {
                break;
            }

            let backoff = backoff_for(outcome, &self.config);
            self.diag(
                DiagLevel::Warn,
                "camera tether failed, retrying",
                &[
                    ("outcome", format!("{outcome:?}")),
                    ("backoff", format!("{backoff:?}")),
                ],
            );
            if self.cancel.sleep(backoff) {
                break;
            }
        }

        self.diag(DiagLevel::Debug, "capture engine stopped", &[]);
        // Dropping `out` here closes the stream, exactly once.
    }

    /// One supervising-loop iteration: open, init, pump, close.
    ///
    /// The session is closed on every exit path before this returns, so at
    /// most one session is ever open.
    fn run_session(&mut self) -> SessionOutcome {
        let mut session = match self.driver.open() {
            Ok(session) => session,
            Err(e) => {
                self.diag(
                    DiagLevel::Warn,
                    "failed to open camera session",
                    &[("error", e.to_string())],
                );
                return SessionOutcome::OpenFailed;
            }
        };

        if let Err(e) = session.init() {
            self.diag(
                DiagLevel::Warn,
                "camera refused initialization",
                &[("error", e.to_string())],
            );
            session.close();
            return SessionOutcome::InitFailed;
        }
        self.diag(DiagLevel::Debug, "camera session initialized", &[]);

        let exit = self.pump(&mut session);
        session.close();

        match exit {
            PumpExit::TetherFailed => SessionOutcome::TetherFailed,
            PumpExit::Cancelled => SessionOutcome::Cancelled,
        }
    }

    /// Inner loop: drain file events from one open session.
    ///
    /// Never closes the session itself; the caller owns that, on every path.
    fn pump(&mut self, session: &mut D::Session) -> PumpExit {
        let mut consecutive_misses: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return PumpExit::Cancelled;
            }
            if consecutive_misses > self.config.miss_threshold {
                self.diag(
                    DiagLevel::Warn,
                    "abandoning session after consecutive poll misses",
                    &[
                        ("misses", consecutive_misses.to_string()),
                        ("threshold", self.config.miss_threshold.to_string()),
                    ],
                );
                return PumpExit::TetherFailed;
            }

            // The poll's own timeout provides pacing; no extra sleep here.
            let file = match session.wait_for_file(self.config.poll_timeout) {
                Ok(PollEvent::FileAdded(file)) => {
                    consecutive_misses = 0;
                    file
                }
                Ok(PollEvent::Timeout) => {
                    consecutive_misses += 1;
                    continue;
                }
                Err(e) => {
                    // Transient poll jitter and a real disconnect look the
                    // same until the threshold trips.
                    consecutive_misses += 1;
                    self.diag(
                        DiagLevel::Debug,
                        "event poll failed",
                        &[("error", e.to_string())],
                    );
                    continue;
                }
            };
            self.diag(
                DiagLevel::Debug,
                "received tether event",
                &[("folder", file.folder.clone()), ("name", file.name.clone())],
            );

            let capture = match session.fetch(&file) {
                Ok(capture) => capture,
                Err(e) => {
                    // A notification we cannot download means the session is
                    // no longer trustworthy.
                    self.diag(
                        DiagLevel::Warn,
                        "failed to download image from camera",
                        &[("error", e.to_string())],
                    );
                    return PumpExit::TetherFailed;
                }
            };
            self.diag(
                DiagLevel::Debug,
                "downloaded image from tethered camera",
                &[
                    ("bytes", capture.len().to_string()),
                    ("mime_type", capture.mime_type.clone()),
                ],
            );

            if self.config.delete_after_fetch {
                // Cleanup only; the image is already in memory.
                if let Err(e) = session.delete(&file) {
                    self.diag(
                        DiagLevel::Debug,
                        "could not delete file on camera",
                        &[("error", e.to_string())],
                    );
                }
            }

            // Sole backpressure point: blocks while the bounded stream is
            // full. A closed stream means the consumer is gone, which ends
            // the engine the same way cancellation does.
            if self.out.send_blocking(capture).is_err() {
                self.diag(DiagLevel::Debug, "capture stream consumer dropped", &[]);
                return PumpExit::Cancelled;
            }
        }
    }

    fn diag(&self, level: DiagLevel, message: &str, fields: &[(&str, String)]) {
        self.diagnostics.record(level, message, fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();

        assert_eq!(config.poll_timeout, Duration::from_millis(500));
        assert_eq!(config.miss_threshold, 10);
        assert_eq!(config.retry_backoff, Duration::from_secs(1));
        assert_eq!(config.init_backoff, Duration::from_secs(10));
        assert_eq!(config.channel_capacity, 16);
        assert!(config.delete_after_fetch);
    }

    #[test]
    fn test_backoff_classification() {
        let config = EngineConfig::default();

        assert_eq!(
            backoff_for(SessionOutcome::OpenFailed, &config),
            config.retry_backoff
        );
        assert_eq!(
            backoff_for(SessionOutcome::TetherFailed, &config),
            config.retry_backoff
        );
        assert_eq!(
            backoff_for(SessionOutcome::InitFailed, &config),
            config.init_backoff
        );
        assert_eq!(
            backoff_for(SessionOutcome::Cancelled, &config),
            Duration::ZERO
        );
    }

    #[test]
    fn test_init_backoff_is_longer_than_retry_backoff() {
        let config = EngineConfig::default();
        assert!(config.init_backoff > config.retry_backoff);
    }
}
