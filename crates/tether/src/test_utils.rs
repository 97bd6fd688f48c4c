//! Test utilities for the capture engine
//!
//! Provides a fully scripted camera driver double plus shared counters, so
//! tests can drive the engine deterministically and observe open/close
//! behavior without hardware.
//!
//! # Example
//!
//! ```
//! use tether::test_utils::{ScriptStep, ScriptedDriver, SessionPlan};
//!
//! let driver = ScriptedDriver::new(vec![SessionPlan::ok(vec![
//!     ScriptStep::file(b"\xff\xd8".to_vec(), "image/jpeg"),
//! ])]);
//! let stats = driver.stats();
//! assert_eq!(stats.opens(), 0);
//! ```

use crate::capture::Capture;
use crate::driver::{CameraDriver, CameraSession, DriverError, FilePath, PollEvent};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// One scripted poll outcome.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Deliver a file event; the subsequent fetch returns this payload.
    File { data: Vec<u8>, mime: String },
    /// Deliver a file event whose fetch fails.
    FetchError,
    /// The poll window elapses with no event (sleeps the poll timeout).
    Timeout,
    /// The poll itself errors out (returns immediately).
    PollError,
}

impl ScriptStep {
    pub fn file(data: Vec<u8>, mime: impl Into<String>) -> Self {
        ScriptStep::File {
            data,
            mime: mime.into(),
        }
    }
}

/// Scripted behavior for one `open` call.
#[derive(Debug, Clone, Default)]
pub struct SessionPlan {
    pub fail_open: bool,
    pub fail_init: bool,
    pub steps: Vec<ScriptStep>,
}

impl SessionPlan {
    /// A session that opens, initializes, and then plays `steps`.
    /// Once the steps run out, every further poll times out.
    pub fn ok(steps: Vec<ScriptStep>) -> Self {
        Self {
            fail_open: false,
            fail_init: false,
            steps,
        }
    }

    /// An `open` call that fails outright.
    pub fn open_failure() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    /// A session that opens but refuses initialization.
    pub fn init_failure() -> Self {
        Self {
            fail_init: true,
            ..Self::default()
        }
    }
}

/// Shared counters recorded by the scripted driver.
#[derive(Debug, Default)]
pub struct DriverStats {
    open_attempts: AtomicU32,
    opens: AtomicU32,
    closes: AtomicU32,
    inits: AtomicU32,
    fetches: AtomicU32,
    deletes: AtomicU32,
    currently_open: AtomicU32,
    max_concurrent_open: AtomicU32,
    open_attempt_times: Mutex<Vec<Instant>>,
}

impl DriverStats {
    /// All `open` calls, including failed ones.
    pub fn open_attempts(&self) -> u32 {
        self.open_attempts.load(Ordering::SeqCst)
    }

    /// Successful `open` calls.
    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn inits(&self) -> u32 {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> u32 {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Sessions open right now.
    pub fn currently_open(&self) -> u32 {
        self.currently_open.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open sessions ever observed.
    pub fn max_concurrent_open(&self) -> u32 {
        self.max_concurrent_open.load(Ordering::SeqCst)
    }

    /// Timestamps of all `open` calls, in order.
    pub fn open_attempt_times(&self) -> Vec<Instant> {
        self.open_attempt_times
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Camera driver double driven by a queue of [`SessionPlan`]s.
///
/// Each `open` call consumes the next plan; when the queue is empty, a
/// default plan (endless poll timeouts) is used.
pub struct ScriptedDriver {
    plans: VecDeque<SessionPlan>,
    stats: Arc<DriverStats>,
}

impl ScriptedDriver {
    pub fn new(plans: Vec<SessionPlan>) -> Self {
        Self {
            plans: plans.into(),
            stats: Arc::new(DriverStats::default()),
        }
    }

    /// Counter handle, valid after the driver moves into the engine.
    pub fn stats(&self) -> Arc<DriverStats> {
        Arc::clone(&self.stats)
    }
}

impl CameraDriver for ScriptedDriver {
    type Session = ScriptedSession;

    fn open(&mut self) -> Result<Self::Session, DriverError> {
        self.stats.open_attempts.fetch_add(1, Ordering::SeqCst);
        self.stats
            .open_attempt_times
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Instant::now());

        let plan = self.plans.pop_front().unwrap_or_default();
        if plan.fail_open {
            return Err(DriverError::with_code("no camera detected", -105));
        }

        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        let now_open = self.stats.currently_open.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats
            .max_concurrent_open
            .fetch_max(now_open, Ordering::SeqCst);

        Ok(ScriptedSession {
            steps: plan.steps.into(),
            fail_init: plan.fail_init,
            pending: HashMap::new(),
            seq: 0,
            stats: Arc::clone(&self.stats),
        })
    }
}

/// Session half of the scripted double.
pub struct ScriptedSession {
    steps: VecDeque<ScriptStep>,
    fail_init: bool,
    /// Fetch payloads keyed by file name; `None` means the fetch must fail.
    pending: HashMap<String, Option<Capture>>,
    seq: u32,
    stats: Arc<DriverStats>,
}

impl CameraSession for ScriptedSession {
    fn init(&mut self) -> Result<(), DriverError> {
        self.stats.inits.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            return Err(DriverError::with_code("could not claim the USB device", -53));
        }
        Ok(())
    }

    fn wait_for_file(&mut self, timeout: Duration) -> Result<PollEvent, DriverError> {
        match self.steps.pop_front() {
            Some(ScriptStep::File { data, mime }) => {
                self.seq += 1;
                let name = format!("capt{:04}.img", self.seq);
                self.pending
                    .insert(name.clone(), Some(Capture::new(data, mime)));
                Ok(PollEvent::FileAdded(FilePath::new("/store_00010001", name)))
            }
            Some(ScriptStep::FetchError) => {
                self.seq += 1;
                let name = format!("capt{:04}.img", self.seq);
                self.pending.insert(name.clone(), None);
                Ok(PollEvent::FileAdded(FilePath::new("/store_00010001", name)))
            }
            Some(ScriptStep::PollError) => Err(DriverError::with_code("event wait failed", -1)),
            Some(ScriptStep::Timeout) | None => {
                // A real poll blocks for the whole window when no event
                // arrives; model that so pacing is observable.
                std::thread::sleep(timeout);
                Ok(PollEvent::Timeout)
            }
        }
    }

    fn fetch(&mut self, file: &FilePath) -> Result<Capture, DriverError> {
        self.stats.fetches.fetch_add(1, Ordering::SeqCst);
        match self.pending.remove(&file.name) {
            Some(Some(capture)) => Ok(capture),
            Some(None) => Err(DriverError::with_code("corrupted data received", -102)),
            None => Err(DriverError::new(format!("unknown file {}", file.name))),
        }
    }

    fn delete(&mut self, _file: &FilePath) -> Result<(), DriverError> {
        self.stats.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(self) {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        self.stats.currently_open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_session_plays_steps_in_order() {
        let mut driver = ScriptedDriver::new(vec![SessionPlan::ok(vec![
            ScriptStep::file(vec![1, 2, 3], "image/jpeg"),
            ScriptStep::Timeout,
        ])]);

        let mut session = driver.open().expect("open");
        session.init().expect("init");

        let event = session.wait_for_file(Duration::from_millis(1)).unwrap();
        let PollEvent::FileAdded(file) = event else {
            panic!("expected a file event");
        };
        let capture = session.fetch(&file).unwrap();
        assert_eq!(capture.data.as_ref(), &[1, 2, 3]);
        assert_eq!(capture.mime_type, "image/jpeg");

        let event = session.wait_for_file(Duration::from_millis(1)).unwrap();
        assert_eq!(event, PollEvent::Timeout);

        session.close();

        let stats = driver.stats();
        assert_eq!(stats.opens(), 1);
        assert_eq!(stats.closes(), 1);
        assert_eq!(stats.currently_open(), 0);
    }

    #[test]
    fn test_open_failure_plan() {
        let mut driver = ScriptedDriver::new(vec![SessionPlan::open_failure()]);

        assert!(driver.open().is_err());
        let stats = driver.stats();
        assert_eq!(stats.open_attempts(), 1);
        assert_eq!(stats.opens(), 0);
    }

    #[test]
    fn test_exhausted_plans_time_out_forever() {
        let mut driver = ScriptedDriver::new(vec![]);
        let mut session = driver.open().expect("open");

        let event = session.wait_for_file(Duration::from_millis(1)).unwrap();
        assert_eq!(event, PollEvent::Timeout);
    }
}
