//! Tethered camera capture engine
//!
//! Continuously drains images from a camera running in tethered mode (the
//! camera pushes a notification for each captured frame) and republishes them,
//! in arrival order, on a bounded stream. The engine owns the reconnect/retry
//! state machine: it opens a camera session, pumps its blocking event-poll
//! API, classifies every failure into a recovery policy, and survives
//! transient device errors without operator intervention.
//!
//! Camera access itself sits behind the [`CameraDriver`] trait; the engine
//! never touches hardware directly. This crate implements the hybrid
//! sync-async architecture: camera operations run in a dedicated blocking
//! thread and reach async consumers through a bounded channel.

pub mod cancel;
pub mod capture;
pub mod diagnostics;
pub mod driver;
pub mod engine;
pub mod logging;
pub mod test_utils;

pub use cancel::CancellationToken;
pub use capture::Capture;
pub use diagnostics::{DiagLevel, Diagnostics, TracingDiagnostics};
pub use driver::{CameraDriver, CameraSession, DriverError, FilePath, PollEvent};
pub use engine::{EngineConfig, Tether, TetherHandle};
pub use logging::setup_logging;
