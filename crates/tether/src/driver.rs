//! Camera driver interface boundary
//!
//! The engine consumes cameras through these traits and never talks to
//! hardware itself. A real binding (libgphoto2) lives in the CLI crate behind
//! a cargo feature; a scripted double for tests lives in
//! [`crate::test_utils`].

use crate::capture::Capture;
use std::time::Duration;
use thiserror::Error;

/// Error returned by any driver operation.
///
/// The engine treats driver errors as opaque beyond which call produced them;
/// the native library's return code may be carried alongside for diagnostics.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
    /// Native error code from the underlying library, if any.
    pub code: Option<i32>,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: i32) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }
}

/// Location of a newly captured file on the device.
///
/// Mirrors libgphoto2's `CameraFilePath`: a folder on the camera's storage
/// plus the file name within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePath {
    pub folder: String,
    pub name: String,
}

impl FilePath {
    pub fn new(folder: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            name: name.into(),
        }
    }
}

/// Outcome of one bounded event poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// The camera reported a newly captured file.
    FileAdded(FilePath),
    /// The poll window elapsed without a file event.
    Timeout,
}

/// Factory for camera sessions.
///
/// One driver instance backs the whole engine run; `open` is called once per
/// supervising-loop iteration and must hand out a fresh session each time.
pub trait CameraDriver: Send + 'static {
    type Session: CameraSession;

    /// Claim the device and return an unopened session handle.
    fn open(&mut self) -> Result<Self::Session, DriverError>;
}

/// One open connection to the physical device.
///
/// `close` consumes the session, so every session is closed at most once and
/// cannot be used afterwards. The engine guarantees it is closed exactly once
/// on every exit path.
pub trait CameraSession: Send {
    /// Perform the device handshake/configuration after `open`.
    fn init(&mut self) -> Result<(), DriverError>;

    /// Block for up to `timeout` waiting for a "file added" notification.
    fn wait_for_file(&mut self, timeout: Duration) -> Result<PollEvent, DriverError>;

    /// Transfer the file's bytes and encoding from the device.
    fn fetch(&mut self, file: &FilePath) -> Result<Capture, DriverError>;

    /// Delete the file from the camera's storage.
    ///
    /// Best-effort cleanup; callers ignore failures.
    fn delete(&mut self, file: &FilePath) -> Result<(), DriverError>;

    /// Release the device.
    fn close(self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let plain = DriverError::new("no camera detected");
        assert_eq!(plain.to_string(), "no camera detected");
        assert_eq!(plain.code, None);

        let coded = DriverError::with_code("I/O problem", -7);
        assert_eq!(coded.to_string(), "I/O problem");
        assert_eq!(coded.code, Some(-7));
    }
}
