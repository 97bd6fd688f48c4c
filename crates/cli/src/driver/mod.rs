//! Camera driver selection
//!
//! The real libgphoto2 binding is only compiled with the `gphoto2` feature;
//! default builds get a stub so the binary still builds and fails with a
//! clear message at startup.

#[cfg(feature = "gphoto2")]
mod gphoto;

#[cfg(feature = "gphoto2")]
pub use gphoto::GphotoDriver;

#[cfg(feature = "gphoto2")]
pub fn open_driver() -> anyhow::Result<GphotoDriver> {
    use anyhow::Context;
    GphotoDriver::new().context("Failed to initialize libgphoto2")
}

#[cfg(not(feature = "gphoto2"))]
pub fn open_driver() -> anyhow::Result<stub::UnsupportedDriver> {
    anyhow::bail!("this build has no camera backend; rebuild with `--features gphoto2`")
}

#[cfg(not(feature = "gphoto2"))]
pub mod stub {
    //! Placeholder driver so the binary typechecks without a camera backend.
    //! `open_driver` always fails first, so none of this ever runs.

    use std::time::Duration;
    use tether::{CameraDriver, CameraSession, Capture, DriverError, FilePath, PollEvent};

    pub struct UnsupportedDriver;

    impl CameraDriver for UnsupportedDriver {
        type Session = UnsupportedSession;

        fn open(&mut self) -> Result<Self::Session, DriverError> {
            Err(DriverError::new("no camera backend compiled in"))
        }
    }

    pub struct UnsupportedSession;

    impl CameraSession for UnsupportedSession {
        fn init(&mut self) -> Result<(), DriverError> {
            Err(DriverError::new("no camera backend compiled in"))
        }

        fn wait_for_file(&mut self, _timeout: Duration) -> Result<PollEvent, DriverError> {
            Err(DriverError::new("no camera backend compiled in"))
        }

        fn fetch(&mut self, _file: &FilePath) -> Result<Capture, DriverError> {
            Err(DriverError::new("no camera backend compiled in"))
        }

        fn delete(&mut self, _file: &FilePath) -> Result<(), DriverError> {
            Err(DriverError::new("no camera backend compiled in"))
        }

        fn close(self) {}
    }
}
