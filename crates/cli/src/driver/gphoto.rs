//! libgphoto2 camera binding
//!
//! Maps the engine's driver traits onto the `gphoto2` crate. One driver owns
//! the libgphoto2 context; each session owns one autodetected camera.

use gphoto2::camera::CameraEvent;
use gphoto2::{Camera, Context};
use std::time::Duration;
use tether::{CameraDriver, CameraSession, Capture, DriverError, FilePath, PollEvent};

fn map_err(e: gphoto2::Error) -> DriverError {
    DriverError::new(e.to_string())
}

pub struct GphotoDriver {
    context: Context,
}

impl GphotoDriver {
    pub fn new() -> Result<Self, DriverError> {
        Ok(Self {
            context: Context::new().map_err(map_err)?,
        })
    }
}

impl CameraDriver for GphotoDriver {
    type Session = GphotoSession;

    fn open(&mut self) -> Result<Self::Session, DriverError> {
        let camera = self.context.autodetect_camera().wait().map_err(map_err)?;
        Ok(GphotoSession {
            camera,
            context: self.context.clone(),
        })
    }
}

pub struct GphotoSession {
    camera: Camera,
    context: Context,
}

impl CameraSession for GphotoSession {
    fn init(&mut self) -> Result<(), DriverError> {
        // Forces the handshake; autodetect alone can succeed against a
        // camera that then refuses to talk.
        self.camera.summary().wait().map_err(map_err)?;
        Ok(())
    }

    fn wait_for_file(&mut self, timeout: Duration) -> Result<PollEvent, DriverError> {
        match self.camera.wait_event(timeout).wait().map_err(map_err)? {
            CameraEvent::NewFile(path) => Ok(PollEvent::FileAdded(FilePath::new(
                path.folder().to_string(),
                path.name().to_string(),
            ))),
            _ => Ok(PollEvent::Timeout),
        }
    }

    fn fetch(&mut self, file: &FilePath) -> Result<Capture, DriverError> {
        let camera_file = self
            .camera
            .fs()
            .download(&file.folder, &file.name)
            .wait()
            .map_err(map_err)?;

        let mime_type = camera_file.mime_type();
        let data = camera_file.get_data(&self.context).wait().map_err(map_err)?;

        Ok(Capture::new(Vec::from(data), mime_type))
    }

    fn delete(&mut self, file: &FilePath) -> Result<(), DriverError> {
        self.camera
            .fs()
            .delete_file(&file.folder, &file.name)
            .wait()
            .map_err(map_err)
    }

    fn close(self) {
        // gp_camera_exit runs on drop.
    }
}
