//! Capture persistence
//!
//! Saves each capture under a monotonically increasing counter with a file
//! extension derived from the capture's MIME type.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tether::Capture;

/// Writes captures into one output directory.
pub struct CaptureWriter {
    dir: PathBuf,
    counter: u64,
}

impl CaptureWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            counter: 0,
        }
    }

    /// Persist one capture and return the path it was written to.
    ///
    /// The counter only advances on success, so a failed save does not leave
    /// a gap in the sequence.
    pub fn save(&mut self, capture: &Capture) -> Result<PathBuf> {
        let ext = extension_for_mime(&capture.mime_type);
        let path = self.dir.join(format!("{}.{}", self.counter, ext));

        fs::write(&path, &capture.data)
            .with_context(|| format!("Failed to write image to {}", path.display()))?;

        self.counter += 1;
        Ok(path)
    }
}

/// File extension for a device-reported MIME type.
///
/// Unknown types fall back to `bin` rather than guessing.
fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/tiff" => "tif",
        "image/heif" | "image/heic" => "heic",
        "image/x-canon-cr2" => "cr2",
        "image/x-canon-cr3" => "cr3",
        "image/x-nikon-nef" => "nef",
        "image/x-sony-arw" => "arw",
        "image/x-fuji-raf" => "raf",
        "image/x-raw" | "image/raw" => "raw",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_mapping() {
        assert_eq!(extension_for_mime("image/jpeg"), "jpg");
        assert_eq!(extension_for_mime("image/x-nikon-nef"), "nef");
        assert_eq!(extension_for_mime("image/x-raw"), "raw");
        assert_eq!(extension_for_mime("application/octet-stream"), "bin");
    }

    #[test]
    fn test_save_uses_counter_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CaptureWriter::new(dir.path());

        let first = writer
            .save(&Capture::new(vec![1u8, 2, 3], "image/jpeg"))
            .unwrap();
        let second = writer
            .save(&Capture::new(vec![4u8, 5], "image/x-raw"))
            .unwrap();

        assert_eq!(first, dir.path().join("0.jpg"));
        assert_eq!(second, dir.path().join("1.raw"));
        assert_eq!(fs::read(&first).unwrap(), vec![1, 2, 3]);
        assert_eq!(fs::read(&second).unwrap(), vec![4, 5]);
    }

    #[test]
    fn test_failed_save_does_not_advance_counter() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let mut writer = CaptureWriter::new(&missing);

        let capture = Capture::new(vec![1u8], "image/jpeg");
        assert!(writer.save(&capture).is_err());

        // Once the directory appears, the sequence starts from 0.
        fs::create_dir_all(&missing).unwrap();
        let path = writer.save(&capture).unwrap();
        assert_eq!(path, missing.join("0.jpg"));
    }
}
