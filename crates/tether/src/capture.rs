//! Capture value emitted on the outbound stream

use bytes::Bytes;

/// One image drained from the camera.
///
/// Created by the engine immediately after a successful file transfer;
/// ownership moves to the stream consumer on emission. The engine keeps no
/// copy of emitted captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    /// Raw encoded image bytes, exactly as transferred from the device.
    pub data: Bytes,
    /// MIME type reported by the device for `data` (e.g. `image/jpeg`).
    pub mime_type: String,
}

impl Capture {
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Size of the encoded image in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_holds_data_and_mime() {
        let capture = Capture::new(vec![0xff, 0xd8, 0xff], "image/jpeg");

        assert_eq!(capture.data.as_ref(), &[0xff, 0xd8, 0xff]);
        assert_eq!(capture.mime_type, "image/jpeg");
        assert_eq!(capture.len(), 3);
        assert!(!capture.is_empty());
    }
}
