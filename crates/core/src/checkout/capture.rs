//! Camera capture for cash photos.
//!
//! The camera stream is a scoped resource: it is acquired when the shopper
//! opens the capture step and every track must be stopped when they leave it,
//! whichever way they leave. [`PhotoCapture`] holds the stream in a
//! [`StreamGuard`] whose `Drop` stops it, so confirm, cancel, retake,
//! switching to the upload fallback and plain drops all release the camera.

use super::photo::{CashPhoto, PhotoError};

/// Errors from the camera.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Camera access was denied. Allow camera access or upload a photo instead.")]
    PermissionDenied,
    #[error("No camera is available: {0}")]
    Unavailable(String),
    #[error("The camera is not running")]
    NotStreaming,
    #[error("Take a photo first")]
    NothingCaptured,
    #[error(transparent)]
    Photo(#[from] PhotoError),
}

/// A live media stream.
pub trait MediaStream {
    /// Grab the current frame as an encoded image.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be read or encoded.
    fn capture_frame(&mut self) -> Result<CashPhoto, CaptureError>;

    /// Stop every track. Must be safe to call more than once.
    fn stop(&mut self);
}

/// Something that can hand out camera streams.
pub trait CameraDevice {
    type Stream: MediaStream;

    /// Ask for a camera stream.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError::PermissionDenied` when the user refuses access.
    fn request_stream(&mut self) -> Result<Self::Stream, CaptureError>;
}

/// Owns a stream and stops it when dropped.
#[derive(Debug)]
pub struct StreamGuard<S: MediaStream> {
    stream: S,
}

impl<S: MediaStream> StreamGuard<S> {
    pub const fn new(stream: S) -> Self {
        Self { stream }
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }
}

impl<S: MediaStream> Drop for StreamGuard<S> {
    fn drop(&mut self) {
        self.stream.stop();
    }
}

/// Where the capture step currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Streaming,
    /// Stays until [`PhotoCapture::retry`] or the upload fallback.
    PermissionDenied,
    /// A photo is held and awaiting confirmation.
    Captured,
}

/// The cash-photo capture step.
pub struct PhotoCapture<D: CameraDevice> {
    device: D,
    stream: Option<StreamGuard<D::Stream>>,
    photo: Option<CashPhoto>,
    denied: bool,
}

impl<D: CameraDevice> PhotoCapture<D> {
    pub const fn new(device: D) -> Self {
        Self {
            device,
            stream: None,
            photo: None,
            denied: false,
        }
    }

    #[must_use]
    pub const fn state(&self) -> CaptureState {
        if self.photo.is_some() {
            CaptureState::Captured
        } else if self.stream.is_some() {
            CaptureState::Streaming
        } else if self.denied {
            CaptureState::PermissionDenied
        } else {
            CaptureState::Idle
        }
    }

    /// Start the camera, releasing any stream already held.
    ///
    /// # Errors
    ///
    /// Returns the device error; permission denial is also remembered in
    /// [`state`](Self::state).
    pub fn open(&mut self) -> Result<(), CaptureError> {
        self.stream = None;
        match self.device.request_stream() {
            Ok(stream) => {
                self.denied = false;
                self.stream = Some(StreamGuard::new(stream));
                Ok(())
            }
            Err(err) => {
                self.denied = matches!(err, CaptureError::PermissionDenied);
                Err(err)
            }
        }
    }

    /// Ask for camera access again after a denial.
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open).
    pub fn retry(&mut self) -> Result<(), CaptureError> {
        self.open()
    }

    /// Take a photo from the running stream.
    ///
    /// The stream keeps running so the shopper can retake.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError::NotStreaming` if the camera is not open.
    pub fn capture(&mut self) -> Result<(), CaptureError> {
        let guard = self.stream.as_mut().ok_or(CaptureError::NotStreaming)?;
        let photo = guard.stream_mut().capture_frame()?;
        self.photo = Some(photo);
        Ok(())
    }

    /// Discard the photo and restart the camera.
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open).
    pub fn retake(&mut self) -> Result<(), CaptureError> {
        self.photo = None;
        self.open()
    }

    /// Use an uploaded file instead of the camera. Stops the stream.
    pub fn use_upload(&mut self, photo: CashPhoto) {
        self.stream = None;
        self.photo = Some(photo);
    }

    /// Accept the held photo and end the step.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError::NothingCaptured` if no photo is held; the step
    /// is ended (and the camera released) either way.
    pub fn confirm(mut self) -> Result<CashPhoto, CaptureError> {
        self.stream = None;
        self.photo.take().ok_or(CaptureError::NothingCaptured)
    }

    /// Leave the step without a photo.
    pub fn cancel(self) {
        drop(self);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::checkout::photo::tests::jpeg_bytes;

    #[derive(Debug, Default, Clone)]
    struct Counters {
        opened: Rc<Cell<usize>>,
        stopped: Rc<Cell<usize>>,
    }

    impl Counters {
        fn live(&self) -> usize {
            self.opened.get() - self.stopped.get()
        }
    }

    #[derive(Debug)]
    struct FakeStream {
        counters: Counters,
        stopped: bool,
    }

    impl MediaStream for FakeStream {
        fn capture_frame(&mut self) -> Result<CashPhoto, CaptureError> {
            CashPhoto::from_upload(Some("image/jpeg"), jpeg_bytes()).map_err(CaptureError::from)
        }

        fn stop(&mut self) {
            if !self.stopped {
                self.stopped = true;
                self.counters.stopped.set(self.counters.stopped.get() + 1);
            }
        }
    }

    #[derive(Debug)]
    struct FakeCamera {
        counters: Counters,
        deny: Rc<Cell<bool>>,
    }

    impl CameraDevice for FakeCamera {
        type Stream = FakeStream;

        fn request_stream(&mut self) -> Result<FakeStream, CaptureError> {
            if self.deny.get() {
                return Err(CaptureError::PermissionDenied);
            }
            self.counters.opened.set(self.counters.opened.get() + 1);
            Ok(FakeStream {
                counters: self.counters.clone(),
                stopped: false,
            })
        }
    }

    fn camera() -> (PhotoCapture<FakeCamera>, Counters, Rc<Cell<bool>>) {
        let counters = Counters::default();
        let deny = Rc::new(Cell::new(false));
        let capture = PhotoCapture::new(FakeCamera {
            counters: counters.clone(),
            deny: Rc::clone(&deny),
        });
        (capture, counters, deny)
    }

    #[test]
    fn test_confirm_releases_stream() {
        let (mut capture, counters, _) = camera();
        capture.open().unwrap();
        assert_eq!(capture.state(), CaptureState::Streaming);

        capture.capture().unwrap();
        assert_eq!(capture.state(), CaptureState::Captured);
        assert_eq!(counters.live(), 1);

        let photo = capture.confirm().unwrap();
        assert!(!photo.is_empty());
        assert_eq!(counters.live(), 0);
    }

    #[test]
    fn test_cancel_releases_stream() {
        let (mut capture, counters, _) = camera();
        capture.open().unwrap();
        capture.cancel();
        assert_eq!(counters.stopped.get(), 1);
    }

    #[test]
    fn test_drop_releases_stream() {
        let (mut capture, counters, _) = camera();
        capture.open().unwrap();
        drop(capture);
        assert_eq!(counters.live(), 0);
    }

    #[test]
    fn test_retake_stops_old_stream_before_new_one() {
        let (mut capture, counters, _) = camera();
        capture.open().unwrap();
        capture.capture().unwrap();
        capture.retake().unwrap();

        assert_eq!(capture.state(), CaptureState::Streaming);
        assert_eq!(counters.opened.get(), 2);
        assert_eq!(counters.live(), 1);
        drop(capture);
        assert_eq!(counters.live(), 0);
    }

    #[test]
    fn test_permission_denied_is_persistent_until_retry() {
        let (mut capture, counters, deny) = camera();
        deny.set(true);

        assert_eq!(capture.open(), Err(CaptureError::PermissionDenied));
        assert_eq!(capture.state(), CaptureState::PermissionDenied);
        assert_eq!(capture.capture(), Err(CaptureError::NotStreaming));
        assert_eq!(capture.state(), CaptureState::PermissionDenied);

        deny.set(false);
        capture.retry().unwrap();
        assert_eq!(capture.state(), CaptureState::Streaming);
        assert_eq!(counters.live(), 1);
    }

    #[test]
    fn test_upload_fallback_stops_stream() {
        let (mut capture, counters, _) = camera();
        capture.open().unwrap();
        capture.use_upload(CashPhoto::from_upload(None, jpeg_bytes()).unwrap());

        assert_eq!(counters.live(), 0);
        assert_eq!(capture.state(), CaptureState::Captured);
        assert!(capture.confirm().is_ok());
    }

    #[test]
    fn test_confirm_without_photo_still_releases() {
        let (mut capture, counters, _) = camera();
        capture.open().unwrap();
        assert_eq!(capture.confirm(), Err(CaptureError::NothingCaptured));
        assert_eq!(counters.live(), 0);
    }
}
