use crate::models::audio_models::DeviceInfo;
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;

/// A hardware audio input delivering fixed-size interleaved PCM frames.
///
/// Implemented by:
/// - `WasapiMicSource` (Windows)
/// - scripted sources in tests
pub trait AudioSource: Send {
    /// Open stream produced by [`AudioSource::open`]. Moved onto the
    /// capture thread, which becomes its sole owner until the session ends.
    type Handle: AudioHandle + Send + 'static;

    /// Whether a capture device is currently present.
    fn is_available(&self) -> bool;

    /// Information about the device backing this source.
    fn device_info(&self) -> DeviceInfo;

    /// Open the device at the configured sample rate, channel layout and bit depth.
    ///
    /// Fails with `PermissionDenied` when microphone access is not granted
    /// and `DeviceUnavailable` when the hardware rejects the format.
    fn open(&mut self, config: &CaptureConfiguration) -> Result<Self::Handle, CaptureError>;
}

/// An open capture stream.
pub trait AudioHandle {
    /// Block until one frame of `expected_len` bytes is available.
    ///
    /// The returned slice borrows the handle's internal buffer and is only
    /// valid until the next call. A read that gathers fewer bytes than
    /// requested before the configured read timeout fails with `Underflow`;
    /// the shortfall is discarded.
    fn read_frame(&mut self, expected_len: usize) -> Result<&[u8], CaptureError>;

    /// Stop the stream and release the device. Idempotent.
    fn close(&mut self);
}
