use crate::models::audio_models::AudioFrame;
use crate::models::error::CaptureError;

/// A consumer of captured PCM frames.
///
/// `start` and `stop` run on the control thread, `on_frame` on the capture
/// thread. `on_frame` is called synchronously for every frame and delays
/// every other sink while it runs, so it must hand heavy work off.
pub trait FrameSink: Send {
    /// Short name used in logs and `SinkFailed` errors.
    fn name(&self) -> &str;

    fn start(&mut self) -> Result<(), CaptureError>;

    fn on_frame(&mut self, frame: &AudioFrame) -> Result<(), CaptureError>;

    fn stop(&mut self) -> Result<(), CaptureError>;
}
