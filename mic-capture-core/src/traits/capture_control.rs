use crate::models::error::CaptureError;
use crate::models::state::CaptureState;

/// Control surface consumed by the UI glue.
pub trait CaptureControl: Send + Sync {
    /// Current loop state.
    fn state(&self) -> CaptureState;

    /// Start recording with a fresh set of sinks.
    fn start_capture(&self) -> Result<(), CaptureError>;

    /// Stop recording and finalize every sink.
    fn stop_capture(&self) -> Result<(), CaptureError>;

    /// Feed back the answer to a microphone permission request.
    fn on_permission_result(&self, granted: bool) -> Result<(), CaptureError>;
}
