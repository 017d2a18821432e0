use crate::models::audio_models::AudioLevels;
use crate::models::error::CaptureError;
use crate::models::state::CaptureState;

/// Event delegate for capture loop notifications.
///
/// State changes are reported from the thread calling `start`/`stop`;
/// levels and errors from the capture thread. Implementations should
/// marshal to the UI thread if needed.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the loop state changes.
    fn on_state_changed(&self, state: CaptureState);

    /// Called with the levels of the latest frame, at most every 250 ms.
    fn on_levels_updated(&self, levels: &AudioLevels);

    /// Called when a sink fails or the device stops delivering audio.
    fn on_error(&self, error: &CaptureError);
}
